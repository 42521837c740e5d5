use crate::{GrpcServerConfig, HttpServerConfig, LogFormat, RuntimeConfig};
use crate::{DEFAULT_PBHTTP_ENDPOINT, DEFAULT_THRIFT_ENDPOINT};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "LIGHTSTEP_RECEIVER_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides. Keys are given without the prefix.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.server.log_level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.server.log_format = format
            .parse::<LogFormat>()
            .context("Invalid LIGHTSTEP_RECEIVER_LOG_FORMAT value")?;
    }

    // Setting an endpoint enables its protocol
    if let Some(endpoint) = get_env_string(env, "PBGRPC_ENDPOINT") {
        config
            .protocols
            .pbgrpc
            .get_or_insert_with(GrpcServerConfig::default)
            .endpoint = endpoint;
    }
    if let Some(endpoint) = get_env_string(env, "PBHTTP_ENDPOINT") {
        config
            .protocols
            .pbhttp
            .get_or_insert_with(|| HttpServerConfig::with_endpoint(DEFAULT_PBHTTP_ENDPOINT))
            .endpoint = endpoint;
    }
    if let Some(endpoint) = get_env_string(env, "THRIFT_ENDPOINT") {
        config
            .protocols
            .thrift
            .get_or_insert_with(|| HttpServerConfig::with_endpoint(DEFAULT_THRIFT_ENDPOINT))
            .endpoint = endpoint;
    }

    // Explicit enable/disable switches
    match get_env_bool(env, "PBGRPC_ENABLED")? {
        Some(false) => config.protocols.pbgrpc = None,
        Some(true) => {
            config
                .protocols
                .pbgrpc
                .get_or_insert_with(GrpcServerConfig::default);
        }
        None => {}
    }
    match get_env_bool(env, "PBHTTP_ENABLED")? {
        Some(false) => config.protocols.pbhttp = None,
        Some(true) => {
            config
                .protocols
                .pbhttp
                .get_or_insert_with(|| HttpServerConfig::with_endpoint(DEFAULT_PBHTTP_ENDPOINT));
        }
        None => {}
    }
    match get_env_bool(env, "THRIFT_ENABLED")? {
        Some(false) => config.protocols.thrift = None,
        Some(true) => {
            config
                .protocols
                .thrift
                .get_or_insert_with(|| HttpServerConfig::with_endpoint(DEFAULT_THRIFT_ENDPOINT));
        }
        None => {}
    }

    // Request limits
    if let Some(val) = get_env_usize(env, "MAX_REQUEST_BODY_BYTES")? {
        if let Some(pbhttp) = &mut config.protocols.pbhttp {
            pbhttp.max_request_body_bytes = val;
        }
        if let Some(thrift) = &mut config.protocols.thrift {
            thrift.max_request_body_bytes = val;
        }
    }
    if let Some(val) = get_env_usize(env, "PBGRPC_MAX_RECV_MSG_SIZE_MIB")? {
        if let Some(grpc) = &mut config.protocols.pbgrpc {
            grpc.max_recv_msg_size_mib = val;
        }
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key).filter(|val| !val.is_empty())
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_bool<E: EnvSource>(env: &E, key: &str) -> Result<Option<bool>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val.to_lowercase().parse::<bool>().map_err(|e| {
                anyhow!(
                    "Failed to parse {}{} (expected bool): {}",
                    ENV_PREFIX,
                    key,
                    e
                )
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
