// Configuration validation
//
// Validates that at least one front-end is enabled and that listener and
// logging settings are usable.

use crate::*;
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::net::SocketAddr;
use tracing::warn;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_server_config(&config.server)?;
    validate_protocols_config(&config.protocols)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if !LOG_LEVELS.contains(&config.log_level.to_lowercase().as_str()) {
        bail!(
            "server.log_level must be one of {}, got '{}'",
            LOG_LEVELS.join(", "),
            config.log_level
        );
    }
    Ok(())
}

fn validate_protocols_config(config: &ProtocolsConfig) -> Result<()> {
    let endpoints = config.enabled_endpoints();
    if endpoints.is_empty() {
        bail!("at least one protocol (pbgrpc, pbhttp, thrift) must be enabled");
    }

    let mut seen = HashSet::new();
    for (protocol, endpoint) in &endpoints {
        let addr: SocketAddr = endpoint.parse().with_context(|| {
            format!(
                "protocols.{}.endpoint '{}' is not a valid socket address",
                protocol, endpoint
            )
        })?;
        if addr.port() != 0 && !seen.insert(addr) {
            bail!(
                "protocols.{}.endpoint '{}' is already used by another protocol",
                protocol,
                endpoint
            );
        }
    }

    if let Some(grpc) = &config.pbgrpc {
        if grpc.max_recv_msg_size_mib == 0 {
            bail!("protocols.pbgrpc.max_recv_msg_size_mib must be greater than 0");
        }
    }
    for (protocol, http) in [("pbhttp", &config.pbhttp), ("thrift", &config.thrift)] {
        let Some(http) = http else { continue };
        if http.max_request_body_bytes == 0 {
            bail!(
                "protocols.{}.max_request_body_bytes must be greater than 0",
                protocol
            );
        }
        // Warn about very large payloads
        if http.max_request_body_bytes > 100 * 1024 * 1024 {
            warn!(
                protocol,
                max_request_body_bytes = http.max_request_body_bytes,
                "max_request_body_bytes is very large; may cause issues"
            );
        }
    }

    Ok(())
}
