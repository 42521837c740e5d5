// lightstep-receiver-config - Receiver configuration
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from LIGHTSTEP_RECEIVER_CONFIG env var
// 3. Default config file locations (./config.toml, ./lightstep-receiver.toml)
// 4. Built-in defaults (lowest priority): all three protocols enabled

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{apply_env_overrides, EnvSource, ENV_PREFIX};

pub const DEFAULT_PBGRPC_ENDPOINT: &str = "0.0.0.0:4317";
pub const DEFAULT_PBHTTP_ENDPOINT: &str = "0.0.0.0:4327";
pub const DEFAULT_THRIFT_ENDPOINT: &str = "0.0.0.0:4417";

/// Main runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub protocols: ProtocolsConfig,
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

/// Enabled front-ends. A protocol is enabled when its section is present.
///
/// Without a `[protocols]` section every protocol runs on its default
/// endpoint; with one, only the listed protocols run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbgrpc: Option<GrpcServerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbhttp: Option<HttpServerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thrift: Option<HttpServerConfig>,
}

impl Default for ProtocolsConfig {
    fn default() -> Self {
        Self {
            pbgrpc: Some(GrpcServerConfig::default()),
            pbhttp: Some(HttpServerConfig::with_endpoint(DEFAULT_PBHTTP_ENDPOINT)),
            thrift: Some(HttpServerConfig::with_endpoint(DEFAULT_THRIFT_ENDPOINT)),
        }
    }
}

impl ProtocolsConfig {
    /// Give sections that omit `endpoint` their protocol's default.
    pub fn apply_default_endpoints(&mut self) {
        if let Some(grpc) = &mut self.pbgrpc {
            if grpc.endpoint.is_empty() {
                grpc.endpoint = DEFAULT_PBGRPC_ENDPOINT.to_string();
            }
        }
        if let Some(http) = &mut self.pbhttp {
            if http.endpoint.is_empty() {
                http.endpoint = DEFAULT_PBHTTP_ENDPOINT.to_string();
            }
        }
        if let Some(thrift) = &mut self.thrift {
            if thrift.endpoint.is_empty() {
                thrift.endpoint = DEFAULT_THRIFT_ENDPOINT.to_string();
            }
        }
    }

    /// Endpoints of every enabled protocol, by protocol name.
    pub fn enabled_endpoints(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        if let Some(grpc) = &self.pbgrpc {
            out.push(("pbgrpc", grpc.endpoint.as_str()));
        }
        if let Some(http) = &self.pbhttp {
            out.push(("pbhttp", http.endpoint.as_str()));
        }
        if let Some(thrift) = &self.thrift {
            out.push(("thrift", thrift.endpoint.as_str()));
        }
        out
    }
}

/// gRPC front-end settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrpcServerConfig {
    pub endpoint: String,
    pub max_recv_msg_size_mib: usize,
}

impl Default for GrpcServerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PBGRPC_ENDPOINT.to_string(),
            max_recv_msg_size_mib: 4,
        }
    }
}

impl GrpcServerConfig {
    pub fn max_recv_msg_size_bytes(&self) -> usize {
        self.max_recv_msg_size_mib.saturating_mul(1024 * 1024)
    }
}

/// HTTP front-end settings, shared by the pbhttp and thrift protocols
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_max_request_body_bytes")]
    pub max_request_body_bytes: usize,
}

fn default_max_request_body_bytes() -> usize {
    20 * 1024 * 1024
}

impl HttpServerConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            max_request_body_bytes: default_max_request_body_bytes(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            protocols: ProtocolsConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority. Not validated, so
    /// callers can layer their own overrides first.
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load from a specific file, then apply environment overrides
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Parse a TOML document; absent sections take their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: RuntimeConfig = toml::from_str(content)?;
        config.protocols.apply_default_endpoints();
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let config = RuntimeConfig::default();
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.server.log_format, LogFormat::Text);
        assert_eq!(
            config.protocols.enabled_endpoints(),
            vec![
                ("pbgrpc", "0.0.0.0:4317"),
                ("pbhttp", "0.0.0.0:4327"),
                ("thrift", "0.0.0.0:4417"),
            ]
        );
        let grpc = config.protocols.pbgrpc.unwrap();
        assert_eq!(grpc.max_recv_msg_size_bytes(), 4 * 1024 * 1024);
    }

    #[test]
    fn test_protocols_section_enables_listed_only() {
        let config = RuntimeConfig::from_toml(
            r#"
            [protocols.thrift]
            endpoint = "127.0.0.1:9000"
            "#,
        )
        .unwrap();
        assert!(config.protocols.pbgrpc.is_none());
        assert!(config.protocols.pbhttp.is_none());
        let thrift = config.protocols.thrift.unwrap();
        assert_eq!(thrift.endpoint, "127.0.0.1:9000");
        assert_eq!(thrift.max_request_body_bytes, 20 * 1024 * 1024);
    }

    #[test]
    fn test_section_without_endpoint_uses_protocol_default() {
        let config = RuntimeConfig::from_toml(
            r#"
            [protocols.pbhttp]
            max_request_body_bytes = 1024

            [protocols.pbgrpc]
            "#,
        )
        .unwrap();
        let pbhttp = config.protocols.pbhttp.unwrap();
        assert_eq!(pbhttp.endpoint, DEFAULT_PBHTTP_ENDPOINT);
        assert_eq!(pbhttp.max_request_body_bytes, 1024);
        assert_eq!(config.protocols.pbgrpc.unwrap().endpoint, DEFAULT_PBGRPC_ENDPOINT);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = RuntimeConfig::from_toml("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
