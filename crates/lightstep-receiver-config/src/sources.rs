// Configuration source loading.
//
// Priority order:
// 1. Environment variables (LIGHTSTEP_RECEIVER_* prefix)
// 2. Config file path from LIGHTSTEP_RECEIVER_CONFIG
// 3. Default config files (./config.toml, ./lightstep-receiver.toml)
// 4. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::RuntimeConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &["./config.toml", "./lightstep-receiver.toml"];

/// Load configuration using native environment/file access.
pub fn load_config() -> Result<RuntimeConfig> {
    load_config_from(&StdEnvSource)
}

/// Load configuration, reading the config path and overrides from `env`.
/// A file named by `LIGHTSTEP_RECEIVER_CONFIG` must exist and parse.
pub(crate) fn load_config_from<E: EnvSource>(env: &E) -> Result<RuntimeConfig> {
    let mut config = match env.get("CONFIG") {
        Some(path) => read_file(&path)?,
        None => load_default_file()?.unwrap_or_default(),
    };
    env_overrides::apply_env_overrides(&mut config, env)?;
    Ok(config)
}

fn load_default_file() -> Result<Option<RuntimeConfig>> {
    for path in DEFAULT_CONFIG_FILES {
        if Path::new(path).exists() {
            debug!(path = %path, "using default config file");
            return read_file(path).map(Some);
        }
    }
    Ok(None)
}

fn read_file(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    RuntimeConfig::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let mut config = read_file(path)?;
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env_overrides::tests::env;
    use std::io::Write;

    #[test]
    fn test_load_from_file_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [server]
            log_level = "debug"
            log_format = "json"

            [protocols.pbgrpc]
            endpoint = "127.0.0.1:14317"
            "#
        )
        .unwrap();

        let config = load_from_file_path(file.path()).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.server.log_format, crate::LogFormat::Json);
        assert_eq!(
            config.protocols.enabled_endpoints(),
            vec![("pbgrpc", "127.0.0.1:14317")]
        );
    }

    #[test]
    fn test_configured_file_that_fails_to_parse_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[protocols.pbgrpc\nendpoint = ").unwrap();
        let path = file.path().to_str().unwrap();

        let err = load_config_from(&env(&[("CONFIG", path)])).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config file"));
    }

    #[test]
    fn test_configured_file_then_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[protocols.thrift]\nendpoint = \"127.0.0.1:14417\"").unwrap();
        let path = file.path().to_str().unwrap();

        let config =
            load_config_from(&env(&[("CONFIG", path), ("LOG_LEVEL", "warn")])).unwrap();
        assert_eq!(config.server.log_level, "warn");
        assert_eq!(
            config.protocols.enabled_endpoints(),
            vec![("thrift", "127.0.0.1:14417")]
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_from_file_path("/nonexistent/lightstep-receiver.toml").is_err());
    }
}
