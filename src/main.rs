use anyhow::{Context, Result};
use clap::Parser;
use lightstep_receiver_config::{GrpcServerConfig, HttpServerConfig, LogFormat, RuntimeConfig};
use std::path::PathBuf;

/// Receiver for Lightstep legacy trace reports (gRPC, HTTP protobuf, Thrift)
#[derive(Parser)]
#[command(name = "lightstep-receiver")]
#[command(version)]
#[command(about = "Receiver for Lightstep legacy trace reports", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log format: text, json
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// gRPC listen address; enables the pbgrpc front-end
    #[arg(long, value_name = "ADDR")]
    pbgrpc_endpoint: Option<String>,

    /// HTTP protobuf listen address; enables the pbhttp front-end
    #[arg(long, value_name = "ADDR")]
    pbhttp_endpoint: Option<String>,

    /// Thrift listen address; enables the thrift front-end
    #[arg(long, value_name = "ADDR")]
    thrift_endpoint: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load().context("Failed to load configuration")?
    };

    // CLI flags win over file and environment
    apply_cli_overrides(&mut config, &cli);

    config.validate().context("Invalid configuration")?;

    lightstep_receiver_server::run_with_config(config).await
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        config.server.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.server.log_format = format;
    }

    let protocols = &mut config.protocols;
    if let Some(endpoint) = &cli.pbgrpc_endpoint {
        protocols
            .pbgrpc
            .get_or_insert_with(GrpcServerConfig::default)
            .endpoint = endpoint.clone();
    }
    if let Some(endpoint) = &cli.pbhttp_endpoint {
        protocols
            .pbhttp
            .get_or_insert_with(|| HttpServerConfig::with_endpoint(endpoint.as_str()))
            .endpoint = endpoint.clone();
    }
    if let Some(endpoint) = &cli.thrift_endpoint {
        protocols
            .thrift
            .get_or_insert_with(|| HttpServerConfig::with_endpoint(endpoint.as_str()))
            .endpoint = endpoint.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_enable_protocols() {
        let cli = Cli::parse_from([
            "lightstep-receiver",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "--thrift-endpoint",
            "127.0.0.1:9417",
        ]);
        let mut config = RuntimeConfig::from_toml("[protocols.pbhttp]\n").unwrap();

        apply_cli_overrides(&mut config, &cli);

        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert!(config.protocols.pbgrpc.is_none());
        assert_eq!(
            config.protocols.pbhttp.as_ref().map(|c| c.endpoint.as_str()),
            Some("0.0.0.0:4327")
        );
        assert_eq!(
            config.protocols.thrift.as_ref().map(|c| c.endpoint.as_str()),
            Some("127.0.0.1:9417")
        );
        config.validate().unwrap();
    }
}
