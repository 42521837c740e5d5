// lightstep-receiver-server - Network front-ends for Lightstep legacy reports
//
// Front-ends:
// - pbgrpc: tonic CollectorService (v2 protobuf over gRPC)
// - pbhttp: axum, POST /api/v2/reports (v2 protobuf over HTTP)
// - thrift: axum, POST /_rpc/v1/reports/binary and /api/v0/reports (v1)
//
// Every front-end decodes, calls a transform from lightstep-receiver-core and
// hands the result to the shared `Forwarder`. `LightstepReceiver` owns their
// start/shutdown; the process wiring lives in `run`.

use anyhow::Result;
use lightstep_receiver_config::RuntimeConfig;
use lightstep_receiver_core::{ReceiverTelemetry, Telemetry, TraceSink};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

pub mod forwarding;
pub mod grpc;
pub mod http_server;
mod init;
pub mod lifecycle;
pub mod pb_http;
pub mod sink;
pub mod thrift_http;

pub use forwarding::Forwarder;
pub use init::init_tracing;
pub use lifecycle::{ChannelHost, FatalError, FrontEnd, Host, LightstepReceiver};
pub use sink::LoggingSink;

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

/// Entry point for the standalone receiver: logging sink, in-process
/// telemetry registry.
pub async fn run_with_config(config: RuntimeConfig) -> Result<()> {
    init_tracing(&config.server);
    let telemetry = Arc::new(ReceiverTelemetry::new());
    let outcome = run(&config, Arc::new(LoggingSink), telemetry.clone()).await;
    for (counter, label, value) in telemetry.snapshot() {
        info!(
            counter = counter.metric_name(),
            label = %label,
            value,
            "final counter value"
        );
    }
    outcome
}

/// Start every enabled front-end and serve until a shutdown signal or a
/// fatal listener error.
pub async fn run(
    config: &RuntimeConfig,
    sink: Arc<dyn TraceSink>,
    telemetry: Arc<dyn Telemetry>,
) -> Result<()> {
    let (host, mut fatal_errors) = ChannelHost::new();
    let mut receiver = LightstepReceiver::new(&config.protocols, sink, telemetry);
    receiver.start(Arc::new(host)).await?;

    for (name, addr) in receiver.local_addrs() {
        info!(protocol = name, address = %addr, "listening");
    }
    info!("Press Ctrl+C or send SIGTERM to stop");

    let fatal = tokio::select! {
        _ = shutdown_signal() => None,
        fatal = fatal_errors.recv() => fatal,
    };

    let stopped = receiver.shutdown().await;
    if let Some(fatal) = fatal {
        error!(protocol = fatal.component, error = %fatal.error, "front-end failed");
        stopped?;
        return Err(fatal
            .error
            .context(format!("{} front-end failed", fatal.component)));
    }
    stopped?;

    info!("Server shutdown complete");
    Ok(())
}
