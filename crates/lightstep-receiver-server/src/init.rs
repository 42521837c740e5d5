// Logging setup
//
// RUST_LOG wins over the configured level so operators can turn up a single
// module without editing the config file.

use lightstep_receiver_config::{LogFormat, ServerConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing from the server section. Calling it twice is harmless.
pub fn init_tracing(server: &ServerConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Ignore the error if a subscriber is already set (tests, embedding)
    let _ = match server.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
    };
}
