// Default trace sink for the standalone binary

use async_trait::async_trait;
use lightstep_receiver_core::{RequestMetadata, SinkError, TraceBatch, TraceSink};
use lightstep_receiver_core::transform::SERVICE_NAME_KEY;
use tracing::info;

/// Logs a one-line summary of every batch it receives and drops it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

#[async_trait]
impl TraceSink for LoggingSink {
    async fn consume(&self, batch: TraceBatch, metadata: RequestMetadata) -> Result<(), SinkError> {
        let events: usize = batch.spans.iter().map(|span| span.events.len()).sum();
        info!(
            service_name = batch.resource.get_str(SERVICE_NAME_KEY).unwrap_or_default(),
            spans = batch.span_count(),
            events,
            has_token = !metadata.access_token().is_empty(),
            "received trace batch"
        );
        Ok(())
    }
}
