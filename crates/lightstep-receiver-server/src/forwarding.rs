// Forwarding step shared by every front-end
//
// Takes a transform result, accounts for it in telemetry and hands the batch
// to the trace sink together with its access token.

use lightstep_receiver_core::{
    IngestError, ProjectTraceBatch, ReportFormat, RequestMetadata, Telemetry, TraceSink,
    TransformFailure,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct Forwarder {
    sink: Arc<dyn TraceSink>,
    telemetry: Arc<dyn Telemetry>,
}

impl Forwarder {
    pub fn new(sink: Arc<dyn TraceSink>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self { sink, telemetry }
    }

    /// Account for a transform result and deliver it to the sink.
    /// Returns the number of spans the sink accepted.
    pub async fn forward(
        &self,
        format: ReportFormat,
        result: Result<ProjectTraceBatch, TransformFailure>,
    ) -> Result<usize, IngestError> {
        let transport = format.transport();
        let translated = match result {
            Ok(translated) => translated,
            Err(failure) => {
                self.telemetry.increment_failed(transport);
                warn!(
                    format = format.as_str(),
                    service_name = %failure.partial.service_name,
                    error = %failure.error,
                    "rejected report"
                );
                return Err(failure.into());
            }
        };

        self.telemetry.increment_processed(transport);
        self.telemetry
            .increment_dropped_spans(&translated.service_name, translated.client_dropped_span_count);
        if translated.non_utf8_attribute_count > 0 {
            self.telemetry
                .increment_non_utf8(transport, translated.non_utf8_attribute_count);
        }

        let ProjectTraceBatch {
            access_token,
            service_name,
            batch,
            ..
        } = translated;
        let spans = batch.span_count();
        let metadata = RequestMetadata::new(access_token);

        match self.sink.consume(batch, metadata).await {
            Ok(()) => {
                self.telemetry
                    .record_span_outcome(transport, format.as_str(), spans, true);
                debug!(
                    format = format.as_str(),
                    service_name = %service_name,
                    spans,
                    "forwarded report"
                );
                Ok(spans)
            }
            Err(sink_error) => {
                self.telemetry
                    .record_span_outcome(transport, format.as_str(), spans, false);
                error!(
                    format = format.as_str(),
                    service_name = %service_name,
                    spans,
                    error = %sink_error,
                    "trace sink refused report"
                );
                Err(sink_error.into())
            }
        }
    }

    /// Account for a request that never reached a transform.
    pub fn reject(&self, format: ReportFormat, error: IngestError) -> IngestError {
        self.telemetry.increment_failed(format.transport());
        warn!(format = format.as_str(), error = %error, "rejected report");
        error
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use lightstep_receiver_core::{
        Counter, ReceiverTelemetry, SinkError, Span, TraceBatch, TransformError,
    };
    use parking_lot::Mutex;

    /// Sink that remembers what it was given, optionally failing every call.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub batches: Mutex<Vec<(TraceBatch, RequestMetadata)>>,
        pub fail_with: Option<String>,
    }

    #[async_trait]
    impl TraceSink for RecordingSink {
        async fn consume(
            &self,
            batch: TraceBatch,
            metadata: RequestMetadata,
        ) -> Result<(), SinkError> {
            if let Some(message) = &self.fail_with {
                return Err(SinkError::new(message.clone()));
            }
            self.batches.lock().push((batch, metadata));
            Ok(())
        }
    }

    pub(crate) fn forwarder_with(
        sink: RecordingSink,
    ) -> (Forwarder, Arc<RecordingSink>, Arc<ReceiverTelemetry>) {
        let sink = Arc::new(sink);
        let telemetry = Arc::new(ReceiverTelemetry::new());
        let forwarder = Forwarder::new(sink.clone(), telemetry.clone());
        (forwarder, sink, telemetry)
    }

    fn translated() -> ProjectTraceBatch {
        ProjectTraceBatch {
            access_token: "token-1".into(),
            service_name: "checkout".into(),
            client_dropped_span_count: 3,
            non_utf8_attribute_count: 2,
            batch: TraceBatch {
                spans: vec![Span::default(), Span::default()],
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_forward_success() {
        let (forwarder, sink, telemetry) = forwarder_with(RecordingSink::default());

        let spans = forwarder
            .forward(ReportFormat::PbHttp, Ok(translated()))
            .await
            .unwrap();

        assert_eq!(spans, 2);
        let batches = sink.batches.lock();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].1.access_token(), "token-1");
        assert_eq!(telemetry.get(Counter::RequestsProcessed, "pbhttp"), 1);
        assert_eq!(telemetry.get(Counter::RequestsFailed, "pbhttp"), 0);
        assert_eq!(telemetry.get(Counter::NonUtf8Attributes, "pbhttp"), 2);
        assert_eq!(telemetry.get(Counter::ClientSpansDropped, "checkout"), 3);
        assert_eq!(telemetry.get(Counter::AcceptedSpans, "pbhttp"), 2);
    }

    #[tokio::test]
    async fn test_transform_failure_skips_sink() {
        let (forwarder, sink, telemetry) = forwarder_with(RecordingSink::default());

        let failure = TransformFailure::new(
            TransformError::MissingAccessToken,
            ProjectTraceBatch::default(),
        );
        let err = forwarder
            .forward(ReportFormat::ThriftBinary, Err(failure))
            .await
            .unwrap_err();

        assert_eq!(err.transform_error(), Some(TransformError::MissingAccessToken));
        assert!(sink.batches.lock().is_empty());
        assert_eq!(telemetry.get(Counter::RequestsFailed, "thrift"), 1);
        assert_eq!(telemetry.get(Counter::RequestsProcessed, "thrift"), 0);
    }

    #[tokio::test]
    async fn test_sink_failure_is_propagated() {
        let (forwarder, _sink, telemetry) = forwarder_with(RecordingSink {
            fail_with: Some("queue full".into()),
            ..Default::default()
        });

        let err = forwarder
            .forward(ReportFormat::PbGrpc, Ok(translated()))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Sink(_)));
        assert_eq!(err.to_string(), "queue full");
        assert_eq!(telemetry.get(Counter::RequestsProcessed, "pbgrpc"), 1);
        assert_eq!(telemetry.get(Counter::RefusedSpans, "pbgrpc"), 2);
    }

    #[tokio::test]
    async fn test_reject_counts_failure() {
        let (forwarder, _sink, telemetry) = forwarder_with(RecordingSink::default());
        let err = forwarder.reject(
            ReportFormat::ThriftJson,
            IngestError::malformed("thrift-json", "expected value at line 1"),
        );
        assert!(err.to_string().starts_with("malformed thrift-json report"));
        assert_eq!(telemetry.get(Counter::RequestsFailed, "thrift"), 1);
    }
}
