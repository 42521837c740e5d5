// gRPC front-end: lightstep.collector.CollectorService/Report

use crate::forwarding::Forwarder;
use crate::lifecycle::{FrontEnd, Host, ListenerTask};
use anyhow::{Context, Result};
use async_trait::async_trait;
use lightstep_receiver_config::GrpcServerConfig;
use lightstep_receiver_core::transform::pb;
use lightstep_receiver_core::{IngestError, ReportFormat, Timestamp, TransformError};
use lightstep_receiver_proto::collectorpb::collector_service_server::{
    CollectorService, CollectorServiceServer,
};
use lightstep_receiver_proto::collectorpb::{ReportRequest, ReportResponse};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Code, Request, Response, Status};
use tracing::debug;

pub const PROTOCOL: &str = "pbgrpc";

/// `CollectorService` implementation backed by the v2 transform.
#[derive(Clone)]
pub struct CollectorGrpcService {
    forwarder: Forwarder,
}

impl CollectorGrpcService {
    pub fn new(forwarder: Forwarder) -> Self {
        Self { forwarder }
    }
}

#[tonic::async_trait]
impl CollectorService for CollectorGrpcService {
    async fn report(
        &self,
        request: Request<ReportRequest>,
    ) -> Result<Response<ReportResponse>, Status> {
        let received = Timestamp::now();
        let report = request.into_inner();
        debug!(spans = report.spans.len(), "received gRPC report");

        let result = pb::transform_report(&report);
        self.forwarder
            .forward(ReportFormat::PbGrpc, result)
            .await
            .map_err(|error| status_from_error(&error))?;

        Ok(Response::new(ReportResponse {
            receive_timestamp: Some(received.to_proto()),
            transmit_timestamp: Some(Timestamp::now().to_proto()),
            ..Default::default()
        }))
    }
}

/// Map an ingestion failure to the status returned to the client.
pub fn status_from_error(error: &IngestError) -> Status {
    let code = match error {
        IngestError::Transform(failure) => match failure.error {
            TransformError::MissingAccessToken => Code::Unauthenticated,
            TransformError::MissingServiceName => Code::InvalidArgument,
        },
        IngestError::MalformedInput { .. } => Code::InvalidArgument,
        IngestError::Sink(_) => Code::Unknown,
    };
    Status::new(code, error.to_string())
}

pub struct GrpcFrontEnd {
    config: GrpcServerConfig,
    forwarder: Forwarder,
    listener: Option<ListenerTask>,
}

impl GrpcFrontEnd {
    pub fn new(config: GrpcServerConfig, forwarder: Forwarder) -> Self {
        Self {
            config,
            forwarder,
            listener: None,
        }
    }
}

#[async_trait]
impl FrontEnd for GrpcFrontEnd {
    fn name(&self) -> &'static str {
        PROTOCOL
    }

    async fn start(&mut self, host: Arc<dyn Host>) -> Result<()> {
        let endpoint = &self.config.endpoint;
        let listener = tokio::net::TcpListener::bind(endpoint)
            .await
            .with_context(|| format!("Failed to bind to {}", endpoint))?;
        let local_addr = listener.local_addr()?;

        let service = CollectorServiceServer::new(CollectorGrpcService::new(self.forwarder.clone()))
            .max_decoding_message_size(self.config.max_recv_msg_size_bytes());

        self.listener = Some(ListenerTask::spawn(
            PROTOCOL,
            local_addr,
            host,
            move |shutdown| async move {
                tonic::transport::Server::builder()
                    .add_service(service)
                    .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                        let _ = shutdown.await;
                    })
                    .await
                    .context("gRPC server error")
            },
        ));
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Some(listener) = self.listener.take() {
            listener.stop().await?;
        }
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(|listener| listener.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarding::tests::{forwarder_with, RecordingSink};
    use lightstep_receiver_core::{Counter, ProjectTraceBatch, SinkError, TransformFailure};
    use lightstep_receiver_proto::collectorpb::{key_value, Auth, KeyValue, Reporter, Span, SpanContext};

    fn report(token: &str) -> ReportRequest {
        ReportRequest {
            auth: Some(Auth {
                access_token: token.into(),
            }),
            reporter: Some(Reporter {
                reporter_id: 7,
                tags: vec![KeyValue {
                    key: "lightstep.component_name".into(),
                    value: Some(key_value::Value::StringValue(b"checkout".to_vec())),
                }],
            }),
            spans: vec![Span {
                span_context: Some(SpanContext {
                    trace_id: 1,
                    span_id: 2,
                    ..Default::default()
                }),
                operation_name: "GET /cart".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_report_success_carries_timing() {
        let (forwarder, sink, telemetry) = forwarder_with(RecordingSink::default());
        let service = CollectorGrpcService::new(forwarder);

        let response = service
            .report(Request::new(report("token-1")))
            .await
            .unwrap()
            .into_inner();

        assert!(response.errors.is_empty());
        let received = response.receive_timestamp.unwrap();
        let transmitted = response.transmit_timestamp.unwrap();
        assert!((transmitted.seconds, transmitted.nanos) >= (received.seconds, received.nanos));
        assert_eq!(sink.batches.lock().len(), 1);
        assert_eq!(telemetry.get(Counter::RequestsProcessed, PROTOCOL), 1);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthenticated() {
        let (forwarder, sink, telemetry) = forwarder_with(RecordingSink::default());
        let service = CollectorGrpcService::new(forwarder);

        let status = service.report(Request::new(report(""))).await.unwrap_err();

        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(status.message(), "missing auth token");
        assert!(sink.batches.lock().is_empty());
        assert_eq!(telemetry.get(Counter::RequestsFailed, PROTOCOL), 1);
    }

    #[test]
    fn test_status_mapping() {
        let missing_service = IngestError::from(TransformFailure::new(
            TransformError::MissingServiceName,
            ProjectTraceBatch::default(),
        ));
        assert_eq!(status_from_error(&missing_service).code(), Code::InvalidArgument);

        let malformed = IngestError::malformed("pbgrpc", "buffer underflow");
        assert_eq!(status_from_error(&malformed).code(), Code::InvalidArgument);

        let sink = IngestError::from(SinkError::new("downstream unavailable"));
        let status = status_from_error(&sink);
        assert_eq!(status.code(), Code::Unknown);
        assert_eq!(status.message(), "downstream unavailable");
    }
}
