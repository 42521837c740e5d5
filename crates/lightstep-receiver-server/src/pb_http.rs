// HTTP front-end for binary v2 reports: POST /api/v2/reports

use crate::forwarding::Forwarder;
use crate::http_server::HttpFrontEnd;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use bytes::Bytes;
use lightstep_receiver_config::HttpServerConfig;
use lightstep_receiver_core::transform::pb;
use lightstep_receiver_core::{IngestError, ReportFormat, Timestamp};
use lightstep_receiver_proto::collectorpb::{ReportRequest, ReportResponse};
use prost::Message;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub const PROTOCOL: &str = "pbhttp";
pub const REPORTS_PATH: &str = "/api/v2/reports";
const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

pub fn front_end(config: &HttpServerConfig, forwarder: Forwarder) -> HttpFrontEnd {
    HttpFrontEnd::new(
        PROTOCOL,
        config.endpoint.clone(),
        router(forwarder, config.max_request_body_bytes),
    )
}

pub fn router(forwarder: Forwarder, max_request_body_bytes: usize) -> Router {
    Router::new()
        .route(REPORTS_PATH, post(handle_report))
        .layer(DefaultBodyLimit::max(max_request_body_bytes))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(forwarder)
}

async fn handle_report(State(forwarder): State<Forwarder>, body: Bytes) -> Response {
    let received = Timestamp::now();
    debug!(len = body.len(), "pb http message received");

    let outcome = match ReportRequest::decode(body) {
        Ok(request) => {
            forwarder
                .forward(ReportFormat::PbHttp, pb::transform_report(&request))
                .await
        }
        Err(err) => Err(forwarder.reject(
            ReportFormat::PbHttp,
            IngestError::malformed(ReportFormat::PbHttp.as_str(), err),
        )),
    };

    let mut response = ReportResponse {
        receive_timestamp: Some(received.to_proto()),
        ..Default::default()
    };
    let status = match outcome {
        Ok(_) => StatusCode::OK,
        Err(error) => {
            response.errors.push(error.to_string());
            StatusCode::BAD_REQUEST
        }
    };
    response.transmit_timestamp = Some(Timestamp::now().to_proto());

    (
        status,
        [(header::CONTENT_TYPE, CONTENT_TYPE_OCTET_STREAM)],
        response.encode_to_vec(),
    )
        .into_response()
}
