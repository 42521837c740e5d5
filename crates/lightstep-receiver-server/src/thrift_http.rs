// HTTP front-end for v1 reports
//
// Two routes share one listener:
// - POST /_rpc/v1/reports/binary: a ReportingService.Report call in the
//   Thrift binary protocol
// - POST /api/v0/reports: the same request as JSON, optionally gzipped, with
//   the token in a header and the service name in runtime.group_name

use crate::forwarding::Forwarder;
use crate::http_server::HttpFrontEnd;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use flate2::read::GzDecoder;
use lightstep_receiver_config::HttpServerConfig;
use lightstep_receiver_core::attributes::COMPONENT_NAME_KEY;
use lightstep_receiver_core::transform;
use lightstep_receiver_core::{IngestError, ReportFormat, Timestamp};
use lightstep_receiver_proto::bounded::BoundedInputProtocol;
use lightstep_receiver_proto::collectorthrift::{
    read_call, write_exception, write_report_reply, Auth, IncomingCall, KeyValue, ReportRequest,
    ReportResponse, Timing, REPORT_METHOD,
};
use std::io::Read;
use thrift::protocol::TBinaryOutputProtocol;
use thrift::ApplicationErrorKind;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

pub const PROTOCOL: &str = "thrift";
pub const BINARY_REPORTS_PATH: &str = "/_rpc/v1/reports/binary";
pub const JSON_REPORTS_PATH: &str = "/api/v0/reports";
pub const ACCESS_TOKEN_HEADER: &str = "Lightstep-Access-Token";
const CONTENT_TYPE_THRIFT: &str = "application/x-thrift";

#[derive(Clone)]
struct ThriftState {
    forwarder: Forwarder,
    max_request_body_bytes: usize,
}

pub fn front_end(config: &HttpServerConfig, forwarder: Forwarder) -> HttpFrontEnd {
    HttpFrontEnd::new(
        PROTOCOL,
        config.endpoint.clone(),
        router(forwarder, config.max_request_body_bytes),
    )
}

pub fn router(forwarder: Forwarder, max_request_body_bytes: usize) -> Router {
    let state = ThriftState {
        forwarder,
        max_request_body_bytes,
    };
    Router::new()
        .route(BINARY_REPORTS_PATH, post(handle_binary_report))
        .route(JSON_REPORTS_PATH, post(handle_json_report))
        .layer(DefaultBodyLimit::max(max_request_body_bytes))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run one v1 report through the transform and the sink, producing the
/// response body for either encoding.
async fn report(
    forwarder: &Forwarder,
    format: ReportFormat,
    received: Timestamp,
    auth: Option<&Auth>,
    request: &ReportRequest,
) -> (ReportResponse, Result<usize, IngestError>) {
    let outcome = forwarder
        .forward(format, transform::thrift::transform_report(auth, request))
        .await;
    let response = ReportResponse {
        timing: Some(Timing {
            receive_micros: Some(received.as_unix_micros()),
            transmit_micros: Some(Timestamp::now().as_unix_micros()),
        }),
        errors: outcome.as_ref().err().map(|e| vec![e.to_string()]).unwrap_or_default(),
        ..Default::default()
    };
    (response, outcome)
}

async fn handle_binary_report(State(state): State<ThriftState>, body: Bytes) -> Response {
    let received = Timestamp::now();
    let format = ReportFormat::ThriftBinary;
    debug!(len = body.len(), "thrift binary message received");

    // Accepts both strict and non-strict message headers.
    let call = {
        let mut input = BoundedInputProtocol::new(&body);
        read_call(&mut input)
    };

    let mut buffer = Vec::new();
    let (status, written) = match call {
        Ok(IncomingCall::Report {
            sequence_number,
            args,
        }) => {
            let (response, outcome) = report(
                &state.forwarder,
                format,
                received,
                args.auth.as_ref(),
                &args.request,
            )
            .await;
            let status = if outcome.is_ok() {
                StatusCode::OK
            } else {
                StatusCode::BAD_REQUEST
            };
            let mut output = TBinaryOutputProtocol::new(&mut buffer, true);
            (status, write_report_reply(&mut output, sequence_number, response))
        }
        Ok(IncomingCall::Unknown {
            name,
            sequence_number,
        }) => {
            let error = state.forwarder.reject(
                format,
                IngestError::malformed(format.as_str(), format!("unknown method {}", name)),
            );
            let mut output = TBinaryOutputProtocol::new(&mut buffer, true);
            let written = write_exception(
                &mut output,
                &name,
                sequence_number,
                ApplicationErrorKind::UnknownMethod,
                error.to_string(),
            );
            (StatusCode::BAD_REQUEST, written)
        }
        Err(err) => {
            let error = state
                .forwarder
                .reject(format, IngestError::malformed(format.as_str(), err));
            let mut output = TBinaryOutputProtocol::new(&mut buffer, true);
            let written = write_exception(
                &mut output,
                REPORT_METHOD,
                0,
                ApplicationErrorKind::ProtocolError,
                error.to_string(),
            );
            (StatusCode::BAD_REQUEST, written)
        }
    };

    if let Err(err) = written {
        error!(error = %err, "failed to encode thrift response");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    (status, [(header::CONTENT_TYPE, CONTENT_TYPE_THRIFT)], buffer).into_response()
}

async fn handle_json_report(
    State(state): State<ThriftState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let received = Timestamp::now();
    let format = ReportFormat::ThriftJson;
    debug!(len = body.len(), "thrift json message received");

    let parsed = decode_body(&headers, &body, state.max_request_body_bytes).and_then(|raw| {
        serde_json::from_slice::<ReportRequest>(&raw)
            .map_err(|err| IngestError::malformed(format.as_str(), err))
    });
    let mut request = match parsed {
        Ok(request) => request,
        Err(error) => {
            let error = state.forwarder.reject(format, error);
            let response = ReportResponse {
                timing: Some(Timing {
                    receive_micros: Some(received.as_unix_micros()),
                    transmit_micros: Some(Timestamp::now().as_unix_micros()),
                }),
                errors: vec![error.to_string()],
                ..Default::default()
            };
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    // v0 clients send the service name as the runtime group name.
    if let Some(runtime) = request.runtime.as_mut() {
        if let Some(group_name) = runtime.group_name.clone() {
            runtime.attrs.push(KeyValue::new(COMPONENT_NAME_KEY, group_name));
        }
    }

    let token = headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let auth = Auth::with_token(token);

    let (response, outcome) = report(&state.forwarder, format, received, Some(&auth), &request).await;
    let status = if outcome.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(response)).into_response()
}

/// The request body, gunzipped when the client says so. Decompressed output
/// is held to the same size limit as the body itself.
fn decode_body(headers: &HeaderMap, body: &Bytes, limit: usize) -> Result<Vec<u8>, IngestError> {
    let gzipped = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|encoding| encoding.trim().eq_ignore_ascii_case("gzip"));
    if !gzipped {
        return Ok(body.to_vec());
    }

    let format = ReportFormat::ThriftJson.as_str();
    let mut raw = Vec::new();
    GzDecoder::new(&body[..])
        .take(limit as u64 + 1)
        .read_to_end(&mut raw)
        .map_err(|err| IngestError::malformed(format, format!("invalid gzip body: {}", err)))?;
    if raw.len() > limit {
        return Err(IngestError::malformed(
            format,
            format!("decompressed body exceeds {} bytes", limit),
        ));
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarding::tests::{forwarder_with, RecordingSink};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use lightstep_receiver_core::Counter;
    use lightstep_receiver_proto::collectorthrift::{
        read_report_reply, write_report_call, LogRecord, ReportArgs, Runtime, SpanRecord,
    };
    use std::io::Write;
    use thrift::protocol::TBinaryInputProtocol;
    use thrift::protocol::{TMessageIdentifier, TMessageType, TOutputProtocol, TStructIdentifier};
    use tower::ServiceExt;

    fn v1_request() -> ReportRequest {
        ReportRequest {
            runtime: Some(Runtime {
                guid: Some("4ad2f4fe1de2ec6a".into()),
                attrs: vec![KeyValue::new(COMPONENT_NAME_KEY, "legacy-web")],
                ..Default::default()
            }),
            span_records: vec![SpanRecord {
                span_guid: Some("1c5994087c3bf8be".into()),
                trace_guid: Some("1c5994087c3bf8be".into()),
                span_name: Some("render".into()),
                oldest_micros: Some(1_722_075_128_424_658),
                youngest_micros: Some(1_722_075_128_524_658),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn binary_call(method: Option<&str>, args: &ReportArgs) -> Vec<u8> {
        let mut buffer = Vec::new();
        let mut output = TBinaryOutputProtocol::new(&mut buffer, true);
        match method {
            None => write_report_call(&mut output, 9, args).unwrap(),
            Some(name) => {
                output
                    .write_message_begin(&TMessageIdentifier::new(name, TMessageType::Call, 9))
                    .unwrap();
                output.write_struct_begin(&TStructIdentifier::new("args")).unwrap();
                output.write_field_stop().unwrap();
                output.write_struct_end().unwrap();
                output.write_message_end().unwrap();
            }
        }
        buffer
    }

    async fn body_bytes(response: Response) -> Bytes {
        to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[tokio::test]
    async fn test_binary_report() {
        let (forwarder, sink, telemetry) = forwarder_with(RecordingSink::default());
        let app = router(forwarder, 1024 * 1024);
        let args = ReportArgs {
            auth: Some(Auth::with_token("token-1")),
            request: v1_request(),
        };

        let request = Request::post(BINARY_REPORTS_PATH)
            .header(header::CONTENT_TYPE, CONTENT_TYPE_THRIFT)
            .body(Body::from(binary_call(None, &args)))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], CONTENT_TYPE_THRIFT);
        let body = body_bytes(response).await;
        let mut input = TBinaryInputProtocol::new(&body[..], true);
        let reply = read_report_reply(&mut input).unwrap();
        assert!(reply.errors.is_empty());
        let timing = reply.timing.unwrap();
        assert!(timing.transmit_micros >= timing.receive_micros);

        let batches = sink.batches.lock();
        assert_eq!(batches[0].0.spans[0].name, "render");
        assert_eq!(batches[0].1.access_token(), "token-1");
        assert_eq!(telemetry.get(Counter::RequestsProcessed, PROTOCOL), 1);
    }

    #[tokio::test]
    async fn test_binary_report_without_auth() {
        let (forwarder, sink, telemetry) = forwarder_with(RecordingSink::default());
        let app = router(forwarder, 1024 * 1024);
        let args = ReportArgs {
            auth: None,
            request: v1_request(),
        };

        let request = Request::post(BINARY_REPORTS_PATH)
            .body(Body::from(binary_call(None, &args)))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_bytes(response).await;
        let mut input = TBinaryInputProtocol::new(&body[..], true);
        let reply = read_report_reply(&mut input).unwrap();
        assert_eq!(reply.errors, vec!["missing auth token".to_string()]);
        assert!(sink.batches.lock().is_empty());
        assert_eq!(telemetry.get(Counter::RequestsFailed, PROTOCOL), 1);
    }

    #[tokio::test]
    async fn test_unknown_method_is_an_exception() {
        let (forwarder, sink, telemetry) = forwarder_with(RecordingSink::default());
        let app = router(forwarder, 1024 * 1024);

        let request = Request::post(BINARY_REPORTS_PATH)
            .body(Body::from(binary_call(Some("Ping"), &ReportArgs::default())))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_bytes(response).await;
        let mut input = TBinaryInputProtocol::new(&body[..], true);
        match read_report_reply(&mut input) {
            Err(thrift::Error::Application(err)) => {
                assert_eq!(err.kind, ApplicationErrorKind::UnknownMethod)
            }
            other => panic!("expected application error, got {:?}", other),
        }
        assert!(sink.batches.lock().is_empty());
        assert_eq!(telemetry.get(Counter::RequestsFailed, PROTOCOL), 1);
    }

    #[tokio::test]
    async fn test_truncated_binary_is_protocol_error() {
        let (forwarder, _sink, telemetry) = forwarder_with(RecordingSink::default());
        let app = router(forwarder, 1024 * 1024);
        let mut call = binary_call(None, &ReportArgs::default());
        call.truncate(call.len() / 2);

        let request = Request::post(BINARY_REPORTS_PATH)
            .body(Body::from(call))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_bytes(response).await;
        let mut input = TBinaryInputProtocol::new(&body[..], true);
        match read_report_reply(&mut input) {
            Err(thrift::Error::Application(err)) => {
                assert_eq!(err.kind, ApplicationErrorKind::ProtocolError)
            }
            other => panic!("expected application error, got {:?}", other),
        }
        assert_eq!(telemetry.get(Counter::RequestsFailed, PROTOCOL), 1);
    }

    #[tokio::test]
    async fn test_negative_length_prefix_is_protocol_error() {
        let (forwarder, sink, telemetry) = forwarder_with(RecordingSink::default());
        let app = router(forwarder, 1024 * 1024);

        let request = Request::post(BINARY_REPORTS_PATH)
            .body(Body::from(vec![0x80, 0x01, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF]))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_bytes(response).await;
        let mut input = TBinaryInputProtocol::new(&body[..], true);
        match read_report_reply(&mut input) {
            Err(thrift::Error::Application(err)) => {
                assert_eq!(err.kind, ApplicationErrorKind::ProtocolError)
            }
            other => panic!("expected application error, got {:?}", other),
        }
        assert!(sink.batches.lock().is_empty());
        assert_eq!(telemetry.get(Counter::RequestsFailed, PROTOCOL), 1);
    }

    #[tokio::test]
    async fn test_binary_log_fields_reach_events() {
        let (forwarder, sink, _telemetry) = forwarder_with(RecordingSink::default());
        let app = router(forwarder, 1024 * 1024);
        let mut request = v1_request();
        request.span_records[0].log_records = vec![LogRecord {
            timestamp_micros: Some(1_722_075_128_500_000),
            fields: vec![
                KeyValue::new("event", "cache-miss"),
                KeyValue::new("key", "cart:42"),
            ],
        }];
        let args = ReportArgs {
            auth: Some(Auth::with_token("token-1")),
            request,
        };

        let request = Request::post(BINARY_REPORTS_PATH)
            .body(Body::from(binary_call(None, &args)))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let batches = sink.batches.lock();
        let event = &batches[0].0.spans[0].events[0];
        assert_eq!(event.name, "cache-miss");
        assert_eq!(event.attributes.get_str("key"), Some("cart:42"));
    }

    fn json_body() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "runtime": {
                "guid": "4ad2f4fe1de2ec6a",
                "group_name": "legacy-json",
                "attrs": [{"Key": "lightstep.tracer_platform", "Value": "ruby"}]
            },
            "span_records": [{
                "span_guid": "1c5994087c3bf8be",
                "trace_guid": "1c5994087c3bf8be",
                "span_name": "checkout",
                "oldest_micros": 1722075128424658i64,
                "youngest_micros": 1722075128524658i64,
                "attributes": [{"Key": "error", "Value": "true"}]
            }]
        }))
        .unwrap()
    }

    fn gzip(raw: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(raw).unwrap();
        encoder.finish().unwrap()
    }

    #[tokio::test]
    async fn test_gzipped_json_report() {
        let (forwarder, sink, telemetry) = forwarder_with(RecordingSink::default());
        let app = router(forwarder, 1024 * 1024);

        let request = Request::post(JSON_REPORTS_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_ENCODING, "gzip")
            .header(ACCESS_TOKEN_HEADER, "token-json")
            .body(Body::from(gzip(&json_body())))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let reply: ReportResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(reply.errors.is_empty());
        assert!(reply.timing.is_some());

        let batches = sink.batches.lock();
        let (batch, metadata) = &batches[0];
        assert_eq!(metadata.access_token(), "token-json");
        assert_eq!(batch.resource.get_str("service.name"), Some("legacy-json"));
        assert_eq!(
            batch.spans[0].status,
            lightstep_receiver_core::SpanStatus::Error
        );
        assert_eq!(telemetry.get(Counter::RequestsProcessed, PROTOCOL), 1);
    }

    #[tokio::test]
    async fn test_json_report_without_token_header() {
        let (forwarder, sink, _telemetry) = forwarder_with(RecordingSink::default());
        let app = router(forwarder, 1024 * 1024);

        let request = Request::post(JSON_REPORTS_PATH)
            .body(Body::from(json_body()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let reply: ReportResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(reply.errors, vec!["missing auth token".to_string()]);
        assert!(sink.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_and_gzip() {
        let (forwarder, _sink, telemetry) = forwarder_with(RecordingSink::default());
        let app = router(forwarder, 1024 * 1024);

        let request = Request::post(JSON_REPORTS_PATH)
            .header(ACCESS_TOKEN_HEADER, "t")
            .body(Body::from("{\"runtime\": "))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = Request::post(JSON_REPORTS_PATH)
            .header(header::CONTENT_ENCODING, "gzip")
            .header(ACCESS_TOKEN_HEADER, "t")
            .body(Body::from("not gzip at all"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let reply: ReportResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(reply.errors[0].contains("invalid gzip body"));

        assert_eq!(telemetry.get(Counter::RequestsFailed, PROTOCOL), 2);
    }

    #[test]
    fn test_decompressed_size_is_bounded() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_ENCODING, "gzip".parse().unwrap());
        let compressed = Bytes::from(gzip(&vec![b'a'; 4096]));

        assert_eq!(decode_body(&headers, &compressed, 4096).unwrap().len(), 4096);
        let err = decode_body(&headers, &compressed, 1024).unwrap_err();
        assert!(err.to_string().contains("decompressed body exceeds 1024 bytes"));
    }
}
