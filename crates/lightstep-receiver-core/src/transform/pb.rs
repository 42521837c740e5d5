// v2 protobuf report → canonical batch

use super::{
    require_access_token, resolve_service_name, take_event_name, take_kind, take_status,
    SPANS_DROPPED_METRIC,
};
use crate::attributes::{map_attributes, RawValue};
use crate::error::TransformFailure;
use crate::ids::{SpanId, TraceId};
use crate::model::{Attributes, Event, ProjectTraceBatch, Span, Timestamp, TraceBatch};
use lightstep_receiver_proto::collectorpb::{
    key_value, metrics_sample, KeyValue, Log, ReportRequest,
};
use tracing::info;

/// Translate a v2 report.
///
/// Missing credentials or service identity reject the report. Attribute
/// values that are not valid UTF-8 are dropped and counted in
/// `non_utf8_attribute_count`.
pub fn transform_report(request: &ReportRequest) -> Result<ProjectTraceBatch, TransformFailure> {
    let access_token =
        require_access_token(request.auth.as_ref().map(|auth| auth.access_token.as_str()))?;

    let mut result = ProjectTraceBatch {
        access_token,
        ..Default::default()
    };

    let mut resource = Attributes::new();
    let reporter_tags = request
        .reporter
        .as_ref()
        .map(|reporter| reporter.tags.as_slice())
        .unwrap_or_default();
    let mut non_utf8 = map_key_values(reporter_tags, &mut resource);

    if let Err(error) = resolve_service_name(&mut resource, &mut result) {
        return Err(TransformFailure::new(error, result));
    }

    result.client_dropped_span_count = request
        .internal_metrics
        .iter()
        .flat_map(|metrics| metrics.counts.iter())
        .find(|sample| sample.name == SPANS_DROPPED_METRIC)
        .map_or(0, |sample| match sample.value {
            Some(metrics_sample::Value::IntValue(v)) => v,
            Some(metrics_sample::Value::DoubleValue(_)) | None => 0,
        });

    let mut spans = Vec::with_capacity(request.spans.len());
    for span in &request.spans {
        let context = span.span_context.clone().unwrap_or_default();

        let parent_span_id = match span.references.as_slice() {
            [only] => only
                .span_context
                .as_ref()
                .map(|parent| SpanId::from_u64(parent.span_id)),
            _ => None,
        };

        let start = span
            .start_timestamp
            .as_ref()
            .map(Timestamp::from_proto)
            .unwrap_or_default();

        let mut attributes = Attributes::new();
        non_utf8.extend(map_key_values(&span.tags, &mut attributes));
        let status = take_status(&mut attributes);
        let kind = take_kind(&mut attributes);

        let mut events = Vec::with_capacity(span.logs.len());
        for log in &span.logs {
            let (event, invalid) = convert_log(log);
            non_utf8.extend(invalid);
            events.push(event);
        }

        spans.push(Span {
            span_id: SpanId::from_u64(context.span_id),
            trace_id: TraceId::from_u64(context.trace_id),
            parent_span_id,
            name: span.operation_name.clone(),
            kind,
            start,
            end: start.add_micros(span.duration_micros),
            attributes,
            status,
            events,
        });
    }

    if !non_utf8.is_empty() {
        info!(
            service_name = %result.service_name,
            keys = ?non_utf8,
            "dropped attributes with non-UTF-8 values"
        );
    }
    result.non_utf8_attribute_count = non_utf8.len() as u64;
    result.batch = TraceBatch { resource, spans };
    Ok(result)
}

fn convert_log(log: &Log) -> (Event, Vec<String>) {
    let mut attributes = Attributes::new();
    let invalid = map_key_values(&log.fields, &mut attributes);
    let name = take_event_name(&mut attributes);
    let event = Event {
        timestamp: log
            .timestamp
            .as_ref()
            .map(Timestamp::from_proto)
            .unwrap_or_default(),
        name,
        attributes,
    };
    (event, invalid)
}

/// Map protobuf key/values, returning the keys dropped as non-UTF-8.
fn map_key_values(pairs: &[KeyValue], destination: &mut Attributes) -> Vec<String> {
    let raw = pairs.iter().filter_map(|kv| {
        let value = match kv.value.as_ref()? {
            key_value::Value::StringValue(bytes) => RawValue::Bytes(bytes),
            key_value::Value::IntValue(i) => RawValue::Int(*i),
            key_value::Value::DoubleValue(d) => RawValue::Double(*d),
            key_value::Value::BoolValue(b) => RawValue::Bool(*b),
            key_value::Value::JsonValue(json) => RawValue::Json(json),
        };
        Some((kv.key.as_str(), value))
    });

    match map_attributes(raw, destination) {
        Ok(()) => Vec::new(),
        Err(error) => error.keys,
    }
}
