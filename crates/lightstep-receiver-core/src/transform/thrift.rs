// v1 Thrift report → canonical batch
//
// Thrift strings reach us already decoded, so attributes go through the
// namespace filter only; nothing is counted as non-UTF-8 on this path.

use super::{
    require_access_token, resolve_service_name, take_event_name, take_kind, take_status,
    PARENT_SPAN_GUID_KEY, SPANS_DROPPED_METRIC,
};
use crate::attributes::copy_text_attributes;
use crate::error::TransformFailure;
use crate::ids::{SpanId, TraceId};
use crate::model::{
    Attributes, Event, ProjectTraceBatch, Span, SpanStatus, Timestamp, TraceBatch,
};
use lightstep_receiver_proto::collectorthrift::{Auth, KeyValue, LogRecord, ReportRequest};

/// Translate a v1 report. The credentials arrive out-of-band, next to the
/// report rather than inside it.
pub fn transform_report(
    auth: Option<&Auth>,
    request: &ReportRequest,
) -> Result<ProjectTraceBatch, TransformFailure> {
    let access_token =
        require_access_token(auth.and_then(|auth| auth.access_token.as_deref()))?;

    let mut result = ProjectTraceBatch {
        access_token,
        ..Default::default()
    };

    let mut resource = Attributes::new();
    if let Some(runtime) = &request.runtime {
        copy_key_values(&runtime.attrs, &mut resource);
    }

    if let Err(error) = resolve_service_name(&mut resource, &mut result) {
        return Err(TransformFailure::new(error, result));
    }

    result.client_dropped_span_count = request
        .internal_metrics
        .iter()
        .flat_map(|metrics| metrics.counts.iter())
        .find(|sample| sample.name == SPANS_DROPPED_METRIC)
        .and_then(|sample| sample.int64_value)
        .unwrap_or(0);

    let spans = request
        .span_records
        .iter()
        .map(|record| {
            let mut attributes = Attributes::new();
            copy_key_values(&record.attributes, &mut attributes);

            let parent_span_id = attributes
                .remove(PARENT_SPAN_GUID_KEY)
                .map(|guid| SpanId::from_hex(&guid.to_string()));

            let mut status = take_status(&mut attributes);
            if record.error_flag == Some(true) {
                status = SpanStatus::Error;
            }
            let kind = take_kind(&mut attributes);

            Span {
                span_id: SpanId::from_hex(record.span_guid.as_deref().unwrap_or_default()),
                trace_id: TraceId::from_hex(record.trace_guid.as_deref().unwrap_or_default()),
                parent_span_id,
                name: record.span_name.clone().unwrap_or_default(),
                kind,
                start: Timestamp::from_unix_micros(record.oldest_micros.unwrap_or_default()),
                end: Timestamp::from_unix_micros(record.youngest_micros.unwrap_or_default()),
                attributes,
                status,
                events: record.log_records.iter().map(convert_log).collect(),
            }
        })
        .collect();

    result.batch = TraceBatch { resource, spans };
    Ok(result)
}

fn convert_log(log: &LogRecord) -> Event {
    let mut attributes = Attributes::new();
    copy_key_values(&log.fields, &mut attributes);
    Event {
        timestamp: Timestamp::from_unix_micros(log.timestamp_micros.unwrap_or_default()),
        name: take_event_name(&mut attributes),
        attributes,
    }
}

fn copy_key_values(pairs: &[KeyValue], destination: &mut Attributes) {
    copy_text_attributes(
        pairs.iter().map(|kv| (kv.key.as_str(), kv.value.as_str())),
        destination,
    );
}
