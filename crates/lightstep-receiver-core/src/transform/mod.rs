// Report transforms
//
// `pb` translates v2 protobuf reports, `thrift` translates v1 Thrift reports.
// Both are pure functions of their input and share the resolution rules below.

use crate::attributes::COMPONENT_NAME_KEY;
use crate::error::{TransformError, TransformFailure};
use crate::model::{Attributes, ProjectTraceBatch, SpanKind, SpanStatus};

pub mod pb;
pub mod thrift;

pub const SERVICE_NAME_KEY: &str = "service.name";
pub const ERROR_KEY: &str = "error";
pub const EVENT_KEY: &str = "event";
pub const SPAN_KIND_KEY: &str = "span.kind";
pub const PARENT_SPAN_GUID_KEY: &str = "parent_span_guid";
pub const SPANS_DROPPED_METRIC: &str = "spans.dropped";

fn require_access_token(token: Option<&str>) -> Result<String, TransformFailure> {
    match token {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(TransformFailure::new(
            TransformError::MissingAccessToken,
            ProjectTraceBatch::default(),
        )),
    }
}

/// Resolve the service name from the component-name attribute and add the
/// `service.name` alias. `partial.service_name` is set even on failure.
fn resolve_service_name(
    resource: &mut Attributes,
    partial: &mut ProjectTraceBatch,
) -> Result<(), TransformError> {
    let service_name = resource
        .get(COMPONENT_NAME_KEY)
        .map(|value| value.to_string())
        .unwrap_or_default();
    partial.service_name = service_name.clone();
    if service_name.is_empty() {
        return Err(TransformError::MissingServiceName);
    }
    resource.insert(SERVICE_NAME_KEY, service_name);
    Ok(())
}

/// Consume the `error` attribute.
fn take_status(attributes: &mut Attributes) -> SpanStatus {
    match attributes.remove(ERROR_KEY) {
        Some(value) if value.is_truthy() => SpanStatus::Error,
        _ => SpanStatus::Unset,
    }
}

/// Consume a recognised `span.kind` attribute; others stay in place.
fn take_kind(attributes: &mut Attributes) -> SpanKind {
    let Some(kind) = attributes.get_str(SPAN_KIND_KEY).and_then(SpanKind::from_tag) else {
        return SpanKind::Unspecified;
    };
    attributes.remove(SPAN_KIND_KEY);
    kind
}

/// Consume the `event` attribute as the event name.
fn take_event_name(attributes: &mut Attributes) -> String {
    attributes
        .remove(EVENT_KEY)
        .map(|value| value.to_string())
        .unwrap_or_default()
}
