// Canonical trace model
//
// Every wire format is translated into these types. They are built fresh per
// request and handed to the trace sink by value.

use crate::ids::{SpanId, TraceId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// Nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const UNIX_EPOCH: Timestamp = Timestamp(0);

    pub fn from_unix_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Negative inputs clamp to the epoch.
    pub fn from_unix_micros(micros: i64) -> Self {
        let micros = u64::try_from(micros).unwrap_or(0);
        Self(micros.saturating_mul(1_000))
    }

    pub fn from_proto(ts: &prost_types::Timestamp) -> Self {
        let seconds = u64::try_from(ts.seconds).unwrap_or(0);
        let nanos = u64::try_from(ts.nanos).unwrap_or(0);
        Self(seconds.saturating_mul(1_000_000_000).saturating_add(nanos))
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_nanos_opt().map_or(0, |n| u64::try_from(n).unwrap_or(0)))
    }

    pub fn add_micros(self, micros: u64) -> Self {
        Self(self.0.saturating_add(micros.saturating_mul(1_000)))
    }

    pub fn as_unix_nanos(&self) -> u64 {
        self.0
    }

    pub fn as_unix_micros(&self) -> i64 {
        i64::try_from(self.0 / 1_000).unwrap_or(i64::MAX)
    }

    pub fn to_proto(&self) -> prost_types::Timestamp {
        prost_types::Timestamp {
            seconds: (self.0 / 1_000_000_000) as i64,
            nanos: (self.0 % 1_000_000_000) as i32,
        }
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(i64::try_from(self.0).unwrap_or(i64::MAX))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    Int(i64),
    Double(f64),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// `true` for boolean true or the string "true" in any case.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttributeValue::Bool(b) => *b,
            AttributeValue::String(s) => s.eq_ignore_ascii_case("true"),
            AttributeValue::Int(_) | AttributeValue::Double(_) => false,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Double(d) => write!(f, "{}", d),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

/// Attribute map with unique keys; a repeated key overwrites the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, AttributeValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttributeValue::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, AttributeValue> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a String, &'a AttributeValue);
    type IntoIter = btree_map::Iter<'a, String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    #[default]
    Unspecified,
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    /// Kind named by a legacy `span.kind` tag, if it names one.
    pub fn from_tag(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "internal" => Some(SpanKind::Internal),
            "server" => Some(SpanKind::Server),
            "client" => Some(SpanKind::Client),
            "producer" => Some(SpanKind::Producer),
            "consumer" => Some(SpanKind::Consumer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    #[default]
    Unset,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Event {
    pub timestamp: Timestamp,
    pub name: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Span {
    pub span_id: SpanId,
    pub trace_id: TraceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<SpanId>,
    pub name: String,
    pub kind: SpanKind,
    pub start: Timestamp,
    pub end: Timestamp,
    pub attributes: Attributes,
    pub status: SpanStatus,
    pub events: Vec<Event>,
}

/// One resource and the spans reported under it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceBatch {
    pub resource: Attributes,
    pub spans: Vec<Span>,
}

impl TraceBatch {
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }
}

/// Result of translating one report: the batch plus the request identity
/// it was reported under.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectTraceBatch {
    pub access_token: String,
    pub service_name: String,
    pub client_dropped_span_count: i64,
    /// Attribute keys dropped because their string value was not valid UTF-8.
    pub non_utf8_attribute_count: u64,
    pub batch: TraceBatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_from_micros() {
        let ts = Timestamp::from_unix_micros(1_722_075_128_424_658);
        assert_eq!(ts.as_unix_nanos(), 1_722_075_128_424_658_000);
        assert_eq!(
            ts.to_datetime().to_rfc3339(),
            "2024-07-27T10:12:08.424658+00:00"
        );
        assert_eq!(Timestamp::from_unix_micros(-5), Timestamp::UNIX_EPOCH);
    }

    #[test]
    fn test_timestamp_proto_and_duration() {
        let start = Timestamp::from_proto(&prost_types::Timestamp {
            seconds: 1_718_207_928,
            nanos: 350_615_000,
        });
        assert_eq!(start.add_micros(100).as_unix_nanos(), 1_718_207_928_350_715_000);
        assert_eq!(
            Timestamp::from_proto(&start.to_proto()),
            start
        );
    }

    #[test]
    fn test_attributes_last_write_wins() {
        let mut attrs = Attributes::new();
        attrs.insert("k", "first");
        attrs.insert("k", 7i64);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get("k"), Some(&AttributeValue::Int(7)));
    }

    #[test]
    fn test_truthy_values() {
        assert!(AttributeValue::Bool(true).is_truthy());
        assert!(AttributeValue::from("TRUE").is_truthy());
        assert!(!AttributeValue::Bool(false).is_truthy());
        assert!(!AttributeValue::Int(1).is_truthy());
    }

    #[test]
    fn test_span_kind_from_tag() {
        assert_eq!(SpanKind::from_tag("client"), Some(SpanKind::Client));
        assert_eq!(SpanKind::from_tag("Server"), Some(SpanKind::Server));
        assert_eq!(SpanKind::from_tag("rpc"), None);
    }
}
