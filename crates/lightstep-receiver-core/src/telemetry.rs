// Receiver telemetry
//
// Per-transport request counters and per-service dropped-span counters.
// Front-ends only see the `Telemetry` trait; `NoopTelemetry` stands in when
// nothing is configured.

use metrics::counter;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Transport {
    PbGrpc,
    PbHttp,
    Thrift,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::PbGrpc => "pbgrpc",
            Transport::PbHttp => "pbhttp",
            Transport::Thrift => "thrift",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Telemetry: Send + Sync {
    fn increment_processed(&self, transport: Transport);

    fn increment_failed(&self, transport: Transport);

    fn increment_non_utf8(&self, transport: Transport, count: u64);

    fn increment_dropped_spans(&self, service_name: &str, count: i64);

    /// Spans accepted or refused by the sink for one request.
    fn record_span_outcome(
        &self,
        _transport: Transport,
        _format: &'static str,
        _spans: usize,
        _accepted: bool,
    ) {
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn increment_processed(&self, _transport: Transport) {}

    fn increment_failed(&self, _transport: Transport) {}

    fn increment_non_utf8(&self, _transport: Transport, _count: u64) {}

    fn increment_dropped_spans(&self, _service_name: &str, _count: i64) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Counter {
    RequestsProcessed,
    RequestsFailed,
    NonUtf8Attributes,
    ClientSpansDropped,
    AcceptedSpans,
    RefusedSpans,
}

impl Counter {
    pub fn metric_name(&self) -> &'static str {
        match self {
            Counter::RequestsProcessed => "lightstep_receiver_requests_processed",
            Counter::RequestsFailed => "lightstep_receiver_requests_failed",
            Counter::NonUtf8Attributes => "lightstep_receiver_non_utf8_attributes_received",
            Counter::ClientSpansDropped => "lightstep_receiver_client_spans_dropped",
            Counter::AcceptedSpans => "lightstep_receiver_accepted_spans",
            Counter::RefusedSpans => "lightstep_receiver_refused_spans",
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            Counter::ClientSpansDropped => "for.service.name",
            _ => "transport",
        }
    }
}

/// Concurrent counter registry keyed by counter and label value.
///
/// Every increment is mirrored to the `metrics` facade, so whichever
/// recorder the process installs sees the same series.
#[derive(Debug, Default)]
pub struct ReceiverTelemetry {
    cells: RwLock<HashMap<(Counter, String), Arc<AtomicU64>>>,
}

impl ReceiverTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter; zero if it was never incremented.
    pub fn get(&self, counter: Counter, label: &str) -> u64 {
        self.cells
            .read()
            .get(&(counter, label.to_string()))
            .map_or(0, |cell| cell.load(Ordering::Relaxed))
    }

    /// All counters, sorted by counter then label.
    pub fn snapshot(&self) -> Vec<(Counter, String, u64)> {
        let mut out: Vec<_> = self
            .cells
            .read()
            .iter()
            .map(|((counter, label), cell)| (*counter, label.clone(), cell.load(Ordering::Relaxed)))
            .collect();
        out.sort();
        out
    }

    fn add(&self, counter: Counter, label: &str, value: u64) {
        self.cell(counter, label).fetch_add(value, Ordering::Relaxed);
        counter!(counter.metric_name(), counter.label_key() => label.to_string()).increment(value);
    }

    fn cell(&self, counter: Counter, label: &str) -> Arc<AtomicU64> {
        let key = (counter, label.to_string());
        if let Some(cell) = self.cells.read().get(&key) {
            return Arc::clone(cell);
        }
        Arc::clone(self.cells.write().entry(key).or_default())
    }
}

impl Telemetry for ReceiverTelemetry {
    fn increment_processed(&self, transport: Transport) {
        self.add(Counter::RequestsProcessed, transport.as_str(), 1);
    }

    fn increment_failed(&self, transport: Transport) {
        self.add(Counter::RequestsFailed, transport.as_str(), 1);
    }

    fn increment_non_utf8(&self, transport: Transport, count: u64) {
        self.add(Counter::NonUtf8Attributes, transport.as_str(), count);
    }

    fn increment_dropped_spans(&self, service_name: &str, count: i64) {
        // Negative client counts carry no information for a monotonic counter.
        let count = u64::try_from(count).unwrap_or(0);
        self.add(Counter::ClientSpansDropped, service_name, count);
    }

    fn record_span_outcome(
        &self,
        transport: Transport,
        format: &'static str,
        spans: usize,
        accepted: bool,
    ) {
        let counter = if accepted {
            Counter::AcceptedSpans
        } else {
            Counter::RefusedSpans
        };
        let spans = spans as u64;
        self.cell(counter, transport.as_str())
            .fetch_add(spans, Ordering::Relaxed);
        counter!(
            counter.metric_name(),
            "transport" => transport.as_str(),
            "format" => format
        )
        .increment(spans);
    }
}
