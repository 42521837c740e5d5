// lightstep-receiver-core - Translation engine for Lightstep legacy reports
//
// Pure processing logic: wire-format requests in, canonical trace batches
// out. No sockets and no runtime here; the only async seam is the
// `TraceSink` trait that front-ends hand batches to.
//
// Layout:
// - ids / attributes: the two leaf converters every transform shares
// - transform::pb / transform::thrift: one transform per wire schema
// - telemetry / sink: interfaces injected by the server crate

pub mod attributes;
pub mod error;
pub mod ids;
pub mod model;
pub mod sink;
pub mod telemetry;
pub mod transform;

pub use error::{IngestError, NonUtf8AttributeError, TransformError, TransformFailure};
pub use ids::{SpanId, TraceId};
pub use model::{
    AttributeValue, Attributes, Event, ProjectTraceBatch, Span, SpanKind, SpanStatus, Timestamp,
    TraceBatch,
};
pub use sink::{RequestMetadata, SinkError, TraceSink, ACCESS_TOKEN_METADATA_KEY};
pub use telemetry::{Counter, NoopTelemetry, ReceiverTelemetry, Telemetry, Transport};

/// Wire format a batch was decoded from, as attached to logs and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    PbGrpc,
    PbHttp,
    ThriftBinary,
    ThriftJson,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::PbGrpc => "pbgrpc",
            ReportFormat::PbHttp => "pbhttp",
            ReportFormat::ThriftBinary => "thrift-binary",
            ReportFormat::ThriftJson => "thrift-json",
        }
    }

    pub fn transport(&self) -> Transport {
        match self {
            ReportFormat::PbGrpc => Transport::PbGrpc,
            ReportFormat::PbHttp => Transport::PbHttp,
            ReportFormat::ThriftBinary | ReportFormat::ThriftJson => Transport::Thrift,
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
