//! Thrift definitions of the v1 (`crouton`) collector protocol.
//!
//! Only the binary protocol is spoken here. The structs also derive serde so
//! the same types decode the legacy `/api/v0/reports` JSON body, whose field
//! names follow the Thrift IDL (`Key`/`Value` on key-value pairs, snake_case
//! elsewhere).

use serde::{Deserialize, Deserializer, Serialize};
use thrift::protocol::{
    field_id, TFieldIdentifier, TInputProtocol, TListIdentifier, TMessageIdentifier,
    TMessageType, TOutputProtocol, TStructIdentifier, TType,
};
use thrift::{ApplicationError, ApplicationErrorKind};

/// Name of the single RPC exposed by the `ReportingService`.
pub const REPORT_METHOD: &str = "Report";

/// Binary-protocol encoding of a Thrift struct.
pub trait ThriftStruct: Sized {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self>;
    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    #[serde(rename = "Key", default)]
    pub key: String,
    #[serde(rename = "Value", default)]
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl ThriftStruct for KeyValue {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = KeyValue::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::String) => out.key = read_string(i_prot)?,
                (2, TType::String) => out.value = read_string(i_prot)?,
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("KeyValue"))?;
        write_string_field(o_prot, "Key", 1, &self.key)?;
        write_string_field(o_prot, "Value", 2, &self.value)?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Runtime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_micros: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub attrs: Vec<KeyValue>,
}

impl ThriftStruct for Runtime {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = Runtime::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::String) => out.guid = Some(read_string(i_prot)?),
                (2, TType::I64) => out.start_micros = Some(i_prot.read_i64()?),
                (3, TType::String) => out.group_name = Some(read_string(i_prot)?),
                (4, TType::List) => out.attrs = read_list(i_prot, KeyValue::read)?,
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Runtime"))?;
        if let Some(guid) = &self.guid {
            write_string_field(o_prot, "guid", 1, guid)?;
        }
        if let Some(start) = self.start_micros {
            write_i64_field(o_prot, "start_micros", 2, start)?;
        }
        if let Some(group) = &self.group_name {
            write_string_field(o_prot, "group_name", 3, group)?;
        }
        write_struct_list_field(o_prot, "attrs", 4, &self.attrs)?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_micros: Option<i64>,
    #[serde(deserialize_with = "null_as_empty")]
    pub fields: Vec<KeyValue>,
}

impl ThriftStruct for LogRecord {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = LogRecord::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::I64) => out.timestamp_micros = Some(i_prot.read_i64()?),
                (13, TType::List) => out.fields = read_list(i_prot, KeyValue::read)?,
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("LogRecord"))?;
        if let Some(ts) = self.timestamp_micros {
            write_i64_field(o_prot, "timestamp_micros", 1, ts)?;
        }
        write_struct_list_field(o_prot, "fields", 13, &self.fields)?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceJoinId {
    #[serde(rename = "TraceKey")]
    pub trace_key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl ThriftStruct for TraceJoinId {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = TraceJoinId::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::String) => out.trace_key = read_string(i_prot)?,
                (2, TType::String) => out.value = read_string(i_prot)?,
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("TraceJoinId"))?;
        write_string_field(o_prot, "TraceKey", 1, &self.trace_key)?;
        write_string_field(o_prot, "Value", 2, &self.value)?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_name: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub join_ids: Vec<TraceJoinId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_micros: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youngest_micros: Option<i64>,
    #[serde(deserialize_with = "null_as_empty")]
    pub attributes: Vec<KeyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_flag: Option<bool>,
    #[serde(deserialize_with = "null_as_empty")]
    pub log_records: Vec<LogRecord>,
}

impl ThriftStruct for SpanRecord {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = SpanRecord::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::String) => out.span_guid = Some(read_string(i_prot)?),
                (2, TType::String) => out.runtime_guid = Some(read_string(i_prot)?),
                (3, TType::String) => out.span_name = Some(read_string(i_prot)?),
                (4, TType::List) => out.join_ids = read_list(i_prot, TraceJoinId::read)?,
                (5, TType::I64) => out.oldest_micros = Some(i_prot.read_i64()?),
                (6, TType::I64) => out.youngest_micros = Some(i_prot.read_i64()?),
                (8, TType::List) => out.attributes = read_list(i_prot, KeyValue::read)?,
                (9, TType::Bool) => out.error_flag = Some(i_prot.read_bool()?),
                (10, TType::List) => out.log_records = read_list(i_prot, LogRecord::read)?,
                (11, TType::String) => out.trace_guid = Some(read_string(i_prot)?),
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("SpanRecord"))?;
        if let Some(guid) = &self.span_guid {
            write_string_field(o_prot, "span_guid", 1, guid)?;
        }
        if let Some(guid) = &self.runtime_guid {
            write_string_field(o_prot, "runtime_guid", 2, guid)?;
        }
        if let Some(name) = &self.span_name {
            write_string_field(o_prot, "span_name", 3, name)?;
        }
        write_struct_list_field(o_prot, "join_ids", 4, &self.join_ids)?;
        if let Some(oldest) = self.oldest_micros {
            write_i64_field(o_prot, "oldest_micros", 5, oldest)?;
        }
        if let Some(youngest) = self.youngest_micros {
            write_i64_field(o_prot, "youngest_micros", 6, youngest)?;
        }
        write_struct_list_field(o_prot, "attributes", 8, &self.attributes)?;
        if let Some(flag) = self.error_flag {
            o_prot.write_field_begin(&TFieldIdentifier::new("error_flag", TType::Bool, 9))?;
            o_prot.write_bool(flag)?;
            o_prot.write_field_end()?;
        }
        write_struct_list_field(o_prot, "log_records", 10, &self.log_records)?;
        if let Some(guid) = &self.trace_guid {
            write_string_field(o_prot, "trace_guid", 11, guid)?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Auth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Auth {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
        }
    }
}

impl ThriftStruct for Auth {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = Auth::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::String) => out.access_token = Some(read_string(i_prot)?),
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Auth"))?;
        if let Some(token) = &self.access_token {
            write_string_field(o_prot, "access_token", 1, token)?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_micros: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmit_micros: Option<i64>,
}

impl ThriftStruct for Timing {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = Timing::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::I64) => out.receive_micros = Some(i_prot.read_i64()?),
                (2, TType::I64) => out.transmit_micros = Some(i_prot.read_i64()?),
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Timing"))?;
        if let Some(receive) = self.receive_micros {
            write_i64_field(o_prot, "receive_micros", 1, receive)?;
        }
        if let Some(transmit) = self.transmit_micros {
            write_i64_field(o_prot, "transmit_micros", 2, transmit)?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSample {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub int64_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_value: Option<f64>,
}

impl ThriftStruct for MetricsSample {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = MetricsSample::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::String) => out.name = read_string(i_prot)?,
                (2, TType::I64) => out.int64_value = Some(i_prot.read_i64()?),
                (3, TType::Double) => out.double_value = Some(i_prot.read_double()?),
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("MetricsSample"))?;
        write_string_field(o_prot, "name", 1, &self.name)?;
        if let Some(value) = self.int64_value {
            write_i64_field(o_prot, "int64_value", 2, value)?;
        }
        if let Some(value) = self.double_value {
            o_prot.write_field_begin(&TFieldIdentifier::new("double_value", TType::Double, 3))?;
            o_prot.write_double(value)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    #[serde(deserialize_with = "null_as_empty")]
    pub counts: Vec<MetricsSample>,
    #[serde(deserialize_with = "null_as_empty")]
    pub gauges: Vec<MetricsSample>,
}

impl ThriftStruct for Metrics {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = Metrics::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::List) => out.counts = read_list(i_prot, MetricsSample::read)?,
                (2, TType::List) => out.gauges = read_list(i_prot, MetricsSample::read)?,
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Metrics"))?;
        write_struct_list_field(o_prot, "counts", 1, &self.counts)?;
        write_struct_list_field(o_prot, "gauges", 2, &self.gauges)?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,
    #[serde(deserialize_with = "null_as_empty")]
    pub span_records: Vec<SpanRecord>,
    #[serde(deserialize_with = "null_as_empty")]
    pub log_records: Vec<LogRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_offset_micros: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_micros: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youngest_micros: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_metrics: Option<Metrics>,
}

impl ThriftStruct for ReportRequest {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = ReportRequest::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::Struct) => out.runtime = Some(Runtime::read(i_prot)?),
                (3, TType::List) => out.span_records = read_list(i_prot, SpanRecord::read)?,
                (4, TType::List) => out.log_records = read_list(i_prot, LogRecord::read)?,
                (5, TType::I64) => out.timestamp_offset_micros = Some(i_prot.read_i64()?),
                (6, TType::I64) => out.oldest_micros = Some(i_prot.read_i64()?),
                (7, TType::I64) => out.youngest_micros = Some(i_prot.read_i64()?),
                (10, TType::Struct) => out.internal_metrics = Some(Metrics::read(i_prot)?),
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("ReportRequest"))?;
        if let Some(runtime) = &self.runtime {
            write_struct_field(o_prot, "runtime", 1, runtime)?;
        }
        write_struct_list_field(o_prot, "span_records", 3, &self.span_records)?;
        write_struct_list_field(o_prot, "log_records", 4, &self.log_records)?;
        if let Some(offset) = self.timestamp_offset_micros {
            write_i64_field(o_prot, "timestamp_offset_micros", 5, offset)?;
        }
        if let Some(oldest) = self.oldest_micros {
            write_i64_field(o_prot, "oldest_micros", 6, oldest)?;
        }
        if let Some(youngest) = self.youngest_micros {
            write_i64_field(o_prot, "youngest_micros", 7, youngest)?;
        }
        if let Some(metrics) = &self.internal_metrics {
            write_struct_field(o_prot, "internal_metrics", 10, metrics)?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Command {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
}

impl ThriftStruct for Command {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = Command::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::Bool) => out.disable = Some(i_prot.read_bool()?),
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Command"))?;
        if let Some(disable) = self.disable {
            o_prot.write_field_begin(&TFieldIdentifier::new("disable", TType::Bool, 1))?;
            o_prot.write_bool(disable)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportResponse {
    #[serde(deserialize_with = "null_as_empty")]
    pub commands: Vec<Command>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,
    #[serde(deserialize_with = "null_as_empty")]
    pub errors: Vec<String>,
}

impl ThriftStruct for ReportResponse {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = ReportResponse::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::List) => out.commands = read_list(i_prot, Command::read)?,
                (2, TType::Struct) => out.timing = Some(Timing::read(i_prot)?),
                (3, TType::List) => out.errors = read_list(i_prot, read_string)?,
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("ReportResponse"))?;
        write_struct_list_field(o_prot, "commands", 1, &self.commands)?;
        if let Some(timing) = &self.timing {
            write_struct_field(o_prot, "timing", 2, timing)?;
        }
        if !self.errors.is_empty() {
            o_prot.write_field_begin(&TFieldIdentifier::new("errors", TType::List, 3))?;
            o_prot.write_list_begin(&TListIdentifier::new(TType::String, self.errors.len() as i32))?;
            for error in &self.errors {
                o_prot.write_string(error)?;
            }
            o_prot.write_list_end()?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

/// Arguments of `ReportingService.Report`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportArgs {
    pub auth: Option<Auth>,
    pub request: ReportRequest,
}

impl ThriftStruct for ReportArgs {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = ReportArgs::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (1, TType::Struct) => out.auth = Some(Auth::read(i_prot)?),
                (2, TType::Struct) => out.request = ReportRequest::read(i_prot)?,
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Report_args"))?;
        if let Some(auth) = &self.auth {
            write_struct_field(o_prot, "auth", 1, auth)?;
        }
        write_struct_field(o_prot, "request", 2, &self.request)?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

/// Result of `ReportingService.Report`; the response rides in field 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportResult {
    pub success: Option<ReportResponse>,
}

impl ThriftStruct for ReportResult {
    fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut out = ReportResult::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match (field_id(&field)?, field.field_type) {
                (0, TType::Struct) => out.success = Some(ReportResponse::read(i_prot)?),
                (_, other) => i_prot.skip(other)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(out)
    }

    fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Report_result"))?;
        if let Some(success) = &self.success {
            write_struct_field(o_prot, "success", 0, success)?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

/// A decoded `ReportingService` call.
#[derive(Debug)]
pub enum IncomingCall {
    Report { sequence_number: i32, args: ReportArgs },
    /// A method this service does not implement; the message body was skipped.
    Unknown { name: String, sequence_number: i32 },
}

/// Read one call envelope from the input protocol.
pub fn read_call(i_prot: &mut dyn TInputProtocol) -> thrift::Result<IncomingCall> {
    let ident = i_prot.read_message_begin()?;
    if ident.name != REPORT_METHOD {
        i_prot.skip(TType::Struct)?;
        i_prot.read_message_end()?;
        return Ok(IncomingCall::Unknown {
            name: ident.name,
            sequence_number: ident.sequence_number,
        });
    }
    let args = ReportArgs::read(i_prot)?;
    i_prot.read_message_end()?;
    Ok(IncomingCall::Report {
        sequence_number: ident.sequence_number,
        args,
    })
}

/// Write a `Report` call envelope, as a v1 client would.
pub fn write_report_call(
    o_prot: &mut dyn TOutputProtocol,
    sequence_number: i32,
    args: &ReportArgs,
) -> thrift::Result<()> {
    o_prot.write_message_begin(&TMessageIdentifier::new(
        REPORT_METHOD,
        TMessageType::Call,
        sequence_number,
    ))?;
    args.write(o_prot)?;
    o_prot.write_message_end()?;
    o_prot.flush()
}

/// Write the reply envelope for a `Report` call.
pub fn write_report_reply(
    o_prot: &mut dyn TOutputProtocol,
    sequence_number: i32,
    response: ReportResponse,
) -> thrift::Result<()> {
    o_prot.write_message_begin(&TMessageIdentifier::new(
        REPORT_METHOD,
        TMessageType::Reply,
        sequence_number,
    ))?;
    ReportResult {
        success: Some(response),
    }
    .write(o_prot)?;
    o_prot.write_message_end()?;
    o_prot.flush()
}

/// Write an application exception in place of a reply.
pub fn write_exception(
    o_prot: &mut dyn TOutputProtocol,
    method: &str,
    sequence_number: i32,
    kind: ApplicationErrorKind,
    message: impl Into<String>,
) -> thrift::Result<()> {
    o_prot.write_message_begin(&TMessageIdentifier::new(
        method,
        TMessageType::Exception,
        sequence_number,
    ))?;
    let error = ApplicationError::new(kind, message);
    thrift::Error::write_application_error_to_out_protocol(&error, o_prot)?;
    o_prot.write_message_end()?;
    o_prot.flush()
}

/// Read a reply envelope for a `Report` call. Exceptions surface as errors.
pub fn read_report_reply(i_prot: &mut dyn TInputProtocol) -> thrift::Result<ReportResponse> {
    let ident = i_prot.read_message_begin()?;
    if ident.message_type == TMessageType::Exception {
        let error = thrift::Error::read_application_error_from_in_protocol(i_prot)?;
        i_prot.read_message_end()?;
        return Err(thrift::Error::Application(error));
    }
    let result = ReportResult::read(i_prot)?;
    i_prot.read_message_end()?;
    result.success.ok_or_else(|| {
        thrift::Error::Application(ApplicationError::new(
            ApplicationErrorKind::MissingResult,
            "Report reply carried no result",
        ))
    })
}

// Strings are read as raw bytes so that a report carrying invalid UTF-8
// decodes instead of failing as a whole.
fn read_string(i_prot: &mut dyn TInputProtocol) -> thrift::Result<String> {
    let bytes = i_prot.read_bytes()?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}

fn read_list<T>(
    i_prot: &mut dyn TInputProtocol,
    read_elem: fn(&mut dyn TInputProtocol) -> thrift::Result<T>,
) -> thrift::Result<Vec<T>> {
    let ident = i_prot.read_list_begin()?;
    let size = usize::try_from(ident.size).unwrap_or_default();
    let mut out = Vec::with_capacity(size.min(1024));
    for _ in 0..size {
        out.push(read_elem(i_prot)?);
    }
    i_prot.read_list_end()?;
    Ok(out)
}

fn write_string_field(
    o_prot: &mut dyn TOutputProtocol,
    name: &str,
    id: i16,
    value: &str,
) -> thrift::Result<()> {
    o_prot.write_field_begin(&TFieldIdentifier::new(name, TType::String, id))?;
    o_prot.write_string(value)?;
    o_prot.write_field_end()
}

fn write_i64_field(
    o_prot: &mut dyn TOutputProtocol,
    name: &str,
    id: i16,
    value: i64,
) -> thrift::Result<()> {
    o_prot.write_field_begin(&TFieldIdentifier::new(name, TType::I64, id))?;
    o_prot.write_i64(value)?;
    o_prot.write_field_end()
}

fn write_struct_field<T: ThriftStruct>(
    o_prot: &mut dyn TOutputProtocol,
    name: &str,
    id: i16,
    value: &T,
) -> thrift::Result<()> {
    o_prot.write_field_begin(&TFieldIdentifier::new(name, TType::Struct, id))?;
    value.write(o_prot)?;
    o_prot.write_field_end()
}

fn write_struct_list_field<T: ThriftStruct>(
    o_prot: &mut dyn TOutputProtocol,
    name: &str,
    id: i16,
    values: &[T],
) -> thrift::Result<()> {
    if values.is_empty() {
        return Ok(());
    }
    o_prot.write_field_begin(&TFieldIdentifier::new(name, TType::List, id))?;
    o_prot.write_list_begin(&TListIdentifier::new(TType::Struct, values.len() as i32))?;
    for value in values {
        value.write(o_prot)?;
    }
    o_prot.write_list_end()?;
    o_prot.write_field_end()
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
