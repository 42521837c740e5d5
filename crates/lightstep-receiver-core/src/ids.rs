// Span and trace identifiers
//
// Legacy clients send identifiers either as 64-bit integers (v2 protobuf) or
// as variable-length hex strings (v1 Thrift). Both land in the fixed-width
// canonical forms below.

use serde::{Serialize, Serializer};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SpanId([u8; 8]);

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TraceId([u8; 16]);

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum IdParseError {
    #[error("hex identifier must be at most {max} characters long, got {len}")]
    TooLong { len: usize, max: usize },
    #[error("invalid hex identifier: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

impl SpanId {
    pub const HEX_LENGTH: usize = 16;

    pub fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Big-endian encoding of `value`.
    pub fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    /// Parse a hex identifier of up to 16 digits, left-padding with zeros.
    pub fn parse_hex(input: &str) -> Result<Self, IdParseError> {
        decode_padded::<8>(input).map(Self)
    }

    /// Like [`SpanId::parse_hex`], but yields the all-zero id on failure
    /// and logs the offending input.
    pub fn from_hex(input: &str) -> Self {
        Self::parse_hex(input).unwrap_or_else(|error| {
            warn!(span_id = input, error = %error, "can't convert span id");
            Self::default()
        })
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 8]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TraceId {
    pub const HEX_LENGTH: usize = 32;

    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// High 8 bytes zero, low 8 bytes the big-endian encoding of `value`.
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[8..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Parse a hex identifier of up to 32 digits, left-padding with zeros.
    pub fn parse_hex(input: &str) -> Result<Self, IdParseError> {
        decode_padded::<16>(input).map(Self)
    }

    pub fn from_hex(input: &str) -> Self {
        Self::parse_hex(input).unwrap_or_else(|error| {
            warn!(trace_id = input, error = %error, "can't convert trace id");
            Self::default()
        })
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 16]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

fn decode_padded<const N: usize>(input: &str) -> Result<[u8; N], IdParseError> {
    let width = N * 2;
    // An odd-length input gains one leading zero before any other padding.
    let effective_len = input.len() + input.len() % 2;
    if effective_len > width {
        return Err(IdParseError::TooLong {
            len: input.len(),
            max: width,
        });
    }

    let mut digits = String::with_capacity(width);
    digits.extend(std::iter::repeat('0').take(width - input.len()));
    digits.push_str(input);

    let mut bytes = [0u8; N];
    hex::decode_to_slice(&digits, &mut bytes)?;
    Ok(bytes)
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for SpanId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
