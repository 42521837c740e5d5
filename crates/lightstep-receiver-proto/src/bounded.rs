//! Thrift binary-protocol reader for untrusted request bodies.
//!
//! `TBinaryInputProtocol` trusts the length prefix of strings and message
//! names and allocates before reading. This reader works over the complete
//! body and checks every length against the bytes that remain, so a hostile
//! prefix becomes a protocol error instead of an allocation failure.

use thrift::protocol::{
    TFieldIdentifier, TInputProtocol, TListIdentifier, TMapIdentifier, TMessageIdentifier,
    TMessageType, TSetIdentifier, TStructIdentifier, TType,
};
use thrift::{ProtocolError, ProtocolErrorKind, TransportError, TransportErrorKind};

const VERSION_1: [u8; 2] = [0x80, 0x01];

/// Binary-protocol reader over an in-memory message. Accepts both strict and
/// non-strict message headers.
pub struct BoundedInputProtocol<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BoundedInputProtocol<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> thrift::Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(thrift::Error::Transport(TransportError::new(
                TransportErrorKind::EndOfFile,
                format!("needed {} bytes, {} left", n, self.remaining()),
            )));
        }
        let buf: &'a [u8] = self.buf;
        let out = &buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self) -> thrift::Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// A length prefix, rejected when negative or larger than the input left.
    fn read_len(&mut self) -> thrift::Result<usize> {
        let len = self.read_i32()?;
        checked_len(len, self.remaining())
    }

    /// A container size. Each element takes at least one byte, so a size
    /// beyond the remaining input cannot be honest.
    fn read_size(&mut self) -> thrift::Result<i32> {
        let size = self.read_i32()?;
        checked_len(size, self.remaining())?;
        Ok(size)
    }

    fn read_type(&mut self) -> thrift::Result<TType> {
        let byte = self.read_byte()?;
        type_from_u8(byte)
    }
}

fn checked_len(len: i32, remaining: usize) -> thrift::Result<usize> {
    let len = usize::try_from(len).map_err(|_| {
        thrift::Error::Protocol(ProtocolError::new(
            ProtocolErrorKind::NegativeSize,
            format!("negative length {}", len),
        ))
    })?;
    if len > remaining {
        return Err(thrift::Error::Protocol(ProtocolError::new(
            ProtocolErrorKind::SizeLimit,
            format!("length {} exceeds the {} bytes left", len, remaining),
        )));
    }
    Ok(len)
}

fn type_from_u8(byte: u8) -> thrift::Result<TType> {
    match byte {
        0x00 => Ok(TType::Stop),
        0x01 => Ok(TType::Void),
        0x02 => Ok(TType::Bool),
        0x03 => Ok(TType::I08),
        0x04 => Ok(TType::Double),
        0x06 => Ok(TType::I16),
        0x08 => Ok(TType::I32),
        0x0A => Ok(TType::I64),
        0x0B => Ok(TType::String),
        0x0C => Ok(TType::Struct),
        0x0D => Ok(TType::Map),
        0x0E => Ok(TType::Set),
        0x0F => Ok(TType::List),
        0x10 => Ok(TType::Utf8),
        0x11 => Ok(TType::Utf16),
        other => Err(thrift::Error::Protocol(ProtocolError::new(
            ProtocolErrorKind::InvalidData,
            format!("cannot convert {} into TType", other),
        ))),
    }
}

impl TInputProtocol for BoundedInputProtocol<'_> {
    fn read_message_begin(&mut self) -> thrift::Result<TMessageIdentifier> {
        let header: [u8; 4] = self.take_array()?;
        if header[0] & 0x80 != 0 {
            if header[0..2] != VERSION_1 {
                return Err(thrift::Error::Protocol(ProtocolError::new(
                    ProtocolErrorKind::BadVersion,
                    format!("received bad version: {:?}", &header[0..2]),
                )));
            }
            let message_type = TMessageType::try_from(header[3])?;
            let name = self.read_string()?;
            let sequence_number = self.read_i32()?;
            return Ok(TMessageIdentifier::new(name, message_type, sequence_number));
        }

        // Non-strict: the header is the length of the method name.
        let len = checked_len(i32::from_be_bytes(header), self.remaining())?;
        let name = String::from_utf8(self.take(len)?.to_vec())?;
        let message_type = TMessageType::try_from(self.read_byte()?)?;
        let sequence_number = self.read_i32()?;
        Ok(TMessageIdentifier::new(name, message_type, sequence_number))
    }

    fn read_message_end(&mut self) -> thrift::Result<()> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> thrift::Result<Option<TStructIdentifier>> {
        Ok(None)
    }

    fn read_struct_end(&mut self) -> thrift::Result<()> {
        Ok(())
    }

    fn read_field_begin(&mut self) -> thrift::Result<TFieldIdentifier> {
        let field_type = self.read_type()?;
        let id = match field_type {
            TType::Stop => 0,
            _ => self.read_i16()?,
        };
        Ok(TFieldIdentifier::new::<Option<String>, String, i16>(
            None, field_type, id,
        ))
    }

    fn read_field_end(&mut self) -> thrift::Result<()> {
        Ok(())
    }

    fn read_bool(&mut self) -> thrift::Result<bool> {
        Ok(self.read_i8()? != 0)
    }

    fn read_bytes(&mut self) -> thrift::Result<Vec<u8>> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    fn read_i8(&mut self) -> thrift::Result<i8> {
        Ok(i8::from_be_bytes(self.take_array()?))
    }

    fn read_i16(&mut self) -> thrift::Result<i16> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    fn read_i32(&mut self) -> thrift::Result<i32> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    fn read_i64(&mut self) -> thrift::Result<i64> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    fn read_double(&mut self) -> thrift::Result<f64> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    fn read_string(&mut self) -> thrift::Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(From::from)
    }

    fn read_list_begin(&mut self) -> thrift::Result<TListIdentifier> {
        let element_type = self.read_type()?;
        let size = self.read_size()?;
        Ok(TListIdentifier::new(element_type, size))
    }

    fn read_list_end(&mut self) -> thrift::Result<()> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> thrift::Result<TSetIdentifier> {
        let element_type = self.read_type()?;
        let size = self.read_size()?;
        Ok(TSetIdentifier::new(element_type, size))
    }

    fn read_set_end(&mut self) -> thrift::Result<()> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> thrift::Result<TMapIdentifier> {
        let key_type = self.read_type()?;
        let value_type = self.read_type()?;
        let size = self.read_size()?;
        Ok(TMapIdentifier::new(key_type, value_type, size))
    }

    fn read_map_end(&mut self) -> thrift::Result<()> {
        Ok(())
    }

    fn read_byte(&mut self) -> thrift::Result<u8> {
        let [byte] = self.take_array()?;
        Ok(byte)
    }
}
