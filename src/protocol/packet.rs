//! Byte-level reader and writer for merchant frames.
//!
//! Multi-byte integers are big-endian on this wire.

use crate::error::CodecError;

#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let value = self.data[self.pos];
        self.pos += 1;
        Some(value)
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.read_bytes(2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.read_bytes(4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// A string prefixed by a one-byte length
    pub fn read_string8(&mut self) -> Option<String> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        Some(String::from_utf8_lossy(bytes).to_string())
    }

    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let start = self.pos;
        self.pos += len;
        Some(&self.data[start..start + len])
    }
}

#[derive(Debug, Default, Clone)]
pub struct PacketWriter {
    data: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Start a frame tagged with `opcode`
    pub fn with_opcode(opcode: u8) -> Self {
        let mut writer = Self {
            data: Vec::with_capacity(64),
        };
        writer.write_u8(opcode);
        writer
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write a one-byte count, failing if `len` does not fit
    pub fn write_count8(&mut self, field: &'static str, len: usize) -> Result<(), CodecError> {
        self.write_u8(fit_u8(field, len)?);
        Ok(())
    }

    /// Write a two-byte count, failing if `len` does not fit
    pub fn write_count16(&mut self, field: &'static str, len: usize) -> Result<(), CodecError> {
        self.write_u16(fit_u16(field, len)?);
        Ok(())
    }

    /// Write `value` prefixed by its byte length as a single byte
    pub fn write_string8(&mut self, field: &'static str, value: &str) -> Result<(), CodecError> {
        self.write_count8(field, value.len())?;
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    /// Write `value` prefixed by its byte length as two bytes
    pub fn write_string16(&mut self, field: &'static str, value: &str) -> Result<(), CodecError> {
        self.write_count16(field, value.len())?;
        self.write_bytes(value.as_bytes());
        Ok(())
    }
}

fn fit_u8(field: &'static str, len: usize) -> Result<u8, CodecError> {
    u8::try_from(len).map_err(|_| CodecError::EncodingOverflow {
        field,
        len,
        max: u8::MAX as usize,
    })
}

fn fit_u16(field: &'static str, len: usize) -> Result<u16, CodecError> {
    u16::try_from(len).map_err(|_| CodecError::EncodingOverflow {
        field,
        len,
        max: u16::MAX as usize,
    })
}
