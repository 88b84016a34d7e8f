//! CompactSize integers and a byte cursor for wire decoding

use crate::error::{MultisigError, Result};

/// Encode a number as a Bitcoin varint
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut result = vec![0xfd];
        result.extend_from_slice(&(value as u16).to_le_bytes());
        result
    } else if value <= 0xffffffff {
        let mut result = vec![0xfe];
        result.extend_from_slice(&(value as u32).to_le_bytes());
        result
    } else {
        let mut result = vec![0xff];
        result.extend_from_slice(&value.to_le_bytes());
        result
    }
}

/// Append `data` preceded by its varint length
pub fn write_var_bytes(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&encode_varint(data.len() as u64));
    out.extend_from_slice(data);
}

/// Sequential reader over a serialized byte string
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(MultisigError::Serialization(format!(
                "unexpected end of data: need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a varint, rejecting non-canonical encodings
    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, min) = match self.read_u8()? {
            0xfd => (u16::from_le_bytes(self.read_array()?) as u64, 0xfd),
            0xfe => (u32::from_le_bytes(self.read_array()?) as u64, 0x10000),
            0xff => (self.read_u64_le()?, 0x100000000),
            n => return Ok(n as u64),
        };
        if value < min {
            return Err(MultisigError::Serialization(format!(
                "non-canonical varint {}",
                value
            )));
        }
        Ok(value)
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_varint()?;
        if len > self.remaining() as u64 {
            return Err(MultisigError::Serialization(format!(
                "length prefix {} exceeds remaining {} bytes",
                len,
                self.remaining()
            )));
        }
        Ok(self.read_bytes(len as usize)?.to_vec())
    }

    /// Fail unless every byte has been consumed
    pub fn finish(self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(MultisigError::Serialization(format!(
                "{} trailing bytes",
                self.remaining()
            )));
        }
        Ok(())
    }
}
