use crate::EncodeError;

/// A byte writer that stages frame content into a caller-owned buffer.
///
/// The client stages request payloads directly behind the MBAP header, so a
/// writer is usually created over `buf[PAYLOAD_OFFSET..]`.
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub const fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), EncodeError> {
        let slot = self
            .buf
            .get_mut(self.pos)
            .ok_or(EncodeError::BufferTooSmall)?;
        *slot = value;
        self.pos += 1;
        Ok(())
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        if self.remaining() < data.len() {
            return Err(EncodeError::BufferTooSmall);
        }
        let end = self.pos + data.len();
        self.buf[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    pub fn write_be_u16(&mut self, value: u16) -> Result<(), EncodeError> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes every value as a big-endian register, all or nothing.
    pub fn write_be_u16s(&mut self, values: &[u16]) -> Result<(), EncodeError> {
        let needed = values
            .len()
            .checked_mul(2)
            .ok_or(EncodeError::ValueOutOfRange)?;
        if self.remaining() < needed {
            return Err(EncodeError::BufferTooSmall);
        }
        for value in values {
            self.write_be_u16(*value)?;
        }
        Ok(())
    }
}
