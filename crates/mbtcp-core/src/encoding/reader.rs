use crate::DecodeError;

/// A zero-copy reader that advances through a received frame.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub const fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = self
            .buf
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_exact(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(DecodeError::UnexpectedEof)?;
        let bytes = self
            .buf
            .get(self.pos..end)
            .ok_or(DecodeError::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_be_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_exact(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Fills `out` with consecutive big-endian registers.
    pub fn read_be_u16s(&mut self, out: &mut [u16]) -> Result<(), DecodeError> {
        let bytes = self.read_exact(out.len() * 2)?;
        for (slot, pair) in out.iter_mut().zip(bytes.chunks_exact(2)) {
            *slot = u16::from_be_bytes([pair[0], pair[1]]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Reader;
    use crate::DecodeError;

    #[test]
    fn reader_reads_values() {
        let mut r = Reader::new(&[1, 2, 3, 4]);
        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.read_exact(2).unwrap(), &[2, 3]);
        assert_eq!(r.read_be_u16().unwrap_err(), DecodeError::UnexpectedEof);
        assert_eq!(r.position(), 3);
    }

    #[test]
    fn reads_register_runs() {
        let mut r = Reader::new(&[0x00, 0x01, 0xBE, 0xEF, 0xFF]);
        let mut regs = [0u16; 2];
        r.read_be_u16s(&mut regs).unwrap();
        assert_eq!(regs, [0x0001, 0xBEEF]);
        assert_eq!(r.remaining(), 1);

        let mut more = [0u16; 1];
        assert_eq!(
            r.read_be_u16s(&mut more).unwrap_err(),
            DecodeError::UnexpectedEof
        );
        assert!(!r.is_empty());
    }
}
