use crate::LimitError;
use crate::float;

/// Registers per read request; the response byte count must fit one byte.
pub const MAX_READ_REGISTERS: u16 = 125;
/// Registers per write request; lower than reads because the request carries
/// address, quantity and byte count ahead of the values.
pub const MAX_WRITE_REGISTERS: u16 = 123;

/// Accepts `0..=max`. Zero is valid; callers treat it as a no-op.
pub fn check_quantity(quantity: usize, max: u16) -> Result<(), LimitError> {
    if quantity > usize::from(max) {
        return Err(LimitError {
            requested: quantity,
            max,
        });
    }
    Ok(())
}

/// Register values as received, 2 bytes per register in big-endian order.
///
/// A view handed out by the client borrows the client's frame buffer. The
/// bytes are overwritten by the next transaction, which the borrow checker
/// enforces: the view must be dropped before the client is used again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterView<'a> {
    data: &'a [u8],
}

impl<'a> RegisterView<'a> {
    pub const EMPTY: RegisterView<'static> = RegisterView { data: &[] };

    /// Wraps payload bytes; a trailing odd byte is not part of any register.
    pub fn new(data: &'a [u8]) -> Self {
        let even = data.len() & !1;
        Self {
            data: &data[..even],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn register(&self, index: usize) -> Option<u16> {
        let offset = index.checked_mul(2)?;
        let bytes = self.data.get(offset..offset.checked_add(2)?)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + 'a {
        self.data
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
    }

    /// Reads registers `index` and `index + 1` as one `f32`.
    pub fn f32_at(&self, index: usize) -> Option<f32> {
        let offset = index.checked_mul(2)?;
        let bytes: &[u8; 4] = self.data.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
        Some(float::f32_from_be_bytes(bytes))
    }

    /// Reads registers `index..index + 4` as one `f64`.
    pub fn f64_at(&self, index: usize) -> Option<f64> {
        let offset = index.checked_mul(2)?;
        let bytes: &[u8; 8] = self.data.get(offset..offset.checked_add(8)?)?.try_into().ok()?;
        Some(float::f64_from_be_bytes(bytes))
    }
}
