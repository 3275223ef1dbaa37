/// Set on the function code of a response that reports an exception.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Register function codes spoken by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FunctionCode {
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleRegister,
    WriteMultipleRegisters,
}

impl FunctionCode {
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::ReadHoldingRegisters => 0x03,
            Self::ReadInputRegisters => 0x04,
            Self::WriteSingleRegister => 0x06,
            Self::WriteMultipleRegisters => 0x10,
        }
    }

    /// The function code byte a device answers with when it rejects this request.
    pub const fn exception_byte(self) -> u8 {
        self.as_u8() | EXCEPTION_FLAG
    }
}

#[cfg(test)]
mod tests {
    use super::FunctionCode;

    #[test]
    fn register_codes_on_the_wire() {
        assert_eq!(FunctionCode::ReadHoldingRegisters.as_u8(), 0x03);
        assert_eq!(FunctionCode::ReadInputRegisters.as_u8(), 0x04);
        assert_eq!(FunctionCode::WriteSingleRegister.as_u8(), 0x06);
        assert_eq!(FunctionCode::WriteMultipleRegisters.as_u8(), 0x10);
    }

    #[test]
    fn exception_byte_sets_high_bit() {
        assert_eq!(FunctionCode::ReadHoldingRegisters.exception_byte(), 0x83);
        assert_eq!(FunctionCode::WriteSingleRegister.exception_byte(), 0x86);
        assert_eq!(FunctionCode::WriteMultipleRegisters.exception_byte(), 0x90);
    }
}
