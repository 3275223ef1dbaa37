use core::fmt;

use crate::pdu::function_code::EXCEPTION_FLAG;

/// Exception codes a device reports in place of a regular response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Acknowledge,
    ServerDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
    Unknown(u8),
}

impl ExceptionCode {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x01 => Self::IllegalFunction,
            0x02 => Self::IllegalDataAddress,
            0x03 => Self::IllegalDataValue,
            0x04 => Self::ServerDeviceFailure,
            0x05 => Self::Acknowledge,
            0x06 => Self::ServerDeviceBusy,
            0x08 => Self::MemoryParityError,
            0x0A => Self::GatewayPathUnavailable,
            0x0B => Self::GatewayTargetFailedToRespond,
            other => Self::Unknown(other),
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::IllegalFunction => 0x01,
            Self::IllegalDataAddress => 0x02,
            Self::IllegalDataValue => 0x03,
            Self::ServerDeviceFailure => 0x04,
            Self::Acknowledge => 0x05,
            Self::ServerDeviceBusy => 0x06,
            Self::MemoryParityError => 0x08,
            Self::GatewayPathUnavailable => 0x0A,
            Self::GatewayTargetFailedToRespond => 0x0B,
            Self::Unknown(raw) => raw,
        }
    }

    /// The standardized meaning, `None` for codes outside the standard set.
    pub const fn description(self) -> Option<&'static str> {
        match self {
            Self::IllegalFunction => Some("illegal function"),
            Self::IllegalDataAddress => Some("illegal data address"),
            Self::IllegalDataValue => Some("illegal data value"),
            Self::ServerDeviceFailure => Some("server device failure"),
            Self::Acknowledge => Some("acknowledge"),
            Self::ServerDeviceBusy => Some("server device busy"),
            Self::MemoryParityError => Some("memory parity error"),
            Self::GatewayPathUnavailable => Some("gateway path unavailable"),
            Self::GatewayTargetFailedToRespond => {
                Some("gateway target device failed to respond")
            }
            Self::Unknown(_) => None,
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(text) => write!(f, "modbus exception 0x{:02X}: {text}", self.as_u8()),
            None => write!(f, "modbus exception 0x{:02X}", self.as_u8()),
        }
    }
}

/// A device-reported exception for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExceptionResponse {
    /// Raw function code without the exception bit (bit 7).
    pub function_code: u8,
    pub exception_code: ExceptionCode,
}

impl ExceptionResponse {
    /// Builds the response from the flagged function byte and the exception byte.
    pub const fn from_bytes(function_byte: u8, exception: u8) -> Self {
        Self {
            function_code: function_byte & !EXCEPTION_FLAG,
            exception_code: ExceptionCode::from_u8(exception),
        }
    }
}

impl fmt::Display for ExceptionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (function 0x{:02X})",
            self.exception_code, self.function_code
        )
    }
}
