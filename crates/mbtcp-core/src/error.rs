use core::fmt;

use crate::frame::FrameTag;

/// Errors that can occur while staging a request frame into the frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodeError {
    BufferTooSmall,
    ValueOutOfRange,
    FrameTooShort(usize),
    FrameTooLong(usize),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => f.write_str("buffer too small"),
            Self::ValueOutOfRange => f.write_str("value out of range"),
            Self::FrameTooShort(len) => {
                write!(f, "request frame of {len} bytes lacks a function code")
            }
            Self::FrameTooLong(len) => {
                write!(f, "request frame of {len} bytes exceeds the MBAP frame capacity")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Errors that can occur while validating a response frame against its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodeError {
    UnexpectedEof,
    /// Transaction, protocol or unit identifier (or the function code) differ
    /// from the request.
    HeaderMismatch {
        request: FrameTag,
        response: FrameTag,
    },
    /// Exception responses are exactly header + function code + exception code.
    ExceptionFrameSize(usize),
    ExceedsDeclaredLength {
        end: usize,
        received: usize,
    },
    ExceedsFrameCapacity {
        end: usize,
        capacity: usize,
    },
    /// The byte-count field disagrees with the register count requested.
    PayloadSize {
        expected: usize,
        got: usize,
    },
    /// The complete frame length disagrees with the operation's response shape.
    FrameSize {
        expected: usize,
        got: usize,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => f.write_str("unexpected end of input"),
            Self::HeaderMismatch { request, response } => write!(
                f,
                "response frame {response} does not match request frame {request}"
            ),
            Self::ExceptionFrameSize(len) => {
                write!(f, "exception response of {len} bytes; want 9")
            }
            Self::ExceedsDeclaredLength { end, received } => write!(
                f,
                "response reception of {received} bytes exceeds declared frame length {end}"
            ),
            Self::ExceedsFrameCapacity { end, capacity } => write!(
                f,
                "declared frame length {end} exceeds the {capacity}-byte PDU limit"
            ),
            Self::PayloadSize { expected, got } => write!(
                f,
                "response with {got}-byte payload for a {expected}-byte request"
            ),
            Self::FrameSize { expected, got } => {
                write!(f, "payload does not match frame size: got {got} bytes, want {expected}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// A register count outside the protocol's per-request limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LimitError {
    pub requested: usize,
    pub max: u16,
}

impl fmt::Display for LimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value count {} exceeds protocol limit of {}",
            self.requested, self.max
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LimitError {}
