use mbtcp_core::pdu::ExceptionResponse;
use mbtcp_core::{DecodeError, EncodeError, LimitError};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected before any I/O; the connection is untouched.
    #[error("modbus {0}")]
    Limit(#[from] LimitError),
    /// Reported by the device; the connection stays usable.
    #[error("{0}")]
    Exception(ExceptionResponse),
    #[error("modbus address resolution for {addr}: {source}")]
    Resolve { addr: String, source: io::Error },
    #[error("modbus dial {addr}: {source}")]
    Dial { addr: String, source: io::Error },
    #[error("modbus socket tuning: {0}")]
    Tune(#[source] io::Error),
    #[error("timeout on modbus connection needed: {0}")]
    Deadline(#[source] io::Error),
    #[error("modbus request submission: {0}")]
    Submit(#[source] io::Error),
    #[error("modbus response unavailable: {0}")]
    ResponseUnavailable(#[source] io::Error),
    #[error("modbus response frame incomplete: {0}")]
    IncompleteFrame(#[source] io::Error),
    /// Nothing was written; the connection is untouched.
    #[error("modbus request encoding: {0}")]
    Encode(#[from] EncodeError),
    #[error("modbus {0}")]
    Frame(#[from] DecodeError),
    #[error("modbus address in response {got:#06x} does not match the requested {expected:#06x}")]
    AddressMismatch { expected: u16, got: u16 },
    #[error("modbus value in response {got:#06x} does not match the requested {expected:#06x}")]
    ValueMismatch { expected: u16, got: u16 },
    #[error("modbus write count in response {got} does not match the requested {expected}")]
    WriteCountMismatch { expected: u16, got: u16 },
    #[error("modbus connection close: {0}")]
    Close(#[source] io::Error),
    /// A fatal error whose connection teardown failed as well.
    #[error("{cause}; connection close also failed: {close}")]
    Teardown {
        #[source]
        cause: Box<ClientError>,
        close: io::Error,
    },
}

impl ClientError {
    /// Whether the error left the client disconnected.
    ///
    /// Everything but limit violations, request encoding failures and device
    /// exceptions is fatal; the next call redials.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Limit(_) | Self::Encode(_) | Self::Exception(_))
    }

    /// The device exception, if the device reported one.
    pub fn exception(&self) -> Option<&ExceptionResponse> {
        match self {
            Self::Exception(ex) => Some(ex),
            _ => None,
        }
    }

    /// Whether the transaction deadline (or dial timeout) expired.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Dial { source, .. } => is_timeout_kind(source),
            Self::Deadline(err)
            | Self::Submit(err)
            | Self::ResponseUnavailable(err)
            | Self::IncompleteFrame(err) => is_timeout_kind(err),
            Self::Teardown { cause, .. } => cause.is_timeout(),
            _ => false,
        }
    }
}

fn is_timeout_kind(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
