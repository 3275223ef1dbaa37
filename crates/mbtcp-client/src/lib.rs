//! Blocking Modbus TCP register client.
//!
//! [`ModbusTcpClient`] runs one transaction at a time over a lazily dialed
//! connection: it stages the request in a fixed frame buffer, bounds the
//! whole round trip by a single deadline, reassembles fragmented responses
//! and validates them against the request. Fatal errors drop the connection
//! and the next call redials.
//!
//! ```no_run
//! use mbtcp_client::ModbusTcpClient;
//! use std::time::Duration;
//!
//! let mut client = ModbusTcpClient::new("192.168.1.20:502", Duration::from_secs(1));
//! let mut regs = [0u16; 4];
//! client.read_holding_registers(1000, &mut regs)?;
//! client.write_register(1010, 0xBEEF)?;
//! # Ok::<(), mbtcp_client::ClientError>(())
//! ```

#![forbid(unsafe_code)]

pub mod client;
pub mod connection;
pub mod diagnostics;
pub mod error;
pub mod transport;

pub use client::{ClientConfig, DEFAULT_TRANSACTION_TIMEOUT, DEFAULT_UNIT_ID, ModbusTcpClient};
pub use connection::Connection;
pub use diagnostics::{Diagnostic, DiagnosticSink, NullSink, TracingSink};
pub use error::ClientError;
pub use mbtcp_core::pdu::{ExceptionCode, ExceptionResponse, RegisterView};
pub use transport::{Dialer, TcpDialer, TcpTransport, Transport};
