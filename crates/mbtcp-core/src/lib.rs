//! Modbus TCP frame codec in pure Rust.
//!
//! `mbtcp-core` encodes MBAP request headers into a fixed frame buffer,
//! matches responses against their request, reconciles declared frame
//! lengths, and decodes register payloads. It performs no I/O and never
//! allocates, so it builds for `no_std` targets with the `std` feature off.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

pub mod encoding;
pub mod error;
pub mod float;
pub mod frame;
pub mod pdu;

pub use error::{DecodeError, EncodeError, LimitError};
