//! Side-channel events that never change an operation's result.

use crate::ClientError;
use std::io;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum Diagnostic<'a> {
    /// A fresh transport is in place.
    Connected { addr: &'a str },
    /// Clearing the transaction deadline failed after the transaction finished.
    DeadlineClearFailed { error: &'a io::Error },
    /// A response needed more than one read; `received` bytes had arrived of
    /// a frame ending at `end`.
    Fragmented {
        transaction_id: u16,
        received: usize,
        end: usize,
    },
    /// A fatal error closed the connection.
    TornDown { addr: &'a str, cause: &'a ClientError },
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, event: Diagnostic<'_>);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, event: Diagnostic<'_>) {
        match event {
            Diagnostic::Connected { addr } => info!(addr, "modbus connection established"),
            Diagnostic::DeadlineClearFailed { error } => {
                warn!(error = %error, "timeout on modbus connection got stuck");
            }
            Diagnostic::Fragmented {
                transaction_id,
                received,
                end,
            } => debug!(
                transaction_id,
                received, end, "modbus response fragmented; reading remainder"
            ),
            Diagnostic::TornDown { addr, cause } => {
                warn!(addr, error = %cause, "modbus connection closed after fatal error");
            }
        }
    }
}

/// Discards all diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _event: Diagnostic<'_>) {}
}
