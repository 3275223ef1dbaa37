//! Shared plumbing for the register command-line tools.

pub mod common;
