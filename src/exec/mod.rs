//! External command execution.
//!
//! # Responsibilities
//! - Run `consul-template` and the proxy binary
//! - Bound every run with a timeout
//! - Report non-zero exits with the captured stderr
//!
//! # Design Decisions
//! - Callers depend on the `ProcessRunner` trait, never on `Command`
//! - A started process runs to completion or timeout; no cancellation

pub mod runner;

pub use runner::{CommandError, CommandRunner, ProcessRunner};
