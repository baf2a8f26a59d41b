//! Process execution helpers.
//!
//! External commands are considered "world-touching" and must go through this
//! trait so we can test workflows without spawning real processes.

use crate::BackendResult;
use std::process::Output;
use std::time::Duration;

/// Process execution trait (external command runner).
pub trait ProcessOps {
    fn command_output(&self, program: &str, args: &[&str], timeout: Duration)
        -> BackendResult<Output>;

    /// Run a command and fail unless it exits successfully.
    fn command_status(&self, program: &str, args: &[&str], timeout: Duration) -> BackendResult<()>;
}
