use std::io;
use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;
pub type SetupResult<T> = Result<T, SetupError>;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command failed: {program} (exit={code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command timed out: {program} after {timeout_secs}s")]
    CommandTimeout { program: String, timeout_secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("SmartProxy not found for {fqdn}")]
    ProxyNotFound { fqdn: String },

    #[error("Host not found for {fqdn}")]
    HostNotFound { fqdn: String },

    #[error("Installation medium not found: {0}")]
    MediumNotFound(String),

    #[error("Provisioner {provisioner_id} has no host group after wizard step 4")]
    MissingHostgroup { provisioner_id: u64 },

    #[error("Invalid DHCP range '{0}' (expected FROM-TO)")]
    InvalidDhcpRange(String),

    #[error("Missing required parameter: --{0}")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SetupError {
    /// True for the two precondition failures that abort before any mutation.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SetupError::ProxyNotFound { .. } | SetupError::HostNotFound { .. }
        )
    }
}
