//! Host identity (read-only).
//!
//! This is "world-touching" (spawns `hostname`, reads `/proc`) and belongs in
//! the backend layer.

use crate::BackendResult;

pub trait HostInfoOps {
    /// Fully-qualified domain name of the machine running the wizard.
    fn fqdn(&self) -> BackendResult<String>;
}
