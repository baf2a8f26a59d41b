use crate::types::{NewProvisioner, Provisioner};
use crate::BackendResult;

/// Provisioner record persistence.
pub trait ProvisionerOps {
    /// Create and persist a provisioner, returning it with its assigned id.
    fn create_provisioner(&self, new: &NewProvisioner) -> BackendResult<Provisioner>;

    /// Load the persisted state of provisioner `id`.
    fn find_provisioner(&self, id: u64) -> BackendResult<Provisioner>;
}
