//! Backend trait definitions and implementations.
//!
//! This module defines the operation traits the wizard needs and provides
//! both a real (ForemanApi / System*) and fake (FakeBackend / FakeProcess)
//! implementation of each.

pub mod fake_backend;
pub mod foreman_api;
pub mod host_info_ops;
pub mod inventory_ops;
pub mod process_ops;
pub mod provisioner_ops;
pub mod system;
pub mod wizard_ops;

pub use fake_backend::{FakeBackend, FakeProcess, Operation};
pub use foreman_api::{ForemanApi, ForemanApiConfig};
pub use host_info_ops::HostInfoOps;
pub use inventory_ops::InventoryOps;
pub use process_ops::ProcessOps;
pub use provisioner_ops::ProvisionerOps;
pub use system::{StaticHostInfo, SystemHostInfo, SystemProcess};
pub use wizard_ops::WizardOps;

/// Complete provisioning backend combining all server-side operation traits.
pub trait ProvisioningBackend: InventoryOps + ProvisionerOps + WizardOps + Send + Sync {}

/// Automatically implement ProvisioningBackend for any type implementing all required traits.
impl<T> ProvisioningBackend for T where
    T: InventoryOps + ProvisionerOps + WizardOps + Send + Sync
{
}
