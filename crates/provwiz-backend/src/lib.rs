//! provwiz backend layer.
//!
//! Everything that touches the outside world goes through the traits in
//! [`backend`]: the provisioning server (inventory lookups, provisioner records,
//! wizard step handlers), the local host identity and subprocesses. Workflows
//! only see the traits, so they can be exercised against [`FakeBackend`].

pub mod backend;
pub mod types;

pub use backend::{
    FakeBackend, FakeProcess, ForemanApi, ForemanApiConfig, HostInfoOps, InventoryOps, Operation,
    ProcessOps, ProvisionerOps, ProvisioningBackend, StaticHostInfo, SystemHostInfo,
    SystemProcess, WizardOps,
};
pub use provwiz_error::{BackendError, BackendResult};
pub use types::{Host, Hostgroup, Medium, NewProvisioner, Provisioner, SmartProxy};
