//! Wizard step handlers.
//!
//! Each handler corresponds to one form submission of the web wizard. Handlers
//! may mutate the in-memory provisioner they are given (as the web controller
//! does within a single request); callers that need the persisted state must
//! reload it through [`crate::ProvisionerOps::find_provisioner`].

use crate::types::Provisioner;
use crate::BackendResult;
use serde_json::Value;

pub trait WizardOps {
    /// Step 2: subnet and domain.
    fn step2_update(&self, provisioner: &mut Provisioner, params: &Value) -> BackendResult<()>;

    /// Step 4: advance to the installation media page. Takes no parameters.
    fn step4(&self, provisioner: &mut Provisioner) -> BackendResult<()>;

    /// Step 4 update: host group medium and activation settings.
    fn step4_update(&self, provisioner: &mut Provisioner, params: &Value) -> BackendResult<()>;
}
