//! Read-mostly lookups against records the wizard does not own.

use crate::types::{Host, Hostgroup, Medium, SmartProxy};
use crate::BackendResult;

pub trait InventoryOps {
    /// Smart proxy registered for `fqdn`, if any.
    fn find_proxy_by_hostname(&self, fqdn: &str) -> BackendResult<Option<SmartProxy>>;

    /// Host record named `fqdn`, if any.
    fn find_host_by_hostname(&self, fqdn: &str) -> BackendResult<Option<Host>>;

    fn find_medium_by_name(&self, name: &str) -> BackendResult<Option<Medium>>;

    fn list_hostgroups(&self) -> BackendResult<Vec<Hostgroup>>;

    fn delete_hostgroup(&self, id: u64) -> BackendResult<()>;
}
