//! Fake backend implementation for testing.
//!
//! This implementation keeps an in-memory model of the provisioning server and
//! records every call, allowing workflow tests without a Foreman instance.

use super::{InventoryOps, ProcessOps, ProvisionerOps, WizardOps};
use crate::types::{Host, Hostgroup, Medium, NewProvisioner, Provisioner, SmartProxy};
use crate::{BackendError, BackendResult};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;
use std::process::Output;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Name of the host group the fake step-4 handler creates.
pub const FAKE_HOSTGROUP_NAME: &str = "Provisioning";

/// Operation records for testing and verification.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    FindProxy {
        fqdn: String,
    },
    FindHost {
        fqdn: String,
    },
    FindMedium {
        name: String,
    },
    ListHostgroups,
    DeleteHostgroup {
        id: u64,
    },
    CreateProvisioner(NewProvisioner),
    FindProvisioner {
        id: u64,
    },
    Step2Update {
        id: u64,
        params: Value,
    },
    Step4 {
        id: u64,
    },
    Step4Update {
        id: u64,
        params: Value,
        /// In-memory wizard marker the handler was called with.
        wizard_step: Option<u8>,
    },
}

impl Operation {
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Operation::FindProxy { .. }
                | Operation::FindHost { .. }
                | Operation::FindMedium { .. }
                | Operation::ListHostgroups
                | Operation::FindProvisioner { .. }
        )
    }
}

#[derive(Debug, Clone, Default)]
struct FakeBackendState {
    operations: Vec<Operation>,
    proxies: Vec<SmartProxy>,
    hosts: Vec<Host>,
    media: Vec<Medium>,
    hostgroups: Vec<Hostgroup>,
    provisioners: BTreeMap<u64, Provisioner>,
    next_id: u64,
    /// Handler name ("step2_update", "step4", "step4_update") that should fail.
    fail_handler: Option<String>,
}

impl FakeBackendState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Fake backend that models the provisioning server in memory.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeBackendState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeBackendState::default())),
        }
    }

    /// Register a smart proxy named `name`.
    pub fn add_proxy(&self, name: &str) -> SmartProxy {
        let mut state = self.state.lock().unwrap();
        let proxy = SmartProxy {
            id: state.allocate_id(),
            name: name.to_string(),
            url: Some(format!("https://{name}:8443")),
        };
        state.proxies.push(proxy.clone());
        proxy
    }

    pub fn add_host(&self, name: &str) -> Host {
        let mut state = self.state.lock().unwrap();
        let host = Host {
            id: state.allocate_id(),
            name: name.to_string(),
        };
        state.hosts.push(host.clone());
        host
    }

    pub fn add_medium(&self, name: &str) -> Medium {
        let mut state = self.state.lock().unwrap();
        let medium = Medium {
            id: state.allocate_id(),
            name: name.to_string(),
        };
        state.media.push(medium.clone());
        medium
    }

    pub fn add_hostgroup(&self, name: &str) -> Hostgroup {
        let mut state = self.state.lock().unwrap();
        let group = Hostgroup {
            id: state.allocate_id(),
            name: name.to_string(),
        };
        state.hostgroups.push(group.clone());
        group
    }

    /// Make the named wizard handler return an error.
    pub fn fail_handler(&self, handler: &str) {
        self.state.lock().unwrap().fail_handler = Some(handler.to_string());
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.state.lock().unwrap().operations.clone()
    }

    /// Check if a specific operation was recorded.
    pub fn has_operation(&self, check: impl Fn(&Operation) -> bool) -> bool {
        self.state.lock().unwrap().operations.iter().any(check)
    }

    /// Count operations matching `check`.
    pub fn count_operations(&self, check: impl Fn(&Operation) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter(|op| check(op))
            .count()
    }

    /// Persisted provisioner `id`, bypassing the operation log.
    pub fn stored_provisioner(&self, id: u64) -> Option<Provisioner> {
        self.state.lock().unwrap().provisioners.get(&id).cloned()
    }

    pub fn hostgroups(&self) -> Vec<Hostgroup> {
        self.state.lock().unwrap().hostgroups.clone()
    }

    fn record_operation(&self, op: Operation) {
        self.state.lock().unwrap().operations.push(op);
    }

    fn check_failure(&self, handler: &str) -> BackendResult<()> {
        if self.state.lock().unwrap().fail_handler.as_deref() == Some(handler) {
            return Err(BackendError::Status {
                method: "PUT".to_string(),
                url: format!("fake://foreman_setup/provisioners/{handler}"),
                status: 422,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn stored(&self, id: u64) -> BackendResult<Provisioner> {
        self.stored_provisioner(id).ok_or_else(|| BackendError::NotFound {
            kind: "provisioner",
            key: id.to_string(),
        })
    }
}

impl InventoryOps for FakeBackend {
    fn find_proxy_by_hostname(&self, fqdn: &str) -> BackendResult<Option<SmartProxy>> {
        self.record_operation(Operation::FindProxy {
            fqdn: fqdn.to_string(),
        });
        let state = self.state.lock().unwrap();
        Ok(state.proxies.iter().find(|p| p.name == fqdn).cloned())
    }

    fn find_host_by_hostname(&self, fqdn: &str) -> BackendResult<Option<Host>> {
        self.record_operation(Operation::FindHost {
            fqdn: fqdn.to_string(),
        });
        let state = self.state.lock().unwrap();
        Ok(state.hosts.iter().find(|h| h.name == fqdn).cloned())
    }

    fn find_medium_by_name(&self, name: &str) -> BackendResult<Option<Medium>> {
        self.record_operation(Operation::FindMedium {
            name: name.to_string(),
        });
        let state = self.state.lock().unwrap();
        Ok(state.media.iter().find(|m| m.name == name).cloned())
    }

    fn list_hostgroups(&self) -> BackendResult<Vec<Hostgroup>> {
        self.record_operation(Operation::ListHostgroups);
        Ok(self.hostgroups())
    }

    fn delete_hostgroup(&self, id: u64) -> BackendResult<()> {
        self.record_operation(Operation::DeleteHostgroup { id });
        let mut state = self.state.lock().unwrap();
        let before = state.hostgroups.len();
        state.hostgroups.retain(|g| g.id != id);
        if state.hostgroups.len() == before {
            return Err(BackendError::NotFound {
                kind: "hostgroup",
                key: id.to_string(),
            });
        }
        Ok(())
    }
}

impl ProvisionerOps for FakeBackend {
    fn create_provisioner(&self, new: &NewProvisioner) -> BackendResult<Provisioner> {
        self.record_operation(Operation::CreateProvisioner(new.clone()));
        let mut state = self.state.lock().unwrap();
        let provisioner = Provisioner {
            id: state.allocate_id(),
            host_id: new.host_id,
            smart_proxy_id: new.smart_proxy_id,
            provision_interface: new.provision_interface.clone(),
            hostgroup_id: None,
            subnet_id: None,
            domain_id: None,
            wizard_step: None,
        };
        state.provisioners.insert(provisioner.id, provisioner.clone());
        Ok(provisioner)
    }

    fn find_provisioner(&self, id: u64) -> BackendResult<Provisioner> {
        self.record_operation(Operation::FindProvisioner { id });
        self.stored(id)
    }
}

impl WizardOps for FakeBackend {
    fn step2_update(&self, provisioner: &mut Provisioner, params: &Value) -> BackendResult<()> {
        self.record_operation(Operation::Step2Update {
            id: provisioner.id,
            params: params.clone(),
        });
        self.check_failure("step2_update")?;

        let mut state = self.state.lock().unwrap();
        let subnet_id = state.allocate_id();
        let domain_id = state.allocate_id();
        let stored = state
            .provisioners
            .get_mut(&provisioner.id)
            .ok_or_else(|| BackendError::NotFound {
                kind: "provisioner",
                key: provisioner.id.to_string(),
            })?;
        stored.subnet_id = Some(subnet_id);
        stored.domain_id = Some(domain_id);

        *provisioner = stored.clone();
        provisioner.wizard_step = Some(2);
        Ok(())
    }

    fn step4(&self, provisioner: &mut Provisioner) -> BackendResult<()> {
        self.record_operation(Operation::Step4 { id: provisioner.id });
        self.check_failure("step4")?;

        let mut state = self.state.lock().unwrap();
        let group = Hostgroup {
            id: state.allocate_id(),
            name: FAKE_HOSTGROUP_NAME.to_string(),
        };
        state.hostgroups.push(group.clone());
        let stored = state
            .provisioners
            .get_mut(&provisioner.id)
            .ok_or_else(|| BackendError::NotFound {
                kind: "provisioner",
                key: provisioner.id.to_string(),
            })?;
        stored.hostgroup_id = Some(group.id);

        *provisioner = stored.clone();
        provisioner.wizard_step = Some(4);
        Ok(())
    }

    fn step4_update(&self, provisioner: &mut Provisioner, params: &Value) -> BackendResult<()> {
        self.record_operation(Operation::Step4Update {
            id: provisioner.id,
            params: params.clone(),
            wizard_step: provisioner.wizard_step,
        });
        self.check_failure("step4_update")?;
        provisioner.wizard_step = Some(5);
        Ok(())
    }
}

/// Scripted process runner.
///
/// Commands are recorded as `"program arg1 arg2"`. Programs without a scripted
/// output exit 0 with empty output.
#[derive(Debug, Clone, Default)]
pub struct FakeProcess {
    commands: Arc<Mutex<Vec<String>>>,
    outputs: Arc<Mutex<HashMap<String, (i32, String)>>>,
}

impl FakeProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_output(&self, program: &str, code: i32, stdout: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(program.to_string(), (code, stdout.to_string()));
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

impl ProcessOps for FakeProcess {
    fn command_output(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> BackendResult<Output> {
        let mut line = vec![program];
        line.extend_from_slice(args);
        self.commands.lock().unwrap().push(line.join(" "));

        let (code, stdout) = self
            .outputs
            .lock()
            .unwrap()
            .get(program)
            .cloned()
            .unwrap_or((0, String::new()));
        #[cfg(unix)]
        let status = std::process::ExitStatus::from_raw(code << 8);
        #[cfg(not(unix))]
        let status = std::process::Command::new("cmd")
            .args(["/C", &format!("exit {code}")])
            .status()?;

        Ok(Output {
            status,
            stdout: stdout.into_bytes(),
            stderr: Vec::new(),
        })
    }

    fn command_status(&self, program: &str, args: &[&str], timeout: Duration) -> BackendResult<()> {
        let output = self.command_output(program, args, timeout)?;
        if !output.status.success() {
            return Err(BackendError::CommandFailed {
                program: program.to_string(),
                code: output.status.code(),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_provisioner(backend: &FakeBackend) -> Provisioner {
        let host = backend.add_host("foreman.example.org");
        let proxy = backend.add_proxy("foreman.example.org");
        backend
            .create_provisioner(&NewProvisioner {
                host_id: host.id,
                smart_proxy_id: proxy.id,
                provision_interface: "eth0".to_string(),
            })
            .unwrap()
    }

    #[test]
    fn step4_persists_hostgroup_and_marks_memory_copy() {
        let backend = FakeBackend::new();
        let mut p = new_provisioner(&backend);
        backend.step4(&mut p).unwrap();

        assert_eq!(p.wizard_step, Some(4));
        let reloaded = backend.find_provisioner(p.id).unwrap();
        assert_eq!(reloaded.hostgroup_id, p.hostgroup_id);
        assert_eq!(reloaded.wizard_step, None);
        assert_eq!(backend.hostgroups().len(), 1);
    }

    #[test]
    fn injected_failures_surface_as_status_errors() {
        let backend = FakeBackend::new();
        let mut p = new_provisioner(&backend);
        backend.fail_handler("step4");
        let err = backend.step4(&mut p).unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 422, .. }));
    }

    #[test]
    fn lookups_are_not_mutations() {
        let backend = FakeBackend::new();
        backend.find_proxy_by_hostname("x").unwrap();
        backend.find_host_by_hostname("x").unwrap();
        assert!(!backend.has_operation(Operation::is_mutation));
    }

    #[test]
    fn deleting_unknown_hostgroup_fails() {
        let backend = FakeBackend::new();
        assert!(backend.delete_hostgroup(42).is_err());
    }

    #[test]
    fn fake_process_records_and_scripts() {
        let process = FakeProcess::new();
        process.set_output("systemctl", 3, "");
        assert!(process
            .command_status("systemctl", &["status", "foreman"], Duration::from_secs(1))
            .is_err());
        assert!(process
            .command_status("true", &[], Duration::from_secs(1))
            .is_ok());
        assert_eq!(
            process.commands(),
            vec!["systemctl status foreman".to_string(), "true".to_string()]
        );
    }
}
