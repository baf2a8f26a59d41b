//! The headless wizard run.
//!
//! Order is fixed: create the provisioner, submit step 2, skip step 3 (it has
//! no form fields), open step 4, reload the provisioner, submit the step-4
//! update. Both preconditions are checked before anything is created.

use crate::hooks::{NoopHooks, WizardHooks};
use crate::params::{self, SubnetParameters, INSTALL_MEDIUM_NAME, SUBNET_DISPLAY_NAME};
use crate::preflight::{self, ProvisioningContext};
use crate::stage_runner::{StageDefinition, StageFn, StageRunner, WorkflowState};
use anyhow::{anyhow, Context, Result};
use log::info;
use provwiz_backend::{HostInfoOps, NewProvisioner, Provisioner, ProvisioningBackend};
use provwiz_error::SetupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    CreateProvisioner,
    Step2Update,
    Step4,
    ReloadProvisioner,
    Step4Update,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::CreateProvisioner,
        WizardStep::Step2Update,
        WizardStep::Step4,
        WizardStep::ReloadProvisioner,
        WizardStep::Step4Update,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WizardStep::CreateProvisioner => "create-provisioner",
            WizardStep::Step2Update => "step2-update",
            WizardStep::Step4 => "step4",
            WizardStep::ReloadProvisioner => "reload-provisioner",
            WizardStep::Step4Update => "step4-update",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.name() == name)
    }

    /// Page the web wizard shows after this step. The reload has no web
    /// counterpart.
    pub fn web_next_page(self) -> Option<&'static str> {
        match self {
            WizardStep::CreateProvisioner => Some("step2"),
            WizardStep::Step2Update => Some("step3"),
            WizardStep::Step4 => Some("step4"),
            WizardStep::ReloadProvisioner => None,
            WizardStep::Step4Update => Some("step5"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerOptions {
    /// Display name of the provisioning subnet.
    pub subnet_name: String,
    /// Installation medium assigned to the host group in the step-4 update.
    pub medium_name: String,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            subnet_name: SUBNET_DISPLAY_NAME.to_string(),
            medium_name: INSTALL_MEDIUM_NAME.to_string(),
        }
    }
}

/// Per-run state threaded through the stages.
#[derive(Debug, Clone)]
pub struct WizardRun {
    pub context: ProvisioningContext,
    pub provisioner: Option<Provisioner>,
    /// Id assigned when the provisioner was created; the reload uses it.
    pub created_id: Option<u64>,
    pub completed: Vec<String>,
}

impl WizardRun {
    fn new(context: ProvisioningContext) -> Self {
        Self {
            context,
            provisioner: None,
            created_id: None,
            completed: Vec::new(),
        }
    }

    fn provisioner_mut(&mut self) -> Result<&mut Provisioner> {
        self.provisioner
            .as_mut()
            .ok_or_else(|| anyhow!("no provisioner has been created yet"))
    }
}

impl WorkflowState for WizardRun {
    fn is_completed(&self, stage: &str) -> bool {
        self.completed.iter().any(|s| s == stage)
    }

    fn set_current(&mut self, stage: &str) {
        log::debug!("Provisioner {:?}: entering {}", self.created_id, stage);
    }

    fn mark_completed(&mut self, stage: &str) {
        if !self.is_completed(stage) {
            self.completed.push(stage.to_string());
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardReport {
    pub fqdn: String,
    pub provisioner_id: u64,
    pub hostgroup_id: Option<u64>,
    pub completed: Vec<String>,
}

pub struct Sequencer<'a> {
    backend: &'a dyn ProvisioningBackend,
    host_info: &'a dyn HostInfoOps,
    hooks: &'a dyn WizardHooks,
    options: SequencerOptions,
}

impl<'a> Sequencer<'a> {
    pub fn new(backend: &'a dyn ProvisioningBackend, host_info: &'a dyn HostInfoOps) -> Self {
        Self {
            backend,
            host_info,
            hooks: &NoopHooks,
            options: SequencerOptions::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: &'a dyn WizardHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_options(mut self, options: SequencerOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the whole wizard once for `subnet`.
    ///
    /// Fails with [`SetupError::ProxyNotFound`] or [`SetupError::HostNotFound`]
    /// before touching the backend if a precondition is unmet. Later failures
    /// abort the run and leave whatever the backend already persisted.
    pub fn run(&self, subnet: &SubnetParameters) -> Result<WizardReport> {
        let context = preflight::run(self.backend, self.host_info)?;
        let mut run = WizardRun::new(context);

        let stages = self.stage_definitions(subnet);
        StageRunner::new(self.hooks).run(&mut run, &stages)?;

        let provisioner = run
            .provisioner
            .as_ref()
            .ok_or_else(|| anyhow!("wizard finished without a provisioner"))?;
        info!(
            "🎉 Provisioning wizard complete for {} (provisioner #{})",
            run.context.fqdn, provisioner.id
        );
        Ok(WizardReport {
            fqdn: run.context.fqdn.clone(),
            provisioner_id: provisioner.id,
            hostgroup_id: provisioner.hostgroup_id,
            completed: run.completed.clone(),
        })
    }

    fn stage_definitions<'s>(
        &'s self,
        subnet: &'s SubnetParameters,
    ) -> Vec<StageDefinition<'s, WizardRun>> {
        WizardStep::ALL
            .into_iter()
            .map(move |step| {
                let run: StageFn<'s, WizardRun> = match step {
                    WizardStep::CreateProvisioner => {
                        Box::new(move |run: &mut WizardRun| self.create_provisioner(run, subnet))
                    }
                    WizardStep::Step2Update => {
                        Box::new(move |run: &mut WizardRun| self.step2_update(run, subnet))
                    }
                    WizardStep::Step4 => Box::new(move |run: &mut WizardRun| self.step4(run)),
                    WizardStep::ReloadProvisioner => {
                        Box::new(move |run: &mut WizardRun| self.reload_provisioner(run))
                    }
                    WizardStep::Step4Update => {
                        Box::new(move |run: &mut WizardRun| self.step4_update(run))
                    }
                };
                StageDefinition {
                    name: step.name(),
                    run,
                }
            })
            .collect()
    }

    fn create_provisioner(&self, run: &mut WizardRun, subnet: &SubnetParameters) -> Result<()> {
        if let Some(id) = run.created_id {
            anyhow::bail!("provisioner #{id} already exists for this run");
        }
        let new = NewProvisioner {
            host_id: run.context.host.id,
            smart_proxy_id: run.context.proxy.id,
            provision_interface: subnet.interface_name.clone(),
        };
        let provisioner = self
            .backend
            .create_provisioner(&new)
            .map_err(SetupError::from)
            .context("failed to create provisioner")?;
        info!(
            "Created provisioner #{} on {} (host #{}, proxy #{})",
            provisioner.id, new.provision_interface, new.host_id, new.smart_proxy_id
        );
        run.created_id = Some(provisioner.id);
        run.provisioner = Some(provisioner);
        Ok(())
    }

    fn step2_update(&self, run: &mut WizardRun, subnet: &SubnetParameters) -> Result<()> {
        let bundle = subnet.step2_bundle(&self.options.subnet_name);
        log::debug!("step2_update params: {}", bundle);
        let provisioner = run.provisioner_mut()?;
        self.backend
            .step2_update(provisioner, &bundle)
            .map_err(SetupError::from)
            .context("wizard step 2 (subnet and domain) was rejected")?;
        Ok(())
    }

    fn step4(&self, run: &mut WizardRun) -> Result<()> {
        info!("Wizard step 3 has no parameters; skipping");
        let provisioner = run.provisioner_mut()?;
        self.backend
            .step4(provisioner)
            .map_err(SetupError::from)
            .context("wizard step 4 failed")?;
        Ok(())
    }

    /// Drop whatever the step handlers left on the in-memory copy, as a fresh
    /// web request would.
    fn reload_provisioner(&self, run: &mut WizardRun) -> Result<()> {
        let id = run
            .created_id
            .ok_or_else(|| anyhow!("cannot reload: no provisioner was created"))?;
        let reloaded = self
            .backend
            .find_provisioner(id)
            .map_err(SetupError::from)
            .with_context(|| format!("failed to reload provisioner #{id}"))?;
        if reloaded.id != id {
            anyhow::bail!(
                "backend returned provisioner #{} when reloading #{}",
                reloaded.id,
                id
            );
        }
        run.provisioner = Some(reloaded);
        Ok(())
    }

    fn step4_update(&self, run: &mut WizardRun) -> Result<()> {
        let provisioner = run.provisioner_mut()?;
        let hostgroup_id = provisioner
            .hostgroup_id
            .ok_or(SetupError::MissingHostgroup {
                provisioner_id: provisioner.id,
            })?;
        let medium = self
            .backend
            .find_medium_by_name(&self.options.medium_name)
            .with_context(|| format!("failed to look up medium {}", self.options.medium_name))?
            .ok_or_else(|| SetupError::MediumNotFound(self.options.medium_name.clone()))?;

        let bundle = params::step4_update_bundle(hostgroup_id, medium.id);
        log::debug!("step4_update params: {}", bundle);
        self.backend
            .step4_update(provisioner, &bundle)
            .map_err(SetupError::from)
            .context("wizard step 4 update (installation media) was rejected")?;
        Ok(())
    }
}

/// Delete every host group on the backend. Returns how many were removed.
pub fn cleanup_hostgroups<B>(backend: &B) -> Result<usize>
where
    B: ProvisioningBackend + ?Sized,
{
    let groups = backend
        .list_hostgroups()
        .context("failed to list host groups")?;
    for group in &groups {
        info!("🧹 Deleting host group #{} {}", group.id, group.name);
        backend
            .delete_hostgroup(group.id)
            .with_context(|| format!("failed to delete host group #{}", group.id))?;
    }
    Ok(groups.len())
}
