//! provwiz workflow orchestration.
//!
//! This crate replays the foreman_setup provisioning wizard without a browser:
//! it checks the two environment preconditions, then drives the wizard's step
//! handlers in order through a [`provwiz_backend::ProvisioningBackend`].

pub mod hooks;
pub mod params;
pub mod preflight;
pub mod sequencer;
pub mod service_gate;
pub mod stage_runner;

pub use hooks::{LoggingHooks, NoopHooks, WizardHooks};
pub use params::{DhcpRange, SubnetParameters, SubnetParametersBuilder};
pub use preflight::ProvisioningContext;
pub use sequencer::{cleanup_hostgroups, Sequencer, SequencerOptions, WizardReport, WizardStep};
pub use service_gate::{ServiceAction, ServiceCommand, ServicePolicy};
