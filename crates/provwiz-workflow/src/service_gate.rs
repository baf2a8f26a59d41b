//! Service gate for image builds.
//!
//! While an image is being built there is no init system to talk to, so most
//! service actions are answered with a canned result. Services named in
//! `run_for_real` (typically the database the installer seeds) still go
//! through `systemctl`. The choice is explicit configuration only.

use anyhow::{Context, Result};
use provwiz_backend::ProcessOps;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const SYSTEMCTL: &str = "systemctl";
const SERVICE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Status,
}

impl ServiceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
            ServiceAction::Status => "status",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(ServiceAction::Start),
            "stop" => Ok(ServiceAction::Stop),
            "restart" => Ok(ServiceAction::Restart),
            "status" => Ok(ServiceAction::Status),
            other => anyhow::bail!(
                "unknown service action '{other}' (expected start|stop|restart|status)"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicePolicy {
    /// Simulate service actions (image build).
    pub simulate: bool,
    /// Exact service names that still run for real while simulating.
    pub run_for_real: Vec<String>,
}

/// What to do for one service action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCommand {
    /// Do nothing; `status` reports the service as running.
    Simulated(ServiceAction),
    Exec {
        action: ServiceAction,
        program: String,
        args: Vec<String>,
    },
}

impl ServicePolicy {
    pub fn must_actually_run(&self, service: &str) -> bool {
        !self.simulate || self.run_for_real.iter().any(|name| name == service)
    }

    pub fn decide(&self, action: ServiceAction, service: &str) -> ServiceCommand {
        if self.must_actually_run(service) {
            ServiceCommand::Exec {
                action,
                program: SYSTEMCTL.to_string(),
                args: vec![action.as_str().to_string(), service.to_string()],
            }
        } else {
            ServiceCommand::Simulated(action)
        }
    }
}

/// Carry out `command`. Returns the text to report: `running`/`stopped` for
/// status queries, empty otherwise.
pub fn execute(process: &dyn ProcessOps, command: &ServiceCommand) -> Result<String> {
    match command {
        ServiceCommand::Simulated(action) => {
            log::info!("Simulating service {} (image build)", action);
            Ok(match action {
                ServiceAction::Status => "running".to_string(),
                _ => String::new(),
            })
        }
        ServiceCommand::Exec {
            action,
            program,
            args,
        } => {
            let argv: Vec<&str> = args.iter().map(String::as_str).collect();
            if *action == ServiceAction::Status {
                // A non-zero exit from a status query means "not running", not an error.
                let output = process
                    .command_output(program, &argv, SERVICE_TIMEOUT)
                    .with_context(|| format!("failed to run {} {}", program, args.join(" ")))?;
                return Ok(if output.status.success() {
                    "running".to_string()
                } else {
                    "stopped".to_string()
                });
            }
            process
                .command_status(program, &argv, SERVICE_TIMEOUT)
                .with_context(|| format!("{} {} failed", program, args.join(" ")))?;
            Ok(String::new())
        }
    }
}
