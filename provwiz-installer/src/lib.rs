pub mod cli;
pub mod config;
pub mod logging;

#[cfg(test)]
mod test_env;

use anyhow::{Context, Result};
use log::info;
use provwiz_backend::{
    ForemanApi, HostInfoOps, ProcessOps, ProvisioningBackend, StaticHostInfo, SystemHostInfo,
    SystemProcess,
};
use provwiz_error::SetupError;
use provwiz_workflow::{
    cleanup_hostgroups, service_gate, LoggingHooks, Sequencer, ServiceAction, SubnetParameters,
    WizardReport,
};

use cli::{Cli, Command, RunArgs};
use config::Config;

pub fn dispatch(cli: &Cli) -> Result<()> {
    let mut config = Config::load(&cli.config_path())?;
    config.apply_env();

    if let Some(Command::Service { action, name }) = &cli.command {
        let output = run_service(&SystemProcess::new(), &config, *action, name)?;
        if !output.is_empty() {
            println!("{output}");
        }
        return Ok(());
    }

    let args = cli.run_args().unwrap_or(&cli.run);
    if let Err(err) = run_command(cli, args, &mut config) {
        let precondition = err
            .downcast_ref::<SetupError>()
            .is_some_and(SetupError::is_precondition);
        if precondition {
            log::error!("The smart proxy and host must be registered before the wizard can run");
        }
        return Err(err);
    }
    Ok(())
}

fn run_command(cli: &Cli, args: &RunArgs, config: &mut Config) -> Result<WizardReport> {
    // Validate the flags before talking to the backend at all.
    let subnet = args.subnet_parameters()?;
    if let Some(url) = &args.foreman_url {
        config.backend.url = url.clone();
    }
    if args.keep_hostgroups {
        config.wizard.cleanup_hostgroups = false;
    }

    let api = ForemanApi::new(&config.api_config()).context("failed to set up Foreman client")?;
    let host_info: Box<dyn HostInfoOps> = match &cli.fqdn {
        Some(fqdn) => Box::new(StaticHostInfo(fqdn.clone())),
        None => Box::new(SystemHostInfo::new()),
    };
    run_wizard(&api, host_info.as_ref(), &subnet, config)
}

/// Run the wizard end to end, then clean up host groups if configured to.
///
/// Cleanup only happens after every step succeeded.
pub fn run_wizard(
    backend: &dyn ProvisioningBackend,
    host_info: &dyn HostInfoOps,
    subnet: &SubnetParameters,
    config: &Config,
) -> Result<WizardReport> {
    let report = Sequencer::new(backend, host_info)
        .with_hooks(&LoggingHooks)
        .with_options(config.sequencer_options())
        .run(subnet)?;

    if config.wizard.cleanup_hostgroups {
        let removed = cleanup_hostgroups(backend).context("host group cleanup failed")?;
        info!("🧹 Removed {} host group(s)", removed);
    } else {
        info!("Keeping existing host groups");
    }
    Ok(report)
}

pub fn run_service(
    process: &dyn ProcessOps,
    config: &Config,
    action: ServiceAction,
    name: &str,
) -> Result<String> {
    let command = config.services.decide(action, name);
    service_gate::execute(process, &command)
}
