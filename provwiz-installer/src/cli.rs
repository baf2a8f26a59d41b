//! CLI argument parsing for provwiz.

use clap::{Args, Parser, Subcommand};
use provwiz_workflow::{DhcpRange, ServiceAction, SubnetParameters, SubnetParametersBuilder};
use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "provwiz", version)]
#[command(about = "Drive the foreman_setup provisioning wizard without a browser")]
pub struct Cli {
    /// Without a subcommand the wizard runs with the flags given at top level.
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Configuration file (defaults to $PROVWIZ_CONFIG or /etc/provwiz/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Use this FQDN instead of asking the system
    #[arg(long, global = true)]
    pub fqdn: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a provisioner and walk it through the wizard steps
    Run(RunArgs),

    /// Start, stop, restart or query a service, honoring the image-build policy
    Service {
        /// start | stop | restart | status
        action: ServiceAction,
        /// Unit name, e.g. postgresql
        name: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Environment type; accepted for compatibility and ignored
    #[arg(short = 'e', value_name = "ENVIRONMENTTYPE", hide = true)]
    pub environment: Option<String>,

    /// Provisioning network interface
    #[arg(long, value_name = "IFACE")]
    pub interface_name: Option<String>,

    /// Provisioning DNS domain
    #[arg(long, value_name = "NAME")]
    pub domain_name: Option<String>,

    #[arg(long, value_name = "IPV4")]
    pub network_address: Option<Ipv4Addr>,

    #[arg(long, value_name = "IPV4")]
    pub netmask: Option<Ipv4Addr>,

    #[arg(long, value_name = "IPV4")]
    pub gateway: Option<Ipv4Addr>,

    #[arg(long, value_name = "IPV4")]
    pub dns_primary: Option<Ipv4Addr>,

    #[arg(long, value_name = "IPV4")]
    pub dns_secondary: Option<Ipv4Addr>,

    /// DHCP allocation range, e.g. 192.168.10.100-192.168.10.200
    #[arg(long, value_name = "FROM-TO")]
    pub dhcp_range: Option<DhcpRange>,

    /// Foreman base URL (overrides backend.url)
    #[arg(long, value_name = "URL")]
    pub foreman_url: Option<String>,

    /// Leave existing host groups in place after the run
    #[arg(long)]
    pub keep_hostgroups: bool,
}

impl Cli {
    /// Wizard flags from `run`, or from the top level when no subcommand is
    /// given. `None` for other subcommands.
    pub fn run_args(&self) -> Option<&RunArgs> {
        match &self.command {
            Some(Command::Run(args)) => Some(args),
            Some(Command::Service { .. }) => None,
            None => Some(&self.run),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}

impl RunArgs {
    pub fn subnet_parameters(&self) -> provwiz_error::SetupResult<SubnetParameters> {
        SubnetParametersBuilder {
            interface_name: self.interface_name.clone(),
            domain_name: self.domain_name.clone(),
            network: self.network_address,
            mask: self.netmask,
            gateway: self.gateway,
            dns_primary: self.dns_primary,
            dns_secondary: self.dns_secondary,
            dhcp_range: self.dhcp_range,
        }
        .build()
    }
}
