use clap::Parser;
use provwiz_installer::{cli, logging};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::init_with(cli.log_file.clone());
    provwiz_installer::dispatch(&cli)
}
