use anyhow::Result;
use clap::Parser;

mod apply_net_cmd;
mod cli;
mod inspect_cmd;
mod net_meta_cmd;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::ApplyNet(args) => apply_net_cmd::run_apply_net(args),
        Command::NetMeta(args) => net_meta_cmd::run_net_meta(args),
        Command::Inspect(args) => inspect_cmd::run_inspect(args),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => log::LevelFilter::Warn,
        (false, 0) => log::LevelFilter::Info,
        (false, 1) => log::LevelFilter::Debug,
        (false, _) => log::LevelFilter::Trace,
    };
    let mut log_builder = env_logger::Builder::new();
    for log_group in ["curtin_net", "eni_core"] {
        log_builder.filter(Some(log_group), level);
    }
    log_builder.init();
}
