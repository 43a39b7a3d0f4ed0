use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use curtin_net::net_meta::network_device;
use curtin_net::sysnet::DEFAULT_SYS_CLASS_NET;

#[derive(Parser, Debug)]
#[command(name = "curtin-net")]
#[command(about = "Render network configuration into a target filesystem")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Configure networking in a target from a network config file.
    ApplyNet(ApplyNetArgs),
    /// Write an interfaces file from devices, the target, or a config.
    NetMeta(NetMetaArgs),
    /// Show how an existing interfaces file is parsed.
    Inspect(InspectArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum Passthrough {
    Auto,
    Never,
    Always,
}

#[derive(Parser, Debug)]
pub struct ApplyNetArgs {
    /// Target filesystem root to configure networking in.
    #[arg(short, long, env = "TARGET_MOUNT_POINT")]
    pub target: Option<PathBuf>,
    /// File containing network state.
    #[arg(short = 's', long, env = "OUTPUT_NETWORK_STATE")]
    pub net_state: Option<PathBuf>,
    /// File containing curtin network config.
    #[arg(short = 'c', long, env = "OUTPUT_NETWORK_CONFIG")]
    pub net_config: Option<PathBuf>,
    /// Whether to hand the config to the in-target configurator.
    #[arg(long, value_enum, default_value_t = Passthrough::Auto)]
    pub passthrough: Passthrough,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum MetaModeArg {
    Auto,
    Dhcp,
    Copy,
    Custom,
}

#[derive(Parser, Debug)]
pub struct NetMetaArgs {
    /// Meta-mode to use.
    #[arg(value_enum)]
    pub mode: MetaModeArg,
    /// Devices to operate on: a netdev name or connected, configured, netboot.
    #[arg(short = 'D', long = "devices", value_name = "DEVICE", value_parser = network_device)]
    pub devices: Vec<String>,
    /// File to write to, "-" for stdout.
    #[arg(short, long, env = "OUTPUT_INTERFACES", default_value = "-")]
    pub output: String,
    /// Operate on this target root.
    #[arg(short, long, env = "TARGET_MOUNT_POINT")]
    pub target: Option<PathBuf>,
    /// YAML config file.
    #[arg(short, long, env = "CONFIG")]
    pub config: Option<PathBuf>,
    /// Override a config value, as key/path=value.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
    #[arg(long, hide = true, default_value = DEFAULT_SYS_CLASS_NET)]
    pub sys_class_net: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Interfaces file to parse.
    pub file: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
