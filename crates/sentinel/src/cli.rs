//! Clap derive structures for the `sentinel` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use sentinel_core::AutomationAction;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sentinel -- keep a throttled VPS fleet from burning its traffic
#[derive(Debug, Parser)]
#[command(
    name = "sentinel",
    version,
    about = "Watch a VPS fleet and pause services on throttled hosts",
    long_about = "Polls a fleet status endpoint and reconciles torrent clients and\n\
        downloaders against each host's throttling state. Hosts that get\n\
        throttled are paused automatically and restored on recovery.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config path)
    #[arg(long, env = "SENTINEL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted settings
    #[arg(long, env = "SENTINEL_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Use the built-in simulated fleet instead of the HTTP endpoint
    #[arg(long, global = true)]
    pub simulate: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SENTINEL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    JsonCompact,
    Yaml,
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

// ── Command Tree ─────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the automation loop until interrupted
    Run(RunArgs),

    /// Show the fleet with its throttling and service state
    #[command(alias = "ls")]
    Status(StatusArgs),

    /// Poll once and apply the configured automation action
    Check,

    /// Flip a service on one host
    Toggle(ToggleArgs),

    /// Show all persisted settings
    Settings(SettingsArgs),

    /// Manage stored provider accounts
    Accounts(AccountsArgs),

    /// Inspect or change the automation schedule
    Automation(AutomationArgs),

    /// Credentials and endpoints of external services
    Integrations(IntegrationsArgs),

    /// Telegram alert target
    Notify(NotifyArgs),

    /// Inspect the process configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FLEET
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Run one check right after startup instead of waiting an interval
    #[arg(long)]
    pub check_now: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Only list throttled hosts
    #[arg(long, short = 't')]
    pub throttled: bool,
}

#[derive(Debug, Args)]
pub struct ToggleArgs {
    #[command(subcommand)]
    pub command: ToggleCommand,
}

#[derive(Debug, Subcommand)]
pub enum ToggleCommand {
    /// Pause or resume the torrent client
    Torrent {
        /// Host IP address
        ip: String,
    },

    /// Enable or disable the downloader
    Downloader {
        /// Host IP address
        ip: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SETTINGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Print the whole settings bundle (passwords masked)
    Show,
}

#[derive(Debug, Args)]
pub struct AccountsArgs {
    #[command(subcommand)]
    pub command: AccountsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AccountsCommand {
    /// List stored accounts
    #[command(alias = "ls")]
    List,

    /// Store a new account
    Add {
        /// Account login
        login: String,

        /// Account password
        #[arg(long, env = "SENTINEL_ACCOUNT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Delete an account
    #[command(alias = "rm")]
    Remove {
        /// Account id
        id: u32,
    },

    /// Mark an account active
    Activate {
        /// Account id
        id: u32,
    },

    /// Mark an account inactive
    Deactivate {
        /// Account id
        id: u32,
    },
}

#[derive(Debug, Args)]
pub struct AutomationArgs {
    #[command(subcommand)]
    pub command: AutomationCommand,
}

#[derive(Debug, Subcommand)]
pub enum AutomationCommand {
    /// Show the automation schedule
    Show,

    /// Change the automation schedule
    Set(AutomationSetArgs),
}

#[derive(Debug, Args)]
pub struct AutomationSetArgs {
    /// Time between checks (e.g. 300s, 5m)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// What a check does on a throttling change
    #[arg(long, value_enum)]
    pub action: Option<ActionArg>,

    /// Turn scheduled checks on
    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,

    /// Turn scheduled checks off
    #[arg(long)]
    pub disable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Pause,
    Limit,
    Notify,
}

impl From<ActionArg> for AutomationAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Pause => Self::Pause,
            ActionArg::Limit => Self::Limit,
            ActionArg::Notify => Self::Notify,
        }
    }
}

#[derive(Debug, Args)]
pub struct IntegrationsArgs {
    #[command(subcommand)]
    pub command: IntegrationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum IntegrationsCommand {
    /// Show integration settings (passwords masked)
    Show,

    /// Change integration settings
    Set(IntegrationsSetArgs),
}

#[derive(Debug, Args)]
pub struct IntegrationsSetArgs {
    /// qBittorrent user
    #[arg(long)]
    pub qbit_user: Option<String>,

    /// qBittorrent password
    #[arg(long, env = "SENTINEL_QBIT_PASS", hide_env_values = true)]
    pub qbit_pass: Option<String>,

    /// Path to the Vertex config file
    #[arg(long)]
    pub vertex_path: Option<String>,

    /// Base URL of the fleet status API
    #[arg(long)]
    pub api_endpoint: Option<String>,
}

#[derive(Debug, Args)]
pub struct NotifyArgs {
    #[command(subcommand)]
    pub command: NotifyCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotifyCommand {
    /// Show the alert target (token masked)
    Show,

    /// Set the Telegram bot token and chat id
    Set {
        /// Telegram bot token
        #[arg(long, env = "SENTINEL_TELEGRAM_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Telegram chat id
        #[arg(long)]
        chat_id: Option<String>,
    },

    /// Send a test message to the configured chat
    Test,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG / COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Print the effective configuration
    Show,

    /// Write a config file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }
}
