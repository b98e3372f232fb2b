//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod accounts;
pub mod automation;
pub mod config_cmd;
pub mod fleet;
pub mod integrations;
pub mod notify;
pub mod run;
pub mod settings;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(args, global).await,
        Command::Status(args) => fleet::status(&args, global).await,
        Command::Check => fleet::check(global).await,
        Command::Toggle(args) => fleet::toggle(args, global).await,
        Command::Settings(args) => settings::handle(&args, global),
        Command::Accounts(args) => accounts::handle(args, global),
        Command::Automation(args) => automation::handle(args, global),
        Command::Integrations(args) => integrations::handle(args, global),
        Command::Notify(args) => notify::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(&args, global),
        // Completions are generated before dispatch
        Command::Completions(_) => Ok(()),
    }
}
