//! Account command handlers.

use tabled::Tabled;

use sentinel_core::{Account, AccountStatus, SettingsStore};

use crate::cli::{AccountsArgs, AccountsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::settings;

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Login")]
    login: String,
    #[tabled(rename = "Password")]
    password: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Account> for AccountRow {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id,
            login: a.login.clone(),
            password: a.password.clone(),
            status: a.status.to_string(),
        }
    }
}

fn detail(a: &Account) -> String {
    output::detail(&[
        ("ID", a.id.to_string()),
        ("Login", a.login.clone()),
        ("Status", a.status.to_string()),
    ])
}

fn print_account(store: &SettingsStore, id: u32, global: &GlobalOpts) -> Result<(), CliError> {
    let Some(account) = store.accounts().into_iter().find(|a| a.id == id) else {
        return Err(CliError::account_not_found(id));
    };
    let out = output::render_single(global.output, &account, detail, |a| a.id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn set_status(
    store: &SettingsStore,
    id: u32,
    status: AccountStatus,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !store.set_account_status(id, status) {
        return Err(CliError::account_not_found(id));
    }
    store.save()?;
    print_account(store, id, global)
}

pub fn handle(args: AccountsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = settings::open(global)?;

    match args.command {
        AccountsCommand::List => {
            let accounts = store.accounts();
            let out = output::render_list(
                global.output,
                &accounts,
                |a| AccountRow::from(a),
                |a| a.login.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AccountsCommand::Add { login, password } => {
            let account = store.add_account(&login, &password)?;
            store.save()?;
            let out = output::render_single(global.output, &account, detail, |a| a.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // Removing an absent id is not an error.
        AccountsCommand::Remove { id } => {
            let removed = store.remove_account(id);
            if removed {
                store.save()?;
            }
            if !global.quiet {
                if removed {
                    eprintln!("Account {id} removed");
                } else {
                    eprintln!("No account with id {id}");
                }
            }
            Ok(())
        }

        AccountsCommand::Activate { id } => set_status(&store, id, AccountStatus::Active, global),
        AccountsCommand::Deactivate { id } => {
            set_status(&store, id, AccountStatus::Inactive, global)
        }
    }
}
