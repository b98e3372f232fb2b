//! Telegram alert target handlers.

use sentinel_core::NotificationSettings;

use crate::cli::{GlobalOpts, NotifyArgs, NotifyCommand};
use crate::context::Runtime;
use crate::error::CliError;
use crate::output;

use super::settings;

fn print(target: &NotificationSettings, global: &GlobalOpts) -> Result<(), CliError> {
    let shown = settings::masked_notifications(target);
    let out = output::render_single(
        global.output,
        &shown,
        |n| output::detail(&settings::notification_pairs(n)),
        |n| n.chat_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(args: NotifyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        NotifyCommand::Show => {
            let store = settings::open(global)?;
            print(&store.notifications(), global)
        }

        NotifyCommand::Set { token, chat_id } => {
            let store = settings::open(global)?;
            let current = store.notifications();
            let next = NotificationSettings {
                telegram_token: token.map_or(current.telegram_token, |t| t.trim().to_owned()),
                chat_id: chat_id.map_or(current.chat_id, |c| c.trim().to_owned()),
            };
            store.update_notifications(next);
            store.save()?;
            print(&store.notifications(), global)
        }

        NotifyCommand::Test => {
            let runtime = Runtime::build(global)?;
            runtime.sentinel.test_notification().await?;
            if !global.quiet {
                eprintln!("Test notification sent");
            }
            Ok(())
        }
    }
}
