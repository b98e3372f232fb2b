//! Automation schedule handlers.

use sentinel_core::AutomationConfig;

use crate::cli::{AutomationArgs, AutomationCommand, AutomationSetArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::settings;

fn print(config: &AutomationConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(
        global.output,
        config,
        |c| output::detail(&settings::automation_pairs(c)),
        |c| c.interval_secs.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Apply the flags given on the command line to `current`.
fn merged(current: AutomationConfig, args: &AutomationSetArgs) -> Result<AutomationConfig, CliError> {
    if args.interval.is_none() && args.action.is_none() && !args.enable && !args.disable {
        return Err(CliError::Validation {
            field: "automation".into(),
            reason: "nothing to change; pass --interval, --action, --enable or --disable".into(),
        });
    }

    let mut next = current;
    if let Some(interval) = args.interval {
        next.interval_secs = interval.as_secs();
    }
    if let Some(action) = args.action {
        next.action = action.into();
    }
    if args.enable {
        next.enabled = true;
    }
    if args.disable {
        next.enabled = false;
    }
    Ok(next)
}

pub fn handle(args: AutomationArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = settings::open(global)?;

    match args.command {
        AutomationCommand::Show => print(&store.automation(), global),
        AutomationCommand::Set(set) => {
            let next = merged(store.automation(), &set)?;
            store.set_automation(next)?;
            store.save()?;
            print(&store.automation(), global)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::ActionArg;
    use sentinel_core::AutomationAction;
    use std::time::Duration;

    fn args() -> AutomationSetArgs {
        AutomationSetArgs {
            interval: None,
            action: None,
            enable: false,
            disable: false,
        }
    }

    #[test]
    fn only_given_flags_change() {
        let next = merged(
            AutomationConfig::default(),
            &AutomationSetArgs {
                interval: Some(Duration::from_secs(60)),
                action: Some(ActionArg::Notify),
                ..args()
            },
        )
        .unwrap();
        assert_eq!(next.interval_secs, 60);
        assert_eq!(next.action, AutomationAction::Notify);
        assert!(next.enabled);
    }

    #[test]
    fn disable_flag_turns_checks_off() {
        let next = merged(
            AutomationConfig::default(),
            &AutomationSetArgs {
                disable: true,
                ..args()
            },
        )
        .unwrap();
        assert!(!next.enabled);
        assert_eq!(next.interval_secs, 300);
    }

    #[test]
    fn no_flags_is_a_usage_error() {
        let err = merged(AutomationConfig::default(), &args()).unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }
}
