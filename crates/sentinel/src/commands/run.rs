//! `sentinel run`: the long-lived automation loop.

use std::time::Duration;

use tracing::{info, warn};

use sentinel_core::{AutomationScheduler, SchedulerState, Severity, Toast};

use crate::cli::{GlobalOpts, RunArgs};
use crate::context::Runtime;
use crate::error::CliError;
use crate::output;

/// Wait between failed initial polls.
const INIT_RETRY: Duration = Duration::from_secs(10);

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let runtime = Runtime::build(global)?;
    let sentinel = runtime.sentinel.clone();
    let color = output::should_color(global.color);
    let quiet = global.quiet;

    let mut activity = sentinel.activity().subscribe();
    let printer = tokio::spawn(async move {
        while let Some(batch) = activity.next_batch().await {
            for entry in &batch {
                output::print_output(&output::activity_line(entry, color), quiet);
            }
        }
    });
    let _toasts = sentinel.notifier().on_change(move |toast| {
        if let Some(toast) = toast {
            output::print_output(&toast_line(toast), quiet);
        }
    });

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tokio::select! {
        () = initialize_with_retry(&runtime) => {}
        res = &mut shutdown => {
            res?;
            info!("interrupted before the fleet was loaded");
            printer.abort();
            return Ok(());
        }
    }

    let scheduler = AutomationScheduler::new(sentinel.clone());
    scheduler.bind(sentinel.settings());
    announce(&runtime, scheduler.state(), quiet);

    if args.check_now {
        let sentinel = sentinel.clone();
        tokio::spawn(async move {
            let _ = sentinel.run_automation_check().await;
        });
    }

    shutdown.await?;
    info!("shutting down");
    scheduler.stop();
    let flushed = sentinel.settings().flush();
    printer.abort();
    flushed?;
    Ok(())
}

/// Keep polling until the first fleet view is built.
async fn initialize_with_retry(runtime: &Runtime) {
    loop {
        match runtime.initialize().await {
            Ok(_) => return,
            Err(e) => {
                warn!(error = %e, retry_secs = INIT_RETRY.as_secs(), "fleet not loaded yet");
                tokio::time::sleep(INIT_RETRY).await;
            }
        }
    }
}

fn announce(runtime: &Runtime, state: SchedulerState, quiet: bool) {
    let sentinel = &runtime.sentinel;
    let hosts = sentinel.fleet().len();
    let source = sentinel.source_description();
    let line = match state {
        SchedulerState::Running { interval } => format!(
            "Watching {hosts} hosts via {source}, checking every {} ({}). Ctrl-C to stop.",
            output::age(interval),
            sentinel.settings().automation().action,
        ),
        SchedulerState::Stopped => format!(
            "Watching {hosts} hosts via {source}. Automation is disabled; \
             enable it with: sentinel automation set --enable"
        ),
    };
    output::print_output(&line, quiet);
}

fn toast_line(toast: &Toast) -> String {
    let marker = match toast.severity {
        Severity::Success => "ok",
        Severity::Error => "error",
        Severity::Info => "note",
    };
    format!("» {marker}: {}", toast.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn toast_lines_carry_severity() {
        let toast = Toast {
            message: "Failed to save settings: disk full".into(),
            severity: Severity::Error,
            shown_at: Utc::now(),
        };
        assert_eq!(toast_line(&toast), "» error: Failed to save settings: disk full");
    }
}
