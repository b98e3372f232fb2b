//! Fleet command handlers: status, check, toggle.

use std::sync::Arc;

use tabled::Tabled;

use sentinel_core::{
    CheckReport, FleetStats, Host, ToggleOutcome, ToggledState, TransitionKind,
};

use crate::cli::{GlobalOpts, OutputFormat, StatusArgs, ToggleArgs, ToggleCommand};
use crate::context::Runtime;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct HostRow {
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Throttle")]
    throttle: String,
    #[tabled(rename = "Torrent")]
    torrent: String,
    #[tabled(rename = "Up")]
    upload: String,
    #[tabled(rename = "Down")]
    download: String,
    #[tabled(rename = "Today")]
    today: String,
    #[tabled(rename = "Downloader")]
    downloader: String,
}

impl From<&Arc<Host>> for HostRow {
    fn from(h: &Arc<Host>) -> Self {
        let client = h.torrent_client.as_ref();
        Self {
            ip: h.ip.clone(),
            name: h.name.clone(),
            throttle: h.throttle_monitor.status.to_string(),
            torrent: client.map_or_else(|| output::NONE.into(), |c| c.status.to_string()),
            upload: client.map_or_else(|| output::NONE.into(), |c| output::rate(c.upload_rate)),
            download: client.map_or_else(|| output::NONE.into(), |c| output::rate(c.download_rate)),
            today: client.map_or_else(
                || output::NONE.into(),
                |c| {
                    format!(
                        "↑{} ↓{}",
                        output::bytes(c.today_upload),
                        output::bytes(c.today_download)
                    )
                },
            ),
            downloader: h.downloader.as_ref().map_or_else(
                || output::NONE.into(),
                |d| if d.enabled { "enabled" } else { "disabled" }.into(),
            ),
        }
    }
}

fn render_hosts(hosts: &[Arc<Host>], global: &GlobalOpts) -> Result<String, CliError> {
    output::render_list(global.output, hosts, |h| HostRow::from(h), |h| h.ip.clone())
}

fn summary(stats: &FleetStats, source: &str) -> String {
    format!(
        "{} hosts, {} throttled, ↑{} ↓{} (source: {source})",
        stats.total_hosts,
        stats.throttled_hosts,
        output::rate(stats.total_upload),
        output::rate(stats.total_download),
    )
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn status(args: &StatusArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let runtime = Runtime::build(global)?;
    runtime.initialize().await?;
    let fleet = runtime.sentinel.fleet();

    let hosts: Vec<Arc<Host>> = fleet
        .list()
        .iter()
        .filter(|h| !args.throttled || h.is_throttled())
        .cloned()
        .collect();
    output::print_output(&render_hosts(&hosts, global)?, global.quiet);

    if global.output == OutputFormat::Table {
        let line = summary(&fleet.stats(), &runtime.sentinel.source_description());
        output::print_output(&line, global.quiet);
    }
    Ok(())
}

pub async fn check(global: &GlobalOpts) -> Result<(), CliError> {
    let runtime = Runtime::build(global)?;
    runtime.initialize().await?;

    let report = runtime
        .sentinel
        .run_automation_check()
        .await
        .map_err(|e| CliError::from(e).with_source(runtime.sentinel.source_description()))?;

    let out = output::render_single(global.output, &report, report_detail, |r| {
        r.transitions
            .iter()
            .map(|t| t.ip.clone())
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    output::print_output(&out, global.quiet);

    if global.output == OutputFormat::Table {
        let hosts = runtime.sentinel.fleet().list();
        output::print_output(&render_hosts(&hosts, global)?, global.quiet);
    }
    Ok(())
}

fn report_detail(report: &CheckReport) -> String {
    let mut pairs = vec![
        ("Action", report.action.to_string()),
        ("Polled", report.polled.to_string()),
    ];
    if report.transitions.is_empty() {
        pairs.push(("Changes", "none".into()));
    }
    for change in &report.transitions {
        let what = match change.kind {
            TransitionKind::Throttled => "throttled",
            TransitionKind::Recovered => "recovered",
        };
        pairs.push(("Changed", format!("{} ({}) {what}", change.name, change.ip)));
    }
    output::detail(&pairs)
}

pub async fn toggle(args: ToggleArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let runtime = Runtime::build(global)?;
    runtime.initialize().await?;
    let sentinel = &runtime.sentinel;

    let (ip, service, outcome) = match args.command {
        ToggleCommand::Torrent { ip } => {
            let outcome = sentinel.toggle_torrent_client(&ip);
            (ip, "torrent client", outcome)
        }
        ToggleCommand::Downloader { ip } => {
            let outcome = sentinel.toggle_downloader(&ip);
            (ip, "downloader", outcome)
        }
    };

    let state = match outcome {
        ToggleOutcome::Applied(state) => state,
        ToggleOutcome::Rejected => {
            return Err(CliError::Conflict {
                message: format!("The torrent client on {ip} is paused by automation"),
                hint: "It resumes automatically once the host is no longer throttled.".into(),
            });
        }
        ToggleOutcome::NoService => {
            return Err(CliError::NotFound {
                resource_type: service.into(),
                identifier: ip,
                list_command: "status".into(),
            });
        }
        ToggleOutcome::UnknownHost => return Err(CliError::host_not_found(&ip)),
    };

    let Some(host) = sentinel.fleet().get(&ip) else {
        return Err(CliError::host_not_found(&ip));
    };
    let message = match state {
        ToggledState::TorrentClient { status } => format!("{}: torrent client {status}", host.name),
        ToggledState::Downloader { enabled } => {
            let verb = if enabled { "enabled" } else { "disabled" };
            format!("{}: downloader {verb}", host.name)
        }
    };
    let out = output::render_single(global.output, host.as_ref(), |_| message.clone(), |h| {
        h.ip.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
