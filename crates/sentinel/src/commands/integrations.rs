//! Integration settings handlers.

use sentinel_core::IntegrationSettings;

use crate::cli::{GlobalOpts, IntegrationsArgs, IntegrationsCommand, IntegrationsSetArgs};
use crate::error::CliError;
use crate::output;

use super::settings;

fn print(integrations: &IntegrationSettings, global: &GlobalOpts) -> Result<(), CliError> {
    let shown = settings::masked_integrations(integrations);
    let out = output::render_single(
        global.output,
        &shown,
        |i| output::detail(&settings::integration_pairs(i)),
        |i| i.api_endpoint.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn merged(current: IntegrationSettings, args: IntegrationsSetArgs) -> IntegrationSettings {
    IntegrationSettings {
        qbit_user: args.qbit_user.unwrap_or(current.qbit_user),
        qbit_pass: args.qbit_pass.unwrap_or(current.qbit_pass),
        vertex_path: args.vertex_path.unwrap_or(current.vertex_path),
        api_endpoint: args
            .api_endpoint
            .map_or(current.api_endpoint, |e| e.trim().trim_end_matches('/').to_owned()),
    }
}

pub fn handle(args: IntegrationsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = settings::open(global)?;

    match args.command {
        IntegrationsCommand::Show => print(&store.integrations(), global),
        IntegrationsCommand::Set(set) => {
            if set.api_endpoint.as_deref().is_some_and(|e| e.trim().is_empty()) {
                return Err(CliError::Validation {
                    field: "api-endpoint".into(),
                    reason: "must not be empty".into(),
                });
            }
            store.update_integrations(merged(store.integrations(), set));
            store.save()?;
            print(&store.integrations(), global)
        }
    }
}
