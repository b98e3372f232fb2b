// HTTP status source backed by the fleet API.

use std::sync::Mutex;

use futures_util::FutureExt as _;
use futures_util::future::BoxFuture;
use sentinel_api::{FleetClient, FleetStatusEntry, TransportConfig};
use tracing::debug;

use super::{PollKind, StatusSource};
use crate::error::CoreError;
use crate::model::{ThrottleMonitor, ThrottleStatus};
use crate::observable::lock;
use crate::settings::SettingsStore;

/// Polls `GET {apiEndpoint}/fleet/status`.
///
/// The endpoint is read from the settings on every poll, so a changed
/// `apiEndpoint` takes effect on the next check. The client is rebuilt
/// only when the endpoint changes.
pub struct HttpStatusSource {
    settings: SettingsStore,
    transport: TransportConfig,
    client: Mutex<Option<(String, FleetClient)>>,
}

impl HttpStatusSource {
    pub fn new(settings: SettingsStore, transport: TransportConfig) -> Self {
        Self {
            settings,
            transport,
            client: Mutex::new(None),
        }
    }

    fn client_for(&self, endpoint: &str) -> Result<FleetClient, CoreError> {
        let mut cached = lock(&self.client);
        if let Some((cached_endpoint, client)) = cached.as_ref() {
            if cached_endpoint == endpoint {
                return Ok(client.clone());
            }
        }
        let client = FleetClient::new(endpoint, &self.transport)?;
        debug!(endpoint = %client.base_url(), "fleet client built");
        *cached = Some((endpoint.to_owned(), client.clone()));
        Ok(client)
    }

    async fn fetch(&self) -> Result<Vec<ThrottleMonitor>, CoreError> {
        let endpoint = self.settings.integrations().api_endpoint;
        let client = self.client_for(&endpoint)?;
        let entries = client.fleet_status().await?;
        debug!(hosts = entries.len(), "fleet status received");

        let mut monitors: Vec<ThrottleMonitor> = entries.into_iter().map(to_monitor).collect();
        monitors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(monitors)
    }
}

fn to_monitor(entry: FleetStatusEntry) -> ThrottleMonitor {
    ThrottleMonitor::new(
        entry.address,
        entry.display_name,
        ThrottleStatus::from_throttled(entry.throttled),
    )
}

impl StatusSource for HttpStatusSource {
    fn fetch_status(&self, _kind: PollKind) -> BoxFuture<'_, Result<Vec<ThrottleMonitor>, CoreError>> {
        self.fetch().boxed()
    }

    fn describe(&self) -> String {
        format!("http ({})", self.settings.integrations().api_endpoint)
    }
}
