// Fleet status HTTP client
//
// Wraps `reqwest::Client` with URL construction relative to the
// configured API endpoint and normalization of the two response shapes
// the status endpoint is known to emit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

const STATUS_PATH: &str = "fleet/status";

/// One host as reported by `GET /fleet/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStatusEntry {
    pub address: String,
    #[serde(alias = "name")]
    pub display_name: String,
    pub throttled: bool,
}

/// Value side of the map-shaped response: `{ "<ip>": { name, throttled } }`.
#[derive(Debug, Deserialize)]
struct HostInfo {
    name: String,
    throttled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusResponse {
    List(Vec<FleetStatusEntry>),
    Map(BTreeMap<String, HostInfo>),
}

impl StatusResponse {
    fn into_entries(self) -> Vec<FleetStatusEntry> {
        match self {
            Self::List(entries) => entries,
            Self::Map(map) => map
                .into_iter()
                .map(|(address, info)| FleetStatusEntry {
                    address,
                    display_name: info.name,
                    throttled: info.throttled,
                })
                .collect(),
        }
    }
}

/// HTTP client for the fleet-management backend.
///
/// The base URL is the `apiEndpoint` integration setting (for example
/// `http://localhost:8000/api`); endpoint paths are resolved relative to it.
#[derive(Debug, Clone)]
pub struct FleetClient {
    http: reqwest::Client,
    base_url: Url,
}

impl FleetClient {
    /// Create a client with its own `reqwest::Client` built from `transport`.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http)
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base(base_url)?,
        })
    }

    /// The API endpoint this client talks to (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the current throttling status of every host the backend knows.
    pub async fn fleet_status(&self) -> Result<Vec<FleetStatusEntry>, Error> {
        let url = self.base_url.join(STATUS_PATH)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: truncate(&body, 200),
            });
        }

        let parsed: StatusResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        Ok(parsed.into_entries())
    }
}

/// Ensure the base URL ends with a slash so `join` appends instead of
/// replacing the last path segment.
fn normalize_base(raw: &str) -> Result<Url, Error> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.chars().count() <= max {
        body.to_owned()
    } else {
        let head: String = body.chars().take(max).collect();
        format!("{head}…")
    }
}
