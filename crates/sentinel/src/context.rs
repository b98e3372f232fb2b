//! Wires the config file, global flags and persisted settings into a
//! ready-to-use [`Sentinel`].

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use sentinel_api::TelegramClient;
use sentinel_config::{Config, SourceMode};
use sentinel_core::{
    FileStore, HttpStatusSource, Inventory, KeyValueStore, Notifier, Sentinel, SettingsStore,
    SimulatedStatusSource, StatusSource, demo_inventory,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the config named by `--config`, or the canonical one.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let config = match global.config {
        Some(ref path) => sentinel_config::load_config_from(path)?,
        None => sentinel_config::load_config()?,
    };
    Ok(config)
}

pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(sentinel_config::config_path)
}

/// Open the settings store without building a fleet.
pub fn open_settings(global: &GlobalOpts, config: &Config) -> (SettingsStore, Notifier) {
    let data_dir = global
        .data_dir
        .clone()
        .unwrap_or_else(|| config.storage.resolved_data_dir());
    debug!(data_dir = %data_dir.display(), "opening settings");

    let notifier = Notifier::with_default_duration(config.notifications.toast_duration());
    let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(data_dir));
    let settings =
        SettingsStore::load_with_debounce(backend, notifier.clone(), config.storage.autosave_debounce());
    (settings, notifier)
}

/// Everything a fleet command needs.
pub struct Runtime {
    pub sentinel: Sentinel,
    pub inventory: Inventory,
}

impl Runtime {
    pub fn build(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = load_config(global)?;
        let (settings, notifier) = open_settings(global, &config);

        let mode = if global.simulate {
            SourceMode::Simulated
        } else {
            config.source.mode
        };
        let transport = config.source.transport();

        let source: Arc<dyn StatusSource> = match mode {
            SourceMode::Simulated => Arc::new(SimulatedStatusSource::new(config.source.latency())),
            SourceMode::Http => Arc::new(HttpStatusSource::new(settings.clone(), transport.clone())),
        };

        // The demo fleet only makes sense against the simulated monitor.
        let inventory = if config.inventory.is_empty() && mode == SourceMode::Simulated {
            demo_inventory()
        } else {
            config.inventory
        };

        let telegram = TelegramClient::new(&config.notifications.telegram_api_base, &transport)
            .map_err(|e| CliError::Notification {
                message: e.to_string(),
            })?;

        let sentinel = Sentinel::builder(source, settings, notifier)
            .telegram(telegram)
            .build();
        debug!(source = %sentinel.source_description(), "runtime ready");

        Ok(Self {
            sentinel,
            inventory,
        })
    }

    /// First poll joined with the inventory.
    pub async fn initialize(&self) -> Result<usize, CliError> {
        self.sentinel
            .initialize(&self.inventory)
            .await
            .map_err(|e| CliError::from(e).with_source(self.sentinel.source_description()))
    }
}
