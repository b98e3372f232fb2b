// sentinel-api: Async HTTP clients for the fleet status endpoint and Telegram alerts.

pub mod error;
pub mod fleet;
pub mod telegram;
pub mod transport;

pub use error::Error;
pub use fleet::{FleetClient, FleetStatusEntry};
pub use telegram::TelegramClient;
pub use transport::{TlsMode, TransportConfig};
