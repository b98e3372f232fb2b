// ── Fleet state ──

mod fleet_store;
pub mod reconcile;

pub use fleet_store::{FleetStore, HostTable};
pub use reconcile::{Transition, TransitionKind};
