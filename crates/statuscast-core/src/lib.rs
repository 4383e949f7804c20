pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod monitor;
pub mod traits;
pub mod wire;

pub use error::StatuscastError;
pub use models::{PlaybackState, PlaybackStatus};
pub use monitor::{StatusMonitor, TickOutcome};
pub use wire::{BroadcastMessage, WireFormat};
