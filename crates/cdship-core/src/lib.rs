pub mod backend;
pub mod config;
pub mod notify;
pub mod shutdown;
pub mod types;

pub use backend::{BackendError, BackendFuture, ObjectStore, Orchestrator};
pub use config::{ConfigError, ShipConfig};
pub use notify::Notifier;
pub use shutdown::Shutdown;
pub use types::*;
