pub mod defaults;
pub mod error;
pub mod loader;
pub mod server;

pub use error::ConfigError;
pub use loader::load_registry;
pub use server::{ServerConfig, TransportKind};

/// Default server registry path - can be overridden via argument
pub const REGISTRY_PATH: &str = "config/servers.toml";
