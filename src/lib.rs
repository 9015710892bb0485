//! Integration manager for external MCP-style tool servers.
//!
//! A host application registers tool servers (local processes or socket
//! endpoints) and invokes their capabilities through a single entry point,
//! [`IntegrationManager`]. Each registered server owns a circuit breaker
//! that isolates it when it keeps failing, and a request batcher that
//! coalesces eligible small calls into one grouped dispatch. Transport
//! details live behind the [`Transport`] seam.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod transform;

pub use application::batcher::RequestBatcher;
pub use application::breaker::{BreakerError, CircuitBreaker};
pub use application::manager::{IntegrationManager, ManagerError};
pub use config::{ConfigError, ServerConfig, TransportKind};
pub use domain::types::{
    CircuitState, ManagerEvent, Metrics, ResourceListing, ServerStatus, ToolRequest, ToolResponse,
};
pub use infrastructure::transport::{Dispatcher, Transport, TransportError};
pub use transform::{Format, FormatConversionError, transform_data};
