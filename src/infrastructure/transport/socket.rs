use super::Transport;
use super::error::TransportError;
use crate::config::ServerConfig;
use async_trait::async_trait;
use serde_json::Value;

/// Placeholder for the persistent socket transport.
///
/// Kept as a concrete [`Transport`] case so wiring a real implementation
/// later does not touch any dispatch call site. Every call fails immediately
/// instead of hanging.
pub struct SocketTransport;

#[async_trait]
impl Transport for SocketTransport {
    async fn send(
        &self,
        config: &ServerConfig,
        _tool: &str,
        _arguments: Value,
    ) -> Result<Value, TransportError> {
        Err(TransportError::Unsupported {
            server: config.name.clone(),
        })
    }
}
