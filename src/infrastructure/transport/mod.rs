pub mod error;
pub mod process;
pub mod socket;

pub use error::TransportError;
pub use process::ProcessTransport;
pub use socket::SocketTransport;

use crate::config::{ServerConfig, TransportKind};
use async_trait::async_trait;
use serde_json::Value;

/// The concrete mechanism used to exchange one tool call with a server.
///
/// Implementations are stateless with respect to individual calls; all
/// per-server knowledge arrives through the [`ServerConfig`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        config: &ServerConfig,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, TransportError>;
}

/// Routes a call to the transport matching the server's configured kind and
/// injects the caller's auth token into the argument payload.
pub struct Dispatcher {
    process: ProcessTransport,
    socket: SocketTransport,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            process: ProcessTransport,
            socket: SocketTransport,
        }
    }

    pub async fn send(
        &self,
        config: &ServerConfig,
        auth_token: Option<&str>,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, TransportError> {
        let arguments = inject_auth(arguments, auth_token);
        let transport: &dyn Transport = match config.transport {
            TransportKind::Process => &self.process,
            TransportKind::Socket => &self.socket,
        };
        transport.send(config, tool, arguments).await
    }
}

/// Adds `headers.Authorization = "Bearer <token>"` to an object payload.
/// Non-object payloads are passed through untouched.
fn inject_auth(mut arguments: Value, token: Option<&str>) -> Value {
    if let Some(token) = token {
        if let Value::Object(map) = &mut arguments {
            let headers = map
                .entry("headers")
                .or_insert_with(|| Value::Object(Default::default()));
            if let Value::Object(headers) = headers {
                headers.insert(
                    "Authorization".to_string(),
                    Value::String(format!("Bearer {token}")),
                );
            }
        }
    }
    arguments
}
