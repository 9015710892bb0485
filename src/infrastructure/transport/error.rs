use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to spawn tool server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: io::Error,
    },

    #[error("i/o error while talking to tool server '{server}': {source}")]
    Io {
        server: String,
        #[source]
        source: io::Error,
    },

    #[error("tool server '{server}' failed: {message}")]
    NonZeroExit { server: String, message: String },

    #[error("request timeout after {millis}ms for tool server '{server}'")]
    Timeout { server: String, millis: u64 },

    #[error("socket transport for server '{server}' is not supported yet")]
    Unsupported { server: String },

    #[error("failed to serialize arguments for tool server '{server}': {source}")]
    InvalidPayload {
        server: String,
        #[source]
        source: serde_json::Error,
    },
}
