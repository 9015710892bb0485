use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating the server registry
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("server registry not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read server registry from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse server registry from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("server entry is missing a name")]
    MissingServerName,

    #[error("duplicate server name '{name}' in registry")]
    DuplicateServer { name: String },
}
