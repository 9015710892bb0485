use super::REGISTRY_PATH;
use super::error::ConfigError;
use super::server::{RawServer, ServerConfig};
use dotenvy::from_filename;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;
use tracing::debug;

static ENV_LOADER: Once = Once::new();

/// Raw registry structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
struct RawRegistry {
    #[serde(default)]
    servers: Vec<RawServer>,
}

/// Ensures environment variables are loaded from config/.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename("config/.env");
    });
}

/// Load and validate the server registry from a file path
pub fn load_registry(path: Option<&Path>) -> Result<Vec<ServerConfig>, ConfigError> {
    ensure_env_loaded();
    let registry_path = path.unwrap_or_else(|| Path::new(REGISTRY_PATH));
    read_registry(registry_path)
}

fn read_registry(path: &Path) -> Result<Vec<ServerConfig>, ConfigError> {
    debug!(path = %path.display(), "Reading server registry file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let parsed: RawRegistry = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_and_build(parsed)
}

fn validate_and_build(parsed: RawRegistry) -> Result<Vec<ServerConfig>, ConfigError> {
    let mut seen = HashSet::new();
    let mut servers = Vec::with_capacity(parsed.servers.len());

    for raw in parsed.servers {
        if raw.name.trim().is_empty() {
            return Err(ConfigError::MissingServerName);
        }
        if !seen.insert(raw.name.clone()) {
            return Err(ConfigError::DuplicateServer { name: raw.name });
        }
        servers.push(ServerConfig::from(raw));
    }

    Ok(servers)
}
