// Registry loading tests - exercising load_registry error handling
//
// Focused on server registry file loading and validation errors.

use mcp_relay::config::{ConfigError, TransportKind, load_registry};
use mcp_relay::IntegrationManager;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

fn write_registry(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("servers.toml");
    fs::write(&path, content).expect("Failed to write registry");
    path
}

#[test]
fn returns_error_when_file_not_found() {
    let result = load_registry(Some(Path::new("/nonexistent/path/servers.toml")));
    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
fn returns_error_on_invalid_toml() {
    let dir = tempdir().expect("tempdir");
    let path = write_registry(dir.path(), "[[servers]\nname = broken");

    let result = load_registry(Some(path.as_path()));
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn returns_error_on_duplicate_server_names() {
    let dir = tempdir().expect("tempdir");
    let path = write_registry(
        dir.path(),
        r#"
[[servers]]
name = "twin"
command = "server-a"

[[servers]]
name = "twin"
command = "server-b"
"#,
    );

    let result = load_registry(Some(path.as_path()));
    assert!(matches!(
        result,
        Err(ConfigError::DuplicateServer { name }) if name == "twin"
    ));
}

#[test]
fn returns_error_on_blank_server_name() {
    let dir = tempdir().expect("tempdir");
    let path = write_registry(
        dir.path(),
        r#"
[[servers]]
name = "  "
command = "server"
"#,
    );

    let result = load_registry(Some(path.as_path()));
    assert!(matches!(result, Err(ConfigError::MissingServerName)));
}

#[test]
fn loads_full_server_entries() {
    let dir = tempdir().expect("tempdir");
    let path = write_registry(
        dir.path(),
        r#"
[[servers]]
name = "analytics"
command = "analytics-server"
args = ["--verbose"]
transport = "process"
timeout_ms = 1500
retry_attempts = 2
retry_delay_ms = 100

[[servers]]
name = "remote"
command = "remote-server"
transport = "socket"
"#,
    );

    let servers = load_registry(Some(path.as_path())).expect("registry loads");
    assert_eq!(servers.len(), 2);

    let analytics = &servers[0];
    assert_eq!(analytics.name, "analytics");
    assert_eq!(analytics.args, vec!["--verbose".to_string()]);
    assert_eq!(analytics.transport, TransportKind::Process);
    assert_eq!(analytics.timeout, Some(Duration::from_millis(1500)));
    assert_eq!(analytics.retry_attempts, 2);
    assert_eq!(analytics.retry_delay, Duration::from_millis(100));

    assert_eq!(servers[1].transport, TransportKind::Socket);
}

#[tokio::test]
async fn manager_starts_empty_when_registry_is_missing() {
    let manager =
        IntegrationManager::with_config_file(Some(Path::new("/nonexistent/servers.toml"))).await;
    assert_eq!(manager.get_metrics().total_servers, 0);
}

#[tokio::test]
async fn manager_registers_servers_from_registry() {
    let dir = tempdir().expect("tempdir");
    let path = write_registry(
        dir.path(),
        r#"
[[servers]]
name = "echo"
command = "cat"
"#,
    );

    let manager = IntegrationManager::with_config_file(Some(path.as_path())).await;
    let metrics = manager.get_metrics();
    assert_eq!(metrics.total_servers, 1);
    assert_eq!(metrics.servers, vec!["echo".to_string()]);
}
