// Introspection and conversion surface tests; nothing here spawns a process.

use mcp_relay::transform::Format;
use mcp_relay::{IntegrationManager, ManagerError, ServerConfig, ToolResponse};
use serde_json::json;

#[tokio::test]
async fn status_reflects_registration_and_auth() {
    let manager = IntegrationManager::new();

    let absent = manager.get_server_status("ghost").await;
    assert!(!absent.registered);
    assert!(absent.circuit_state.is_none());
    assert!(!absent.authenticated);

    manager
        .register_server(ServerConfig::new("echo", "cat"))
        .await;
    manager
        .set_authentication("echo", "token123")
        .expect("server known");

    let status = manager.get_server_status("echo").await;
    assert!(status.registered);
    assert!(status.circuit_state.is_some());
    assert!(status.authenticated);
}

#[tokio::test]
async fn auth_for_unknown_server_is_rejected() {
    let manager = IntegrationManager::new();
    let result = manager.set_authentication("ghost", "token");
    assert!(matches!(
        result,
        Err(ManagerError::ServerNotFound { server }) if server == "ghost"
    ));
}

#[tokio::test]
async fn auth_token_survives_re_registration() {
    let manager = IntegrationManager::new();
    manager
        .register_server(ServerConfig::new("echo", "cat"))
        .await;
    manager
        .set_authentication("echo", "token123")
        .expect("server known");

    manager
        .register_server(ServerConfig::new("echo", "cat"))
        .await;
    assert!(manager.get_server_status("echo").await.authenticated);
}

#[tokio::test]
async fn metrics_count_servers_and_auth() {
    let manager = IntegrationManager::new();
    manager
        .register_server(ServerConfig::new("alpha", "cat"))
        .await;
    manager
        .register_server(ServerConfig::new("beta", "cat"))
        .await;
    manager
        .set_authentication("alpha", "token")
        .expect("server known");

    let metrics = manager.get_metrics();
    assert_eq!(metrics.total_servers, 2);
    assert_eq!(metrics.authenticated_servers, 1);
    assert_eq!(metrics.cached_resource_scopes, 0);
    assert!(metrics.servers.contains(&"alpha".to_string()));
    assert!(metrics.servers.contains(&"beta".to_string()));
}

#[tokio::test]
async fn reset_for_unknown_server_is_rejected() {
    let manager = IntegrationManager::new();
    let result = manager.reset_circuit_breaker("ghost").await;
    assert!(matches!(result, Err(ManagerError::ServerNotFound { .. })));
}

#[test]
fn transform_scalar_field_to_yaml() {
    let manager = IntegrationManager::new();
    let result = manager
        .transform_data(json!({"a": 1}), Format::Json, Format::Yaml)
        .expect("supported pair");
    assert_eq!(result, json!("a: 1"));
}

#[test]
fn transform_rejects_unsupported_pairs() {
    let manager = IntegrationManager::new();
    let result = manager.transform_data(json!({"a": 1}), Format::Yaml, Format::Csv);
    assert!(matches!(result, Err(ManagerError::Conversion(_))));
}

#[test]
fn tool_response_constructors_set_exactly_one_side() {
    let ok = ToolResponse::ok(json!(1), Some("req-1".into()));
    assert!(ok.success && ok.data.is_some() && ok.error.is_none());

    let failed = ToolResponse::failure("nope", None);
    assert!(!failed.success && failed.data.is_none());
    assert_eq!(failed.error.as_deref(), Some("nope"));
}
