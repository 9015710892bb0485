use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use std::time::Duration;

/// A single tool invocation destined for a registered server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub server: String,
    pub tool: String,
    #[serde(default)]
    pub arguments: JsonMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ToolRequest {
    pub fn new(server: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            tool: tool.into(),
            arguments: JsonMap::new(),
            request_id: None,
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }
}

/// Outcome of a tool invocation. Exactly one of `data`/`error` is meaningful,
/// depending on `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ToolResponse {
    pub fn ok(data: Value, request_id: Option<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            request_id,
        }
    }

    pub fn failure(error: impl Into<String>, request_id: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            request_id,
        }
    }
}

/// State of a server's circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// A capability or data item a tool server advertises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceListing {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    /// Filled in by the manager with the name of the server that advertised
    /// the resource.
    #[serde(default)]
    pub server: String,
}

/// Introspection snapshot for a single server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    pub registered: bool,
    pub circuit_state: Option<CircuitState>,
    pub authenticated: bool,
}

/// Aggregate counters over the whole manager.
#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    pub servers: Vec<String>,
    pub total_servers: usize,
    pub authenticated_servers: usize,
    pub cached_resource_scopes: usize,
}

/// Status events the manager publishes for subscribers.
///
/// Observability hook only; nothing in the call path depends on anyone
/// listening.
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    ServerRegistered {
        server: String,
    },
    AuthUpdated {
        server: String,
    },
    RequestCompleted {
        server: String,
        tool: String,
        duration: Duration,
    },
    RequestFailed {
        server: String,
        tool: String,
        duration: Duration,
        error: String,
    },
    CircuitReset {
        server: String,
    },
}
