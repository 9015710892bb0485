use crate::application::batcher::{BatchProcessor, RequestBatcher, generate_request_id};
use crate::application::breaker::{BreakerError, CircuitBreaker};
use crate::application::resources::ResourceCache;
use crate::config::defaults;
use crate::config::{ServerConfig, load_registry};
use crate::domain::types::{
    ManagerEvent, Metrics, ResourceListing, ServerStatus, ToolRequest, ToolResponse,
};
use crate::infrastructure::transport::{Dispatcher, TransportError};
use crate::transform::{Format, FormatConversionError, transform_data};
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("server '{server}' is not registered")]
    ServerNotFound { server: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Conversion(#[from] FormatConversionError),
}

/// Everything a registered server owns: its immutable config, its breaker,
/// its batch queue and its auth slot. Reachable only through the manager.
struct ServerEntry {
    config: ServerConfig,
    breaker: CircuitBreaker,
    batcher: RequestBatcher,
    auth_token: Arc<Mutex<Option<String>>>,
}

/// Single entry point for invoking tools on registered servers.
///
/// Routes every call through the target server's circuit breaker, batches
/// eligible tools, dispatches over the configured transport, and publishes
/// status events to subscribers.
pub struct IntegrationManager {
    servers: Mutex<HashMap<String, Arc<ServerEntry>>>,
    dispatcher: Arc<Dispatcher>,
    resources: ResourceCache,
    events: broadcast::Sender<ManagerEvent>,
}

impl Default for IntegrationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegrationManager {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            servers: Mutex::new(HashMap::new()),
            dispatcher: Arc::new(Dispatcher::new()),
            resources: ResourceCache::new(defaults::RESOURCE_CACHE_TTL),
            events,
        }
    }

    /// Build a manager from a registry file. A load failure is reported in
    /// the logs but still yields a running manager with zero servers.
    pub async fn with_config_file(path: Option<&Path>) -> Self {
        let manager = Self::new();
        match load_registry(path) {
            Ok(servers) => {
                for config in servers {
                    manager.register_server(config).await;
                }
            }
            Err(err) => {
                warn!(%err, "failed to load server registry; starting with no servers");
            }
        }
        manager
    }

    /// Subscribe to manager status events. Purely observational; dropping
    /// the receiver has no effect on the call path.
    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.events.subscribe()
    }

    /// Register a server, wiring it a fresh breaker and batcher.
    ///
    /// Re-registering an existing name replaces the config and starts from a
    /// clean slate: the old breaker's failure history is discarded and the
    /// old batcher is shut down so no stale flush timer survives. An auth
    /// token set for the name carries over.
    pub async fn register_server(&self, config: ServerConfig) {
        let name = config.name.clone();
        let auth_token = Arc::new(Mutex::new(None));
        let processor = self.batch_processor(&config, &auth_token);
        let entry = Arc::new(ServerEntry {
            breaker: CircuitBreaker::default(),
            batcher: RequestBatcher::new(defaults::BATCH_SIZE, defaults::BATCH_DELAY, processor),
            config,
            auth_token,
        });

        let previous = {
            let mut servers = self.servers.lock().expect("server registry lock");
            servers.insert(name.clone(), Arc::clone(&entry))
        };
        if let Some(previous) = previous {
            let token = previous.auth_token.lock().expect("auth lock").clone();
            *entry.auth_token.lock().expect("auth lock") = token;
            previous.batcher.shutdown().await;
            debug!(server = %name, "replaced existing server registration");
        }

        info!(server = %name, "registered tool server");
        self.emit(ManagerEvent::ServerRegistered { server: name });
    }

    /// Store an auth token for a server. No validation of the token format
    /// happens here.
    pub fn set_authentication(
        &self,
        server: &str,
        token: impl Into<String>,
    ) -> Result<(), ManagerError> {
        let entry = self.entry(server)?;
        *entry.auth_token.lock().expect("auth lock") = Some(token.into());
        self.emit(ManagerEvent::AuthUpdated {
            server: server.to_string(),
        });
        Ok(())
    }

    /// Invoke a tool on its target server.
    ///
    /// An unknown target is a caller error and surfaces as `Err`. Every
    /// other failure - circuit open, transport trouble, batch trouble -
    /// resolves as a `ToolResponse` with `success: false`.
    pub async fn execute_tool(
        &self,
        mut request: ToolRequest,
    ) -> Result<ToolResponse, ManagerError> {
        let entry = self.entry(&request.server)?;
        let request_id = request
            .request_id
            .get_or_insert_with(generate_request_id)
            .clone();
        let server = request.server.clone();
        let tool = request.tool.clone();
        let batchable = defaults::BATCHABLE_TOOLS.contains(&tool.as_str());

        let started = Instant::now();
        let guarded = Arc::clone(&entry);
        let dispatcher = Arc::clone(&self.dispatcher);
        let outcome = entry
            .breaker
            .execute(move || {
                async move {
                    if batchable {
                        // Batched dispatch failures resolve the caller's
                        // response without counting against the breaker;
                        // only the direct path trips the circuit.
                        Ok(guarded.batcher.add(request).await)
                    } else {
                        let token = guarded.auth_token.lock().expect("auth lock").clone();
                        dispatch_with_retry(&dispatcher, &guarded.config, token, &request)
                            .await
                            .map(|data| ToolResponse::ok(data, request.request_id.clone()))
                    }
                }
            })
            .await;
        let duration = started.elapsed();

        let response = match outcome {
            Ok(response) => response,
            Err(BreakerError::Open) => ToolResponse::failure(
                format!("circuit breaker is open for server '{server}'"),
                Some(request_id),
            ),
            Err(BreakerError::Inner(err)) => {
                ToolResponse::failure(err.to_string(), Some(request_id))
            }
        };

        if response.success {
            self.emit(ManagerEvent::RequestCompleted {
                server,
                tool,
                duration,
            });
        } else {
            self.emit(ManagerEvent::RequestFailed {
                server,
                tool,
                duration,
                error: response.error.clone().unwrap_or_default(),
            });
        }

        Ok(response)
    }

    /// List the resources advertised by one server, or by all of them.
    ///
    /// Served from the cache while the scope's entry is fresh; otherwise
    /// every relevant server is queried via the reserved `list_resources`
    /// tool, failures are logged and skipped, and the merged result is
    /// cached.
    pub async fn list_resources(&self, server: Option<&str>) -> Vec<ResourceListing> {
        let scope = server.unwrap_or(defaults::ALL_SERVERS_SCOPE).to_string();
        if let Some(cached) = self.resources.get(&scope) {
            debug!(scope = %scope, "serving resource listing from cache");
            return cached;
        }

        let names: Vec<String> = match server {
            Some(name) => vec![name.to_string()],
            None => {
                let servers = self.servers.lock().expect("server registry lock");
                servers.keys().cloned().collect()
            }
        };

        let mut merged = Vec::new();
        for name in names {
            let request = ToolRequest::new(name.clone(), defaults::LIST_RESOURCES_TOOL);
            match self.execute_tool(request).await {
                Ok(response) if response.success => {
                    merge_listings(&mut merged, &name, response.data);
                }
                Ok(response) => {
                    warn!(
                        server = %name,
                        error = response.error.as_deref().unwrap_or("unknown"),
                        "failed to list resources"
                    );
                }
                Err(err) => {
                    warn!(server = %name, %err, "failed to list resources");
                }
            }
        }

        self.resources.insert(scope, merged.clone());
        merged
    }

    /// Fetch a single resource by URI via the reserved `access_resource`
    /// tool.
    pub async fn access_resource(
        &self,
        server: &str,
        uri: &str,
    ) -> Result<ToolResponse, ManagerError> {
        let request = ToolRequest::new(server, defaults::ACCESS_RESOURCE_TOOL)
            .with_argument("uri", Value::String(uri.to_string()));
        self.execute_tool(request).await
    }

    /// Convert a payload between structured-data formats. Synchronous, no
    /// I/O.
    pub fn transform_data(
        &self,
        data: Value,
        from: Format,
        to: Format,
    ) -> Result<Value, ManagerError> {
        Ok(transform_data(data, from, to)?)
    }

    pub async fn get_server_status(&self, server: &str) -> ServerStatus {
        let entry = {
            let servers = self.servers.lock().expect("server registry lock");
            servers.get(server).cloned()
        };
        match entry {
            Some(entry) => ServerStatus {
                registered: true,
                circuit_state: Some(entry.breaker.current_state().await),
                authenticated: entry.auth_token.lock().expect("auth lock").is_some(),
            },
            None => ServerStatus {
                registered: false,
                circuit_state: None,
                authenticated: false,
            },
        }
    }

    /// Manual recovery hook: force a server's breaker back to closed.
    pub async fn reset_circuit_breaker(&self, server: &str) -> Result<(), ManagerError> {
        let entry = self.entry(server)?;
        entry.breaker.reset().await;
        info!(server = %server, "circuit breaker reset");
        self.emit(ManagerEvent::CircuitReset {
            server: server.to_string(),
        });
        Ok(())
    }

    pub fn get_metrics(&self) -> Metrics {
        let servers = self.servers.lock().expect("server registry lock");
        let names: Vec<String> = servers.keys().cloned().collect();
        let authenticated = servers
            .values()
            .filter(|entry| entry.auth_token.lock().expect("auth lock").is_some())
            .count();
        Metrics {
            total_servers: names.len(),
            authenticated_servers: authenticated,
            cached_resource_scopes: self.resources.scopes(),
            servers: names,
        }
    }

    fn entry(&self, server: &str) -> Result<Arc<ServerEntry>, ManagerError> {
        let servers = self.servers.lock().expect("server registry lock");
        servers
            .get(server)
            .cloned()
            .ok_or_else(|| ManagerError::ServerNotFound {
                server: server.to_string(),
            })
    }

    /// Builds the sequential batch executor for one server. Each grouped
    /// request dispatches on its own; per-request failures become failed
    /// responses rather than aborting the rest of the group.
    fn batch_processor(
        &self,
        config: &ServerConfig,
        auth_token: &Arc<Mutex<Option<String>>>,
    ) -> BatchProcessor {
        let dispatcher = Arc::clone(&self.dispatcher);
        let config = config.clone();
        let auth_token = Arc::clone(auth_token);
        Arc::new(move |requests: Vec<ToolRequest>| {
            let dispatcher = Arc::clone(&dispatcher);
            let config = config.clone();
            let auth_token = Arc::clone(&auth_token);
            async move {
                let mut responses = Vec::with_capacity(requests.len());
                for request in requests {
                    let token = auth_token.lock().expect("auth lock").clone();
                    let response =
                        match dispatch_with_retry(&dispatcher, &config, token, &request).await {
                            Ok(data) => ToolResponse::ok(data, request.request_id),
                            Err(err) => ToolResponse::failure(err.to_string(), request.request_id),
                        };
                    responses.push(response);
                }
                Ok(responses)
            }
            .boxed()
        })
    }

    fn emit(&self, event: ManagerEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

/// Dispatch one request over the transport, retrying per the server config.
///
/// Retries wrap the transport call, not the breaker: a call only counts as
/// one breaker failure, recorded after every attempt is exhausted.
async fn dispatch_with_retry(
    dispatcher: &Dispatcher,
    config: &ServerConfig,
    token: Option<String>,
    request: &ToolRequest,
) -> Result<Value, ManagerError> {
    let arguments = Value::Object(request.arguments.clone());
    let mut attempt = 0;
    loop {
        let result = dispatcher
            .send(config, token.as_deref(), &request.tool, arguments.clone())
            .await;
        match result {
            Ok(data) => return Ok(data),
            Err(err) if attempt < config.retry_attempts => {
                attempt += 1;
                warn!(
                    server = %config.name,
                    tool = %request.tool,
                    attempt,
                    %err,
                    "tool dispatch failed, retrying"
                );
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn merge_listings(merged: &mut Vec<ResourceListing>, server: &str, data: Option<Value>) {
    let Some(Value::Array(items)) = data else {
        warn!(server = %server, "resource listing payload is not an array");
        return;
    };
    for item in items {
        match serde_json::from_value::<ResourceListing>(item) {
            Ok(mut listing) => {
                listing.server = server.to_string();
                merged.push(listing);
            }
            Err(err) => {
                debug!(server = %server, %err, "skipping malformed resource entry");
            }
        }
    }
}
