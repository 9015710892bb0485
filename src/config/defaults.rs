//! Tunables for the integration manager.
//!
//! Single source of truth for breaker, batcher and cache defaults.

use std::time::Duration;

/// Consecutive failures before a server's circuit opens.
pub const FAILURE_THRESHOLD: u32 = 5;

/// How long an open circuit waits before probing the server again.
pub const RESET_TIMEOUT: Duration = Duration::from_secs(60);

/// Queue length that triggers an immediate batch flush.
pub const BATCH_SIZE: usize = 10;

/// How long the first request in a batch window waits for company.
pub const BATCH_DELAY: Duration = Duration::from_millis(100);

/// Delay between retry attempts when a server config enables retries.
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Time-to-live for cached resource listings.
pub const RESOURCE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Tools cheap enough that grouping them is worth the added latency.
pub const BATCHABLE_TOOLS: &[&str] = &["memory_usage", "agent_list", "task_status"];

/// Reserved tool name servers must answer with their resource catalogue.
pub const LIST_RESOURCES_TOOL: &str = "list_resources";

/// Reserved tool name for fetching a single resource by URI.
pub const ACCESS_RESOURCE_TOOL: &str = "access_resource";

/// Cache scope used when listing resources across every server.
pub const ALL_SERVERS_SCOPE: &str = "all";
