use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::defaults;

/// How a tool server is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Spawn the configured command and talk over stdin/stdout.
    #[serde(alias = "stdio")]
    Process,
    /// Persistent socket connection. Accepted in configuration but not
    /// implemented yet; calls fail with an unsupported-transport error.
    #[serde(alias = "websocket")]
    Socket,
}

/// A registered tool server. Immutable once registered; keyed by `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub transport: TransportKind,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
    /// Upper bound on a single process invocation; the child is killed past it.
    pub timeout: Option<Duration>,
    /// Extra transport attempts after a failed dispatch, before the failure
    /// counts against the circuit breaker.
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            transport: TransportKind::Process,
            env: HashMap::new(),
            workdir: None,
            timeout: None,
            retry_attempts: 0,
            retry_delay: defaults::RETRY_DELAY,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawServer {
    pub(crate) name: String,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default, alias = "type")]
    transport: Option<TransportKind>,
    #[serde(default)]
    env: HashMap<String, String>,
    workdir: Option<String>,
    timeout_ms: Option<u64>,
    retry_attempts: Option<u32>,
    retry_delay_ms: Option<u64>,
}

impl From<RawServer> for ServerConfig {
    fn from(raw: RawServer) -> Self {
        let expand = |s: &str| -> String {
            shellexpand::full(s)
                .map(|cow| cow.into_owned())
                .unwrap_or_else(|_| s.to_string())
        };

        let command = PathBuf::from(expand(&raw.command));
        let args = raw.args.iter().map(|arg| expand(arg)).collect();
        let workdir = raw.workdir.map(|d| PathBuf::from(expand(&d)));

        Self {
            name: raw.name,
            command,
            args,
            transport: raw.transport.unwrap_or(TransportKind::Process),
            env: raw.env,
            workdir,
            timeout: raw.timeout_ms.map(Duration::from_millis),
            retry_attempts: raw.retry_attempts.unwrap_or(0),
            retry_delay: raw
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults::RETRY_DELAY),
        }
    }
}
