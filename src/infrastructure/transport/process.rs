use super::Transport;
use super::error::TransportError;
use crate::config::ServerConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::debug;

/// One-shot process transport.
///
/// Spawns `command args... tool`, writes the serialized argument payload to
/// the child's stdin and closes it, accumulates stdout and stderr while the
/// child runs, and resolves once it exits. The suspension point is the
/// process lifetime, not each chunk of output.
pub struct ProcessTransport;

#[async_trait]
impl Transport for ProcessTransport {
    async fn send(
        &self,
        config: &ServerConfig,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, TransportError> {
        let server = config.name.clone();

        let payload =
            serde_json::to_vec(&arguments).map_err(|source| TransportError::InvalidPayload {
                server: server.clone(),
                source,
            })?;

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .arg(tool)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.workdir {
            command.current_dir(dir);
        }
        for (key, value) in &config.env {
            command.env(key, value);
        }

        debug!(server = %server, tool, "spawning tool server process");
        let mut child = command.spawn().map_err(|source| TransportError::Spawn {
            server: server.clone(),
            source,
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io_error(&server, "failed to capture child stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io_error(&server, "failed to capture child stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io_error(&server, "failed to capture child stderr"))?;

        // Drain both pipes before feeding stdin: a child that fills its
        // stdout buffer before reading input would otherwise deadlock
        // against our own blocked stdin write.
        let stdout_task = drain(stdout);
        let stderr_task = drain(stderr);

        stdin
            .write_all(&payload)
            .await
            .map_err(|source| TransportError::Io {
                server: server.clone(),
                source,
            })?;
        stdin
            .shutdown()
            .await
            .map_err(|source| TransportError::Io {
                server: server.clone(),
                source,
            })?;
        drop(stdin);

        let status = match config.timeout {
            Some(limit) => match time::timeout(limit, child.wait()).await {
                Ok(result) => result.map_err(|source| TransportError::Io {
                    server: server.clone(),
                    source,
                })?,
                Err(_) => {
                    if let Err(err) = child.start_kill() {
                        debug!(server = %server, %err, "failed to kill timed-out child (may have already exited)");
                    }
                    let _ = child.wait().await;
                    stdout_task.abort();
                    stderr_task.abort();
                    return Err(TransportError::Timeout {
                        server,
                        millis: limit.as_millis() as u64,
                    });
                }
            },
            None => child.wait().await.map_err(|source| TransportError::Io {
                server: server.clone(),
                source,
            })?,
        };

        let stdout_bytes = collect(stdout_task, &server).await?;
        let stderr_bytes = collect(stderr_task, &server).await?;

        if status.success() {
            // A plain-text reply is a valid reply; parse failure is not fatal.
            match serde_json::from_slice::<Value>(&stdout_bytes) {
                Ok(parsed) => Ok(parsed),
                Err(_) => Ok(Value::String(
                    String::from_utf8_lossy(&stdout_bytes).into_owned(),
                )),
            }
        } else {
            let stderr_text = String::from_utf8_lossy(&stderr_bytes).trim().to_string();
            let message = if stderr_text.is_empty() {
                format!(
                    "process exited with code {}",
                    status.code().unwrap_or(-1)
                )
            } else {
                stderr_text
            };
            Err(TransportError::NonZeroExit { server, message })
        }
    }
}

fn drain<R>(mut reader: R) -> JoinHandle<Result<Vec<u8>, std::io::Error>>
where
    R: AsyncReadExt + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        Ok(buffer)
    })
}

async fn collect(
    task: JoinHandle<Result<Vec<u8>, std::io::Error>>,
    server: &str,
) -> Result<Vec<u8>, TransportError> {
    match task.await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(source)) => Err(TransportError::Io {
            server: server.to_string(),
            source,
        }),
        // Aborted or panicked drain task; nothing useful was captured.
        Err(_) => Ok(Vec::new()),
    }
}

fn io_error(server: &str, message: &str) -> TransportError {
    TransportError::Io {
        server: server.to_string(),
        source: std::io::Error::other(message),
    }
}
