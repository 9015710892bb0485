use crate::application::manager::ManagerError;
use crate::domain::types::{ToolRequest, ToolResponse};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

/// Executes a drained batch. Must return one response per request, in
/// request order; a top-level error fails every caller in the batch.
pub type BatchProcessor = Arc<
    dyn Fn(Vec<ToolRequest>) -> BoxFuture<'static, Result<Vec<ToolResponse>, ManagerError>>
        + Send
        + Sync,
>;

/// Per-server queue that coalesces small requests into one grouped dispatch.
///
/// The queue flushes when it reaches `batch_size`, or `batch_delay` after the
/// first enqueue of a window, whichever comes first. Each caller awaits its
/// own response; a flush never leaves a caller pending.
pub struct RequestBatcher {
    inner: Arc<BatcherInner>,
}

struct BatcherInner {
    batch_size: usize,
    batch_delay: Duration,
    processor: BatchProcessor,
    queue: Mutex<BatchQueue>,
}

#[derive(Default)]
struct BatchQueue {
    entries: Vec<PendingRequest>,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every flush; a sleeping timer task only flushes if the
    /// window it was armed for is still current.
    epoch: u64,
}

struct PendingRequest {
    request: ToolRequest,
    responder: oneshot::Sender<ToolResponse>,
}

impl RequestBatcher {
    pub fn new(batch_size: usize, batch_delay: Duration, processor: BatchProcessor) -> Self {
        Self {
            inner: Arc::new(BatcherInner {
                batch_size: batch_size.max(1),
                batch_delay,
                processor,
                queue: Mutex::new(BatchQueue::default()),
            }),
        }
    }

    /// Enqueue a request and await its eventual response.
    ///
    /// Stamps a request id if the caller did not provide one.
    pub async fn add(&self, mut request: ToolRequest) -> ToolResponse {
        let request_id = request
            .request_id
            .get_or_insert_with(generate_request_id)
            .clone();

        let (responder, receiver) = oneshot::channel();
        let flush_now = {
            let mut queue = self.inner.queue.lock().await;
            queue.entries.push(PendingRequest { request, responder });

            if queue.entries.len() >= self.inner.batch_size {
                true
            } else {
                if queue.timer.is_none() {
                    let inner = Arc::clone(&self.inner);
                    let epoch = queue.epoch;
                    queue.timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(inner.batch_delay).await;
                        inner.flush(Some(epoch)).await;
                    }));
                }
                false
            }
        };

        if flush_now {
            self.inner.flush(None).await;
        }

        match receiver.await {
            Ok(response) => response,
            Err(_) => ToolResponse::failure(
                "batched request dropped before completion",
                Some(request_id),
            ),
        }
    }

    /// Flush whatever is queued right now.
    pub async fn flush(&self) {
        self.inner.flush(None).await;
    }

    /// Cancel the pending timer and fail every queued caller. Used when the
    /// owning server is replaced, so no stale flush fires afterwards.
    pub async fn shutdown(&self) {
        let batch = {
            let mut queue = self.inner.queue.lock().await;
            queue.epoch = queue.epoch.wrapping_add(1);
            if let Some(timer) = queue.timer.take() {
                timer.abort();
            }
            std::mem::take(&mut queue.entries)
        };

        for pending in batch {
            let _ = pending.responder.send(ToolResponse::failure(
                "batcher shut down before the request completed",
                pending.request.request_id,
            ));
        }
    }

    #[cfg(test)]
    async fn pending(&self) -> usize {
        self.inner.queue.lock().await.entries.len()
    }
}

impl BatcherInner {
    /// `expected_epoch` is set on the timer path: if another flush already
    /// claimed the window, the timer backs off without touching the queue.
    async fn flush(self: &Arc<Self>, expected_epoch: Option<u64>) {
        let batch = {
            let mut queue = self.queue.lock().await;
            if let Some(epoch) = expected_epoch {
                if queue.epoch != epoch {
                    return;
                }
            }
            queue.epoch = queue.epoch.wrapping_add(1);
            if let Some(timer) = queue.timer.take() {
                // The timer path is that task itself; aborting it here would
                // cancel the flush mid-processing.
                if expected_epoch.is_none() {
                    timer.abort();
                }
            }
            std::mem::take(&mut queue.entries)
        };

        if batch.is_empty() {
            return;
        }

        let requests: Vec<ToolRequest> = batch.iter().map(|p| p.request.clone()).collect();
        match (self.processor)(requests).await {
            Ok(responses) => {
                let mut responses = responses.into_iter();
                for pending in batch {
                    let response = responses.next().unwrap_or_else(|| {
                        ToolResponse::failure(
                            "batch processor produced no response for this request",
                            pending.request.request_id.clone(),
                        )
                    });
                    let _ = pending.responder.send(response);
                }
            }
            Err(error) => {
                warn!(%error, "batch processing failed");
                let message = error.to_string();
                for pending in batch {
                    let _ = pending.responder.send(ToolResponse::failure(
                        message.clone(),
                        pending.request.request_id,
                    ));
                }
            }
        }
    }
}

pub(crate) fn generate_request_id() -> String {
    format!("req-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;
    use tokio::sync::Mutex as AsyncMutex;

    fn echo_processor(batches: Arc<AsyncMutex<Vec<Vec<ToolRequest>>>>) -> BatchProcessor {
        Arc::new(move |requests: Vec<ToolRequest>| {
            let batches = Arc::clone(&batches);
            async move {
                batches.lock().await.push(requests.clone());
                Ok(requests
                    .into_iter()
                    .map(|request| ToolResponse::ok(json!(request.tool), request.request_id))
                    .collect())
            }
            .boxed()
        })
    }

    fn request(tool: &str) -> ToolRequest {
        ToolRequest::new("srv", tool)
    }

    #[tokio::test]
    async fn flushes_once_when_queue_reaches_batch_size() {
        let batches = Arc::new(AsyncMutex::new(Vec::new()));
        // Timer far in the future so only the size trigger can fire.
        let batcher = Arc::new(RequestBatcher::new(
            3,
            Duration::from_secs(30),
            echo_processor(Arc::clone(&batches)),
        ));

        let mut handles = Vec::new();
        for i in 0..3 {
            let batcher = Arc::clone(&batcher);
            handles.push(tokio::spawn(async move {
                batcher.add(request(&format!("tool-{i}"))).await
            }));
        }
        for handle in handles {
            let response = handle.await.expect("task completes");
            assert!(response.success);
            assert!(response.request_id.is_some());
        }

        let seen = batches.lock().await;
        assert_eq!(seen.len(), 1, "exactly one flush for the group");
        assert_eq!(seen[0].len(), 3);
        assert_eq!(batcher.pending().await, 0);
    }

    #[tokio::test]
    async fn timer_flushes_a_single_queued_request() {
        let batches = Arc::new(AsyncMutex::new(Vec::new()));
        let batcher = RequestBatcher::new(
            10,
            Duration::from_millis(30),
            echo_processor(Arc::clone(&batches)),
        );

        let response = batcher.add(request("lonely")).await;
        assert!(response.success);
        assert_eq!(response.data, Some(json!("lonely")));

        let seen = batches.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 1);
    }

    #[tokio::test]
    async fn processor_error_fails_every_caller() {
        let processor: BatchProcessor = Arc::new(|_requests| {
            async {
                Err(ManagerError::ServerNotFound {
                    server: "srv".to_string(),
                })
            }
            .boxed()
        });
        let batcher = Arc::new(RequestBatcher::new(2, Duration::from_secs(30), processor));

        let first = {
            let batcher = Arc::clone(&batcher);
            tokio::spawn(async move { batcher.add(request("a")).await })
        };
        let second = {
            let batcher = Arc::clone(&batcher);
            tokio::spawn(async move { batcher.add(request("b")).await })
        };

        for handle in [first, second] {
            let response = handle.await.expect("task completes");
            assert!(!response.success);
            assert!(response.error.expect("error set").contains("not registered"));
        }
    }

    #[tokio::test]
    async fn shutdown_fails_pending_callers_and_cancels_timer() {
        let batches = Arc::new(AsyncMutex::new(Vec::new()));
        let batcher = Arc::new(RequestBatcher::new(
            10,
            Duration::from_millis(50),
            echo_processor(Arc::clone(&batches)),
        ));

        let waiting = {
            let batcher = Arc::clone(&batcher);
            tokio::spawn(async move { batcher.add(request("doomed")).await })
        };
        // Let the add land in the queue before shutting down.
        tokio::time::sleep(Duration::from_millis(10)).await;
        batcher.shutdown().await;

        let response = waiting.await.expect("task completes");
        assert!(!response.success);
        assert!(response.error.expect("error set").contains("shut down"));

        // The armed timer must not fire a flush afterwards.
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(batches.lock().await.is_empty());
    }
}
