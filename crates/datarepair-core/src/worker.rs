use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::InjuredSegment;
use crate::error::QueueError;
use crate::queue::RepairQueue;

/// Repairs one injured segment (downloads the healthy pieces, rebuilds the lost ones, ...).
///
/// Delivery is at-least-once, so implementations must tolerate seeing the same
/// segment twice.
#[async_trait]
pub trait SegmentRepairer: Send + Sync {
    async fn repair(&self, segment: &InjuredSegment) -> Result<(), String>;
}

/// Worker group handle.
/// - `request_shutdown()` するか handle を drop するとワーカー全体が止まる
///   （実行中の repair は最後まで走る）
/// - `join()` / `shutdown_and_join()` で全ワーカーの終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers. Each sleeps `idle_backoff` when the queue is empty.
    pub fn spawn(
        n: usize,
        queue: Arc<dyn RepairQueue>,
        repairer: Arc<dyn SegmentRepairer>,
        idle_backoff: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let q = Arc::clone(&queue);
            let r = Arc::clone(&repairer);
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, q, r, idle_backoff, &mut rx).await;
            });
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    /// Stop taking new segments. In-flight repairs are not cancelled.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for all workers without requesting shutdown.
    pub async fn join(self) {
        for j in self.joins {
            if let Err(e) = j.await {
                tracing::error!(error = %e, "worker task panicked");
            }
        }
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        self.join().await;
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<dyn RepairQueue>,
    repairer: Arc<dyn SegmentRepairer>,
    idle_backoff: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    tracing::debug!(worker_id, "repair worker started");
    loop {
        // shutdown 要求、または WorkerGroup ごと drop されたら抜ける
        if *shutdown_rx.borrow() || shutdown_rx.has_changed().is_err() {
            break;
        }

        let segment = match queue.dequeue().await {
            Ok(segment) => segment,
            Err(QueueError::Empty) => {
                idle(idle_backoff, shutdown_rx).await;
                continue;
            }
            Err(err @ QueueError::Delete { .. }) => {
                // 読めたものは捨てない。再配送されるので repair 側は冪等であること。
                tracing::warn!(worker_id, error = %err, "repairing segment that remains queued");
                match err.into_recovered_segment() {
                    Some(segment) => segment,
                    None => continue,
                }
            }
            Err(err) => {
                tracing::warn!(worker_id, kind = %err.kind(), error = %err, "dequeue failed");
                idle(idle_backoff, shutdown_rx).await;
                continue;
            }
        };

        match repairer.repair(&segment).await {
            Ok(()) => tracing::info!(worker_id, path = %segment.path(), "segment repaired"),
            Err(e) => tracing::error!(worker_id, path = %segment.path(), error = %e, "repair failed"),
        }
    }
    tracing::debug!(worker_id, "repair worker stopped");
}

/// Sleep, waking early on shutdown.
async fn idle(backoff: Duration, shutdown_rx: &mut watch::Receiver<bool>) {
    tokio::select! {
        _ = shutdown_rx.changed() => {}
        _ = tokio::time::sleep(backoff) => {}
    }
}
