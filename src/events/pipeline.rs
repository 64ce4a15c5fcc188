use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, bounded, select, unbounded};
use parking_lot::Mutex;
use tracing::{info, warn};

use super::pool::{Task, WorkerPool};
use super::types::AsyncPool;

/// One async dispatch pipeline: a worker pool, optionally fronted by an
/// ordering queue and a dedicated processor thread.
///
/// In threaded-management mode submissions land on an unbounded queue and a
/// processor thread forwards them to the pool one by one; the stop channel
/// is its interruption signal: once signaled it stops pulling new work,
/// while tasks already handed to the pool are unaffected. In direct mode
/// submissions go straight to the pool and no processor thread exists.
pub(crate) struct Pipeline {
    kind: AsyncPool,
    pool: Arc<WorkerPool>,
    queue_tx: Option<Sender<Task>>,
    stop_tx: Option<Sender<()>>,
    processor: Mutex<Option<JoinHandle<()>>>,
    halted: AtomicBool,
    grace: Duration,
}

impl Pipeline {
    pub(crate) fn new(
        kind: AsyncPool,
        pool: Arc<WorkerPool>,
        threaded_management: bool,
        grace: Duration,
    ) -> Self {
        let (queue_tx, stop_tx, processor) = if threaded_management {
            let (queue_tx, queue_rx) = unbounded::<Task>();
            let (stop_tx, stop_rx) = bounded::<()>(1);
            let processor_pool = Arc::clone(&pool);
            let handle = thread::spawn(move || {
                info!(pipeline = ?kind, "event processor started");
                loop {
                    select! {
                        recv(queue_rx) -> task => match task {
                            Ok(task) => processor_pool.submit(task),
                            Err(_) => break,
                        },
                        recv(stop_rx) -> _ => break,
                    }
                }
                info!(pipeline = ?kind, "event processor stopped");
            });
            (Some(queue_tx), Some(stop_tx), Some(handle))
        } else {
            (None, None, None)
        };

        Self {
            kind,
            pool,
            queue_tx,
            stop_tx,
            processor: Mutex::new(processor),
            halted: AtomicBool::new(false),
            grace,
        }
    }

    /// Routes one dispatch task into the pipeline. Never blocks the caller:
    /// the queue is unbounded and direct pool submission is non-blocking.
    pub(crate) fn submit(&self, task: Task) {
        if self.halted.load(Ordering::SeqCst) {
            warn!(pipeline = ?self.kind, "pipeline halted; dropping async dispatch");
            return;
        }
        match &self.queue_tx {
            Some(queue) => {
                if queue.send(task).is_err() {
                    warn!(pipeline = ?self.kind, "pipeline queue disconnected; dropping async dispatch");
                }
            }
            None => self.pool.submit(task),
        }
    }

    /// Tasks sitting in the ordering queue, waiting for the processor.
    /// Always zero in direct mode.
    pub(crate) fn queue_len(&self) -> usize {
        self.queue_tx.as_ref().map(Sender::len).unwrap_or(0)
    }

    /// Stops the processor thread (if any) and shuts the pool down within
    /// the grace period. Safe to call repeatedly; later calls are no-ops.
    pub(crate) fn halt(&self) {
        if self.halted.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(stop) = &self.stop_tx {
            // The processor may already have exited; nothing to signal then.
            let _ = stop.send(());
        }
        if let Some(handle) = self.processor.lock().take() {
            let _ = handle.join();
        }
        self.pool.shutdown(self.grace);
        info!(pipeline = ?self.kind, "pipeline halted");
    }

    pub(crate) fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }
}
