use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// A unit of work submitted to a pool: one event/link pair, already bound.
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Executes submitted tasks on worker threads under one of two policies.
///
/// Fixed: a bounded number of workers looping on an unbounded intake
/// channel; excess submissions queue. Cached: no standing workers, just a
/// zero-capacity handoff channel that hands each task to an idle parked worker
/// when one exists, otherwise a fresh worker thread is spawned; workers
/// retire after sitting idle for the configured timeout. The cached policy
/// trades submission cost and memory for elasticity.
///
/// Every task runs under `catch_unwind`: a panicking handler is reported on
/// the error log and never takes the worker down.
pub(crate) struct WorkerPool {
    name: &'static str,
    intake: RwLock<Option<Sender<Task>>>,
    handoff: Option<CachedHandoff>,
    shared: Arc<PoolShared>,
}

struct CachedHandoff {
    rx: Receiver<Task>,
    idle_timeout: Duration,
}

struct PoolShared {
    name: &'static str,
    /// Set when the shutdown grace period elapses: workers stop taking
    /// queued tasks and exit as soon as their current task finishes.
    abandon: AtomicBool,
    live: Mutex<usize>,
    drained: Condvar,
}

impl PoolShared {
    fn worker_started(&self) {
        *self.live.lock() += 1;
    }

    fn worker_exited(&self) {
        let mut live = self.live.lock();
        *live -= 1;
        self.drained.notify_all();
    }
}

impl WorkerPool {
    pub(crate) fn fixed(name: &'static str, workers: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = unbounded::<Task>();
        let shared = Arc::new(PoolShared {
            name,
            abandon: AtomicBool::new(false),
            live: Mutex::new(workers),
            drained: Condvar::new(),
        });
        for _ in 0..workers {
            let rx = rx.clone();
            let shared = Arc::clone(&shared);
            thread::spawn(move || fixed_worker(rx, shared));
        }
        info!(pool = name, workers, "fixed worker pool started");
        Self {
            name,
            intake: RwLock::new(Some(tx)),
            handoff: None,
            shared,
        }
    }

    pub(crate) fn cached(name: &'static str, idle_timeout: Duration) -> Self {
        let (tx, rx) = bounded::<Task>(0);
        let shared = Arc::new(PoolShared {
            name,
            abandon: AtomicBool::new(false),
            live: Mutex::new(0),
            drained: Condvar::new(),
        });
        info!(pool = name, "cached worker pool started");
        Self {
            name,
            intake: RwLock::new(Some(tx)),
            handoff: Some(CachedHandoff { rx, idle_timeout }),
            shared,
        }
    }

    pub(crate) fn submit(&self, task: Task) {
        let intake = self.intake.read();
        let Some(sender) = intake.as_ref() else {
            warn!(pool = self.name, "pool is shut down; dropping task");
            return;
        };
        match &self.handoff {
            // Fixed: queue on the unbounded intake, a standing worker picks
            // it up.
            None => {
                if sender.send(task).is_err() {
                    warn!(pool = self.name, "pool intake disconnected; dropping task");
                }
            }
            // Cached: rendezvous with an idle worker, or grow by one.
            Some(handoff) => match sender.try_send(task) {
                Ok(()) => {}
                Err(TrySendError::Full(task)) => {
                    self.shared.worker_started();
                    let rx = handoff.rx.clone();
                    let idle_timeout = handoff.idle_timeout;
                    let shared = Arc::clone(&self.shared);
                    thread::spawn(move || cached_worker(task, rx, idle_timeout, shared));
                }
                Err(TrySendError::Disconnected(_)) => {
                    warn!(pool = self.name, "pool intake disconnected; dropping task");
                }
            },
        }
    }

    /// Stops accepting submissions, waits up to `grace` for workers to drain
    /// queued and in-flight tasks, then abandons whatever remains (workers
    /// observe the abandon flag before taking their next task; a thread
    /// cannot be killed, so the current task finishes on its own).
    /// Idempotent.
    pub(crate) fn shutdown(&self, grace: Duration) {
        let sender = self.intake.write().take();
        if sender.is_none() {
            return;
        }
        drop(sender);
        debug!(pool = self.name, "pool intake closed; draining workers");

        let deadline = Instant::now() + grace;
        let mut live = self.shared.live.lock();
        while *live > 0 {
            if self
                .shared
                .drained
                .wait_until(&mut live, deadline)
                .timed_out()
            {
                break;
            }
        }
        if *live > 0 {
            self.shared.abandon.store(true, Ordering::SeqCst);
            warn!(
                pool = self.name,
                workers = *live,
                "grace period elapsed; abandoning remaining tasks"
            );
        } else {
            info!(pool = self.name, "pool terminated");
        }
    }

    #[cfg(test)]
    pub(crate) fn live_workers(&self) -> usize {
        *self.shared.live.lock()
    }
}

fn fixed_worker(rx: Receiver<Task>, shared: Arc<PoolShared>) {
    while let Ok(task) = rx.recv() {
        if shared.abandon.load(Ordering::SeqCst) {
            break;
        }
        run_task(shared.name, task);
    }
    shared.worker_exited();
}

fn cached_worker(seed: Task, rx: Receiver<Task>, idle_timeout: Duration, shared: Arc<PoolShared>) {
    run_task(shared.name, seed);
    loop {
        if shared.abandon.load(Ordering::SeqCst) {
            break;
        }
        match rx.recv_timeout(idle_timeout) {
            Ok(task) => run_task(shared.name, task),
            // Idle timeout or intake closed: retire the worker.
            Err(_) => break,
        }
    }
    shared.worker_exited();
}

fn run_task(pool: &'static str, task: Task) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(task)) {
        let detail = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(pool, detail = %detail, "event handler panicked inside pool task");
    }
}
