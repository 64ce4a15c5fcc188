use std::any::{TypeId, type_name};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::BusConfig;

use super::event::Event;
use super::link::{Binding, Subscriber};
use super::pipeline::Pipeline;
use super::pool::{Task, WorkerPool};
use super::registry::Registry;
use super::types::{AsyncPool, BusResult};

/// Central publish/dispatch engine.
///
/// Containers register their links with [`EventBus::subscribe`]; producers
/// call [`EventBus::fire`], which walks the registered bindings in priority
/// order, matches on the event's exact runtime type, and either invokes the
/// link inline (synchronous bindings) or submits it to one of the two async
/// pipelines. `fire` returns once every matching binding has been routed;
/// async bindings are submitted, not awaited.
///
/// Synchronous links run on the firing thread strictly in ascending
/// priority order, so a higher-priority link's mutation of the event is
/// visible to every link invoked after it in the same `fire` call. Async
/// links are submitted in priority order but may execute and complete in
/// any order; a caller that mutates an event after `fire` returns races
/// its own async links.
///
/// Dropping the bus shuts it down, so owning scopes release the pools and
/// processor threads without any process-level hook.
pub struct EventBus {
    config: BusConfig,
    registry: Registry,
    fixed: Pipeline,
    cached: Pipeline,
}

impl EventBus {
    /// Creates a bus with the given fixed-pool worker count and management
    /// mode; everything else from [`BusConfig::default`].
    pub fn new(fixed_pool_size: usize, threaded_management: bool) -> Self {
        Self::with_config(BusConfig {
            fixed_pool_size,
            threaded_management,
            ..BusConfig::default()
        })
    }

    pub fn with_config(config: BusConfig) -> Self {
        let fixed_pool = Arc::new(WorkerPool::fixed("fixed", config.fixed_pool_size));
        let cached_pool = Arc::new(WorkerPool::cached("cached", config.cached_idle_timeout));
        let fixed = Pipeline::new(
            AsyncPool::Fixed,
            fixed_pool,
            config.threaded_management,
            config.shutdown_grace,
        );
        let cached = Pipeline::new(
            AsyncPool::Cached,
            cached_pool,
            config.threaded_management,
            config.shutdown_grace,
        );
        debug!(
            fixed_pool_size = config.fixed_pool_size,
            threaded_management = config.threaded_management,
            "event bus constructed"
        );
        Self {
            config,
            registry: Registry::new(),
            fixed,
            cached,
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Registers every link the container declares.
    ///
    /// Idempotent per container *type*: if any binding owned by this runtime
    /// type already exists, the call is a no-op, so subscribing two instances
    /// of the same type registers the first and ignores the second. A
    /// declaration whose declared event type disagrees with its link fails
    /// the whole call before anything is registered.
    ///
    /// Safe to call while another thread is firing; in-flight dispatches
    /// observe either the old or the new binding list.
    pub fn subscribe<S: Subscriber>(&self, container: &S) -> BusResult<()> {
        let owner = TypeId::of::<S>();
        let owner_name = type_name::<S>();
        if self.registry.contains_owner(owner) {
            debug!(owner = owner_name, "container type already subscribed");
            return Ok(());
        }

        let decls = container.links();
        let mut bindings: Vec<Binding> = Vec::with_capacity(decls.len());
        for decl in decls {
            bindings.push(decl.into_binding(owner, owner_name)?);
        }
        let registered = bindings.len();
        self.registry.insert(bindings);
        debug!(owner = owner_name, bindings = registered, "subscribed");
        Ok(())
    }

    /// Removes every binding whose owner has the container's runtime type.
    /// Silent when none match.
    pub fn unsubscribe<S: Subscriber>(&self, _container: &S) {
        let removed = self.registry.remove_owner(TypeId::of::<S>());
        debug!(owner = type_name::<S>(), removed, "unsubscribed");
    }

    /// Whether any binding is owned by the container's runtime type.
    pub fn is_subscribed<S: Subscriber>(&self, _container: &S) -> bool {
        self.registry.contains_owner(TypeId::of::<S>())
    }

    /// Fires an event at every binding declared for its exact runtime type.
    ///
    /// Matching is exact: a link for one concrete event type never observes
    /// another type, related or not. The cancellation flag
    /// is never consulted here: firing a canceled event still reaches every
    /// matching link. Zero matches is a no-op.
    ///
    /// A panic in a synchronous link propagates to the caller and aborts
    /// the remaining links of this call; async links panic inside the pool,
    /// where it is caught and logged.
    pub fn fire(&self, event: Arc<dyn Event>) {
        let event_type = event.as_any().type_id();
        let snapshot = self.registry.snapshot();
        for binding in snapshot.iter() {
            if binding.event_type() != event_type {
                continue;
            }
            trace!(
                binding = %binding.id(),
                owner = binding.owner_name(),
                event = binding.link().event_name(),
                "routing event"
            );
            match binding.pool() {
                None => binding.link().call(event.as_ref()),
                Some(pool) => {
                    let event = Arc::clone(&event);
                    let binding = Arc::clone(binding);
                    let task: Task = Box::new(move || binding.link().call(event.as_ref()));
                    match pool {
                        AsyncPool::Fixed => self.fixed.submit(task),
                        AsyncPool::Cached => self.cached.submit(task),
                    }
                }
            }
        }
    }

    /// Reclaims async pipelines no registered binding needs: each pipeline
    /// whose pool has no bindings is halted (processor stopped, pool shut
    /// down), independently of the other. Already-halted pipelines are
    /// no-ops, so this is safe to call repeatedly.
    pub fn cull_async(&self) {
        if !self.registry.has_pool(AsyncPool::Cached) {
            self.cached.halt();
        }
        if !self.registry.has_pool(AsyncPool::Fixed) {
            self.fixed.halt();
        }
    }

    /// Halts both pipelines unconditionally: processors stop pulling work,
    /// pools stop accepting submissions and get up to the configured grace
    /// period to drain before remaining tasks are abandoned. Idempotent.
    pub fn shutdown(&self) {
        self.cached.halt();
        self.fixed.halt();
    }

    /// Dispatch tasks waiting in the fixed pipeline's ordering queue.
    /// Always zero in direct-submission mode.
    pub fn fixed_queue_len(&self) -> usize {
        self.fixed.queue_len()
    }

    /// Dispatch tasks waiting in the cached pipeline's ordering queue.
    /// Always zero in direct-submission mode.
    pub fn cached_queue_len(&self) -> usize {
        self.cached.queue_len()
    }

    /// Whether the fixed pipeline has not been culled or shut down.
    pub fn fixed_pipeline_active(&self) -> bool {
        !self.fixed.is_halted()
    }

    /// Whether the cached pipeline has not been culled or shut down.
    pub fn cached_pipeline_active(&self) -> bool {
        !self.cached.is_halted()
    }

    /// Total registered bindings across all owners.
    pub fn binding_count(&self) -> usize {
        self.registry.len()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.shutdown();
    }
}
