//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the typed publish/dispatch engine: containers register prioritized
// links, producers fire events, and matching links run inline or on one of two worker pools.
//
// | Component                | Description                                                |
// |--------------------------|-----------------------------------------------------------|
// | Event / EventMeta        | Payload trait plus shared cancellation/lifecycle state    |
// | Link / BindingDecl       | Type-erased handler and its declared dispatch metadata    |
// | Registry                 | Copy-on-write binding list, sorted by priority            |
// | WorkerPool / Pipeline    | Fixed and cached execution paths, direct or queue-fronted |
// | EventBus                 | Routing, subscription lifecycle, cull and shutdown        |
//--------------------------------------------------------------------------------------------------

mod bus;
mod event;
mod link;
mod pipeline;
mod pool;
mod registry;
mod types;

// Re-exports
pub use bus::EventBus;
pub use event::{Event, EventMeta, EventState};
pub use link::{BindingDecl, Link, Subscriber};
pub use types::{AsyncPool, BusError, BusResult, Priority};
