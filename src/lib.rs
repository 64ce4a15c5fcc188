//! # linkbus
//!
//! An in-process, typed publish/dispatch engine. Containers declare
//! prioritized handler links; producers fire event objects; the bus routes
//! each event to every link declared for its exact runtime type, inline on
//! the firing thread or on one of two async worker pools (a bounded fixed
//! pool and an elastic cached pool), each optionally fronted by an ordering
//! queue with a dedicated processor thread.
//!
//! ```rust
//! use std::sync::Arc;
//! use linkbus::{BindingDecl, Event, EventBus, EventMeta, Priority, Subscriber};
//!
//! struct Tick {
//!     meta: EventMeta,
//!     sequence: u64,
//! }
//!
//! impl Event for Tick {
//!     fn meta(&self) -> &EventMeta {
//!         &self.meta
//!     }
//!
//!     fn as_any(&self) -> &dyn std::any::Any {
//!         self
//!     }
//! }
//!
//! struct Telemetry;
//!
//! impl Subscriber for Telemetry {
//!     fn links(&self) -> Vec<BindingDecl> {
//!         vec![
//!             BindingDecl::handling(|tick: &Tick| println!("tick {}", tick.sequence))
//!                 .with_priority(Priority::High),
//!         ]
//!     }
//! }
//!
//! let bus = EventBus::new(2, false);
//! bus.subscribe(&Telemetry).unwrap();
//! bus.fire(Arc::new(Tick {
//!     meta: EventMeta::new(),
//!     sequence: 1,
//! }));
//! bus.shutdown();
//! ```

pub mod config;
pub mod events;

// Re-export key types for easier usage
pub use config::BusConfig;
pub use events::{
    AsyncPool, BindingDecl, BusError, BusResult, Event, EventBus, EventMeta, EventState, Link,
    Priority, Subscriber,
};
