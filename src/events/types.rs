//--------------------------------------------------------------------------------------------------
// STRUCTS & ENUMS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|------------------|
// | Priority                | Dispatch ordering for registered links           | ord, default      |
// | AsyncPool               | Which worker pool an async link runs on          |                   |
// | BusError                | Error types for the event bus                    | error, from       |
//--------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dispatch priority for a registered link.
///
/// Lower variants dispatch first: for a single `fire` call, every matching
/// `Highest` link runs (or is submitted) before any `High` link, and so on.
/// Links sharing a priority keep their registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Highest,
    High,
    Default,
    Low,
    Lowest,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Default
    }
}

/// The worker pool an asynchronous link is submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AsyncPool {
    /// Bounded worker count, excess submissions queue. The cheap async path.
    Fixed,
    /// Unbounded worker growth with idle reclamation. Markedly more
    /// expensive per submission; intended for bursty or rare async work.
    Cached,
}

/// Errors that can occur in the event bus
#[derive(Error, Debug, Clone)]
pub enum BusError {
    /// A binding declares one event type but its link accepts another.
    /// Surfaced at subscribe time, never deferred to dispatch.
    #[error("binding declares event type {declared} but its link accepts {actual}")]
    HandlerTypeMismatch {
        declared: &'static str,
        actual: &'static str,
    },

    /// Failed to load or validate bus configuration
    #[error("invalid bus configuration: {0}")]
    Config(String),
}

/// Type alias for Result with BusError
pub type BusResult<T> = Result<T, BusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_highest_first() {
        assert!(Priority::Highest < Priority::High);
        assert!(Priority::High < Priority::Default);
        assert!(Priority::Default < Priority::Low);
        assert!(Priority::Low < Priority::Lowest);
    }

    #[test]
    fn default_priority_is_the_middle_ordinal() {
        assert_eq!(Priority::default(), Priority::Default);
    }
}
