use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use super::event::Event;
use super::types::{AsyncPool, BusError, BusResult, Priority};

/// A type-erased event handler.
///
/// Built from a closure over one concrete event type; the concrete type's
/// [`TypeId`] is recorded at construction and drives the exact-type dispatch
/// match. Calling a link with an event of any other runtime type is a no-op.
#[derive(Clone)]
pub struct Link {
    event_type: TypeId,
    event_name: &'static str,
    call: Arc<dyn Fn(&dyn Event) + Send + Sync>,
}

impl Link {
    pub fn new<E, F>(handler: F) -> Self
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        Self {
            event_type: TypeId::of::<E>(),
            event_name: type_name::<E>(),
            call: Arc::new(move |event: &dyn Event| {
                if let Some(event) = event.as_any().downcast_ref::<E>() {
                    handler(event);
                }
            }),
        }
    }

    /// The concrete event type this link accepts
    pub fn event_type(&self) -> TypeId {
        self.event_type
    }

    pub fn event_name(&self) -> &'static str {
        self.event_name
    }

    pub(crate) fn call(&self, event: &dyn Event) {
        (self.call)(event);
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("event_type", &self.event_name)
            .finish()
    }
}

/// One handler declaration inside a container's registration list:
/// the link itself plus its dispatch metadata.
///
/// The declared event type defaults to the type the link was built over.
/// [`BindingDecl::declaring`] can override it when declarations are
/// assembled from dynamic descriptor tables; a declared type that differs
/// from the link's actual type is a configuration error and fails the whole
/// `subscribe` call before anything is registered.
#[derive(Debug, Clone)]
pub struct BindingDecl {
    link: Link,
    declared_type: TypeId,
    declared_name: &'static str,
    priority: Priority,
    pool: Option<AsyncPool>,
}

impl BindingDecl {
    pub fn new(link: Link) -> Self {
        let declared_type = link.event_type();
        let declared_name = link.event_name();
        Self {
            link,
            declared_type,
            declared_name,
            priority: Priority::default(),
            pool: None,
        }
    }

    /// Shorthand for `BindingDecl::new(Link::new(handler))`
    pub fn handling<E, F>(handler: F) -> Self
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        Self::new(Link::new(handler))
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Route this link through an async worker pool instead of running it
    /// inline on the firing thread.
    pub fn via_pool(mut self, pool: AsyncPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Override the declared event type. Checked against the link's actual
    /// type at subscribe time.
    pub fn declaring<E: Event>(mut self) -> Self {
        self.declared_type = TypeId::of::<E>();
        self.declared_name = type_name::<E>();
        self
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn pool(&self) -> Option<AsyncPool> {
        self.pool
    }

    pub(crate) fn into_binding(self, owner: TypeId, owner_name: &'static str) -> BusResult<Binding> {
        if self.declared_type != self.link.event_type() {
            return Err(BusError::HandlerTypeMismatch {
                declared: self.declared_name,
                actual: self.link.event_name(),
            });
        }
        Ok(Binding {
            id: Uuid::new_v4(),
            owner,
            owner_name,
            priority: self.priority,
            pool: self.pool,
            link: self.link,
        })
    }
}

/// A container of handler declarations.
///
/// Implementors expose their links as an explicit registration list; the bus
/// registers the whole container at once and later removes it by its runtime
/// type. A container with an empty list subscribes successfully and
/// contributes no bindings.
pub trait Subscriber: 'static {
    fn links(&self) -> Vec<BindingDecl>;
}

/// A registered link with its dispatch metadata. Immutable once registered;
/// only registry membership bounds its validity.
pub(crate) struct Binding {
    id: Uuid,
    owner: TypeId,
    owner_name: &'static str,
    priority: Priority,
    pool: Option<AsyncPool>,
    link: Link,
}

impl Binding {
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn owner(&self) -> TypeId {
        self.owner
    }

    pub(crate) fn owner_name(&self) -> &'static str {
        self.owner_name
    }

    pub(crate) fn priority(&self) -> Priority {
        self.priority
    }

    pub(crate) fn pool(&self) -> Option<AsyncPool> {
        self.pool
    }

    pub(crate) fn event_type(&self) -> TypeId {
        self.link.event_type()
    }

    pub(crate) fn link(&self) -> &Link {
        &self.link
    }
}
