use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Sender, bounded};
use parking_lot::{Mutex, RwLock};

use linkbus::{
    AsyncPool, BindingDecl, Event, EventBus, EventMeta, Priority, Subscriber,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

struct TestEvent {
    meta: EventMeta,
    message: RwLock<String>,
}

impl TestEvent {
    fn new(message: &str) -> Self {
        Self {
            meta: EventMeta::new(),
            message: RwLock::new(message.to_string()),
        }
    }

    fn message(&self) -> String {
        self.message.read().clone()
    }

    fn set_message(&self, message: &str) {
        *self.message.write() = message.to_string();
    }
}

impl Event for TestEvent {
    fn meta(&self) -> &EventMeta {
        &self.meta
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The end-to-end container: a highest-priority sync link that edits the
/// message, a default-priority sync link that reads it, and a fixed-pool
/// async link that reports what it saw.
struct Greeter {
    log: Arc<Mutex<Vec<(&'static str, String)>>>,
    async_tx: Sender<String>,
}

impl Subscriber for Greeter {
    fn links(&self) -> Vec<BindingDecl> {
        let edit_log = Arc::clone(&self.log);
        let read_log = Arc::clone(&self.log);
        let async_tx = self.async_tx.clone();
        vec![
            BindingDecl::handling(move |event: &TestEvent| {
                edit_log.lock().push(("highest", event.message()));
                event.set_message("Hello, Universe!");
            })
            .with_priority(Priority::Highest),
            BindingDecl::handling(move |event: &TestEvent| {
                read_log.lock().push(("default", event.message()));
            }),
            BindingDecl::handling(move |event: &TestEvent| {
                let _ = async_tx.send(event.message());
            })
            .via_pool(AsyncPool::Fixed),
        ]
    }
}

#[test]
fn end_to_end_priority_order_and_shared_mutation() {
    init_tracing();
    let bus = EventBus::new(1, false);
    let log = Arc::new(Mutex::new(Vec::new()));
    let (async_tx, async_rx) = bounded::<String>(1);
    bus.subscribe(&Greeter {
        log: Arc::clone(&log),
        async_tx,
    })
    .unwrap();

    let event = Arc::new(TestEvent::new("Hello, World!"));
    bus.fire(Arc::clone(&event) as Arc<dyn Event>);

    // Sync links ran inline, in priority order, the later one observing the
    // earlier one's edit.
    assert_eq!(
        *log.lock(),
        vec![
            ("highest", "Hello, World!".to_string()),
            ("default", "Hello, Universe!".to_string()),
        ]
    );
    assert_eq!(event.message(), "Hello, Universe!");

    // The async link was only submitted; wait for it here, bounded. Any
    // state the message legitimately passed through is acceptable.
    let observed = async_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("async link ran before the timeout");
    assert!(observed == "Hello, World!" || observed == "Hello, Universe!");

    bus.shutdown();
}

struct PingCounter {
    hits: Arc<AtomicUsize>,
}

impl Subscriber for PingCounter {
    fn links(&self) -> Vec<BindingDecl> {
        let hits = Arc::clone(&self.hits);
        vec![BindingDecl::handling(move |_: &TestEvent| {
            hits.fetch_add(1, Ordering::SeqCst);
        })]
    }
}

#[test]
fn unsubscribe_removes_every_binding_of_the_owner_type() {
    let bus = EventBus::new(1, false);
    let hits = Arc::new(AtomicUsize::new(0));
    let container = PingCounter {
        hits: Arc::clone(&hits),
    };

    bus.subscribe(&container).unwrap();
    assert!(bus.is_subscribed(&container));
    bus.fire(Arc::new(TestEvent::new("one")));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    bus.unsubscribe(&container);
    assert!(!bus.is_subscribed(&container));
    assert_eq!(bus.binding_count(), 0);

    bus.fire(Arc::new(TestEvent::new("two")));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn firing_with_no_matching_bindings_is_a_noop() {
    let bus = EventBus::new(1, false);
    bus.fire(Arc::new(TestEvent::new("nobody listens")));
}

#[test]
fn subscribe_during_concurrent_fire_is_safe() {
    let bus = Arc::new(EventBus::new(1, false));
    let hits = Arc::new(AtomicUsize::new(0));
    bus.subscribe(&PingCounter {
        hits: Arc::clone(&hits),
    })
    .unwrap();

    let firing = {
        let bus = Arc::clone(&bus);
        std::thread::spawn(move || {
            for _ in 0..1000 {
                bus.fire(Arc::new(TestEvent::new("burst")));
            }
        })
    };

    // Mutate the registry while the other thread fires; in-flight
    // dispatches see either the old or the new binding list.
    bus.subscribe(&SyncOnly).unwrap();
    bus.unsubscribe(&SyncOnly);

    firing.join().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1000);
}

/// Three links across the priority range; the first cancels the event.
struct CancelChain {
    invoked: Arc<AtomicUsize>,
}

impl Subscriber for CancelChain {
    fn links(&self) -> Vec<BindingDecl> {
        let first = Arc::clone(&self.invoked);
        let second = Arc::clone(&self.invoked);
        let third = Arc::clone(&self.invoked);
        vec![
            BindingDecl::handling(move |event: &TestEvent| {
                first.fetch_add(1, Ordering::SeqCst);
                event.set_canceled(true);
            })
            .with_priority(Priority::Highest),
            BindingDecl::handling(move |_: &TestEvent| {
                second.fetch_add(1, Ordering::SeqCst);
            }),
            BindingDecl::handling(move |_: &TestEvent| {
                third.fetch_add(1, Ordering::SeqCst);
            })
            .with_priority(Priority::Lowest),
        ]
    }
}

#[test]
fn cancellation_is_informational_only() {
    let bus = EventBus::new(1, false);
    let invoked = Arc::new(AtomicUsize::new(0));
    bus.subscribe(&CancelChain {
        invoked: Arc::clone(&invoked),
    })
    .unwrap();

    // A handler cancels mid-dispatch; the remaining handlers still run.
    let event = Arc::new(TestEvent::new("cancel me"));
    bus.fire(Arc::clone(&event) as Arc<dyn Event>);
    assert!(event.is_canceled());
    assert_eq!(invoked.load(Ordering::SeqCst), 3);

    // An event canceled before firing is dispatched to everyone anyway.
    let canceled = Arc::new(TestEvent::new("already canceled"));
    canceled.set_canceled(true);
    bus.fire(Arc::clone(&canceled) as Arc<dyn Event>);
    assert_eq!(invoked.load(Ordering::SeqCst), 6);
}

#[test]
fn shutdown_is_idempotent() {
    let bus = EventBus::new(1, false);
    bus.shutdown();
    bus.shutdown();
    assert!(!bus.fixed_pipeline_active());
    assert!(!bus.cached_pipeline_active());
}

struct SyncOnly;

impl Subscriber for SyncOnly {
    fn links(&self) -> Vec<BindingDecl> {
        vec![BindingDecl::handling(|_: &TestEvent| {})]
    }
}

#[test]
fn cull_with_no_async_bindings_halts_both_pipelines() {
    let bus = EventBus::new(1, false);
    bus.subscribe(&SyncOnly).unwrap();

    bus.cull_async();
    assert!(!bus.fixed_pipeline_active());
    assert!(!bus.cached_pipeline_active());

    // Already-culled pipelines are no-ops.
    bus.cull_async();
}

struct FixedAsyncProbe {
    tx: Sender<String>,
}

impl Subscriber for FixedAsyncProbe {
    fn links(&self) -> Vec<BindingDecl> {
        let tx = self.tx.clone();
        vec![
            BindingDecl::handling(move |event: &TestEvent| {
                let _ = tx.send(event.message());
            })
            .via_pool(AsyncPool::Fixed),
        ]
    }
}

#[test]
fn cull_spares_the_pipeline_a_binding_still_needs() {
    init_tracing();
    let bus = EventBus::new(1, false);
    let (tx, rx) = bounded::<String>(1);
    bus.subscribe(&FixedAsyncProbe { tx }).unwrap();

    bus.cull_async();
    assert!(bus.fixed_pipeline_active());
    assert!(!bus.cached_pipeline_active());

    // The surviving pipeline still delivers.
    bus.fire(Arc::new(TestEvent::new("still alive")));
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2)).unwrap(),
        "still alive"
    );

    bus.shutdown();
}

struct DualAsyncProbe {
    fixed_tx: Sender<&'static str>,
    cached_tx: Sender<&'static str>,
}

impl Subscriber for DualAsyncProbe {
    fn links(&self) -> Vec<BindingDecl> {
        let fixed_tx = self.fixed_tx.clone();
        let cached_tx = self.cached_tx.clone();
        vec![
            BindingDecl::handling(move |_: &TestEvent| {
                let _ = fixed_tx.send("fixed");
            })
            .via_pool(AsyncPool::Fixed),
            BindingDecl::handling(move |_: &TestEvent| {
                let _ = cached_tx.send("cached");
            })
            .via_pool(AsyncPool::Cached),
        ]
    }
}

#[test]
fn threaded_management_delivers_through_both_pipelines() {
    init_tracing();
    let bus = EventBus::new(2, true);
    let (fixed_tx, fixed_rx) = bounded::<&'static str>(1);
    let (cached_tx, cached_rx) = bounded::<&'static str>(1);
    bus.subscribe(&DualAsyncProbe { fixed_tx, cached_tx }).unwrap();

    bus.fire(Arc::new(TestEvent::new("both pools")));
    assert_eq!(fixed_rx.recv_timeout(Duration::from_secs(2)).unwrap(), "fixed");
    assert_eq!(
        cached_rx.recv_timeout(Duration::from_secs(2)).unwrap(),
        "cached"
    );

    bus.shutdown();
}

#[test]
fn direct_mode_delivers_through_both_pipelines() {
    let bus = EventBus::new(2, false);
    let (fixed_tx, fixed_rx) = bounded::<&'static str>(1);
    let (cached_tx, cached_rx) = bounded::<&'static str>(1);
    bus.subscribe(&DualAsyncProbe { fixed_tx, cached_tx }).unwrap();

    bus.fire(Arc::new(TestEvent::new("both pools")));
    assert_eq!(fixed_rx.recv_timeout(Duration::from_secs(2)).unwrap(), "fixed");
    assert_eq!(
        cached_rx.recv_timeout(Duration::from_secs(2)).unwrap(),
        "cached"
    );
}

/// A panicking async link ahead of a healthy one, both on the single fixed
/// worker: the panic must be contained by the pool, not the caller.
struct Exploder {
    tx: Sender<()>,
}

impl Subscriber for Exploder {
    fn links(&self) -> Vec<BindingDecl> {
        let tx = self.tx.clone();
        vec![
            BindingDecl::handling(|_: &TestEvent| panic!("handler blew up"))
                .with_priority(Priority::Highest)
                .via_pool(AsyncPool::Fixed),
            BindingDecl::handling(move |_: &TestEvent| {
                let _ = tx.send(());
            })
            .via_pool(AsyncPool::Fixed),
        ]
    }
}

#[test]
fn async_handler_panic_does_not_poison_the_pool_or_the_caller() {
    init_tracing();
    let bus = EventBus::new(1, false);
    let (tx, rx) = bounded::<()>(1);
    bus.subscribe(&Exploder { tx }).unwrap();

    // fire must return normally even though the first async link panics.
    bus.fire(Arc::new(TestEvent::new("boom")));
    rx.recv_timeout(Duration::from_secs(2))
        .expect("the worker survived the earlier panic");

    bus.shutdown();
}

#[test]
fn dropping_the_bus_tears_it_down() {
    let (tx, rx) = bounded::<String>(1);
    {
        let bus = EventBus::new(1, false);
        bus.subscribe(&FixedAsyncProbe { tx }).unwrap();
        bus.fire(Arc::new(TestEvent::new("scoped")));
        // Drop runs shutdown, which drains the in-flight dispatch within
        // the grace period.
    }
    assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), "scoped");
}
