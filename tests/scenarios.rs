use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use signalbus::{
    AsyncBus, AsyncBusConfig, AsyncListener, Bus, BusError, KeyedBus, Listener, ListenerResult,
    PrioritizedBus, SignalHandler, WaitForSignal,
};
use tracing_test::traced_test;

#[derive(Debug)]
struct Explosion {
    count: u32,
}

struct GameStarted;

struct RoomMessage(&'static str);

type Log = Arc<Mutex<Vec<String>>>;

fn explosion_recorder(log: &Log, tag: &'static str) -> Listener<Explosion> {
    let log = Arc::clone(log);
    Listener::new(move |e: &Explosion| log.lock().push(format!("{tag}({})", e.count)))
}

#[test]
fn test_explosion_priority_scenario() {
    let bus = PrioritizedBus::new();
    let log: Log = Arc::default();
    bus.register_with_priority(&explosion_recorder(&log, "B"), 1);
    bus.register_with_priority(&explosion_recorder(&log, "A"), 5);

    assert_eq!(bus.invoke(&Explosion { count: 3 }), 2);
    assert_eq!(*log.lock(), vec!["A(3)", "B(3)"]);
}

#[test]
fn test_game_started_wait_stays_fired() {
    let bus = Bus::new();
    let wait = WaitForSignal::<GameStarted>::new(&bus);
    assert!(wait.is_waiting());

    bus.invoke(&GameStarted);
    assert!(!wait.is_waiting());
    bus.invoke(&GameStarted);
    assert!(!wait.is_waiting());
    assert!(!bus.has_listeners::<GameStarted>());
}

#[test]
fn test_keyed_rooms_never_leak() {
    let bus: KeyedBus<&'static str> = KeyedBus::new();
    let lobby: Log = Arc::default();
    let arena: Log = Arc::default();
    for (key, log) in [("lobby", &lobby), ("arena", &arena)] {
        let log = Arc::clone(log);
        bus.register(
            &key,
            &Listener::new(move |m: &RoomMessage| log.lock().push(m.0.to_string())),
        );
    }

    bus.invoke(&"lobby", &RoomMessage("hi"));
    bus.invoke(&"arena", &RoomMessage("fight"));
    bus.invoke(&"", &RoomMessage("nobody"));

    assert_eq!(*lobby.lock(), vec!["hi"]);
    assert_eq!(*arena.lock(), vec!["fight"]);
}

#[test]
fn test_clear_counts_per_signal() {
    let bus = Bus::new();
    let log: Log = Arc::default();
    bus.register(&explosion_recorder(&log, "x"));
    bus.register(&Listener::<GameStarted>::ignoring(|| {}));

    bus.clear::<Explosion>();
    assert_eq!(bus.count::<Explosion>(), 0);
    assert_eq!(bus.count::<GameStarted>(), 1);
}

#[test]
#[traced_test]
fn test_faulting_listeners_are_isolated() {
    let bus = Bus::new();
    let log: Log = Arc::default();
    bus.register(&Listener::new(|_: &Explosion| Err::<(), _>("fuse wet")));
    bus.register(&Listener::new::<_, ()>(|_: &Explosion| panic!("crater")));
    bus.register(&explosion_recorder(&log, "survivor"));

    bus.invoke(&Explosion { count: 1 });
    assert_eq!(*log.lock(), vec!["survivor(1)"]);
    assert!(logs_contain("listener_failed"));
    assert!(logs_contain("listener_panicked"));
}

#[test]
fn test_remove_across_buses_is_rejected() {
    let a = Bus::new();
    let b = Bus::new();
    let log: Log = Arc::default();
    let id = a.register(&explosion_recorder(&log, "x"));

    let err = b.remove(id).unwrap_err();
    assert_eq!(err.as_label(), "bus_invalid_argument");
    assert_eq!(a.remove(id), Ok(true));
}

struct Persist {
    saved: AtomicU32,
}

#[async_trait]
impl SignalHandler<Explosion> for Persist {
    async fn handle(&self, signal: &Explosion) -> ListenerResult {
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.saved.fetch_add(signal.count, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "persist"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[traced_test]
async fn test_async_fan_out_completes_with_faults() {
    let bus = AsyncBus::with_config(AsyncBusConfig::named("world"));
    let persist = Arc::new(Persist {
        saved: AtomicU32::new(0),
    });
    let log: Log = Arc::default();

    bus.register_async(&AsyncListener::from_handler(Arc::clone(&persist)));
    bus.register_async(&AsyncListener::new(|_: Arc<Explosion>| async {
        Err::<(), _>("network down")
    }));
    bus.register(&explosion_recorder(&log, "sync"));

    bus.invoke_async(Explosion { count: 7 }).await.unwrap();
    assert_eq!(persist.saved.load(Ordering::SeqCst), 7);
    assert_eq!(*log.lock(), vec!["sync(7)"]);
    assert!(logs_contain("network down"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_bus_blocking_invoke_in_runtime() {
    let bus = AsyncBus::new();
    let persist = Arc::new(Persist {
        saved: AtomicU32::new(0),
    });
    bus.register_async(&AsyncListener::from_handler(Arc::clone(&persist)));

    bus.invoke(Explosion { count: 2 }).unwrap();
    assert_eq!(persist.saved.load(Ordering::SeqCst), 2);
}

#[test]
fn test_async_bus_blocking_invoke_outside_runtime() {
    let bus = AsyncBus::new();
    let persist = Arc::new(Persist {
        saved: AtomicU32::new(0),
    });
    bus.register_async(&AsyncListener::from_handler(Arc::clone(&persist)));

    bus.invoke(Explosion { count: 4 }).unwrap();
    assert_eq!(persist.saved.load(Ordering::SeqCst), 4);
}

#[tokio::test(flavor = "current_thread")]
async fn test_async_bus_blocking_invoke_on_current_thread_fails() {
    let bus = AsyncBus::new();
    assert_eq!(
        bus.invoke(Explosion { count: 1 }),
        Err(BusError::BlockingInRuntime)
    );
}

#[tokio::test]
async fn test_wait_composes_with_timeout() {
    let bus = AsyncBus::new();
    let wait = WaitForSignal::<GameStarted>::new(&bus);

    let starter = {
        let bus = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            bus.invoke_async(GameStarted).await
        })
    };

    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("game never started");
    starter.await.unwrap().unwrap();

    let late = WaitForSignal::<GameStarted>::new(&bus);
    assert!(
        tokio::time::timeout(Duration::from_millis(10), late)
            .await
            .is_err()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fire_and_forget_then_wait() {
    let bus = AsyncBus::new();
    let wait = WaitForSignal::<GameStarted>::new(&bus);

    bus.invoke_fire_and_forget(GameStarted).unwrap();
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("detached fan-out never delivered");
}
