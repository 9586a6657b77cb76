//! Scenario S6: many observers and many emitted events interleave safely,
//! and a panicking observer never blocks delivery to the others.

use async_trait::async_trait;
use ferrous_modular::observer::{Observer, ObserverRegistry};
use ferrous_modular::event::{Event, EventType};
use ferrous_modular::logger::default_logger;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct CountingObserver {
    count: Arc<AtomicUsize>,
}

#[async_trait]
impl Observer for CountingObserver {
    fn name(&self) -> &str {
        "counter"
    }
    async fn on_event(&self, _event: &Event) -> Result<(), String> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct PanickingObserver;

#[async_trait]
impl Observer for PanickingObserver {
    fn name(&self) -> &str {
        "panicker"
    }
    async fn on_event(&self, _event: &Event) -> Result<(), String> {
        panic!("boom");
    }
}

#[tokio::test]
async fn many_observers_many_events_all_delivered() {
    let registry = Arc::new(ObserverRegistry::new(default_logger()));
    let counters: Vec<Arc<AtomicUsize>> = (0..50).map(|_| Arc::new(AtomicUsize::new(0))).collect();

    for counter in &counters {
        registry.register(
            Arc::new(CountingObserver { count: Arc::clone(counter) }),
            vec![],
        );
    }
    registry.register(Arc::new(PanickingObserver), vec![]);

    for i in 0..20 {
        registry.notify(Event::new(
            EventType::ModuleInitialized,
            "stress",
            serde_json::json!({ "i": i }),
        ));
    }

    // notify() fires detached tasks; give them a moment to land.
    tokio::time::sleep(Duration::from_millis(200)).await;

    for counter in &counters {
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }
}

#[tokio::test]
async fn filtered_observer_only_sees_matching_event_types() {
    let registry = ObserverRegistry::new(default_logger());
    let count = Arc::new(AtomicUsize::new(0));
    registry.register(
        Arc::new(CountingObserver { count: Arc::clone(&count) }),
        vec![EventType::ApplicationStarted],
    );

    registry.notify(Event::new(EventType::ModuleInitialized, "x", serde_json::json!({})));
    registry.notify(Event::new(EventType::ApplicationStarted, "x", serde_json::json!({})));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
