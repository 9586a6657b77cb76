//! Observer subsystem (C8): register/unregister observers, filter by event
//! type, dispatch with isolation.
//!
//! The emit path never blocks the emitter: `notify` takes a snapshot of
//! matching registrations under a read lock and hands each one to its own
//! `tokio::spawn`ed task, so a slow or panicking observer can't starve or
//! crash the others. This generalizes the teacher's panic-catching posture
//! in `internal/circular.rs` from "catch a panic, convert to an error" to
//! "catch a panic, log and drop" — the spec requires observer failures to
//! never surface to the emitter.

use crate::event::{Event, EventType};
use crate::logger::Logger;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// An observer's subscription identity, issued at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

fn next_observer_id() -> ObserverId {
    ObserverId(NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed))
}

#[async_trait]
pub trait Observer: Send + Sync {
    /// Identity used in error/panic log lines.
    fn name(&self) -> &str;

    /// Handles one event. An `Err` is logged against this observer's name
    /// and the event type, never surfaced to the emitter.
    async fn on_event(&self, event: &Event) -> Result<(), String>;
}

struct Registration {
    observer: Arc<dyn Observer>,
    filter: HashSet<EventType>,
}

/// Per-application table of observer registrations, guarded by a
/// reader-writer lock (§5). Registration with an empty filter means "all
/// events"; unregister is idempotent.
pub struct ObserverRegistry {
    registrations: RwLock<Vec<(ObserverId, Registration)>>,
    logger: Arc<dyn Logger>,
}

impl ObserverRegistry {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            registrations: RwLock::new(Vec::new()),
            logger,
        }
    }

    /// Registers `observer`, interested only in event types in `filter`
    /// (an empty filter subscribes to every event).
    pub fn register(&self, observer: Arc<dyn Observer>, filter: Vec<EventType>) -> ObserverId {
        let id = next_observer_id();
        let mut guard = self.registrations.write().unwrap_or_else(|e| e.into_inner());
        guard.push((
            id,
            Registration {
                observer,
                filter: filter.into_iter().collect(),
            },
        ));
        id
    }

    /// Idempotent: unregistering an unknown or already-removed id is not an
    /// error.
    pub fn unregister(&self, id: ObserverId) {
        let mut guard = self.registrations.write().unwrap_or_else(|e| e.into_inner());
        guard.retain(|(existing, _)| *existing != id);
    }

    pub fn len(&self) -> usize {
        self.registrations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshots matching observers under a read lock, then dispatches to
    /// each asynchronously and returns immediately — the emitter never
    /// blocks on observer work.
    pub fn notify(&self, event: Event) {
        let event_type = event.event_type.clone();
        let matching: Vec<Arc<dyn Observer>> = {
            let guard = self.registrations.read().unwrap_or_else(|e| e.into_inner());
            guard
                .iter()
                .filter(|(_, reg)| reg.filter.is_empty() || reg.filter.iter().any(|t| t.prefixed() == event_type))
                .map(|(_, reg)| Arc::clone(&reg.observer))
                .collect()
        };

        for observer in matching {
            let event = event.clone();
            let logger = Arc::clone(&self.logger);
            // Each dispatch is its own supervised child task: `tokio::spawn`
            // already isolates panics (a panicking task yields a `JoinError`
            // rather than unwinding its caller), so nesting one more spawn
            // per observer is what gives "a slow or failing observer cannot
            // starve or crash others" without hand-rolled catch_unwind.
            tokio::spawn(async move {
                let name = observer.name().to_string();
                let event_type = event.event_type.clone();
                let handle = tokio::spawn(async move { observer.on_event(&event).await });
                match handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(msg)) => {
                        logger.error(&format!(
                            "observer '{name}' failed on event '{event_type}': {msg}"
                        ));
                    }
                    Err(join_err) => {
                        logger.error(&format!(
                            "observer '{name}' panicked on event '{event_type}': {join_err}"
                        ));
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct CountingObserver {
        name: String,
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Observer for CountingObserver {
        fn name(&self) -> &str {
            &self.name
        }

        async fn on_event(&self, _event: &Event) -> Result<(), String> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn empty_filter_receives_every_event() {
        let registry = ObserverRegistry::new(crate::logger::default_logger());
        let count = Arc::new(AtomicUsize::new(0));
        registry.register(
            Arc::new(CountingObserver {
                name: "watcher".into(),
                count: Arc::clone(&count),
            }),
            vec![],
        );

        registry.notify(Event::new(EventType::ModuleRegistered, "test", serde_json::json!({})));
        registry.notify(Event::new(EventType::ConfigLoaded, "test", serde_json::json!({})));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn filter_excludes_non_matching_events() {
        let registry = ObserverRegistry::new(crate::logger::default_logger());
        let count = Arc::new(AtomicUsize::new(0));
        registry.register(
            Arc::new(CountingObserver {
                name: "watcher".into(),
                count: Arc::clone(&count),
            }),
            vec![EventType::ModuleRegistered],
        );

        registry.notify(Event::new(EventType::ConfigLoaded, "test", serde_json::json!({})));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unregister_stops_further_delivery() {
        let registry = ObserverRegistry::new(crate::logger::default_logger());
        let count = Arc::new(AtomicUsize::new(0));
        let id = registry.register(
            Arc::new(CountingObserver {
                name: "watcher".into(),
                count: Arc::clone(&count),
            }),
            vec![],
        );

        registry.unregister(id);
        registry.unregister(id); // idempotent
        registry.notify(Event::new(EventType::ModuleRegistered, "test", serde_json::json!({})));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
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
    async fn panicking_observer_does_not_prevent_others() {
        let registry = ObserverRegistry::new(crate::logger::default_logger());
        let count = Arc::new(AtomicUsize::new(0));
        registry.register(Arc::new(PanickingObserver), vec![]);
        registry.register(
            Arc::new(CountingObserver {
                name: "watcher".into(),
                count: Arc::clone(&count),
            }),
            vec![],
        );

        registry.notify(Event::new(EventType::ModuleRegistered, "test", serde_json::json!({})));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
