//! The standardized event envelope emitted by the lifecycle engine (§6).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Dotted, stable event-type names (see spec §6 vocabulary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    ModuleRegistered,
    ModuleInitialized,
    ModuleStarted,
    ModuleStopped,
    ModuleFailed,
    ServiceRegistered,
    ServiceUnregistered,
    ServiceRequested,
    ConfigLoaded,
    ConfigValidated,
    ConfigChanged,
    ApplicationStarted,
    ApplicationStopped,
    ApplicationFailed,
}

impl EventType {
    /// The dotted vocabulary name, e.g. `"module.registered"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ModuleRegistered => "module.registered",
            EventType::ModuleInitialized => "module.initialized",
            EventType::ModuleStarted => "module.started",
            EventType::ModuleStopped => "module.stopped",
            EventType::ModuleFailed => "module.failed",
            EventType::ServiceRegistered => "service.registered",
            EventType::ServiceUnregistered => "service.unregistered",
            EventType::ServiceRequested => "service.requested",
            EventType::ConfigLoaded => "config.loaded",
            EventType::ConfigValidated => "config.validated",
            EventType::ConfigChanged => "config.changed",
            EventType::ApplicationStarted => "application.started",
            EventType::ApplicationStopped => "application.stopped",
            EventType::ApplicationFailed => "application.failed",
        }
    }

    /// Prefixed with the cross-language event-envelope domain, e.g.
    /// `"com.ferrous-modular.module.registered"`.
    pub fn prefixed(&self) -> String {
        format!("com.ferrous-modular.{}", self.as_str())
    }
}

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Monotonically increasing, time-ordered event id: `<unix_millis>-<seq>`.
fn next_event_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let seq = EVENT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{seq}")
}

/// The standardized event envelope: `{id, source, type, time, specversion,
/// data, extensions}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub time: String,
    pub specversion: &'static str,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub extensions: HashMap<String, String>,
}

impl Event {
    pub fn new(
        event_type: EventType,
        source: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            id: next_event_id(),
            source: source.into(),
            event_type: event_type.prefixed(),
            time: format!("{}.{:09}", now.as_secs(), now.subsec_nanos()),
            specversion: "1.0",
            data,
            extensions: HashMap::new(),
        }
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }
}
