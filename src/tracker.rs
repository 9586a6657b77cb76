//! Field tracker (C1): records which feeder populated which config field.
//!
//! Tracking is advisory — a poisoned lock here must never abort config
//! loading, so reads/writes recover from poisoning rather than propagate it.

use std::collections::HashMap;
use std::sync::RwLock;

/// Provenance recorded for one populated struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedField {
    /// Identity of the feeder that set the field (its type name or a label).
    pub source_feeder: String,
    /// The key the feeder matched in its source (env var, yaml path, ...).
    pub source_key: String,
    /// A debug rendering of the value that was written, for diagnostics.
    pub final_value: String,
}

/// Sink feeders report into as they populate a section's fields.
#[derive(Default)]
pub struct FieldTracker {
    fields: RwLock<HashMap<String, TrackedField>>,
}

impl FieldTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records which feeder populated `field_path` (e.g. `"_main.Port"`).
    ///
    /// Never fails: a poisoned lock is recovered rather than surfaced, per
    /// the "tracking is advisory" failure mode.
    pub fn track_field(&self, field_path: impl Into<String>, source: TrackedField) {
        let mut fields = self.fields.write().unwrap_or_else(|e| e.into_inner());
        fields.insert(field_path.into(), source);
    }

    /// Returns a snapshot of all tracked fields: path -> source.
    pub fn tracked_fields(&self) -> HashMap<String, TrackedField> {
        self.fields
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl std::fmt::Debug for FieldTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .fields
            .read()
            .map(|g| g.len())
            .unwrap_or(0);
        f.debug_struct("FieldTracker")
            .field("tracked_fields", &count)
            .finish()
    }
}
