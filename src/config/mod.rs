//! Config builder (C3): orchestrates feeders across registered sections,
//! tracks provenance, validates, and commits the result into a provider.

pub mod provider;

use crate::error::{AppError, ErrorKind};
use crate::feeder::{feeder_error, Feeder};
use crate::tracker::FieldTracker;
use serde_json::Value;
use std::sync::Arc;

/// A section's validation step (§4.3 step 2b): checks required fields are
/// present and reports the offending field path on failure.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Optional per-section hook invoked last, after validation, mirroring the
/// Go reference's `Setup()` convention.
pub trait ConfigSetup {
    fn setup(&mut self) -> Result<(), String>;
}

/// A registered `(sectionKey, target)` pair the builder feeds into.
///
/// The target is a `serde_json::Value` object — the generic key/value bag
/// Design Notes §9 calls for in a host language without runtime reflection
/// over arbitrary structs. Typed access happens by deserializing the bag
/// once feeding is complete (see [`SectionFeedable::into_typed`] callers in
/// `src/app.rs`).
pub struct SectionTarget {
    pub section_key: String,
    pub value: Value,
    validate: Option<Box<dyn Fn(&Value) -> Result<(), String> + Send + Sync>>,
    setup: Option<Box<dyn FnMut(&mut Value) -> Result<(), String> + Send + Sync>>,
}

impl SectionTarget {
    pub fn new(section_key: impl Into<String>, initial: Value) -> Self {
        Self {
            section_key: section_key.into(),
            value: initial,
            validate: None,
            setup: None,
        }
    }

    pub fn with_validate(
        mut self,
        validate: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validate = Some(Box::new(validate));
        self
    }

    pub fn with_setup(
        mut self,
        setup: impl FnMut(&mut Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.setup = Some(Box::new(setup));
        self
    }
}

/// The `_main` section key, reserved for the application-wide configuration.
pub const MAIN_SECTION: &str = "_main";

/// Holds the feeder set and the registered section targets; `feed()`
/// implements the exact algorithm of §4.3.
#[derive(Default)]
pub struct ConfigBuilder {
    feeders: Vec<Arc<dyn Feeder>>,
    sections: Vec<SectionTarget>,
    tracker: Arc<FieldTracker>,
}

impl ConfigBuilder {
    pub fn new(tracker: Arc<FieldTracker>) -> Self {
        Self {
            feeders: Vec::new(),
            sections: Vec::new(),
            tracker,
        }
    }

    pub fn add_feeder(&mut self, feeder: Arc<dyn Feeder>) {
        self.feeders.push(feeder);
    }

    pub fn add_section(&mut self, section: SectionTarget) {
        self.sections.push(section);
    }

    pub fn tracker(&self) -> &Arc<FieldTracker> {
        &self.tracker
    }

    /// Runs the §4.3 feeding algorithm: stable priority sort, per-section
    /// feeder application (module-context-aware for non-`_main` sections,
    /// plus `feed_key` when supported), validation, then the `Setup` hook.
    ///
    /// Feeding operates on a temporary deep copy of each section's value;
    /// only on success is it committed back, preserving tenant isolation
    /// (§4.4/§4.9) and matching Design Notes §9's "adopt deep duplication
    /// from the outset" guidance.
    pub fn feed(&mut self) -> Result<(), AppError> {
        let mut feeders: Vec<&Arc<dyn Feeder>> = self.feeders.iter().collect();
        feeders.sort_by_key(|f| f.priority());

        for section in self.sections.iter_mut() {
            let mut temp = section.value.clone();
            let is_main = section.section_key == MAIN_SECTION;

            for feeder in &feeders {
                let result = if is_main {
                    feeder.feed(&mut temp, &self.tracker)
                } else if feeder.supports_module_context() {
                    feeder.feed_with_module_context(&mut temp, &section.section_key, &self.tracker)
                } else {
                    feeder.feed(&mut temp, &self.tracker)
                };
                result.map_err(|e| {
                    feeder_error(feeder.name(), "feed", &section.section_key, e)
                })?;

                if feeder.supports_feed_key() {
                    feeder
                        .feed_key(&section.section_key, &mut temp, &self.tracker)
                        .map_err(|e| {
                            feeder_error(feeder.name(), "feed_key", &section.section_key, e)
                        })?;
                }
            }

            if let Some(validate) = &section.validate {
                validate(&temp).map_err(|msg| {
                    AppError::new(
                        ErrorKind::ConfigValidationError,
                        format!("section '{}': {msg}", section.section_key),
                    )
                })?;
            }

            if let Some(setup) = &mut section.setup {
                setup(&mut temp).map_err(|msg| {
                    AppError::new(
                        ErrorKind::ConfigSetupError,
                        format!("section '{}': {msg}", section.section_key),
                    )
                })?;
            }

            section.value = temp;
        }

        Ok(())
    }

    pub fn section(&self, key: &str) -> Option<&Value> {
        self.sections
            .iter()
            .find(|s| s.section_key == key)
            .map(|s| &s.value)
    }

    pub fn sections(&self) -> &[SectionTarget] {
        &self.sections
    }
}
