//! Feeder contract (C2): abstract sources of configuration values.
//!
//! A feeder populates fields it recognises on a JSON value and leaves
//! everything else untouched. Optional capabilities are expressed as
//! default-bodied trait methods, mirroring the teacher's pattern of
//! structurally-detected optional behavior (`feed_key`, `feed_instances`,
//! `feed_with_module_context`) rather than a marker-trait-per-capability
//! scheme.

use crate::error::{AppError, ErrorKind};
use crate::tracker::FieldTracker;
use serde_json::Value;
use std::fmt::Debug;

pub type ConfigResult<T> = Result<T, AppError>;

/// Source of configuration values (§4.2).
///
/// The only required method is [`Feeder::feed`]; every other capability is a
/// default no-op a concrete feeder overrides when it applies. Every feeding
/// method receives the section's [`FieldTracker`] directly, rather than a
/// `set_tracker` setter: feeders are stored as `Arc<dyn Feeder>` in
/// [`crate::config::ConfigBuilder`], so a `&mut self` setter could never be
/// called on them once registered. A feeder that cares about provenance
/// calls `tracker.track_field(...)` itself as it writes each field; one that
/// doesn't can ignore the parameter.
pub trait Feeder: Send + Sync + Debug {
    /// Populates fields of `target` this feeder recognises. Unknown fields
    /// are left untouched.
    fn feed(&self, target: &mut Value, tracker: &FieldTracker) -> ConfigResult<()>;

    /// Section-scoped feeding: look up values under `section_key` rather
    /// than the feeder's default namespace. Feeders that don't distinguish
    /// sections can ignore this and rely on [`Feeder::feed`] alone.
    fn feed_key(&self, _section_key: &str, _target: &mut Value, _tracker: &FieldTracker) -> ConfigResult<()> {
        Ok(())
    }

    /// Whether this feeder implements [`Feeder::feed_key`]; the config
    /// builder calls `feed_key` only when this returns `true`, mirroring the
    /// Go reference's structural capability probe.
    fn supports_feed_key(&self) -> bool {
        false
    }

    /// Per-instance feeding for sections whose value is itself a keyed
    /// collection of sub-configs (e.g. a map of named connection configs).
    /// `prefix_of` maps an instance key to the variable-namespace prefix the
    /// feeder should search under.
    fn feed_instances(
        &self,
        _instances: &mut serde_json::Map<String, Value>,
        _prefix_of: &dyn Fn(&str) -> String,
    ) -> ConfigResult<()> {
        Ok(())
    }

    fn supports_feed_instances(&self) -> bool {
        false
    }

    /// Module-context-aware feeding: for non-`_main` sections, search a
    /// module-aware variable namespace before falling back to the
    /// unqualified name (`<MODULE>_<KEY>`, then `<KEY>_<MODULE>`, then
    /// `<KEY>`).
    fn feed_with_module_context(
        &self,
        target: &mut Value,
        _module_name: &str,
        tracker: &FieldTracker,
    ) -> ConfigResult<()> {
        self.feed(target, tracker)
    }

    fn supports_module_context(&self) -> bool {
        false
    }

    /// Feeder weight; higher priority is applied **later**, overriding
    /// earlier values (default 0). Ties break on insertion order.
    fn priority(&self) -> i64 {
        0
    }

    /// Identity used in provenance records and wrapped error messages.
    fn name(&self) -> &str;
}

/// Wraps a feeder-reported failure with the feeder's name, the operation
/// that failed (`"feed"`, `"feed_key"`, ...), and the section it was
/// feeding, so callers get a consistent message regardless of which
/// feeding method raised it.
pub fn feeder_error(
    name: &str,
    operation: &str,
    section: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> AppError {
    AppError::with_source(
        ErrorKind::ConfigFeederError,
        format!("feeder '{name}' {operation} failed for section '{section}'"),
        source,
    )
}
