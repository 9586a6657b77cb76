//! Tenant overlay (C9): per-tenant section configurations layered over the
//! application defaults, sharing the §4.4 provider policies.
//!
//! Grounded in the teacher's `labeled_scopes.rs` string-labeled map
//! structure, flattened from parent/child forking to a flat tenant-id keyed
//! map — tenants are siblings, not a hierarchy.

use crate::config::provider::{
    downcast_config, AnyConfigProvider, ImmutableProvider, IsolatedProvider,
};
use crate::error::{AppError, ErrorKind};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Opaque string key identifying a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `tenantID -> (sectionKey -> ConfigProvider)` (§4.9), guarded by a
/// reader-writer lock per §5.
#[derive(Default)]
pub struct TenantOverlay {
    sections: RwLock<HashMap<TenantId, HashMap<String, Arc<dyn AnyConfigProvider>>>>,
}

impl TenantOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `section`'s provider for `tenant`. Rejects only at the type
    /// level — a `None`/null provider can't be constructed in Rust, so the
    /// spec's "null/invalid-provider rejection" has no runtime counterpart
    /// here; the call simply can't be made with an absent provider.
    pub fn set_tenant_config(
        &self,
        tenant: TenantId,
        section: impl Into<String>,
        provider: Arc<dyn AnyConfigProvider>,
    ) {
        let mut guard = self.sections.write().unwrap_or_else(|e| e.into_inner());
        guard.entry(tenant).or_default().insert(section.into(), provider);
    }

    /// Wraps `value` in an [`IsolatedProvider`] and installs it for
    /// `tenant`/`section` — the convenience constructor the spec calls for.
    pub fn set_tenant_config_isolated<T: Clone + Send + Sync + 'static>(
        &self,
        tenant: TenantId,
        section: impl Into<String>,
        value: T,
    ) {
        self.set_tenant_config(tenant, section, Arc::new(IsolatedProvider::new(value)));
    }

    /// Wraps `value` in an [`ImmutableProvider`] and installs it for
    /// `tenant`/`section`.
    pub fn set_tenant_config_immutable<T: Send + Sync + 'static>(
        &self,
        tenant: TenantId,
        section: impl Into<String>,
        value: T,
    ) {
        self.set_tenant_config(tenant, section, Arc::new(ImmutableProvider::new(value)));
    }

    /// Retrieves the erased provider for `tenant`/`section`. Distinct error
    /// kinds for an unknown tenant vs. a known tenant missing that section,
    /// per §4.9.
    pub fn get_tenant_config(
        &self,
        tenant: &TenantId,
        section: &str,
    ) -> Result<Arc<dyn AnyConfigProvider>, AppError> {
        let guard = self.sections.read().unwrap_or_else(|e| e.into_inner());
        let sections = guard.get(tenant).ok_or_else(|| {
            AppError::new(ErrorKind::TenantNotFound, format!("tenant '{tenant}' not found"))
        })?;
        sections
            .get(section)
            .cloned()
            .ok_or_else(|| {
                AppError::new(
                    ErrorKind::TenantConfigNotFound,
                    format!("tenant '{tenant}' has no config for section '{section}'"),
                )
            })
    }

    /// Retrieves and downcasts `tenant`/`section`'s current value to `T`.
    /// [`ErrorKind::TenantConfigEmpty`] covers the case the spec calls
    /// "value nil" — a section registered under a different concrete type
    /// than the caller expects, the closest Rust analogue since there is no
    /// runtime-null config value.
    pub fn get_tenant_value<T: Send + Sync + 'static>(
        &self,
        tenant: &TenantId,
        section: &str,
    ) -> Result<Arc<T>, AppError> {
        let provider = self.get_tenant_config(tenant, section)?;
        downcast_config(provider.as_ref()).ok_or_else(|| {
            AppError::new(
                ErrorKind::TenantConfigEmpty,
                format!("tenant '{tenant}' section '{section}' is not of the requested type"),
            )
        })
    }

    pub fn tenants(&self) -> Vec<TenantId> {
        let guard = self.sections.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<TenantId> = guard.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn remove_tenant(&self, tenant: &TenantId) {
        let mut guard = self.sections.write().unwrap_or_else(|e| e.into_inner());
        guard.remove(tenant);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Features {
        flags: HashMap<String, bool>,
    }

    fn features(pairs: &[(&str, bool)]) -> Features {
        Features {
            flags: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn deep_isolation_between_tenants() {
        let overlay = TenantOverlay::new();
        let base = features(&[("f1", true)]);

        overlay.set_tenant_config_isolated(TenantId::new("t1"), "features", base.clone());
        overlay.set_tenant_config_isolated(TenantId::new("t2"), "features", base.clone());

        let t1_value = overlay
            .get_tenant_value::<Features>(&TenantId::new("t1"), "features")
            .unwrap();
        let mut mutated = (*t1_value).clone();
        mutated.flags.insert("f1".into(), false);
        mutated.flags.insert("new".into(), true);

        overlay.set_tenant_config_isolated(TenantId::new("t1"), "features", mutated);

        let t2_value = overlay
            .get_tenant_value::<Features>(&TenantId::new("t2"), "features")
            .unwrap();
        assert_eq!(*t2_value, base);
    }

    #[test]
    fn unknown_tenant_and_unknown_section_report_distinct_errors() {
        let overlay = TenantOverlay::new();
        overlay.set_tenant_config_isolated(TenantId::new("t1"), "features", features(&[]));

        let err = overlay
            .get_tenant_config(&TenantId::new("ghost"), "features")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TenantNotFound);

        let err = overlay
            .get_tenant_config(&TenantId::new("t1"), "missing-section")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TenantConfigNotFound);
    }
}
