//! Service registry (C5): a name + interface directory with deterministic
//! collision disambiguation and structural (interface-typed) lookup.

use crate::error::{AppError, ErrorKind};
use crate::key::InterfaceKey;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// `{originalName, actualName, instance, moduleName, moduleType}` (§3).
/// Services are first-class: the registry preserves both the name the
/// provider asked for and the (possibly disambiguated) name it is actually
/// reachable under.
pub struct ServiceEntry {
    pub original_name: String,
    pub actual_name: String,
    pub instance: Arc<dyn Any + Send + Sync>,
    pub module_name: String,
    pub interfaces: Vec<InterfaceKey>,
}

impl ServiceEntry {
    fn satisfies(&self, interface: InterfaceKey) -> bool {
        self.interfaces.iter().any(|k| *k == interface)
    }
}

/// `{name, required, matchByInterface, satisfiesInterfaceType}` (§3).
pub struct ServiceDependency {
    pub name: String,
    pub required: bool,
    pub match_by_interface: bool,
    pub satisfies_interface_type: Option<InterfaceKey>,
}

/// Name + interface directory (§4.5). Keyed internally by `actual_name`,
/// with a secondary `module_name -> [actual_name]` index mirroring the
/// reference's `servicesByModule`.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: HashMap<String, ServiceEntry>,
    by_module: HashMap<String, Vec<String>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `instance` under `original_name`, published by `module_name`.
    /// Collisions are resolved deterministically by suffixing
    /// `"-<moduleName>-<ordinal>"`; `original_name` itself is preserved
    /// unchanged on the returned entry. Returns the `actual_name` the
    /// service is reachable under.
    pub fn register(
        &mut self,
        original_name: impl Into<String>,
        module_name: impl Into<String>,
        instance: Arc<dyn Any + Send + Sync>,
        interfaces: Vec<InterfaceKey>,
    ) -> String {
        let original_name = original_name.into();
        let module_name = module_name.into();

        let actual_name = if self.entries.contains_key(&original_name) {
            let mut ordinal = 1usize;
            loop {
                let candidate = format!("{original_name}-{module_name}-{ordinal}");
                if !self.entries.contains_key(&candidate) {
                    break candidate;
                }
                ordinal += 1;
            }
        } else {
            original_name.clone()
        };

        self.entries.insert(
            actual_name.clone(),
            ServiceEntry {
                original_name,
                actual_name: actual_name.clone(),
                instance,
                module_name: module_name.clone(),
                interfaces,
            },
        );
        self.by_module
            .entry(module_name)
            .or_default()
            .push(actual_name.clone());

        actual_name
    }

    /// Retrieves the service registered under `name` and downcasts it to
    /// `T`. Error kinds: [`ErrorKind::ServiceNotFound`] and
    /// [`ErrorKind::ServiceIncompatible`] (the Rust analogue of the spec's
    /// "target not a pointer" — there is no untyped out-pointer here, the
    /// only failure possible is a type mismatch).
    pub fn lookup<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, AppError> {
        let entry = self.entries.get(name).ok_or_else(|| {
            AppError::new(ErrorKind::ServiceNotFound, format!("service '{name}' not found"))
        })?;
        Arc::clone(&entry.instance)
            .downcast::<T>()
            .map_err(|_| {
                AppError::new(
                    ErrorKind::ServiceIncompatible,
                    format!("service '{name}' does not satisfy the requested type"),
                )
            })
    }

    /// Structural lookup: every entry whose declared interfaces include
    /// `interface`.
    pub fn lookup_by_interface(&self, interface: InterfaceKey) -> Vec<&ServiceEntry> {
        self.entries
            .values()
            .filter(|e| e.satisfies(interface))
            .collect()
    }

    pub fn lookup_entry(&self, name: &str) -> Option<&ServiceEntry> {
        self.entries.get(name)
    }

    pub fn services_by_module(&self, module_name: &str) -> Vec<&ServiceEntry> {
        self.by_module
            .get(module_name)
            .map(|names| names.iter().filter_map(|n| self.entries.get(n)).collect())
            .unwrap_or_default()
    }

    /// A snapshot `name -> instance` for reading code that expects a flat
    /// map; mutating the returned map never affects the registry.
    pub fn snapshot(&self) -> HashMap<String, Arc<dyn Any + Send + Sync>> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), Arc::clone(&entry.instance)))
            .collect()
    }

    pub fn resolve_dependency(
        &self,
        dep: &ServiceDependency,
    ) -> Result<Option<&ServiceEntry>, AppError> {
        let found = if dep.match_by_interface {
            let interface = dep.satisfies_interface_type.expect(
                "ServiceDependency with match_by_interface set must carry satisfies_interface_type",
            );
            self.lookup_by_interface(interface).into_iter().next()
        } else {
            self.entries.get(&dep.name)
        };

        match (found, dep.required) {
            (Some(entry), _) => Ok(Some(entry)),
            (None, true) => Err(AppError::new(
                ErrorKind::RequiredServiceNotFound,
                format!("required service '{}' not found", dep.name),
            )),
            (None, false) => Ok(None),
        }
    }
}
