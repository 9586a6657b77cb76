#![no_main]

use async_trait::async_trait;
use ferrous_modular::module::registry::ModuleRegistry;
use ferrous_modular::module::{DependencyAware, Module};
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

const NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

#[derive(Arbitrary, Debug)]
struct GraphSpec {
    // edges[i] is a bitmask over NAMES of module i's declared dependencies.
    edges: [u8; 6],
}

struct FuzzModule {
    name: &'static str,
    deps: Vec<&'static str>,
}

#[async_trait]
impl Module for FuzzModule {
    fn name(&self) -> &str {
        self.name
    }

    fn as_dependency_aware(&self) -> Option<&dyn DependencyAware> {
        if self.deps.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl DependencyAware for FuzzModule {
    fn dependencies(&self) -> Vec<String> {
        self.deps.iter().map(|s| s.to_string()).collect()
    }
}

fuzz_target!(|spec: GraphSpec| {
    let mut registry = ModuleRegistry::new();
    for (i, &name) in NAMES.iter().enumerate() {
        let mask = spec.edges[i];
        let deps: Vec<&'static str> = NAMES
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i && mask & (1 << j) != 0)
            .map(|(_, &n)| n)
            .collect();
        let _ = registry.register(Arc::new(FuzzModule { name, deps }));
    }

    // Must never panic: either a valid topological order or a reported
    // cycle, never an internal unwrap failure.
    match registry.resolve() {
        Ok(order) => assert_eq!(order.len(), NAMES.len()),
        Err(err) => assert_eq!(err.kind(), ferrous_modular::ErrorKind::CircularDependency),
    }
});
