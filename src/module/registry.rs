//! Module registry & dependency resolver (C6): stores modules by name and,
//! at init time, computes a topological order over the combined edge set of
//! declared and service-derived dependencies.
//!
//! Cycle detection is a DFS with white/gray/black coloring, grounded in the
//! wider pack's module-registry precedent rather than the teacher's own
//! circular-dependency guard (which is a resolution-time thread-local panic
//! catcher, suited to per-call detection, not an upfront whole-graph check
//! with an annotated cycle path — see SPEC_FULL.md §4.6).

use super::Module;
use crate::error::{AppError, ErrorKind};
use crate::key::InterfaceKey;
use crate::service::ServiceDependency;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The kind of a dependency edge, carried into cycle-error messages.
#[derive(Debug, Clone)]
pub enum EdgeKind {
    Declared,
    Service(String),
    Interface(&'static str),
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Declared => write!(f, "declared"),
            EdgeKind::Service(name) => write!(f, "service:{name}"),
            EdgeKind::Interface(type_name) => write!(f, "interface:{type_name}"),
        }
    }
}

struct Edge {
    from: String,
    to: String,
    kind: EdgeKind,
}

/// Stores registered modules and resolves their dependency order.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
    names: HashMap<String, usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `module` by name; collision is a hard error.
    pub fn register(&mut self, module: Arc<dyn Module>) -> Result<(), AppError> {
        let name = module.name().to_string();
        if self.names.contains_key(&name) {
            return Err(AppError::new(
                ErrorKind::DuplicateModule,
                format!("module '{name}' already registered"),
            ));
        }
        self.names.insert(name, self.modules.len());
        self.modules.push(module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.names.get(name).map(|&i| &self.modules[i])
    }

    pub fn all(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    /// Replaces the module at `name` with `replacement`, used after a
    /// `Constructable` module's constructor returns (§4.7 step 5b).
    pub fn replace(&mut self, name: &str, replacement: Arc<dyn Module>) {
        if let Some(&idx) = self.names.get(name) {
            self.modules[idx] = replacement;
        }
    }

    /// Computes the combined edge set (§4.6) and returns modules in
    /// topological order, stable on module name. Fails with
    /// [`ErrorKind::CircularDependency`] carrying the annotated cycle path,
    /// or [`ErrorKind::RequiredServiceNotFound`] if a required dependency
    /// has no provider anywhere in the registry.
    pub fn resolve(&self) -> Result<Vec<Arc<dyn Module>>, AppError> {
        let edges = self.build_edges()?;

        let mut adjacency: HashMap<&str, Vec<&Edge>> = HashMap::new();
        for edge in &edges {
            adjacency.entry(edge.from.as_str()).or_default().push(edge);
        }

        self.detect_cycle(&adjacency)?;
        Ok(self.topo_sort(&adjacency))
    }

    fn build_edges(&self) -> Result<Vec<Edge>, AppError> {
        let mut edges = Vec::new();

        // Step 1: declared module-name dependencies.
        for module in &self.modules {
            if let Some(dep_aware) = module.as_dependency_aware() {
                for dep in dep_aware.dependencies() {
                    if !self.names.contains_key(&dep) {
                        return Err(AppError::new(
                            ErrorKind::ModuleNotFound,
                            format!(
                                "module '{}' declares a dependency on unknown module '{dep}'",
                                module.name()
                            ),
                        ));
                    }
                    edges.push(Edge {
                        from: module.name().to_string(),
                        to: dep,
                        kind: EdgeKind::Declared,
                    });
                }
            }
        }

        // Static service/interface provision map, known without actually
        // registering services (providers declare names/interfaces ahead of
        // construction).
        let mut provider_by_name: HashMap<String, String> = HashMap::new();
        let mut providers_by_interface: HashMap<InterfaceKey, Vec<String>> = HashMap::new();
        for module in &self.modules {
            if let Some(provider) = module.as_service_provider() {
                for service in provider.provides() {
                    provider_by_name
                        .entry(service.name.clone())
                        .or_insert_with(|| module.name().to_string());
                    for interface in service.interfaces {
                        providers_by_interface
                            .entry(interface)
                            .or_default()
                            .push(module.name().to_string());
                    }
                }
            }
        }

        // Step 2: service-derived edges.
        for module in &self.modules {
            let Some(consumer) = module.as_service_consumer() else {
                continue;
            };
            for dep in consumer.requires() {
                self.add_service_edges(module.name(), &dep, &provider_by_name, &providers_by_interface, &mut edges)?;
            }
        }

        Ok(edges)
    }

    fn add_service_edges(
        &self,
        consumer_name: &str,
        dep: &ServiceDependency,
        provider_by_name: &HashMap<String, String>,
        providers_by_interface: &HashMap<InterfaceKey, Vec<String>>,
        edges: &mut Vec<Edge>,
    ) -> Result<(), AppError> {
        if dep.match_by_interface {
            let interface = dep.satisfies_interface_type.ok_or_else(|| {
                AppError::new(
                    ErrorKind::RequiredServiceNotFound,
                    format!(
                        "module '{consumer_name}' requires an interface match but declared no interface type"
                    ),
                )
            })?;
            let providers = providers_by_interface.get(&interface).cloned().unwrap_or_default();
            // A module's own provided interface never satisfies its own
            // requirement for it (no self-edge); leave it to another
            // provider, or error if none exists.
            let others: Vec<&String> = providers.iter().filter(|m| m.as_str() != consumer_name).collect();
            if others.is_empty() {
                if dep.required {
                    return Err(AppError::new(
                        ErrorKind::RequiredServiceNotFound,
                        format!(
                            "module '{consumer_name}' requires interface '{}' but no other module provides it",
                            interface.display_name()
                        ),
                    ));
                }
                return Ok(());
            }
            for provider in others {
                edges.push(Edge {
                    from: consumer_name.to_string(),
                    to: provider.clone(),
                    kind: EdgeKind::Interface(interface.display_name()),
                });
            }
        } else {
            match provider_by_name.get(&dep.name) {
                Some(provider) if provider != consumer_name => {
                    edges.push(Edge {
                        from: consumer_name.to_string(),
                        to: provider.clone(),
                        kind: EdgeKind::Service(dep.name.clone()),
                    });
                }
                Some(_) => {} // self-provided, no self-edge
                None if dep.required => {
                    return Err(AppError::new(
                        ErrorKind::RequiredServiceNotFound,
                        format!(
                            "module '{consumer_name}' requires service '{}' but no module provides it",
                            dep.name
                        ),
                    ));
                }
                None => {}
            }
        }
        Ok(())
    }

    fn detect_cycle(&self, adjacency: &HashMap<&str, Vec<&Edge>>) -> Result<(), AppError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: HashMap<&str, Color> = self
            .modules
            .iter()
            .map(|m| (m.name(), Color::White))
            .collect();
        let mut path: Vec<&str> = Vec::new();
        let mut path_edges: Vec<EdgeKind> = Vec::new();

        fn visit<'a>(
            node: &'a str,
            adjacency: &HashMap<&'a str, Vec<&'a Edge>>,
            color: &mut HashMap<&'a str, Color>,
            path: &mut Vec<&'a str>,
            path_edges: &mut Vec<EdgeKind>,
        ) -> Option<(Vec<String>, Vec<EdgeKind>)> {
            color.insert(node, Color::Gray);
            path.push(node);

            if let Some(edges) = adjacency.get(node) {
                for edge in edges {
                    let next_color = *color.get(edge.to.as_str()).unwrap_or(&Color::White);
                    match next_color {
                        Color::Gray => {
                            let idx = path.iter().position(|&n| n == edge.to).expect(
                                "gray node must be on the current DFS path",
                            );
                            let mut cycle_nodes: Vec<String> =
                                path[idx..].iter().map(|s| s.to_string()).collect();
                            let mut cycle_edges: Vec<EdgeKind> = path_edges[idx..].to_vec();
                            cycle_edges.push(edge.kind.clone());
                            cycle_nodes.push(edge.to.clone());
                            return Some((cycle_nodes, cycle_edges));
                        }
                        Color::White => {
                            path_edges.push(edge.kind.clone());
                            if let Some(cycle) =
                                visit(edge.to.as_str(), adjacency, color, path, path_edges)
                            {
                                return Some(cycle);
                            }
                            path_edges.pop();
                        }
                        Color::Black => {}
                    }
                }
            }
            color.insert(node, Color::Black);
            path.pop();
            None
        }

        let mut names: Vec<&str> = self.modules.iter().map(|m| m.name()).collect();
        names.sort_unstable();
        for name in names {
            if *color.get(name).unwrap_or(&Color::White) == Color::White {
                if let Some((nodes, edges)) =
                    visit(name, adjacency, &mut color, &mut path, &mut path_edges)
                {
                    let mut rendered = String::new();
                    for (i, node) in nodes.iter().enumerate() {
                        rendered.push_str(node);
                        if let Some(kind) = edges.get(i) {
                            rendered.push_str(&format!(" -({kind})-> "));
                        }
                    }
                    return Err(AppError::new(
                        ErrorKind::CircularDependency,
                        format!("cycle: {rendered}"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn topo_sort(&self, adjacency: &HashMap<&str, Vec<&Edge>>) -> Vec<Arc<dyn Module>> {
        // Edges point consumer -> dependency; Kahn's algorithm here consumes
        // "in-degree" as the number of modules a given module depends on,
        // dequeuing modules whose dependencies are all already placed.
        let mut remaining_deps: HashMap<&str, usize> = self
            .modules
            .iter()
            .map(|m| (m.name(), adjacency.get(m.name()).map(|e| e.len()).unwrap_or(0)))
            .collect();

        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for (&from, edges) in adjacency.iter() {
            for edge in edges {
                dependents.entry(edge.to.as_str()).or_default().push(from);
            }
        }

        let mut ordered_names: Vec<String> = Vec::with_capacity(self.modules.len());
        let mut ready: Vec<&str> = remaining_deps
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&name, _)| name)
            .collect();
        ready.sort_unstable();

        while let Some(name) = ready.first().copied() {
            ready.remove(0);
            ordered_names.push(name.to_string());
            if let Some(deps) = dependents.get(name) {
                for &dependent in deps {
                    if let Some(count) = remaining_deps.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            ready.push(dependent);
                        }
                    }
                }
            }
            ready.sort_unstable();
        }

        ordered_names
            .into_iter()
            .filter_map(|name| self.get(&name).cloned())
            .collect()
    }
}
