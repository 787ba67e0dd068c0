//! Dependency resolver - turns the plan's phases into one execution order
//!
//! Phases are validated (unknown references, cycles) before any ordering
//! work, then sorted topologically. Among phases that are ready at the same
//! time the lowest `priority` wins; equal priorities fall back to the name.

use crate::error::{Error, Result};
use crate::plan::PlanDocument;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

/// Priority assigned when a phase omits it or gives a non-integer
pub const DEFAULT_PRIORITY: i64 = 999;

/// A named unit of work within a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub name: String,
    pub priority: i64,
    pub dependencies: Vec<String>,
    pub tasks: Vec<String>,
}

impl Phase {
    /// Parse a phase entry, returning `None` when it is not a mapping
    fn from_value(name: &str, value: &Value) -> Option<Self> {
        let data = value.as_object()?;

        let priority = data
            .get("priority")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_PRIORITY);

        let mut dependencies: Vec<String> = Vec::new();
        if let Some(list) = data.get("dependencies").and_then(Value::as_array) {
            for dep in list {
                let dep = match dep {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if !dependencies.contains(&dep) {
                    dependencies.push(dep);
                }
            }
        }

        let tasks = data
            .get("tasks")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            name: name.to_string(),
            priority,
            dependencies,
            tasks,
        })
    }
}

/// Phases in a valid execution order, plus the document they came from
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub phases: Vec<Phase>,
    pub document: PlanDocument,
}

impl ExecutionPlan {
    /// Phase names in execution order
    pub fn phase_names(&self) -> Vec<&str> {
        self.phases.iter().map(|p| p.name.as_str()).collect()
    }

    /// Look up a phase by name
    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Direct dependencies of `name` (empty for unknown phases)
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.phase(name)
            .map(|p| p.dependencies.clone())
            .unwrap_or_default()
    }

    /// Phases that list `name` as a direct dependency, in execution order
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.phases
            .iter()
            .filter(|p| p.dependencies.iter().any(|d| d == name))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Adjacency map dependency -> dependents, for visualization
    ///
    /// Only phases with at least one dependent appear as keys.
    pub fn execution_graph(&self) -> BTreeMap<String, Vec<String>> {
        let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for phase in &self.phases {
            for dep in &phase.dependencies {
                graph.entry(dep.clone()).or_default().push(phase.name.clone());
            }
        }
        graph
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

/// Builds and validates the phase graph of a plan
#[derive(Debug, Default, Clone, Copy)]
pub struct DependencyResolver;

impl DependencyResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `document` into an ordered execution plan
    pub fn create_execution_plan(&self, document: PlanDocument) -> Result<ExecutionPlan> {
        let phases = parse_phases(&document);
        validate(&phases)?;
        let phases = resolve_order(phases)?;

        log::debug!(
            "Resolved execution order: {}",
            phases
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(ExecutionPlan { phases, document })
    }
}

/// Parse phases from the document, skipping entries that are not mappings
pub fn parse_phases(document: &PlanDocument) -> Vec<Phase> {
    let Some(phases) = document.phases() else {
        return Vec::new();
    };

    phases
        .iter()
        .filter_map(|(name, value)| {
            let phase = Phase::from_value(name, value);
            if phase.is_none() {
                log::warn!("Skipping phase '{}': not a mapping", name);
            }
            phase
        })
        .collect()
}

/// Check every dependency exists, then reject cycles
fn validate(phases: &[Phase]) -> Result<()> {
    let names: HashSet<&str> = phases.iter().map(|p| p.name.as_str()).collect();

    for phase in phases {
        for dep in &phase.dependencies {
            if !names.contains(dep.as_str()) {
                return Err(Error::UnknownDependency {
                    phase: phase.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    if let Some(cycle) = find_cycle(phases) {
        return Err(Error::CircularDependency { phases: cycle });
    }

    Ok(())
}

/// Depth-first search with a recursion stack; returns the cycle path if any
fn find_cycle(phases: &[Phase]) -> Option<Vec<String>> {
    let graph: HashMap<&str, &[String]> = phases
        .iter()
        .map(|p| (p.name.as_str(), p.dependencies.as_slice()))
        .collect();

    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = Vec::new();

    fn visit<'a>(
        node: &'a str,
        graph: &HashMap<&'a str, &'a [String]>,
        visited: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        stack.push(node);

        for next in graph.get(node).copied().unwrap_or_default() {
            let next = next.as_str();
            if let Some(pos) = stack.iter().position(|n| *n == next) {
                let mut cycle: Vec<String> = stack[pos..].iter().map(|s| s.to_string()).collect();
                cycle.push(next.to_string());
                return Some(cycle);
            }
            if !visited.contains(next)
                && let Some(cycle) = visit(next, graph, visited, stack)
            {
                return Some(cycle);
            }
        }

        stack.pop();
        None
    }

    for phase in phases {
        if !visited.contains(phase.name.as_str())
            && let Some(cycle) = visit(&phase.name, &graph, &mut visited, &mut stack)
        {
            return Some(cycle);
        }
    }

    None
}

/// Kahn's algorithm with a min-heap keyed on (priority, name)
fn resolve_order(phases: Vec<Phase>) -> Result<Vec<Phase>> {
    let total = phases.len();
    let mut in_degree: HashMap<String, usize> = HashMap::with_capacity(total);
    let mut dependents: HashMap<String, Vec<String>> = HashMap::new();

    for phase in &phases {
        in_degree.insert(phase.name.clone(), phase.dependencies.len());
        for dep in &phase.dependencies {
            dependents
                .entry(dep.clone())
                .or_default()
                .push(phase.name.clone());
        }
    }

    let mut by_name: HashMap<String, Phase> =
        phases.into_iter().map(|p| (p.name.clone(), p)).collect();

    let mut ready: BinaryHeap<Reverse<(i64, String)>> = by_name
        .values()
        .filter(|p| in_degree[&p.name] == 0)
        .map(|p| Reverse((p.priority, p.name.clone())))
        .collect();

    let mut ordered = Vec::with_capacity(total);
    while let Some(Reverse((_, name))) = ready.pop() {
        for dependent in dependents.get(&name).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    let priority = by_name[dependent].priority;
                    ready.push(Reverse((priority, dependent.clone())));
                }
            }
        }
        if let Some(phase) = by_name.remove(&name) {
            ordered.push(phase);
        }
    }

    if ordered.len() < total {
        return Err(Error::OrderingViolation {
            emitted: ordered.len(),
            total,
        });
    }

    Ok(ordered)
}
