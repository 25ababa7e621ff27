//! Dependency graph for step execution ordering.
//!
//! The graph is derived from a step set at resolution time and discarded
//! once the linear order has been produced.

use std::collections::{HashMap, VecDeque};

use crate::error::{Result, StagehandError};

/// Represents the dependency relationships between steps.
///
/// Steps keep the order in which they were added; that order is the only
/// tie-break used by [`DependencyGraph::topological_order`].
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Step names in insertion order.
    steps: Vec<String>,
    /// Map of step name to its direct dependencies (deduplicated, declaration order).
    dependencies: HashMap<String, Vec<String>>,
    /// Map of step name to steps that depend on it (insertion order).
    dependents: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Create a new dependency graph builder.
    pub fn builder() -> DependencyGraphBuilder {
        DependencyGraphBuilder::new()
    }

    /// Get the direct dependencies of a step.
    pub fn dependencies_of(&self, step: &str) -> Option<&[String]> {
        self.dependencies.get(step).map(Vec::as_slice)
    }

    /// Get steps that depend on the given step.
    pub fn dependents_of(&self, step: &str) -> Option<&[String]> {
        self.dependents.get(step).map(Vec::as_slice)
    }

    /// Check if a step exists in the graph.
    pub fn contains(&self, step: &str) -> bool {
        self.dependencies.contains_key(step)
    }

    /// Get all step names in insertion order.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Get the number of steps in the graph.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns steps in topological order (dependencies before dependents).
    ///
    /// Kahn's algorithm. The initial ready queue holds dependency-free steps
    /// in insertion order; a dependent is queued as soon as its last
    /// dependency has been emitted. Returns `CircularDependency` naming every
    /// step left unresolved when a cycle blocks progress.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut in_degree: HashMap<&str, usize> = self
            .steps
            .iter()
            .map(|step| {
                let degree = self.dependencies.get(step).map_or(0, Vec::len);
                (step.as_str(), degree)
            })
            .collect();

        let mut queue: VecDeque<&str> = self
            .steps
            .iter()
            .map(String::as_str)
            .filter(|step| in_degree.get(step) == Some(&0))
            .collect();

        let mut result = Vec::with_capacity(self.steps.len());

        while let Some(step) = queue.pop_front() {
            result.push(step.to_string());

            if let Some(dependents) = self.dependents.get(step) {
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(dependent.as_str());
                        }
                    }
                }
            }
        }

        if result.len() != self.steps.len() {
            let remaining: Vec<String> = self
                .steps
                .iter()
                .filter(|s| in_degree.get(s.as_str()).is_some_and(|d| *d > 0))
                .cloned()
                .collect();

            return Err(StagehandError::CircularDependency { steps: remaining });
        }

        Ok(result)
    }
}

/// Builder for constructing a DependencyGraph.
#[derive(Debug, Default)]
pub struct DependencyGraphBuilder {
    steps: Vec<(String, Vec<String>)>,
}

impl DependencyGraphBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step with its dependencies.
    pub fn add_step<I, S>(mut self, name: impl Into<String>, depends_on: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps.push((
            name.into(),
            depends_on.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Build the dependency graph.
    ///
    /// Fails with `DuplicateStep` if a name was added twice and with
    /// `MissingDependency` if any dependency references an unknown step.
    pub fn build(self) -> Result<DependencyGraph> {
        let mut dependencies: HashMap<String, Vec<String>> = HashMap::new();
        let mut steps = Vec::with_capacity(self.steps.len());

        for (name, deps) in &self.steps {
            if dependencies.contains_key(name) {
                return Err(StagehandError::DuplicateStep { step: name.clone() });
            }
            let mut unique: Vec<String> = Vec::with_capacity(deps.len());
            for dep in deps {
                if !unique.contains(dep) {
                    unique.push(dep.clone());
                }
            }
            dependencies.insert(name.clone(), unique);
            steps.push(name.clone());
        }

        // Validate all dependencies exist, in insertion order
        for step in &steps {
            for dep in &dependencies[step] {
                if !dependencies.contains_key(dep) {
                    return Err(StagehandError::MissingDependency {
                        step: step.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // Build dependents map (reverse lookup)
        let mut dependents: HashMap<String, Vec<String>> =
            steps.iter().map(|s| (s.clone(), Vec::new())).collect();

        for step in &steps {
            for dep in &dependencies[step] {
                if let Some(list) = dependents.get_mut(dep) {
                    list.push(step.clone());
                }
            }
        }

        Ok(DependencyGraph {
            steps,
            dependencies,
            dependents,
        })
    }
}
