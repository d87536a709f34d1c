// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dependency-ordered evaluation of a variable set.
//!
//! Evaluation runs in two phases:
//!
//! 1. Swept variables take `start + scan_index * increment` in closed form.
//! 2. Static variables are parsed, wired into a [`DependencyGraph`] through the names
//!    their formulas reference, and evaluated level by level. Variables behind a cycle,
//!    an unknown name or a failed dependency are reported as unresolved.
//!
//! The result depends only on the input, so evaluating an unchanged store twice yields
//! the same [`Evaluation`].

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use super::graph::DependencyGraph;
use super::model::Variable;
use crate::errors::VariableEvaluationError;
use crate::expression::{functions, Expression};

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Values of every variable that evaluated successfully, in store order.
    pub values: IndexMap<String, f64>,
    /// Per-variable errors, in store order.
    pub errors: IndexMap<String, VariableEvaluationError>,
    /// Variables that could not be resolved (cycles, unknown names, failed dependencies).
    pub unresolved: Vec<String>,
}

impl Evaluation {
    pub fn is_valid(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Whether every variable evaluated.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// A single error listing every unresolved variable, if any are unresolved.
    pub fn unresolvable_error(&self) -> Option<VariableEvaluationError> {
        if self.unresolved.is_empty() {
            None
        } else {
            Some(VariableEvaluationError::Unresolvable {
                variables: self.unresolved.clone(),
            })
        }
    }
}

enum Pending {
    Parsed(Expression),
    Failed(VariableEvaluationError),
}

/// Evaluate `variables` (in store order).
pub fn evaluate<'a, I>(variables: I) -> Evaluation
where
    I: IntoIterator<Item = &'a Variable>,
{
    let variables: Vec<&Variable> = variables.into_iter().collect();
    let mut resolved: IndexMap<String, f64> = IndexMap::new();
    let mut errors: HashMap<String, VariableEvaluationError> = HashMap::new();
    let mut unresolved: Vec<String> = Vec::new();

    // Phase 1: swept variables in closed form.
    for variable in variables.iter().filter(|v| v.swept) {
        match variable.sweep.value_at(variable.scan_index) {
            Ok(value) => {
                resolved.insert(variable.name.clone(), value);
            }
            Err(reason) => {
                errors.insert(
                    variable.name.clone(),
                    VariableEvaluationError::InvalidSweep {
                        variable: variable.name.clone(),
                        reason,
                    },
                );
            }
        }
    }

    // Phase 2: parse static formulas and build the graph among them.
    let statics: Vec<&Variable> = variables.iter().copied().filter(|v| !v.swept).collect();
    let static_names: HashSet<&str> = statics.iter().map(|v| v.name.as_str()).collect();
    let swept_names: HashSet<&str> = variables
        .iter()
        .filter(|v| v.swept)
        .map(|v| v.name.as_str())
        .collect();

    let mut graph = DependencyGraph::new();
    let mut pending: HashMap<&str, Pending> = HashMap::new();

    for variable in &statics {
        graph.add_node(&variable.name);

        let expression = match Expression::parse(&variable.formula) {
            Ok(expression) => expression,
            Err(source) => {
                pending.insert(
                    &variable.name,
                    Pending::Failed(VariableEvaluationError::Formula {
                        variable: variable.name.clone(),
                        source,
                    }),
                );
                continue;
            }
        };

        let mut failure = None;
        for name in expression.free_variables() {
            if static_names.contains(name.as_str()) {
                graph.add_dependency(&name, &variable.name);
            } else if swept_names.contains(name.as_str()) {
                if !resolved.contains_key(&name) && failure.is_none() {
                    failure = Some(VariableEvaluationError::Blocked {
                        variable: variable.name.clone(),
                        dependency: name,
                    });
                }
            } else if functions::constant(&name).is_none() && failure.is_none() {
                failure = Some(VariableEvaluationError::UnknownReference {
                    variable: variable.name.clone(),
                    name,
                });
            }
        }

        let entry = match failure {
            Some(error) => Pending::Failed(error),
            None => Pending::Parsed(expression),
        };
        pending.insert(&variable.name, entry);
    }

    let reverse_deps = graph.build_reverse_dependencies();
    let (levels, stuck) = graph.topological_levels();

    for level in &levels {
        for name in level {
            let Some(entry) = pending.remove(name.as_str()) else {
                continue;
            };
            let expression = match entry {
                Pending::Parsed(expression) => expression,
                Pending::Failed(error) => {
                    if !matches!(error, VariableEvaluationError::Formula { .. }) {
                        unresolved.push(name.clone());
                    }
                    errors.insert(name.clone(), error);
                    continue;
                }
            };

            let failed_dependency = reverse_deps
                .get(name)
                .and_then(|deps| deps.iter().find(|dep| !resolved.contains_key(*dep)));
            if let Some(dependency) = failed_dependency {
                unresolved.push(name.clone());
                errors.insert(
                    name.clone(),
                    VariableEvaluationError::Blocked {
                        variable: name.clone(),
                        dependency: dependency.clone(),
                    },
                );
                continue;
            }

            let value = match expression.literal() {
                Some(value) => Ok(value),
                None => expression.evaluate(&resolved),
            };
            match value {
                Ok(value) => {
                    resolved.insert(name.clone(), value);
                }
                Err(source) => {
                    errors.insert(
                        name.clone(),
                        VariableEvaluationError::Formula {
                            variable: name.clone(),
                            source,
                        },
                    );
                }
            }
        }
    }

    if !stuck.is_empty() {
        let mut cycle_of: HashMap<String, Vec<String>> = HashMap::new();
        for cycle in graph.find_cycles() {
            for member in &cycle {
                cycle_of
                    .entry(member.clone())
                    .or_insert_with(|| cycle.clone());
            }
        }

        for name in &stuck {
            let error = match cycle_of.get(name) {
                Some(cycle) => VariableEvaluationError::Cycle {
                    variable: name.clone(),
                    cycle: cycle.clone(),
                },
                None => {
                    let dependency = reverse_deps
                        .get(name)
                        .and_then(|deps| deps.iter().find(|dep| stuck.contains(dep)))
                        .cloned()
                        .unwrap_or_default();
                    VariableEvaluationError::Blocked {
                        variable: name.clone(),
                        dependency,
                    }
                }
            };
            unresolved.push(name.clone());
            errors.insert(name.clone(), error);
        }
    }

    // Report everything in store order.
    let mut evaluation = Evaluation::default();
    for variable in &variables {
        if let Some(value) = resolved.get(&variable.name) {
            evaluation.values.insert(variable.name.clone(), *value);
        }
        if let Some(error) = errors.remove(&variable.name) {
            evaluation.errors.insert(variable.name.clone(), error);
        }
        if unresolved.contains(&variable.name) {
            evaluation.unresolved.push(variable.name.clone());
        }
    }
    evaluation
}
