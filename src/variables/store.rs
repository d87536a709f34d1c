// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use indexmap::IndexMap;
use tokio::sync::broadcast;

use super::evaluate::{evaluate, Evaluation};
use super::model::{validate_name, SweepRange, Variable, VariableSpec};
use crate::errors::ConfigurationError;
use crate::observability::messages::variables::{EvaluationCompleted, VariablesUnresolved};
use crate::observability::messages::StructuredLog;
use crate::sequence::{ChangeFeed, SequenceChange};

/// Owns grouped variables and their authoritative value map.
///
/// Every mutation re-evaluates the store and publishes a [`SequenceChange`], so
/// [`VariableStore::values`] always reflects the current definitions.
///
/// # Examples
///
/// ```
/// use the_sequencer::variables::{VariableSpec, VariableStore};
///
/// let mut store = VariableStore::new();
/// store.add_group("timing").unwrap();
/// store.add_variable("timing", VariableSpec::formula("t_load", "100")).unwrap();
/// store.add_variable("timing", VariableSpec::formula("t_total", "t_load * 2")).unwrap();
///
/// assert_eq!(store.value("t_total"), Some(200.0));
/// ```
#[derive(Debug)]
pub struct VariableStore {
    groups: IndexMap<String, Vec<Variable>>,
    evaluation: Evaluation,
    feed: ChangeFeed,
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore {
    pub fn new() -> Self {
        Self::with_feed(ChangeFeed::new())
    }

    /// A store publishing onto a feed shared with the rest of the sequence.
    pub fn with_feed(feed: ChangeFeed) -> Self {
        Self {
            groups: IndexMap::new(),
            evaluation: Evaluation::default(),
            feed,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SequenceChange> {
        self.feed.subscribe()
    }

    pub fn add_group(&mut self, group: &str) -> Result<(), ConfigurationError> {
        if self.groups.contains_key(group) {
            return Err(ConfigurationError::DuplicateGroup {
                group: group.to_string(),
            });
        }
        self.groups.insert(group.to_string(), Vec::new());
        self.feed.publish(SequenceChange::GroupAdded {
            group: group.to_string(),
        });
        Ok(())
    }

    /// Remove a group together with its variables.
    pub fn remove_group(&mut self, group: &str) -> Result<Vec<Variable>, ConfigurationError> {
        let removed =
            self.groups
                .shift_remove(group)
                .ok_or_else(|| ConfigurationError::UnknownGroup {
                    group: group.to_string(),
                })?;
        self.feed.publish(SequenceChange::GroupRemoved {
            group: group.to_string(),
        });
        self.evaluate();
        Ok(removed)
    }

    /// Add a variable to `group`.
    ///
    /// # Errors
    ///
    /// * `UnknownGroup` - no such group
    /// * `InvalidVariableName` - not an identifier, or a library function name
    /// * `DuplicateVariable` - the name is taken in any group
    /// * `InvalidSweepRange` - the spec carries bounds that cannot produce values
    pub fn add_variable(
        &mut self,
        group: &str,
        spec: VariableSpec,
    ) -> Result<(), ConfigurationError> {
        if !self.groups.contains_key(group) {
            return Err(ConfigurationError::UnknownGroup {
                group: group.to_string(),
            });
        }
        validate_name(&spec.name)?;
        if self.variable(&spec.name).is_some() {
            return Err(ConfigurationError::DuplicateVariable { name: spec.name });
        }
        spec.sweep.validate(&spec.name)?;

        let name = spec.name.clone();
        if let Some(variables) = self.groups.get_mut(group) {
            variables.push(Variable::from_spec(spec));
        }
        self.feed.publish(SequenceChange::VariableAdded { name });
        self.evaluate();
        Ok(())
    }

    pub fn remove_variable(&mut self, name: &str) -> Result<Variable, ConfigurationError> {
        let removed = self
            .groups
            .values_mut()
            .find_map(|variables| {
                variables
                    .iter()
                    .position(|v| v.name == name)
                    .map(|index| variables.remove(index))
            })
            .ok_or_else(|| ConfigurationError::UnknownVariable {
                name: name.to_string(),
            })?;
        self.feed.publish(SequenceChange::VariableRemoved {
            name: name.to_string(),
        });
        self.evaluate();
        Ok(removed)
    }

    pub fn set_formula(&mut self, name: &str, formula: &str) -> Result<(), ConfigurationError> {
        self.update(name, |variable| {
            variable.formula = formula.to_string();
            Ok(())
        })
    }

    /// Toggle between swept and static. Enabling a sweep requires valid bounds.
    pub fn set_swept(&mut self, name: &str, swept: bool) -> Result<(), ConfigurationError> {
        self.update(name, |variable| {
            if swept {
                variable.sweep.validate(&variable.name)?;
            }
            variable.swept = swept;
            Ok(())
        })
    }

    pub fn set_sweep_range(
        &mut self,
        name: &str,
        start: f64,
        stop: f64,
        increment: f64,
    ) -> Result<(), ConfigurationError> {
        let range = SweepRange::new(start, stop, increment);
        self.update(name, |variable| {
            range.validate(&variable.name)?;
            variable.sweep = range;
            Ok(())
        })
    }

    pub fn set_nesting_level(&mut self, name: &str, level: u32) -> Result<(), ConfigurationError> {
        self.update(name, |variable| {
            variable.nesting_level = level;
            Ok(())
        })
    }

    pub fn set_comment(&mut self, name: &str, comment: &str) -> Result<(), ConfigurationError> {
        self.update(name, |variable| {
            variable.comment = comment.to_string();
            Ok(())
        })
    }

    /// Position a swept variable within its range. Out-of-range indices are accepted
    /// here and reported by evaluation.
    pub fn set_scan_index(&mut self, name: &str, index: usize) -> Result<(), ConfigurationError> {
        self.update(name, |variable| {
            if !variable.swept {
                return Err(ConfigurationError::NotSwept {
                    name: variable.name.clone(),
                });
            }
            variable.scan_index = index;
            Ok(())
        })
    }

    /// Set several scan indices and evaluate once.
    pub fn set_scan_indices(
        &mut self,
        indices: &IndexMap<String, usize>,
    ) -> Result<(), ConfigurationError> {
        for name in indices.keys() {
            match self.variable(name) {
                None => {
                    return Err(ConfigurationError::UnknownVariable { name: name.clone() })
                }
                Some(variable) if !variable.swept => {
                    return Err(ConfigurationError::NotSwept { name: name.clone() })
                }
                Some(_) => {}
            }
        }
        for variable in self.groups.values_mut().flatten() {
            if let Some(index) = indices.get(&variable.name) {
                variable.scan_index = *index;
            }
        }
        self.evaluate();
        Ok(())
    }

    /// Re-evaluate every variable and refresh the cached values.
    pub fn evaluate(&mut self) -> &Evaluation {
        let evaluation = evaluate(self.groups.values().flatten());

        for variable in self.groups.values_mut().flatten() {
            match evaluation.values.get(&variable.name) {
                Some(value) => {
                    variable.value = Some(*value);
                    variable.error = None;
                }
                None => {
                    variable.error = evaluation.errors.get(&variable.name).cloned();
                }
            }
        }

        EvaluationCompleted {
            valid: evaluation.values.len(),
            errors: evaluation.errors.len(),
            unresolved: evaluation.unresolved.len(),
        }
        .log();
        if !evaluation.unresolved.is_empty() {
            VariablesUnresolved {
                variables: &evaluation.unresolved,
            }
            .log();
        }

        self.feed.publish(SequenceChange::VariablesEvaluated {
            valid: evaluation.values.len(),
            errors: evaluation.errors.len(),
            unresolved: evaluation.unresolved.len(),
        });
        self.evaluation = evaluation;
        &self.evaluation
    }

    /// Result of the most recent evaluation.
    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }

    /// Name → value for every valid variable.
    pub fn values(&self) -> &IndexMap<String, f64> {
        &self.evaluation.values
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.evaluation.values.get(name).copied()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables().find(|v| v.name == name)
    }

    /// All variables in store order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.groups.values().flatten()
    }

    /// Groups in order, each with its variables.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[Variable])> {
        self.groups
            .iter()
            .map(|(name, variables)| (name.as_str(), variables.as_slice()))
    }

    /// Swept variables ordered by nesting level; ties keep store order.
    pub fn sweep_variables(&self) -> Vec<&Variable> {
        let mut swept: Vec<&Variable> = self.variables().filter(|v| v.swept).collect();
        swept.sort_by_key(|v| v.nesting_level);
        swept
    }

    /// Name → value snapshot recorded with each run.
    pub fn snapshot(&self) -> IndexMap<String, f64> {
        self.evaluation.values.clone()
    }

    /// Name → scan index for every swept variable.
    pub fn sweep_snapshot(&self) -> IndexMap<String, usize> {
        self.variables()
            .filter(|v| v.swept)
            .map(|v| (v.name.clone(), v.scan_index))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.variables().next().is_none()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.evaluation = Evaluation::default();
    }

    fn update<F>(&mut self, name: &str, edit: F) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut Variable) -> Result<(), ConfigurationError>,
    {
        let variable = self
            .groups
            .values_mut()
            .flatten()
            .find(|v| v.name == name)
            .ok_or_else(|| ConfigurationError::UnknownVariable {
                name: name.to_string(),
            })?;
        edit(variable)?;
        self.feed.publish(SequenceChange::VariableChanged {
            name: name.to_string(),
        });
        self.evaluate();
        Ok(())
    }
}
