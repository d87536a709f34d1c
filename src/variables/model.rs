// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::MAX_SWEEP_VALUES;
use crate::errors::{ConfigurationError, VariableEvaluationError};
use crate::expression::functions;

/// Arithmetic progression a swept variable draws its values from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRange {
    pub start: f64,
    pub stop: f64,
    pub increment: f64,
}

impl Default for SweepRange {
    fn default() -> Self {
        Self {
            start: 0.0,
            stop: 0.0,
            increment: 1.0,
        }
    }
}

impl SweepRange {
    pub fn new(start: f64, stop: f64, increment: f64) -> Self {
        Self {
            start,
            stop,
            increment,
        }
    }

    /// Number of values in the progression, `stop` included when it lies on the grid.
    ///
    /// # Errors
    ///
    /// Returns a reason when a bound is not finite, the increment is zero, the increment
    /// moves away from `stop`, or the progression is unreasonably long.
    ///
    /// # Examples
    ///
    /// ```
    /// use the_sequencer::variables::SweepRange;
    ///
    /// assert_eq!(SweepRange::new(0.0, 10.0, 2.0).value_count(), Ok(6));
    /// assert_eq!(SweepRange::new(1.0, 0.0, -0.25).value_count(), Ok(5));
    /// assert!(SweepRange::new(0.0, 1.0, -1.0).value_count().is_err());
    /// ```
    pub fn value_count(&self) -> Result<usize, &'static str> {
        if !(self.start.is_finite() && self.stop.is_finite() && self.increment.is_finite()) {
            return Err("bounds must be finite");
        }
        if self.increment == 0.0 {
            return Err("increment is zero");
        }
        let span = self.stop - self.start;
        if span != 0.0 && span.signum() != self.increment.signum() {
            return Err("increment moves away from stop");
        }

        // Tolerance keeps stop on the grid despite float rounding, e.g. 0..1 step 0.1.
        let steps = (span / self.increment + 1e-9).floor();
        if steps + 1.0 > MAX_SWEEP_VALUES as f64 {
            return Err("too many sweep values");
        }
        Ok(steps as usize + 1)
    }

    /// Value at `index`: `start + index * increment`.
    pub fn value_at(&self, index: usize) -> Result<f64, String> {
        let count = self.value_count().map_err(str::to_string)?;
        if index >= count {
            return Err(format!(
                "scan index {} out of range (0..{})",
                index, count
            ));
        }
        Ok(self.start + index as f64 * self.increment)
    }

    /// All values of the progression in order.
    pub fn values(&self) -> Result<Vec<f64>, &'static str> {
        let count = self.value_count()?;
        Ok((0..count)
            .map(|i| self.start + i as f64 * self.increment)
            .collect())
    }

    pub(crate) fn validate(&self, variable: &str) -> Result<(), ConfigurationError> {
        self.value_count()
            .map(|_| ())
            .map_err(|reason| ConfigurationError::InvalidSweepRange {
                variable: variable.to_string(),
                start: self.start,
                stop: self.stop,
                increment: self.increment,
                reason,
            })
    }
}

/// Everything needed to add a variable to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub name: String,
    pub formula: String,
    pub swept: bool,
    pub sweep: SweepRange,
    pub nesting_level: u32,
    pub comment: String,
}

impl VariableSpec {
    /// A static variable defined by `formula`.
    pub fn formula(name: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formula: formula.into(),
            swept: false,
            sweep: SweepRange::default(),
            nesting_level: 0,
            comment: String::new(),
        }
    }

    /// A swept variable over `start..=stop` by `increment`.
    pub fn swept(
        name: impl Into<String>,
        start: f64,
        stop: f64,
        increment: f64,
        nesting_level: u32,
    ) -> Self {
        Self {
            name: name.into(),
            formula: start.to_string(),
            swept: true,
            sweep: SweepRange::new(start, stop, increment),
            nesting_level,
            comment: String::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// A named variable. Keeps its formula and its sweep range regardless of which is in
/// use, so toggling between static and swept loses nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub(crate) name: String,
    pub(crate) formula: String,
    pub(crate) swept: bool,
    pub(crate) sweep: SweepRange,
    pub(crate) scan_index: usize,
    pub(crate) nesting_level: u32,
    pub(crate) comment: String,
    pub(crate) value: Option<f64>,
    pub(crate) error: Option<VariableEvaluationError>,
}

impl Variable {
    pub(crate) fn from_spec(spec: VariableSpec) -> Self {
        Self {
            name: spec.name,
            formula: spec.formula,
            swept: spec.swept,
            sweep: spec.sweep,
            scan_index: 0,
            nesting_level: spec.nesting_level,
            comment: spec.comment,
            value: None,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn is_swept(&self) -> bool {
        self.swept
    }

    pub fn sweep(&self) -> SweepRange {
        self.sweep
    }

    pub fn scan_index(&self) -> usize {
        self.scan_index
    }

    pub fn nesting_level(&self) -> u32 {
        self.nesting_level
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Value from the last successful evaluation.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Error from the most recent evaluation, if it failed.
    pub fn error(&self) -> Option<&VariableEvaluationError> {
        self.error.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none() && self.value.is_some()
    }

    pub fn to_spec(&self) -> VariableSpec {
        VariableSpec {
            name: self.name.clone(),
            formula: self.formula.clone(),
            swept: self.swept,
            sweep: self.sweep,
            nesting_level: self.nesting_level,
            comment: self.comment.clone(),
        }
    }
}

/// Checks that `name` is an identifier and does not collide with a library function.
pub(crate) fn validate_name(name: &str) -> Result<(), ConfigurationError> {
    let invalid = |reason: &str| ConfigurationError::InvalidVariableName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("name is empty")),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            return Err(invalid("must start with a letter or underscore"))
        }
        _ => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("may only contain letters, digits and underscores"));
    }
    if functions::is_function(name) {
        return Err(invalid("collides with a library function"));
    }
    Ok(())
}
