// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for variable evaluation.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A full evaluation pass over the variable store finished.
///
/// # Log Level
/// `debug!` - Runs after every edit
///
/// # Example
/// ```
/// use the_sequencer::observability::messages::variables::EvaluationCompleted;
///
/// let msg = EvaluationCompleted {
///     valid: 10,
///     errors: 1,
///     unresolved: 0,
/// };
///
/// assert_eq!(msg.to_string(), "Variable evaluation completed: 10 valid, 1 errors, 0 unresolved");
/// ```
pub struct EvaluationCompleted {
    pub valid: usize,
    pub errors: usize,
    pub unresolved: usize,
}

impl Display for EvaluationCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Variable evaluation completed: {} valid, {} errors, {} unresolved",
            self.valid, self.errors, self.unresolved
        )
    }
}

impl StructuredLog for EvaluationCompleted {
    fn log(&self) {
        tracing::debug!(
            valid = self.valid,
            errors = self.errors,
            unresolved = self.unresolved,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "evaluation",
            span_name = name,
            valid = self.valid,
            errors = self.errors,
            unresolved = self.unresolved,
        )
    }
}

/// Variables that can never resolve: unknown references, cycles and their dependents.
///
/// # Log Level
/// `warn!` - Runs are refused until these are fixed
pub struct VariablesUnresolved<'a> {
    pub variables: &'a [String],
}

impl Display for VariablesUnresolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Unresolved variables: {}", self.variables.join(", "))
    }
}

impl StructuredLog for VariablesUnresolved<'_> {
    fn log(&self) {
        tracing::warn!(
            count = self.variables.len(),
            variables = ?self.variables,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "variables_unresolved",
            span_name = name,
            variables = ?self.variables,
        )
    }
}
