// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::expression::ExpressionError;

/// Per-variable evaluation fault. Never blocks evaluation of unrelated variables.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VariableEvaluationError {
    /// Formula failed to parse, or faulted at runtime (division by zero, domain error).
    #[error("variable '{variable}': {source}")]
    Formula {
        variable: String,
        #[source]
        source: ExpressionError,
    },

    /// Formula references a name that is neither a variable nor a constant.
    #[error("variable '{variable}' references unknown name '{name}'")]
    UnknownReference { variable: String, name: String },

    /// Variable is part of a dependency cycle.
    #[error("variable '{variable}' is part of a dependency cycle: {}", .cycle.join(" -> "))]
    Cycle { variable: String, cycle: Vec<String> },

    /// Variable depends on another variable that could not be evaluated.
    #[error("variable '{variable}' depends on unresolved variable '{dependency}'")]
    Blocked { variable: String, dependency: String },

    /// Swept variable whose bounds or scan index do not yield a value.
    #[error("swept variable '{variable}': {reason}")]
    InvalidSweep { variable: String, reason: String },

    /// Evaluation could not make progress; every stuck variable is listed.
    #[error("unresolvable variables: {}", .variables.join(", "))]
    Unresolvable { variables: Vec<String> },
}

impl VariableEvaluationError {
    /// Name of the variable the error is attributed to, if it concerns exactly one.
    pub fn variable(&self) -> Option<&str> {
        match self {
            VariableEvaluationError::Formula { variable, .. }
            | VariableEvaluationError::UnknownReference { variable, .. }
            | VariableEvaluationError::Cycle { variable, .. }
            | VariableEvaluationError::Blocked { variable, .. }
            | VariableEvaluationError::InvalidSweep { variable, .. } => Some(variable),
            VariableEvaluationError::Unresolvable { .. } => None,
        }
    }
}
