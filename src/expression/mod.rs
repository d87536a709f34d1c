// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Arithmetic formula language used by variable definitions and routine parameters.
//!
//! Formulas support numbers, variable names, `+ - * / %`, powers (`^` or `**`),
//! parentheses, unary minus, a fixed function library and the constants `pi`
//! and `e`. A variable binding with the same name as a constant shadows it.
//!
//! # Examples
//!
//! ```
//! use indexmap::IndexMap;
//! use the_sequencer::expression::Expression;
//!
//! let expr = Expression::parse("2 * t_load + sin(0)").unwrap();
//! assert_eq!(expr.free_variables(), vec!["t_load".to_string()]);
//!
//! let mut bindings = IndexMap::new();
//! bindings.insert("t_load".to_string(), 5.0);
//! assert_eq!(expr.evaluate(&bindings).unwrap(), 10.0);
//! ```

pub mod functions;
pub mod lexer;
pub mod parser;

use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::hash::BuildHasher;
use thiserror::Error;

/// Errors raised while parsing or evaluating a formula.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { position: usize, found: String },

    #[error("unexpected '{found}' at position {position}, expected {expected}")]
    UnexpectedToken {
        position: usize,
        found: String,
        expected: &'static str,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unknown name '{0}'")]
    UnknownName(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{function}' expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number: {0}")]
    NonFinite(String),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

/// Parsed formula tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        function: String,
        args: Vec<Expr>,
    },
}

/// Formula source text as stored in routines, playlists and documents.
///
/// Deserializes from a string or a bare number, so `duration: 10` and
/// `duration: t_load` are both accepted; numbers are kept as their text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Formula(String);

impl Formula {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parse(&self) -> Result<Expression, ExpressionError> {
        Expression::parse(&self.0)
    }
}

impl Default for Formula {
    fn default() -> Self {
        Self("0".to_string())
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Formula {
    fn from(source: &str) -> Self {
        Self(source.to_string())
    }
}

impl From<String> for Formula {
    fn from(source: String) -> Self {
        Self(source)
    }
}

impl From<i32> for Formula {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for Formula {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<f64> for Formula {
    fn from(value: f64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for Formula {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FormulaVisitor;

        impl de::Visitor<'_> for FormulaVisitor {
            type Value = Formula;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "a formula string or a number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Formula, E> {
                Ok(Formula(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Formula, E> {
                Ok(Formula(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Formula, E> {
                Ok(Formula(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Formula, E> {
                Ok(Formula(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Formula, E> {
                Ok(Formula(v.to_string()))
            }
        }

        deserializer.deserialize_any(FormulaVisitor)
    }
}

/// Name lookup used during evaluation.
pub trait Bindings {
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl<S: BuildHasher> Bindings for HashMap<String, f64, S> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl<S: BuildHasher> Bindings for IndexMap<String, f64, S> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

/// Evaluation context with no names bound; only constants resolve.
pub struct NoBindings;

impl Bindings for NoBindings {
    fn lookup(&self, _name: &str) -> Option<f64> {
        None
    }
}

/// A parsed formula together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    /// Parse `source` into an expression.
    ///
    /// # Errors
    ///
    /// Returns a syntax error (`Empty`, `UnexpectedCharacter`, `UnexpectedToken`,
    /// `UnexpectedEnd`) or `UnknownFunction` when a call names a function outside
    /// the library.
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let tokens = lexer::tokenize(source)?;
        let ast = parser::parse(tokens)?;
        check_functions(&ast)?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// The value of the formula when it is a plain (optionally negated) number.
    pub fn literal(&self) -> Option<f64> {
        match &self.ast {
            Expr::Number(value) => Some(*value),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => match operand.as_ref() {
                Expr::Number(value) => Some(-*value),
                _ => None,
            },
            _ => None,
        }
    }

    /// Names referenced as variables, unique, in order of first appearance.
    ///
    /// Constant names are included; callers decide whether a variable shadows them.
    pub fn free_variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_variables(&self.ast, &mut names);
        names
    }

    /// Evaluate against `bindings`, falling back to the named constants.
    pub fn evaluate<B: Bindings + ?Sized>(&self, bindings: &B) -> Result<f64, ExpressionError> {
        eval(&self.ast, bindings)
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Parse and evaluate `source` in one step; plain finite numbers skip the parser.
pub fn evaluate<B: Bindings + ?Sized>(source: &str, bindings: &B) -> Result<f64, ExpressionError> {
    if let Ok(value) = source.trim().parse::<f64>() {
        if value.is_finite() {
            return Ok(value);
        }
    }
    Expression::parse(source)?.evaluate(bindings)
}

fn check_functions(expr: &Expr) -> Result<(), ExpressionError> {
    match expr {
        Expr::Number(_) | Expr::Variable(_) => Ok(()),
        Expr::Unary { operand, .. } => check_functions(operand),
        Expr::Binary { left, right, .. } => {
            check_functions(left)?;
            check_functions(right)
        }
        Expr::Call { function, args } => {
            if !functions::is_function(function) {
                return Err(ExpressionError::UnknownFunction(function.clone()));
            }
            args.iter().try_for_each(check_functions)
        }
    }
}

fn collect_variables(expr: &Expr, names: &mut Vec<String>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Variable(name) => {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        Expr::Unary { operand, .. } => collect_variables(operand, names),
        Expr::Binary { left, right, .. } => {
            collect_variables(left, names);
            collect_variables(right, names);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect_variables(arg, names);
            }
        }
    }
}

fn finite(value: f64, what: impl FnOnce() -> String) -> Result<f64, ExpressionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExpressionError::NonFinite(what()))
    }
}

fn eval<B: Bindings + ?Sized>(expr: &Expr, bindings: &B) -> Result<f64, ExpressionError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Variable(name) => bindings
            .lookup(name)
            .or_else(|| functions::constant(name))
            .ok_or_else(|| ExpressionError::UnknownName(name.clone())),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => Ok(-eval(operand, bindings)?),
        Expr::Binary { op, left, right } => {
            let l = eval(left, bindings)?;
            let r = eval(right, bindings)?;
            match op {
                BinaryOp::Add => finite(l + r, || format!("{} + {}", l, r)),
                BinaryOp::Sub => finite(l - r, || format!("{} - {}", l, r)),
                BinaryOp::Mul => finite(l * r, || format!("{} * {}", l, r)),
                BinaryOp::Div => {
                    if r == 0.0 {
                        return Err(ExpressionError::DivisionByZero);
                    }
                    finite(l / r, || format!("{} / {}", l, r))
                }
                BinaryOp::Rem => {
                    if r == 0.0 {
                        return Err(ExpressionError::DivisionByZero);
                    }
                    finite(l % r, || format!("{} % {}", l, r))
                }
                BinaryOp::Pow => finite(l.powf(r), || format!("{} ^ {}", l, r)),
            }
        }
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, bindings))
                .collect::<Result<Vec<_>, _>>()?;
            functions::call(function, &values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(pairs: &[(&str, f64)]) -> IndexMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        let b = NoBindings;
        assert_eq!(evaluate("1 + 2 * 3", &b).unwrap(), 7.0);
        assert_eq!(evaluate("(1 + 2) * 3", &b).unwrap(), 9.0);
        assert_eq!(evaluate("-2^2", &b).unwrap(), -4.0);
        assert_eq!(evaluate("2**3**2", &b).unwrap(), 512.0);
        assert_eq!(evaluate("7 % 4", &b).unwrap(), 3.0);
        assert_eq!(evaluate("10 - 4 - 3", &b).unwrap(), 3.0);
    }

    #[test]
    fn test_bindings_shadow_constants() {
        let expr = Expression::parse("2 * pi").unwrap();
        assert!((expr.evaluate(&NoBindings).unwrap() - 2.0 * std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(expr.evaluate(&bind(&[("pi", 3.0)])).unwrap(), 6.0);
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(
            evaluate("a + 1", &NoBindings),
            Err(ExpressionError::UnknownName("a".into()))
        );
    }

    #[test]
    fn test_unknown_function_is_a_parse_error() {
        assert_eq!(
            Expression::parse("frobnicate(1)"),
            Err(ExpressionError::UnknownFunction("frobnicate".into()))
        );
    }

    #[test]
    fn test_runtime_faults() {
        assert_eq!(
            evaluate("1 / (a - a)", &bind(&[("a", 2.0)])),
            Err(ExpressionError::DivisionByZero)
        );
        assert!(matches!(
            evaluate("10 ^ 400", &NoBindings),
            Err(ExpressionError::NonFinite(_))
        ));
    }

    #[test]
    fn test_free_variables_are_unique_and_ordered() {
        let expr = Expression::parse("b * a + max(b, c) - sin(a)").unwrap();
        assert_eq!(expr.free_variables(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_literal_detection() {
        assert_eq!(Expression::parse("2.5").unwrap().literal(), Some(2.5));
        assert_eq!(Expression::parse("-3").unwrap().literal(), Some(-3.0));
        assert_eq!(Expression::parse("a").unwrap().literal(), None);
    }

    #[test]
    fn test_formula_accepts_numbers_and_text() {
        let formulas: Vec<Formula> = serde_yaml::from_str("[10, 2.5, t_load * 2]").unwrap();
        assert_eq!(formulas[0].as_str(), "10");
        assert_eq!(formulas[1].as_str(), "2.5");
        assert_eq!(formulas[2].as_str(), "t_load * 2");
    }

    #[test]
    fn test_non_finite_literal_is_not_a_shortcut() {
        assert_eq!(
            evaluate("inf", &NoBindings),
            Err(ExpressionError::UnknownName("inf".into()))
        );
    }
}
