// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The fixed function library and named constants available to formulas.

use super::ExpressionError;

/// Accepted argument counts for a library function.
#[derive(Debug, Clone, Copy)]
enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

const FUNCTIONS: &[(&str, Arity)] = &[
    ("sin", Arity::Exactly(1)),
    ("cos", Arity::Exactly(1)),
    ("tan", Arity::Exactly(1)),
    ("asin", Arity::Exactly(1)),
    ("acos", Arity::Exactly(1)),
    ("atan", Arity::Exactly(1)),
    ("atan2", Arity::Exactly(2)),
    ("sinh", Arity::Exactly(1)),
    ("cosh", Arity::Exactly(1)),
    ("tanh", Arity::Exactly(1)),
    ("exp", Arity::Exactly(1)),
    ("ln", Arity::Exactly(1)),
    ("log", Arity::Exactly(1)),
    ("log10", Arity::Exactly(1)),
    ("log2", Arity::Exactly(1)),
    ("sqrt", Arity::Exactly(1)),
    ("abs", Arity::Exactly(1)),
    ("floor", Arity::Exactly(1)),
    ("ceil", Arity::Exactly(1)),
    ("round", Arity::Exactly(1)),
    ("sign", Arity::Exactly(1)),
    ("pow", Arity::Exactly(2)),
    ("clamp", Arity::Exactly(3)),
    ("min", Arity::AtLeast(1)),
    ("max", Arity::AtLeast(1)),
];

const CONSTANTS: &[(&str, f64)] = &[("pi", std::f64::consts::PI), ("e", std::f64::consts::E)];

/// Whether `name` is a library function (and therefore not usable as a variable name).
pub fn is_function(name: &str) -> bool {
    FUNCTIONS.iter().any(|(function, _)| *function == name)
}

/// Value of a named constant.
pub fn constant(name: &str) -> Option<f64> {
    CONSTANTS
        .iter()
        .find(|(constant, _)| *constant == name)
        .map(|(_, value)| *value)
}

/// Apply library function `name` to already-evaluated arguments.
pub fn call(name: &str, args: &[f64]) -> Result<f64, ExpressionError> {
    let arity = FUNCTIONS
        .iter()
        .find(|(function, _)| *function == name)
        .map(|(_, arity)| *arity)
        .ok_or_else(|| ExpressionError::UnknownFunction(name.to_string()))?;

    let arity_ok = match arity {
        Arity::Exactly(n) => args.len() == n,
        Arity::AtLeast(n) => args.len() >= n,
    };
    if !arity_ok {
        let expected = match arity {
            Arity::Exactly(n) => n.to_string(),
            Arity::AtLeast(n) => format!("at least {}", n),
        };
        return Err(ExpressionError::Arity {
            function: name.to_string(),
            expected,
            found: args.len(),
        });
    }

    let value = match name {
        "sin" => args[0].sin(),
        "cos" => args[0].cos(),
        "tan" => args[0].tan(),
        "asin" => args[0].asin(),
        "acos" => args[0].acos(),
        "atan" => args[0].atan(),
        "atan2" => args[0].atan2(args[1]),
        "sinh" => args[0].sinh(),
        "cosh" => args[0].cosh(),
        "tanh" => args[0].tanh(),
        "exp" => args[0].exp(),
        "ln" | "log" => args[0].ln(),
        "log10" => args[0].log10(),
        "log2" => args[0].log2(),
        "sqrt" => args[0].sqrt(),
        "abs" => args[0].abs(),
        "floor" => args[0].floor(),
        "ceil" => args[0].ceil(),
        "round" => args[0].round(),
        "sign" => {
            if args[0] == 0.0 {
                0.0
            } else {
                args[0].signum()
            }
        }
        "pow" => args[0].powf(args[1]),
        "clamp" => {
            if args[1] > args[2] {
                return Err(ExpressionError::NonFinite(format!(
                    "clamp bounds reversed: {} > {}",
                    args[1], args[2]
                )));
            }
            args[0].clamp(args[1], args[2])
        }
        "min" => args.iter().copied().fold(f64::INFINITY, f64::min),
        "max" => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        _ => return Err(ExpressionError::UnknownFunction(name.to_string())),
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExpressionError::NonFinite(format!("{}({:?})", name, args)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_are_variadic() {
        assert_eq!(call("min", &[3.0, 1.0, 2.0]).unwrap(), 1.0);
        assert_eq!(call("max", &[3.0, 1.0, 2.0]).unwrap(), 3.0);
    }

    #[test]
    fn test_arity_is_checked() {
        let err = call("atan2", &[1.0]).unwrap_err();
        assert!(matches!(err, ExpressionError::Arity { found: 1, .. }));
    }

    #[test]
    fn test_domain_errors_are_non_finite() {
        assert!(matches!(
            call("sqrt", &[-1.0]),
            Err(ExpressionError::NonFinite(_))
        ));
        assert!(matches!(call("ln", &[0.0]), Err(ExpressionError::NonFinite(_))));
    }

    #[test]
    fn test_constants() {
        assert_eq!(constant("pi"), Some(std::f64::consts::PI));
        assert_eq!(constant("tau"), None);
        assert!(is_function("sin"));
        assert!(!is_function("pi"));
    }
}
