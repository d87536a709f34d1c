// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use indexmap::IndexMap;

use crate::config::consts::MAX_SWEEP_POINTS;
use crate::errors::SchedulerError;
use crate::variables::VariableStore;

/// One swept variable and the number of values it takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepAxis {
    pub name: String,
    pub value_count: usize,
}

impl SweepAxis {
    pub fn new(name: impl Into<String>, value_count: usize) -> Self {
        Self {
            name: name.into(),
            value_count,
        }
    }
}

/// Name → scan index for every swept variable of one run.
pub type IndexTuple = IndexMap<String, usize>;

/// The sweep axes of `store`, outermost first.
///
/// Refuses a store with no swept variables, or with swept variables whose range
/// yields no values; the latter are all listed.
pub fn sweep_axes(store: &VariableStore) -> Result<Vec<SweepAxis>, SchedulerError> {
    let swept = store.sweep_variables();
    if swept.is_empty() {
        return Err(SchedulerError::NoSweepVariables);
    }

    let mut axes = Vec::with_capacity(swept.len());
    let mut invalid = Vec::new();
    for variable in swept {
        match variable.sweep().value_count() {
            Ok(count) => axes.push(SweepAxis::new(variable.name(), count)),
            Err(_) => invalid.push(variable.name().to_string()),
        }
    }

    if invalid.is_empty() {
        Ok(axes)
    } else {
        Err(SchedulerError::InvalidSweepVariables { variables: invalid })
    }
}

/// Every index tuple of a sweep, in run order.
///
/// The first axis varies slowest and the last fastest. Each tuple names every axis.
///
/// # Examples
///
/// ```
/// use the_sequencer::scheduler::{cartesian_product, SweepAxis};
///
/// let tuples = cartesian_product(&[SweepAxis::new("a", 2), SweepAxis::new("b", 3)]).unwrap();
/// let order: Vec<(usize, usize)> = tuples.iter().map(|t| (t["a"], t["b"])).collect();
/// assert_eq!(order, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
/// ```
pub fn cartesian_product(axes: &[SweepAxis]) -> Result<Vec<IndexTuple>, SchedulerError> {
    let total = axes
        .iter()
        .try_fold(1usize, |acc, axis| acc.checked_mul(axis.value_count))
        .filter(|total| *total <= MAX_SWEEP_POINTS)
        .ok_or(SchedulerError::SweepTooLarge {
            limit: MAX_SWEEP_POINTS,
        })?;

    let mut tuples: Vec<IndexTuple> = vec![IndexTuple::new()];
    for axis in axes {
        let mut next = Vec::with_capacity(tuples.len() * axis.value_count);
        for partial in &tuples {
            for index in 0..axis.value_count {
                let mut tuple = partial.clone();
                tuple.insert(axis.name.clone(), index);
                next.push(tuple);
            }
        }
        tuples = next;
    }

    debug_assert_eq!(tuples.len(), total);
    Ok(tuples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableSpec;

    #[test]
    fn test_inner_axis_varies_fastest() {
        let tuples =
            cartesian_product(&[SweepAxis::new("a", 2), SweepAxis::new("b", 3)]).unwrap();
        assert_eq!(tuples.len(), 6);
        for (i, tuple) in tuples.iter().enumerate() {
            assert_eq!(tuple["a"], i / 3);
            assert_eq!(tuple["b"], i % 3);
        }
    }

    #[test]
    fn test_no_axes_is_a_single_empty_tuple() {
        assert_eq!(cartesian_product(&[]).unwrap(), vec![IndexTuple::new()]);
    }

    #[test]
    fn test_too_many_points() {
        let axes = [
            SweepAxis::new("a", 1_000),
            SweepAxis::new("b", 1_000),
            SweepAxis::new("c", 2),
        ];
        assert_eq!(
            cartesian_product(&axes),
            Err(SchedulerError::SweepTooLarge {
                limit: MAX_SWEEP_POINTS
            })
        );
    }

    #[test]
    fn test_axes_follow_nesting_level() {
        let mut store = VariableStore::new();
        store.add_group("g").unwrap();
        store
            .add_variable("g", VariableSpec::swept("inner", 0.0, 2.0, 1.0, 1))
            .unwrap();
        store
            .add_variable("g", VariableSpec::swept("outer", 0.0, 1.0, 1.0, 0))
            .unwrap();
        store
            .add_variable("g", VariableSpec::formula("fixed", "3"))
            .unwrap();

        assert_eq!(
            sweep_axes(&store).unwrap(),
            vec![SweepAxis::new("outer", 2), SweepAxis::new("inner", 3)]
        );
    }

    #[test]
    fn test_same_level_variables_are_separate_axes() {
        let mut store = VariableStore::new();
        store.add_group("g").unwrap();
        store
            .add_variable("g", VariableSpec::swept("detuning", 0.0, 2.0, 1.0, 0))
            .unwrap();
        store
            .add_variable("g", VariableSpec::swept("power", 0.0, 1.0, 1.0, 0))
            .unwrap();

        let axes = sweep_axes(&store).unwrap();
        assert_eq!(
            axes,
            vec![SweepAxis::new("detuning", 3), SweepAxis::new("power", 2)]
        );

        // Same-level variables do not move together: every combination is visited.
        let tuples = cartesian_product(&axes).unwrap();
        let order: Vec<(usize, usize)> =
            tuples.iter().map(|t| (t["detuning"], t["power"])).collect();
        assert_eq!(
            order,
            vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]
        );
    }

    #[test]
    fn test_no_swept_variables() {
        let mut store = VariableStore::new();
        store.add_group("g").unwrap();
        store
            .add_variable("g", VariableSpec::formula("fixed", "3"))
            .unwrap();
        assert_eq!(sweep_axes(&store), Err(SchedulerError::NoSweepVariables));
    }
}
