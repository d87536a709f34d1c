// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named variables: static formulas and swept progressions, grouped, evaluated in
//! dependency order.

mod evaluate;
mod graph;
mod model;
mod store;

pub use evaluate::{evaluate, Evaluation};
pub use graph::DependencyGraph;
pub use model::{SweepRange, Variable, VariableSpec};
pub use store::VariableStore;
