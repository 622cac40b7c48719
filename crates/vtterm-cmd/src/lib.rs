#![warn(clippy::pedantic)]

//! The Commander: a hot-path facade over a [`vtterm_info::Terminfo`]
//! record that caches the evaluator's output for the two operations
//! that dominate output volume — cursor positioning and color
//! selection (spec.md §4.2).

mod commander;

pub use commander::Commander;
