//! Analyses over module graphs
//!
//! This module provides the classification and policy layers consulted by
//! the transforms:
//! - Constant-expression classification and backward slices
//! - Hoisting eligibility policy

pub mod const_expr;
pub mod hoist_policy;

pub use const_expr::{Classification, ConstExprAnalysis};
pub use hoist_policy::{DefaultHoistPolicy, HoistConfig, HoistPolicy};
