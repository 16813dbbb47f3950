//! Dependency graph resolution
//!
//! Financial nodes interact through same-day state mutations, so they must
//! run in a consistent dependency order. This module owns the node graph
//! and resolves one deterministic topological order per graph version.

mod resolver;

pub use resolver::{DependencyGraph, GraphError};
