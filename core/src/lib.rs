//! Future Wallet Core - Household Finance Simulation Engine
//!
//! Day-by-day household finance simulator with deterministic execution,
//! dependency-ordered node evaluation, and snapshot/branch "what-if"
//! scenarios.
//!
//! # Architecture
//!
//! - **core**: Calendar-day time management
//! - **models**: Domain types (WalletState, Node variants, StateMutation)
//! - **graph**: Dependency graph and topological resolver
//! - **orchestrator**: Main simulation loop, snapshots, branching, reporting
//! - **metrics**: Behavioral and risk metric derivation
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All money values are `Decimal` (no floating-point money)
//! 2. All randomness is deterministic (seeded per-node substreams)
//! 3. Balance moves only through node deltas; everything else through
//!    explicit, ordered state mutations (last write wins)
//! 4. Snapshots and branches are value copies, never aliases

// Module declarations
pub mod core;
pub mod graph;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod rng;

// Re-exports for convenience
pub use graph::{DependencyGraph, GraphError};
pub use models::{
    mutation::StateMutation,
    node::{ExpenseTrigger, Node, NodeError, NodeKind, NodeOutput, TaxBracket},
    state::{Asset, AssetKind, Debt, LedgerEntry, WalletState},
};
pub use orchestrator::{
    branch_from, BranchOverride, DayOutcome, DayRecord, EngineFailure, EngineStatus,
    ScenarioOutcome, ScenarioRunner, SimulationConfig, SimulationEngine, SimulationError,
    SimulationReport, Snapshot, SnapshotManager,
};
pub use rng::{RandomSource, Xorshift64Star};
