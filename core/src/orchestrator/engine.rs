//! Simulation engine
//!
//! The main daily simulation loop integrating all components:
//! - Dependency resolution (evaluation order per graph version)
//! - Node evaluation (pure formulas over the wallet state)
//! - Delta and mutation application (documented last-write-wins)
//! - History accumulation (append-only day records)
//!
//! # Architecture
//!
//! For each calendar day in `[start_date, end_date]`:
//!
//! ```text
//! 1. Obtain evaluation order (resolver, cached)
//! 2. For each node in order:
//!    a. Verify its dependencies already ran today
//!    b. Evaluate with the node's own RNG substream
//!    c. Apply the balance delta
//!    d. Apply mutations in emission order (last write wins)
//!    e. Append a ledger entry if the balance moved
//! 3. Append the day's record to history
//! ```
//!
//! # Critical Invariants
//!
//! 1. All money values are `Decimal` (no floating-point money)
//! 2. All randomness flows through per-node substreams (seeded xorshift64*)
//! 3. Balance moves only through node deltas, so each day's balance change
//!    equals the sum of that day's node deltas
//! 4. History is append-only and preserved on failure
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//! use wallet_simulator_core::{
//!     DependencyGraph, Node, NodeKind, SimulationConfig, SimulationEngine,
//! };
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node(Node::new("salary", NodeKind::Salary {
//!     annual_salary: Decimal::from(60_000),
//!     payment_day: 1,
//! })).unwrap();
//!
//! let config = SimulationConfig::new(
//!     NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
//!     Decimal::from(10_000),
//!     42,
//! );
//!
//! let mut engine = SimulationEngine::new(config, graph).unwrap();
//! engine.run().unwrap();
//! assert_eq!(engine.state().balance(), Decimal::from(15_000));
//! ```

use crate::core::calendar::days_inclusive;
use crate::graph::{DependencyGraph, GraphError};
use crate::models::node::NodeError;
use crate::models::state::{Asset, Debt, LedgerEntry, WalletState};
use crate::orchestrator::report::SimulationReport;
use crate::orchestrator::snapshot::{compute_config_hash, Snapshot};
use crate::rng::RandomSource;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Configuration
// ============================================================================

/// Complete simulation configuration
///
/// The seed is a required field: reproducibility is part of the contract,
/// not an optional extra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// First simulated day (inclusive)
    pub start_date: NaiveDate,

    /// Last simulated day (inclusive)
    pub end_date: NaiveDate,

    /// Opening cash balance
    pub initial_balance: Decimal,

    /// Opening credit score, within [300, 850]
    pub initial_credit_score: Decimal,

    /// Master seed for deterministic randomness
    pub rng_seed: u64,
}

impl SimulationConfig {
    /// Create a configuration with the default opening credit score of 700
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        initial_balance: Decimal,
        rng_seed: u64,
    ) -> Self {
        Self {
            start_date,
            end_date,
            initial_balance,
            initial_credit_score: Decimal::from(700),
            rng_seed,
        }
    }

    pub fn with_credit_score(mut self, score: Decimal) -> Self {
        self.initial_credit_score = score;
        self
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if self.start_date > self.end_date {
            return Err(SimulationError::InvalidConfig(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }

        if self.initial_credit_score < crate::models::state::CREDIT_SCORE_MIN
            || self.initial_credit_score > crate::models::state::CREDIT_SCORE_MAX
        {
            return Err(SimulationError::InvalidConfig(format!(
                "initial_credit_score {} outside [300, 850]",
                self.initial_credit_score
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Simulation error taxonomy
///
/// Construction-time errors (duplicate/unknown node, cycle, bad config)
/// fail before any day is simulated. Evaluation-time errors halt the run at
/// the failing day, preserving all prior history. Nothing is retried:
/// financial formula errors are deterministic, not transient.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Configuration validation error
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Graph construction or resolution error
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A node's formula failed; carries node id and date for reproduction
    #[error("node '{node_id}' failed on {date}: {source}")]
    NodeEvaluation {
        node_id: String,
        date: NaiveDate,
        source: NodeError,
    },

    /// Snapshot requested at an invalid point
    #[error("snapshot unavailable: {0}")]
    SnapshotState(String),

    /// Snapshot id not registered with the manager
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// Branch override referenced an unknown or invalid state field
    #[error("branch modification rejected: {0}")]
    BranchModification(String),

    /// Config hashing / serialization failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal consistency violation (never a silently-skipped step)
    #[error("internal consistency error: {0}")]
    Internal(String),
}

/// Node id and date of the evaluation that halted a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineFailure {
    pub node_id: String,
    pub date: NaiveDate,
}

// ============================================================================
// Engine state machine
// ============================================================================

/// Lifecycle of a simulation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineStatus {
    /// Graph and initial state set, no days processed
    Configured,
    /// Mid-horizon at a day boundary
    Running,
    /// Horizon finished without error
    Completed,
    /// A node evaluation failed; history up to the failure is preserved
    Failed,
}

/// One day's appended history record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub balance: Decimal,
    pub credit_score: Decimal,
    pub total_assets: Decimal,
    pub total_debt: Decimal,
    pub net_worth: Decimal,
    pub liquid_assets: Decimal,
    /// Sum of all node deltas applied this day
    pub net_delta: Decimal,
    pub bankrupt: bool,
}

/// Result of stepping a single day
#[derive(Debug, Clone, PartialEq)]
pub struct DayOutcome {
    pub date: NaiveDate,
    /// Sum of all node deltas this day
    pub net_delta: Decimal,
    /// Number of nodes that moved the balance this day
    pub nodes_fired: usize,
}

/// Main simulation engine
///
/// Owns the graph, the wallet state, the RNG source, and the run history.
/// Single-threaded and fully synchronous: nodes run strictly sequentially
/// within a day because later nodes may depend on earlier nodes' same-day
/// mutations. Branches own exclusive copies of everything, which is what
/// makes branch-level parallelism safe without locking.
#[derive(Debug)]
pub struct SimulationEngine {
    config: SimulationConfig,
    graph: DependencyGraph,
    state: WalletState,
    rng: RandomSource,
    history: Vec<DayRecord>,
    status: EngineStatus,
    /// Next day to simulate; equals `end_date + 1` once completed
    next_date: NaiveDate,
    failure: Option<EngineFailure>,
}

impl SimulationEngine {
    /// Create a new engine from a configuration and a pre-built graph
    pub fn new(config: SimulationConfig, graph: DependencyGraph) -> Result<Self, SimulationError> {
        config.validate()?;

        let state = WalletState::new(
            config.start_date,
            config.initial_balance,
            config.initial_credit_score,
        );
        let rng = RandomSource::new(config.rng_seed);
        let next_date = config.start_date;

        Ok(Self {
            config,
            graph,
            state,
            rng,
            history: Vec::new(),
            status: EngineStatus::Configured,
            next_date,
            failure: None,
        })
    }

    /// Build an engine from captured parts (branching)
    pub(crate) fn from_parts(
        config: SimulationConfig,
        graph: DependencyGraph,
        state: WalletState,
        rng: RandomSource,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let next_date = config.start_date;

        Ok(Self {
            config,
            graph,
            state,
            rng,
            history: Vec::new(),
            status: EngineStatus::Configured,
            next_date,
            failure: None,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn state(&self) -> &WalletState {
        &self.state
    }

    /// Append-only day records accumulated so far
    pub fn history(&self) -> &[DayRecord] {
        &self.history
    }

    /// Node id and date of the failing evaluation, if the run failed
    pub fn failure(&self) -> Option<&EngineFailure> {
        self.failure.as_ref()
    }

    pub fn days_completed(&self) -> usize {
        self.history.len()
    }

    // ========================================================================
    // Pre-run configuration
    // ========================================================================

    /// Register a node; rejected once the run has started
    pub fn add_node(&mut self, node: crate::models::node::Node) -> Result<(), SimulationError> {
        self.ensure_configured("add_node")?;
        self.graph.add_node(node)?;
        Ok(())
    }

    /// Add an ordering edge; rejected once the run has started
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), SimulationError> {
        self.ensure_configured("add_edge")?;
        self.graph.add_edge(from, to)?;
        Ok(())
    }

    /// Seed an opening asset position; rejected once the run has started
    pub fn add_asset(&mut self, id: &str, asset: Asset) -> Result<(), SimulationError> {
        self.ensure_configured("add_asset")?;
        self.state.add_asset(id, asset);
        Ok(())
    }

    /// Seed an opening debt position; rejected once the run has started
    pub fn add_debt(&mut self, id: &str, debt: Debt) -> Result<(), SimulationError> {
        self.ensure_configured("add_debt")?;
        self.state.add_debt(id, debt);
        Ok(())
    }

    fn ensure_configured(&self, operation: &str) -> Result<(), SimulationError> {
        if self.status != EngineStatus::Configured {
            return Err(SimulationError::InvalidConfig(format!(
                "{} rejected: engine is {:?}, mutation is only allowed before the run starts",
                operation, self.status
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Day loop
    // ========================================================================

    /// Run the full horizon
    pub fn run(&mut self) -> Result<(), SimulationError> {
        let end = self.config.end_date;
        self.run_until(end).map(|_| ())
    }

    /// Run forward through `target` (clamped to the configured horizon)
    ///
    /// Leaves the engine `Running` at a day boundary if the horizon is not
    /// yet exhausted, `Completed` if it is. Returns one outcome per day
    /// stepped.
    pub fn run_until(&mut self, target: NaiveDate) -> Result<Vec<DayOutcome>, SimulationError> {
        match self.status {
            EngineStatus::Configured => {
                // Fail fast on cycles and unknown nodes before any day runs.
                self.graph.resolve_order()?;
                self.status = EngineStatus::Running;
            }
            EngineStatus::Running => {}
            EngineStatus::Completed => {
                return Err(SimulationError::InvalidConfig(
                    "simulation already completed; branch from a snapshot to continue".to_string(),
                ));
            }
            EngineStatus::Failed => {
                return Err(SimulationError::InvalidConfig(
                    "simulation already failed; inspect failure() and history()".to_string(),
                ));
            }
        }

        let mut outcomes = Vec::new();
        let end = target.min(self.config.end_date);

        for date in days_inclusive(self.next_date, end) {
            let order = self.graph.resolve_order()?;

            match self.step_day(date, &order) {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    self.status = EngineStatus::Failed;
                    if let SimulationError::NodeEvaluation { node_id, date, .. } = &err {
                        self.failure = Some(EngineFailure {
                            node_id: node_id.clone(),
                            date: *date,
                        });
                    }
                    return Err(err);
                }
            }

            self.next_date = date.succ_opt().ok_or_else(|| {
                SimulationError::Internal(format!("calendar overflow after {}", date))
            })?;
        }

        if self.next_date > self.config.end_date {
            self.status = EngineStatus::Completed;
        }

        Ok(outcomes)
    }

    /// Simulate one day: evaluate every node in resolved order
    fn step_day(&mut self, date: NaiveDate, order: &[String]) -> Result<DayOutcome, SimulationError> {
        self.state.current_date = date;

        let mut evaluated: BTreeSet<&str> = BTreeSet::new();
        let mut net_delta = Decimal::ZERO;
        let mut nodes_fired = 0usize;

        for node_id in order {
            // Internal-consistency check: with a correct resolver this can
            // never fire, and if it does the day must not be silently skipped.
            for pred in self.graph.predecessors(node_id) {
                if !evaluated.contains(pred) {
                    return Err(SimulationError::Internal(format!(
                        "node '{}' evaluated before its dependency '{}' on {}",
                        node_id, pred, date
                    )));
                }
            }

            let node = self.graph.node(node_id).ok_or_else(|| {
                SimulationError::Internal(format!(
                    "resolved order references unknown node '{}'",
                    node_id
                ))
            })?;

            let output = node
                .evaluate(&self.state, date, self.rng.substream(node_id))
                .map_err(|source| SimulationError::NodeEvaluation {
                    node_id: node_id.clone(),
                    date,
                    source,
                })?;

            let was_bankrupt = self.state.bankrupt;

            if output.delta != Decimal::ZERO {
                self.state.balance += output.delta;
            }

            for mutation in &output.mutations {
                mutation
                    .apply(&mut self.state)
                    .map_err(|source| SimulationError::NodeEvaluation {
                        node_id: node_id.clone(),
                        date,
                        source,
                    })?;
            }

            if output.delta != Decimal::ZERO {
                let entry = LedgerEntry {
                    date,
                    amount: output.delta,
                    description: node.kind().ledger_description(),
                    category: node.kind().ledger_category().to_string(),
                    balance_after: self.state.balance,
                };
                self.state.record(entry);
                nodes_fired += 1;
            }

            if !was_bankrupt && self.state.bankrupt {
                self.state.record(LedgerEntry {
                    date,
                    amount: Decimal::ZERO,
                    description: "Bankruptcy event".to_string(),
                    category: "bankruptcy".to_string(),
                    balance_after: self.state.balance,
                });
            }

            net_delta += output.delta;
            evaluated.insert(node_id.as_str());
        }

        self.history.push(DayRecord {
            date,
            balance: self.state.balance,
            credit_score: self.state.credit_score,
            total_assets: self.state.total_assets(),
            total_debt: self.state.total_debt(),
            net_worth: self.state.net_worth(),
            liquid_assets: self.state.liquid_assets(),
            net_delta,
            bankrupt: self.state.bankrupt,
        });

        Ok(DayOutcome {
            date,
            net_delta,
            nodes_fired,
        })
    }

    // ========================================================================
    // Snapshot & report boundaries
    // ========================================================================

    /// Capture an immutable snapshot of the current day boundary
    ///
    /// Valid while `Configured`, `Running` (public stepping is whole-day
    /// atomic, so every observable point is a day boundary), or `Completed`.
    /// A failed engine cannot be snapshotted.
    pub fn snapshot(&self, label: &str) -> Result<Snapshot, SimulationError> {
        if self.status == EngineStatus::Failed {
            return Err(SimulationError::SnapshotState(
                "cannot snapshot a failed simulation".to_string(),
            ));
        }

        let config_hash = compute_config_hash(&self.config)?;

        Ok(Snapshot {
            snapshot_id: Uuid::new_v4().to_string(),
            label: label.to_string(),
            date: self.state.current_date,
            resume_date: self.next_date,
            state: self.state.clone(),
            graph: self.graph.clone(),
            rng: self.rng.clone(),
            config: self.config.clone(),
            config_hash,
        })
    }

    /// Build the read-only reporting packet for a completed run
    pub fn report(&self) -> Result<SimulationReport, SimulationError> {
        if self.status != EngineStatus::Completed {
            return Err(SimulationError::InvalidConfig(format!(
                "report requires a completed simulation, engine is {:?}",
                self.status
            )));
        }

        Ok(SimulationReport::from_parts(
            &self.config,
            &self.state,
            &self.history,
        ))
    }
}
