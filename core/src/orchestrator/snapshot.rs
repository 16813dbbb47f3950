//! Snapshot & branch manager
//!
//! Captures immutable, fully value-copied simulation snapshots and forks
//! independent "what-if" branches from them.
//!
//! # Critical Invariants
//!
//! - **No aliasing**: a snapshot never shares mutable state with the engine
//!   it came from; a branch never shares state with its parent.
//! - **Cursor preservation**: the RNG cursor travels with the snapshot, so a
//!   branch continues the exact deterministic sequence instead of restarting
//!   from the master seed. Reproducibility holds for the
//!   (seed, branch point, overrides) tuple.
//! - **Atomic overrides**: branch modifications are validated together
//!   before any of them is applied.

use crate::graph::DependencyGraph;
use crate::models::state::{
    Asset, Debt, WalletState, CREDIT_SCORE_MAX, CREDIT_SCORE_MIN,
};
use crate::orchestrator::engine::{SimulationConfig, SimulationEngine, SimulationError};
use crate::rng::RandomSource;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable capture of a simulation at a day boundary
///
/// Everything is held by value: wallet state, graph topology (nodes, edges,
/// insertion order), RNG cursor, and the originating configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot identifier
    pub snapshot_id: String,

    /// Caller-supplied label
    pub label: String,

    /// Date the captured state describes
    pub date: NaiveDate,

    /// First day a branch created from this snapshot will simulate
    pub resume_date: NaiveDate,

    /// Deep copy of the wallet state
    pub state: WalletState,

    /// Deep copy of the dependency graph
    pub graph: DependencyGraph,

    /// RNG cursor: every substream's exact position
    pub rng: RandomSource,

    /// Configuration of the originating engine
    pub config: SimulationConfig,

    /// SHA-256 hash of the originating configuration, for provenance checks
    pub config_hash: String,
}

// ============================================================================
// Branch overrides
// ============================================================================

/// Field-level override applied when branching from a snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum BranchOverride {
    /// Replace the cash balance
    SetBalance(Decimal),

    /// Replace the credit score (must lie within [300, 850])
    SetCreditScore(Decimal),

    /// Replace the value of an existing asset
    SetAssetValue { asset_id: String, value: Decimal },

    /// Replace the remaining principal of an existing debt
    SetDebtPrincipal { debt_id: String, principal: Decimal },

    /// Introduce a new asset position
    AddAsset { asset_id: String, asset: Asset },

    /// Introduce a new debt position
    AddDebt { debt_id: String, debt: Debt },
}

impl BranchOverride {
    fn validate(&self, state: &WalletState) -> Result<(), SimulationError> {
        match self {
            BranchOverride::SetBalance(_) => Ok(()),
            BranchOverride::SetCreditScore(score) => {
                if *score < CREDIT_SCORE_MIN || *score > CREDIT_SCORE_MAX {
                    return Err(SimulationError::BranchModification(format!(
                        "credit score {} outside [300, 850]",
                        score
                    )));
                }
                Ok(())
            }
            BranchOverride::SetAssetValue { asset_id, .. } => {
                if state.asset(asset_id).is_none() {
                    return Err(SimulationError::BranchModification(format!(
                        "unknown asset '{}'",
                        asset_id
                    )));
                }
                Ok(())
            }
            BranchOverride::SetDebtPrincipal { debt_id, .. } => {
                if state.debt(debt_id).is_none() {
                    return Err(SimulationError::BranchModification(format!(
                        "unknown debt '{}'",
                        debt_id
                    )));
                }
                Ok(())
            }
            BranchOverride::AddAsset { asset_id, .. } => {
                if state.asset(asset_id).is_some() {
                    return Err(SimulationError::BranchModification(format!(
                        "asset '{}' already exists",
                        asset_id
                    )));
                }
                Ok(())
            }
            BranchOverride::AddDebt { debt_id, .. } => {
                if state.debt(debt_id).is_some() {
                    return Err(SimulationError::BranchModification(format!(
                        "debt '{}' already exists",
                        debt_id
                    )));
                }
                Ok(())
            }
        }
    }

    /// Apply after validation; infallible by construction
    fn apply(&self, state: &mut WalletState) {
        match self {
            BranchOverride::SetBalance(balance) => state.balance = *balance,
            BranchOverride::SetCreditScore(score) => state.credit_score = *score,
            BranchOverride::SetAssetValue { asset_id, value } => {
                if let Some(asset) = state.assets.get_mut(asset_id) {
                    asset.value = *value;
                }
            }
            BranchOverride::SetDebtPrincipal { debt_id, principal } => {
                if let Some(debt) = state.debts.get_mut(debt_id) {
                    debt.principal = *principal;
                }
            }
            BranchOverride::AddAsset { asset_id, asset } => {
                state.assets.insert(asset_id.clone(), asset.clone());
            }
            BranchOverride::AddDebt { debt_id, debt } => {
                state.debts.insert(debt_id.clone(), debt.clone());
            }
        }
    }
}

// ============================================================================
// Snapshot manager
// ============================================================================

/// Owns snapshots by identifier and forks branches from them
///
/// Snapshots persist for the manager's lifetime or until explicitly
/// discarded.
#[derive(Debug, Default)]
pub struct SnapshotManager {
    snapshots: HashMap<String, Snapshot>,
}

impl SnapshotManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a snapshot; returns its identifier
    pub fn store(&mut self, snapshot: Snapshot) -> String {
        let id = snapshot.snapshot_id.clone();
        self.snapshots.insert(id.clone(), snapshot);
        id
    }

    /// Capture the engine's current day boundary and register it
    pub fn capture(
        &mut self,
        engine: &SimulationEngine,
        label: &str,
    ) -> Result<String, SimulationError> {
        let snapshot = engine.snapshot(label)?;
        Ok(self.store(snapshot))
    }

    pub fn get(&self, snapshot_id: &str) -> Option<&Snapshot> {
        self.snapshots.get(snapshot_id)
    }

    /// Drop a snapshot; returns whether it existed
    pub fn discard(&mut self, snapshot_id: &str) -> bool {
        self.snapshots.remove(snapshot_id).is_some()
    }

    /// Registered snapshot identifiers, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.snapshots.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Fork an independent engine from a registered snapshot
    ///
    /// The branch starts the day after the snapshot date and runs to the
    /// parent's horizon unless `end_date` overrides it. Overrides are
    /// applied atomically: all are validated before any takes effect.
    pub fn create_branch(
        &self,
        snapshot_id: &str,
        overrides: &[BranchOverride],
        end_date: Option<NaiveDate>,
    ) -> Result<SimulationEngine, SimulationError> {
        let snapshot = self
            .snapshots
            .get(snapshot_id)
            .ok_or_else(|| SimulationError::SnapshotNotFound(snapshot_id.to_string()))?;

        branch_from(snapshot, overrides, end_date)
    }
}

/// Fork an independent engine from a snapshot value
///
/// Exposed for callers that keep snapshots outside a manager.
pub fn branch_from(
    snapshot: &Snapshot,
    overrides: &[BranchOverride],
    end_date: Option<NaiveDate>,
) -> Result<SimulationEngine, SimulationError> {
    for modification in overrides {
        modification.validate(&snapshot.state)?;
    }

    let mut state = snapshot.state.clone();
    for modification in overrides {
        modification.apply(&mut state);
    }

    let end = end_date.unwrap_or(snapshot.config.end_date);
    if snapshot.resume_date > end {
        return Err(SimulationError::InvalidConfig(format!(
            "branch horizon exhausted: resume date {} is after end date {}; pass a later end_date",
            snapshot.resume_date, end
        )));
    }

    let config = SimulationConfig {
        start_date: snapshot.resume_date,
        end_date: end,
        initial_balance: state.balance(),
        initial_credit_score: state.credit_score(),
        rng_seed: snapshot.config.rng_seed,
    };

    SimulationEngine::from_parts(config, snapshot.graph.clone(), state, snapshot.rng.clone())
}

// ============================================================================
// Config hashing
// ============================================================================

/// Compute a deterministic SHA-256 hash of a configuration
///
/// Uses canonical JSON with sorted keys so the hash is independent of map
/// iteration order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::Serialization(format!("config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let canonical = canonicalize(value);
    let json = serde_json::to_string(&canonical).map_err(|e| {
        SimulationError::Serialization(format!("config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
