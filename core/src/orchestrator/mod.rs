//! Orchestration: the daily simulation loop, snapshot/branch management,
//! the reporting boundary, and the multi-scenario runner

pub mod engine;
pub mod report;
pub mod scenario;
pub mod snapshot;

pub use engine::{
    DayOutcome, DayRecord, EngineFailure, EngineStatus, SimulationConfig, SimulationEngine,
    SimulationError,
};
pub use report::{
    BehavioralSection, FinalStateSection, PortfolioSection, ReportMeta, RiskSection,
    SimulationReport,
};
pub use scenario::{ScenarioOutcome, ScenarioRunner};
pub use snapshot::{branch_from, compute_config_hash, BranchOverride, Snapshot, SnapshotManager};
