//! Reporting boundary
//!
//! The read-only result packet consumed by the dashboard layer. Every
//! numeric field is a `Decimal`, which serde_json emits as a
//! decimal-precision string, preserving exactness across the process
//! boundary.

use crate::metrics;
use crate::models::state::WalletState;
use crate::orchestrator::engine::{DayRecord, SimulationConfig};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rng_seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalStateSection {
    pub balance: Decimal,
    pub credit_score: Decimal,
    pub total_assets: Decimal,
    pub total_debt: Decimal,
    pub net_worth: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSection {
    pub collapse_probability: Decimal,
    pub shock_resilience_index: Decimal,
    pub balance_volatility: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralSection {
    pub financial_vibe_score: Decimal,
    pub financial_vibe_description: String,
    pub pet_state: String,
    pub recovery_slope: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSection {
    pub net_asset_value: Decimal,
    pub liquidity_ratio: Decimal,
    pub debt_to_income_ratio: Decimal,
}

/// Complete result packet for a finished simulation
///
/// # Example
/// ```rust,ignore
/// let report = engine.report()?;
/// let json = serde_json::to_string_pretty(&report)?;
/// // {"final_state": {"balance": "15234.56", ...}, ...}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub meta: ReportMeta,
    pub final_state: FinalStateSection,
    pub risk_metrics: RiskSection,
    pub behavioral_metrics: BehavioralSection,
    pub portfolio_health: PortfolioSection,
}

impl SimulationReport {
    /// Derive the packet from a completed run's configuration, final state,
    /// and history
    pub fn from_parts(
        config: &SimulationConfig,
        state: &WalletState,
        history: &[DayRecord],
    ) -> Self {
        let (vibe, vibe_description) = metrics::vibe_score(history);

        SimulationReport {
            meta: ReportMeta {
                start_date: config.start_date,
                end_date: config.end_date,
                rng_seed: config.rng_seed,
            },
            final_state: FinalStateSection {
                balance: state.balance(),
                credit_score: state.credit_score(),
                total_assets: state.total_assets(),
                total_debt: state.total_debt(),
                net_worth: state.net_worth(),
            },
            risk_metrics: RiskSection {
                collapse_probability: metrics::collapse_probability(history),
                shock_resilience_index: metrics::shock_resilience(history),
                balance_volatility: metrics::balance_volatility(history),
            },
            behavioral_metrics: BehavioralSection {
                financial_vibe_score: vibe,
                financial_vibe_description: vibe_description.to_string(),
                pet_state: metrics::pet_state(vibe).to_string(),
                recovery_slope: metrics::recovery_slope(history),
            },
            portfolio_health: PortfolioSection {
                net_asset_value: state.net_worth(),
                liquidity_ratio: metrics::liquidity_ratio(state),
                debt_to_income_ratio: metrics::debt_to_income(state),
            },
        }
    }
}
