//! Metrics & Reporting Boundary Tests
//!
//! The report packet is the read-only boundary consumed by the dashboard:
//! every numeric field must serialize as a decimal-precision string, and
//! every metric must derive purely from state + history.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use wallet_simulator_core::{
    Asset, AssetKind, Debt, DependencyGraph, Node, NodeKind, ScenarioRunner, SimulationConfig,
    SimulationEngine,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn household_graph() -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    graph
        .add_node(Node::new(
            "salary",
            NodeKind::Salary {
                annual_salary: Decimal::from(72_000),
                payment_day: 1,
            },
        ))
        .unwrap();
    graph
        .add_node(Node::new(
            "rent",
            NodeKind::FixedExpense {
                amount: Decimal::from(1_800),
                payment_day: 1,
                description: "Monthly rent".to_string(),
            },
        ))
        .unwrap();
    graph
        .add_node(Node::new(
            "daily",
            NodeKind::VariableExpense {
                daily_mean: Decimal::from(55),
                daily_std_dev: Decimal::from(20),
                description: "Daily spending".to_string(),
            },
        ))
        .unwrap();
    graph
        .add_node(Node::new(
            "credit_score",
            NodeKind::CreditScore {
                alpha: Decimal::new(1, 1),
            },
        ))
        .unwrap();
    graph
}

fn completed_engine(seed: u64) -> SimulationEngine {
    let config = SimulationConfig::new(
        date(2025, 1, 1),
        date(2025, 12, 31),
        Decimal::from(12_000),
        seed,
    );

    let mut engine = SimulationEngine::new(config, household_graph()).unwrap();
    engine
        .add_asset(
            "bonds",
            Asset::new(AssetKind::Bonds, Decimal::from(4_000))
                .with_liquidation_penalty(Decimal::new(1, 2)),
        )
        .unwrap();
    engine
        .add_debt(
            "card",
            Debt::new(Decimal::from(3_000), Decimal::new(18, 2), Decimal::from(150)),
        )
        .unwrap();
    engine.run().unwrap();
    engine
}

// ============================================================================
// Report packet
// ============================================================================

#[test]
fn test_report_requires_completed_engine() {
    let config = SimulationConfig::new(date(2025, 1, 1), date(2025, 1, 31), Decimal::from(1_000), 1);
    let engine = SimulationEngine::new(config, household_graph()).unwrap();
    assert!(engine.report().is_err());
}

#[test]
fn test_report_fields_match_final_state() {
    let engine = completed_engine(42);
    let report = engine.report().unwrap();

    assert_eq!(report.final_state.balance, engine.state().balance());
    assert_eq!(report.final_state.credit_score, engine.state().credit_score());
    assert_eq!(report.final_state.net_worth, engine.state().net_worth());
    assert_eq!(report.portfolio_health.net_asset_value, engine.state().net_worth());
    assert_eq!(report.meta.rng_seed, 42);
    assert_eq!(report.meta.start_date, date(2025, 1, 1));

    let vibe = report.behavioral_metrics.financial_vibe_score;
    assert!(vibe >= Decimal::ZERO && vibe <= Decimal::from(100));
    assert!(matches!(
        report.behavioral_metrics.pet_state.as_str(),
        "Celebrating" | "Happy" | "Neutral" | "Anxious" | "Panicking"
    ));

    let collapse = report.risk_metrics.collapse_probability;
    assert!(collapse >= Decimal::ZERO && collapse <= Decimal::ONE);

    let resilience = report.risk_metrics.shock_resilience_index;
    assert!(resilience >= Decimal::ZERO && resilience <= Decimal::from(10));
}

#[test]
fn test_report_serializes_decimals_as_strings() {
    let engine = completed_engine(42);
    let report = engine.report().unwrap();

    let value = serde_json::to_value(&report).unwrap();

    // Decimal-precision strings across the process boundary, never floats.
    let balance = value["final_state"]["balance"]
        .as_str()
        .expect("balance must serialize as a string");
    assert_eq!(balance.parse::<Decimal>().unwrap(), engine.state().balance());

    let nav = value["portfolio_health"]["net_asset_value"]
        .as_str()
        .expect("net_asset_value must serialize as a string");
    assert_eq!(nav.parse::<Decimal>().unwrap(), engine.state().net_worth());

    assert!(value["risk_metrics"]["collapse_probability"].is_string());
    assert!(value["behavioral_metrics"]["financial_vibe_score"].is_string());
    assert!(value["portfolio_health"]["liquidity_ratio"].is_string());

    // Dates render as ISO strings.
    assert_eq!(value["meta"]["start_date"], "2025-01-01");
    assert_eq!(value["meta"]["end_date"], "2025-12-31");
}

#[test]
fn test_report_is_deterministic() {
    let a = completed_engine(7).report().unwrap();
    let b = completed_engine(7).report().unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_liquidity_ratio_debt_free_sentinel() {
    // No debts at all → the 999 "effectively infinite" sentinel.
    let config = SimulationConfig::new(date(2025, 1, 1), date(2025, 2, 28), Decimal::from(5_000), 3);
    let mut graph = DependencyGraph::new();
    graph
        .add_node(Node::new(
            "salary",
            NodeKind::Salary {
                annual_salary: Decimal::from(60_000),
                payment_day: 1,
            },
        ))
        .unwrap();

    let mut engine = SimulationEngine::new(config, graph).unwrap();
    engine.run().unwrap();

    let report = engine.report().unwrap();
    assert_eq!(report.portfolio_health.liquidity_ratio, Decimal::from(999));
    assert_eq!(report.portfolio_health.debt_to_income_ratio, Decimal::ZERO);
}

// ============================================================================
// Multi-scenario statistics
// ============================================================================

#[test]
fn test_scenario_percentiles_ordered_and_reproducible() {
    let config = SimulationConfig::new(
        date(2025, 1, 1),
        date(2025, 6, 30),
        Decimal::from(10_000),
        42,
    );

    let runner = ScenarioRunner::new(config.clone(), household_graph());
    let outcomes = runner.run_scenarios(20).unwrap();
    assert_eq!(outcomes.len(), 20);

    let summary = ScenarioRunner::summarize(&outcomes).unwrap();
    assert!(summary.p5 <= summary.p50);
    assert!(summary.p50 <= summary.p95);

    let min = outcomes.iter().map(|o| o.final_balance).min().unwrap();
    let max = outcomes.iter().map(|o| o.final_balance).max().unwrap();
    assert!(summary.mean >= min && summary.mean <= max);

    // The whole sweep replays identically.
    let replay = ScenarioRunner::new(config, household_graph())
        .run_scenarios(20)
        .unwrap();
    for (a, b) in outcomes.iter().zip(replay.iter()) {
        assert_eq!(a.final_balance, b.final_balance);
        assert_eq!(a.report, b.report);
    }
}
