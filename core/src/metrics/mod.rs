//! Behavioral and risk metrics
//!
//! Pure derivations over the accumulated day-record history and the final
//! wallet state. Nothing here mutates anything.
//!
//! Statistics (means, deviations, slopes) are computed over f64 and
//! quantized back to `Decimal` once per metric; monetary state itself never
//! leaves `Decimal`.

use crate::models::state::WalletState;
use crate::orchestrator::engine::DayRecord;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Percentile summary across multi-scenario outcomes
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileSummary {
    pub p5: Decimal,
    pub p50: Decimal,
    pub p95: Decimal,
    pub mean: Decimal,
}

fn as_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn to_decimal(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO).round_dp(dp)
}

/// Sample standard deviation, zero below two observations
fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

// ============================================================================
// Behavioral metrics
// ============================================================================

/// Financial vibe: a 0-100 composite of recent balance level, trend, and
/// volatility, plus a qualitative description
///
/// Histories shorter than a week read as neutral.
pub fn vibe_score(history: &[DayRecord]) -> (Decimal, &'static str) {
    if history.len() < 7 {
        return (Decimal::from(50), "Neutral");
    }

    let recent_days = history.len().min(30);
    let recent: Vec<f64> = history[history.len() - recent_days..]
        .iter()
        .map(|r| as_f64(r.balance))
        .collect();

    let avg = recent.iter().sum::<f64>() / recent.len() as f64;
    let trend = recent[recent.len() - 1] - recent[0];
    let volatility = sample_stdev(&recent);

    let mut score: i32 = if avg > 50_000.0 {
        80
    } else if avg > 10_000.0 {
        60
    } else if avg > 0.0 {
        40
    } else {
        20
    };

    if trend > 1_000.0 {
        score += 15;
    } else if trend < -1_000.0 {
        score -= 15;
    }

    if volatility > 10_000.0 {
        score -= 10;
    }

    let score = score.clamp(0, 100);

    let description = if score >= 80 {
        "Thriving"
    } else if score >= 60 {
        "Stable"
    } else if score >= 40 {
        "Cautious"
    } else if score >= 20 {
        "Stressed"
    } else {
        "Critical"
    };

    (Decimal::from(score), description)
}

/// Discrete pet-state bucket of the vibe score
pub fn pet_state(vibe: Decimal) -> &'static str {
    if vibe >= Decimal::from(80) {
        "Celebrating"
    } else if vibe >= Decimal::from(60) {
        "Happy"
    } else if vibe >= Decimal::from(40) {
        "Neutral"
    } else if vibe >= Decimal::from(20) {
        "Anxious"
    } else {
        "Panicking"
    }
}

/// Balance slope ($/day) over the 30 days after the most recent
/// negative-balance period
///
/// `None` if the balance never went negative; zero when the recovery window
/// extends past the recorded history.
pub fn recovery_slope(history: &[DayRecord]) -> Option<Decimal> {
    let mut negative_periods: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();

    for (i, record) in history.iter().enumerate() {
        if record.balance < Decimal::ZERO {
            current.push(i);
        } else if !current.is_empty() {
            negative_periods.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        negative_periods.push(current);
    }

    let last_period = negative_periods.last()?;
    let recovery_start = *last_period.last()?;

    if recovery_start + 30 < history.len() {
        let recovery_end = (recovery_start + 30).min(history.len() - 1);
        let start_balance = as_f64(history[recovery_start].balance);
        let end_balance = as_f64(history[recovery_end].balance);
        let days = (recovery_end - recovery_start) as f64;

        if days > 0.0 {
            return Some(to_decimal((end_balance - start_balance) / days, 2));
        }
    }

    Some(Decimal::ZERO)
}

// ============================================================================
// Risk metrics
// ============================================================================

/// Fraction of recorded days spent with a negative balance
pub fn collapse_probability(history: &[DayRecord]) -> Decimal {
    if history.is_empty() {
        return Decimal::ZERO;
    }

    let negative_days = history.iter().filter(|r| r.balance < Decimal::ZERO).count();
    (Decimal::from(negative_days) / Decimal::from(history.len())).round_dp(4)
}

/// Shock resilience index: months of estimated expenses covered by liquid
/// holdings, clamped to [0, 10]
///
/// Zero below 30 days of history (not enough signal to estimate expenses).
pub fn shock_resilience(history: &[DayRecord]) -> Decimal {
    if history.len() < 30 {
        return Decimal::ZERO;
    }

    let last = &history[history.len() - 1];
    let total_liquid = as_f64(last.liquid_assets) + as_f64(last.balance);

    let window = &history[history.len() - 30..];
    let balance_change = as_f64(window[window.len() - 1].balance) - as_f64(window[0].balance);

    let monthly_expense = if balance_change < 0.0 {
        -balance_change
    } else {
        1_000.0
    };

    if monthly_expense == 0.0 {
        return Decimal::from(10);
    }

    to_decimal((total_liquid / monthly_expense).clamp(0.0, 10.0), 2)
}

/// Standard deviation of the recorded balance series
pub fn balance_volatility(history: &[DayRecord]) -> Decimal {
    if history.len() < 2 {
        return Decimal::ZERO;
    }

    let balances: Vec<f64> = history.iter().map(|r| as_f64(r.balance)).collect();
    to_decimal(sample_stdev(&balances), 2)
}

// ============================================================================
// Portfolio health
// ============================================================================

/// Liquid holdings (liquid assets + balance) over total debt
///
/// 999 when debt-free, standing in for "effectively infinite".
pub fn liquidity_ratio(state: &WalletState) -> Decimal {
    let liquid = state.liquid_assets() + state.balance();
    let total_debt = state.total_debt();

    if total_debt == Decimal::ZERO {
        return Decimal::from(999);
    }

    (liquid / total_debt).round_dp(2)
}

/// Total debt over the tax year's recorded income, zero when no income yet
pub fn debt_to_income(state: &WalletState) -> Decimal {
    let income = state.income_ytd();
    if income == Decimal::ZERO {
        return Decimal::ZERO;
    }

    (state.total_debt() / income).round_dp(2)
}

// ============================================================================
// Multi-scenario statistics
// ============================================================================

/// Percentiles and mean across scenario outcomes, `None` when empty
pub fn percentile_summary(values: &[Decimal]) -> Option<PercentileSummary> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort();
    let n = sorted.len();

    let index = |q: f64| -> usize { ((n as f64 * q) as usize).min(n - 1) };

    let mean = (sorted.iter().copied().sum::<Decimal>() / Decimal::from(n)).round_dp(2);

    Some(PercentileSummary {
        p5: sorted[index(0.05)],
        p50: sorted[index(0.50)],
        p95: sorted[index(0.95)],
        mean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: u32, balance: i64, liquid: i64) -> DayRecord {
        // Dates only matter for ordering in these derivations.
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Days::new(day as u64);
        DayRecord {
            date,
            balance: Decimal::from(balance),
            credit_score: Decimal::from(700),
            total_assets: Decimal::from(liquid),
            total_debt: Decimal::ZERO,
            net_worth: Decimal::from(balance + liquid),
            liquid_assets: Decimal::from(liquid),
            net_delta: Decimal::ZERO,
            bankrupt: false,
        }
    }

    fn flat_history(days: u32, balance: i64) -> Vec<DayRecord> {
        (0..days).map(|d| record(d, balance, 0)).collect()
    }

    #[test]
    fn test_vibe_neutral_for_short_history() {
        let history = flat_history(5, 100_000);
        assert_eq!(vibe_score(&history), (Decimal::from(50), "Neutral"));
    }

    #[test]
    fn test_vibe_thriving_on_high_stable_balance() {
        let history = flat_history(60, 80_000);
        let (score, description) = vibe_score(&history);
        assert_eq!(score, Decimal::from(80));
        assert_eq!(description, "Thriving");
    }

    #[test]
    fn test_vibe_penalizes_negative_trend() {
        // Balance collapsing by 500/day: average still positive, trend deeply
        // negative.
        let history: Vec<DayRecord> = (0..40)
            .map(|d| record(d, 30_000 - (d as i64) * 500, 0))
            .collect();
        let (score, _) = vibe_score(&history);
        // avg > 10000 → 60, trend < -1000 → -15
        assert_eq!(score, Decimal::from(45));
    }

    #[test]
    fn test_pet_state_buckets() {
        assert_eq!(pet_state(Decimal::from(95)), "Celebrating");
        assert_eq!(pet_state(Decimal::from(65)), "Happy");
        assert_eq!(pet_state(Decimal::from(45)), "Neutral");
        assert_eq!(pet_state(Decimal::from(25)), "Anxious");
        assert_eq!(pet_state(Decimal::from(5)), "Panicking");
    }

    #[test]
    fn test_collapse_probability_counts_negative_days() {
        let mut history = flat_history(8, 1_000);
        history.extend((8..10).map(|d| record(d, -500, 0)));
        assert_eq!(collapse_probability(&history), Decimal::new(2, 1));
    }

    #[test]
    fn test_collapse_probability_empty_history() {
        assert_eq!(collapse_probability(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_recovery_slope_none_without_negative_period() {
        let history = flat_history(60, 5_000);
        assert_eq!(recovery_slope(&history), None);
    }

    #[test]
    fn test_recovery_slope_positive_after_dip() {
        // 5 days underwater, then climbing 100/day for 40 days.
        let mut history: Vec<DayRecord> = (0..5).map(|d| record(d, -1_000, 0)).collect();
        history.extend((5..45).map(|d| record(d, ((d as i64) - 5) * 100, 0)));

        let slope = recovery_slope(&history).unwrap();
        assert!(slope > Decimal::ZERO);
    }

    #[test]
    fn test_shock_resilience_short_history() {
        assert_eq!(shock_resilience(&flat_history(10, 5_000)), Decimal::ZERO);
    }

    #[test]
    fn test_shock_resilience_clamped_to_ten() {
        // Flat balance → default 1000 expense estimate; huge liquid cushion.
        let history = flat_history(40, 500_000);
        assert_eq!(shock_resilience(&history), Decimal::from(10));
    }

    #[test]
    fn test_balance_volatility_flat_series_is_zero() {
        assert_eq!(balance_volatility(&flat_history(20, 3_000)), Decimal::ZERO);
    }

    #[test]
    fn test_percentile_summary() {
        let values: Vec<Decimal> = (1..=100).map(Decimal::from).collect();
        let summary = percentile_summary(&values).unwrap();
        assert_eq!(summary.p5, Decimal::from(6));
        assert_eq!(summary.p50, Decimal::from(51));
        assert_eq!(summary.p95, Decimal::from(96));
        assert_eq!(summary.mean, Decimal::new(5_050, 2));
    }

    #[test]
    fn test_percentile_summary_empty() {
        assert!(percentile_summary(&[]).is_none());
    }
}
