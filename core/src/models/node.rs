//! Financial node variants
//!
//! A node is one financial component (income, expense, asset, tax, credit)
//! with a pure daily evaluation function. Variants form a closed enum with
//! a single evaluation capability; new instruments implement the same
//! contract rather than subclassing a mutable base.
//!
//! # Purity
//!
//! `evaluate` is a pure function of (state, date, substream). Nodes hold no
//! cross-call mutable data; anything that must persist between days lives
//! in the wallet state. Monthly schedules are pure date predicates: a
//! payment day the current month lacks (e.g. 30 in February) simply does
//! not fire that month.

use crate::models::mutation::StateMutation;
use crate::models::state::{Asset, AssetKind, WalletState, CREDIT_SCORE_MIN};
use crate::rng::Xorshift64Star;
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a node's evaluation
///
/// The engine wraps these with the node identifier and simulation date.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error("malformed tax bracket table: {0}")]
    MalformedBrackets(String),

    #[error("unknown asset '{0}'")]
    UnknownAsset(String),

    #[error("unknown debt '{0}'")]
    UnknownDebt(String),
}

/// Result of one node evaluation
///
/// `delta` is the signed change to the cash balance; `mutations` are the
/// field-level writes the engine applies afterwards, in emission order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeOutput {
    pub delta: Decimal,
    pub mutations: Vec<StateMutation>,
}

/// Condition for a [`NodeKind::ConditionalExpense`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpenseTrigger {
    BalanceAbove(Decimal),
    BalanceBelow(Decimal),
    DayOfMonth(u32),
}

impl ExpenseTrigger {
    fn is_met(&self, state: &WalletState, date: NaiveDate) -> bool {
        match self {
            ExpenseTrigger::BalanceAbove(limit) => state.balance() > *limit,
            ExpenseTrigger::BalanceBelow(limit) => state.balance() < *limit,
            ExpenseTrigger::DayOfMonth(day) => date.day() == *day,
        }
    }
}

/// One progressive tax bracket
///
/// `upper` of `None` marks the final, unbounded bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub lower: Decimal,
    pub upper: Option<Decimal>,
    pub rate: Decimal,
}

impl TaxBracket {
    pub fn new(lower: Decimal, upper: Option<Decimal>, rate: Decimal) -> Self {
        Self { lower, upper, rate }
    }

    /// US-style default bracket table
    pub fn default_progressive() -> Vec<TaxBracket> {
        vec![
            TaxBracket::new(Decimal::ZERO, Some(Decimal::from(10_000)), Decimal::new(10, 2)),
            TaxBracket::new(
                Decimal::from(10_000),
                Some(Decimal::from(40_000)),
                Decimal::new(12, 2),
            ),
            TaxBracket::new(
                Decimal::from(40_000),
                Some(Decimal::from(85_000)),
                Decimal::new(22, 2),
            ),
            TaxBracket::new(
                Decimal::from(85_000),
                Some(Decimal::from(160_000)),
                Decimal::new(24, 2),
            ),
            TaxBracket::new(Decimal::from(160_000), None, Decimal::new(32, 2)),
        ]
    }
}

/// The closed set of financial node formulas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Fixed periodic salary: annual amount paid in twelve monthly parts
    Salary {
        annual_salary: Decimal,
        payment_day: u32,
    },

    /// Stochastic income (freelance, bonuses): daily Bernoulli gate,
    /// Gaussian amount clamped at zero
    VariableIncome {
        mean: Decimal,
        std_dev: Decimal,
        /// Daily probability of a payment arriving, in [0, 1]
        probability: Decimal,
    },

    /// Daily growth of investable assets with Gaussian volatility;
    /// gains are realized to the balance
    InvestmentReturn { annual_rate: Decimal },

    /// Fixed recurring expense (rent, subscriptions)
    FixedExpense {
        amount: Decimal,
        payment_day: u32,
        description: String,
    },

    /// Daily variable spending (food, transport), Gaussian, clamped at zero
    VariableExpense {
        daily_mean: Decimal,
        daily_std_dev: Decimal,
        description: String,
    },

    /// Expense fired by a declarative condition
    ConditionalExpense {
        amount: Decimal,
        trigger: ExpenseTrigger,
        description: String,
    },

    /// Monthly pass over the debt ledger: pay what is affordable,
    /// amortize principal, count missed payments
    DebtPayment { payment_day: u32 },

    /// Invest a fraction of the balance surplus above a threshold into a
    /// per-kind portfolio asset
    AssetPurchase {
        kind: AssetKind,
        threshold: Decimal,
        fraction: Decimal,
    },

    /// Liquidate liquid assets (cheapest penalty first) whenever the
    /// balance falls below a floor
    Liquidation { min_balance: Decimal },

    /// Annual progressive income tax on the tax year's recorded income
    IncomeTax {
        brackets: Vec<TaxBracket>,
        payment_month: u32,
        payment_day: u32,
    },

    /// Daily credit score transition from debt ratio, payment punctuality,
    /// and balance level
    CreditScore { alpha: Decimal },

    /// Terminal bankruptcy trigger on deep negative net worth with
    /// exhausted liquid assets
    BankruptcyCheck { threshold: Decimal },
}

/// A financial node: identifier, declared dependencies, formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: String,
    depends_on: Vec<String>,
    kind: NodeKind,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            depends_on: Vec::new(),
            kind,
        }
    }

    /// Declare nodes that must be evaluated before this one each day
    pub fn with_dependencies(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Evaluate this node for one day
    pub fn evaluate(
        &self,
        state: &WalletState,
        date: NaiveDate,
        rng: &mut Xorshift64Star,
    ) -> Result<NodeOutput, NodeError> {
        self.kind.evaluate(state, date, rng)
    }
}

impl NodeKind {
    /// Ledger category tag for balance-affecting firings
    pub fn ledger_category(&self) -> &'static str {
        match self {
            NodeKind::Salary { .. } => "income:salary",
            NodeKind::VariableIncome { .. } => "income:variable",
            NodeKind::InvestmentReturn { .. } => "income:investment",
            NodeKind::FixedExpense { .. } => "expense:fixed",
            NodeKind::VariableExpense { .. } => "expense:variable",
            NodeKind::ConditionalExpense { .. } => "expense:conditional",
            NodeKind::DebtPayment { .. } => "expense:debt",
            NodeKind::AssetPurchase { .. } => "investment",
            NodeKind::Liquidation { .. } => "liquidation",
            NodeKind::IncomeTax { .. } => "tax:income",
            NodeKind::CreditScore { .. } => "credit",
            NodeKind::BankruptcyCheck { .. } => "bankruptcy",
        }
    }

    /// Ledger description for balance-affecting firings
    pub fn ledger_description(&self) -> String {
        match self {
            NodeKind::Salary { .. } => "Salary payment".to_string(),
            NodeKind::VariableIncome { .. } => "Variable income".to_string(),
            NodeKind::InvestmentReturn { .. } => "Investment returns".to_string(),
            NodeKind::FixedExpense { description, .. } => description.clone(),
            NodeKind::VariableExpense { description, .. } => description.clone(),
            NodeKind::ConditionalExpense { description, .. } => description.clone(),
            NodeKind::DebtPayment { .. } => "Debt payments".to_string(),
            NodeKind::AssetPurchase { kind, .. } => {
                format!("Investment in {}_portfolio", kind.as_str())
            }
            NodeKind::Liquidation { .. } => "Asset liquidation".to_string(),
            NodeKind::IncomeTax { .. } => "Annual income tax".to_string(),
            NodeKind::CreditScore { .. } => "Credit score update".to_string(),
            NodeKind::BankruptcyCheck { .. } => "Bankruptcy event".to_string(),
        }
    }

    fn evaluate(
        &self,
        state: &WalletState,
        date: NaiveDate,
        rng: &mut Xorshift64Star,
    ) -> Result<NodeOutput, NodeError> {
        match self {
            NodeKind::Salary {
                annual_salary,
                payment_day,
            } => Ok(salary(state, date, *annual_salary, *payment_day)),
            NodeKind::VariableIncome {
                mean,
                std_dev,
                probability,
            } => Ok(variable_income(state, rng, *mean, *std_dev, *probability)),
            NodeKind::InvestmentReturn { annual_rate } => {
                Ok(investment_return(state, rng, *annual_rate))
            }
            NodeKind::FixedExpense {
                amount, payment_day, ..
            } => Ok(fixed_expense(state, date, *amount, *payment_day)),
            NodeKind::VariableExpense {
                daily_mean,
                daily_std_dev,
                ..
            } => Ok(variable_expense(state, rng, *daily_mean, *daily_std_dev)),
            NodeKind::ConditionalExpense {
                amount, trigger, ..
            } => Ok(conditional_expense(state, date, *amount, trigger)),
            NodeKind::DebtPayment { payment_day } => Ok(debt_payment(state, date, *payment_day)),
            NodeKind::AssetPurchase {
                kind,
                threshold,
                fraction,
            } => Ok(asset_purchase(state, *kind, *threshold, *fraction)),
            NodeKind::Liquidation { min_balance } => Ok(liquidation(state, *min_balance)),
            NodeKind::IncomeTax {
                brackets,
                payment_month,
                payment_day,
            } => income_tax(state, date, brackets, *payment_month, *payment_day),
            NodeKind::CreditScore { alpha } => Ok(credit_score(state, *alpha)),
            NodeKind::BankruptcyCheck { threshold } => Ok(bankruptcy_check(state, *threshold)),
        }
    }
}

// ============================================================================
// Income formulas
// ============================================================================

fn salary(state: &WalletState, date: NaiveDate, annual_salary: Decimal, payment_day: u32) -> NodeOutput {
    if date.day() != payment_day {
        return NodeOutput::default();
    }

    let monthly = (annual_salary / Decimal::from(12)).round_dp(2);
    NodeOutput {
        delta: monthly,
        mutations: vec![StateMutation::SetIncomeYtd(state.income_ytd() + monthly)],
    }
}

fn variable_income(
    state: &WalletState,
    rng: &mut Xorshift64Star,
    mean: Decimal,
    std_dev: Decimal,
    probability: Decimal,
) -> NodeOutput {
    let p = probability.to_f64().unwrap_or(0.0);
    if rng.next_f64() >= p {
        return NodeOutput::default();
    }

    let sampled = rng.next_gaussian(
        mean.to_f64().unwrap_or(0.0),
        std_dev.to_f64().unwrap_or(0.0),
    );
    let amount = Decimal::from_f64(sampled.max(0.0))
        .unwrap_or(Decimal::ZERO)
        .round_dp(2);

    if amount <= Decimal::ZERO {
        return NodeOutput::default();
    }

    NodeOutput {
        delta: amount,
        mutations: vec![StateMutation::SetIncomeYtd(state.income_ytd() + amount)],
    }
}

fn investment_return(
    state: &WalletState,
    rng: &mut Xorshift64Star,
    annual_rate: Decimal,
) -> NodeOutput {
    let daily_rate = annual_rate / Decimal::from(365);
    let mut total_return = Decimal::ZERO;
    let mut mutations = Vec::new();

    for (id, asset) in state.assets() {
        if !asset.kind.is_investable() {
            continue;
        }

        // One volatility draw per investable asset, every day.
        let volatility = rng.next_gaussian(1.0, 0.01);
        let volatility = Decimal::from_f64(volatility)
            .unwrap_or(Decimal::ONE)
            .round_dp(6);

        let gain = (asset.value * daily_rate * volatility).round_dp(2);
        if gain != Decimal::ZERO {
            mutations.push(StateMutation::SetAssetValue {
                asset_id: id.clone(),
                value: asset.value + gain,
            });
            total_return += gain;
        }
    }

    if total_return != Decimal::ZERO {
        mutations.push(StateMutation::SetIncomeYtd(state.income_ytd() + total_return));
    }

    NodeOutput {
        delta: total_return,
        mutations,
    }
}

// ============================================================================
// Expense formulas
// ============================================================================

fn fixed_expense(state: &WalletState, date: NaiveDate, amount: Decimal, payment_day: u32) -> NodeOutput {
    if date.day() != payment_day {
        return NodeOutput::default();
    }

    NodeOutput {
        delta: -amount,
        mutations: vec![StateMutation::SetExpensesYtd(state.expenses_ytd() + amount)],
    }
}

fn variable_expense(
    state: &WalletState,
    rng: &mut Xorshift64Star,
    daily_mean: Decimal,
    daily_std_dev: Decimal,
) -> NodeOutput {
    let sampled = rng.next_gaussian(
        daily_mean.to_f64().unwrap_or(0.0),
        daily_std_dev.to_f64().unwrap_or(0.0),
    );
    let amount = Decimal::from_f64(sampled.max(0.0))
        .unwrap_or(Decimal::ZERO)
        .round_dp(2);

    if amount <= Decimal::ZERO {
        return NodeOutput::default();
    }

    NodeOutput {
        delta: -amount,
        mutations: vec![StateMutation::SetExpensesYtd(state.expenses_ytd() + amount)],
    }
}

fn conditional_expense(
    state: &WalletState,
    date: NaiveDate,
    amount: Decimal,
    trigger: &ExpenseTrigger,
) -> NodeOutput {
    if !trigger.is_met(state, date) {
        return NodeOutput::default();
    }

    NodeOutput {
        delta: -amount,
        mutations: vec![StateMutation::SetExpensesYtd(state.expenses_ytd() + amount)],
    }
}

fn debt_payment(state: &WalletState, date: NaiveDate, payment_day: u32) -> NodeOutput {
    if date.day() != payment_day {
        return NodeOutput::default();
    }

    let mut available = state.balance();
    let mut total_paid = Decimal::ZERO;
    let mut mutations = Vec::new();

    for (id, debt) in state.debts() {
        if available >= debt.monthly_payment {
            available -= debt.monthly_payment;

            let interest = (debt.principal * debt.annual_rate / Decimal::from(12)).round_dp(2);
            let principal_part = debt.monthly_payment - interest;
            let new_principal = (debt.principal - principal_part).max(Decimal::ZERO);

            mutations.push(StateMutation::SetDebtPrincipal {
                debt_id: id.clone(),
                principal: new_principal,
            });
            total_paid += debt.monthly_payment;
        } else {
            mutations.push(StateMutation::SetMissedPayments {
                debt_id: id.clone(),
                count: debt.missed_payments + 1,
            });
        }
    }

    if total_paid != Decimal::ZERO {
        mutations.push(StateMutation::SetExpensesYtd(state.expenses_ytd() + total_paid));
    }

    NodeOutput {
        delta: -total_paid,
        mutations,
    }
}

// ============================================================================
// Asset formulas
// ============================================================================

fn asset_purchase(
    state: &WalletState,
    kind: AssetKind,
    threshold: Decimal,
    fraction: Decimal,
) -> NodeOutput {
    let surplus = state.balance() - threshold;
    if surplus <= Decimal::ZERO {
        return NodeOutput::default();
    }

    let investment = (surplus * fraction).round_dp(2);
    if investment <= Decimal::ZERO {
        return NodeOutput::default();
    }

    let asset_id = format!("{}_portfolio", kind.as_str());
    let mutation = match state.asset(&asset_id) {
        Some(existing) => StateMutation::SetAssetValue {
            asset_id,
            value: existing.value + investment,
        },
        None => StateMutation::AddAsset {
            asset_id,
            asset: Asset::new(kind, investment).with_liquidation_penalty(Decimal::new(2, 2)),
        },
    };

    NodeOutput {
        delta: -investment,
        mutations: vec![mutation],
    }
}

fn liquidation(state: &WalletState, min_balance: Decimal) -> NodeOutput {
    if state.balance() >= min_balance {
        return NodeOutput::default();
    }

    let mut deficit = min_balance - state.balance();
    let mut proceeds_total = Decimal::ZERO;
    let mut mutations = Vec::new();

    // Cheapest liquidation penalty first; BTreeMap iteration keeps ties in
    // identifier order after the stable sort.
    let mut candidates: Vec<(&String, &Asset)> = state
        .assets()
        .iter()
        .filter(|(_, a)| a.is_liquid && a.value > Decimal::ZERO)
        .collect();
    candidates.sort_by(|a, b| a.1.liquidation_penalty.cmp(&b.1.liquidation_penalty));

    for (id, asset) in candidates {
        if deficit <= Decimal::ZERO {
            break;
        }

        let retained = Decimal::ONE - asset.liquidation_penalty;
        let net_value = asset.value * retained;

        if net_value >= deficit {
            // Partial liquidation: sell just enough gross value to net the deficit.
            let amount_needed = (deficit / retained).round_dp(2);
            let proceeds = (amount_needed * retained).round_dp(2);

            mutations.push(StateMutation::SetAssetValue {
                asset_id: id.clone(),
                value: asset.value - amount_needed,
            });
            proceeds_total += proceeds;
            deficit = Decimal::ZERO;
        } else {
            let proceeds = net_value.round_dp(2);
            mutations.push(StateMutation::RemoveAsset { asset_id: id.clone() });
            proceeds_total += proceeds;
            deficit -= proceeds;
        }
    }

    NodeOutput {
        delta: proceeds_total,
        mutations,
    }
}

// ============================================================================
// Tax formulas
// ============================================================================

fn validate_brackets(brackets: &[TaxBracket]) -> Result<(), NodeError> {
    if brackets.is_empty() {
        return Err(NodeError::MalformedBrackets("bracket table is empty".to_string()));
    }

    for (i, bracket) in brackets.iter().enumerate() {
        match bracket.upper {
            Some(upper) if upper <= bracket.lower => {
                return Err(NodeError::MalformedBrackets(format!(
                    "bracket {}..{} has non-positive width",
                    bracket.lower, upper
                )));
            }
            None if i + 1 != brackets.len() => {
                return Err(NodeError::MalformedBrackets(
                    "unbounded bracket before the final bracket".to_string(),
                ));
            }
            _ => {}
        }

        if i > 0 && bracket.lower < brackets[i - 1].lower {
            return Err(NodeError::MalformedBrackets(
                "bracket lower bounds must be ascending".to_string(),
            ));
        }
    }

    Ok(())
}

/// Progressive bracket tax on a taxable income figure
pub fn progressive_tax(income: Decimal, brackets: &[TaxBracket]) -> Result<Decimal, NodeError> {
    validate_brackets(brackets)?;

    if income <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }

    let mut total_tax = Decimal::ZERO;
    let mut remaining = income;

    for bracket in brackets {
        if remaining <= Decimal::ZERO {
            break;
        }

        let taxable = match bracket.upper {
            Some(upper) => remaining.min(upper - bracket.lower),
            None => remaining,
        };

        total_tax += taxable * bracket.rate;
        remaining -= taxable;
    }

    Ok(total_tax.round_dp(2))
}

fn income_tax(
    state: &WalletState,
    date: NaiveDate,
    brackets: &[TaxBracket],
    payment_month: u32,
    payment_day: u32,
) -> Result<NodeOutput, NodeError> {
    if date.month() != payment_month || date.day() != payment_day {
        return Ok(NodeOutput::default());
    }

    let tax_owed = progressive_tax(state.income_ytd(), brackets)?;

    // The annual accumulator resets for the new tax year after assessment.
    Ok(NodeOutput {
        delta: -tax_owed,
        mutations: vec![
            StateMutation::SetTaxesPaidYtd(state.taxes_paid_ytd() + tax_owed),
            StateMutation::SetIncomeYtd(Decimal::ZERO),
        ],
    })
}

// ============================================================================
// Credit formulas
// ============================================================================

fn debt_ratio_impact(state: &WalletState) -> Decimal {
    let total_debt = state.total_debt();

    let annual_income = if state.income_ytd() == Decimal::ZERO {
        Decimal::from(50_000)
    } else {
        state.income_ytd()
    };

    let debt_ratio = total_debt / annual_income;

    if debt_ratio < Decimal::new(3, 1) {
        Decimal::from(2)
    } else if debt_ratio < Decimal::new(5, 1) {
        Decimal::ZERO
    } else {
        Decimal::from(-3)
    }
}

fn punctuality_impact(state: &WalletState) -> Decimal {
    let total_missed: u32 = state.debts().values().map(|d| d.missed_payments).sum();

    if total_missed == 0 {
        Decimal::ONE
    } else if total_missed <= 2 {
        Decimal::from(-2)
    } else {
        Decimal::from(-5)
    }
}

fn balance_impact(state: &WalletState) -> Decimal {
    let balance = state.balance();

    if balance > Decimal::from(10_000) {
        Decimal::ONE
    } else if balance > Decimal::ZERO {
        Decimal::new(5, 1)
    } else if balance > Decimal::from(-1_000) {
        Decimal::from(-1)
    } else {
        Decimal::from(-3)
    }
}

fn credit_score(state: &WalletState, alpha: Decimal) -> NodeOutput {
    let total_impact = debt_ratio_impact(state) + punctuality_impact(state) + balance_impact(state);
    let change = alpha * total_impact;

    NodeOutput {
        delta: Decimal::ZERO,
        mutations: vec![StateMutation::SetCreditScore(state.credit_score() + change)],
    }
}

fn bankruptcy_check(state: &WalletState, threshold: Decimal) -> NodeOutput {
    if state.is_bankrupt() {
        return NodeOutput::default();
    }

    let liquid = state.liquid_assets();
    if state.net_worth() < threshold && liquid < Decimal::from(100) {
        return NodeOutput {
            delta: Decimal::ZERO,
            mutations: vec![
                StateMutation::MarkBankrupt,
                StateMutation::SetCreditScore(CREDIT_SCORE_MIN),
            ],
        };
    }

    NodeOutput::default()
}
