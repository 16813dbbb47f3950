//! Wallet state
//!
//! Represents the complete financial state of the simulated household at a
//! point in time: cash balance, credit score, asset and debt ledgers, and
//! the append-only transaction ledger.
//!
//! # Critical Invariants
//!
//! 1. All monetary values are `Decimal` (no floating-point money)
//! 2. The credit score stays within [300, 850]
//! 3. The transaction ledger is append-only, never rewritten
//! 4. Asset and debt maps are BTreeMaps for deterministic iteration

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest representable credit score
pub const CREDIT_SCORE_MIN: Decimal = Decimal::from_parts(300, 0, 0, false, 0);

/// Highest representable credit score
pub const CREDIT_SCORE_MAX: Decimal = Decimal::from_parts(850, 0, 0, false, 0);

/// Clamp a score into the representable credit range
pub fn clamp_credit_score(score: Decimal) -> Decimal {
    score.max(CREDIT_SCORE_MIN).min(CREDIT_SCORE_MAX)
}

/// Asset categories with different liquidity characteristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Cash,
    Stocks,
    Bonds,
    RealEstate,
    Crypto,
    Other,
}

impl AssetKind {
    /// Whether daily investment returns apply to this kind
    pub fn is_investable(&self) -> bool {
        matches!(self, AssetKind::Stocks | AssetKind::Bonds | AssetKind::Crypto)
    }

    /// Stable lowercase name, used for derived asset identifiers
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Cash => "cash",
            AssetKind::Stocks => "stocks",
            AssetKind::Bonds => "bonds",
            AssetKind::RealEstate => "real_estate",
            AssetKind::Crypto => "crypto",
            AssetKind::Other => "other",
        }
    }
}

/// An asset position with liquidation properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub kind: AssetKind,

    /// Current market value
    pub value: Decimal,

    /// Whether automatic liquidation may sell this asset
    pub is_liquid: bool,

    /// Fraction of value lost when liquidating, in [0, 1]
    pub liquidation_penalty: Decimal,
}

impl Asset {
    pub fn new(kind: AssetKind, value: Decimal) -> Self {
        Self {
            kind,
            value,
            is_liquid: true,
            liquidation_penalty: Decimal::ZERO,
        }
    }

    pub fn with_liquidation_penalty(mut self, penalty: Decimal) -> Self {
        self.liquidation_penalty = penalty;
        self
    }

    pub fn illiquid(mut self) -> Self {
        self.is_liquid = false;
        self
    }
}

/// A debt position with amortization terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    /// Remaining principal
    pub principal: Decimal,

    /// Annual interest rate as a fraction (0.05 = 5%)
    pub annual_rate: Decimal,

    /// Contractual monthly payment
    pub monthly_payment: Decimal,

    /// Count of payments missed so far
    pub missed_payments: u32,
}

impl Debt {
    pub fn new(principal: Decimal, annual_rate: Decimal, monthly_payment: Decimal) -> Self {
        Self {
            principal,
            annual_rate,
            monthly_payment,
            missed_payments: 0,
        }
    }
}

/// One entry in the append-only transaction ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,

    /// Signed amount: positive credits the balance, negative debits it
    pub amount: Decimal,

    pub description: String,

    /// Category tag, e.g. "income:salary" or "expense:fixed"
    pub category: String,

    /// Balance after this entry was applied
    pub balance_after: Decimal,
}

/// Complete financial state at a point in time
///
/// Mutated only by the simulation engine: balance moves through node deltas,
/// every other field through explicit [`StateMutation`]s.
///
/// [`StateMutation`]: crate::models::mutation::StateMutation
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
/// use wallet_simulator_core::WalletState;
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let state = WalletState::new(start, Decimal::from(10_000), Decimal::from(700));
/// assert_eq!(state.net_worth(), Decimal::from(10_000));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletState {
    /// Date this state describes
    pub(crate) current_date: NaiveDate,

    /// Liquid cash balance
    pub(crate) balance: Decimal,

    /// Credit score, clamped to [300, 850]
    pub(crate) credit_score: Decimal,

    /// Asset positions by identifier
    pub(crate) assets: BTreeMap<String, Asset>,

    /// Debt positions by identifier
    pub(crate) debts: BTreeMap<String, Debt>,

    /// Income recorded since the start of the tax year
    pub(crate) income_ytd: Decimal,

    /// Expenses recorded since the start of the tax year
    pub(crate) expenses_ytd: Decimal,

    /// Taxes paid since the start of the tax year
    pub(crate) taxes_paid_ytd: Decimal,

    /// Terminal bankruptcy flag; once set it is never cleared in a branch
    pub(crate) bankrupt: bool,

    /// Append-only transaction history
    pub(crate) ledger: Vec<LedgerEntry>,
}

impl WalletState {
    /// Create a fresh state
    ///
    /// The credit score is clamped into [300, 850].
    pub fn new(current_date: NaiveDate, balance: Decimal, credit_score: Decimal) -> Self {
        Self {
            current_date,
            balance,
            credit_score: clamp_credit_score(credit_score),
            assets: BTreeMap::new(),
            debts: BTreeMap::new(),
            income_ytd: Decimal::ZERO,
            expenses_ytd: Decimal::ZERO,
            taxes_paid_ytd: Decimal::ZERO,
            bankrupt: false,
            ledger: Vec::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn credit_score(&self) -> Decimal {
        self.credit_score
    }

    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub fn assets(&self) -> &BTreeMap<String, Asset> {
        &self.assets
    }

    pub fn debt(&self, id: &str) -> Option<&Debt> {
        self.debts.get(id)
    }

    pub fn debts(&self) -> &BTreeMap<String, Debt> {
        &self.debts
    }

    pub fn income_ytd(&self) -> Decimal {
        self.income_ytd
    }

    pub fn expenses_ytd(&self) -> Decimal {
        self.expenses_ytd
    }

    pub fn taxes_paid_ytd(&self) -> Decimal {
        self.taxes_paid_ytd
    }

    pub fn is_bankrupt(&self) -> bool {
        self.bankrupt
    }

    /// The append-only transaction ledger
    pub fn ledger(&self) -> &[LedgerEntry] {
        &self.ledger
    }

    // ========================================================================
    // Derived figures
    // ========================================================================

    /// Total value across all assets
    pub fn total_assets(&self) -> Decimal {
        self.assets.values().map(|a| a.value).sum()
    }

    /// Total remaining debt principal
    pub fn total_debt(&self) -> Decimal {
        self.debts.values().map(|d| d.principal).sum()
    }

    /// Net worth: balance + assets − debts
    pub fn net_worth(&self) -> Decimal {
        self.balance + self.total_assets() - self.total_debt()
    }

    /// Value of liquid assets only
    pub fn liquid_assets(&self) -> Decimal {
        self.assets
            .values()
            .filter(|a| a.is_liquid)
            .map(|a| a.value)
            .sum()
    }

    // ========================================================================
    // Construction-time seeding
    // ========================================================================

    /// Add an asset position
    pub fn add_asset(&mut self, id: impl Into<String>, asset: Asset) {
        self.assets.insert(id.into(), asset);
    }

    /// Add a debt position
    pub fn add_debt(&mut self, id: impl Into<String>, debt: Debt) {
        self.debts.insert(id.into(), debt);
    }

    /// Append a ledger entry (engine-internal)
    pub(crate) fn record(&mut self, entry: LedgerEntry) {
        self.ledger.push(entry);
    }
}
