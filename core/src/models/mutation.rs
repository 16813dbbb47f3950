//! State mutations
//!
//! Nodes never reach into shared mutable state. Each evaluation returns an
//! ordered list of mutations which the engine applies in emission order;
//! when two mutations in the same day target the same field, the later
//! write wins. Balance is excluded on purpose: it moves only through node
//! deltas, which keeps the daily conservation invariant checkable.

use crate::models::node::NodeError;
use crate::models::state::{clamp_credit_score, Asset, WalletState};
use rust_decimal::Decimal;

/// A single field-level write against the wallet state
#[derive(Debug, Clone, PartialEq)]
pub enum StateMutation {
    /// Replace the credit score (clamped to [300, 850] on application)
    SetCreditScore(Decimal),

    /// Replace an existing asset's value
    SetAssetValue { asset_id: String, value: Decimal },

    /// Insert (or replace) an asset position
    AddAsset { asset_id: String, asset: Asset },

    /// Remove an asset position entirely
    RemoveAsset { asset_id: String },

    /// Replace an existing debt's remaining principal
    SetDebtPrincipal { debt_id: String, principal: Decimal },

    /// Replace an existing debt's missed-payment count
    SetMissedPayments { debt_id: String, count: u32 },

    /// Replace the year-to-date income accumulator
    SetIncomeYtd(Decimal),

    /// Replace the year-to-date expense accumulator
    SetExpensesYtd(Decimal),

    /// Replace the year-to-date taxes-paid accumulator
    SetTaxesPaidYtd(Decimal),

    /// Set the terminal bankruptcy flag
    MarkBankrupt,
}

impl StateMutation {
    /// Apply this mutation to the state
    ///
    /// References to missing asset or debt identifiers indicate a node bug
    /// and surface as a [`NodeError`], which the engine wraps with the node
    /// identifier and date.
    pub fn apply(&self, state: &mut WalletState) -> Result<(), NodeError> {
        match self {
            StateMutation::SetCreditScore(score) => {
                state.credit_score = clamp_credit_score(*score);
            }
            StateMutation::SetAssetValue { asset_id, value } => {
                let asset = state
                    .assets
                    .get_mut(asset_id)
                    .ok_or_else(|| NodeError::UnknownAsset(asset_id.clone()))?;
                asset.value = *value;
            }
            StateMutation::AddAsset { asset_id, asset } => {
                state.assets.insert(asset_id.clone(), asset.clone());
            }
            StateMutation::RemoveAsset { asset_id } => {
                state
                    .assets
                    .remove(asset_id)
                    .ok_or_else(|| NodeError::UnknownAsset(asset_id.clone()))?;
            }
            StateMutation::SetDebtPrincipal { debt_id, principal } => {
                let debt = state
                    .debts
                    .get_mut(debt_id)
                    .ok_or_else(|| NodeError::UnknownDebt(debt_id.clone()))?;
                debt.principal = *principal;
            }
            StateMutation::SetMissedPayments { debt_id, count } => {
                let debt = state
                    .debts
                    .get_mut(debt_id)
                    .ok_or_else(|| NodeError::UnknownDebt(debt_id.clone()))?;
                debt.missed_payments = *count;
            }
            StateMutation::SetIncomeYtd(value) => {
                state.income_ytd = *value;
            }
            StateMutation::SetExpensesYtd(value) => {
                state.expenses_ytd = *value;
            }
            StateMutation::SetTaxesPaidYtd(value) => {
                state.taxes_paid_ytd = *value;
            }
            StateMutation::MarkBankrupt => {
                state.bankrupt = true;
            }
        }
        Ok(())
    }
}
