//! Domain types: wallet state, financial nodes, state mutations

pub mod mutation;
pub mod node;
pub mod state;

pub use mutation::StateMutation;
pub use node::{ExpenseTrigger, Node, NodeError, NodeKind, NodeOutput, TaxBracket};
pub use state::{Asset, AssetKind, Debt, LedgerEntry, WalletState};
