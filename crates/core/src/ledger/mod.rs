//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Accounts, transaction headers, and ledger entries as plain records
//! - The transaction status state machine
//! - Input validation for deposits, withdrawals, and exchanges
//! - The posting planner that turns business events into balanced pairs
//! - Error types for ledger operations

pub mod account;
pub mod entry;
pub mod error;
pub mod posting;
pub mod transaction;
pub mod types;
pub mod validation;

pub use account::{Account, AccountType, SystemAccountKind};
pub use entry::{EntryType, LedgerEntry};
pub use error::LedgerError;
pub use posting::{PlannedEntry, PostingPlanner};
pub use transaction::{FinancialTransaction, TransactionStatus, TransactionType};
pub use types::{DepositInput, ExchangeInput, WithdrawalInput};
