//! `SeaORM` entity definitions for the ledger schema.

pub mod accounts;
pub mod financial_audits;
pub mod financial_transactions;
pub mod ledger_entries;
pub mod sea_orm_active_enums;

use fintra_core::ledger::error::LedgerError;
use fintra_shared::types::CurrencyCode;

/// Parses a stored currency code, mapping corruption to an internal
/// error rather than a caller-visible validation error.
pub(crate) fn parse_currency(raw: &str) -> Result<CurrencyCode, LedgerError> {
    CurrencyCode::parse(raw)
        .map_err(|e| LedgerError::Internal(format!("stored currency invalid: {e}")))
}
