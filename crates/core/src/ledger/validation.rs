//! Input validation for orchestrator use-cases.
//!
//! Validation failures are fatal: no retry, no state change.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{DepositInput, ExchangeInput, WithdrawalInput};
use super::transaction::TransactionType;

/// Validates a deposit input.
///
/// # Errors
///
/// Returns `LedgerError::InvalidInput` when the amount is not strictly
/// positive or the description is empty.
pub fn validate_deposit(input: &DepositInput) -> Result<(), LedgerError> {
    validate_amount(input.amount, "amount")?;
    validate_description(&input.description)
}

/// Validates a withdrawal input.
///
/// # Errors
///
/// Returns `LedgerError::InvalidInput` on a non-positive amount or empty
/// description. The available-balance check happens later, under the
/// row lock.
pub fn validate_withdrawal(input: &WithdrawalInput) -> Result<(), LedgerError> {
    validate_amount(input.amount, "amount")?;
    validate_description(&input.description)
}

/// Validates an exchange input.
///
/// # Errors
///
/// Returns `LedgerError::CurrencyPairInvalid` when source and destination
/// currencies match, and `LedgerError::InvalidInput` for non-positive
/// amounts or rate, a negative fee, a fee without a fee currency, a fee
/// currency outside the pair, or a destination-side fee that consumes
/// the whole destination amount.
pub fn validate_exchange(input: &ExchangeInput) -> Result<(), LedgerError> {
    if !input.transaction_type.is_exchange() {
        return Err(LedgerError::InvalidInput(format!(
            "transaction type {:?} is not an exchange",
            input.transaction_type
        )));
    }
    if input.from_currency == input.to_currency {
        return Err(LedgerError::CurrencyPairInvalid {
            from: input.from_currency.to_string(),
            to: input.to_currency.to_string(),
        });
    }
    validate_amount(input.source_amount, "source_amount")?;
    validate_amount(input.destination_amount, "destination_amount")?;
    validate_amount(input.exchange_rate, "exchange_rate")?;

    if input.fee_amount < Decimal::ZERO {
        return Err(LedgerError::InvalidInput(
            "fee_amount must not be negative".to_string(),
        ));
    }
    if input.fee_amount > Decimal::ZERO {
        let Some(fee_currency) = &input.fee_currency else {
            return Err(LedgerError::InvalidInput(
                "fee_currency is required when fee_amount is set".to_string(),
            ));
        };
        if *fee_currency != input.from_currency && *fee_currency != input.to_currency {
            return Err(LedgerError::InvalidInput(format!(
                "fee_currency {fee_currency} is outside the exchanged pair"
            )));
        }
        if input.destination_side_fee() >= input.destination_amount {
            return Err(LedgerError::InvalidInput(
                "destination-side fee must be smaller than destination_amount".to_string(),
            ));
        }
    }

    validate_description(&input.description)
}

fn validate_amount(amount: Decimal, field: &str) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "{field} must be strictly positive"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), LedgerError> {
    if description.trim().is_empty() {
        return Err(LedgerError::InvalidInput(
            "description must not be empty".to_string(),
        ));
    }
    Ok(())
}
