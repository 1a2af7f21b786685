//! Input types for the transaction orchestrator use-cases.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fintra_shared::types::{CurrencyCode, CustomerId, TenantId, UserId};

use super::transaction::TransactionType;

/// Input for creating a deposit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositInput {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Customer receiving the deposit.
    pub customer_id: CustomerId,
    /// Deposit currency.
    pub currency: CurrencyCode,
    /// Amount; must be strictly positive.
    pub amount: Decimal,
    /// Free-form description.
    pub description: String,
    /// Caller-provided idempotency key.
    pub reference: Option<String>,
    /// External system reference.
    pub external_reference: Option<String>,
    /// Opaque metadata map.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// User creating the transaction.
    pub created_by: UserId,
}

/// Input for creating a withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalInput {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Customer the funds leave.
    pub customer_id: CustomerId,
    /// Withdrawal currency.
    pub currency: CurrencyCode,
    /// Amount; must be strictly positive and covered by available balance.
    pub amount: Decimal,
    /// Free-form description.
    pub description: String,
    /// Caller-provided idempotency key.
    pub reference: Option<String>,
    /// External system reference.
    pub external_reference: Option<String>,
    /// Opaque metadata map.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// User creating the transaction.
    pub created_by: UserId,
}

/// Input for creating a currency exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeInput {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Customer performing the exchange.
    pub customer_id: CustomerId,
    /// `CurrencyBuy` or `CurrencySell`.
    pub transaction_type: TransactionType,
    /// Currency the customer pays with.
    pub from_currency: CurrencyCode,
    /// Currency the customer receives.
    pub to_currency: CurrencyCode,
    /// Amount leaving the source account.
    pub source_amount: Decimal,
    /// Amount arriving on the destination account.
    pub destination_amount: Decimal,
    /// Rate the caller transacted at; informational, must be positive.
    pub exchange_rate: Decimal,
    /// Fee charged; zero when absent.
    #[serde(default)]
    pub fee_amount: Decimal,
    /// Currency the fee is charged in; must match the source or the
    /// destination currency.
    pub fee_currency: Option<CurrencyCode>,
    /// Free-form description.
    pub description: String,
    /// Caller-provided idempotency key.
    pub reference: Option<String>,
    /// External system reference.
    pub external_reference: Option<String>,
    /// Opaque metadata map.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// User creating the transaction.
    pub created_by: UserId,
}

impl ExchangeInput {
    /// The fee charged against the source currency, zero otherwise.
    #[must_use]
    pub fn source_side_fee(&self) -> Decimal {
        match &self.fee_currency {
            Some(fee_currency) if *fee_currency == self.from_currency => self.fee_amount,
            _ => Decimal::ZERO,
        }
    }

    /// The fee charged against the destination currency, zero otherwise.
    #[must_use]
    pub fn destination_side_fee(&self) -> Decimal {
        match &self.fee_currency {
            Some(fee_currency) if *fee_currency == self.to_currency => self.fee_amount,
            _ => Decimal::ZERO,
        }
    }

    /// Total the customer must have available in the source currency.
    #[must_use]
    pub fn required_source_funds(&self) -> Decimal {
        self.source_amount + self.source_side_fee()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn exchange(fee: Decimal, fee_currency: &str) -> ExchangeInput {
        ExchangeInput {
            tenant_id: TenantId::new(),
            customer_id: CustomerId::new(),
            transaction_type: TransactionType::CurrencySell,
            from_currency: CurrencyCode::parse("USD").unwrap(),
            to_currency: CurrencyCode::parse("EUR").unwrap(),
            source_amount: dec!(500),
            destination_amount: dec!(425),
            exchange_rate: dec!(0.85),
            fee_amount: fee,
            fee_currency: Some(CurrencyCode::parse(fee_currency).unwrap()),
            description: "test".to_string(),
            reference: None,
            external_reference: None,
            metadata: serde_json::Value::Null,
            created_by: UserId::new(),
        }
    }

    #[test]
    fn test_source_side_fee() {
        let input = exchange(dec!(5), "USD");
        assert_eq!(input.source_side_fee(), dec!(5));
        assert_eq!(input.destination_side_fee(), dec!(0));
        assert_eq!(input.required_source_funds(), dec!(505));
    }

    #[test]
    fn test_destination_side_fee() {
        let input = exchange(dec!(2), "EUR");
        assert_eq!(input.source_side_fee(), dec!(0));
        assert_eq!(input.destination_side_fee(), dec!(2));
        assert_eq!(input.required_source_funds(), dec!(500));
    }
}
