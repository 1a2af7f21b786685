//! Currency code type.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts throughout the codebase are `rust_decimal::Decimal`.

use serde::{Deserialize, Serialize};

/// An ISO-4217-style 3-letter currency code, stored uppercase.
///
/// Lookups are case-insensitive: parsing normalizes to uppercase, so
/// `"usd"` and `"USD"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parses a currency code, normalizing to uppercase.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is not exactly 3 ASCII letters.
    pub fn parse(code: &str) -> Result<Self, CurrencyCodeError> {
        let trimmed = code.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyCodeError(code.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Error for an invalid currency code.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid currency code: {0}")]
pub struct CurrencyCodeError(pub String);

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_currency_normalizes_case() {
        let lower = CurrencyCode::parse("usd").unwrap();
        let upper = CurrencyCode::parse("USD").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.as_str(), "USD");
    }

    #[test]
    fn test_currency_rejects_invalid() {
        assert!(CurrencyCode::parse("").is_err());
        assert!(CurrencyCode::parse("US").is_err());
        assert!(CurrencyCode::parse("USDX").is_err());
        assert!(CurrencyCode::parse("U5D").is_err());
    }

    #[test]
    fn test_currency_trims_whitespace() {
        assert_eq!(CurrencyCode::parse(" eur ").unwrap().as_str(), "EUR");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!(CurrencyCode::from_str("jpy").unwrap().as_str(), "JPY");
        assert!(CurrencyCode::from_str("yen!").is_err());
    }

    #[test]
    fn test_currency_round_trips_through_serde() {
        let code: CurrencyCode = serde_json::from_str("\"gbp\"").unwrap();
        assert_eq!(code.as_str(), "GBP");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"GBP\"");
        assert!(serde_json::from_str::<CurrencyCode>("\"pounds\"").is_err());
    }
}
