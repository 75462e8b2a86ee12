//! Inbound payment validation.
//!
//! Fail-fast: a validation failure produces a structured error and no
//! state mutation of any kind.

use storypool_types::{EngineConfig, Reference, WalletAddress, WalletError};
use thiserror::Error;

/// Structured, caller-visible validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing payment reference")]
    MissingReference,
    #[error("amount {0:?} is not a positive number")]
    UnparsableAmount(String),
    #[error("amount {amount} outside valid range {min}..={max}")]
    AmountOutOfRange { amount: f64, min: f64, max: f64 },
    #[error("invalid sender wallet: {0}")]
    BadWallet(#[from] WalletError),
}

/// Validate an inbound payment confirmation.
///
/// Returns the parsed amount and validated wallet on success.
pub fn validate_payment(
    config: &EngineConfig,
    reference: &Reference,
    amount_text: &str,
    sender_wallet: &str,
) -> Result<(f64, WalletAddress), ValidationError> {
    if reference.is_empty() {
        return Err(ValidationError::MissingReference);
    }

    let amount: f64 = amount_text
        .trim()
        .parse()
        .map_err(|_| ValidationError::UnparsableAmount(amount_text.to_string()))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationError::UnparsableAmount(amount_text.to_string()));
    }
    if amount < config.min_amount || amount > config.max_amount {
        return Err(ValidationError::AmountOutOfRange {
            amount,
            min: config.min_amount,
            max: config.max_amount,
        });
    }

    let wallet = WalletAddress::parse(sender_wallet)?;
    Ok((amount, wallet))
}
