//! Caller-side validation applied before invoking the service
//!
//! These checks model the client's pre-flight policy. The service itself does
//! not reject self-transfers; callers that want that rule apply
//! [`validate_not_self_transfer`].

use bigdecimal::BigDecimal;
use std::str::FromStr;

use crate::types::*;

/// Parse a user-entered amount
pub fn parse_amount(input: &str) -> LedgerResult<BigDecimal> {
    BigDecimal::from_str(input.trim())
        .map_err(|_| LedgerError::Validation(format!("'{}' is not a valid amount", input.trim())))
}

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(LedgerError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate against the caller's last known balance
pub fn validate_sufficient_balance(balance: &BigDecimal, amount: &BigDecimal) -> LedgerResult<()> {
    if amount > balance {
        return Err(LedgerError::Validation(format!(
            "Insufficient balance: {} requested, {} available",
            amount, balance
        )));
    }
    Ok(())
}

/// Validate that a recipient account number was given
pub fn validate_recipient(recipient: &str) -> LedgerResult<()> {
    if recipient.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Recipient account number cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Reject transfers from an account to itself
pub fn validate_not_self_transfer(from_account: &str, to_account: &str) -> LedgerResult<()> {
    if from_account == to_account {
        return Err(LedgerError::Validation(
            "Cannot transfer to the same account".to_string(),
        ));
    }
    Ok(())
}

/// Validate that both login fields are filled in
pub fn validate_credentials(account_number: &str, pin: &str) -> LedgerResult<()> {
    if account_number.trim().is_empty() || pin.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account number and PIN are required".to_string(),
        ));
    }
    Ok(())
}

/// Full client-side check for a transfer request
pub fn validate_transfer_request(
    from_account: &str,
    to_account: &str,
    amount: &BigDecimal,
    known_balance: &BigDecimal,
) -> LedgerResult<()> {
    validate_recipient(to_account)?;
    validate_positive_amount(amount)?;
    validate_sufficient_balance(known_balance, amount)?;
    validate_not_self_transfer(from_account, to_account)
}
