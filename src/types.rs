//! Core types and data structures for the ledger service

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Customer account record held by the ledger
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique, immutable account identifier
    pub account_number: String,
    /// Display name of the account holder
    pub account_name: String,
    /// Current balance; ledger operations never drive it below zero
    pub balance: BigDecimal,
    /// Opaque credential, compared by exact equality
    pub pin: String,
}

impl Account {
    /// Create a new account record
    pub fn new(
        account_number: impl Into<String>,
        account_name: impl Into<String>,
        balance: BigDecimal,
        pin: impl Into<String>,
    ) -> Self {
        Self {
            account_number: account_number.into(),
            account_name: account_name.into(),
            balance,
            pin: pin.into(),
        }
    }

    /// Increase the balance by `amount`
    pub fn credit(&mut self, amount: &BigDecimal) {
        self.balance += amount;
    }

    /// Decrease the balance by `amount`.
    ///
    /// Callers check [`Account::can_cover`] first; this method does not guard
    /// against overdraft.
    pub fn debit(&mut self, amount: &BigDecimal) {
        self.balance -= amount;
    }

    /// Whether the current balance covers a debit of `amount`
    pub fn can_cover(&self, amount: &BigDecimal) -> bool {
        &self.balance >= amount
    }

    /// Exact PIN comparison
    pub fn verify_pin(&self, pin: &str) -> bool {
        self.pin == pin
    }

    /// Credential-free view of this account
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            account_number: self.account_number.clone(),
            account_name: self.account_name.clone(),
            balance: self.balance.clone(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("account_number", &self.account_number)
            .field("account_name", &self.account_name)
            .field("balance", &self.balance)
            .field("pin", &"****")
            .finish()
    }
}

/// Account information safe to hand to an authenticated caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_number: String,
    pub account_name: String,
    pub balance: BigDecimal,
}

/// Result of a mutating ledger operation.
///
/// Unknown accounts and insufficient funds are ordinary outcomes rather than
/// errors; callers inspect the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome {
    /// Mutation applied and handed to the store
    Completed,
    /// The named account does not exist
    AccountNotFound(String),
    /// The source account cannot cover the requested amount
    InsufficientFunds {
        account: String,
        balance: BigDecimal,
        requested: BigDecimal,
    },
    /// Amount was zero or negative
    InvalidAmount(BigDecimal),
    /// The store rejected the write and the mutation was rolled back
    PersistenceFailed(String),
}

impl TransactionOutcome {
    /// Whether the operation took effect
    pub fn is_success(&self) -> bool {
        matches!(self, TransactionOutcome::Completed)
    }
}

/// Result of a credential check performed by the service
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated(AccountSummary),
    InvalidCredential,
    AccountNotFound,
}

/// Errors that can occur in the ledger system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
