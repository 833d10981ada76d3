//! Traits for storage, notification and remote-contract abstraction

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::sync::Arc;

use crate::types::*;

/// Durable backing store for the full account collection
///
/// The store holds a derived snapshot only; the ledger's in-memory collection
/// stays authoritative.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Read the whole collection, surfacing any I/O or parse failure
    async fn try_load(&self) -> LedgerResult<Vec<Account>>;

    /// Write the whole collection in one replace-style write
    async fn save(&self, accounts: &[Account]) -> LedgerResult<()>;

    /// Read the whole collection, falling back to an empty set on failure
    async fn load(&self) -> Vec<Account> {
        match self.try_load().await {
            Ok(accounts) => accounts,
            Err(err) => {
                tracing::error!(error = %err, "failed to load accounts, starting empty");
                Vec::new()
            }
        }
    }
}

/// Errors reported by a subscriber endpoint during delivery
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotifyError {
    #[error("subscriber unreachable")]
    Unreachable,
    #[error("subscriber rejected notification: {0}")]
    Rejected(String),
    #[error("subscriber did not acknowledge in time")]
    TimedOut,
}

/// Remote callback endpoint owned by a logged-in client
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Push one transaction message; must return promptly
    async fn notify_transaction(&self, message: &str) -> Result<(), NotifyError>;
}

/// Shared handle to a registered subscriber
pub type SubscriberHandle = Arc<dyn Subscriber>;

/// Sink for human-readable operator console lines
pub trait OperatorLog: Send + Sync {
    fn log(&self, line: &str);
}

/// Operator log that forwards every line to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOperatorLog;

impl OperatorLog for TracingOperatorLog {
    fn log(&self, line: &str) {
        tracing::info!(target: "operator", "{line}");
    }
}

/// The operations exposed to remote callers
///
/// Outcomes collapse to the boolean / optional shape the wire contract uses.
#[async_trait]
pub trait BankService: Send + Sync {
    async fn login(&self, account_number: &str) -> Option<Account>;

    async fn deposit(&self, account_number: &str, amount: BigDecimal) -> bool;

    async fn withdraw(&self, account_number: &str, amount: BigDecimal) -> bool;

    async fn transfer(&self, from_account: &str, to_account: &str, amount: BigDecimal) -> bool;

    async fn register_callback(&self, account_number: &str, handle: SubscriberHandle);

    async fn unregister_callback(&self, account_number: &str);
}
