//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::traits::*;
use crate::types::*;

/// In-memory account store for testing and development
///
/// Clones share state, so a test can keep one handle while the ledger owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountStore {
    accounts: Arc<RwLock<Vec<Account>>>,
    fail_saves: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl MemoryAccountStore {
    /// Create an empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory store pre-populated with `accounts`
    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: Arc::new(RwLock::new(accounts)),
            ..Self::default()
        }
    }

    /// Make every subsequent save fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of the last saved collection
    pub async fn snapshot(&self) -> Vec<Account> {
        self.accounts.read().await.clone()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn try_load(&self) -> LedgerResult<Vec<Account>> {
        Ok(self.accounts.read().await.clone())
    }

    async fn save(&self, accounts: &[Account]) -> LedgerResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(LedgerError::Storage(
                "memory store configured to reject writes".to_string(),
            ));
        }

        *self.accounts.write().await = accounts.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
