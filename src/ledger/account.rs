//! In-memory account collection owned by the ledger

use bigdecimal::BigDecimal;
use std::collections::HashSet;

use crate::types::*;

/// Ordered account collection with unique account numbers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountBook {
    accounts: Vec<Account>,
}

impl AccountBook {
    /// Build a book from loaded records.
    ///
    /// Store order is preserved. A repeated account number keeps its first
    /// occurrence; later duplicates are dropped with a warning.
    pub fn from_loaded(loaded: Vec<Account>) -> Self {
        let mut seen = HashSet::new();
        let mut accounts = Vec::with_capacity(loaded.len());

        for account in loaded {
            if seen.insert(account.account_number.clone()) {
                accounts.push(account);
            } else {
                tracing::warn!(
                    account = %account.account_number,
                    "duplicate account number in loaded data, keeping first record"
                );
            }
        }

        Self { accounts }
    }

    /// Index of an account, if present
    pub fn position(&self, account_number: &str) -> Option<usize> {
        self.accounts
            .iter()
            .position(|account| account.account_number == account_number)
    }

    pub fn get(&self, account_number: &str) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|account| account.account_number == account_number)
    }

    pub(crate) fn at(&self, index: usize) -> &Account {
        &self.accounts[index]
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> &mut Account {
        &mut self.accounts[index]
    }

    pub fn as_slice(&self) -> &[Account] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Sum of all balances
    pub fn total_balance(&self) -> BigDecimal {
        self.accounts.iter().map(|account| &account.balance).sum()
    }
}
