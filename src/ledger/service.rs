//! Ledger service: the authoritative account set and its mutating operations

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::{LedgerConfig, PersistenceFailurePolicy};
use crate::ledger::transaction::{format_amount, TransactionEvent};
use crate::ledger::{AccountBook, NotificationRegistry};
use crate::traits::*;
use crate::types::*;

/// Authoritative in-memory ledger.
///
/// Every read and mutation runs under one process-wide lock covering the whole
/// account set, and each successful mutation is saved to the store before the
/// lock is released. Notifications are dispatched before the lock is released,
/// so each subscriber sees events one at a time and in commit order.
pub struct LedgerService<S: AccountStore> {
    book: Mutex<AccountBook>,
    store: S,
    notifier: NotificationRegistry,
    operator_log: Arc<dyn OperatorLog>,
    persistence_failure: PersistenceFailurePolicy,
}

impl<S: AccountStore> LedgerService<S> {
    /// Load accounts from `store` with default configuration
    pub async fn open(store: S) -> Self {
        Self::open_with(store, &LedgerConfig::default(), Arc::new(TracingOperatorLog)).await
    }

    /// Load accounts from `store` using `config` and an operator log sink
    pub async fn open_with(
        store: S,
        config: &LedgerConfig,
        operator_log: Arc<dyn OperatorLog>,
    ) -> Self {
        let book = AccountBook::from_loaded(store.load().await);
        tracing::info!(accounts = book.len(), "ledger opened");

        Self {
            book: Mutex::new(book),
            store,
            notifier: NotificationRegistry::new(config.notify_timeout(), Arc::clone(&operator_log)),
            operator_log,
            persistence_failure: config.persistence_failure,
        }
    }

    pub fn notifier(&self) -> &NotificationRegistry {
        &self.notifier
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Look up an account record; no credential check
    pub async fn login(&self, account_number: &str) -> Option<Account> {
        let book = self.book.lock().await;
        match book.get(account_number) {
            Some(account) => {
                self.operator_log.log(&format!(
                    "Login: {} - {}",
                    account_number, account.account_name
                ));
                Some(account.clone())
            }
            None => {
                self.operator_log
                    .log(&format!("Login failed: {}", account_number));
                None
            }
        }
    }

    /// Look up an account and check its PIN inside the service
    pub async fn authenticate(&self, account_number: &str, pin: &str) -> LoginOutcome {
        let book = self.book.lock().await;
        match book.get(account_number) {
            Some(account) if account.verify_pin(pin) => {
                self.operator_log.log(&format!(
                    "Login: {} - {}",
                    account_number, account.account_name
                ));
                LoginOutcome::Authenticated(account.summary())
            }
            Some(_) => {
                self.operator_log
                    .log(&format!("Login rejected: {}", account_number));
                LoginOutcome::InvalidCredential
            }
            None => {
                self.operator_log
                    .log(&format!("Login failed: {}", account_number));
                LoginOutcome::AccountNotFound
            }
        }
    }

    /// Current balance of an account
    pub async fn balance(&self, account_number: &str) -> Option<BigDecimal> {
        self.book
            .lock()
            .await
            .get(account_number)
            .map(|account| account.balance.clone())
    }

    /// Ordered copy of every account
    pub async fn accounts(&self) -> Vec<Account> {
        self.book.lock().await.as_slice().to_vec()
    }

    /// Sum of all balances, read under the ledger lock
    pub async fn total_balance(&self) -> BigDecimal {
        self.book.lock().await.total_balance()
    }

    /// Credit `amount` to an account
    pub async fn deposit(&self, account_number: &str, amount: &BigDecimal) -> TransactionOutcome {
        if let Err(outcome) = check_amount(amount) {
            return outcome;
        }

        let mut book = self.book.lock().await;
        let Some(index) = book.position(account_number) else {
            tracing::debug!(account = %account_number, "deposit to unknown account");
            return TransactionOutcome::AccountNotFound(account_number.to_string());
        };

        let previous = book.at(index).balance.clone();
        book.at_mut(index).credit(amount);

        if let Err(outcome) = self.persist(&mut book, &[(index, previous)]).await {
            return outcome;
        }

        let event = TransactionEvent::deposit(account_number, amount);
        self.operator_log
            .log(&format!("{} - {}", account_number, event.message()));

        self.notifier.dispatch_event(&event).await;
        TransactionOutcome::Completed
    }

    /// Debit `amount` from an account if the balance covers it
    pub async fn withdraw(&self, account_number: &str, amount: &BigDecimal) -> TransactionOutcome {
        if let Err(outcome) = check_amount(amount) {
            return outcome;
        }

        let mut book = self.book.lock().await;
        let Some(index) = book.position(account_number) else {
            tracing::debug!(account = %account_number, "withdrawal from unknown account");
            return TransactionOutcome::AccountNotFound(account_number.to_string());
        };

        let account = book.at(index);
        if !account.can_cover(amount) {
            tracing::debug!(account = %account_number, balance = %account.balance, requested = %amount, "insufficient funds");
            return TransactionOutcome::InsufficientFunds {
                account: account_number.to_string(),
                balance: account.balance.clone(),
                requested: amount.clone(),
            };
        }

        let previous = account.balance.clone();
        book.at_mut(index).debit(amount);

        if let Err(outcome) = self.persist(&mut book, &[(index, previous)]).await {
            return outcome;
        }

        let event = TransactionEvent::withdrawal(account_number, amount);
        self.operator_log
            .log(&format!("{} - {}", account_number, event.message()));

        self.notifier.dispatch_event(&event).await;
        TransactionOutcome::Completed
    }

    /// Move `amount` between two accounts as one unit.
    ///
    /// Both balances change under the same lock hold and are saved together.
    /// Transferring to the same account is allowed here and leaves the balance
    /// unchanged; rejecting it is caller policy.
    pub async fn transfer(
        &self,
        from_account: &str,
        to_account: &str,
        amount: &BigDecimal,
    ) -> TransactionOutcome {
        if let Err(outcome) = check_amount(amount) {
            return outcome;
        }

        let mut book = self.book.lock().await;
        let Some(from_index) = book.position(from_account) else {
            tracing::debug!(account = %from_account, "transfer from unknown account");
            return TransactionOutcome::AccountNotFound(from_account.to_string());
        };
        let Some(to_index) = book.position(to_account) else {
            tracing::debug!(account = %to_account, "transfer to unknown account");
            return TransactionOutcome::AccountNotFound(to_account.to_string());
        };

        let source = book.at(from_index);
        if !source.can_cover(amount) {
            tracing::debug!(account = %from_account, balance = %source.balance, requested = %amount, "insufficient funds for transfer");
            return TransactionOutcome::InsufficientFunds {
                account: from_account.to_string(),
                balance: source.balance.clone(),
                requested: amount.clone(),
            };
        }

        let rollback = [
            (from_index, source.balance.clone()),
            (to_index, book.at(to_index).balance.clone()),
        ];
        book.at_mut(from_index).debit(amount);
        book.at_mut(to_index).credit(amount);

        if let Err(outcome) = self.persist(&mut book, &rollback).await {
            return outcome;
        }

        self.operator_log.log(&format!(
            "{} -> {}: {}",
            from_account,
            to_account,
            format_amount(amount)
        ));

        let (sender_event, receiver_event) =
            TransactionEvent::transfer_pair(from_account, to_account, amount);
        self.notifier.dispatch_event(&sender_event).await;
        self.notifier.dispatch_event(&receiver_event).await;
        TransactionOutcome::Completed
    }

    /// Attach a subscriber to an account, replacing any existing one
    pub async fn register_callback(&self, account_number: &str, handle: SubscriberHandle) {
        self.notifier.register(account_number, handle).await;
    }

    /// Detach the subscriber of an account, if any
    pub async fn unregister_callback(&self, account_number: &str) {
        self.notifier.unregister(account_number).await;
    }

    /// Save the full book while the ledger lock is held.
    ///
    /// On failure the policy decides: keep the mutation, or restore the
    /// `rollback` balances (applied last-to-first) and report the failure.
    async fn persist(
        &self,
        book: &mut MutexGuard<'_, AccountBook>,
        rollback: &[(usize, BigDecimal)],
    ) -> Result<(), TransactionOutcome> {
        let Err(err) = self.store.save(book.as_slice()).await else {
            return Ok(());
        };

        tracing::error!(error = %err, policy = ?self.persistence_failure, "failed to persist accounts");
        self.operator_log
            .log(&format!("Persistence failed: {}", err));

        match self.persistence_failure {
            PersistenceFailurePolicy::Continue => Ok(()),
            PersistenceFailurePolicy::Reject => {
                for (index, balance) in rollback.iter().rev() {
                    book.at_mut(*index).balance = balance.clone();
                }
                Err(TransactionOutcome::PersistenceFailed(err.to_string()))
            }
        }
    }
}

fn check_amount(amount: &BigDecimal) -> Result<(), TransactionOutcome> {
    if *amount <= BigDecimal::from(0) {
        tracing::debug!(amount = %amount, "rejecting non-positive amount");
        return Err(TransactionOutcome::InvalidAmount(amount.clone()));
    }
    Ok(())
}

#[async_trait]
impl<S: AccountStore> BankService for LedgerService<S> {
    async fn login(&self, account_number: &str) -> Option<Account> {
        LedgerService::login(self, account_number).await
    }

    async fn deposit(&self, account_number: &str, amount: BigDecimal) -> bool {
        LedgerService::deposit(self, account_number, &amount)
            .await
            .is_success()
    }

    async fn withdraw(&self, account_number: &str, amount: BigDecimal) -> bool {
        LedgerService::withdraw(self, account_number, &amount)
            .await
            .is_success()
    }

    async fn transfer(&self, from_account: &str, to_account: &str, amount: BigDecimal) -> bool {
        LedgerService::transfer(self, from_account, to_account, &amount)
            .await
            .is_success()
    }

    async fn register_callback(&self, account_number: &str, handle: SubscriberHandle) {
        LedgerService::register_callback(self, account_number, handle).await
    }

    async fn unregister_callback(&self, account_number: &str) {
        LedgerService::unregister_callback(self, account_number).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::bootstrap_accounts;
    use async_trait::async_trait;
    use crate::utils::{FailingSubscriber, MemoryAccountStore, MemoryOperatorLog, RecordingSubscriber};

    async fn ledger_with(
        policy: PersistenceFailurePolicy,
    ) -> (LedgerService<MemoryAccountStore>, MemoryAccountStore, MemoryOperatorLog) {
        let store = MemoryAccountStore::with_accounts(bootstrap_accounts());
        let log = MemoryOperatorLog::new();
        let config = LedgerConfig {
            persistence_failure: policy,
            notify_timeout_ms: 100,
            ..LedgerConfig::default()
        };
        let ledger = LedgerService::open_with(store.clone(), &config, Arc::new(log.clone())).await;
        (ledger, store, log)
    }

    async fn ledger() -> (LedgerService<MemoryAccountStore>, MemoryAccountStore, MemoryOperatorLog) {
        ledger_with(PersistenceFailurePolicy::Continue).await
    }

    fn amount(value: i64) -> BigDecimal {
        BigDecimal::from(value)
    }

    #[tokio::test]
    async fn test_deposit_withdraw_transfer_scenario() {
        let (ledger, store, _log) = ledger().await;
        let sender = RecordingSubscriber::new();
        let receiver = RecordingSubscriber::new();
        ledger
            .register_callback("01234", Arc::new(sender.clone()))
            .await;
        ledger
            .register_callback("12345", Arc::new(receiver.clone()))
            .await;

        assert!(ledger.deposit("01234", &amount(500)).await.is_success());
        assert_eq!(ledger.balance("01234").await, Some(amount(5500)));

        assert!(ledger
            .transfer("01234", "12345", &amount(2000))
            .await
            .is_success());
        assert_eq!(ledger.balance("01234").await, Some(amount(3500)));
        assert_eq!(ledger.balance("12345").await, Some(amount(12000)));

        let outcome = ledger.withdraw("01234", &amount(99999)).await;
        assert_eq!(
            outcome,
            TransactionOutcome::InsufficientFunds {
                account: "01234".to_string(),
                balance: amount(3500),
                requested: amount(99999),
            }
        );
        assert_eq!(ledger.balance("01234").await, Some(amount(3500)));

        assert_eq!(
            sender.messages(),
            vec![
                "Deposit: +500".to_string(),
                "Transfer to 12345: -2000".to_string()
            ]
        );
        assert_eq!(
            receiver.messages(),
            vec!["Transfer from 01234: +2000".to_string()]
        );

        // One save per successful mutation, none for the rejected withdrawal.
        assert_eq!(store.save_count(), 2);
        let persisted = store.snapshot().await;
        assert_eq!(persisted[0].balance, amount(3500));
        assert_eq!(persisted[1].balance, amount(12000));
    }

    #[tokio::test]
    async fn test_unknown_accounts_are_reported() {
        let (ledger, store, _log) = ledger().await;

        assert_eq!(
            ledger.deposit("00000", &amount(1)).await,
            TransactionOutcome::AccountNotFound("00000".to_string())
        );
        assert_eq!(
            ledger.withdraw("00000", &amount(1)).await,
            TransactionOutcome::AccountNotFound("00000".to_string())
        );
        assert_eq!(
            ledger.transfer("01234", "00000", &amount(1)).await,
            TransactionOutcome::AccountNotFound("00000".to_string())
        );
        assert_eq!(
            ledger.transfer("00000", "01234", &amount(1)).await,
            TransactionOutcome::AccountNotFound("00000".to_string())
        );

        assert_eq!(ledger.balance("01234").await, Some(amount(5000)));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_non_positive_amounts_are_rejected() {
        let (ledger, store, _log) = ledger().await;

        assert_eq!(
            ledger.deposit("01234", &amount(-5000)).await,
            TransactionOutcome::InvalidAmount(amount(-5000))
        );
        assert!(!ledger.withdraw("01234", &amount(0)).await.is_success());
        assert!(!ledger
            .transfer("12345", "01234", &amount(-1))
            .await
            .is_success());

        assert_eq!(ledger.total_balance().await, amount(50000));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_withdraw_entire_balance() {
        let (ledger, _store, _log) = ledger().await;

        assert!(ledger.withdraw("01234", &amount(5000)).await.is_success());
        assert_eq!(ledger.balance("01234").await, Some(amount(0)));
        assert!(!ledger.withdraw("01234", &amount(1)).await.is_success());
    }

    #[tokio::test]
    async fn test_self_transfer_is_balance_neutral() {
        let (ledger, store, _log) = ledger().await;
        let subscriber = RecordingSubscriber::new();
        ledger
            .register_callback("01234", Arc::new(subscriber.clone()))
            .await;

        assert!(ledger
            .transfer("01234", "01234", &amount(1000))
            .await
            .is_success());
        assert_eq!(ledger.balance("01234").await, Some(amount(5000)));
        assert_eq!(store.save_count(), 1);
        assert_eq!(subscriber.messages().len(), 2);

        assert!(!ledger
            .transfer("01234", "01234", &amount(5001))
            .await
            .is_success());
    }

    #[tokio::test]
    async fn test_login_returns_record_and_logs() {
        let (ledger, store, log) = ledger().await;

        let account = ledger.login("98765").await.unwrap();
        assert_eq!(account.account_name, "Lê Văn C");
        assert_eq!(account.pin, "9999");
        assert!(ledger.login("nope").await.is_none());

        assert_eq!(
            log.lines(),
            vec![
                "Login: 98765 - Lê Văn C".to_string(),
                "Login failed: nope".to_string()
            ]
        );
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_authenticate_checks_pin_in_service() {
        let (ledger, _store, _log) = ledger().await;

        match ledger.authenticate("12345", "5678").await {
            LoginOutcome::Authenticated(summary) => {
                assert_eq!(summary.account_name, "Trần Thị B");
                assert_eq!(summary.balance, amount(10000));
            }
            other => panic!("expected authentication, got {:?}", other),
        }
        assert_eq!(
            ledger.authenticate("12345", "0000").await,
            LoginOutcome::InvalidCredential
        );
        assert_eq!(
            ledger.authenticate("55555", "5678").await,
            LoginOutcome::AccountNotFound
        );
    }

    #[tokio::test]
    async fn test_failed_subscriber_does_not_fail_operation() {
        let (ledger, _store, log) = ledger().await;
        let failing = FailingSubscriber::new(NotifyError::Unreachable);
        ledger
            .register_callback("11111", Arc::new(failing.clone()))
            .await;

        assert!(ledger.withdraw("11111", &amount(100)).await.is_success());
        assert_eq!(ledger.balance("11111").await, Some(amount(19900)));
        assert!(!ledger.notifier().is_registered("11111").await);
        assert!(log
            .lines()
            .contains(&"Callback failed for: 11111".to_string()));

        assert!(ledger.deposit("11111", &amount(100)).await.is_success());
        assert_eq!(failing.attempts(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_continue_keeps_mutation() {
        let (ledger, store, log) = ledger().await;
        store.set_fail_saves(true);

        assert!(ledger.deposit("01234", &amount(500)).await.is_success());
        assert_eq!(ledger.balance("01234").await, Some(amount(5500)));
        assert_eq!(store.snapshot().await[0].balance, amount(5000));
        assert!(log
            .lines()
            .iter()
            .any(|line| line.starts_with("Persistence failed")));
    }

    #[tokio::test]
    async fn test_persistence_failure_reject_rolls_back() {
        let (ledger, store, _log) = ledger_with(PersistenceFailurePolicy::Reject).await;
        let subscriber = RecordingSubscriber::new();
        ledger
            .register_callback("12345", Arc::new(subscriber.clone()))
            .await;
        store.set_fail_saves(true);

        assert!(matches!(
            ledger.transfer("01234", "12345", &amount(2000)).await,
            TransactionOutcome::PersistenceFailed(_)
        ));
        assert!(matches!(
            ledger.transfer("01234", "01234", &amount(2000)).await,
            TransactionOutcome::PersistenceFailed(_)
        ));
        assert_eq!(ledger.balance("01234").await, Some(amount(5000)));
        assert_eq!(ledger.balance("12345").await, Some(amount(10000)));
        assert!(subscriber.messages().is_empty());

        store.set_fail_saves(false);
        assert!(ledger.deposit("12345", &amount(1)).await.is_success());
        assert_eq!(ledger.balance("12345").await, Some(amount(10001)));
    }

    #[tokio::test]
    async fn test_bank_service_contract_collapses_outcomes() {
        let (ledger, _store, _log) = ledger().await;
        let service: &dyn BankService = &ledger;

        assert!(service.deposit("01234", amount(500)).await);
        assert!(!service.withdraw("01234", amount(99999)).await);
        assert!(!service.transfer("01234", "missing", amount(1)).await);
        assert!(service.login("01234").await.is_some());
    }

    /// Stalls on its first delivery and tracks overlapping deliveries.
    #[derive(Clone, Default)]
    struct SlowFirstSubscriber {
        received: Arc<std::sync::Mutex<Vec<String>>>,
        in_flight: Arc<std::sync::atomic::AtomicUsize>,
        max_in_flight: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait]
    impl Subscriber for SlowFirstSubscriber {
        async fn notify_transaction(&self, message: &str) -> Result<(), NotifyError> {
            use std::sync::atomic::Ordering;

            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            let first = self.received.lock().unwrap().is_empty();
            if first {
                tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            }
            self.received.lock().unwrap().push(message.to_string());

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_notifications_arrive_one_at_a_time_in_commit_order() {
        let store = MemoryAccountStore::with_accounts(bootstrap_accounts());
        let config = LedgerConfig {
            notify_timeout_ms: 2_000,
            ..LedgerConfig::default()
        };
        let ledger = Arc::new(
            LedgerService::open_with(store, &config, Arc::new(MemoryOperatorLog::new())).await,
        );
        let subscriber = SlowFirstSubscriber::default();
        ledger
            .register_callback("01234", Arc::new(subscriber.clone()))
            .await;

        let depositor = {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.deposit("01234", &BigDecimal::from(1)).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(ledger.withdraw("01234", &amount(2)).await.is_success());
        assert!(depositor.await.unwrap().is_success());

        assert_eq!(
            *subscriber.received.lock().unwrap(),
            vec!["Deposit: +1".to_string(), "Withdrawal: -2".to_string()]
        );
        assert_eq!(
            subscriber
                .max_in_flight
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
        assert_eq!(ledger.balance("01234").await, Some(amount(4999)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deposits_and_withdrawals_do_not_lose_updates() {
        let (ledger, store, _log) = ledger().await;
        let ledger = Arc::new(ledger);

        let mut tasks = Vec::new();
        for i in 0..50 {
            let ledger = Arc::clone(&ledger);
            tasks.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    ledger.deposit("98765", &BigDecimal::from(10)).await
                } else {
                    ledger.withdraw("98765", &BigDecimal::from(4)).await
                }
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_success());
        }

        // 25 deposits of 10, 25 withdrawals of 4
        assert_eq!(ledger.balance("98765").await, Some(amount(15150)));
        assert_eq!(store.save_count(), 50);
        assert_eq!(store.snapshot().await[2].balance, amount(15150));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_transfers_are_never_observed_half_applied() {
        let (ledger, _store, _log) = ledger().await;
        let ledger = Arc::new(ledger);
        let pair_total = amount(15000);

        let mut movers = Vec::new();
        for i in 0..40 {
            let ledger = Arc::clone(&ledger);
            movers.push(tokio::spawn(async move {
                let (from, to) = if i % 2 == 0 {
                    ("01234", "12345")
                } else {
                    ("12345", "01234")
                };
                ledger.transfer(from, to, &BigDecimal::from(250)).await
            }));
        }

        let reader = {
            let ledger = Arc::clone(&ledger);
            let pair_total = pair_total.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let accounts = ledger.accounts().await;
                    let observed: BigDecimal = accounts[..2].iter().map(|a| &a.balance).sum();
                    assert_eq!(observed, pair_total);
                    assert!(accounts.iter().all(|a| a.balance >= BigDecimal::from(0)));
                    tokio::task::yield_now().await;
                }
            })
        };

        for mover in movers {
            mover.await.unwrap();
        }
        reader.await.unwrap();
        assert_eq!(ledger.total_balance().await, amount(50000));
    }
}
