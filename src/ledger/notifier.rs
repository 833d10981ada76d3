//! Subscriber registry and best-effort notification dispatch

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::DEFAULT_NOTIFY_TIMEOUT_MS;
use crate::ledger::transaction::TransactionEvent;
use crate::traits::*;

struct Registration {
    id: Uuid,
    handle: SubscriberHandle,
}

/// At most one live subscriber per account; the latest registration wins.
///
/// Delivery failures unsubscribe the failing handle and are never reported
/// back to the ledger operation that triggered them.
pub struct NotificationRegistry {
    subscribers: Mutex<HashMap<String, Registration>>,
    timeout: Duration,
    operator_log: Arc<dyn OperatorLog>,
}

impl NotificationRegistry {
    pub fn new(timeout: Duration, operator_log: Arc<dyn OperatorLog>) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            timeout,
            operator_log,
        }
    }

    /// Register `handle` for `account_number`, replacing any previous handle
    pub async fn register(&self, account_number: &str, handle: SubscriberHandle) {
        let registration = Registration {
            id: Uuid::new_v4(),
            handle,
        };
        let replaced = self
            .subscribers
            .lock()
            .await
            .insert(account_number.to_string(), registration)
            .is_some();

        tracing::debug!(account = %account_number, replaced, "subscriber registered");
        self.operator_log
            .log(&format!("Callback registered: {}", account_number));
    }

    /// Drop the handle for `account_number`; no-op when none is registered
    pub async fn unregister(&self, account_number: &str) {
        let removed = self
            .subscribers
            .lock()
            .await
            .remove(account_number)
            .is_some();

        tracing::debug!(account = %account_number, removed, "subscriber unregistered");
        self.operator_log
            .log(&format!("Callback removed: {}", account_number));
    }

    pub async fn is_registered(&self, account_number: &str) -> bool {
        self.subscribers.lock().await.contains_key(account_number)
    }

    pub async fn len(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.lock().await.is_empty()
    }

    /// Deliver an event to its account's subscriber
    pub async fn dispatch_event(&self, event: &TransactionEvent) -> bool {
        self.dispatch(&event.account_number, &event.message()).await
    }

    /// Deliver `message` to the subscriber of `account_number`.
    ///
    /// Returns whether a subscriber acknowledged the message. No subscriber is
    /// a silent no-op. A failed or timed-out delivery removes that subscriber.
    pub async fn dispatch(&self, account_number: &str, message: &str) -> bool {
        // The registry lock is not held while the remote call is in flight.
        let target = self
            .subscribers
            .lock()
            .await
            .get(account_number)
            .map(|registration| (registration.id, Arc::clone(&registration.handle)));

        let Some((registration_id, handle)) = target else {
            tracing::trace!(account = %account_number, "no subscriber, skipping notification");
            return false;
        };

        let delivery = tokio::time::timeout(self.timeout, handle.notify_transaction(message))
            .await
            .unwrap_or(Err(NotifyError::TimedOut));

        match delivery {
            Ok(()) => {
                tracing::debug!(account = %account_number, "notification delivered");
                true
            }
            Err(err) => {
                tracing::warn!(account = %account_number, error = %err, "notification failed, dropping subscriber");
                self.remove_if_current(account_number, registration_id).await;
                self.operator_log
                    .log(&format!("Callback failed for: {}", account_number));
                false
            }
        }
    }

    /// Remove the registration only if it is still the one that failed
    async fn remove_if_current(&self, account_number: &str, registration_id: Uuid) {
        let mut subscribers = self.subscribers.lock().await;
        if subscribers
            .get(account_number)
            .is_some_and(|current| current.id == registration_id)
        {
            subscribers.remove(account_number);
        }
    }
}

impl Default for NotificationRegistry {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_NOTIFY_TIMEOUT_MS),
            Arc::new(TracingOperatorLog),
        )
    }
}
