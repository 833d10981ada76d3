//! Recording subscribers and operator logs for tests and local consoles

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::traits::*;

/// Subscriber that keeps every message it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingSubscriber {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Subscriber for RecordingSubscriber {
    async fn notify_transaction(&self, message: &str) -> Result<(), NotifyError> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
        Ok(())
    }
}

/// Subscriber whose every delivery fails with a fixed error
#[derive(Debug, Clone)]
pub struct FailingSubscriber {
    error: NotifyError,
    attempts: Arc<AtomicUsize>,
}

impl FailingSubscriber {
    pub fn new(error: NotifyError) -> Self {
        Self {
            error,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of delivery attempts made against this subscriber
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Subscriber for FailingSubscriber {
    async fn notify_transaction(&self, _message: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Operator log that buffers lines in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryOperatorLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryOperatorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OperatorLog for MemoryOperatorLog {
    fn log(&self, line: &str) {
        tracing::info!(target: "operator", "{line}");
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}
