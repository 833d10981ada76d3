//! Transaction events pushed to subscribers and the operator console

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of balance change an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    /// Debit side of a transfer, delivered to the sender
    TransferOut,
    /// Credit side of a transfer, delivered to the receiver
    TransferIn,
}

/// One ephemeral balance-change notification. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub kind: TransactionKind,
    /// Account whose subscriber receives this event
    pub account_number: String,
    /// The other side of a transfer
    pub counterparty: Option<String>,
    pub amount: BigDecimal,
}

impl TransactionEvent {
    fn new(
        kind: TransactionKind,
        account_number: &str,
        counterparty: Option<&str>,
        amount: &BigDecimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            kind,
            account_number: account_number.to_string(),
            counterparty: counterparty.map(str::to_string),
            amount: amount.clone(),
        }
    }

    pub fn deposit(account_number: &str, amount: &BigDecimal) -> Self {
        Self::new(TransactionKind::Deposit, account_number, None, amount)
    }

    pub fn withdrawal(account_number: &str, amount: &BigDecimal) -> Self {
        Self::new(TransactionKind::Withdrawal, account_number, None, amount)
    }

    /// The sender's and the receiver's event for one transfer
    pub fn transfer_pair(from_account: &str, to_account: &str, amount: &BigDecimal) -> (Self, Self) {
        (
            Self::new(
                TransactionKind::TransferOut,
                from_account,
                Some(to_account),
                amount,
            ),
            Self::new(
                TransactionKind::TransferIn,
                to_account,
                Some(from_account),
                amount,
            ),
        )
    }

    /// Human-readable text delivered to the subscriber
    pub fn message(&self) -> String {
        let amount = format_amount(&self.amount);
        let counterparty = self.counterparty.as_deref().unwrap_or("-");
        match self.kind {
            TransactionKind::Deposit => format!("Deposit: +{}", amount),
            TransactionKind::Withdrawal => format!("Withdrawal: -{}", amount),
            TransactionKind::TransferOut => format!("Transfer to {}: -{}", counterparty, amount),
            TransactionKind::TransferIn => format!("Transfer from {}: +{}", counterparty, amount),
        }
    }
}

/// Whole-unit rendering used in messages and console lines
pub fn format_amount(amount: &BigDecimal) -> String {
    amount.with_scale_round(0, RoundingMode::HalfUp).to_string()
}
