//! Ledger module containing the account book, events, notification and the service

pub mod account;
pub mod notifier;
pub mod service;
pub mod transaction;

pub use account::*;
pub use notifier::*;
pub use service::*;
pub use transaction::*;
