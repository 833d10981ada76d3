//! # Remote Ledger
//!
//! The authoritative side of a small remote banking system: one process holds
//! every account, serves login, deposit, withdrawal and transfer requests from
//! remote clients, saves the full account set after each change, and pushes
//! transaction notifications to whichever client is subscribed to an account.
//!
//! ## Features
//!
//! - **Serialized ledger**: one lock covers the whole account set, so transfers
//!   are never visible half-applied
//! - **Durable on every commit**: each successful mutation is written to the
//!   store before the call returns
//! - **Push notifications**: one subscriber slot per account, latest
//!   registration wins, failing subscribers are dropped
//! - **Storage abstraction**: [`AccountStore`] with a JSON file implementation
//!   and an in-memory one for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use remote_ledger::{JsonFileStore, LedgerService};
//! use bigdecimal::BigDecimal;
//!
//! # async fn run() {
//! let ledger = LedgerService::open(JsonFileStore::new("accounts.json")).await;
//! let outcome = ledger.deposit("01234", &BigDecimal::from(500)).await;
//! assert!(outcome.is_success());
//! # }
//! ```

pub mod config;
pub mod ledger;
pub mod logging;
pub mod store;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use ledger::*;
pub use store::*;
pub use traits::*;
pub use types::*;
