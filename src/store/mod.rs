//! Durable account storage

pub mod file;

pub use file::*;

use bigdecimal::BigDecimal;

use crate::types::Account;

/// The demo accounts written when no store document exists yet
pub fn bootstrap_accounts() -> Vec<Account> {
    vec![
        Account::new("01234", "Nguyễn Văn A", BigDecimal::from(5000), "1234"),
        Account::new("12345", "Trần Thị B", BigDecimal::from(10000), "5678"),
        Account::new("98765", "Lê Văn C", BigDecimal::from(15000), "9999"),
        Account::new("11111", "Phạm Thị D", BigDecimal::from(20000), "0000"),
    ]
}
