//! JSON document store on the local filesystem

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::store::bootstrap_accounts;
use crate::traits::*;
use crate::types::*;

/// On-disk document: `{"accounts": [{accountNumber, accountName, balance, pin}, ...]}`
#[derive(Debug, Serialize, Deserialize)]
struct AccountDocument {
    accounts: Vec<AccountRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    account_number: String,
    account_name: String,
    balance: BalanceField,
    pin: String,
}

/// Balance as written: decimal text (`"1234.5"`) on save, text or a bare
/// JSON number accepted on load.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum BalanceField {
    Text(String),
    Number(serde_json::Number),
}

impl BalanceField {
    fn as_text(&self) -> String {
        match self {
            BalanceField::Text(text) => text.trim().to_string(),
            BalanceField::Number(number) => number.to_string(),
        }
    }
}

impl From<&Account> for AccountRecord {
    fn from(account: &Account) -> Self {
        Self {
            account_number: account.account_number.clone(),
            account_name: account.account_name.clone(),
            balance: BalanceField::Text(account.balance.to_string()),
            pin: account.pin.clone(),
        }
    }
}

impl TryFrom<AccountRecord> for Account {
    type Error = LedgerError;

    fn try_from(record: AccountRecord) -> Result<Self, Self::Error> {
        let text = record.balance.as_text();
        let balance = BigDecimal::from_str(&text).map_err(|_| {
            LedgerError::Parse(format!(
                "account '{}' has non-numeric balance '{}'",
                record.account_number, text
            ))
        })?;
        Ok(Account {
            account_number: record.account_number,
            account_name: record.account_name,
            balance,
            pin: record.pin,
        })
    }
}

/// Account store backed by a single JSON file.
///
/// Each save rewrites the whole document through a sibling temp file and a
/// rename, so readers see either the old or the new document. Saves are
/// serialized by an internal lock independent of any caller-side locking.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the store document currently exists
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "accounts".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn replace_with(&self, temp_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(temp_path, &self.path).await
    }

    fn decode(bytes: &[u8]) -> LedgerResult<Vec<Account>> {
        let document: AccountDocument =
            serde_json::from_slice(bytes).map_err(|e| LedgerError::Parse(e.to_string()))?;
        document
            .accounts
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    fn encode(accounts: &[Account]) -> LedgerResult<Vec<u8>> {
        let document = AccountDocument {
            accounts: accounts.iter().map(AccountRecord::from).collect(),
        };
        serde_json::to_vec_pretty(&document).map_err(|e| LedgerError::Storage(e.to_string()))
    }
}

#[async_trait]
impl AccountStore for JsonFileStore {
    async fn try_load(&self) -> LedgerResult<Vec<Account>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "account store missing, writing bootstrap accounts");
                let accounts = bootstrap_accounts();
                if let Err(err) = self.save(&accounts).await {
                    tracing::error!(path = %self.path.display(), error = %err, "failed to write bootstrap accounts");
                }
                return Ok(accounts);
            }
            Err(err) => return Err(err.into()),
        };

        let accounts = Self::decode(&bytes)?;
        tracing::info!(path = %self.path.display(), count = accounts.len(), "accounts loaded");
        Ok(accounts)
    }

    async fn save(&self, accounts: &[Account]) -> LedgerResult<()> {
        let bytes = Self::encode(accounts)?;
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        if let Err(err) = self.replace_with(&temp_path, &bytes).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %temp_path.display(), error = %cleanup, "failed to remove temp file");
                }
            }
            return Err(err.into());
        }

        tracing::debug!(path = %self.path.display(), count = accounts.len(), "accounts saved");
        Ok(())
    }
}
