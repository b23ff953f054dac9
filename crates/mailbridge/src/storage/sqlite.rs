//! SQLite-based credential storage

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};

use super::CredentialStore;
use crate::error::{MailError, Result};
use crate::models::{AccountCredentials, Provider, TokenUpdate};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- One row per linked mailbox
            CREATE TABLE accounts (
                id TEXT PRIMARY KEY,
                provider TEXT NOT NULL,
                access_token TEXT,
                refresh_token TEXT,
                expires_at INTEGER,
                updated_at TEXT NOT NULL
            );
            "#,
        ),
    ])
}

const ACCOUNT_COLUMNS: &str = "id, provider, access_token, refresh_token, expires_at";

/// Raw account row before the provider discriminator is validated
struct AccountRow {
    id: String,
    provider: String,
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
}

impl AccountRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            provider: row.get(1)?,
            access_token: row.get(2)?,
            refresh_token: row.get(3)?,
            expires_at: row.get(4)?,
        })
    }

    fn into_account(self) -> Result<AccountCredentials> {
        let provider = Provider::from_discriminator(&self.provider).ok_or_else(|| {
            MailError::AccountMisconfigured {
                account_id: self.id.clone(),
                reason: format!("unknown provider '{}'", self.provider),
            }
        })?;

        Ok(AccountCredentials {
            id: self.id,
            provider,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at,
        })
    }
}

/// SQLite-based credential store
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
}

impl SqliteCredentialStore {
    /// Open (or create) a credential database at `db_path`
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).map_err(|e| {
            MailError::storage(format!(
                "Failed to open database at {:?}: {}",
                db_path.as_ref(),
                e
            ))
        })?;

        // WAL lets a reader in another process see committed token updates
        // while a refresh is being written.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;

        Self::with_connection(conn)
    }

    /// In-memory database, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(mut conn: Connection) -> Result<Self> {
        migrations().to_latest(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn find_account(&self, account_id: &str) -> Result<Option<AccountCredentials>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS),
                [account_id],
                AccountRow::from_row,
            )
            .optional()?;

        row.map(AccountRow::into_account).transpose()
    }

    fn save_account(&self, account: &AccountCredentials) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO accounts (id, provider, access_token, refresh_token, expires_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                provider = excluded.provider,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
            params![
                account.id,
                account.provider.as_str(),
                account.access_token,
                account.refresh_token,
                account.expires_at,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn update_tokens(&self, account_id: &str, update: &TokenUpdate) -> Result<()> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE accounts SET
                access_token = ?,
                expires_at = ?,
                refresh_token = COALESCE(?, refresh_token),
                updated_at = ?
             WHERE id = ?",
            params![
                update.access_token,
                update.expires_at,
                update.refresh_token,
                Utc::now().to_rfc3339(),
                account_id,
            ],
        )?;

        if changed == 0 {
            return Err(MailError::AccountNotFound {
                account_id: account_id.to_string(),
            });
        }
        Ok(())
    }

    fn list_accounts(&self) -> Result<Vec<AccountCredentials>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts ORDER BY id",
            ACCOUNT_COLUMNS
        ))?;

        let rows = stmt
            .query_map([], AccountRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // One unreadable row must not hide every other account
        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_account() {
                Ok(account) => Some(account),
                Err(e) => {
                    log::warn!("Skipping stored account: {}", e);
                    None
                }
            })
            .collect())
    }

    fn delete_account(&self, account_id: &str) -> Result<bool> {
        let conn = self.conn();
        let deleted = conn.execute("DELETE FROM accounts WHERE id = ?", [account_id])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_store() -> (SqliteCredentialStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = SqliteCredentialStore::new(dir.path().join("accounts.db")).unwrap();
        (store, dir)
    }

    fn google_account() -> AccountCredentials {
        AccountCredentials::new("acc-1", Provider::Google)
            .with_access_token("access-1", 1_700_000_000)
            .with_refresh_token("refresh-1")
    }

    #[test]
    fn test_account_crud() {
        let (store, _dir) = create_test_store();
        assert!(store.find_account("acc-1").unwrap().is_none());

        store.save_account(&google_account()).unwrap();
        assert_eq!(store.find_account("acc-1").unwrap(), Some(google_account()));

        let mut replaced = google_account();
        replaced.access_token = Some("access-2".to_string());
        store.save_account(&replaced).unwrap();
        assert_eq!(
            store.find_account("acc-1").unwrap().unwrap().access_token.as_deref(),
            Some("access-2")
        );

        assert!(store.delete_account("acc-1").unwrap());
        assert!(store.find_account("acc-1").unwrap().is_none());
    }

    #[test]
    fn test_update_tokens_preserves_refresh_token() {
        let (store, _dir) = create_test_store();
        store.save_account(&google_account()).unwrap();

        store
            .update_tokens(
                "acc-1",
                &TokenUpdate {
                    access_token: "access-2".to_string(),
                    expires_at: 1_700_003_600,
                    refresh_token: None,
                },
            )
            .unwrap();

        let account = store.find_account("acc-1").unwrap().unwrap();
        assert_eq!(account.access_token.as_deref(), Some("access-2"));
        assert_eq!(account.expires_at, Some(1_700_003_600));
        assert_eq!(account.refresh_token.as_deref(), Some("refresh-1"));

        store
            .update_tokens(
                "acc-1",
                &TokenUpdate {
                    access_token: "access-3".to_string(),
                    expires_at: 1_700_007_200,
                    refresh_token: Some("refresh-2".to_string()),
                },
            )
            .unwrap();
        let account = store.find_account("acc-1").unwrap().unwrap();
        assert_eq!(account.refresh_token.as_deref(), Some("refresh-2"));
    }

    #[test]
    fn test_update_tokens_unknown_account() {
        let store = SqliteCredentialStore::open_in_memory().unwrap();
        let err = store
            .update_tokens(
                "ghost",
                &TokenUpdate {
                    access_token: "t".to_string(),
                    expires_at: 1,
                    refresh_token: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, MailError::AccountNotFound { .. }));
    }

    #[test]
    fn test_provider_aliases_and_unknown_discriminator() {
        let store = SqliteCredentialStore::open_in_memory().unwrap();
        {
            let conn = store.conn();
            conn.execute(
                "INSERT INTO accounts (id, provider, access_token, updated_at) VALUES ('ms', 'azure-ad', 't', '')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO accounts (id, provider, access_token, updated_at) VALUES ('odd', 'yahoo', 't', '')",
                [],
            )
            .unwrap();
        }

        let ms = store.find_account("ms").unwrap().unwrap();
        assert_eq!(ms.provider, Provider::Microsoft);
        assert!(ms.refresh_token.is_none());

        let err = store.find_account("odd").unwrap_err();
        assert!(matches!(err, MailError::AccountMisconfigured { .. }));

        let listed: Vec<_> = store
            .list_accounts()
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(listed, vec!["ms"]);
    }

    #[test]
    fn test_reopen_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.db");
        {
            let store = SqliteCredentialStore::new(&path).unwrap();
            store.save_account(&google_account()).unwrap();
        }
        let store = SqliteCredentialStore::new(&path).unwrap();
        assert_eq!(store.list_accounts().unwrap(), vec![google_account()]);
    }
}
