//! In-memory credential store
//!
//! Used for tests and for hosts that keep credentials elsewhere and hand
//! records in directly.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::CredentialStore;
use crate::error::{MailError, Result};
use crate::models::{AccountCredentials, TokenUpdate};

/// In-memory implementation of CredentialStore
#[derive(Default)]
pub struct InMemoryCredentialStore {
    accounts: RwLock<HashMap<String, AccountCredentials>>,
}

impl InMemoryCredentialStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with accounts
    pub fn with_accounts(accounts: impl IntoIterator<Item = AccountCredentials>) -> Self {
        let store = Self::new();
        {
            let mut map = store.accounts.write().unwrap_or_else(PoisonError::into_inner);
            for account in accounts {
                map.insert(account.id.clone(), account);
            }
        }
        store
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn find_account(&self, account_id: &str) -> Result<Option<AccountCredentials>> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.get(account_id).cloned())
    }

    fn save_account(&self, account: &AccountCredentials) -> Result<()> {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    fn update_tokens(&self, account_id: &str, update: &TokenUpdate) -> Result<()> {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        let account = accounts
            .get_mut(account_id)
            .ok_or_else(|| MailError::AccountNotFound {
                account_id: account_id.to_string(),
            })?;
        account.apply(update);
        Ok(())
    }

    fn list_accounts(&self) -> Result<Vec<AccountCredentials>> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<_> = accounts.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(list)
    }

    fn delete_account(&self, account_id: &str) -> Result<bool> {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.remove(account_id).is_some())
    }
}
