//! Storage trait definitions

use crate::error::Result;
use crate::models::{AccountCredentials, TokenUpdate};

/// Trait for account credential storage
///
/// One record per linked mailbox, keyed by an opaque account id. The token
/// manager is the only writer of token fields after an account is linked.
pub trait CredentialStore: Send + Sync {
    /// Get an account by id
    fn find_account(&self, account_id: &str) -> Result<Option<AccountCredentials>>;

    /// Insert or replace an account record
    fn save_account(&self, account: &AccountCredentials) -> Result<()>;

    /// Persist refreshed token material
    ///
    /// The stored refresh token is only replaced when the update carries
    /// one. Fails with `AccountNotFound` if the record does not exist.
    fn update_tokens(&self, account_id: &str, update: &TokenUpdate) -> Result<()>;

    /// List all accounts, ordered by id
    fn list_accounts(&self) -> Result<Vec<AccountCredentials>>;

    /// Remove an account; returns whether a record existed
    fn delete_account(&self, account_id: &str) -> Result<bool>;
}
