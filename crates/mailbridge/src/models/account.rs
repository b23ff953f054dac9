//! Account credential records consumed from the credential store

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported mail backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "google", alias = "gmail")]
    Google,
    #[serde(rename = "microsoft-entra-id", alias = "azure-ad", alias = "outlook")]
    Microsoft,
}

impl Provider {
    /// Canonical discriminator as stored in the account row
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Microsoft => "microsoft-entra-id",
        }
    }

    /// Parse a stored discriminator, accepting historical aliases
    pub fn from_discriminator(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" | "gmail" => Some(Provider::Google),
            "microsoft-entra-id" | "azure-ad" | "outlook" | "microsoft" => Some(Provider::Microsoft),
            _ => None,
        }
    }

    /// Human-readable backend name used in errors and logs
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Google => "Gmail",
            Provider::Microsoft => "Outlook",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error returned when a provider discriminator is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_discriminator(s).ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

/// Stored OAuth credentials for one linked mailbox
///
/// Microsoft accounts linked through the delegated flow may carry no
/// refresh token at all; that asymmetry is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCredentials {
    /// Opaque account id (store primary key)
    pub id: String,
    pub provider: Provider,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Access token expiry in epoch seconds
    pub expires_at: Option<i64>,
}

impl AccountCredentials {
    pub fn new(id: impl Into<String>, provider: Provider) -> Self {
        Self {
            id: id.into(),
            provider,
            access_token: None,
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>, expires_at: i64) -> Self {
        self.access_token = Some(token.into());
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Access token if present and non-empty
    pub fn usable_access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Refresh token if present and non-empty
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Apply a token update, keeping the stored refresh token when the
    /// update carries none
    pub fn apply(&mut self, update: &TokenUpdate) {
        self.access_token = Some(update.access_token.clone());
        self.expires_at = Some(update.expires_at);
        if let Some(refresh_token) = &update.refresh_token {
            self.refresh_token = Some(refresh_token.clone());
        }
    }
}

/// New token material produced by a refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUpdate {
    pub access_token: String,
    pub expires_at: i64,
    /// Only set when the provider issued a new refresh token
    pub refresh_token: Option<String>,
}

/// Either an account id to look up or an already-loaded record
#[derive(Debug, Clone, PartialEq)]
pub enum AccountRef {
    Id(String),
    Record(AccountCredentials),
}

impl AccountRef {
    pub fn account_id(&self) -> &str {
        match self {
            AccountRef::Id(id) => id,
            AccountRef::Record(record) => &record.id,
        }
    }
}

impl From<&str> for AccountRef {
    fn from(id: &str) -> Self {
        AccountRef::Id(id.to_string())
    }
}

impl From<String> for AccountRef {
    fn from(id: String) -> Self {
        AccountRef::Id(id)
    }
}

impl From<AccountCredentials> for AccountRef {
    fn from(record: AccountCredentials) -> Self {
        AccountRef::Record(record)
    }
}

impl From<&AccountCredentials> for AccountRef {
    fn from(record: &AccountCredentials) -> Self {
        AccountRef::Record(record.clone())
    }
}
