//! Error taxonomy for the provider abstraction layer

use crate::models::Provider;

/// Errors raised by token management, credential stores and provider services
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: String },

    #[error("Account {account_id} is misconfigured ({reason}). Please reconnect this account.")]
    AccountMisconfigured { account_id: String, reason: String },

    #[error(
        "{provider} token for account {account_id} has expired or been revoked. Please reconnect your account. ({message})"
    )]
    TokenExpiredOrRevoked {
        account_id: String,
        provider: Provider,
        message: String,
    },

    #[error("Failed to refresh {provider} token for account {account_id}: HTTP {status}: {message}")]
    TokenRefreshFailed {
        account_id: String,
        provider: Provider,
        status: u16,
        message: String,
    },

    #[error("{provider} request failed during {operation}: HTTP {status}: {message}")]
    ProviderRequestFailed {
        provider: Provider,
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider} rejected the access token during {operation}")]
    Unauthorized {
        provider: Provider,
        operation: &'static str,
    },

    #[error("Not found during {operation} on {provider}: {resource}")]
    NotFound {
        provider: Provider,
        operation: &'static str,
        resource: String,
    },

    #[error("Network error during {operation}: {message}")]
    Network {
        operation: &'static str,
        message: String,
        timed_out: bool,
    },

    #[error("Failed to decode response for {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Credential store error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl MailError {
    /// Whether retrying the same call later may succeed
    ///
    /// Covers rate limiting, server errors and transport failures. Callers
    /// must still not blindly retry non-idempotent sends.
    pub fn is_retryable(&self) -> bool {
        match self {
            MailError::Network { .. } => true,
            MailError::ProviderRequestFailed { status, .. }
            | MailError::TokenRefreshFailed { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }

    /// Whether the user has to re-link the account
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self,
            MailError::AccountMisconfigured { .. } | MailError::TokenExpiredOrRevoked { .. }
        )
    }

    /// Account id carried by account-level errors
    pub fn account_id(&self) -> Option<&str> {
        match self {
            MailError::AccountNotFound { account_id }
            | MailError::AccountMisconfigured { account_id, .. }
            | MailError::TokenExpiredOrRevoked { account_id, .. }
            | MailError::TokenRefreshFailed { account_id, .. } => Some(account_id),
            _ => None,
        }
    }

    pub(crate) fn storage(message: impl Into<String>) -> Self {
        MailError::Storage {
            message: message.into(),
        }
    }

    pub(crate) fn decode(operation: &'static str, err: impl std::fmt::Display) -> Self {
        MailError::Decode {
            operation,
            message: err.to_string(),
        }
    }
}

/// Rate limiting and server-side failures
pub(crate) fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

impl From<rusqlite::Error> for MailError {
    fn from(e: rusqlite::Error) -> Self {
        MailError::storage(e.to_string())
    }
}

impl From<rusqlite_migration::Error> for MailError {
    fn from(e: rusqlite_migration::Error) -> Self {
        MailError::storage(format!("Failed to run database migrations: {}", e))
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, MailError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let rate_limited = MailError::ProviderRequestFailed {
            provider: Provider::Google,
            operation: "list_emails",
            status: 429,
            message: "slow down".to_string(),
        };
        assert!(rate_limited.is_retryable());

        let bad_query = MailError::ProviderRequestFailed {
            provider: Provider::Microsoft,
            operation: "list_emails",
            status: 400,
            message: "bad $search".to_string(),
        };
        assert!(!bad_query.is_retryable());

        let timeout = MailError::Network {
            operation: "get_email",
            message: "timed out".to_string(),
            timed_out: true,
        };
        assert!(timeout.is_retryable());
    }

    #[test]
    fn test_reconnect_classification() {
        let revoked = MailError::TokenExpiredOrRevoked {
            account_id: "acc-1".to_string(),
            provider: Provider::Google,
            message: "invalid_grant".to_string(),
        };
        assert!(revoked.requires_reconnect());
        assert!(!revoked.is_retryable());
        assert_eq!(revoked.account_id(), Some("acc-1"));

        let refresh_outage = MailError::TokenRefreshFailed {
            account_id: "acc-1".to_string(),
            provider: Provider::Microsoft,
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(!refresh_outage.requires_reconnect());
        assert!(refresh_outage.is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = MailError::AccountNotFound {
            account_id: "acc-404".to_string(),
        };
        assert_eq!(err.to_string(), "Account not found: acc-404");

        let err = MailError::AccountMisconfigured {
            account_id: "acc-1".to_string(),
            reason: "no refresh token".to_string(),
        };
        assert!(err.to_string().contains("Please reconnect"));
    }
}
