//! Access token validation and refresh
//!
//! Uses synchronous HTTP through the injected [`HttpClient`] to be
//! executor-agnostic.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{Clock, SystemClock};
use crate::config::MailSettings;
use crate::error::{MailError, Result};
use crate::http::{HttpClient, HttpRequest, truncate_body};
use crate::models::{AccountCredentials, AccountRef, Provider, TokenUpdate};
use crate::storage::CredentialStore;

/// Tokens expiring within this many seconds are refreshed
pub const REFRESH_BUFFER_SECS: i64 = 300;

/// Lifetime assumed when a token response omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Scopes requested when refreshing Microsoft tokens
pub const MICROSOFT_MAIL_SCOPE: &str = "openid profile email offline_access Mail.ReadWrite Mail.Send";

/// Token response from an OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// OAuth error body (RFC 6749 section 5.2)
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Returns currently-valid access tokens, refreshing and persisting them
/// when they are about to expire
///
/// Refreshes for the same account are serialised: a caller that waited on
/// another caller's refresh re-reads the store and reuses its result.
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    http: Arc<dyn HttpClient>,
    settings: MailSettings,
    clock: Arc<dyn Clock>,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        http: Arc<dyn HttpClient>,
        settings: MailSettings,
    ) -> Self {
        Self {
            store,
            http,
            settings,
            clock: Arc::new(SystemClock),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the time source (tests)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Get a valid access token for an account id or a loaded record
    ///
    /// Returns the stored token untouched while it is valid for more than
    /// [`REFRESH_BUFFER_SECS`]; otherwise refreshes it and persists the new
    /// token before returning it.
    pub fn get_valid_access_token(&self, account: impl Into<AccountRef>) -> Result<String> {
        let account = self.resolve(account.into())?;

        if let Some(token) = self.fresh_token(&account)? {
            log::debug!("Access token for account {} is still valid", account.id);
            return Ok(token);
        }

        let lock = self.refresh_lock(&account.id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have refreshed while we waited
        let account = self.store.find_account(&account.id)?.unwrap_or(account);
        if let Some(token) = self.fresh_token(&account)? {
            return Ok(token);
        }

        let update = self.refresh(&account)?;
        self.persist(account.clone(), &update)?;
        log::info!(
            "Refreshed {} access token for account {} (expires at {})",
            account.provider,
            account.id,
            update.expires_at
        );

        Ok(update.access_token)
    }

    /// Store refreshed tokens; a supplied record that was never saved is
    /// inserted with them so a rotated refresh token is not lost
    fn persist(&self, mut account: AccountCredentials, update: &TokenUpdate) -> Result<()> {
        match self.store.update_tokens(&account.id, update) {
            Err(MailError::AccountNotFound { .. }) => {
                log::info!("Saving refreshed tokens for unstored account {}", account.id);
                account.apply(update);
                self.store.save_account(&account)
            }
            result => result,
        }
    }

    /// Load the record for an id, or take the supplied record as-is
    fn resolve(&self, account: AccountRef) -> Result<AccountCredentials> {
        match account {
            AccountRef::Record(record) => Ok(record),
            AccountRef::Id(account_id) => self
                .store
                .find_account(&account_id)?
                .ok_or(MailError::AccountNotFound { account_id }),
        }
    }

    /// The stored access token if it outlives the refresh buffer
    fn fresh_token(&self, account: &AccountCredentials) -> Result<Option<String>> {
        let token = account
            .usable_access_token()
            .ok_or_else(|| MailError::AccountMisconfigured {
                account_id: account.id.clone(),
                reason: "no access token".to_string(),
            })?;

        let expires_at = account.expires_at.unwrap_or(0);
        if expires_at > self.clock.now() + REFRESH_BUFFER_SECS {
            Ok(Some(token.to_string()))
        } else {
            Ok(None)
        }
    }

    fn refresh_lock(&self, account_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .refresh_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(account_id.to_string()).or_default().clone()
    }

    /// Exchange the refresh token for a new access token
    fn refresh(&self, account: &AccountCredentials) -> Result<TokenUpdate> {
        let refresh_token =
            account
                .usable_refresh_token()
                .ok_or_else(|| MailError::AccountMisconfigured {
                    account_id: account.id.clone(),
                    reason: "no refresh token".to_string(),
                })?;
        let client = self.settings.oauth_client(account.provider)?;

        let mut form = vec![
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        if account.provider == Provider::Microsoft {
            form.push(("scope", MICROSOFT_MAIL_SCOPE));
        }

        let url = self.settings.endpoints.token_url(account.provider);
        log::debug!("Refreshing {} token for account {}", account.provider, account.id);

        let request = HttpRequest::post(url).form(form);
        let response = self.http.execute(&request).map_err(|e| MailError::Network {
            operation: "refresh_token",
            message: e.message,
            timed_out: e.timed_out,
        })?;

        if !response.is_success() {
            let message = describe_token_error(&response.body);
            log::warn!(
                "{} token refresh for account {} failed with HTTP {}: {}",
                account.provider,
                account.id,
                response.status,
                message
            );

            return Err(match response.status {
                400 | 401 => MailError::TokenExpiredOrRevoked {
                    account_id: account.id.clone(),
                    provider: account.provider,
                    message,
                },
                status => MailError::TokenRefreshFailed {
                    account_id: account.id.clone(),
                    provider: account.provider,
                    status,
                    message,
                },
            });
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| MailError::decode("refresh_token", e))?;

        Ok(TokenUpdate {
            access_token: token.access_token,
            expires_at: self.clock.now() + token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
            refresh_token: token.refresh_token.filter(|t| !t.is_empty()),
        })
    }
}

/// Human-readable summary of a token endpoint error body
fn describe_token_error(body: &str) -> String {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(err) => match err.error_description {
            Some(description) => format!("{}: {}", err.error, description),
            None => err.error,
        },
        Err(_) => truncate_body(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthClient;
    use crate::http::{HttpResponse, TransportError};
    use crate::storage::InMemoryCredentialStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    const NOW: i64 = 1_700_000_000;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> i64 {
            self.0
        }
    }

    /// Token endpoint double that counts calls and answers slowly
    struct SlowTokenEndpoint {
        calls: AtomicUsize,
    }

    impl HttpClient for SlowTokenEndpoint {
        fn execute(&self, _request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            thread::sleep(Duration::from_millis(50));
            Ok(HttpResponse {
                status: 200,
                body: format!(r#"{{"access_token":"fresh-{}","expires_in":3600}}"#, n),
            })
        }
    }

    fn settings() -> MailSettings {
        MailSettings::default()
            .with_client(Provider::Google, OAuthClient::new("id", "secret"))
            .with_client(Provider::Microsoft, OAuthClient::new("id", "secret"))
    }

    fn manager(store: Arc<InMemoryCredentialStore>, http: Arc<dyn HttpClient>) -> TokenManager {
        TokenManager::new(store, http, settings()).with_clock(Arc::new(FixedClock(NOW)))
    }

    #[test]
    fn test_concurrent_callers_share_one_refresh() {
        let store = Arc::new(InMemoryCredentialStore::with_accounts([
            AccountCredentials::new("acc-1", Provider::Google)
                .with_access_token("stale", NOW - 10)
                .with_refresh_token("r1"),
        ]));
        let http = Arc::new(SlowTokenEndpoint {
            calls: AtomicUsize::new(0),
        });
        let manager = Arc::new(manager(store.clone(), http.clone()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                thread::spawn(move || manager.get_valid_access_token("acc-1").unwrap())
            })
            .collect();
        let tokens: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
        assert!(tokens.iter().all(|t| t == "fresh-1"));
        assert_eq!(
            store.find_account("acc-1").unwrap().unwrap().expires_at,
            Some(NOW + 3600)
        );
    }

    #[test]
    fn test_missing_access_token_is_misconfigured() {
        let store = Arc::new(InMemoryCredentialStore::with_accounts([
            AccountCredentials::new("acc-1", Provider::Google).with_refresh_token("r1"),
        ]));
        let http = Arc::new(SlowTokenEndpoint {
            calls: AtomicUsize::new(0),
        });
        let err = manager(store, http.clone())
            .get_valid_access_token("acc-1")
            .unwrap_err();

        assert!(matches!(err, MailError::AccountMisconfigured { .. }));
        assert_eq!(http.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_client_configuration() {
        let store = Arc::new(InMemoryCredentialStore::with_accounts([
            AccountCredentials::new("acc-1", Provider::Microsoft)
                .with_access_token("stale", 0)
                .with_refresh_token("r1"),
        ]));
        let http = Arc::new(SlowTokenEndpoint {
            calls: AtomicUsize::new(0),
        });
        let manager = TokenManager::new(store, http, MailSettings::default())
            .with_clock(Arc::new(FixedClock(NOW)));

        let err = manager.get_valid_access_token("acc-1").unwrap_err();
        assert!(matches!(err, MailError::Config { .. }));
    }

    #[test]
    fn test_describe_token_error() {
        assert_eq!(
            describe_token_error(r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#),
            "invalid_grant: Token has been expired or revoked."
        );
        assert_eq!(describe_token_error(r#"{"error":"invalid_client"}"#), "invalid_client");
        assert_eq!(describe_token_error("<html>oops</html>"), "<html>oops</html>");
    }
}
