//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mailbridge::{
    AccountCredentials, Clock, CredentialStore, InMemoryCredentialStore, MailSettings,
    OAuthClient, Provider, ProviderEndpoints, UreqClient,
};

/// Fixed "now" used by every test
pub const NOW: i64 = 1_700_000_000;

/// A clock that never moves
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

pub fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(NOW))
}

pub fn http() -> Arc<UreqClient> {
    Arc::new(UreqClient::new(Duration::from_secs(5)))
}

/// Settings with both OAuth clients, every endpoint on the mock server
pub fn settings(server: &mockito::Server) -> MailSettings {
    MailSettings::default()
        .with_client(Provider::Google, OAuthClient::new("google-client", "google-secret"))
        .with_client(
            Provider::Microsoft,
            OAuthClient::new("ms-client", "ms-secret"),
        )
        .with_endpoints(ProviderEndpoints::with_base_url(&server.url()))
}

pub fn account(id: &str, provider: Provider, access_token: &str, expires_at: i64) -> AccountCredentials {
    AccountCredentials::new(id, provider)
        .with_access_token(access_token, expires_at)
        .with_refresh_token("refresh-1")
}

pub fn store_with(accounts: Vec<AccountCredentials>) -> Arc<dyn CredentialStore> {
    Arc::new(InMemoryCredentialStore::with_accounts(accounts))
}

/// JSON body for a successful token endpoint response
pub fn token_body(access_token: &str, expires_in: i64) -> String {
    serde_json::json!({
        "access_token": access_token,
        "expires_in": expires_in,
        "token_type": "Bearer"
    })
    .to_string()
}
