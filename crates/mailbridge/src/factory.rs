//! Builds a provider service for a stored account

use std::sync::Arc;

use crate::auth::{Clock, TokenManager};
use crate::config::{MailSettings, ProviderEndpoints};
use crate::error::{MailError, Result};
use crate::gmail::GmailService;
use crate::http::HttpClient;
use crate::models::{AccountRef, Provider};
use crate::outlook::OutlookService;
use crate::service::EmailService;
use crate::storage::CredentialStore;

/// Construct a service from an access token that is already valid
pub fn create_email_service(
    provider: Provider,
    http: Arc<dyn HttpClient>,
    access_token: impl Into<String>,
    endpoints: &ProviderEndpoints,
) -> Box<dyn EmailService> {
    match provider {
        Provider::Google => {
            Box::new(GmailService::new(http, access_token).with_base_url(&endpoints.gmail_api))
        }
        Provider::Microsoft => {
            Box::new(OutlookService::new(http, access_token).with_base_url(&endpoints.graph_api))
        }
    }
}

/// Resolves accounts to ready-to-use [`EmailService`]s
pub struct EmailServiceFactory {
    tokens: TokenManager,
    http: Arc<dyn HttpClient>,
    endpoints: ProviderEndpoints,
}

impl EmailServiceFactory {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        http: Arc<dyn HttpClient>,
        settings: MailSettings,
    ) -> Self {
        let endpoints = settings.endpoints.clone();
        Self {
            tokens: TokenManager::new(store, Arc::clone(&http), settings),
            http,
            endpoints,
        }
    }

    /// Replace the time source used for token expiry checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.tokens = self.tokens.with_clock(clock);
        self
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    /// Create a service for an account id or loaded record
    ///
    /// Token failures propagate unchanged; no provider call is made unless
    /// a valid access token was obtained.
    pub fn create_email_service_from_account(
        &self,
        account: impl Into<AccountRef>,
    ) -> Result<Box<dyn EmailService>> {
        let record = match account.into() {
            AccountRef::Record(record) => record,
            AccountRef::Id(account_id) => self
                .tokens
                .store()
                .find_account(&account_id)?
                .ok_or(MailError::AccountNotFound { account_id })?,
        };

        let provider = record.provider;
        let account_id = record.id.clone();
        let access_token = self.tokens.get_valid_access_token(record)?;
        log::debug!("Created {} service for account {}", provider, account_id);

        Ok(create_email_service(
            provider,
            Arc::clone(&self.http),
            access_token,
            &self.endpoints,
        ))
    }
}
