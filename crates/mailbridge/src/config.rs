//! Configuration loading for provider services
//!
//! OAuth client credentials are resolved per provider, in order of priority:
//! 1. Compile-time embedded credentials (for production builds)
//! 2. JSON settings file (~/.config/mailbridge/mailbridge.json)
//! 3. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::MailError;
use crate::models::Provider;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth client registration used for token refresh
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn non_empty(client_id: &str, client_secret: &str) -> Option<Self> {
        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }
        Some(Self::new(client_id, client_secret))
    }
}

/// Base URLs for provider APIs and token endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub gmail_api: String,
    pub graph_api: String,
    pub google_token: String,
    pub microsoft_token: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            gmail_api: "https://gmail.googleapis.com/gmail/v1".to_string(),
            graph_api: "https://graph.microsoft.com/v1.0".to_string(),
            google_token: "https://oauth2.googleapis.com/token".to_string(),
            microsoft_token: "https://login.microsoftonline.com/common/oauth2/v2.0/token"
                .to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Point every endpoint at one base URL (mock servers)
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            gmail_api: format!("{}/gmail/v1", base),
            graph_api: format!("{}/v1.0", base),
            google_token: format!("{}/token", base),
            microsoft_token: format!("{}/common/oauth2/v2.0/token", base),
        }
    }

    /// Token endpoint for a provider
    pub fn token_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::Google => &self.google_token,
            Provider::Microsoft => &self.microsoft_token,
        }
    }
}

/// Runtime settings shared by the token manager and provider services
#[derive(Debug, Clone, PartialEq)]
pub struct MailSettings {
    pub google: Option<OAuthClient>,
    pub microsoft: Option<OAuthClient>,
    pub request_timeout: Duration,
    pub endpoints: ProviderEndpoints,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            google: None,
            microsoft: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            endpoints: ProviderEndpoints::default(),
        }
    }
}

/// Settings file layout
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    google: Option<GoogleClientEntry>,
    microsoft: Option<OAuthClient>,
    request_timeout_secs: Option<u64>,
}

/// The Google entry is either a plain client or a Google Cloud Console download
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GoogleClientEntry {
    Direct(OAuthClient),
    Console(GoogleCredentialFile),
}

/// Google Cloud Console credential file format
#[derive(Debug, Deserialize)]
struct GoogleCredentialFile {
    installed: Option<OAuthClient>,
    web: Option<OAuthClient>,
}

impl GoogleCredentialFile {
    fn into_client(self) -> Result<OAuthClient> {
        // Support both "installed" (desktop) and "web" credential types
        self.installed
            .or(self.web)
            .context("Credentials file missing 'installed' or 'web' section")
    }
}

impl GoogleClientEntry {
    fn into_client(self) -> Result<OAuthClient> {
        match self {
            GoogleClientEntry::Direct(client) => Ok(client),
            GoogleClientEntry::Console(file) => file.into_client(),
        }
    }
}

impl MailSettings {
    /// Load settings using compile-time values, then the settings file, then
    /// environment variables
    pub fn load() -> Result<Self> {
        let file: SettingsFile = config::load_settings()?;
        let file_timeout = file.request_timeout_secs.map(Duration::from_secs);
        let from_file = Self::from_file_entries(file)?;
        let env = Self::from_env();

        Ok(Self {
            google: Self::compile_time_client(Provider::Google)
                .or(from_file.google)
                .or(env.google),
            microsoft: Self::compile_time_client(Provider::Microsoft)
                .or(from_file.microsoft)
                .or(env.microsoft),
            request_timeout: file_timeout.unwrap_or(env.request_timeout),
            endpoints: ProviderEndpoints::default(),
        })
    }

    /// Client credentials embedded at compile time.
    /// Build with: GOOGLE_CLIENT_ID=xxx GOOGLE_CLIENT_SECRET=yyy cargo build --release
    pub fn compile_time_client(provider: Provider) -> Option<OAuthClient> {
        let (client_id, client_secret) = match provider {
            Provider::Google => (
                option_env!("GOOGLE_CLIENT_ID")?,
                option_env!("GOOGLE_CLIENT_SECRET")?,
            ),
            Provider::Microsoft => (
                option_env!("MICROSOFT_CLIENT_ID")?,
                option_env!("MICROSOFT_CLIENT_SECRET")?,
            ),
        };
        OAuthClient::non_empty(client_id, client_secret)
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file: SettingsFile = config::load_json_file(path)?;
        Self::from_file_entries(file)
    }

    /// Parse settings from a JSON string in the settings file format
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SettingsFile =
            serde_json::from_str(json).context("Failed to parse settings JSON")?;
        Self::from_file_entries(file)
    }

    fn from_file_entries(file: SettingsFile) -> Result<Self> {
        let google = file.google.map(GoogleClientEntry::into_client).transpose()?;

        Ok(Self {
            google,
            microsoft: file.microsoft,
            request_timeout: file
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            endpoints: ProviderEndpoints::default(),
        })
    }

    /// Load settings from environment variables; unset values stay empty
    pub fn from_env() -> Self {
        let client = |id_var: &str, secret_var: &str| {
            let client_id = std::env::var(id_var).ok()?;
            let client_secret = std::env::var(secret_var).ok()?;
            OAuthClient::non_empty(&client_id, &client_secret)
        };

        let request_timeout = std::env::var("MAILBRIDGE_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Self {
            google: client("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            microsoft: client("MICROSOFT_CLIENT_ID", "MICROSOFT_CLIENT_SECRET"),
            request_timeout,
            endpoints: ProviderEndpoints::default(),
        }
    }

    /// Get the settings file path (~/.config/mailbridge/mailbridge.json by default)
    pub fn default_settings_path() -> Option<PathBuf> {
        config::settings_path()
    }

    pub fn with_client(mut self, provider: Provider, client: OAuthClient) -> Self {
        match provider {
            Provider::Google => self.google = Some(client),
            Provider::Microsoft => self.microsoft = Some(client),
        }
        self
    }

    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// OAuth client for a provider, or a configuration error naming it
    pub fn oauth_client(&self, provider: Provider) -> crate::error::Result<&OAuthClient> {
        let client = match provider {
            Provider::Google => self.google.as_ref(),
            Provider::Microsoft => self.microsoft.as_ref(),
        };
        client.ok_or_else(|| MailError::Config {
            message: format!("No OAuth client configured for {}", provider),
        })
    }
}
