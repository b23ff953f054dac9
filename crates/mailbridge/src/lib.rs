//! Mailbridge - provider-agnostic email access
//!
//! This crate provides one mailbox operation set over Gmail and Outlook:
//! - Domain models shared by both providers
//! - OAuth access token refresh with per-account persistence
//! - Gmail REST and Microsoft Graph clients behind [`EmailService`]
//! - Header, body and unsubscribe-link parsing
//!
//! All I/O is synchronous; async hosts should call into it from a blocking
//! worker.

pub mod auth;
pub mod compose;
pub mod config;
pub mod error;
pub mod factory;
pub mod gmail;
pub mod http;
pub mod models;
pub mod outlook;
pub mod parse;
pub mod service;
pub mod storage;

pub use auth::{Clock, SystemClock, TokenManager};
pub use config::{MailSettings, OAuthClient, ProviderEndpoints};
pub use error::{MailError, Result};
pub use factory::{EmailServiceFactory, create_email_service};
pub use gmail::GmailService;
pub use http::{HttpClient, HttpRequest, HttpResponse, TransportError, UreqClient};
pub use models::{
    AccountCredentials, AccountRef, Attachment, AttachmentContent, EmailAddress, EmailBody,
    EmailFolder, EmailListItem, EmailMessage, FolderType, ForwardParams, ListEmailsParams,
    ListEmailsResponse, Provider, ReplyParams, SendEmailParams, SendReceipt, TokenUpdate,
};
pub use outlook::OutlookService;
pub use service::EmailService;
pub use storage::{CredentialStore, InMemoryCredentialStore, SqliteCredentialStore};
