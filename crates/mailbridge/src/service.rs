//! Unified operation set implemented by every provider

use crate::error::Result;
use crate::models::{
    Attachment, AttachmentContent, EmailFolder, EmailMessage, ForwardParams, ListEmailsParams,
    ListEmailsResponse, Provider, ReplyParams, SendEmailParams, SendReceipt,
};

/// A mailbox reached through one provider's REST API
///
/// Every call is a single blocking request sequence against the provider;
/// the service holds no state between calls beyond its access token.
///
/// Known provider asymmetries callers must tolerate:
/// - `delete_email` moves to Trash on Gmail but deletes permanently on Outlook.
/// - Send-like operations on Outlook return a receipt without an id.
/// - `query` and `labels` use provider-native syntax and meaning.
pub trait EmailService: Send + Sync {
    /// Backend this service talks to
    fn provider(&self) -> Provider;

    /// List one page of messages
    ///
    /// `page_token` must be a `next_page_token` from an earlier page of the
    /// same listing.
    fn list_emails(&self, params: &ListEmailsParams) -> Result<ListEmailsResponse>;

    /// Fetch one full message
    fn get_email(&self, id: &str) -> Result<EmailMessage>;

    /// Fetch every message of a conversation, oldest first
    fn get_thread(&self, thread_id: &str) -> Result<Vec<EmailMessage>>;

    fn send_email(&self, params: &SendEmailParams) -> Result<SendReceipt>;

    fn delete_email(&self, id: &str) -> Result<()>;

    /// Idempotent: marking an already-read message succeeds
    fn mark_as_read(&self, id: &str) -> Result<()>;

    fn mark_as_unread(&self, id: &str) -> Result<()>;

    /// Idempotent: starring a starred message succeeds
    fn star(&self, id: &str) -> Result<()>;

    fn unstar(&self, id: &str) -> Result<()>;

    fn list_folders(&self) -> Result<Vec<EmailFolder>>;

    fn move_to_folder(&self, id: &str, folder_id: &str) -> Result<()>;

    fn list_attachments(&self, id: &str) -> Result<Vec<Attachment>>;

    /// Fetch one attachment; content is standard base64
    fn get_attachment(&self, id: &str, attachment_id: &str) -> Result<AttachmentContent>;

    fn reply(&self, id: &str, params: &ReplyParams) -> Result<SendReceipt>;

    fn forward(&self, id: &str, params: &ForwardParams) -> Result<SendReceipt>;
}
