//! Message models shared by every provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EmailAddress;

/// Subject used when the provider reports none
pub const NO_SUBJECT: &str = "(No Subject)";

/// Message body; at least one of the two variants is normally present
///
/// HTML is passed through as the provider returned it and is not sanitized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl EmailBody {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            html: None,
        }
    }

    pub fn html(html: impl Into<String>) -> Self {
        Self {
            text: None,
            html: Some(html.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.html.is_none()
    }

    /// The content to send when only one variant can be used, HTML first
    pub fn preferred_content(&self) -> &str {
        self.html
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or_default()
    }
}

/// Summary record used for message listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailListItem {
    /// Provider-assigned message id, opaque and unique per account
    pub id: String,
    /// Provider-native conversation key (Gmail threadId, Graph conversationId)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Subject line, never empty
    pub subject: String,
    pub from: EmailAddress,
    /// Plain text preview truncated by the provider
    pub snippet: String,
    pub received_at: DateTime<Utc>,
    pub is_read: bool,
    pub is_starred: bool,
    pub has_attachments: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsubscribe_url: Option<String>,
}

/// A full message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub subject: String,
    pub from: EmailAddress,
    /// Recipients in header order, possibly empty
    pub to: Vec<EmailAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<EmailAddress>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc: Option<Vec<EmailAddress>>,
    pub body: EmailBody,
    pub snippet: String,
    pub received_at: DateTime<Utc>,
    pub is_read: bool,
    pub is_starred: bool,
    pub has_attachments: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsubscribe_url: Option<String>,
    /// Raw provider tags; their meaning differs between providers
    pub labels: Vec<String>,
}

impl EmailMessage {
    /// Summary view of this message
    pub fn to_list_item(&self) -> EmailListItem {
        EmailListItem {
            id: self.id.clone(),
            thread_id: self.thread_id.clone(),
            subject: self.subject.clone(),
            from: self.from.clone(),
            snippet: self.snippet.clone(),
            received_at: self.received_at,
            is_read: self.is_read,
            is_starred: self.is_starred,
            has_attachments: self.has_attachments,
            unsubscribe_url: self.unsubscribe_url.clone(),
        }
    }

    pub fn cc_or_empty(&self) -> &[EmailAddress] {
        self.cc.as_deref().unwrap_or_default()
    }
}

/// Substitute the placeholder for a missing or blank subject; any other
/// subject is kept verbatim
pub fn subject_or_placeholder(subject: Option<&str>) -> String {
    match subject {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => NO_SUBJECT.to_string(),
    }
}

/// Attachment metadata
///
/// The id is only meaningful together with the id of its parent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub content_type: String,
    /// Size in bytes as reported by the provider
    pub size: u64,
}

/// Attachment metadata plus standard base64 content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentContent {
    #[serde(flatten)]
    pub attachment: Attachment,
    pub data: String,
}

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Parameters for listing a page of messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEmailsParams {
    /// Provider-native folder or label id
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default = "default_page_size")]
    pub max_results: u32,
    /// Opaque continuation cursor from a previous page
    #[serde(default)]
    pub page_token: Option<String>,
    /// Query in the provider's native search syntax
    #[serde(default)]
    pub query: Option<String>,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ListEmailsParams {
    fn default() -> Self {
        Self {
            folder_id: None,
            max_results: DEFAULT_PAGE_SIZE,
            page_token: None,
            query: None,
        }
    }
}

/// One page of listed messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEmailsResponse {
    pub messages: Vec<EmailListItem>,
    /// Absent on the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// An outbound message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendEmailParams {
    pub to: Vec<EmailAddress>,
    #[serde(default)]
    pub cc: Vec<EmailAddress>,
    #[serde(default)]
    pub bcc: Vec<EmailAddress>,
    pub subject: String,
    pub body: EmailBody,
}

/// Parameters for replying to a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyParams {
    pub body: EmailBody,
    #[serde(default)]
    pub reply_all: bool,
}

/// Parameters for forwarding a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardParams {
    pub to: Vec<EmailAddress>,
    #[serde(default)]
    pub body: Option<EmailBody>,
}

/// Result of a send-like operation
///
/// Gmail returns the id of the sent message. Microsoft Graph does not report
/// one for `sendMail`, `reply` or `forward`, so the Outlook service returns a
/// receipt with no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub id: Option<String>,
}

impl SendReceipt {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }

    /// Receipt for providers that accept a message without returning its id
    pub fn accepted() -> Self {
        Self { id: None }
    }
}
