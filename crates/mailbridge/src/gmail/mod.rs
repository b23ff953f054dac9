//! Gmail API integration
//!
//! This module provides:
//! - Gmail REST v1 client implementing [`EmailService`](crate::EmailService)
//! - RFC 822 message construction for send, reply and forward
//! - Response normalization to domain models

mod client;
mod mime;
mod normalize;

pub use client::GmailService;
pub use mime::OutgoingMessage;
pub use normalize::{normalize_list_item, normalize_message};

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    use crate::parse::ContentPart;

    /// Response from listing messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: Option<String>,
    }

    /// Message from Gmail API (`full`, `metadata` or `minimal` format)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        pub thread_id: Option<String>,
        pub label_ids: Option<Vec<String>>,
        pub snippet: Option<String>,
        /// Milliseconds since epoch, as a decimal string
        pub internal_date: Option<String>,
        pub payload: Option<MessagePart>,
    }

    impl GmailMessage {
        pub fn labels(&self) -> &[String] {
            self.label_ids.as_deref().unwrap_or_default()
        }

        pub fn has_label(&self, label: &str) -> bool {
            self.labels().iter().any(|l| l == label)
        }

        /// Value of a top-level header, matched case-insensitively
        pub fn header(&self, name: &str) -> Option<&str> {
            self.payload.as_ref()?.header(name)
        }
    }

    /// A conversation with its messages
    #[derive(Debug, Deserialize)]
    pub struct GmailThread {
        pub id: String,
        #[serde(default)]
        pub messages: Vec<GmailMessage>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Message body (may be base64 encoded)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageBody {
        pub attachment_id: Option<String>,
        pub size: Option<u64>,
        pub data: Option<String>,
    }

    /// Message part; the payload root uses the same shape
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub part_id: Option<String>,
        pub mime_type: Option<String>,
        pub filename: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        #[serde(default)]
        pub parts: Vec<MessagePart>,
    }

    impl MessagePart {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .as_ref()?
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .map(|h| h.value.as_str())
        }

        pub fn attachment_id(&self) -> Option<&str> {
            self.body.as_ref()?.attachment_id.as_deref()
        }
    }

    impl ContentPart for MessagePart {
        fn mime_type(&self) -> Option<&str> {
            self.mime_type.as_deref()
        }

        fn filename(&self) -> Option<&str> {
            self.filename.as_deref()
        }

        fn body_data(&self) -> Option<&str> {
            self.body.as_ref()?.data.as_deref()
        }

        fn children(&self) -> &[Self] {
            &self.parts
        }
    }

    /// Response from listing labels
    #[derive(Debug, Deserialize)]
    pub struct ListLabelsResponse {
        #[serde(default)]
        pub labels: Vec<GmailLabel>,
    }

    /// A Gmail label
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailLabel {
        pub id: String,
        pub name: Option<String>,
        /// "system" or "user"
        #[serde(rename = "type")]
        pub label_type: Option<String>,
        pub messages_total: Option<u32>,
        pub messages_unread: Option<u32>,
    }

    /// Attachment content from `messages.attachments.get`
    #[derive(Debug, Deserialize)]
    pub struct AttachmentBody {
        pub size: Option<u64>,
        pub data: Option<String>,
    }

    /// Response from `users.getProfile`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProfileResponse {
        pub email_address: String,
    }

    /// Request body for `messages.send`
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SendRequest<'a> {
        pub raw: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub thread_id: Option<&'a str>,
    }

    /// Response from `messages.send`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SendResponse {
        pub id: String,
        pub thread_id: Option<String>,
    }

    /// Request body for `messages.modify`
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ModifyRequest {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub add_label_ids: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub remove_label_ids: Vec<String>,
    }
}
