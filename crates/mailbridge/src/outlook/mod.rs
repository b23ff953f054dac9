//! Microsoft Graph (Outlook) integration
//!
//! This module provides:
//! - Graph v1.0 client implementing [`EmailService`](crate::EmailService)
//! - Response normalization to domain models

mod client;
mod normalize;

pub use client::OutlookService;
pub use normalize::{normalize_list_item, normalize_message};

/// Microsoft Graph request and response types
pub mod api {
    use serde::{Deserialize, Serialize};

    use crate::models::EmailAddress;

    /// One page of a collection response
    #[derive(Debug, Deserialize)]
    pub struct GraphPage<T> {
        #[serde(default = "Vec::new")]
        pub value: Vec<T>,
        #[serde(rename = "@odata.nextLink")]
        pub next_link: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GraphMessage {
        pub id: String,
        pub subject: Option<String>,
        pub from: Option<GraphRecipient>,
        #[serde(rename = "toRecipients")]
        pub to_recipients: Option<Vec<GraphRecipient>>,
        #[serde(rename = "ccRecipients")]
        pub cc_recipients: Option<Vec<GraphRecipient>>,
        #[serde(rename = "bccRecipients")]
        pub bcc_recipients: Option<Vec<GraphRecipient>>,
        pub body: Option<GraphBody>,
        #[serde(rename = "bodyPreview")]
        pub body_preview: Option<String>,
        #[serde(rename = "isRead")]
        pub is_read: Option<bool>,
        #[serde(rename = "hasAttachments")]
        pub has_attachments: Option<bool>,
        #[serde(rename = "conversationId")]
        pub conversation_id: Option<String>,
        #[serde(rename = "parentFolderId")]
        pub parent_folder_id: Option<String>,
        pub categories: Option<Vec<String>>,
        pub flag: Option<GraphFlag>,
        #[serde(rename = "receivedDateTime")]
        pub received_date_time: Option<String>,
        /// `List-Unsubscribe` entries, e.g. `<mailto:...>`
        #[serde(rename = "unsubscribeData")]
        pub unsubscribe_data: Option<Vec<String>>,
    }

    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct GraphRecipient {
        #[serde(rename = "emailAddress")]
        pub email_address: Option<GraphEmailAddress>,
    }

    impl From<&EmailAddress> for GraphRecipient {
        fn from(address: &EmailAddress) -> Self {
            Self {
                email_address: Some(GraphEmailAddress {
                    name: address.name.clone(),
                    address: Some(address.address.clone()),
                }),
            }
        }
    }

    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct GraphEmailAddress {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        pub address: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct GraphBody {
        /// "text" or "html" (case varies)
        #[serde(rename = "contentType")]
        pub content_type: Option<String>,
        pub content: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GraphFlag {
        #[serde(rename = "flagStatus")]
        pub flag_status: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GraphMailFolder {
        pub id: String,
        #[serde(rename = "displayName")]
        pub display_name: Option<String>,
        #[serde(rename = "unreadItemCount")]
        pub unread_item_count: Option<u32>,
        #[serde(rename = "totalItemCount")]
        pub total_item_count: Option<u32>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GraphAttachment {
        pub id: String,
        pub name: Option<String>,
        #[serde(rename = "contentType")]
        pub content_type: Option<String>,
        pub size: Option<u64>,
        /// Standard base64; only present for file attachments
        #[serde(rename = "contentBytes")]
        pub content_bytes: Option<String>,
    }

    /// Message body for `sendMail` and `reply`
    #[derive(Debug, Serialize)]
    pub struct OutgoingMessage {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub subject: Option<String>,
        pub body: GraphBody,
        #[serde(rename = "toRecipients", skip_serializing_if = "Vec::is_empty")]
        pub to_recipients: Vec<GraphRecipient>,
        #[serde(rename = "ccRecipients", skip_serializing_if = "Vec::is_empty")]
        pub cc_recipients: Vec<GraphRecipient>,
        #[serde(rename = "bccRecipients", skip_serializing_if = "Vec::is_empty")]
        pub bcc_recipients: Vec<GraphRecipient>,
    }

    #[derive(Debug, Serialize)]
    pub struct SendMailRequest {
        pub message: OutgoingMessage,
        #[serde(rename = "saveToSentItems")]
        pub save_to_sent_items: bool,
    }

    #[derive(Debug, Serialize)]
    pub struct ReplyRequest {
        pub message: OutgoingMessage,
    }

    #[derive(Debug, Serialize)]
    pub struct ForwardRequest {
        #[serde(rename = "toRecipients")]
        pub to_recipients: Vec<GraphRecipient>,
        pub comment: String,
    }
}
