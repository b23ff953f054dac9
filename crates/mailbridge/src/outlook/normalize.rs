//! Graph API response normalization
//!
//! Converts Graph resources to domain models.

use chrono::{DateTime, Utc};

use super::api::{GraphAttachment, GraphBody, GraphMailFolder, GraphMessage, GraphRecipient};
use crate::models::{
    Attachment, EmailAddress, EmailBody, EmailFolder, EmailListItem, EmailMessage, FolderType,
    subject_or_placeholder,
};
use crate::parse::{extract_unsubscribe_url_from_header, extract_unsubscribe_url_from_html};

const FLAGGED: &str = "flagged";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Normalize a message fetched with the list `$select`
pub fn normalize_list_item(msg: &GraphMessage) -> EmailListItem {
    EmailListItem {
        id: msg.id.clone(),
        thread_id: msg.conversation_id.clone(),
        subject: subject_or_placeholder(msg.subject.as_deref()),
        from: sender(msg),
        snippet: msg.body_preview.clone().unwrap_or_default(),
        received_at: received_at(msg),
        is_read: msg.is_read.unwrap_or(false),
        is_starred: is_flagged(msg),
        has_attachments: msg.has_attachments.unwrap_or(false),
        unsubscribe_url: unsubscribe_url(msg, None),
    }
}

/// Normalize a message fetched with the full `$select`
pub fn normalize_message(msg: &GraphMessage) -> EmailMessage {
    let body = msg.body.as_ref().map(normalize_body).unwrap_or_default();
    let unsubscribe_url = unsubscribe_url(msg, body.html.as_deref());

    let labels = msg
        .parent_folder_id
        .iter()
        .chain(msg.categories.iter().flatten())
        .cloned()
        .collect();

    EmailMessage {
        id: msg.id.clone(),
        thread_id: msg.conversation_id.clone(),
        subject: subject_or_placeholder(msg.subject.as_deref()),
        from: sender(msg),
        to: recipients(msg.to_recipients.as_deref()),
        cc: msg.cc_recipients.as_deref().map(|r| recipients(Some(r))),
        bcc: msg.bcc_recipients.as_deref().map(|r| recipients(Some(r))),
        body,
        snippet: msg.body_preview.clone().unwrap_or_default(),
        received_at: received_at(msg),
        is_read: msg.is_read.unwrap_or(false),
        is_starred: is_flagged(msg),
        has_attachments: msg.has_attachments.unwrap_or(false),
        unsubscribe_url,
        labels,
    }
}

pub fn normalize_folder(folder: &GraphMailFolder) -> EmailFolder {
    let name = folder.display_name.clone().unwrap_or_else(|| folder.id.clone());
    EmailFolder {
        id: folder.id.clone(),
        folder_type: FolderType::from_outlook_display_name(&name),
        name,
        unread_count: folder.unread_item_count,
        total_count: folder.total_item_count,
    }
}

pub fn normalize_attachment(attachment: &GraphAttachment) -> Attachment {
    Attachment {
        id: attachment.id.clone(),
        name: attachment.name.clone().unwrap_or_default(),
        content_type: attachment
            .content_type
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        size: attachment.size.unwrap_or(0),
    }
}

/// Convert a recipient; empty display names are dropped
pub fn normalize_recipient(recipient: &GraphRecipient) -> EmailAddress {
    let email = recipient.email_address.as_ref();
    EmailAddress {
        name: email
            .and_then(|e| e.name.clone())
            .filter(|n| !n.trim().is_empty()),
        address: email.and_then(|e| e.address.clone()).unwrap_or_default(),
    }
}

fn sender(msg: &GraphMessage) -> EmailAddress {
    msg.from
        .as_ref()
        .map(normalize_recipient)
        .unwrap_or_else(|| EmailAddress::new(""))
}

fn recipients(list: Option<&[GraphRecipient]>) -> Vec<EmailAddress> {
    list.unwrap_or_default()
        .iter()
        .map(normalize_recipient)
        .collect()
}

fn normalize_body(body: &GraphBody) -> EmailBody {
    let content = body.content.clone().unwrap_or_default();
    match body.content_type.as_deref() {
        Some(kind) if kind.eq_ignore_ascii_case("html") => EmailBody::html(content),
        _ => EmailBody::text(content),
    }
}

fn is_flagged(msg: &GraphMessage) -> bool {
    msg.flag
        .as_ref()
        .and_then(|f| f.flag_status.as_deref())
        .is_some_and(|s| s.eq_ignore_ascii_case(FLAGGED))
}

/// Receive time from `receivedDateTime`, else the epoch
fn received_at(msg: &GraphMessage) -> DateTime<Utc> {
    msg.received_date_time
        .as_deref()
        .and_then(|d| DateTime::parse_from_rfc3339(d.trim()).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// `unsubscribeData` carries the `List-Unsubscribe` entries one per element
fn unsubscribe_url(msg: &GraphMessage, html: Option<&str>) -> Option<String> {
    msg.unsubscribe_data
        .as_ref()
        .filter(|entries| !entries.is_empty())
        .and_then(|entries| extract_unsubscribe_url_from_header(&entries.join(", ")))
        .or_else(|| html.and_then(extract_unsubscribe_url_from_html))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(json: serde_json::Value) -> GraphMessage {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_normalize_list_item() {
        let msg = message(serde_json::json!({
            "id": "AAMk1",
            "subject": "",
            "from": { "emailAddress": { "name": "Jane Doe", "address": "jane@example.com" } },
            "receivedDateTime": "2024-03-01T10:00:00Z",
            "bodyPreview": "Preview text",
            "isRead": true,
            "flag": { "flagStatus": "flagged" },
            "hasAttachments": true,
            "conversationId": "conv-1",
            "unsubscribeData": ["<mailto:leave@example.com>", "<https://example.com/leave>"]
        }));

        let item = normalize_list_item(&msg);
        assert_eq!(item.subject, crate::models::NO_SUBJECT);
        assert_eq!(item.from.name.as_deref(), Some("Jane Doe"));
        assert_eq!(item.thread_id.as_deref(), Some("conv-1"));
        assert_eq!(item.snippet, "Preview text");
        assert_eq!(item.received_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert!(item.is_read);
        assert!(item.is_starred);
        assert!(item.has_attachments);
        assert_eq!(item.unsubscribe_url.as_deref(), Some("https://example.com/leave"));
    }

    #[test]
    fn test_normalize_full_message() {
        let msg = message(serde_json::json!({
            "id": "AAMk2",
            "subject": "Quarterly numbers",
            "from": { "emailAddress": { "name": "", "address": "bob@example.com" } },
            "toRecipients": [
                { "emailAddress": { "name": "Ann", "address": "ann@example.com" } }
            ],
            "ccRecipients": [],
            "body": {
                "contentType": "HTML",
                "content": "<p>Hi</p><a href=\"https://example.com/opt-out\">Unsubscribe</a>"
            },
            "isRead": false,
            "flag": { "flagStatus": "notFlagged" },
            "parentFolderId": "inbox-id",
            "categories": ["Red category"]
        }));

        let email = normalize_message(&msg);
        assert!(email.from.name.is_none());
        assert_eq!(email.to[0].address, "ann@example.com");
        assert_eq!(email.cc.as_deref(), Some(&[][..]));
        assert!(email.bcc.is_none());
        assert!(email.body.text.is_none());
        assert!(email.body.html.as_deref().unwrap().starts_with("<p>Hi</p>"));
        assert!(!email.is_starred);
        assert_eq!(email.labels, vec!["inbox-id", "Red category"]);
        assert_eq!(email.unsubscribe_url.as_deref(), Some("https://example.com/opt-out"));
        assert_eq!(email.received_at, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_text_body() {
        let msg = message(serde_json::json!({
            "id": "AAMk3",
            "body": { "contentType": "text", "content": "plain words" }
        }));
        let email = normalize_message(&msg);
        assert_eq!(email.body.text.as_deref(), Some("plain words"));
        assert!(email.body.html.is_none());
        assert!(email.labels.is_empty());
    }

    #[test]
    fn test_normalize_folder() {
        let folder: GraphMailFolder = serde_json::from_value(serde_json::json!({
            "id": "f1", "displayName": "Sent Items", "unreadItemCount": 0, "totalItemCount": 12
        }))
        .unwrap();
        let folder = normalize_folder(&folder);
        assert_eq!(folder.folder_type, FolderType::Sent);
        assert_eq!(folder.name, "Sent Items");
        assert_eq!(folder.total_count, Some(12));
    }
}
