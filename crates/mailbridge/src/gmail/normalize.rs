//! Gmail API response normalization
//!
//! Converts Gmail API responses to domain models.

use chrono::{DateTime, TimeZone, Utc};

use super::api::{GmailLabel, GmailMessage, MessagePart};
use crate::models::{
    Attachment, EmailFolder, EmailListItem, EmailMessage, FolderType, gmail_labels,
    parse_email_address, parse_email_addresses, subject_or_placeholder,
};
use crate::parse::{check_has_attachments, extract_body, extract_unsubscribe_url};

const DEFAULT_ATTACHMENT_NAME: &str = "attachment";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Normalize a `metadata`-format message to a list item
pub fn normalize_list_item(msg: &GmailMessage) -> EmailListItem {
    EmailListItem {
        id: msg.id.clone(),
        thread_id: msg.thread_id.clone(),
        subject: subject_or_placeholder(msg.header("Subject")),
        from: parse_email_address(msg.header("From").unwrap_or_default()),
        snippet: snippet(msg),
        received_at: received_at(msg),
        is_read: !msg.has_label(gmail_labels::UNREAD),
        is_starred: msg.has_label(gmail_labels::STARRED),
        has_attachments: list_item_has_attachments(msg),
        unsubscribe_url: extract_unsubscribe_url(msg.header("List-Unsubscribe"), None),
    }
}

/// Metadata responses carry no parts, so a `multipart/mixed` root stands
/// in for the part walk. Inline-only mixed messages count as attachments.
fn list_item_has_attachments(msg: &GmailMessage) -> bool {
    msg.payload.as_ref().is_some_and(|payload| {
        check_has_attachments(payload)
            || payload
                .mime_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("multipart/mixed"))
    })
}

/// Normalize a `full`-format message
pub fn normalize_message(msg: &GmailMessage) -> EmailMessage {
    let body = msg.payload.as_ref().map(extract_body).unwrap_or_default();
    let unsubscribe_url =
        extract_unsubscribe_url(msg.header("List-Unsubscribe"), body.html.as_deref());

    EmailMessage {
        id: msg.id.clone(),
        thread_id: msg.thread_id.clone(),
        subject: subject_or_placeholder(msg.header("Subject")),
        from: parse_email_address(msg.header("From").unwrap_or_default()),
        to: parse_email_addresses(msg.header("To").unwrap_or_default()),
        cc: msg.header("Cc").map(parse_email_addresses),
        bcc: msg.header("Bcc").map(parse_email_addresses),
        body,
        snippet: snippet(msg),
        received_at: received_at(msg),
        is_read: !msg.has_label(gmail_labels::UNREAD),
        is_starred: msg.has_label(gmail_labels::STARRED),
        has_attachments: msg.payload.as_ref().is_some_and(check_has_attachments),
        unsubscribe_url,
        labels: msg.labels().to_vec(),
    }
}

/// Receive time from `internalDate`, then the `Date` header, else the epoch
fn received_at(msg: &GmailMessage) -> DateTime<Utc> {
    msg.internal_date
        .as_deref()
        .and_then(|d| d.trim().parse::<i64>().ok())
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        .or_else(|| {
            msg.header("Date")
                .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
                .map(|d| d.with_timezone(&Utc))
        })
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn snippet(msg: &GmailMessage) -> String {
    msg.snippet
        .as_deref()
        .map(decode_html_entities)
        .unwrap_or_default()
}

/// Decode HTML entities in snippet text
fn decode_html_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Map a label to a folder; other system labels are not folders
pub fn normalize_label(label: &GmailLabel) -> Option<EmailFolder> {
    let folder_type = FolderType::from_gmail_label_id(&label.id);
    let is_user_label = label.label_type.as_deref() == Some("user");
    if folder_type.is_custom() && !is_user_label {
        return None;
    }

    Some(EmailFolder {
        id: label.id.clone(),
        name: label.name.clone().unwrap_or_else(|| label.id.clone()),
        folder_type,
        unread_count: label.messages_unread,
        total_count: label.messages_total,
    })
}

/// All downloadable attachments in a part tree, in document order
pub fn collect_attachments(root: &MessagePart) -> Vec<Attachment> {
    let mut attachments = Vec::new();
    collect_attachments_into(root, &mut attachments);
    attachments
}

fn collect_attachments_into(part: &MessagePart, out: &mut Vec<Attachment>) {
    if let Some(filename) = part.filename.as_deref().filter(|f| !f.is_empty())
        && let Some(attachment_id) = part.attachment_id()
    {
        out.push(Attachment {
            id: attachment_id.to_string(),
            name: filename.to_string(),
            content_type: content_type(part),
            size: part.body.as_ref().and_then(|b| b.size).unwrap_or(0),
        });
    }

    for child in &part.parts {
        collect_attachments_into(child, out);
    }
}

/// Metadata for one attachment id; falls back to generic values when the
/// id does not appear in the tree
pub fn find_attachment(root: Option<&MessagePart>, attachment_id: &str) -> Attachment {
    let part = root.and_then(|r| find_part(r, attachment_id));

    Attachment {
        id: attachment_id.to_string(),
        name: part
            .and_then(|p| p.filename.as_deref())
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_ATTACHMENT_NAME)
            .to_string(),
        content_type: part
            .map(content_type)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        size: part
            .and_then(|p| p.body.as_ref())
            .and_then(|b| b.size)
            .unwrap_or(0),
    }
}

fn find_part<'a>(part: &'a MessagePart, attachment_id: &str) -> Option<&'a MessagePart> {
    if part.attachment_id() == Some(attachment_id) {
        return Some(part);
    }
    part.parts.iter().find_map(|child| find_part(child, attachment_id))
}

fn content_type(part: &MessagePart) -> String {
    part.mime_type
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}
