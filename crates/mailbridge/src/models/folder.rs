//! Folder model unifying Gmail labels and Outlook mail folders

use serde::{Deserialize, Serialize};

/// Well-known Gmail system label ids
pub mod gmail_labels {
    pub const INBOX: &str = "INBOX";
    pub const SENT: &str = "SENT";
    pub const DRAFTS: &str = "DRAFT";
    pub const TRASH: &str = "TRASH";
    pub const SPAM: &str = "SPAM";
    pub const STARRED: &str = "STARRED";
    pub const IMPORTANT: &str = "IMPORTANT";
    pub const UNREAD: &str = "UNREAD";

    /// Prefix of Gmail's inbox category labels (CATEGORY_PROMOTIONS, ...)
    pub const CATEGORY_PREFIX: &str = "CATEGORY_";

    /// System labels that behave like folders
    pub const FOLDER_LABELS: [&str; 5] = [INBOX, SENT, DRAFTS, TRASH, SPAM];

    /// System labels that carry per-message state rather than location
    pub const STATE_LABELS: [&str; 3] = [UNREAD, STARRED, IMPORTANT];
}

/// Closed set of folder roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderType {
    Inbox,
    Sent,
    Drafts,
    Trash,
    Spam,
    Custom,
}

impl FolderType {
    /// Map a Gmail label id to a folder role
    pub fn from_gmail_label_id(label_id: &str) -> Self {
        match label_id {
            gmail_labels::INBOX => FolderType::Inbox,
            gmail_labels::SENT => FolderType::Sent,
            gmail_labels::DRAFTS => FolderType::Drafts,
            gmail_labels::TRASH => FolderType::Trash,
            gmail_labels::SPAM => FolderType::Spam,
            _ => FolderType::Custom,
        }
    }

    /// Map an Outlook folder display name to a folder role
    ///
    /// Matching ignores case and whitespace, so "Sent Items" and "sentitems"
    /// are both recognised.
    pub fn from_outlook_display_name(display_name: &str) -> Self {
        let key: String = display_name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        match key.as_str() {
            "inbox" => FolderType::Inbox,
            "sentitems" => FolderType::Sent,
            "drafts" => FolderType::Drafts,
            "deleteditems" => FolderType::Trash,
            "junkemail" => FolderType::Spam,
            _ => FolderType::Custom,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, FolderType::Custom)
    }
}

/// A mail folder (Outlook) or label (Gmail)
///
/// Nothing guarantees exactly one folder per non-custom type; whatever the
/// provider reports is surfaced unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailFolder {
    /// Provider-native id
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(rename = "type")]
    pub folder_type: FolderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gmail_label_mapping() {
        assert_eq!(FolderType::from_gmail_label_id("INBOX"), FolderType::Inbox);
        assert_eq!(FolderType::from_gmail_label_id("DRAFT"), FolderType::Drafts);
        assert_eq!(FolderType::from_gmail_label_id("SPAM"), FolderType::Spam);
        assert_eq!(FolderType::from_gmail_label_id("Label_12"), FolderType::Custom);
        assert_eq!(FolderType::from_gmail_label_id("inbox"), FolderType::Custom);
    }

    #[test]
    fn test_outlook_display_name_mapping() {
        assert_eq!(FolderType::from_outlook_display_name("Inbox"), FolderType::Inbox);
        assert_eq!(FolderType::from_outlook_display_name("Sent Items"), FolderType::Sent);
        assert_eq!(FolderType::from_outlook_display_name("sentitems"), FolderType::Sent);
        assert_eq!(FolderType::from_outlook_display_name("Deleted Items"), FolderType::Trash);
        assert_eq!(FolderType::from_outlook_display_name("JUNK EMAIL"), FolderType::Spam);
        assert_eq!(FolderType::from_outlook_display_name("Receipts"), FolderType::Custom);
    }

    #[test]
    fn test_folder_serializes_type_field() {
        let folder = EmailFolder {
            id: "INBOX".to_string(),
            name: "INBOX".to_string(),
            folder_type: FolderType::Inbox,
            unread_count: Some(3),
            total_count: None,
        };
        let json = serde_json::to_value(&folder).unwrap();
        assert_eq!(json["type"], "inbox");
        assert_eq!(json["unreadCount"], 3);
        assert!(json.get("totalCount").is_none());
    }
}
