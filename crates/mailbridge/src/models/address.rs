//! Email address model and header parsing

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// An email address with optional display name
///
/// Identity is the address alone, compared case-insensitively. The display
/// name is a hint for rendering and never takes part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "Jane Doe")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address (e.g., "jane@example.com")
    pub address: String,
}

impl EmailAddress {
    /// Create a new email address with just the address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }

    /// Parse an email address from a header value like `"Jane Doe" <jane@example.com>`
    pub fn parse(s: &str) -> Self {
        parse_email_address(s)
    }

    /// Format the email address for display
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.address),
            None => self.address.clone(),
        }
    }
}

impl PartialEq for EmailAddress {
    fn eq(&self, other: &Self) -> bool {
        self.address.eq_ignore_ascii_case(&other.address)
    }
}

impl Eq for EmailAddress {}

impl Hash for EmailAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.to_ascii_lowercase().hash(state);
    }
}

/// Parse a single address header value.
///
/// Accepts `"Name" <addr>`, `Name <addr>`, `<addr>` and bare `addr`. Never
/// fails: input without a usable angle-bracket address is returned trimmed
/// as the address with no name.
pub fn parse_email_address(raw: &str) -> EmailAddress {
    let s = raw.trim();

    if let Some(angle_start) = s.rfind('<')
        && let Some(angle_end) = s.rfind('>')
        && angle_start < angle_end
    {
        let address = s[angle_start + 1..angle_end].trim();
        if !address.is_empty() {
            return EmailAddress {
                name: clean_display_name(&s[..angle_start]),
                address: address.to_string(),
            };
        }
    }

    EmailAddress::new(s)
}

/// Parse a comma-separated address list header.
///
/// Splits naively on every comma, so a quoted display name that itself
/// contains a comma (`"Doe, John" <j@x.com>`) is split into two entries.
/// Existing callers depend on this behavior.
pub fn parse_email_addresses(raw: &str) -> Vec<EmailAddress> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(parse_email_address)
        .collect()
}

/// Strip surrounding quotes and unescape a display name
fn clean_display_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    let name = unquoted.replace("\\\"", "\"").replace("\\\\", "\\");
    let name = name.trim();

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
