//! Reply and forward composition rules
//!
//! Pure helpers used by services that synthesize reply and forward
//! messages themselves.

use chrono::SecondsFormat;

use crate::models::{EmailAddress, EmailBody, EmailMessage};

const REPLY_PREFIX: &str = "Re:";
const FORWARD_PREFIX: &str = "Fwd:";
const FORWARDED_MARKER: &str = "---------- Forwarded message ---------";

/// Subject for a reply; the `Re:` check is case-sensitive
pub fn reply_subject(subject: &str) -> String {
    if subject.starts_with(REPLY_PREFIX) {
        subject.to_string()
    } else {
        format!("{} {}", REPLY_PREFIX, subject)
    }
}

/// Subject for a forward; the `Fwd:` check is case-sensitive
pub fn forward_subject(subject: &str) -> String {
    if subject.starts_with(FORWARD_PREFIX) {
        subject.to_string()
    } else {
        format!("{} {}", FORWARD_PREFIX, subject)
    }
}

/// Recipients of a reply: the original sender, followed by the original
/// To and Cc recipients when replying to all
pub fn reply_recipients(original: &EmailMessage, reply_all: bool) -> Vec<EmailAddress> {
    let mut recipients = vec![original.from.clone()];
    if reply_all {
        recipients.extend(original.to.iter().cloned());
        recipients.extend(original.cc_or_empty().iter().cloned());
    }
    recipients
}

/// Lines of the forwarded-message header block
pub fn forwarded_header_lines(original: &EmailMessage) -> Vec<String> {
    let to = original
        .to
        .iter()
        .map(|a| a.address.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        String::new(),
        FORWARDED_MARKER.to_string(),
        format!("From: {}", original.from.display()),
        format!(
            "Date: {}",
            original
                .received_at
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
        format!("Subject: {}", original.subject),
        format!("To: {}", to),
        String::new(),
    ]
}

/// The forwarded-message header block as plain text or HTML
pub fn forwarded_header_block(original: &EmailMessage, html: bool) -> String {
    let lines = forwarded_header_lines(original);
    if html {
        lines
            .iter()
            .map(|line| escape_html(line))
            .collect::<Vec<_>>()
            .join("<br>")
    } else {
        lines.join("\r\n")
    }
}

/// Body of a forward: the sender's note, the header block, then the
/// original content, in HTML when the original has HTML
pub fn forward_body(original: &EmailMessage, note: Option<&EmailBody>) -> EmailBody {
    let note = note.map(EmailBody::preferred_content).unwrap_or_default();

    match &original.body.html {
        Some(original_html) => EmailBody::html(format!(
            "{}<br><br>{}{}",
            note,
            forwarded_header_block(original, true),
            original_html
        )),
        None => EmailBody::text(format!(
            "{}\r\n{}{}",
            note,
            forwarded_header_block(original, false),
            original.body.text.as_deref().unwrap_or_default()
        )),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
