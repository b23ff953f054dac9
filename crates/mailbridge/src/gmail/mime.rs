//! RFC 822 message construction for `messages.send`

use base64::prelude::*;
use lettre::Message;
use lettre::message::{Mailbox, MultiPart, SinglePart, header};

use crate::error::{MailError, Result};
use crate::models::{EmailAddress, EmailBody};

/// An outbound message ready to be rendered for Gmail
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage<'a> {
    pub to: &'a [EmailAddress],
    pub cc: &'a [EmailAddress],
    pub bcc: &'a [EmailAddress],
    pub subject: &'a str,
    pub body: Option<&'a EmailBody>,
    /// Message-ID of the message being replied to
    pub in_reply_to: Option<&'a str>,
    pub references: Option<&'a str>,
}

impl OutgoingMessage<'_> {
    /// Build the message with `from` as the sender
    ///
    /// The `Bcc` header is kept: Gmail reads recipients from the headers
    /// and strips `Bcc` itself before delivery.
    pub fn build(&self, from: &EmailAddress) -> Result<Message> {
        reject_line_breaks("subject", self.subject)?;

        let mut builder = Message::builder()
            .from(to_mailbox(from)?)
            .subject(self.subject)
            .keep_bcc();
        for address in self.to {
            builder = builder.to(to_mailbox(address)?);
        }
        for address in self.cc {
            builder = builder.cc(to_mailbox(address)?);
        }
        for address in self.bcc {
            builder = builder.bcc(to_mailbox(address)?);
        }
        if let Some(in_reply_to) = self.in_reply_to {
            reject_line_breaks("In-Reply-To", in_reply_to)?;
            builder = builder.in_reply_to(in_reply_to.to_string());
        }
        if let Some(references) = self.references {
            reject_line_breaks("References", references)?;
            builder = builder.references(references.to_string());
        }

        let empty = EmailBody::default();
        let body = self.body.unwrap_or(&empty);
        let message = match (&body.text, &body.html) {
            (Some(text), Some(html)) => builder.multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::plain(text.clone()))
                    .singlepart(html_part(html)),
            ),
            (None, Some(html)) => builder.singlepart(html_part(html)),
            (text, None) => builder.singlepart(SinglePart::plain(text.clone().unwrap_or_default())),
        };

        message.map_err(|e| MailError::InvalidArgument {
            message: format!("cannot build message: {}", e),
        })
    }

    /// Build and encode for the `raw` field of `messages.send`
    pub fn to_raw(&self, from: &EmailAddress) -> Result<String> {
        let message = self.build(from)?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(message.formatted()))
    }
}

fn html_part(html: &str) -> SinglePart {
    SinglePart::builder()
        .header(header::ContentType::TEXT_HTML)
        .body(html.to_string())
}

fn to_mailbox(address: &EmailAddress) -> Result<Mailbox> {
    let email = address.address.parse::<lettre::Address>().map_err(|e| MailError::InvalidArgument {
        message: format!("invalid email address {:?}: {}", address.address, e),
    })?;

    let name = address.name.clone().filter(|n| !n.trim().is_empty());
    if let Some(name) = &name {
        reject_line_breaks("display name", name)?;
    }
    Ok(Mailbox::new(name, email))
}

/// Header values are single-line; a bare CR or LF would start a new header
fn reject_line_breaks(field: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(MailError::InvalidArgument {
            message: format!("{} must not contain line breaks", field),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn me() -> EmailAddress {
        EmailAddress::with_name("Me", "me@example.com")
    }

    /// Formatted message with folded header lines joined back up
    fn render(message: &OutgoingMessage<'_>) -> String {
        let bytes = message.build(&me()).unwrap().formatted();
        String::from_utf8(bytes).unwrap().replace("\r\n ", " ")
    }

    #[test]
    fn test_plain_text_message() {
        let to = [EmailAddress::with_name("Jane Doe", "jane@example.com")];
        let body = EmailBody::text("Hello there");
        let raw = render(&OutgoingMessage {
            to: &to,
            subject: "Hi",
            body: Some(&body),
            ..Default::default()
        });

        assert!(raw.contains("From: Me <me@example.com>\r\n"));
        assert!(raw.contains("Jane Doe"));
        assert!(raw.contains("<jane@example.com>\r\n"));
        assert!(raw.contains("Subject: Hi\r\n"));
        assert!(raw.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(raw.contains("Hello there"));
        assert!(!raw.contains("Cc:"));
        assert!(!raw.contains("Bcc:"));
    }

    #[test]
    fn test_alternative_message_with_recipients() {
        let to = [EmailAddress::new("a@example.com")];
        let cc = [EmailAddress::new("c@example.com")];
        let bcc = [EmailAddress::new("b@example.com")];
        let body = EmailBody {
            text: Some("plain words".to_string()),
            html: Some("<p>rich</p>".to_string()),
        };
        let raw = render(&OutgoingMessage {
            to: &to,
            cc: &cc,
            bcc: &bcc,
            subject: "Both",
            body: Some(&body),
            ..Default::default()
        });

        assert!(raw.contains("Cc: c@example.com\r\n"));
        assert!(raw.contains("Bcc: b@example.com\r\n"));
        assert!(raw.contains("Content-Type: multipart/alternative;"));
        assert!(raw.contains("Content-Type: text/html; charset=utf-8\r\n"));
        let plain = raw.find("plain words").unwrap();
        let rich = raw.find("<p>rich</p>").unwrap();
        assert!(plain < rich);
    }

    #[test]
    fn test_html_only_message_is_single_part() {
        let to = [EmailAddress::new("a@example.com")];
        let body = EmailBody::html("<b>hi</b>");
        let raw = render(&OutgoingMessage {
            to: &to,
            subject: "Html",
            body: Some(&body),
            ..Default::default()
        });

        assert!(raw.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(!raw.contains("multipart"));
    }

    #[test]
    fn test_reply_headers() {
        let to = [EmailAddress::new("a@example.com")];
        let raw = render(&OutgoingMessage {
            to: &to,
            subject: "Re: Hi",
            in_reply_to: Some("<abc@mail.example.com>"),
            references: Some("<root@mail.example.com> <abc@mail.example.com>"),
            ..Default::default()
        });

        assert!(raw.contains("In-Reply-To: <abc@mail.example.com>\r\n"));
        assert!(raw.contains("References: <root@mail.example.com> <abc@mail.example.com>\r\n"));
    }

    #[test]
    fn test_non_ascii_subject_and_name_are_encoded() {
        let to = [EmailAddress::with_name("Zoë", "zoe@example.com")];
        let raw = render(&OutgoingMessage {
            to: &to,
            subject: "Café",
            ..Default::default()
        });

        assert!(raw.to_ascii_lowercase().contains("subject: =?utf-8?"));
        assert!(!raw.contains("Café"));
        assert!(raw.contains("<zoe@example.com>"));
        assert!(!raw.contains("Zoë"));
    }

    #[test]
    fn test_subject_with_line_break_is_rejected() {
        let to = [EmailAddress::new("a@example.com")];
        let message = OutgoingMessage {
            to: &to,
            subject: "Hello\r\nBcc: attacker@example.com",
            ..Default::default()
        };

        let err = message.build(&me()).unwrap_err();
        assert!(matches!(err, MailError::InvalidArgument { .. }));
        assert!(message.to_raw(&me()).is_err());
    }

    #[test]
    fn test_display_name_with_line_break_is_rejected() {
        let to = [EmailAddress::with_name(
            "Jane\nBcc: attacker@example.com",
            "jane@example.com",
        )];
        let message = OutgoingMessage {
            to: &to,
            subject: "Hi",
            ..Default::default()
        };

        assert!(matches!(
            message.build(&me()),
            Err(MailError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_invalid_recipient_address_is_rejected() {
        let to = [EmailAddress::new("not an address")];
        let message = OutgoingMessage {
            to: &to,
            subject: "Hi",
            ..Default::default()
        };

        assert!(matches!(
            message.build(&me()),
            Err(MailError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_raw_is_url_safe_without_padding() {
        let to = [EmailAddress::new("a@example.com")];
        let body = EmailBody::text("??>>??>>");
        let encoded = OutgoingMessage {
            to: &to,
            subject: "??>>",
            body: Some(&body),
            ..Default::default()
        }
        .to_raw(&me())
        .unwrap();

        assert!(!encoded.contains(['=', '+', '/']));
        let decoded = BASE64_URL_SAFE_NO_PAD.decode(&encoded).unwrap();
        assert!(String::from_utf8(decoded).unwrap().contains("To: a@example.com\r\n"));
    }
}
