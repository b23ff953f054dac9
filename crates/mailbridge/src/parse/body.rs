//! Body extraction from nested MIME part trees

use base64::prelude::*;

use crate::models::EmailBody;

/// A node in a provider's nested message part tree
pub trait ContentPart: Sized {
    fn mime_type(&self) -> Option<&str>;
    fn filename(&self) -> Option<&str>;
    /// Encoded inline content (URL-safe base64)
    fn body_data(&self) -> Option<&str>;
    fn children(&self) -> &[Self];
}

/// Extract plain text and HTML bodies from a part tree
///
/// Walks depth-first; the first `text/plain` part populates `text` and the
/// first `text/html` part populates `html`. When the tree holds no typed
/// text part but the root carries inline data, that data becomes `text`.
pub fn extract_body<P: ContentPart>(root: &P) -> EmailBody {
    let mut body = EmailBody::default();
    collect_body(root, &mut body);

    if body.is_empty()
        && root.children().is_empty()
        && let Some(data) = root.body_data().filter(|d| !d.is_empty())
    {
        body.text = decode_base64url(data);
    }

    body
}

fn collect_body<P: ContentPart>(part: &P, body: &mut EmailBody) {
    if body.text.is_some() && body.html.is_some() {
        return;
    }

    let data = part.body_data().filter(|d| !d.is_empty());
    match (mime_essence(part.mime_type()).as_deref(), data) {
        (Some("text/plain"), Some(data)) if body.text.is_none() => {
            body.text = decode_base64url(data);
        }
        (Some("text/html"), Some(data)) if body.html.is_none() => {
            body.html = decode_base64url(data);
        }
        _ => {}
    }

    for child in part.children() {
        collect_body(child, body);
    }
}

/// Lower-cased mime type without parameters (`text/plain; charset=utf-8` -> `text/plain`)
fn mime_essence(mime_type: Option<&str>) -> Option<String> {
    mime_type.map(|m| {
        m.split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    })
}

/// True if any part in the tree, root included, carries a non-empty filename
pub fn check_has_attachments<P: ContentPart>(part: &P) -> bool {
    part.filename().is_some_and(|f| !f.is_empty())
        || part.children().iter().any(check_has_attachments)
}

/// Decode base64-encoded body data
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple
/// decoders. Invalid UTF-8 sequences are replaced rather than rejected.
pub fn decode_base64url(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    for decoder in decoders {
        if let Ok(decoded) = decoder.decode(&compact) {
            return Some(String::from_utf8_lossy(&decoded).into_owned());
        }
    }

    log::warn!("Failed to decode base64 body content ({} bytes)", data.len());
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Part {
        mime: Option<&'static str>,
        filename: Option<&'static str>,
        data: Option<String>,
        parts: Vec<Part>,
    }

    impl ContentPart for Part {
        fn mime_type(&self) -> Option<&str> {
            self.mime
        }
        fn filename(&self) -> Option<&str> {
            self.filename
        }
        fn body_data(&self) -> Option<&str> {
            self.data.as_deref()
        }
        fn children(&self) -> &[Self] {
            &self.parts
        }
    }

    fn leaf(mime: &'static str, content: &str) -> Part {
        Part {
            mime: Some(mime),
            data: Some(BASE64_URL_SAFE_NO_PAD.encode(content)),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_simple_text_body() {
        let body = extract_body(&leaf("text/plain", "Hello, world!"));
        assert_eq!(body.text.as_deref(), Some("Hello, world!"));
        assert!(body.html.is_none());
    }

    #[test]
    fn test_extract_nested_alternative() {
        let root = Part {
            mime: Some("multipart/mixed"),
            parts: vec![
                Part {
                    mime: Some("multipart/alternative"),
                    parts: vec![
                        leaf("text/plain; charset=\"UTF-8\"", "plain version"),
                        leaf("text/html", "<p>html version</p>"),
                    ],
                    ..Default::default()
                },
                Part {
                    mime: Some("application/pdf"),
                    filename: Some("report.pdf"),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let body = extract_body(&root);
        assert_eq!(body.text.as_deref(), Some("plain version"));
        assert_eq!(body.html.as_deref(), Some("<p>html version</p>"));
        assert!(check_has_attachments(&root));
    }

    #[test]
    fn test_first_match_wins() {
        let root = Part {
            mime: Some("multipart/mixed"),
            parts: vec![leaf("text/plain", "first"), leaf("text/plain", "second")],
            ..Default::default()
        };
        assert_eq!(extract_body(&root).text.as_deref(), Some("first"));
    }

    #[test]
    fn test_untyped_root_data_falls_back_to_text() {
        let root = Part {
            data: Some(BASE64_URL_SAFE_NO_PAD.encode("raw")),
            ..Default::default()
        };
        assert_eq!(extract_body(&root).text.as_deref(), Some("raw"));
    }

    #[test]
    fn test_no_attachments() {
        let root = Part {
            mime: Some("multipart/alternative"),
            parts: vec![leaf("text/plain", "a"), leaf("text/html", "b")],
            ..Default::default()
        };
        assert!(!check_has_attachments(&root));

        let root = Part {
            filename: Some(""),
            ..Default::default()
        };
        assert!(!check_has_attachments(&root));
    }

    #[test]
    fn test_decode_base64_variants() {
        // URL-safe alphabet with and without padding
        assert_eq!(decode_base64url("SGk_").as_deref(), Some("Hi?"));
        assert_eq!(decode_base64url("SGVsbG8=").as_deref(), Some("Hello"));
        assert_eq!(decode_base64url("SGVsbG8").as_deref(), Some("Hello"));
        // Standard alphabet
        assert_eq!(decode_base64url("SGk/").as_deref(), Some("Hi?"));
        assert!(decode_base64url("***").is_none());
    }

    #[test]
    fn test_decode_lossy_utf8() {
        let encoded = BASE64_URL_SAFE_NO_PAD.encode([0x48, 0x69, 0xff]);
        assert_eq!(decode_base64url(&encoded).as_deref(), Some("Hi\u{fffd}"));
    }
}
