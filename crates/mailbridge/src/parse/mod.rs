//! Provider-independent content parsers
//!
//! These functions never fail: malformed input degrades to an empty or
//! best-effort result.

mod body;
mod unsubscribe;

pub use body::{ContentPart, check_has_attachments, decode_base64url, extract_body};
pub use unsubscribe::{
    UNSUBSCRIBE_KEYWORDS, extract_unsubscribe_url, extract_unsubscribe_url_from_header,
    extract_unsubscribe_url_from_html,
};
