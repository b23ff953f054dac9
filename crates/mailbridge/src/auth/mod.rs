//! OAuth token lifecycle
//!
//! Keeps per-account access tokens valid by refreshing them against the
//! provider's token endpoint shortly before they expire.

mod clock;
mod token;

pub use clock::{Clock, SystemClock};
pub use token::{MICROSOFT_MAIL_SCOPE, REFRESH_BUFFER_SECS, TokenManager};
