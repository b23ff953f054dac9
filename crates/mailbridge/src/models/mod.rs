//! Domain models shared by every provider

mod account;
mod address;
mod folder;
mod message;

pub use account::{AccountCredentials, AccountRef, Provider, TokenUpdate, UnknownProvider};
pub use address::{EmailAddress, parse_email_address, parse_email_addresses};
pub use folder::{EmailFolder, FolderType, gmail_labels};
pub use message::{
    Attachment, AttachmentContent, DEFAULT_PAGE_SIZE, EmailBody, EmailListItem, EmailMessage,
    ForwardParams, ListEmailsParams, ListEmailsResponse, NO_SUBJECT, ReplyParams, SendEmailParams,
    SendReceipt, subject_or_placeholder,
};
