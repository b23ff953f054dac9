//! Gmail API HTTP client
//!
//! Implements the unified operation set on top of Gmail REST v1.
//! Uses synchronous HTTP through the injected [`HttpClient`] to be
//! executor-agnostic.

use base64::prelude::*;
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use std::sync::{Arc, OnceLock};

use super::api::{
    AttachmentBody, GmailMessage, GmailThread, ListLabelsResponse, ListMessagesResponse,
    ModifyRequest, ProfileResponse, SendRequest, SendResponse,
};
use super::mime::OutgoingMessage;
use super::normalize::{
    collect_attachments, find_attachment, normalize_label, normalize_list_item, normalize_message,
};
use crate::compose;
use crate::config::ProviderEndpoints;
use crate::error::{MailError, Result};
use crate::http::{self, HttpClient, HttpRequest};
use crate::models::{
    Attachment, AttachmentContent, EmailAddress, EmailFolder, EmailMessage, ForwardParams, ListEmailsParams,
    ListEmailsResponse, Provider, ReplyParams, SendEmailParams, SendReceipt, gmail_labels,
};
use crate::service::EmailService;

/// Headers requested for list items
const LIST_METADATA_HEADERS: &[&str] = &["From", "Subject", "Date", "List-Unsubscribe"];

/// Gmail caps `maxResults` at 500
const MAX_PAGE_SIZE: u32 = 500;

/// Gmail mailbox service for one account
pub struct GmailService {
    http: Arc<dyn HttpClient>,
    access_token: String,
    base_url: String,
    /// Mailbox address, looked up on first send
    sender: OnceLock<EmailAddress>,
}

impl GmailService {
    /// Create a service for an already-valid access token
    pub fn new(http: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http,
            access_token: access_token.into(),
            base_url: ProviderEndpoints::default().gmail_api,
            sender: OnceLock::new(),
        }
    }

    /// Override the Gmail API base URL (`.../gmail/v1`)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/users/me/{}", self.base_url, path)
    }

    fn send(&self, operation: &'static str, resource: &str, request: HttpRequest) -> Result<http::HttpResponse> {
        http::send_checked(
            self.http.as_ref(),
            Provider::Google,
            operation,
            resource,
            request.bearer_auth(&self.access_token),
        )
    }

    fn get_json<T: DeserializeOwned>(&self, operation: &'static str, resource: &str, url: String) -> Result<T> {
        let response = self.send(operation, resource, HttpRequest::get(url))?;
        http::decode(operation, &response)
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        resource: &str,
        url: String,
        body: serde_json::Value,
    ) -> Result<T> {
        let response = self.send(operation, resource, HttpRequest::post(url).json(body))?;
        http::decode(operation, &response)
    }

    /// Fetch a message in the given format
    fn fetch_message(
        &self,
        operation: &'static str,
        id: &str,
        format: &str,
        metadata_headers: &[&str],
    ) -> Result<GmailMessage> {
        let mut url = self.url(&format!(
            "messages/{}?format={}",
            urlencoding::encode(id),
            format
        ));
        for header in metadata_headers {
            url.push_str(&format!("&metadataHeaders={}", urlencoding::encode(header)));
        }
        self.get_json(operation, id, url)
    }

    fn modify_labels(&self, operation: &'static str, id: &str, add: &[&str], remove: &[&str]) -> Result<()> {
        let request = ModifyRequest {
            add_label_ids: add.iter().map(|l| l.to_string()).collect(),
            remove_label_ids: remove.iter().map(|l| l.to_string()).collect(),
        };
        let body = serde_json::to_value(&request).map_err(|e| MailError::decode(operation, e))?;
        let url = self.url(&format!("messages/{}/modify", urlencoding::encode(id)));

        self.send(operation, id, HttpRequest::post(url).json(body))?;
        log::info!("Gmail {}: message {}", operation, id);
        Ok(())
    }

    fn sender(&self, operation: &'static str) -> Result<&EmailAddress> {
        if let Some(sender) = self.sender.get() {
            return Ok(sender);
        }
        let profile: ProfileResponse = self.get_json(operation, "", self.url("profile"))?;
        Ok(self.sender.get_or_init(|| EmailAddress::new(profile.email_address)))
    }

    fn send_raw(&self, operation: &'static str, message: &OutgoingMessage<'_>, thread_id: Option<&str>) -> Result<SendReceipt> {
        let raw = message.to_raw(self.sender(operation)?)?;
        let body = serde_json::to_value(SendRequest {
            raw: &raw,
            thread_id,
        })
        .map_err(|e| MailError::decode(operation, e))?;

        let sent: SendResponse = self.post_json(operation, "", self.url("messages/send"), body)?;
        log::info!("Gmail {}: sent message {}", operation, sent.id);
        Ok(SendReceipt::with_id(sent.id))
    }
}

impl EmailService for GmailService {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn list_emails(&self, params: &ListEmailsParams) -> Result<ListEmailsResponse> {
        let max_results = params.max_results.clamp(1, MAX_PAGE_SIZE);
        let mut url = self.url(&format!("messages?maxResults={}", max_results));
        if let Some(token) = &params.page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }
        if let Some(query) = params.query.as_deref().filter(|q| !q.is_empty()) {
            url.push_str(&format!("&q={}", urlencoding::encode(query)));
        }
        if let Some(folder_id) = &params.folder_id {
            url.push_str(&format!("&labelIds={}", urlencoding::encode(folder_id)));
        }

        let list: ListMessagesResponse = self.get_json("list_emails", "", url)?;
        let refs = list.messages.unwrap_or_default();

        // Fetch metadata in parallel; collect keeps list order
        let messages = refs
            .par_iter()
            .map(|r| {
                self.fetch_message("list_emails", &r.id, "metadata", LIST_METADATA_HEADERS)
                    .map(|msg| normalize_list_item(&msg))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ListEmailsResponse {
            messages,
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    fn get_email(&self, id: &str) -> Result<EmailMessage> {
        let msg = self.fetch_message("get_email", id, "full", &[])?;
        Ok(normalize_message(&msg))
    }

    fn get_thread(&self, thread_id: &str) -> Result<Vec<EmailMessage>> {
        let url = self.url(&format!(
            "threads/{}?format=full",
            urlencoding::encode(thread_id)
        ));
        let thread: GmailThread = self.get_json("get_thread", thread_id, url)?;

        let mut messages: Vec<EmailMessage> = thread.messages.iter().map(normalize_message).collect();
        messages.sort_by_key(|m| m.received_at);
        Ok(messages)
    }

    fn send_email(&self, params: &SendEmailParams) -> Result<SendReceipt> {
        let message = OutgoingMessage {
            to: &params.to,
            cc: &params.cc,
            bcc: &params.bcc,
            subject: &params.subject,
            body: Some(&params.body),
            ..Default::default()
        };
        self.send_raw("send_email", &message, None)
    }

    fn delete_email(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("messages/{}/trash", urlencoding::encode(id)));
        self.send("delete_email", id, HttpRequest::post(url))?;
        log::info!("Gmail delete_email: moved message {} to trash", id);
        Ok(())
    }

    fn mark_as_read(&self, id: &str) -> Result<()> {
        self.modify_labels("mark_as_read", id, &[], &[gmail_labels::UNREAD])
    }

    fn mark_as_unread(&self, id: &str) -> Result<()> {
        self.modify_labels("mark_as_unread", id, &[gmail_labels::UNREAD], &[])
    }

    fn star(&self, id: &str) -> Result<()> {
        self.modify_labels("star", id, &[gmail_labels::STARRED], &[])
    }

    fn unstar(&self, id: &str) -> Result<()> {
        self.modify_labels("unstar", id, &[], &[gmail_labels::STARRED])
    }

    fn list_folders(&self) -> Result<Vec<EmailFolder>> {
        let labels: ListLabelsResponse = self.get_json("list_folders", "", self.url("labels"))?;
        Ok(labels.labels.iter().filter_map(normalize_label).collect())
    }

    fn move_to_folder(&self, id: &str, folder_id: &str) -> Result<()> {
        let msg = self.fetch_message("move_to_folder", id, "minimal", &[])?;

        // Category and state labels survive a move; every other label is
        // replaced by the target
        let remove: Vec<&str> = msg
            .labels()
            .iter()
            .map(String::as_str)
            .filter(|label| *label != folder_id)
            .filter(|label| {
                !label.starts_with(gmail_labels::CATEGORY_PREFIX)
                    && !gmail_labels::STATE_LABELS.contains(label)
            })
            .collect();

        self.modify_labels("move_to_folder", id, &[folder_id], &remove)
    }

    fn list_attachments(&self, id: &str) -> Result<Vec<Attachment>> {
        let msg = self.fetch_message("list_attachments", id, "full", &[])?;
        Ok(msg.payload.as_ref().map(collect_attachments).unwrap_or_default())
    }

    fn get_attachment(&self, id: &str, attachment_id: &str) -> Result<AttachmentContent> {
        let msg = self.fetch_message("get_attachment", id, "full", &[])?;
        let mut attachment = find_attachment(msg.payload.as_ref(), attachment_id);

        let url = self.url(&format!(
            "messages/{}/attachments/{}",
            urlencoding::encode(id),
            urlencoding::encode(attachment_id)
        ));
        let content: AttachmentBody = self.get_json("get_attachment", attachment_id, url)?;

        if let Some(size) = content.size {
            attachment.size = size;
        }

        Ok(AttachmentContent {
            attachment,
            data: content
                .data
                .as_deref()
                .map(to_standard_base64)
                .unwrap_or_default(),
        })
    }

    fn reply(&self, id: &str, params: &ReplyParams) -> Result<SendReceipt> {
        let raw = self.fetch_message("reply", id, "full", &[])?;
        let original = normalize_message(&raw);

        let to = compose::reply_recipients(&original, params.reply_all);
        let subject = compose::reply_subject(&original.subject);

        // Thread on the RFC 822 Message-ID; fall back to the Gmail id
        let message_id = raw.header("Message-ID").unwrap_or(id).trim();
        let references = match raw.header("References").map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, message_id),
            _ => message_id.to_string(),
        };

        let message = OutgoingMessage {
            to: &to,
            subject: &subject,
            body: Some(&params.body),
            in_reply_to: Some(message_id),
            references: Some(&references),
            ..Default::default()
        };
        self.send_raw("reply", &message, original.thread_id.as_deref())
    }

    fn forward(&self, id: &str, params: &ForwardParams) -> Result<SendReceipt> {
        let original = self.get_email(id)?;

        let subject = compose::forward_subject(&original.subject);
        let body = compose::forward_body(&original, params.body.as_ref());

        let message = OutgoingMessage {
            to: &params.to,
            subject: &subject,
            body: Some(&body),
            ..Default::default()
        };
        self.send_raw("forward", &message, None)
    }
}

/// Gmail returns attachment data in the URL-safe alphabet
fn to_standard_base64(data: &str) -> String {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    match BASE64_URL_SAFE_NO_PAD.decode(compact.trim_end_matches('=')) {
        Ok(bytes) => BASE64_STANDARD.encode(bytes),
        Err(e) => {
            log::warn!("Attachment data is not valid base64url ({}); passing through", e);
            compact.replace('-', "+").replace('_', "/")
        }
    }
}
