//! Microsoft Graph HTTP client
//!
//! Implements the unified operation set on top of Graph v1.0 `/me` mail
//! endpoints. Uses synchronous HTTP through the injected [`HttpClient`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

use super::api::{
    ForwardRequest, GraphAttachment, GraphBody, GraphMailFolder, GraphMessage, GraphPage,
    GraphRecipient, OutgoingMessage, ReplyRequest, SendMailRequest,
};
use super::normalize::{normalize_attachment, normalize_folder, normalize_list_item, normalize_message};
use crate::config::ProviderEndpoints;
use crate::error::{MailError, Result};
use crate::http::{self, HttpClient, HttpRequest, HttpResponse};
use crate::models::{
    Attachment, AttachmentContent, EmailAddress, EmailBody, EmailFolder, EmailMessage,
    ForwardParams, ListEmailsParams, ListEmailsResponse, Provider, ReplyParams, SendEmailParams,
    SendReceipt,
};
use crate::service::EmailService;

const LIST_SELECT: &str = "id,subject,from,receivedDateTime,bodyPreview,isRead,flag,hasAttachments,conversationId,unsubscribeData";

const MESSAGE_SELECT: &str = "id,subject,body,from,toRecipients,ccRecipients,bccRecipients,receivedDateTime,isRead,flag,hasAttachments,conversationId,bodyPreview,parentFolderId,categories,unsubscribeData";

const FOLDER_SELECT: &str = "id,displayName,totalItemCount,unreadItemCount";

const ATTACHMENT_SELECT: &str = "id,name,contentType,size";

/// Graph caps `$top` at 1000 for messages
const MAX_PAGE_SIZE: u32 = 1000;

const FOLDER_PAGE_SIZE: u32 = 100;

/// Upper bound on pages fetched by one collection walk
const MAX_FOLLOWED_PAGES: usize = 100;

/// Outlook mailbox service for one account
pub struct OutlookService {
    http: Arc<dyn HttpClient>,
    access_token: String,
    base_url: String,
}

impl OutlookService {
    /// Create a service for an already-valid access token
    pub fn new(http: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http,
            access_token: access_token.into(),
            base_url: ProviderEndpoints::default().graph_api,
        }
    }

    /// Override the Graph base URL (`.../v1.0`)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/me/{}", self.base_url, path)
    }

    fn message_url(&self, id: &str, suffix: &str) -> String {
        self.url(&format!("messages/{}{}", urlencoding::encode(id), suffix))
    }

    fn send(&self, operation: &'static str, resource: &str, request: HttpRequest) -> Result<HttpResponse> {
        http::send_checked(
            self.http.as_ref(),
            Provider::Microsoft,
            operation,
            resource,
            request.bearer_auth(&self.access_token),
        )
    }

    fn get_json<T: DeserializeOwned>(&self, operation: &'static str, resource: &str, url: String) -> Result<T> {
        let response = self.send(operation, resource, HttpRequest::get(url))?;
        http::decode(operation, &response)
    }

    /// POST or PATCH a JSON body, ignoring the response payload
    fn write_json<B: Serialize>(
        &self,
        operation: &'static str,
        resource: &str,
        request: HttpRequest,
        body: &B,
    ) -> Result<()> {
        let body = serde_json::to_value(body).map_err(|e| MailError::decode(operation, e))?;
        self.send(operation, resource, request.json(body))?;
        Ok(())
    }

    /// Collect every page of a collection, following `@odata.nextLink`
    /// up to [`MAX_FOLLOWED_PAGES`] pages
    fn get_all<T: DeserializeOwned>(&self, operation: &'static str, resource: &str, url: String) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url);
        for _ in 0..MAX_FOLLOWED_PAGES {
            let Some(url) = next.take() else {
                return Ok(items);
            };
            let page: GraphPage<T> = self.get_json(operation, resource, url)?;
            items.extend(page.value);

            // The bearer token goes with every followed link
            next = match page.next_link {
                Some(link) => Some(self.validate_page_token(&link).map_err(|_| {
                    MailError::ProviderRequestFailed {
                        provider: Provider::Microsoft,
                        operation,
                        status: 200,
                        message: format!("nextLink outside the Graph base: {}", link),
                    }
                })?),
                None => None,
            };
        }

        if next.is_some() {
            log::warn!(
                "Outlook {}: stopped after {} pages of {}; {} items collected",
                operation,
                MAX_FOLLOWED_PAGES,
                resource,
                items.len()
            );
        }
        Ok(items)
    }

    /// A page token is a `@odata.nextLink` from an earlier page; anything
    /// outside the Graph base is refused before a request is made
    fn validate_page_token(&self, token: &str) -> Result<String> {
        let invalid = || MailError::InvalidArgument {
            message: "Page token is not a Microsoft Graph next link".to_string(),
        };

        let link = Url::parse(token).map_err(|_| invalid())?;
        let base = Url::parse(&self.base_url).map_err(|_| invalid())?;
        let same_origin = link.scheme() == base.scheme()
            && link.host_str() == base.host_str()
            && link.port_or_known_default() == base.port_or_known_default();
        let base_path = format!("{}/", base.path().trim_end_matches('/'));

        if same_origin && link.path().starts_with(&base_path) {
            Ok(token.to_string())
        } else {
            Err(invalid())
        }
    }

    fn send_reply(&self, operation: &'static str, id: &str, action: &str, body: &EmailBody) -> Result<SendReceipt> {
        let request = ReplyRequest {
            message: OutgoingMessage {
                subject: None,
                body: graph_body(body),
                to_recipients: Vec::new(),
                cc_recipients: Vec::new(),
                bcc_recipients: Vec::new(),
            },
        };
        self.write_json(operation, id, HttpRequest::post(self.message_url(id, action)), &request)?;
        log::info!("Outlook {}: replied to message {}", operation, id);
        Ok(SendReceipt::accepted())
    }
}

impl EmailService for OutlookService {
    fn provider(&self) -> Provider {
        Provider::Microsoft
    }

    fn list_emails(&self, params: &ListEmailsParams) -> Result<ListEmailsResponse> {
        let url = match &params.page_token {
            Some(token) => self.validate_page_token(token)?,
            None => {
                let collection = match &params.folder_id {
                    Some(folder_id) => format!("mailFolders/{}/messages", urlencoding::encode(folder_id)),
                    None => "messages".to_string(),
                };
                let top = params.max_results.clamp(1, MAX_PAGE_SIZE);
                let mut url = self.url(&format!("{}?$select={}&$top={}", collection, LIST_SELECT, top));

                // Graph rejects $orderby combined with $search
                match params.query.as_deref().filter(|q| !q.is_empty()) {
                    Some(query) => {
                        let quoted = format!("\"{}\"", query.replace('"', "\\\""));
                        url.push_str(&format!("&$search={}", urlencoding::encode(&quoted)));
                    }
                    None => url.push_str("&$orderby=receivedDateTime%20desc"),
                }
                url
            }
        };

        let page: GraphPage<GraphMessage> = self.get_json("list_emails", "", url)?;
        Ok(ListEmailsResponse {
            messages: page.value.iter().map(normalize_list_item).collect(),
            next_page_token: page.next_link,
        })
    }

    fn get_email(&self, id: &str) -> Result<EmailMessage> {
        let url = self.message_url(id, &format!("?$select={}", MESSAGE_SELECT));
        let msg: GraphMessage = self.get_json("get_email", id, url)?;
        Ok(normalize_message(&msg))
    }

    fn get_thread(&self, thread_id: &str) -> Result<Vec<EmailMessage>> {
        let filter = format!("conversationId eq '{}'", thread_id.replace('\'', "''"));
        let url = self.url(&format!(
            "messages?$filter={}&$select={}",
            urlencoding::encode(&filter),
            MESSAGE_SELECT
        ));

        let raw: Vec<GraphMessage> = self.get_all("get_thread", thread_id, url)?;
        let mut messages: Vec<EmailMessage> = raw.iter().map(normalize_message).collect();
        messages.sort_by_key(|m| m.received_at);
        Ok(messages)
    }

    fn send_email(&self, params: &SendEmailParams) -> Result<SendReceipt> {
        let request = SendMailRequest {
            message: OutgoingMessage {
                subject: Some(params.subject.clone()),
                body: graph_body(&params.body),
                to_recipients: graph_recipients(&params.to),
                cc_recipients: graph_recipients(&params.cc),
                bcc_recipients: graph_recipients(&params.bcc),
            },
            save_to_sent_items: true,
        };
        self.write_json("send_email", "", HttpRequest::post(self.url("sendMail")), &request)?;
        log::info!("Outlook send_email: accepted for {} recipient(s)", params.to.len());
        Ok(SendReceipt::accepted())
    }

    fn delete_email(&self, id: &str) -> Result<()> {
        self.send("delete_email", id, HttpRequest::delete(self.message_url(id, "")))?;
        log::info!("Outlook delete_email: deleted message {}", id);
        Ok(())
    }

    fn mark_as_read(&self, id: &str) -> Result<()> {
        let body = serde_json::json!({ "isRead": true });
        self.write_json("mark_as_read", id, HttpRequest::patch(self.message_url(id, "")), &body)
    }

    fn mark_as_unread(&self, id: &str) -> Result<()> {
        let body = serde_json::json!({ "isRead": false });
        self.write_json("mark_as_unread", id, HttpRequest::patch(self.message_url(id, "")), &body)
    }

    fn star(&self, id: &str) -> Result<()> {
        let body = serde_json::json!({ "flag": { "flagStatus": "flagged" } });
        self.write_json("star", id, HttpRequest::patch(self.message_url(id, "")), &body)
    }

    fn unstar(&self, id: &str) -> Result<()> {
        let body = serde_json::json!({ "flag": { "flagStatus": "notFlagged" } });
        self.write_json("unstar", id, HttpRequest::patch(self.message_url(id, "")), &body)
    }

    fn list_folders(&self) -> Result<Vec<EmailFolder>> {
        let url = self.url(&format!("mailFolders?$select={}&$top={}", FOLDER_SELECT, FOLDER_PAGE_SIZE));
        let folders: Vec<GraphMailFolder> = self.get_all("list_folders", "", url)?;
        Ok(folders.iter().map(normalize_folder).collect())
    }

    fn move_to_folder(&self, id: &str, folder_id: &str) -> Result<()> {
        let body = serde_json::json!({ "destinationId": folder_id });
        self.write_json("move_to_folder", id, HttpRequest::post(self.message_url(id, "/move")), &body)?;
        log::info!("Outlook move_to_folder: message {} -> {}", id, folder_id);
        Ok(())
    }

    fn list_attachments(&self, id: &str) -> Result<Vec<Attachment>> {
        let url = self.message_url(id, &format!("/attachments?$select={}", ATTACHMENT_SELECT));
        let page: GraphPage<GraphAttachment> = self.get_json("list_attachments", id, url)?;
        Ok(page.value.iter().map(normalize_attachment).collect())
    }

    fn get_attachment(&self, id: &str, attachment_id: &str) -> Result<AttachmentContent> {
        let url = self.message_url(
            id,
            &format!("/attachments/{}", urlencoding::encode(attachment_id)),
        );
        let attachment: GraphAttachment = self.get_json("get_attachment", attachment_id, url)?;

        Ok(AttachmentContent {
            attachment: normalize_attachment(&attachment),
            data: attachment.content_bytes.unwrap_or_default(),
        })
    }

    fn reply(&self, id: &str, params: &ReplyParams) -> Result<SendReceipt> {
        let action = if params.reply_all { "/replyAll" } else { "/reply" };
        self.send_reply("reply", id, action, &params.body)
    }

    fn forward(&self, id: &str, params: &ForwardParams) -> Result<SendReceipt> {
        let request = ForwardRequest {
            to_recipients: graph_recipients(&params.to),
            comment: params
                .body
                .as_ref()
                .map(|b| b.preferred_content().to_string())
                .unwrap_or_default(),
        };
        self.write_json("forward", id, HttpRequest::post(self.message_url(id, "/forward")), &request)?;
        log::info!("Outlook forward: message {} to {} recipient(s)", id, params.to.len());
        Ok(SendReceipt::accepted())
    }
}

/// HTML wins when both variants are present
fn graph_body(body: &EmailBody) -> GraphBody {
    let content_type = if body.html.is_some() { "HTML" } else { "Text" };
    GraphBody {
        content_type: Some(content_type.to_string()),
        content: Some(body.preferred_content().to_string()),
    }
}

fn graph_recipients(addresses: &[EmailAddress]) -> Vec<GraphRecipient> {
    addresses.iter().map(GraphRecipient::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::TransportError;

    struct Unreachable;

    impl HttpClient for Unreachable {
        fn execute(&self, _request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            Err(TransportError {
                message: "no network in unit tests".to_string(),
                timed_out: false,
            })
        }
    }

    fn service() -> OutlookService {
        OutlookService::new(Arc::new(Unreachable), "token")
            .with_base_url("https://graph.microsoft.com/v1.0/")
    }

    #[test]
    fn test_page_token_must_be_graph_next_link() {
        let service = service();
        let link = "https://graph.microsoft.com/v1.0/me/messages?$skip=25";
        assert_eq!(service.validate_page_token(link).unwrap(), link);

        for token in [
            "https://evil.example.com/v1.0/me/messages",
            "http://graph.microsoft.com/v1.0/me/messages",
            "https://graph.microsoft.com/beta/me/messages",
            "not a url",
        ] {
            assert!(matches!(
                service.validate_page_token(token),
                Err(MailError::InvalidArgument { .. })
            ));
        }
    }

    #[test]
    fn test_graph_body_prefers_html() {
        let body = graph_body(&EmailBody {
            text: Some("plain".to_string()),
            html: Some("<b>rich</b>".to_string()),
        });
        assert_eq!(body.content_type.as_deref(), Some("HTML"));
        assert_eq!(body.content.as_deref(), Some("<b>rich</b>"));

        let body = graph_body(&EmailBody::text("plain"));
        assert_eq!(body.content_type.as_deref(), Some("Text"));
    }

    #[test]
    fn test_recipients_serialize_as_graph_shape() {
        let value = serde_json::to_value(graph_recipients(&[
            EmailAddress::with_name("Ann", "ann@example.com"),
            EmailAddress::new("bob@example.com"),
        ]))
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                { "emailAddress": { "name": "Ann", "address": "ann@example.com" } },
                { "emailAddress": { "address": "bob@example.com" } }
            ])
        );
    }
}
