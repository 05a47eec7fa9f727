//! Microsoft Graph mail transport for the shared mailbox.
//!
//! All calls are app-only (`/users/{mailbox}/...`) and carry a bearer token
//! from [`TokenProvider`].

pub mod auth;
pub mod models;

pub use auth::TokenProvider;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::GraphConfig;
use crate::error::TransportError;
use crate::graph::models::{Collection, GraphAttachment, GraphMessage, MailFolder};
use crate::pipeline::types::{Attachment, EmailDetails, EmailMessage, MailTransport};

const MESSAGE_LIST_FIELDS: &str = "id,subject,from,sender,receivedDateTime,body,bodyPreview,hasAttachments";
const MESSAGE_DETAIL_FIELDS: &str =
    "id,subject,body,bodyPreview,from,sender,toRecipients,ccRecipients,conversationId";
const ATTACHMENT_FIELDS: &str = "id,name,contentType,size,isInline";

/// Graph API client bound to one shared mailbox.
pub struct GraphClient {
    api_base: String,
    mailbox: String,
    tokens: TokenProvider,
    client: reqwest::Client,
}

impl GraphClient {
    pub fn new(config: &GraphConfig) -> Self {
        let client = reqwest::Client::new();
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            mailbox: config.mailbox.clone(),
            tokens: TokenProvider::new(config, client.clone()),
            client,
        }
    }

    fn user_url(&self, suffix: &str) -> String {
        format!("{}/users/{}{}", self.api_base, self.mailbox, suffix)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .query(query)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, TransportError> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;
        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Quote a value for an OData string literal.
fn odata_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[async_trait]
impl MailTransport for GraphClient {
    async fn resolve_folder_id(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<String>, TransportError> {
        let url = match parent_id {
            Some(parent) => self.user_url(&format!("/mailFolders/{parent}/childFolders")),
            None => self.user_url("/mailFolders"),
        };
        let query = [
            ("$filter", format!("displayName eq {}", odata_string(name))),
            ("$select", "id,displayName".to_string()),
        ];

        let folders: Collection<MailFolder> = self.get_json(&url, &query).await?;
        if folders.value.len() > 1 {
            warn!(
                folder = %name,
                matches = folders.value.len(),
                "Multiple folders share this name, using the first"
            );
        }

        let id = folders.value.into_iter().next().map(|f| f.id);
        match &id {
            Some(id) => debug!(folder = %name, id = %id, "Resolved folder"),
            None => warn!(folder = %name, parent = ?parent_id, "Folder not found"),
        }
        Ok(id)
    }

    async fn list_unread_messages(
        &self,
        folder_id: &str,
        limit: usize,
    ) -> Result<Vec<EmailMessage>, TransportError> {
        let url = self.user_url(&format!("/mailFolders/{folder_id}/messages"));
        let query = [
            ("$filter", "isRead eq false".to_string()),
            ("$top", limit.to_string()),
            ("$select", MESSAGE_LIST_FIELDS.to_string()),
            ("$orderby", "receivedDateTime desc".to_string()),
        ];

        let messages: Collection<GraphMessage> = self.get_json(&url, &query).await?;
        info!(count = messages.value.len(), folder = %folder_id, "Fetched unread emails");
        Ok(messages.value.into_iter().map(EmailMessage::from).collect())
    }

    async fn list_attachments(&self, message_id: &str) -> Result<Vec<Attachment>, TransportError> {
        let url = self.user_url(&format!("/messages/{message_id}/attachments"));
        let query = [("$select", ATTACHMENT_FIELDS.to_string())];

        let attachments: Collection<GraphAttachment> = self.get_json(&url, &query).await?;
        let attachments: Vec<Attachment> = attachments
            .value
            .into_iter()
            .map(Attachment::from)
            .filter(|a| !a.is_inline)
            .collect();
        debug!(id = %message_id, count = attachments.len(), "Fetched non-inline attachments");
        Ok(attachments)
    }

    async fn move_message(
        &self,
        message_id: &str,
        destination_id: &str,
    ) -> Result<(), TransportError> {
        let url = self.user_url(&format!("/messages/{message_id}/move"));
        let body = serde_json::json!({ "destinationId": destination_id });
        self.post_json(&url, &body).await?;
        debug!(id = %message_id, destination = %destination_id, "Moved message");
        Ok(())
    }

    async fn get_message_details(&self, message_id: &str) -> Result<EmailDetails, TransportError> {
        let url = self.user_url(&format!("/messages/{message_id}"));
        let query = [("$select", MESSAGE_DETAIL_FIELDS.to_string())];

        let message: GraphMessage = self.get_json(&url, &query).await?;
        Ok(message.into_details())
    }
}
