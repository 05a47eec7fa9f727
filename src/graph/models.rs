//! Graph API wire types and their conversion into pipeline records.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::pipeline::types::{Attachment, EmailDetails, EmailMessage};

/// Collection envelope: `{"value": [...]}`.
#[derive(Debug, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailFolder {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    #[serde(default)]
    pub email_address: Option<EmailAddress>,
}

impl Recipient {
    fn address(&self) -> Option<&str> {
        self.email_address
            .as_ref()
            .and_then(|e| e.address.as_deref())
            .filter(|a| !a.is_empty())
    }

    fn name(&self) -> Option<&str> {
        self.email_address.as_ref().and_then(|e| e.name.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMessage {
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<ItemBody>,
    #[serde(default)]
    pub body_preview: Option<String>,
    #[serde(default)]
    pub has_attachments: Option<bool>,
    #[serde(default)]
    pub from: Option<Recipient>,
    #[serde(default)]
    pub sender: Option<Recipient>,
    #[serde(default)]
    pub received_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to_recipients: Option<Vec<Recipient>>,
    #[serde(default)]
    pub cc_recipients: Option<Vec<Recipient>>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl GraphMessage {
    /// `from` address, falling back to `sender`.
    fn reply_address(&self) -> Option<&Recipient> {
        self.from
            .as_ref()
            .filter(|r| r.address().is_some())
            .or_else(|| self.sender.as_ref().filter(|r| r.address().is_some()))
    }

    fn body_content(&self) -> String {
        self.body
            .as_ref()
            .and_then(|b| b.content.clone())
            .unwrap_or_default()
    }

    pub fn into_details(self) -> EmailDetails {
        let reply = self.reply_address();
        let reply_to_address = reply.and_then(|r| r.address()).map(str::to_string);
        let from_name = reply.and_then(|r| r.name()).map(str::to_string);

        let mut body = self.body_content();
        if body.is_empty() {
            body = self.body_preview.clone().unwrap_or_default();
        }

        let addresses = |list: &Option<Vec<Recipient>>| -> Vec<String> {
            list.iter()
                .flatten()
                .filter_map(|r| r.address().map(str::to_string))
                .collect()
        };

        EmailDetails {
            to_recipients: addresses(&self.to_recipients),
            cc_recipients: addresses(&self.cc_recipients),
            id: self.id,
            subject: self.subject.unwrap_or_default(),
            body,
            reply_to_address,
            from_name,
            conversation_id: self.conversation_id,
        }
    }
}

impl From<GraphMessage> for EmailMessage {
    fn from(msg: GraphMessage) -> Self {
        let sender_address = msg
            .reply_address()
            .and_then(|r| r.address())
            .unwrap_or_default()
            .to_string();
        let body = msg.body_content();

        Self {
            id: msg.id,
            subject: msg.subject.unwrap_or_default(),
            body,
            body_preview: msg.body_preview.unwrap_or_default(),
            has_attachments: msg.has_attachments.unwrap_or(false),
            sender_address,
            received_at: msg.received_date_time,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphAttachment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub is_inline: Option<bool>,
}

impl From<GraphAttachment> for Attachment {
    fn from(att: GraphAttachment) -> Self {
        Self {
            name: att.name.unwrap_or_default(),
            content_type: att.content_type.unwrap_or_default(),
            size_bytes: att.size.unwrap_or(0),
            is_inline: att.is_inline.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_converts_with_from_address() {
        let json = r#"{
            "id": "AAMk1",
            "subject": "PO 4411",
            "body": {"contentType": "html", "content": "<p>Attached</p>"},
            "bodyPreview": "Attached",
            "hasAttachments": true,
            "from": {"emailAddress": {"name": "Buyer", "address": "buyer@customer.com"}},
            "receivedDateTime": "2025-03-04T15:20:00Z"
        }"#;
        let msg: EmailMessage = serde_json::from_str::<GraphMessage>(json).unwrap().into();
        assert_eq!(msg.id, "AAMk1");
        assert_eq!(msg.body, "<p>Attached</p>");
        assert!(msg.has_attachments);
        assert_eq!(msg.sender_address, "buyer@customer.com");
        assert!(msg.received_at.is_some());
    }

    #[test]
    fn message_tolerates_missing_fields() {
        let msg: EmailMessage = serde_json::from_str::<GraphMessage>(r#"{"id": "x"}"#)
            .unwrap()
            .into();
        assert_eq!(msg.subject, "");
        assert_eq!(msg.effective_body(), "");
        assert!(!msg.has_attachments);
        assert_eq!(msg.sender_address, "");
    }

    #[test]
    fn details_fall_back_to_sender_and_preview() {
        let json = r#"{
            "id": "AAMk2",
            "subject": "Order",
            "body": {"contentType": "text", "content": ""},
            "bodyPreview": "Preview text",
            "from": {"emailAddress": {"name": "", "address": ""}},
            "sender": {"emailAddress": {"name": "Assistant", "address": "assistant@customer.com"}},
            "toRecipients": [{"emailAddress": {"address": "csr@example.com"}}],
            "conversationId": "conv-1"
        }"#;
        let details = serde_json::from_str::<GraphMessage>(json)
            .unwrap()
            .into_details();
        assert_eq!(details.body, "Preview text");
        assert_eq!(details.reply_to_address.as_deref(), Some("assistant@customer.com"));
        assert_eq!(details.from_name.as_deref(), Some("Assistant"));
        assert_eq!(details.to_recipients, vec!["csr@example.com"]);
        assert!(details.cc_recipients.is_empty());
        assert_eq!(details.conversation_id.as_deref(), Some("conv-1"));
    }

    #[test]
    fn attachment_defaults() {
        let att: Attachment = serde_json::from_str::<GraphAttachment>(r#"{"name": "a.pdf"}"#)
            .unwrap()
            .into();
        assert_eq!(att.name, "a.pdf");
        assert_eq!(att.content_type, "");
        assert_eq!(att.size_bytes, 0);
        assert!(!att.is_inline);
    }
}
