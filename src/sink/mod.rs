//! Tabular log sink for sort and draft decisions.

pub mod airtable;

pub use airtable::AirtableSink;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::LogSinkError;
use crate::pipeline::types::{Attachment, Category, EmailMessage};

/// Longest content or attachment summary written to the log.
const MAX_FIELD_CHARS: usize = 1000;

/// One row in the decision log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "Email_ID")]
    pub email_id: String,
    #[serde(rename = "From_Email")]
    pub from_address: String,
    #[serde(rename = "Email_Subject")]
    pub subject: String,
    /// Body, cut to 1000 characters.
    #[serde(rename = "Email_Content")]
    pub content: String,
    /// Attachment summary, cut to 1000 characters.
    #[serde(rename = "Email_Attachments")]
    pub attachment_summary: String,
    #[serde(rename = "Attachments_Names")]
    pub attachment_names: String,
    #[serde(rename = "Attachments_Types")]
    pub attachment_types: String,
    #[serde(rename = "PO_Detected")]
    pub po_detected: bool,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Reply_Sent")]
    pub reply_sent: String,
    #[serde(rename = "Notes")]
    pub notes: String,
}

impl LogRecord {
    /// Record for a sorted message.
    pub fn sorted(message: &EmailMessage, attachments: &[Attachment], category: Category) -> Self {
        Self {
            email_id: message.id.clone(),
            from_address: message.sender_address.clone(),
            subject: message.subject.clone(),
            content: truncate_field(message.effective_body()),
            attachment_summary: truncate_field(&summarize_attachments(attachments)),
            attachment_names: attachments
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            attachment_types: attachments
                .iter()
                .map(|a| a.content_type.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            po_detected: category == Category::PurchaseOrders,
            category: category.folder_name().to_string(),
            status: "Sorted".to_string(),
            reply_sent: "No".to_string(),
            notes: String::new(),
        }
    }

    /// Mark that a reply was drafted and sent.
    pub fn with_reply(mut self, notes: impl Into<String>) -> Self {
        self.status = "Drafted".to_string();
        self.reply_sent = "Yes".to_string();
        self.notes = notes.into();
        self
    }
}

/// Cut to 997 characters plus `...` when longer than the field limit.
pub fn truncate_field(text: &str) -> String {
    if text.chars().count() <= MAX_FIELD_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_FIELD_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

/// One line per attachment: `name (type, N bytes)`.
fn summarize_attachments(attachments: &[Attachment]) -> String {
    attachments
        .iter()
        .map(|a| {
            let content_type = if a.content_type.is_empty() {
                "unknown type"
            } else {
                a.content_type.as_str()
            };
            format!("{} ({}, {} bytes)", a.name, content_type, a.size_bytes)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Destination for decision records.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Write one record.
    async fn record(&self, record: &LogRecord) -> Result<(), LogSinkError>;
}

/// Sink used when no log store is configured.
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    fn name(&self) -> &str {
        "noop"
    }

    async fn record(&self, record: &LogRecord) -> Result<(), LogSinkError> {
        info!(
            id = %record.email_id,
            category = %record.category,
            "Log sink not configured, skipping record"
        );
        Ok(())
    }
}
