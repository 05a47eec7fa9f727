//! Shared types for the sorting pipeline.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SendError, TransportError};

// ── Mail records ────────────────────────────────────────────────────

/// File attached to a message, as reported by the mail transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    /// MIME type; may be empty.
    pub content_type: String,
    pub size_bytes: u64,
    pub is_inline: bool,
}

impl Attachment {
    /// Non-inline attachment with the given name and MIME type.
    pub fn new(name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size_bytes: 0,
            is_inline: false,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }
}

/// Unread message from the shared mailbox.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Opaque transport ID.
    pub id: String,
    pub subject: String,
    /// Full body, HTML or plain text.
    pub body: String,
    /// Short preview, used when `body` is empty.
    pub body_preview: String,
    /// Message-level attachment flag.
    pub has_attachments: bool,
    pub sender_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

impl EmailMessage {
    /// Body used for classification and logging: the full body if non-empty,
    /// otherwise the preview.
    pub fn effective_body(&self) -> &str {
        if self.body.is_empty() {
            &self.body_preview
        } else {
            &self.body
        }
    }
}

/// Message details needed to draft a reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailDetails {
    pub id: String,
    pub subject: String,
    /// Body, falling back to the preview.
    pub body: String,
    /// `from` address, falling back to `sender`.
    pub reply_to_address: Option<String>,
    pub from_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to_recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc_recipients: Vec<String>,
    pub conversation_id: Option<String>,
}

// ── Category ────────────────────────────────────────────────────────

/// Destination of a sorted message. Exactly three folders exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Purchase Orders")]
    PurchaseOrders,
    #[serde(rename = "Quote Requests")]
    QuoteRequests,
    #[serde(rename = "Needs Attention")]
    NeedsAttention,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::NeedsAttention,
        Category::QuoteRequests,
        Category::PurchaseOrders,
    ];

    /// Mailbox folder display name, also written to the log.
    pub fn folder_name(&self) -> &'static str {
        match self {
            Self::PurchaseOrders => "Purchase Orders",
            Self::QuoteRequests => "Quote Requests",
            Self::NeedsAttention => "Needs Attention",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder_name())
    }
}

// ── Outcomes ────────────────────────────────────────────────────────

/// Result of sorting one message.
#[derive(Debug, Clone, Serialize)]
pub struct SortOutcome {
    pub id: String,
    pub subject: String,
    pub category: Category,
    /// Whether the log sink accepted the record.
    pub logged: bool,
    pub moved: bool,
}

/// A message that could not be fully sorted.
#[derive(Debug, Clone, Serialize)]
pub struct SortFailure {
    pub email_id: String,
    pub reason: String,
}

/// Everything that happened in one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub sorted: Vec<SortOutcome>,
    pub failures: Vec<SortFailure>,
}

impl BatchReport {
    /// Number of messages moved to their folder.
    pub fn moved_count(&self) -> usize {
        self.sorted.iter().filter(|o| o.moved).count()
    }

    /// Count of sorted messages per category.
    pub fn count(&self, category: Category) -> usize {
        self.sorted.iter().filter(|o| o.category == category).count()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty() && self.failures.is_empty()
    }
}

/// Result of drafting a reply.
#[derive(Debug, Clone, Serialize)]
pub struct DraftOutcome {
    pub original_message_id: String,
    pub recipient: String,
    pub subject: String,
    /// First 200 characters of the body.
    pub body_preview: String,
    /// Confirmation returned by the sender.
    pub confirmation: String,
}

// ── Collaborator traits ─────────────────────────────────────────────

/// Mail transport: pure I/O against the shared mailbox.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Find a folder by display name, optionally under a parent folder.
    async fn resolve_folder_id(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<String>, TransportError>;

    /// Newest unread messages in a folder, at most `limit`.
    async fn list_unread_messages(
        &self,
        folder_id: &str,
        limit: usize,
    ) -> Result<Vec<EmailMessage>, TransportError>;

    /// Non-inline attachments of a message.
    async fn list_attachments(&self, message_id: &str) -> Result<Vec<Attachment>, TransportError>;

    /// Move a message to another folder.
    async fn move_message(
        &self,
        message_id: &str,
        destination_id: &str,
    ) -> Result<(), TransportError>;

    /// Full details of a single message.
    async fn get_message_details(&self, message_id: &str) -> Result<EmailDetails, TransportError>;
}

/// Outbound reply delivery.
#[async_trait]
pub trait DraftSender: Send + Sync {
    /// Short name for logging (e.g. "simulated", "smtp").
    fn name(&self) -> &str;

    /// Send a reply. Returns a human-readable confirmation.
    async fn send(
        &self,
        subject: &str,
        body: &str,
        recipient: &str,
    ) -> Result<String, SendError>;
}
