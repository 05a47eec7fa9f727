//! Purchase-order acknowledgement replies.
//!
//! Finds a PO email among the unread inbox messages and sends the customer a
//! fixed acknowledgement, then records the reply in the decision log.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::SorterConfig;
use crate::error::PipelineError;
use crate::pipeline::rules::{self, ClassificationInput};
use crate::pipeline::types::{
    Category, DraftOutcome, DraftSender, EmailDetails, EmailMessage, MailTransport,
};
use crate::sink::{LogRecord, LogSink};

/// Characters of the reply body kept in `DraftOutcome::body_preview`.
const BODY_PREVIEW_CHARS: usize = 200;

/// Subject used when the original message has none.
const FALLBACK_SUBJECT: &str = "Your purchase order";

/// `Re: <subject>`, without stacking a second prefix.
pub fn reply_subject(original: &str) -> String {
    let trimmed = original.trim();
    if trimmed.is_empty() {
        return format!("Re: {FALLBACK_SUBJECT}");
    }
    let already_reply = trimmed
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"));
    if already_reply {
        trimmed.to_string()
    } else {
        format!("Re: {trimmed}")
    }
}

/// Fixed acknowledgement sent for every purchase order.
pub fn acknowledgement_body(details: &EmailDetails) -> String {
    let greeting = details
        .from_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("there");

    format!(
        "Hello {greeting},\n\n\
         Thank you for your order. We have received your purchase order and \
         are processing it now. An order confirmation will follow shortly.\n\n\
         If anything in the order needs to change, just reply to this email.\n\n\
         Best regards,\n\
         Customer Service"
    )
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

/// Drafts and sends PO acknowledgements.
pub struct PoDrafter {
    transport: Arc<dyn MailTransport>,
    sink: Arc<dyn LogSink>,
    sender: Arc<dyn DraftSender>,
    config: SorterConfig,
}

impl PoDrafter {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        sink: Arc<dyn LogSink>,
        sender: Arc<dyn DraftSender>,
        config: SorterConfig,
    ) -> Self {
        Self {
            transport,
            sink,
            sender,
            config,
        }
    }

    /// First unread inbox message that classifies as a purchase order.
    ///
    /// A message whose attachments cannot be fetched is skipped.
    pub async fn find_po_email(&self) -> Result<Option<EmailMessage>, PipelineError> {
        let messages = self
            .transport
            .list_unread_messages(&self.config.inbox_id, self.config.batch_size)
            .await?;

        for message in messages {
            let attachments = if message.has_attachments {
                match self.transport.list_attachments(&message.id).await {
                    Ok(attachments) => attachments,
                    Err(e) => {
                        warn!(id = %message.id, error = %e, "Failed to fetch attachments, skipping");
                        continue;
                    }
                }
            } else {
                Vec::new()
            };

            let input = ClassificationInput::from_message(&message, &attachments);
            let classification = rules::explain(&input);
            debug!(
                id = %message.id,
                category = %classification.category,
                rule = classification.rule.label(),
                "Checked email for PO"
            );
            if classification.category == Category::PurchaseOrders {
                info!(id = %message.id, subject = %message.subject, "Found PO email");
                return Ok(Some(message));
            }
        }

        info!("No PO email among unread messages");
        Ok(None)
    }

    /// Send an acknowledgement for the given message and log it.
    pub async fn draft_po_reply(&self, message_id: &str) -> Result<DraftOutcome, PipelineError> {
        let details = self.transport.get_message_details(message_id).await?;
        let recipient = details
            .reply_to_address
            .clone()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| PipelineError::MissingRecipient {
                id: message_id.to_string(),
            })?;

        let subject = reply_subject(&details.subject);
        let body = acknowledgement_body(&details);

        let confirmation = self.sender.send(&subject, &body, &recipient).await?;
        info!(
            id = %message_id,
            to = %recipient,
            sender = self.sender.name(),
            "PO acknowledgement sent"
        );

        let original = EmailMessage {
            id: details.id.clone(),
            subject: details.subject.clone(),
            body: details.body.clone(),
            sender_address: recipient.clone(),
            ..Default::default()
        };
        let record =
            LogRecord::sorted(&original, &[], Category::PurchaseOrders).with_reply(&confirmation);
        if let Err(e) = self.sink.record(&record).await {
            warn!(id = %message_id, sink = self.sink.name(), error = %e, "Failed to log reply");
        }

        Ok(DraftOutcome {
            original_message_id: message_id.to_string(),
            recipient,
            subject,
            body_preview: preview(&body),
            confirmation,
        })
    }
}
