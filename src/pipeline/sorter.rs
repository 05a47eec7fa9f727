//! Batch sorter. Classifies unread mail and files it into category folders.
//!
//! One run:
//! 1. Resolve the three category folders under the inbox (abort if any is missing)
//! 2. List up to `batch_size` unread messages, newest first
//! 3. Per message, sequentially: attachments → classify → log → move
//!
//! A failure on one message is logged and recorded in the report; the loop
//! moves on to the next message.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SorterConfig;
use crate::error::PipelineError;
use crate::pipeline::rules::{self, ClassificationInput};
use crate::pipeline::types::{
    BatchReport, Category, EmailMessage, MailTransport, SortFailure, SortOutcome,
};
use crate::sink::{LogRecord, LogSink};

/// Folder ID for every category.
#[derive(Debug, Clone)]
pub struct FolderMap {
    ids: HashMap<Category, String>,
}

impl FolderMap {
    /// Build from explicit IDs; `None` if any category is missing.
    pub fn from_ids(ids: HashMap<Category, String>) -> Option<Self> {
        Category::ALL
            .iter()
            .all(|c| ids.contains_key(c))
            .then_some(Self { ids })
    }

    pub fn get(&self, category: Category) -> Option<&str> {
        self.ids.get(&category).map(String::as_str)
    }
}

/// Sorts a batch of unread messages.
pub struct EmailSorter {
    transport: Arc<dyn MailTransport>,
    sink: Arc<dyn LogSink>,
    config: SorterConfig,
}

impl EmailSorter {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        sink: Arc<dyn LogSink>,
        config: SorterConfig,
    ) -> Self {
        Self {
            transport,
            sink,
            config,
        }
    }

    /// Look up every category folder as a child of the inbox.
    pub async fn resolve_folders(&self) -> Result<FolderMap, PipelineError> {
        let inbox = self.config.inbox_id.as_str();
        let lookups = Category::ALL.iter().map(|&category| async move {
            let id = self
                .transport
                .resolve_folder_id(category.folder_name(), Some(inbox))
                .await;
            (category, id)
        });

        let mut ids = HashMap::new();
        for (category, result) in join_all(lookups).await {
            match result? {
                Some(id) => {
                    ids.insert(category, id);
                }
                None => {
                    error!(folder = category.folder_name(), "Missing target folder");
                    return Err(PipelineError::MissingFolder {
                        name: category.folder_name().to_string(),
                    });
                }
            }
        }

        FolderMap::from_ids(ids).ok_or_else(|| PipelineError::MissingFolder {
            name: "category folder".into(),
        })
    }

    /// Run one batch. Fails only if folders cannot be resolved or the unread
    /// list cannot be fetched; per-message failures land in the report.
    pub async fn run_batch(&self) -> Result<BatchReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let folders = self.resolve_folders().await?;

        let messages = self
            .transport
            .list_unread_messages(&self.config.inbox_id, self.config.batch_size)
            .await?;

        let mut report = BatchReport::default();
        if messages.is_empty() {
            info!(%run_id, "No unread emails to process");
            return Ok(report);
        }

        info!(%run_id, count = messages.len(), "Sorting unread emails");
        for message in messages {
            self.sort_one(message, &folders, &mut report).await;
        }

        info!(
            %run_id,
            sorted = report.sorted.len(),
            moved = report.moved_count(),
            failed = report.failures.len(),
            "Email processing finished"
        );
        Ok(report)
    }

    async fn sort_one(&self, message: EmailMessage, folders: &FolderMap, report: &mut BatchReport) {
        let attachments = if message.has_attachments {
            match self.transport.list_attachments(&message.id).await {
                Ok(attachments) => attachments,
                Err(e) => {
                    error!(id = %message.id, error = %e, "Failed to fetch attachments, skipping");
                    report.failures.push(SortFailure {
                        email_id: message.id,
                        reason: format!("attachment fetch failed: {e}"),
                    });
                    return;
                }
            }
        } else {
            Vec::new()
        };

        let input = ClassificationInput::from_message(&message, &attachments);
        let classification = rules::explain(&input);
        let category = classification.category;
        debug!(
            id = %message.id,
            category = %category,
            rule = classification.rule.label(),
            "Classified email"
        );

        let record = LogRecord::sorted(&message, &attachments, category);
        let logged = match self.sink.record(&record).await {
            Ok(()) => true,
            Err(e) => {
                warn!(id = %message.id, sink = self.sink.name(), error = %e, "Failed to log email");
                false
            }
        };

        let moved = match folders.get(category) {
            Some(destination) => self.move_to(&message.id, category, destination, report).await,
            None => {
                error!(id = %message.id, category = %category, "No folder for category");
                report.failures.push(SortFailure {
                    email_id: message.id.clone(),
                    reason: format!("no folder resolved for {category}"),
                });
                false
            }
        };

        report.sorted.push(SortOutcome {
            id: message.id,
            subject: message.subject,
            category,
            logged,
            moved,
        });
    }

    async fn move_to(
        &self,
        message_id: &str,
        category: Category,
        destination: &str,
        report: &mut BatchReport,
    ) -> bool {
        match self.transport.move_message(message_id, destination).await {
            Ok(()) => {
                info!(id = %message_id, category = %category, "Moved email");
                true
            }
            Err(e) => {
                error!(id = %message_id, category = %category, error = %e, "Failed to move email");
                report.failures.push(SortFailure {
                    email_id: message_id.to_string(),
                    reason: format!("move to {category} failed: {e}"),
                });
                false
            }
        }
    }
}
