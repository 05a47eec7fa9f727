//! Airtable sink: one row per decision in the CSR log table.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use crate::config::AirtableConfig;
use crate::error::LogSinkError;
use crate::sink::{LogRecord, LogSink};

/// Writes records to an Airtable table over the REST API.
pub struct AirtableSink {
    config: AirtableConfig,
    client: reqwest::Client,
}

impl AirtableSink {
    pub fn new(config: AirtableConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self) -> String {
        format!(
            "{}/v0/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.base_id,
            self.config.table_name
        )
    }
}

#[async_trait]
impl LogSink for AirtableSink {
    fn name(&self) -> &str {
        "airtable"
    }

    async fn record(&self, record: &LogRecord) -> Result<(), LogSinkError> {
        let body = serde_json::json!({ "fields": record, "typecast": true });

        let resp = self
            .client
            .post(self.table_url())
            .bearer_auth(self.config.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LogSinkError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                id = %record.email_id,
                status = status.as_u16(),
                "Airtable rejected log record"
            );
            return Err(LogSinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(id = %record.email_id, subject = %record.subject, "Logged email to Airtable");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use secrecy::SecretString;

    use super::*;
    use crate::pipeline::types::{Category, EmailMessage};

    fn sink(url: &str) -> AirtableSink {
        AirtableSink::new(AirtableConfig {
            base_id: "appBase".into(),
            table_name: "CSR_Log".into(),
            token: SecretString::from("pat-token"),
            api_base: url.to_string(),
        })
    }

    fn record() -> LogRecord {
        let message = EmailMessage {
            id: "msg-9".into(),
            subject: "Need pricing".into(),
            body: "Can you quote 40 units?".into(),
            sender_address: "buyer@customer.com".into(),
            ..Default::default()
        };
        LogRecord::sorted(&message, &[], Category::QuoteRequests)
    }

    #[tokio::test]
    async fn posts_fields_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v0/appBase/CSR_Log")
            .match_header("authorization", "Bearer pat-token")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "fields": {
                    "Email_ID": "msg-9",
                    "Category": "Quote Requests",
                    "PO_Detected": false
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "rec1", "fields": {}}"#)
            .create_async()
            .await;

        sink(&server.url()).record(&record()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_record_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v0/appBase/CSR_Log")
            .with_status(422)
            .with_body(r#"{"error": {"type": "UNKNOWN_FIELD_NAME"}}"#)
            .create_async()
            .await;

        let err = sink(&server.url()).record(&record()).await.unwrap_err();
        match err {
            LogSinkError::Rejected { status, body } => {
                assert_eq!(status, 422);
                assert!(body.contains("UNKNOWN_FIELD_NAME"));
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }
}
