//! Reply delivery. Simulated by default, SMTP when configured.

pub mod smtp;

pub use smtp::SmtpSender;

use async_trait::async_trait;
use tracing::info;

use crate::error::SendError;
use crate::pipeline::types::DraftSender;

/// Confirmation returned by the simulated sender.
pub const SIMULATED_CONFIRMATION: &str = "Email sent successfully!";

/// Logs the draft instead of sending it.
pub struct SimulatedSender;

#[async_trait]
impl DraftSender for SimulatedSender {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn send(
        &self,
        subject: &str,
        body: &str,
        recipient: &str,
    ) -> Result<String, SendError> {
        if recipient.trim().is_empty() {
            return Err(SendError::InvalidAddress {
                address: recipient.to_string(),
                reason: "empty recipient".into(),
            });
        }
        info!(to = %recipient, subject = %subject, body = %body, "Simulated send");
        Ok(SIMULATED_CONFIRMATION.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_send_confirms() {
        let confirmation = SimulatedSender
            .send("Re: PO 1", "Thanks!", "buyer@customer.com")
            .await
            .unwrap();
        assert_eq!(confirmation, SIMULATED_CONFIRMATION);
    }

    #[tokio::test]
    async fn simulated_send_rejects_empty_recipient() {
        let result = SimulatedSender.send("Re: PO 1", "Thanks!", "  ").await;
        assert!(matches!(result, Err(SendError::InvalidAddress { .. })));
    }
}
