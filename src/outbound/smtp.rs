//! SMTP reply delivery via lettre.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;

use crate::config::SmtpConfig;
use crate::error::SendError;
use crate::pipeline::types::DraftSender;

/// Sends replies through an SMTP relay.
pub struct SmtpSender {
    config: SmtpConfig,
}

impl SmtpSender {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Build the outgoing message without sending it.
    pub fn build_message(
        &self,
        subject: &str,
        body: &str,
        recipient: &str,
    ) -> Result<Message, SendError> {
        let from: Mailbox = parse_mailbox(&self.config.from_address)?;
        let to: Mailbox = parse_mailbox(recipient)?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| SendError::SendFailed(format!("Failed to build email: {e}")))
    }

    fn send_blocking(config: &SmtpConfig, email: &Message) -> Result<(), SendError> {
        let creds = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let transport = SmtpTransport::relay(&config.host)
            .map_err(|e| SendError::SendFailed(format!("SMTP relay error: {e}")))?
            .port(config.port)
            .credentials(creds)
            .build();

        transport
            .send(email)
            .map_err(|e| SendError::SendFailed(format!("SMTP send failed: {e}")))?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SendError> {
    address.parse().map_err(|e: lettre::address::AddressError| SendError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl DraftSender for SmtpSender {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(
        &self,
        subject: &str,
        body: &str,
        recipient: &str,
    ) -> Result<String, SendError> {
        let email = self.build_message(subject, body, recipient)?;
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || Self::send_blocking(&config, &email))
            .await
            .map_err(|e| SendError::SendFailed(format!("SMTP task panicked: {e}")))??;

        tracing::info!("Email sent to {recipient}");
        Ok(format!("Email sent to {recipient} via {}", self.config.host))
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn sender() -> SmtpSender {
        SmtpSender::new(SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "csr@example.com".into(),
            password: SecretString::from("pw"),
            from_address: "CSR Team <csr@example.com>".into(),
        })
    }

    #[test]
    fn builds_message_with_headers() {
        let message = sender()
            .build_message("Re: PO 4411", "Thanks, received.", "buyer@customer.com")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Re: PO 4411"));
        assert!(raw.contains("To: buyer@customer.com"));
        assert!(raw.contains("csr@example.com"));
    }

    #[test]
    fn rejects_invalid_recipient() {
        let result = sender().build_message("Re: PO", "x", "not an address");
        assert!(matches!(result, Err(SendError::InvalidAddress { .. })));
    }
}
