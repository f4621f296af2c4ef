//! Mail Sender
//!
//! Submits a single plain-text message over SMTP with STARTTLS. Each
//! call opens and tears down its own session; there is no retry.

use crate::config::{Credentials, SmtpConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::{debug, info};

/// Something that can deliver a plain-text message.
#[async_trait]
pub trait MailSend: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Result of a send attempt as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub success: bool,
    pub message: String,
}

impl SendOutcome {
    pub const SENT: &'static str = "Email sent successfully";
}

impl From<Result<()>> for SendOutcome {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                message: Self::SENT.to_string(),
            },
            Err(e) => Self {
                success: false,
                message: e.to_string(),
            },
        }
    }
}

/// SMTP-backed [`MailSend`].
pub struct SmtpMailer {
    config: SmtpConfig,
    credentials: Credentials,
    timeout: Option<Duration>,
}

impl SmtpMailer {
    #[must_use]
    pub const fn new(config: SmtpConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            timeout: None,
        }
    }

    /// Bound each SMTP command by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Compose the outgoing message.
    pub fn build_message(&self, recipient: &str, subject: &str, body: &str) -> Result<Message> {
        let from: Mailbox = self
            .credentials
            .email_address
            .parse()
            .map_err(|e| Error::Validation(format!("Invalid sender address: {e}")))?;
        let to: Mailbox = recipient.parse().map_err(|e| {
            Error::Validation(format!("Invalid recipient address '{recipient}': {e}"))
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| Error::Validation(format!("Failed to build email: {e}")))
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let credentials = SmtpCredentials::new(
            self.credentials.email_address.clone(),
            self.credentials.email_password.clone(),
        );

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
                .map_err(|e| Error::MailProtocol(format!("Failed to create SMTP relay: {e}")))?
                .port(self.config.port)
                .credentials(credentials)
                .timeout(self.timeout)
                .build(),
        )
    }
}

#[async_trait]
impl MailSend for SmtpMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let message = self.build_message(recipient, subject, body)?;
        let transport = self.build_transport()?;

        debug!(
            "Submitting message to {}:{}",
            self.config.host, self.config.port
        );
        transport.send(message).await.map_err(classify)?;

        info!("Sent email to {}", recipient);
        Ok(())
    }
}

/// Map a lettre SMTP error onto the relay's error taxonomy.
fn classify(e: lettre::transport::smtp::Error) -> Error {
    let is_auth = e
        .status()
        .is_some_and(|code| matches!(code.to_string().as_str(), "530" | "534" | "535"));
    if is_auth {
        Error::MailAuth(e.to_string())
    } else {
        Error::MailProtocol(e.to_string())
    }
}
