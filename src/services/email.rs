use std::sync::Mutex;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::SmtpConfig;
use crate::services::ServiceError;

/// Outbound mail seam. The orchestrator never touches SMTP directly.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ServiceError>;
}

/// SMTP delivery through lettre's blocking transport, run on the
/// blocking pool so it never stalls the async runtime.
pub struct SmtpEmailSender {
    transport: SmtpTransport,
    from: String,
}

impl SmtpEmailSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, anyhow::Error> {
        let mut builder = SmtpTransport::relay(&config.host)
            .map_err(|e| anyhow::anyhow!("invalid smtp relay {}: {e}", config.host))?;

        if !config.user.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ));
        }

        Ok(SmtpEmailSender {
            transport: builder.build(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ServiceError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| ServiceError::Email(format!("invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| ServiceError::Email(format!("invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| ServiceError::Email(format!("failed to build message: {e}")))?;

        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| ServiceError::Email(format!("send task failed: {e}")))?
            .map_err(|e| ServiceError::Email(format!("smtp send failed: {e}")))?;

        Ok(())
    }
}

/// Captures messages instead of delivering them. Used in tests and in dev
/// environments without an SMTP relay.
#[derive(Default)]
pub struct CapturingEmailSender {
    messages: Mutex<Vec<CapturedEmail>>,
}

#[derive(Debug, Clone)]
pub struct CapturedEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl CapturingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<CapturedEmail> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<CapturedEmail> {
        self.messages().last().cloned()
    }
}

#[async_trait]
impl EmailSender for CapturingEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ServiceError> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(CapturedEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}
