use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::SmtpConfig;

const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Send error: {0}")]
    SendFailed(String),

    #[error("Notification queue is unavailable")]
    QueueClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn password_reset(to: &str, token: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Password reset".to_string(),
            body: format!("Your password reset token: {token}"),
        }
    }

    pub fn activation(to: &str, token: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Activate your account".to_string(),
            body: format!("Your account activation token: {token}"),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError>;
}

pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotificationError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| NotificationError::Configuration(format!("Invalid from address: {e}")))?;

        let builder = if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host).map_err(|e| {
                NotificationError::Configuration(format!("Failed to create SMTP relay: {e}"))
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { from, transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| NotificationError::InvalidRecipient(format!("{}: {e}", message.to)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| NotificationError::SendFailed(format!("Failed to build message: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("Failed to send email: {e}")))?;

        Ok(())
    }
}

/// Used when no SMTP relay is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "smtp disabled, email not sent"
        );
        Ok(())
    }
}

/// Fire-and-forget delivery. Messages are handed to a background worker;
/// delivery outcomes only reach the log.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<EmailMessage>,
}

impl NotificationQueue {
    /// Spawns the delivery worker on the current tokio runtime.
    pub fn spawn(mailer: Arc<dyn Mailer>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(deliver(mailer, rx));
        Self { tx }
    }

    /// Never waits on the mail transport. A full or closed queue is logged
    /// and reported, but callers are expected to carry on.
    pub fn enqueue(&self, message: EmailMessage) -> Result<(), NotificationError> {
        self.tx.try_send(message).map_err(|err| {
            let err = match err {
                mpsc::error::TrySendError::Full(_) => {
                    NotificationError::SendFailed("notification queue is full".into())
                }
                mpsc::error::TrySendError::Closed(_) => NotificationError::QueueClosed,
            };
            tracing::error!(error = %err, "failed to queue notification");
            err
        })
    }
}

async fn deliver(mailer: Arc<dyn Mailer>, mut rx: mpsc::Receiver<EmailMessage>) {
    while let Some(message) = rx.recv().await {
        match mailer.send(&message).await {
            Ok(()) => tracing::info!(
                to = %message.to,
                subject = %message.subject,
                "notification delivered"
            ),
            Err(err) => tracing::error!(
                to = %message.to,
                subject = %message.subject,
                error = %err,
                "notification delivery failed"
            ),
        }
    }
    tracing::debug!("notification worker stopped");
}
