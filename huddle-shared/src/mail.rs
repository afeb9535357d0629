/// Outgoing email collaborator
///
/// The identity service only needs to hand a message to something that
/// delivers it. [`Mailer`] is that seam; [`LogMailer`] is the implementation
/// used when no transport is configured. It logs the recipient and subject
/// only; bodies can carry reset links and never reach the log.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A plain text email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub to: String,

    pub subject: String,

    pub body: String,
}

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The transport refused or failed to deliver the message
    #[error("Failed to deliver email to {to}: {reason}")]
    Delivery { to: String, reason: String },
}

/// Sends email on behalf of the services
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Mailer that records outgoing messages in the tracing log instead of sending them
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!(
            to = %email.to,
            subject = %email.subject,
            body_len = email.body.len(),
            "Email not sent (no transport configured)"
        );
        Ok(())
    }
}
