//! Outbound mail seam.
//!
//! Delivery itself is infrastructure; the API only decides *what* to send.
//! [`LogMailer`] is the default implementation and records the recipient
//! and message kind without the token.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use forum_core::types::DbId;

#[derive(Clone)]
pub enum Mail {
    /// Sent on registration and on an activation re-send request.
    Activation {
        to: String,
        user_id: DbId,
        token: String,
    },
    PasswordReset {
        to: String,
        token: String,
    },
}

impl Mail {
    pub fn recipient(&self) -> &str {
        match self {
            Mail::Activation { to, .. } | Mail::PasswordReset { to, .. } => to,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Mail::Activation { .. } => "activation",
            Mail::PasswordReset { .. } => "password-reset",
        }
    }

    /// Token plaintext carried by the message.
    pub fn token(&self) -> &str {
        match self {
            Mail::Activation { token, .. } | Mail::PasswordReset { token, .. } => token,
        }
    }
}

impl fmt::Debug for Mail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mail")
            .field("kind", &self.kind())
            .field("to", &self.recipient())
            .field("token", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), MailError>;
}

/// Writes a line per message to the log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        tracing::info!(to = %mail.recipient(), kind = mail.kind(), "Mail queued for delivery");
        Ok(())
    }
}

/// Send `mail` on a background task. Failures are logged, never surfaced to
/// the request that triggered them.
pub fn dispatch(mailer: Arc<dyn Mailer>, mail: Mail) {
    tokio::spawn(async move {
        let kind = mail.kind();
        let to = mail.recipient().to_string();
        if let Err(e) = mailer.send(mail).await {
            tracing::error!(error = %e, kind, to = %to, "Mail delivery failed");
        }
    });
}
