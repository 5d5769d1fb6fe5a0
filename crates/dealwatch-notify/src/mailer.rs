//! Mail transports behind the [`Notifier`] seam.
//!
//! Dispatch only ever talks to `dyn Notifier`; production wires in
//! [`SmtpNotifier`], development and tests use [`LogNotifier`] or a fake.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use dealwatch_core::SmtpConfig;

use crate::NotifyError;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one HTML email. A failure affects only this recipient; callers
    /// log it and carry on with other subscribers.
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError>;
}

/// SMTP-over-TLS transport (implicit TLS, the usual port-465 setup).
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    /// Builds the pooled SMTP transport from config.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Transport`] if the relay parameters are invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_owned())?;

        self.transport.send(message).await?;
        tracing::info!(to, subject, "notification email sent");
        Ok(())
    }
}

/// Development transport: logs the email instead of sending it.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        tracing::info!(
            to,
            subject,
            body_len = html_body.len(),
            "dev mode: skipping email delivery"
        );
        Ok(())
    }
}
