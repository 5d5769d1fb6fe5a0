pub mod mailer;
pub mod render;

use thiserror::Error;

pub use mailer::{LogNotifier, Notifier, SmtpNotifier};
pub use render::{render_keyword_section, render_subject};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build email message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}
