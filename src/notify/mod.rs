//! Alert delivery.
//!
//! The worker only needs "send this short text to this phone number".
//! [`Notifier`] is that seam; [`TwilioNotifier`] delivers over SMS and
//! [`LogNotifier`] just records the alert when no gateway is configured.
//! Delivery is best effort: callers log failures and move on.

pub mod twilio;

use async_trait::async_trait;
use thiserror::Error;

pub use twilio::{TwilioConfig, TwilioNotifier};

/// Longest message accepted by the SMS gateway.
pub const MAX_MESSAGE_LEN: usize = 1600;

/// Why an alert could not be delivered.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Recipient is not a 10-digit phone number.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Message is empty or too long.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The gateway rejected the message.
    #[error("failed to send notification: {0}")]
    SendFailed(String),

    /// The gateway could not be reached.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Sends a short text alert to a user's phone.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Sends `message` to `phone` (10 digits, no country code).
    ///
    /// # Errors
    ///
    /// Returns a [`NotifyError`] if the recipient or message is invalid or
    /// the delivery failed.
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotifyError>;
}

/// Checks the recipient and message before anything goes on the wire.
///
/// # Errors
///
/// Returns [`NotifyError::InvalidRecipient`] or
/// [`NotifyError::InvalidMessage`].
pub fn check_alert(phone: &str, message: &str) -> Result<(), NotifyError> {
    if phone.len() != 10 || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NotifyError::InvalidRecipient(phone.to_string()));
    }
    let len = message.trim().chars().count();
    if len == 0 || len > MAX_MESSAGE_LEN {
        return Err(NotifyError::InvalidMessage(format!(
            "message must be 1..={MAX_MESSAGE_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

/// Notifier that only writes the alert to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotifyError> {
        check_alert(phone, message)?;
        tracing::info!(phone, message, "alert (no sms gateway configured)");
        Ok(())
    }
}
