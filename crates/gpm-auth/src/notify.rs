//! Delivery of password reset links.

use tracing::info;

use crate::error::AuthError;

/// Sends a password reset link to a user.
///
/// Implementations must not leak delivery failures to the requester; the
/// service logs and swallows any error returned here.
pub trait ResetNotifier: Send + Sync {
    fn send_reset_link(&self, email: &str, link: &str) -> Result<(), AuthError>;
}

/// Notifier that only records the delivery in the log. Used until an SMTP
/// relay is configured, and in tests.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl ResetNotifier for LogNotifier {
    fn send_reset_link(&self, email: &str, _link: &str) -> Result<(), AuthError> {
        info!(%email, "password reset link issued");
        Ok(())
    }
}
