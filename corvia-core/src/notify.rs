use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// User-facing message emitted after a booking transition commits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    BookingConfirmed {
        reference: String,
        email: String,
    },
    BookingCancelled {
        reference: String,
        email: String,
    },
    BookingRefunded {
        reference: String,
        email: String,
        amount: i64,
    },
}

/// Delivery channel for user-facing messages. Fire-and-forget: callers log a
/// failure and move on; a notifier error never rolls back a transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: Notice) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, notice: Notice) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!(?notice, "notice dropped (noop notifier)");
        Ok(())
    }
}
