//! Outbound delivery seam.
//!
//! [`NotificationTransport`] is the only path out of the alerting core.
//! Real providers (Slack webhooks, SMTP relays, PagerDuty) live behind it
//! as external collaborators; the built-in [`LogTransport`] logs payloads
//! instead of sending them.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tracing::info;

use crate::error::Result;

/// A fully built message ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Where the message goes: a webhook URL, a recipient list, an API
    /// endpoint. Interpretation is up to the transport.
    pub destination: String,
    /// The channel-specific JSON payload.
    pub body: Value,
    /// Extra headers for HTTP-shaped transports.
    pub headers: HashMap<String, String>,
}

impl OutboundMessage {
    /// Creates a message with no extra headers.
    #[must_use]
    pub fn new(destination: impl Into<String>, body: Value) -> Self {
        Self {
            destination: destination.into(),
            body,
            headers: HashMap::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Delivers built messages to the outside world.
///
/// A delivery error means the message did not reach the destination
/// (transport failure or a non-success response).
pub trait NotificationTransport: Send + Sync {
    /// Delivers one message.
    ///
    /// # Errors
    ///
    /// Returns an error when delivery fails.
    fn deliver<'a>(
        &'a self,
        message: OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Transport that logs payloads at info level instead of sending them.
///
/// The default for local development and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl NotificationTransport for LogTransport {
    fn deliver<'a>(
        &'a self,
        message: OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            info!(
                destination = %message.destination,
                payload = %message.body,
                "would deliver notification"
            );
            Ok(())
        })
    }
}
