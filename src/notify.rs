//! Operator notifications for fatal-class errors.
//!
//! Delivery is best effort: a notifier failure is logged and never changes the
//! outcome of the cycle that triggered it.

use crate::config::NotificationConfig;
use crate::error::AutomationError;
use crate::provider::{build_provider_http_client, ensure_success, map_http_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn for_error(error: &AutomationError) -> Self {
        Self {
            subject: format!("autoscribe: {}", error.kind()),
            body: error.to_string(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), AutomationError>;
}

/// Drops everything; used when no recipient or relay is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), AutomationError> {
        debug!(subject = %notification.subject, "No notifier configured");
        Ok(())
    }
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// POSTs `{to, subject, body}` to an HTTP mail relay.
pub struct RelayNotifier {
    client: Client,
    relay_url: String,
    recipient: String,
}

impl RelayNotifier {
    pub fn new(relay_url: String, recipient: String) -> Result<Self, AutomationError> {
        Ok(Self {
            client: build_provider_http_client()?,
            relay_url,
            recipient,
        })
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), AutomationError> {
        let message = RelayMessage {
            to: &self.recipient,
            subject: &notification.subject,
            body: &notification.body,
        };
        let response = self
            .client
            .post(&self.relay_url)
            .json(&message)
            .send()
            .await
            .map_err(map_http_error)
            .map_err(|e| AutomationError::SideEffectFailure(e.to_string()))?;
        ensure_success(response)
            .await
            .map_err(|e| AutomationError::SideEffectFailure(e.to_string()))?;
        Ok(())
    }
}

/// Relay notifier when both recipient and relay are set, otherwise a no-op.
pub fn notifier_from_config(
    config: &NotificationConfig,
) -> Result<Arc<dyn Notifier>, AutomationError> {
    match (&config.email, &config.relay_url) {
        (Some(email), Some(url)) if !email.trim().is_empty() && !url.trim().is_empty() => Ok(
            Arc::new(RelayNotifier::new(url.trim().to_string(), email.trim().to_string())?),
        ),
        _ => Ok(Arc::new(NoopNotifier)),
    }
}

/// Send a notification for `error` if it is fatal-class; swallow delivery errors.
pub async fn notify_if_fatal(notifier: &dyn Notifier, error: &AutomationError) {
    if !error.is_fatal() {
        return;
    }
    if let Err(err) = notifier.notify(&Notification::for_error(error)).await {
        warn!(error = %err, "Failed to deliver notification");
    }
}
