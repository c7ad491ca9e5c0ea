use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::models::{Booking, ProviderAssignment};

/// Best-effort delivery of booking confirmations. Failures never affect the booking.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn booking_confirmed(&self, booking: &Booking, assignment: &ProviderAssignment) -> Result<()>;
}

/// Writes confirmations to the log only.
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn booking_confirmed(&self, booking: &Booking, assignment: &ProviderAssignment) -> Result<()> {
        info!(
            "Booking {} confirmed with {} on {} at {}",
            booking.id, assignment.provider_name, booking.appointment_date, booking.start_time
        );
        Ok(())
    }
}

/// Posts confirmations to the practice's notification endpoint.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookNotifier {
    async fn booking_confirmed(&self, booking: &Booking, assignment: &ProviderAssignment) -> Result<()> {
        debug!("Posting confirmation for booking {} to {}", booking.id, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "event": "booking_confirmed",
                "booking": booking,
                "provider": assignment,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Notification endpoint answered {}", response.status()));
        }

        Ok(())
    }
}

pub fn notifier_from_config(config: &AppConfig) -> Arc<dyn NotificationDispatcher> {
    match &config.notification_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    }
}

/// Fire-and-forget dispatch on the runtime.
pub fn dispatch_confirmation(
    notifier: Arc<dyn NotificationDispatcher>,
    booking: Booking,
    assignment: ProviderAssignment,
) {
    tokio::spawn(async move {
        if let Err(e) = notifier.booking_confirmed(&booking, &assignment).await {
            warn!("Failed to send confirmation for booking {}: {}", booking.id, e);
        }
    });
}
