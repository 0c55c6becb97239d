//! Notification Sink — best-effort usage and feedback logs to a chat webhook.
//!
//! Delivery never fails the caller. Every call resolves to a `Delivery`
//! outcome; callers log it and move on.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::models::analysis::{AnalysisResult, FeedbackEvent};

pub mod payload;

use payload::WebhookPayload;

/// What happened to one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No webhook configured; nothing was attempted.
    Disabled,
    /// The webhook was tried and failed. Swallowed.
    Failed(String),
}

#[derive(Clone)]
pub struct Notifier {
    client: Client,
    webhook_url: Option<String>,
}

impl Notifier {
    /// A blank URL is treated the same as no URL.
    pub fn new(webhook_url: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            webhook_url: webhook_url.filter(|url| !url.trim().is_empty()),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub async fn analysis_completed(
        &self,
        user_name: Option<&str>,
        duties: &str,
        result: &AnalysisResult,
    ) -> Delivery {
        if !self.is_enabled() {
            return Delivery::Disabled;
        }
        self.deliver(&payload::analysis_completed(user_name, duties, result))
            .await
    }

    pub async fn feedback_submitted(
        &self,
        user_name: Option<&str>,
        event: &FeedbackEvent,
    ) -> Delivery {
        if !self.is_enabled() {
            return Delivery::Disabled;
        }
        self.deliver(&payload::feedback_submitted(user_name, event))
            .await
    }

    async fn deliver(&self, payload: &WebhookPayload) -> Delivery {
        let Some(url) = self.webhook_url.as_deref() else {
            return Delivery::Disabled;
        };

        let delivery = match self.client.post(url).json(payload).send().await {
            Ok(response) if response.status().is_success() => Delivery::Sent,
            Ok(response) => Delivery::Failed(format!("webhook returned {}", response.status())),
            Err(e) => Delivery::Failed(e.to_string()),
        };

        match &delivery {
            Delivery::Failed(reason) => warn!("Notification dropped: {reason}"),
            _ => debug!("Notification delivered: {}", payload.username),
        }
        delivery
    }
}
