//! Notice delivery
//!
//! Renders the two user-facing notices and forwards them: always to the
//! log, and optionally to a webhook endpoint as JSON with bounded retries.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::engine::Notice;

pub const MAX_RETRIES: u32 = 3;
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff duration (60 seconds)
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Render the user-facing message for a notice.
pub fn render_message(notice: &Notice) -> String {
    match notice {
        Notice::Closed => {
            "Sorry, we are closed for the day. Please try again tomorrow.".to_string()
        }
        Notice::Reassigned { start, end } => format!(
            "The selected time slot has expired, we have selected the following for you: {} - {}",
            start, end
        ),
    }
}

/// JSON body POSTed to the webhook sink.
#[derive(Debug, Serialize, PartialEq)]
pub struct NoticePayload<'a> {
    pub kind: &'static str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<&'a str>,
}

impl<'a> NoticePayload<'a> {
    pub fn new(notice: &'a Notice, message: &'a str) -> Self {
        match notice {
            Notice::Closed => Self {
                kind: "closed",
                message,
                start: None,
                end: None,
            },
            Notice::Reassigned { start, end } => Self {
                kind: "reassigned",
                message,
                start: Some(start),
                end: Some(end),
            },
        }
    }
}

/// Calculate backoff duration for a given attempt (0-indexed)
/// Attempt 0: no backoff, Attempt 1: 1s, Attempt 2: 2s, etc.
/// Capped at MAX_BACKOFF_MS to prevent overflow and excessive waits.
#[inline]
pub fn calculate_backoff(attempt: u32) -> Duration {
    if attempt == 0 {
        Duration::ZERO
    } else {
        let shift = (attempt - 1).min(30);
        let backoff_ms = INITIAL_BACKOFF_MS.saturating_mul(1u64 << shift);
        Duration::from_millis(backoff_ms.min(MAX_BACKOFF_MS))
    }
}

pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// Deliver a notice. Logging always happens; webhook delivery is
    /// retried with exponential backoff and reported as an error only after
    /// every attempt fails.
    pub async fn send_notice(&self, notice: &Notice) -> Result<()> {
        let message = render_message(notice);
        info!("Notice: {}", message);

        let Some(url) = &self.webhook_url else {
            return Ok(());
        };

        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let backoff = calculate_backoff(attempt);
                warn!(
                    "Webhook attempt {} failed, retrying in {:?}...",
                    attempt, backoff
                );
                sleep(backoff).await;
            }

            match self.try_post(url, notice, &message).await {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }

        let err = last_error.context("no webhook attempt recorded")?;
        error!(
            "Failed to deliver notice after {} attempts: {}",
            MAX_RETRIES, err
        );
        // Log the rendered message so it is not lost with the delivery.
        error!("Undelivered notice: {}", message);
        Err(err)
    }

    async fn try_post(&self, url: &str, notice: &Notice, message: &str) -> Result<()> {
        let payload = NoticePayload::new(notice, message);

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .context("Failed to send webhook request")?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            anyhow::bail!("Webhook returned status {}", status)
        }
    }
}
