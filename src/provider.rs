//! Slot feed client
//!
//! Fetches the day's offered windows as JSON and checks the list
//! invariants at the boundary, so everything downstream can rely on a
//! chronological, duplicate-free list.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::slots::{validate_ordered, TimeWindow};

/// One window as the feed serves it (RFC 3339 instants).
#[derive(Debug, Deserialize, PartialEq)]
pub struct WireSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Parse and validate a slot feed body.
pub fn parse_slots(body: &str) -> Result<Vec<TimeWindow>> {
    let wire: Vec<WireSlot> = serde_json::from_str(body).context("Failed to parse slot feed JSON")?;
    let slots: Vec<TimeWindow> = wire
        .into_iter()
        .map(|w| TimeWindow {
            start: w.start,
            end: w.end,
        })
        .collect();
    validate_ordered(&slots).context("Slot feed violates list invariants")?;
    Ok(slots)
}

pub struct SlotProvider {
    client: reqwest::Client,
    url: String,
}

impl SlotProvider {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Fetch the full offered-slot list for the day.
    pub async fn fetch_slots(&self) -> Result<Vec<TimeWindow>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to request slot feed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Slot feed returned status {}", status);
        }

        let body = response.text().await.context("Failed to read slot feed body")?;
        let slots = parse_slots(&body)?;
        debug!("Fetched {} slots", slots.len());
        Ok(slots)
    }
}
