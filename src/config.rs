use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
#[cfg(test)]
use std::collections::HashMap;
use std::env;

/// Default pickup lead time, minutes. Delivery lead time is
/// facility-configured; pickup uses this fixed default.
pub const DEFAULT_PICKUP_BUFFER_MINUTES: i64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    /// Facility timezone (IANA identifier, e.g. "America/New_York")
    pub facility_tz: Tz,

    /// Slot feed endpoint returning the day's offered windows as JSON
    pub slots_url: String,

    /// Optional webhook receiving rendered notices (disabled if not set)
    pub webhook_url: Option<String>,

    /// Lead-time buffer for delivery orders, minutes
    pub delivery_buffer_minutes: i64,

    /// Lead-time buffer for pickup orders, minutes
    pub pickup_buffer_minutes: i64,

    /// Countdown tick length, milliseconds
    pub tick_interval_ms: u64,

    /// Slot feed refresh cadence, seconds
    pub refresh_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env if present, ignore if missing
        Self::from_getter(|key| env::var(key).ok())
    }

    /// Parse config from a custom getter function (for testing)
    pub fn from_getter<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tz_name = get("FACILITY_TZ").context("FACILITY_TZ not set")?;
        let facility_tz: Tz = tz_name
            .parse()
            .map_err(|_| anyhow!("FACILITY_TZ '{}' is not a known timezone", tz_name))?;

        Ok(Config {
            facility_tz,

            slots_url: get("SLOTS_URL").context("SLOTS_URL not set")?,

            webhook_url: get("WEBHOOK_URL").filter(|s| !s.is_empty()),

            delivery_buffer_minutes: get("DELIVERY_BUFFER_MINUTES")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .context("DELIVERY_BUFFER_MINUTES must be a whole number of minutes")?,

            pickup_buffer_minutes: get("PICKUP_BUFFER_MINUTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PICKUP_BUFFER_MINUTES),

            tick_interval_ms: get("TICK_INTERVAL_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),

            refresh_interval_secs: get("REFRESH_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        })
    }

    /// Create config from a HashMap (convenience for testing)
    #[cfg(test)]
    pub fn from_map(map: &HashMap<&str, &str>) -> Result<Self> {
        Self::from_getter(|key| map.get(key).map(|v| v.to_string()))
    }

    /// Validate configuration values at startup.
    /// Returns Ok(()) if all validations pass, or Err with details of what failed.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if !Self::is_http_url(&self.slots_url) {
            errors.push(format!(
                "SLOTS_URL '{}' invalid. Expected an http(s) URL.",
                self.slots_url
            ));
        }

        if let Some(url) = &self.webhook_url {
            if !Self::is_http_url(url) {
                errors.push(format!("WEBHOOK_URL '{}' invalid. Expected an http(s) URL.", url));
            }
        }

        if self.delivery_buffer_minutes < 0 {
            errors.push("DELIVERY_BUFFER_MINUTES must not be negative.".to_string());
        } else if self.delivery_buffer_minutes > 24 * 60 {
            errors.push(format!(
                "DELIVERY_BUFFER_MINUTES={} exceeds a full day.",
                self.delivery_buffer_minutes
            ));
        }

        if self.pickup_buffer_minutes < 0 {
            errors.push("PICKUP_BUFFER_MINUTES must not be negative.".to_string());
        } else if self.pickup_buffer_minutes > 24 * 60 {
            errors.push(format!(
                "PICKUP_BUFFER_MINUTES={} exceeds a full day.",
                self.pickup_buffer_minutes
            ));
        }

        if self.tick_interval_ms == 0 {
            errors.push("TICK_INTERVAL_MS must be greater than 0.".to_string());
        } else if self.tick_interval_ms > 60_000 {
            errors.push(format!(
                "TICK_INTERVAL_MS={} seems too coarse (max recommended: 60000).",
                self.tick_interval_ms
            ));
        }

        if self.refresh_interval_secs == 0 {
            errors.push("REFRESH_INTERVAL_SECS must be greater than 0.".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )
        }
    }

    fn is_http_url(url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }
}
