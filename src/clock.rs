/// Facility wall-clock utilities
/// Converts absolute instants into the facility's local time for slot
/// boundary comparisons, and renders local time-of-day strings for notices.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// The facility's timezone, used for all boundary comparisons.
///
/// Slot math happens in facility-local wall time: a slot that ends at
/// "17:00" means 5 PM at the facility, wherever the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacilityClock {
    tz: Tz,
}

impl FacilityClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Facility-local wall time for an absolute instant.
    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        self.tz.from_utc_datetime(&instant.naive_utc()).naive_local()
    }

    /// Earliest acceptable local instant: `now` pushed forward by the
    /// lead-time buffer, then shifted into facility wall time.
    pub fn earliest_acceptable(&self, now: DateTime<Utc>, buffer: Duration) -> NaiveDateTime {
        self.to_local(now + buffer)
    }

    /// Local time-of-day string, e.g. "2:30 PM".
    pub fn time_of_day(&self, instant: DateTime<Utc>) -> String {
        self.to_local(instant).format("%-I:%M %p").to_string()
    }

    /// Wall-clock milliseconds from `from_local` until the local projection
    /// of `to`. Negative when `to` lands before `from_local`.
    pub fn millis_until(&self, to: DateTime<Utc>, from_local: NaiveDateTime) -> i64 {
        (self.to_local(to) - from_local).num_milliseconds()
    }
}
