//! Slot data model
//!
//! Bookable time windows in absolute time, plus the ordered slot-set
//! invariants the evaluation logic relies on: chronological order, no
//! duplicates, and the eligible list being a subset of the full list.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::FacilityClock;

/// A single bookable interval. Invariant: `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SlotError> {
        if start >= end {
            return Err(SlotError::EmptyWindow { start, end });
        }
        Ok(Self { start, end })
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    #[error("window end {end} is not after start {start}")]
    EmptyWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("slot list is not chronological at index {index}")]
    OutOfOrder { index: usize },
    #[error("duplicate window at index {index}")]
    Duplicate { index: usize },
    #[error("eligible slot at index {index} is not in the full slot list")]
    NotSubset { index: usize },
}

/// Check the list invariants: every window non-empty, starts strictly
/// increasing (which also rules out duplicates).
pub fn validate_ordered(slots: &[TimeWindow]) -> Result<(), SlotError> {
    for (index, window) in slots.iter().enumerate() {
        if window.start >= window.end {
            return Err(SlotError::EmptyWindow {
                start: window.start,
                end: window.end,
            });
        }
        if index > 0 {
            let prev = &slots[index - 1];
            if window == prev {
                return Err(SlotError::Duplicate { index });
            }
            if window.start < prev.start {
                return Err(SlotError::OutOfOrder { index });
            }
        }
    }
    Ok(())
}

/// The day's slots: everything the facility offers (`all`) and the subset
/// still satisfying the active method's lead-time constraint (`eligible`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotSet {
    all: Vec<TimeWindow>,
    eligible: Vec<TimeWindow>,
}

impl SlotSet {
    /// Build a slot set from pre-partitioned lists, checking every invariant.
    pub fn new(all: Vec<TimeWindow>, eligible: Vec<TimeWindow>) -> Result<Self, SlotError> {
        validate_ordered(&all)?;
        validate_ordered(&eligible)?;

        // Subset check via merge scan: both lists are ordered.
        let mut cursor = 0;
        for (index, window) in eligible.iter().enumerate() {
            while cursor < all.len() && &all[cursor] != window {
                cursor += 1;
            }
            if cursor == all.len() {
                return Err(SlotError::NotSubset { index });
            }
            cursor += 1;
        }

        Ok(Self { all, eligible })
    }

    /// Build a slot set from the full list, deriving `eligible` as the
    /// windows whose facility-local start is at or after `earliest`.
    pub fn derive(
        all: Vec<TimeWindow>,
        clock: &FacilityClock,
        earliest: NaiveDateTime,
    ) -> Result<Self, SlotError> {
        validate_ordered(&all)?;
        let eligible = all
            .iter()
            .copied()
            .filter(|w| clock.to_local(w.start) >= earliest)
            .collect();
        Ok(Self { all, eligible })
    }

    pub fn all(&self) -> &[TimeWindow] {
        &self.all
    }

    pub fn eligible(&self) -> &[TimeWindow] {
        &self.eligible
    }

    pub fn last_offered(&self) -> Option<&TimeWindow> {
        self.all.last()
    }

    pub fn first_eligible(&self) -> Option<&TimeWindow> {
        self.eligible.first()
    }

    /// The first eligible window whose facility-local start is at or after
    /// `earliest` — the reassignment target when a selection expires.
    pub fn next_eligible(&self, clock: &FacilityClock, earliest: NaiveDateTime) -> Option<TimeWindow> {
        self.eligible
            .iter()
            .copied()
            .find(|w| clock.to_local(w.start) >= earliest)
    }
}
