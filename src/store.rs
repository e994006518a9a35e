//! Caller-owned selection state
//!
//! Owns the selection and its countdown, applies engine actions, and keeps
//! the previous/current fulfillment method pair so an evaluation sees a
//! method switch exactly once.

use crate::engine::{Actions, FulfillmentMethod, Selection};

#[derive(Debug, Clone)]
pub struct SelectionStore {
    selection: Selection,
    remaining_ms: i64,
    method: FulfillmentMethod,
    previous_method: Option<FulfillmentMethod>,
}

impl SelectionStore {
    pub fn new(selection: Selection, method: FulfillmentMethod) -> Self {
        Self {
            selection,
            remaining_ms: 0,
            method,
            previous_method: None,
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn remaining_ms(&self) -> i64 {
        self.remaining_ms
    }

    pub fn method(&self) -> FulfillmentMethod {
        self.method
    }

    /// Method observed by the last completed evaluation. `None` until the
    /// first evaluation has run.
    pub fn previous_method(&self) -> Option<FulfillmentMethod> {
        self.previous_method
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    pub fn set_remaining_ms(&mut self, remaining_ms: i64) {
        self.remaining_ms = remaining_ms;
    }

    /// Switch the fulfillment method. The previously evaluated method stays
    /// visible until the next evaluation is marked, which is what lets the
    /// engine detect the switch.
    pub fn switch_method(&mut self, method: FulfillmentMethod) {
        self.method = method;
    }

    /// Tick the countdown down. No clamping: overshooting zero is
    /// meaningful, negative slack classifies as expired.
    pub fn tick(&mut self, elapsed_ms: i64) {
        self.remaining_ms -= elapsed_ms;
    }

    /// Apply one evaluation's actions. Returns true if any field changed.
    pub fn apply(&mut self, actions: &Actions) -> bool {
        let mut changed = false;
        if let Some(selection) = actions.set_selection {
            if selection != self.selection {
                changed = true;
            }
            self.selection = selection;
        }
        if let Some(remaining_ms) = actions.set_remaining_ms {
            if remaining_ms != self.remaining_ms {
                changed = true;
            }
            self.remaining_ms = remaining_ms;
        }
        changed
    }

    /// Record that an evaluation observed the current method.
    pub fn mark_evaluated(&mut self) {
        self.previous_method = Some(self.method);
    }
}
