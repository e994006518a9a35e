//! Aeneas-compatible Rust code for Lean verification
//!
//! This module contains simplified Rust code that can be translated to Lean 4
//! using Aeneas for formal verification.
//!
//! To verify:
//!   1. Install Aeneas: https://github.com/AeneasVerif/aeneas
//!   2. Run: aeneas -backend lean4 src/lib.rs
//!   3. Write proofs in the generated Lean files
//!
//! Note: Aeneas works best with simple, ownership-clear code.
//! Avoid: unsafe, RefCell, async, complex generics.

/// A simplified bookable window (instants as epoch milliseconds)
#[derive(Clone, Copy)]
pub struct Window {
    pub start: i64,
    pub end: i64,
}

/// Simplified list of windows (Aeneas prefers explicit lists)
#[derive(Clone)]
pub enum WindowList {
    Nil,
    Cons(Window, Box<WindowList>),
}

impl WindowList {
    /// Create an empty list
    pub fn new() -> Self {
        WindowList::Nil
    }

    /// Get the length of the list
    pub fn len(&self) -> u32 {
        match self {
            WindowList::Nil => 0,
            WindowList::Cons(_, tail) => 1 + tail.len(),
        }
    }

    /// Check if list is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, WindowList::Nil)
    }

    /// Check the chronological invariant: every window is non-empty and
    /// starts are strictly increasing
    pub fn is_chronological(&self) -> bool {
        match self {
            WindowList::Nil => true,
            WindowList::Cons(head, tail) => {
                if head.start >= head.end {
                    return false;
                }
                match tail.as_ref() {
                    WindowList::Nil => true,
                    WindowList::Cons(next, _) => {
                        head.start < next.start && tail.is_chronological()
                    }
                }
            }
        }
    }

    /// Keep the windows whose start is at or after the cutoff
    pub fn filter_eligible(self, cutoff: i64) -> Self {
        match self {
            WindowList::Nil => WindowList::Nil,
            WindowList::Cons(head, tail) => {
                let filtered_tail = tail.filter_eligible(cutoff);
                if head.start >= cutoff {
                    WindowList::Cons(head, Box::new(filtered_tail))
                } else {
                    filtered_tail
                }
            }
        }
    }

    /// First window whose start is at or after the cutoff
    pub fn first_at_or_after(&self, cutoff: i64) -> Option<Window> {
        match self {
            WindowList::Nil => None,
            WindowList::Cons(head, tail) => {
                if head.start >= cutoff {
                    Some(*head)
                } else {
                    tail.first_at_or_after(cutoff)
                }
            }
        }
    }

    /// End of the last window in the list
    pub fn last_end(&self) -> Option<i64> {
        match self {
            WindowList::Nil => None,
            WindowList::Cons(head, tail) => {
                if tail.is_empty() {
                    Some(head.end)
                } else {
                    tail.last_end()
                }
            }
        }
    }
}

/// Countdown below one unit is expired (negative slack included)
pub fn countdown_expired(remaining_ms: i64) -> bool {
    remaining_ms < 1
}

/// Countdown strictly above one unit still permits a silent reassignment
pub fn countdown_active(remaining_ms: i64) -> bool {
    remaining_ms > 1
}

/// The day is over when the earliest acceptable instant is strictly after
/// the end of the last offered window; an empty offering counts as over
pub fn after_hours(offered: &WindowList, earliest: i64) -> bool {
    match offered.last_end() {
        None => true,
        Some(end) => earliest > end,
    }
}

/// Closed-for-the-day decision over the simplified model
pub fn is_closed(offered: &WindowList, eligible: &WindowList, earliest: i64, loading: bool) -> bool {
    !loading && eligible.is_empty() && after_hours(offered, earliest)
}
