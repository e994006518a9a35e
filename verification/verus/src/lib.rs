//! Verus Formal Verification for slotcheck
//!
//! This module contains Verus specifications and proofs for critical functions.
//! To verify, install Verus and run: verus verification/verus/src/lib.rs
//!
//! Verus installation: https://github.com/verus-lang/verus

use vstd::prelude::*;

verus! {

// ============================================================================
// COUNTDOWN THRESHOLDS: the two guards can never both hold
// ============================================================================

/// Specification: a countdown below one unit is expired
#[spec]
pub fn spec_expired(remaining_ms: int) -> bool {
    remaining_ms < 1
}

/// Specification: a countdown strictly above one unit is still active
#[spec]
pub fn spec_active(remaining_ms: int) -> bool {
    remaining_ms > 1
}

/// Proof: no countdown value satisfies both guards
#[proof]
pub fn lemma_guards_mutually_exclusive(remaining_ms: int)
    ensures
        !(spec_expired(remaining_ms) && spec_active(remaining_ms)),
{
    // remaining_ms < 1 and remaining_ms > 1 cannot hold together
}

/// Proof: exactly one millisecond satisfies neither guard
#[proof]
pub fn lemma_boundary_is_dead()
    ensures
        !spec_expired(1) && !spec_active(1),
{
    // Trivially true by definition
}

/// Proof: every negative countdown is expired
#[proof]
pub fn lemma_negative_is_expired(remaining_ms: int)
    requires
        remaining_ms < 0,
    ensures
        spec_expired(remaining_ms),
{
    // Negative values are below one unit
}

/// Executable guard with verified agreement with the spec
#[exec]
pub fn countdown_expired(remaining_ms: i64) -> (result: bool)
    ensures
        result == spec_expired(remaining_ms as int),
{
    remaining_ms < 1
}

/// Executable guard with verified agreement with the spec
#[exec]
pub fn countdown_active(remaining_ms: i64) -> (result: bool)
    ensures
        result == spec_active(remaining_ms as int),
{
    remaining_ms > 1
}

// ============================================================================
// COUNTDOWN RESET: distance to a lead-time-satisfying window never negative
// ============================================================================

/// Proof: resetting the countdown to the distance between the earliest
/// acceptable instant and a window at or after it is non-negative
#[proof]
pub fn lemma_reset_non_negative(window_start_ms: int, earliest_ms: int)
    requires
        window_start_ms >= earliest_ms,
    ensures
        window_start_ms - earliest_ms >= 0,
{
    // Direct consequence of the precondition
}

// ============================================================================
// TICKING: decrement arithmetic within safe bounds
// ============================================================================

/// Executable tick with verified result and no overflow in the stated range
#[exec]
pub fn tick_countdown(remaining_ms: i64, elapsed_ms: i64) -> (result: i64)
    requires
        -0x4000_0000_0000_0000 <= remaining_ms < 0x4000_0000_0000_0000,
        0 <= elapsed_ms < 0x4000_0000_0000_0000,
    ensures
        result == remaining_ms - elapsed_ms,
{
    remaining_ms - elapsed_ms
}

/// Proof: ticking can only move the countdown toward (or past) expiry
#[proof]
pub fn lemma_tick_monotone(remaining_ms: int, elapsed_ms: int)
    requires
        elapsed_ms >= 0,
    ensures
        remaining_ms - elapsed_ms <= remaining_ms,
        spec_expired(remaining_ms) ==> spec_expired(remaining_ms - elapsed_ms),
{
    // Subtracting a non-negative quantity never increases the value
}

// ============================================================================
// CLOSED DETECTION: boundary is strict
// ============================================================================

/// Specification: the day is over when the earliest acceptable instant is
/// strictly after the end of the last offered window
#[spec]
pub fn spec_after_hours(earliest_ms: int, last_end_ms: int) -> bool {
    earliest_ms > last_end_ms
}

/// Proof: an earliest instant exactly at the last end is still in hours
#[proof]
pub fn lemma_exact_end_still_open(last_end_ms: int)
    ensures
        !spec_after_hours(last_end_ms, last_end_ms),
{
    // Strict comparison excludes equality
}

/// Executable check with verified agreement with the spec
#[exec]
pub fn after_hours(earliest_ms: i64, last_end_ms: i64) -> (result: bool)
    ensures
        result == spec_after_hours(earliest_ms as int, last_end_ms as int),
{
    earliest_ms > last_end_ms
}

} // verus!
