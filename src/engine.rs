//! Timeslot validity evaluation
//!
//! The decision core: given the current selection, the countdown, and the
//! latest slot snapshot, decide whether the facility is closed for the day,
//! whether the selection expired and must be reassigned, whether a method
//! switch invalidated it, or whether no slots remain at all. The engine is
//! pure except for the one-shot closed-notice guard; the caller applies the
//! returned actions to its own state and notification surface.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::clock::FacilityClock;
use crate::slots::{SlotSet, TimeWindow};

/// The currently chosen fulfillment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// "As soon as possible" — not tied to any slot.
    Now,
    At(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentMethod {
    Delivery,
    Pickup,
}

/// User-facing notices. Reassignment carries pre-formatted facility-local
/// time-of-day strings; formatting beyond that is the notifier's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Closed,
    Reassigned { start: String, end: String },
}

/// Everything one evaluation reads. Constructed fresh per call; the engine
/// never caches inputs between evaluations.
#[derive(Debug, Clone)]
pub struct EngineInputs<'a> {
    pub now: DateTime<Utc>,
    pub selection: Selection,
    /// Caller-owned countdown in milliseconds. May be negative: the ticking
    /// clock can overshoot zero, and negative slack still counts as expired.
    pub remaining_ms: i64,
    /// Pre-computed reassignment target (first eligible window still ahead).
    pub next_eligible: Option<TimeWindow>,
    pub slots: &'a SlotSet,
    /// True while the slot snapshot is not yet authoritative.
    pub loading: bool,
    pub clock: FacilityClock,
    pub method: FulfillmentMethod,
    /// Method seen by the previous evaluation. `None` on the first
    /// evaluation, which counts as a change so an out-of-range initial
    /// selection gets corrected immediately.
    pub previous_method: Option<FulfillmentMethod>,
    /// Lead-time buffer for the active method.
    pub buffer: Duration,
}

/// What the caller must apply after an evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actions {
    pub set_selection: Option<Selection>,
    pub set_remaining_ms: Option<i64>,
    pub notice: Option<Notice>,
}

impl Actions {
    pub fn is_empty(&self) -> bool {
        self.set_selection.is_none() && self.set_remaining_ms.is_none() && self.notice.is_none()
    }
}

/// Countdown below one unit counts as expired; negative slack included.
#[inline]
pub fn countdown_expired(remaining_ms: i64) -> bool {
    remaining_ms < 1
}

/// Method-change reassignment requires a countdown still strictly above one
/// unit. Deliberately asymmetric with [`countdown_expired`]: exactly 1 ms
/// satisfies neither guard.
#[inline]
pub fn countdown_active(remaining_ms: i64) -> bool {
    remaining_ms > 1
}

/// The decision engine. Owns exactly one bit of state: whether the closed
/// notice has fired this session.
#[derive(Debug)]
pub struct TimeslotEngine {
    closed_notice_fired: bool,
}

impl TimeslotEngine {
    pub fn new() -> Self {
        Self {
            closed_notice_fired: false,
        }
    }

    pub fn closed_notice_fired(&self) -> bool {
        self.closed_notice_fired
    }

    /// Evaluate the inputs and return the actions the caller must apply.
    ///
    /// Idempotent for identical inputs except for the one-shot closed
    /// notice. Steps run in a fixed order; the expiry step's mutations are
    /// visible to the method-change step's guards within the same pass.
    pub fn evaluate(&mut self, inputs: &EngineInputs) -> Actions {
        let mut actions = Actions::default();

        // An "as soon as possible" selection is never validated.
        let selection_instant = match inputs.selection {
            Selection::Now => return actions,
            Selection::At(t) => t,
        };

        let clock = &inputs.clock;
        let earliest = clock.earliest_acceptable(inputs.now, inputs.buffer);

        // Past the end of the last offered window, or nothing offered at
        // all. While loading the slot list is not authoritative, so the day
        // is conservatively treated as over without concluding "closed".
        let after_hours = match (inputs.loading, inputs.slots.last_offered()) {
            (false, Some(last)) => earliest > clock.to_local(last.end),
            _ => true,
        };

        let closed = inputs.slots.eligible().is_empty() && after_hours && !inputs.loading;

        if closed {
            if !self.closed_notice_fired {
                self.closed_notice_fired = true;
                actions.notice = Some(Notice::Closed);
                debug!("facility closed for the day, notice emitted");
            }
            // The existing selection is left untouched.
            return actions;
        }

        // Working copies: the expiry step applies its mutations here before
        // the method-change guards read them.
        let mut selection = selection_instant;
        let mut remaining_ms = inputs.remaining_ms;

        let passed = earliest > clock.to_local(selection);
        if passed && countdown_expired(remaining_ms) && !inputs.loading {
            match inputs.next_eligible {
                Some(window) => {
                    selection = window.start;
                    remaining_ms = clock.millis_until(window.start, earliest);
                    actions.notice = Some(Notice::Reassigned {
                        start: clock.time_of_day(window.start),
                        end: clock.time_of_day(window.end),
                    });
                    debug!(
                        new_selection = %window.start,
                        remaining_ms,
                        "selection expired, reassigned to next window"
                    );
                }
                None => {
                    // No window left to name: fall back to the current
                    // instant with no countdown and no notice.
                    selection = inputs.now;
                    remaining_ms = 0;
                    debug!("selection expired with no next window, falling back to now");
                }
            }
            actions.set_selection = Some(Selection::At(selection));
            actions.set_remaining_ms = Some(remaining_ms);
        }

        // Silent correction after a method switch: the previous method's
        // selection may predate the first window the new method allows.
        let method_changed = inputs.previous_method != Some(inputs.method);
        if let Some(first) = inputs.slots.first_eligible() {
            if selection < first.start
                && method_changed
                && countdown_active(remaining_ms)
                && !inputs.loading
            {
                remaining_ms = clock.millis_until(first.start, earliest);
                actions.set_selection = Some(Selection::At(first.start));
                actions.set_remaining_ms = Some(remaining_ms);
                debug!(
                    new_selection = %first.start,
                    remaining_ms,
                    "method change moved selection to first eligible window"
                );
            }
        }

        // Terminal fallback: never leave the caller pointing at a selection
        // with no corresponding eligible window.
        if inputs.slots.eligible().is_empty() && !inputs.loading {
            actions.set_selection = Some(Selection::Now);
            actions.set_remaining_ms = Some(0);
            debug!("no eligible slots remain, forcing as-soon-as-possible");
        }

        actions
    }
}

impl Default for TimeslotEngine {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::UTC;
    use proptest::prelude::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn minute(m: i64) -> DateTime<Utc> {
        base() + Duration::minutes(m)
    }

    fn slot_set() -> impl Strategy<Value = SlotSet> {
        (
            proptest::collection::vec((0i64..24 * 60, 1i64..120), 0..8),
            0usize..8,
        )
            .prop_map(|(mut raw, keep)| {
                raw.sort();
                raw.dedup_by_key(|(s, _)| *s);
                let all: Vec<TimeWindow> = raw
                    .iter()
                    .map(|(s, len)| TimeWindow {
                        start: minute(*s),
                        end: minute(*s + *len),
                    })
                    .collect();
                let eligible: Vec<TimeWindow> =
                    all.iter().skip(all.len().saturating_sub(keep)).copied().collect();
                SlotSet::new(all, eligible).unwrap()
            })
    }

    /// Scalar knobs for one evaluation; assembled against a borrowed slot
    /// set inside the test body.
    #[derive(Debug, Clone)]
    struct Knobs {
        now_min: i64,
        selection_min: Option<i64>,
        remaining_ms: i64,
        loading: bool,
        buffer_min: i64,
        method_changed: bool,
    }

    fn knobs() -> impl Strategy<Value = Knobs> {
        (
            0i64..24 * 60,
            proptest::option::of(0i64..24 * 60),
            -600_000i64..600_000i64,
            any::<bool>(),
            0i64..120,
            any::<bool>(),
        )
            .prop_map(|(now_min, selection_min, remaining_ms, loading, buffer_min, method_changed)| Knobs {
                now_min,
                selection_min,
                remaining_ms,
                loading,
                buffer_min,
                method_changed,
            })
    }

    fn assemble<'a>(slots: &'a SlotSet, k: &Knobs) -> EngineInputs<'a> {
        EngineInputs {
            now: minute(k.now_min),
            selection: match k.selection_min {
                None => Selection::Now,
                Some(m) => Selection::At(minute(m)),
            },
            remaining_ms: k.remaining_ms,
            next_eligible: slots.first_eligible().copied(),
            slots,
            loading: k.loading,
            clock: FacilityClock::new(UTC),
            method: FulfillmentMethod::Pickup,
            previous_method: Some(if k.method_changed {
                FulfillmentMethod::Delivery
            } else {
                FulfillmentMethod::Pickup
            }),
            buffer: Duration::minutes(k.buffer_min),
        }
    }

    proptest! {
        /// The Now sentinel short-circuits everything.
        #[test]
        fn now_sentinel_is_inert(slots in slot_set(), seed in 0u64..1000) {
            let mut engine = TimeslotEngine::new();
            let inputs = EngineInputs {
                now: minute((seed % 1440) as i64),
                selection: Selection::Now,
                remaining_ms: seed as i64 - 500,
                next_eligible: slots.first_eligible().copied(),
                slots: &slots,
                loading: seed % 2 == 0,
                clock: FacilityClock::new(UTC),
                method: FulfillmentMethod::Delivery,
                previous_method: None,
                buffer: Duration::minutes((seed % 60) as i64),
            };
            prop_assert!(engine.evaluate(&inputs).is_empty());
        }

        /// The closed notice fires at most once per engine instance, no
        /// matter what sequence of inputs is observed.
        #[test]
        fn closed_notice_at_most_once(slots in slot_set(), evals in 1usize..20) {
            let mut engine = TimeslotEngine::new();
            let mut closed_count = 0;
            for i in 0..evals {
                let inputs = EngineInputs {
                    now: minute((i as i64 * 37) % 1440),
                    selection: Selection::At(minute((i as i64 * 53) % 1440)),
                    remaining_ms: (i as i64 - 3) * 1000,
                    next_eligible: slots.first_eligible().copied(),
                    slots: &slots,
                    loading: i % 3 == 0,
                    clock: FacilityClock::new(UTC),
                    method: FulfillmentMethod::Delivery,
                    previous_method: Some(FulfillmentMethod::Delivery),
                    buffer: Duration::minutes(15),
                };
                if engine.evaluate(&inputs).notice == Some(Notice::Closed) {
                    closed_count += 1;
                }
            }
            prop_assert!(closed_count <= 1);
        }

        /// While loading, no evaluation produces any action.
        #[test]
        fn loading_produces_no_actions(slots in slot_set(), k in knobs()) {
            let mut engine = TimeslotEngine::new();
            let mut inputs = assemble(&slots, &k);
            inputs.loading = true;
            prop_assert!(engine.evaluate(&inputs).is_empty());
        }

        /// A selection mutation always comes with a countdown mutation.
        #[test]
        fn selection_and_countdown_move_together(slots in slot_set(), k in knobs()) {
            let mut engine = TimeslotEngine::new();
            let inputs = assemble(&slots, &k);
            let actions = engine.evaluate(&inputs);
            prop_assert_eq!(
                actions.set_selection.is_some(),
                actions.set_remaining_ms.is_some()
            );
        }

        /// Empty eligible list and not loading always ends in either the
        /// closed notice path (selection untouched) or the Now fallback.
        #[test]
        fn empty_eligible_resolves(slots in slot_set(), k in knobs()) {
            let mut engine = TimeslotEngine::new();
            let mut inputs = assemble(&slots, &k);
            inputs.loading = false;
            prop_assume!(inputs.slots.eligible().is_empty());
            prop_assume!(inputs.selection != Selection::Now);
            let actions = engine.evaluate(&inputs);
            let closed_path = actions.set_selection.is_none();
            let fallback_path = actions.set_selection == Some(Selection::Now)
                && actions.set_remaining_ms == Some(0);
            prop_assert!(closed_path || fallback_path);
        }

        /// The reassigned countdown is never negative when the next window
        /// satisfies the lead-time constraint.
        #[test]
        fn reassigned_countdown_non_negative(
            sel_min in 0i64..600,
            now_min in 0i64..600,
            buffer in 0i64..60,
            gap in 0i64..240
        ) {
            let earliest_min = now_min + buffer;
            let next = TimeWindow {
                start: minute(earliest_min + gap),
                end: minute(earliest_min + gap + 30),
            };
            let slots = SlotSet::new(vec![next], vec![next]).unwrap();
            let mut engine = TimeslotEngine::new();
            let inputs = EngineInputs {
                now: minute(now_min),
                selection: Selection::At(minute(sel_min)),
                remaining_ms: 0,
                next_eligible: Some(next),
                slots: &slots,
                loading: false,
                clock: FacilityClock::new(UTC),
                method: FulfillmentMethod::Delivery,
                previous_method: Some(FulfillmentMethod::Delivery),
                buffer: Duration::minutes(buffer),
            };
            let actions = engine.evaluate(&inputs);
            if let Some(ms) = actions.set_remaining_ms {
                prop_assert!(ms >= 0, "countdown went negative: {}", ms);
            }
        }
    }
}

/// State machine model for the notice/selection lifecycle
#[cfg(test)]
mod state_machine {
    use super::*;
    use stateright::*;

    /// Observations the engine can make, abstracted from concrete times.
    #[derive(Clone, Debug, Hash, PartialEq)]
    enum Observation {
        ClosedDay,
        SelectionExpired,
        MethodSwitched,
        SlotsDrained,
        Quiet,
    }

    #[derive(Clone, Copy, Debug, Hash, PartialEq)]
    enum Sel {
        AsSoonAsPossible,
        Window,
        Stale,
    }

    #[derive(Clone, Debug, Hash, PartialEq)]
    struct EngineModelState {
        notice_fired: bool,
        closed_notices: u8,
        selection: Sel,
        countdown_positive: bool,
        evals: u8,
    }

    struct EngineModel {
        max_evals: u8,
    }

    impl Model for EngineModel {
        type State = EngineModelState;
        type Action = Observation;

        fn init_states(&self) -> Vec<Self::State> {
            vec![EngineModelState {
                notice_fired: false,
                closed_notices: 0,
                selection: Sel::Stale,
                countdown_positive: false,
                evals: 0,
            }]
        }

        fn actions(&self, state: &Self::State, actions: &mut Vec<Self::Action>) {
            if state.evals < self.max_evals {
                actions.push(Observation::ClosedDay);
                actions.push(Observation::SelectionExpired);
                actions.push(Observation::MethodSwitched);
                actions.push(Observation::SlotsDrained);
                actions.push(Observation::Quiet);
            }
        }

        fn next_state(&self, state: &Self::State, action: Self::Action) -> Option<Self::State> {
            let mut next = state.clone();
            next.evals += 1;
            match action {
                Observation::ClosedDay => {
                    // Selection untouched; notice only on the first sighting.
                    if !next.notice_fired {
                        next.notice_fired = true;
                        next.closed_notices += 1;
                    }
                }
                Observation::SelectionExpired => {
                    if next.selection == Sel::Stale && !next.countdown_positive {
                        next.selection = Sel::Window;
                        next.countdown_positive = true;
                    }
                }
                Observation::MethodSwitched => {
                    if next.countdown_positive {
                        next.selection = Sel::Window;
                    }
                }
                Observation::SlotsDrained => {
                    next.selection = Sel::AsSoonAsPossible;
                    next.countdown_positive = false;
                }
                Observation::Quiet => {
                    // Countdown ticks away between interesting inputs.
                    next.countdown_positive = false;
                    if next.selection == Sel::Window {
                        next.selection = Sel::Stale;
                    }
                }
            }
            Some(next)
        }

        fn properties(&self) -> Vec<Property<Self>> {
            vec![
                Property::always("closed notice never duplicated", |_: &Self, s: &EngineModelState| {
                    s.closed_notices <= 1
                }),
                Property::always(
                    "as-soon-as-possible never carries a countdown",
                    |_: &Self, s: &EngineModelState| {
                        s.selection != Sel::AsSoonAsPossible || !s.countdown_positive
                    },
                ),
                Property::sometimes("closed notice reachable", |_: &Self, s: &EngineModelState| {
                    s.closed_notices == 1
                }),
                Property::sometimes("reassignment reachable", |_: &Self, s: &EngineModelState| {
                    s.selection == Sel::Window
                }),
                Property::sometimes("fallback reachable", |_: &Self, s: &EngineModelState| {
                    s.selection == Sel::AsSoonAsPossible
                }),
            ]
        }
    }

    #[test]
    fn test_engine_state_machine() {
        let model = EngineModel { max_evals: 5 };
        model
            .checker()
            .threads(1)
            .spawn_bfs()
            .join()
            .assert_properties();
    }

    #[test]
    fn test_engine_model_explores_states() {
        let model = EngineModel { max_evals: 3 };
        let checker = model.checker().threads(1).spawn_bfs().join();
        assert!(checker.state_count() > 1, "Should explore multiple states");
    }
}

/// Kani formal verification proofs
#[cfg(kani)]
mod kani_proofs {
    use super::*;

    #[kani::proof]
    fn countdown_guards_mutually_exclusive() {
        let remaining_ms: i64 = kani::any();
        kani::assert(
            !(countdown_expired(remaining_ms) && countdown_active(remaining_ms)),
            "a countdown cannot be both expired and active",
        );
    }

    #[kani::proof]
    fn negative_countdown_always_expired() {
        let remaining_ms: i64 = kani::any();
        kani::assume(remaining_ms < 0);
        kani::assert(
            countdown_expired(remaining_ms),
            "negative slack must classify as expired",
        );
    }

    #[kani::proof]
    fn one_millisecond_satisfies_neither_guard() {
        kani::assert(
            !countdown_expired(1) && !countdown_active(1),
            "the 1ms boundary is deliberately dead",
        );
    }
}
