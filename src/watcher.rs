//! Watch loop
//!
//! Owns everything the engine deliberately does not: the ticking countdown,
//! the slot refresh cadence, and applying each evaluation's actions to the
//! selection store and the notifier. The engine itself stays synchronous
//! and is invoked once per input change.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::FacilityClock;
use crate::config::Config;
use crate::engine::{EngineInputs, FulfillmentMethod, Notice, TimeslotEngine};
use crate::notify::Notifier;
use crate::provider::SlotProvider;
use crate::slots::{SlotSet, TimeWindow};
use crate::store::SelectionStore;

/// One evaluation pass: build the input tuple from current state, run the
/// engine, apply the actions. Returns the notice to dispatch, if any.
pub fn evaluate_once(
    engine: &mut TimeslotEngine,
    store: &mut SelectionStore,
    clock: FacilityClock,
    buffer: chrono::Duration,
    slots: &SlotSet,
    loading: bool,
    now: DateTime<Utc>,
) -> Option<Notice> {
    let earliest = clock.earliest_acceptable(now, buffer);
    let inputs = EngineInputs {
        now,
        selection: store.selection(),
        remaining_ms: store.remaining_ms(),
        next_eligible: slots.next_eligible(&clock, earliest),
        slots,
        loading,
        clock,
        method: store.method(),
        previous_method: store.previous_method(),
        buffer,
    };

    let actions = engine.evaluate(&inputs);
    store.mark_evaluated();
    if store.apply(&actions) {
        debug!(
            selection = ?store.selection(),
            remaining_ms = store.remaining_ms(),
            "selection state updated"
        );
    }
    actions.notice
}

pub struct Watcher {
    clock: FacilityClock,
    tick: Duration,
    refresh_every: Duration,
    delivery_buffer: chrono::Duration,
    pickup_buffer: chrono::Duration,
    engine: TimeslotEngine,
    store: SelectionStore,
    /// Offered windows from the last successful fetch. `None` until the
    /// first fetch lands, which is the loading state.
    offered: Option<Vec<TimeWindow>>,
}

impl Watcher {
    pub fn new(config: &Config, store: SelectionStore) -> Self {
        Self {
            clock: FacilityClock::new(config.facility_tz),
            tick: Duration::from_millis(config.tick_interval_ms),
            refresh_every: Duration::from_secs(config.refresh_interval_secs),
            delivery_buffer: chrono::Duration::minutes(config.delivery_buffer_minutes),
            pickup_buffer: chrono::Duration::minutes(config.pickup_buffer_minutes),
            engine: TimeslotEngine::new(),
            store,
            offered: None,
        }
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    /// Switch the fulfillment method; the next evaluation sees the change.
    pub fn switch_method(&mut self, method: FulfillmentMethod) {
        self.store.switch_method(method);
    }

    fn buffer(&self) -> chrono::Duration {
        match self.store.method() {
            FulfillmentMethod::Delivery => self.delivery_buffer,
            FulfillmentMethod::Pickup => self.pickup_buffer,
        }
    }

    /// Replace the offered list, as if fetched. Used by evaluations driven
    /// from tests and by the refresh path.
    pub fn set_offered(&mut self, offered: Vec<TimeWindow>) {
        self.offered = Some(offered);
    }

    async fn refresh(&mut self, provider: &SlotProvider) {
        match provider.fetch_slots().await {
            Ok(slots) => {
                debug!("Slot snapshot refreshed: {} offered", slots.len());
                self.offered = Some(slots);
            }
            // A stale snapshot beats flipping back to inconclusive.
            Err(e) => warn!("Slot refresh failed, keeping previous snapshot: {}", e),
        }
    }

    /// Run one evaluation against the current snapshot at `now`.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Result<Option<Notice>> {
        let buffer = self.buffer();
        let earliest = self.clock.earliest_acceptable(now, buffer);
        let (set, loading) = match &self.offered {
            Some(all) => (SlotSet::derive(all.clone(), &self.clock, earliest)?, false),
            None => (SlotSet::default(), true),
        };
        Ok(evaluate_once(
            &mut self.engine,
            &mut self.store,
            self.clock,
            buffer,
            &set,
            loading,
            now,
        ))
    }

    /// Fetch once, evaluate once, dispatch whatever came out.
    pub async fn run_once(&mut self, provider: &SlotProvider, notifier: &Notifier) -> Result<()> {
        self.refresh(provider).await;
        if let Some(notice) = self.evaluate(Utc::now())? {
            dispatch(notifier, &notice).await;
        }
        Ok(())
    }

    /// Run until cancelled: countdown ticks drive evaluations, the refresh
    /// timer keeps the snapshot current.
    pub async fn run(
        &mut self,
        provider: &SlotProvider,
        notifier: &Notifier,
        cancel: CancellationToken,
    ) -> Result<()> {
        info!(
            "Watcher started (tick {:?}, refresh {:?}, tz {})",
            self.tick,
            self.refresh_every,
            self.clock.tz()
        );

        let mut ticker = tokio::time::interval(self.tick);
        // The first interval tick completes immediately; consume it so the
        // countdown only decays with real elapsed time. The refresher's
        // immediate first tick is wanted: it performs the initial fetch.
        ticker.tick().await;
        let mut refresher = tokio::time::interval(self.refresh_every);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Watcher shutting down");
                    return Ok(());
                }
                _ = refresher.tick() => {
                    self.refresh(provider).await;
                    self.step(notifier, false).await;
                }
                _ = ticker.tick() => {
                    self.store.tick(self.tick.as_millis() as i64);
                    self.step(notifier, true).await;
                }
            }
        }
    }

    async fn step(&mut self, notifier: &Notifier, from_tick: bool) {
        match self.evaluate(Utc::now()) {
            Ok(Some(notice)) => dispatch(notifier, &notice).await,
            Ok(None) => {}
            Err(e) => {
                if from_tick {
                    warn!("Evaluation skipped: {}", e);
                } else {
                    warn!("Evaluation skipped after refresh: {}", e);
                }
            }
        }
    }
}

async fn dispatch(notifier: &Notifier, notice: &Notice) {
    if let Err(e) = notifier.send_notice(notice).await {
        error!("Failed to deliver notice: {}", e);
    }
}
