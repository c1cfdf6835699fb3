//! The alert event state machine.
//!
//! [`LifecycleEngine`] is the only writer of lifecycle state. Every operation
//! follows the same shape: read the clock once, load the event, settle a lapsed
//! silence, ask the [`OwnershipGuard`], then commit a compare-and-swap
//! [`StateMutation`] through the [`EventStore`].
//!
//! ```text
//!            claim              silence
//!  Firing ─────────▶ Claimed ─────────▶ Silenced
//!    ▲  ◀───────────   │                  │
//!    │     release     └──── resolve ─┐   │ unsilence / expiry
//!    └────────────────────────────────┼───┘
//!                                     ▼
//!                                 Resolved
//! ```
//!
//! The engine never retries. A `Conflict` means another request won the race;
//! callers may retry, and repeated claims or silences by the same operator are
//! safe.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::batch::{BatchItem, BatchOutcome, BatchReport, CancelFlag};
use crate::clock::{Clock, SystemClock};
use crate::config::LifecycleConfig;
use crate::error::{AlertError, Result};
use crate::guard::OwnershipGuard;
use crate::store::EventStore;
use crate::types::{AlertEvent, EventState, EventStatus, StateMutation};

/// How many times a lapsed silence is re-read when a concurrent writer moves
/// the event while it is being settled.
const SETTLE_ATTEMPTS: usize = 3;

/// Reverts `event` to firing if its silence has lapsed at `now`.
///
/// The correction is committed through the store. If another writer changed
/// the event first, the fresh copy is re-read and checked again.
pub(crate) fn settle(
    store: &dyn EventStore,
    mut event: AlertEvent,
    now: DateTime<Utc>,
) -> Result<AlertEvent> {
    for _ in 0..SETTLE_ATTEMPTS {
        if !event.silence_expired(now) {
            return Ok(event);
        }

        let mutation =
            StateMutation::transition("expire", event.state().clone(), EventState::Firing);
        match store.update_status(event.id(), &mutation) {
            Ok(settled) => {
                debug!(event_id = %settled.id(), "silence lapsed, event firing again");
                return Ok(settled);
            }
            Err(AlertError::Conflict { .. }) => event = store.get(event.id())?,
            Err(e) => return Err(e),
        }
    }

    if event.silence_expired(now) {
        return Err(AlertError::Conflict {
            id: event.id().to_string(),
            reason: "event kept changing while settling an expired silence".to_string(),
        });
    }
    Ok(event)
}

/// Applies lifecycle transitions to alert events.
#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    guard: OwnershipGuard,
    config: LifecycleConfig,
}

impl std::fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine")
            .field("guard", &self.guard)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LifecycleEngine {
    /// Creates an engine reading the wall clock.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, config: LifecycleConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    /// Creates an engine with an explicit clock.
    #[must_use]
    pub fn with_clock(
        store: Arc<dyn EventStore>,
        clock: Arc<dyn Clock>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            clock,
            guard: OwnershipGuard::new(config.max_silence()),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Returns the guard used for transition checks.
    #[must_use]
    pub const fn guard(&self) -> &OwnershipGuard {
        &self.guard
    }

    pub(crate) fn store(&self) -> &dyn EventStore {
        self.store.as_ref()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Fetches one event, reverting a lapsed silence first.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is absent, `Unavailable` if the store fails.
    pub fn get_event(&self, id: &str) -> Result<AlertEvent> {
        let now = self.clock.now();
        self.load(id, now)
    }

    /// Claims `id` for `operator`.
    ///
    /// Claiming an event the operator already holds is a no-op success.
    ///
    /// # Errors
    ///
    /// `Conflict` if another operator holds it (or a concurrent write won),
    /// `InvalidState` if silenced or resolved, `NotFound`, `Unavailable`.
    pub fn claim(&self, id: &str, operator: &str) -> Result<AlertEvent> {
        require_operator(operator)?;
        let now = self.clock.now();
        let event = self.load(id, now)?;

        if let Err(e) = self.guard.check_claim(&event, operator) {
            debug!(event_id = %id, operator, error = %e, "claim rejected");
            return Err(e);
        }
        if event.claimed_by() == Some(operator) {
            debug!(event_id = %id, operator, "already claimed by operator");
            return Ok(event);
        }

        self.commit(
            &event,
            operator,
            "claim",
            EventState::Claimed {
                claimed_by: operator.to_string(),
            },
        )
    }

    /// Releases a claim held by `operator`, returning the event to firing.
    ///
    /// # Errors
    ///
    /// `Conflict` if another operator holds it, `InvalidState` if not claimed,
    /// `NotFound`, `Unavailable`.
    pub fn release(&self, id: &str, operator: &str) -> Result<AlertEvent> {
        require_operator(operator)?;
        let now = self.clock.now();
        let event = self.load(id, now)?;

        if let Err(e) = self.guard.check_release(&event, operator) {
            debug!(event_id = %id, operator, error = %e, "release rejected");
            return Err(e);
        }

        self.commit(&event, operator, "release", EventState::Firing)
    }

    /// Silences `id` until `now + duration`.
    ///
    /// Silencing a claimed event drops the claim. Silencing an event the
    /// operator already silenced is a no-op success that keeps the original
    /// deadline.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero or over-long duration, `Conflict` if
    /// another operator holds the claim, `InvalidState` if resolved or
    /// silenced by another operator, `NotFound`, `Unavailable`.
    pub fn silence(&self, id: &str, duration: Duration, operator: &str) -> Result<AlertEvent> {
        require_operator(operator)?;
        self.guard.check_duration(duration)?;
        let now = self.clock.now();
        let until = silence_deadline(now, duration)?;

        match self.plan_silence(id, until, duration, operator, now)? {
            SilencePlan::Transition(mutation) => self.apply(id, operator, &mutation),
            SilencePlan::Unchanged(event) => Ok(event),
        }
    }

    /// Lifts a silence early.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the event is silenced (a lapsed silence counts as
    /// firing), `NotFound`, `Unavailable`.
    pub fn unsilence(&self, id: &str, operator: &str) -> Result<AlertEvent> {
        require_operator(operator)?;
        let now = self.clock.now();
        let event = self.load(id, now)?;

        if let Err(e) = self.guard.check_unsilence(&event) {
            debug!(event_id = %id, operator, error = %e, "unsilence rejected");
            return Err(e);
        }

        self.commit(&event, operator, "unsilence", EventState::Firing)
    }

    /// Silences every id independently.
    ///
    /// Ids are validated and applied one by one, in chunks of
    /// `batch_chunk_size`; `cancel` is checked before each chunk. Failures are
    /// reported per id and never roll back other ids. Ids left when the batch
    /// is cancelled are reported as skipped; ids already applied stay applied.
    /// Repeated ids are processed once.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for arguments that apply to every id: an empty or
    /// oversized id list, a bad duration, or a missing operator.
    pub fn batch_silence(
        &self,
        ids: &[String],
        duration: Duration,
        operator: &str,
        cancel: &CancelFlag,
    ) -> Result<BatchReport> {
        require_operator(operator)?;
        if ids.is_empty() {
            return Err(AlertError::invalid_argument("batch silence needs at least one id"));
        }
        if ids.len() > self.config.max_batch_ids {
            return Err(AlertError::invalid_argument(format!(
                "batch of {} ids exceeds maximum of {}",
                ids.len(),
                self.config.max_batch_ids
            )));
        }
        self.guard.check_duration(duration)?;

        let now = self.clock.now();
        let until = silence_deadline(now, duration)?;

        let mut seen = HashSet::new();
        let unique: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();

        let mut items: Vec<BatchItem> = Vec::with_capacity(unique.len());
        let mut cancelled = false;

        for chunk in unique.chunks(self.config.batch_chunk_size.max(1)) {
            if cancel.is_cancelled() {
                cancelled = true;
                items.extend(chunk.iter().map(|id| BatchItem {
                    id: (*id).clone(),
                    outcome: BatchOutcome::Skipped,
                }));
                continue;
            }

            let start = items.len();
            let mut planned = Vec::new();
            for id in chunk {
                match self.plan_silence(id, until, duration, operator, now) {
                    Ok(SilencePlan::Transition(mutation)) => {
                        planned.push(((*id).clone(), mutation));
                        items.push(BatchItem {
                            id: (*id).clone(),
                            outcome: BatchOutcome::Skipped,
                        });
                    }
                    Ok(SilencePlan::Unchanged(event)) => items.push(BatchItem {
                        id: (*id).clone(),
                        outcome: BatchOutcome::Applied(event),
                    }),
                    Err(e) => items.push(BatchItem {
                        id: (*id).clone(),
                        outcome: BatchOutcome::Failed(e),
                    }),
                }
            }

            for (id, result) in self.store.batch_update_status(&planned) {
                let outcome = match result {
                    Ok(event) => {
                        info!(event_id = %id, operator, until = %until, "alert event silenced");
                        BatchOutcome::Applied(event)
                    }
                    Err(e) => {
                        warn!(event_id = %id, operator, error = %e, "batch silence failed for event");
                        BatchOutcome::Failed(e)
                    }
                };
                if let Some(item) = items[start..].iter_mut().find(|item| item.id == id) {
                    item.outcome = outcome;
                }
            }
        }

        let report = BatchReport::new(items, cancelled);
        info!(
            operator,
            requested = ids.len(),
            applied = report.applied().count(),
            failed = report.failed().count(),
            skipped = report.skipped().count(),
            cancelled,
            "batch silence finished"
        );
        Ok(report)
    }

    /// Marks `id` resolved. Resolving a resolved event is a no-op success.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Conflict` on a concurrent write, `Unavailable`.
    pub fn resolve(&self, id: &str) -> Result<AlertEvent> {
        let now = self.clock.now();
        let event = self.load(id, now)?;

        if event.status().is_terminal() {
            debug!(event_id = %id, "already resolved");
            return Ok(event);
        }

        self.commit(
            &event,
            "ingestion",
            "resolve",
            EventState::Resolved { resolved_at: now },
        )
    }

    fn load(&self, id: &str, now: DateTime<Utc>) -> Result<AlertEvent> {
        let event = self.store.get(id)?;
        settle(self.store.as_ref(), event, now)
    }

    fn plan_silence(
        &self,
        id: &str,
        until: DateTime<Utc>,
        duration: Duration,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<SilencePlan> {
        let event = self.load(id, now)?;
        if let Err(e) = self.guard.check_silence(&event, duration, operator) {
            debug!(event_id = %id, operator, error = %e, "silence rejected");
            return Err(e);
        }
        if event.status() == EventStatus::Silenced {
            debug!(event_id = %id, operator, "already silenced by operator");
            return Ok(SilencePlan::Unchanged(event));
        }

        Ok(SilencePlan::Transition(StateMutation::transition(
            "silence",
            event.state().clone(),
            EventState::Silenced {
                silence_until: until,
                silenced_by: operator.to_string(),
            },
        )))
    }

    fn commit(
        &self,
        event: &AlertEvent,
        operator: &str,
        operation: &'static str,
        next: EventState,
    ) -> Result<AlertEvent> {
        let mutation = StateMutation::transition(operation, event.state().clone(), next);
        self.apply(event.id(), operator, &mutation)
    }

    fn apply(&self, id: &str, operator: &str, mutation: &StateMutation) -> Result<AlertEvent> {
        match self.store.update_status(id, mutation) {
            Ok(updated) => {
                info!(
                    event_id = %id,
                    operator,
                    operation = mutation.operation(),
                    from = %mutation.expected().status(),
                    to = %updated.status(),
                    "alert event transitioned"
                );
                Ok(updated)
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(event_id = %id, operator, operation = mutation.operation(), error = %e, "transition not applied");
                }
                Err(e)
            }
        }
    }
}

enum SilencePlan {
    Transition(StateMutation),
    Unchanged(AlertEvent),
}

fn require_operator(operator: &str) -> Result<()> {
    if operator.trim().is_empty() {
        return Err(AlertError::invalid_argument("operator id cannot be empty"));
    }
    Ok(())
}

fn silence_deadline(now: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| AlertError::invalid_argument("silence duration out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryEventStore;
    use crate::types::{EventStatus, FiringReport, ALERTNAME_LABEL};
    use chrono::Duration as ChronoDuration;

    const HOUR: Duration = Duration::from_secs(3600);

    struct Fixture {
        engine: LifecycleEngine,
        store: Arc<MemoryEventStore>,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_config(LifecycleConfig::default())
        }

        fn with_config(config: LifecycleConfig) -> Self {
            let store = Arc::new(MemoryEventStore::new());
            let clock = Arc::new(ManualClock::default());
            let engine = LifecycleEngine::with_clock(store.clone(), clock.clone(), config);
            Self {
                engine,
                store,
                clock,
            }
        }

        fn firing(&self, instance: &str) -> String {
            let report = FiringReport::default()
                .label(ALERTNAME_LABEL, "HighLatency")
                .label("instance", instance);
            let event = AlertEvent::from_report(&report, self.clock.now());
            let id = event.id().to_string();
            self.store.insert(event).unwrap();
            id
        }
    }

    mod claim_tests {
        use super::*;

        #[test]
        fn claim_firing_event() {
            let f = Fixture::new();
            let id = f.firing("node-1");

            let event = f.engine.claim(&id, "alice").unwrap();
            assert_eq!(event.status(), EventStatus::Claimed);
            assert_eq!(event.claimed_by(), Some("alice"));
        }

        #[test]
        fn reclaim_by_same_operator_is_noop() {
            let f = Fixture::new();
            let id = f.firing("node-1");

            let first = f.engine.claim(&id, "alice").unwrap();
            let second = f.engine.claim(&id, "alice").unwrap();
            assert_eq!(first, second);
            assert_eq!(second.revision(), 1);
        }

        #[test]
        fn claim_by_other_operator_conflicts() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            f.engine.claim(&id, "alice").unwrap();

            let result = f.engine.claim(&id, "bob");
            assert!(matches!(result, Err(AlertError::Conflict { .. })));
            assert_eq!(f.engine.get_event(&id).unwrap().claimed_by(), Some("alice"));
        }

        #[test]
        fn claim_missing_event() {
            let f = Fixture::new();
            assert!(matches!(
                f.engine.claim("missing", "alice"),
                Err(AlertError::NotFound { .. })
            ));
        }

        #[test]
        fn claim_requires_operator() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            assert!(matches!(
                f.engine.claim(&id, "  "),
                Err(AlertError::InvalidArgument { .. })
            ));
        }

        #[test]
        fn claim_silenced_event_is_invalid_state() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            f.engine.silence(&id, HOUR, "alice").unwrap();

            assert!(matches!(
                f.engine.claim(&id, "bob"),
                Err(AlertError::InvalidState { .. })
            ));
        }

        #[test]
        fn release_returns_to_firing() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            f.engine.claim(&id, "alice").unwrap();

            assert!(matches!(
                f.engine.release(&id, "bob"),
                Err(AlertError::Conflict { .. })
            ));
            let event = f.engine.release(&id, "alice").unwrap();
            assert_eq!(event.status(), EventStatus::Firing);
            assert_eq!(event.claimed_by(), None);

            // Now anyone may claim it.
            assert!(f.engine.claim(&id, "bob").is_ok());
        }
    }

    mod silence_tests {
        use super::*;

        #[test]
        fn silence_sets_deadline_from_clock() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            let now = f.clock.now();

            let event = f.engine.silence(&id, HOUR, "alice").unwrap();
            assert_eq!(event.status(), EventStatus::Silenced);
            assert_eq!(event.silence_until(), Some(now + ChronoDuration::hours(1)));
            assert_eq!(event.claimed_by(), None);
        }

        #[test]
        fn silence_claimed_event_by_owner_drops_claim() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            f.engine.claim(&id, "alice").unwrap();

            let event = f.engine.silence(&id, HOUR, "alice").unwrap();
            assert_eq!(event.status(), EventStatus::Silenced);
            assert_eq!(event.claimed_by(), None);
        }

        #[test]
        fn silence_claimed_event_by_other_conflicts() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            f.engine.claim(&id, "alice").unwrap();

            assert!(matches!(
                f.engine.silence(&id, HOUR, "bob"),
                Err(AlertError::Conflict { .. })
            ));
        }

        #[test]
        fn silence_rejects_bad_durations() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            let too_long = f.engine.guard().max_silence() + Duration::from_secs(1);

            for duration in [Duration::ZERO, too_long] {
                assert!(matches!(
                    f.engine.silence(&id, duration, "alice"),
                    Err(AlertError::InvalidArgument { .. })
                ));
            }
            assert_eq!(f.engine.get_event(&id).unwrap().status(), EventStatus::Firing);
        }

        #[test]
        fn resilence_by_same_operator_is_noop() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            let first = f.engine.silence(&id, HOUR, "alice").unwrap();

            f.clock.advance(ChronoDuration::minutes(30));
            let retried = f.engine.silence(&id, HOUR, "alice").unwrap();
            assert_eq!(retried, first);
            assert_eq!(retried.revision(), 1);
            assert_eq!(f.engine.get_event(&id).unwrap(), first);
        }

        #[test]
        fn resilence_by_other_operator_is_invalid_state() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            let first = f.engine.silence(&id, HOUR, "alice").unwrap();

            let result = f.engine.silence(&id, HOUR * 2, "bob");
            assert!(matches!(
                result,
                Err(AlertError::InvalidState {
                    status: EventStatus::Silenced,
                    ..
                })
            ));
            assert_eq!(f.engine.get_event(&id).unwrap(), first);
        }

        #[test]
        fn lapsed_silence_reads_as_firing() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            f.engine.silence(&id, HOUR, "alice").unwrap();

            f.clock.advance(ChronoDuration::hours(1));
            let first = f.engine.get_event(&id).unwrap();
            let second = f.engine.get_event(&id).unwrap();

            assert_eq!(first.status(), EventStatus::Firing);
            assert_eq!(first.silence_until(), None);
            assert_eq!(first, second);
        }

        #[test]
        fn unsilence_returns_to_firing() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            f.engine.silence(&id, HOUR, "alice").unwrap();

            let event = f.engine.unsilence(&id, "bob").unwrap();
            assert_eq!(event.status(), EventStatus::Firing);
            assert_eq!(event.silence_until(), None);
        }

        #[test]
        fn unsilence_firing_is_invalid_state_and_unchanged() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            let before = f.engine.get_event(&id).unwrap();

            assert!(matches!(
                f.engine.unsilence(&id, "alice"),
                Err(AlertError::InvalidState { .. })
            ));
            assert_eq!(f.engine.get_event(&id).unwrap(), before);
        }

        #[test]
        fn unsilence_after_lapse_is_invalid_state() {
            let f = Fixture::new();
            let id = f.firing("node-1");
            f.engine.silence(&id, HOUR, "alice").unwrap();
            f.clock.advance(ChronoDuration::hours(2));

            assert!(matches!(
                f.engine.unsilence(&id, "alice"),
                Err(AlertError::InvalidState { .. })
            ));
        }
    }

    mod batch_tests {
        use super::*;

        #[test]
        fn partial_success_is_reported_per_id() {
            let f = Fixture::new();
            let a = f.firing("node-1");
            let b = f.firing("node-2");
            let ids = vec![a.clone(), b.clone(), "bad".to_string()];

            let report = f
                .engine
                .batch_silence(&ids, HOUR, "alice", &CancelFlag::new())
                .unwrap();

            assert_eq!(report.items().len(), 3);
            assert_eq!(report.applied().count(), 2);
            assert!(matches!(
                report.outcome("bad"),
                Some(BatchOutcome::Failed(AlertError::NotFound { .. }))
            ));
            let until = f.clock.now() + ChronoDuration::hours(1);
            for id in [&a, &b] {
                assert_eq!(f.engine.get_event(id).unwrap().silence_until(), Some(until));
            }
        }

        #[test]
        fn preserves_caller_order_and_dedupes() {
            let f = Fixture::new();
            let a = f.firing("node-1");
            let b = f.firing("node-2");
            let ids = vec![b.clone(), a.clone(), b.clone()];

            let report = f
                .engine
                .batch_silence(&ids, HOUR, "alice", &CancelFlag::new())
                .unwrap();

            let order: Vec<_> = report.items().iter().map(|i| i.id.clone()).collect();
            assert_eq!(order, vec![b, a]);
            assert!(report.all_applied());
        }

        #[test]
        fn rejects_empty_and_oversized_batches() {
            let f = Fixture::with_config(LifecycleConfig {
                max_batch_ids: 2,
                ..Default::default()
            });
            let cancel = CancelFlag::new();

            assert!(matches!(
                f.engine.batch_silence(&[], HOUR, "alice", &cancel),
                Err(AlertError::InvalidArgument { .. })
            ));
            let ids: Vec<String> = (0..3).map(|i| format!("id-{i}")).collect();
            assert!(matches!(
                f.engine.batch_silence(&ids, HOUR, "alice", &cancel),
                Err(AlertError::InvalidArgument { .. })
            ));
        }

        #[test]
        fn bad_duration_fails_whole_batch() {
            let f = Fixture::new();
            let a = f.firing("node-1");
            let result = f
                .engine
                .batch_silence(&[a], Duration::ZERO, "alice", &CancelFlag::new());
            assert!(matches!(result, Err(AlertError::InvalidArgument { .. })));
        }

        #[test]
        fn cancelled_before_start_skips_everything() {
            let f = Fixture::new();
            let a = f.firing("node-1");
            let cancel = CancelFlag::new();
            cancel.cancel();

            let report = f
                .engine
                .batch_silence(&[a.clone()], HOUR, "alice", &cancel)
                .unwrap();

            assert!(report.was_cancelled());
            assert_eq!(report.skipped().collect::<Vec<_>>(), vec![a.as_str()]);
            assert_eq!(f.engine.get_event(&a).unwrap().status(), EventStatus::Firing);
        }

        #[test]
        fn mixed_states_in_one_batch() {
            let f = Fixture::new();
            let firing = f.firing("node-1");
            let claimed = f.firing("node-2");
            let resolved = f.firing("node-3");
            f.engine.claim(&claimed, "bob").unwrap();
            f.engine.resolve(&resolved).unwrap();

            let ids = vec![firing.clone(), claimed.clone(), resolved.clone()];
            let report = f
                .engine
                .batch_silence(&ids, HOUR, "alice", &CancelFlag::new())
                .unwrap();

            assert!(report.outcome(&firing).is_some_and(BatchOutcome::is_applied));
            assert!(matches!(
                report.outcome(&claimed),
                Some(BatchOutcome::Failed(AlertError::Conflict { .. }))
            ));
            assert!(matches!(
                report.outcome(&resolved),
                Some(BatchOutcome::Failed(AlertError::InvalidState { .. }))
            ));
        }

        #[test]
        fn retried_batch_leaves_own_silences_untouched() {
            let f = Fixture::new();
            let ids = vec![f.firing("node-1"), f.firing("node-2")];
            let first = f
                .engine
                .batch_silence(&ids, HOUR, "alice", &CancelFlag::new())
                .unwrap();

            f.clock.advance(ChronoDuration::minutes(10));
            let retried = f
                .engine
                .batch_silence(&ids, HOUR, "alice", &CancelFlag::new())
                .unwrap();
            assert!(retried.all_applied());
            assert_eq!(
                retried.applied().collect::<Vec<_>>(),
                first.applied().collect::<Vec<_>>()
            );

            let foreign = f
                .engine
                .batch_silence(&ids, HOUR, "bob", &CancelFlag::new())
                .unwrap();
            assert_eq!(foreign.failed().count(), 2);
            assert!(foreign.failed().all(|(_, e)| matches!(e, AlertError::InvalidState { .. })));
        }
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn resolve_from_any_active_state() {
            let f = Fixture::new();
            let firing = f.firing("node-1");
            let claimed = f.firing("node-2");
            let silenced = f.firing("node-3");
            f.engine.claim(&claimed, "alice").unwrap();
            f.engine.silence(&silenced, HOUR, "alice").unwrap();

            for id in [&firing, &claimed, &silenced] {
                let event = f.engine.resolve(id).unwrap();
                assert_eq!(event.status(), EventStatus::Resolved);
            }
        }

        #[test]
        fn resolve_is_idempotent_and_terminal() {
            let f = Fixture::new();
            let id = f.firing("node-1");

            let first = f.engine.resolve(&id).unwrap();
            let second = f.engine.resolve(&id).unwrap();
            assert_eq!(first, second);

            assert!(matches!(
                f.engine.claim(&id, "alice"),
                Err(AlertError::InvalidState { .. })
            ));
            assert!(matches!(
                f.engine.silence(&id, HOUR, "alice"),
                Err(AlertError::InvalidState { .. })
            ));
        }
    }
}
