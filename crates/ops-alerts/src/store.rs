//! Durable keyed storage for alert events.
//!
//! The [`EventStore`] trait is the only serialization point per event:
//! [`EventStore::update_status`] is a compare-and-swap against the event's
//! current state and never partially applies. [`MemoryEventStore`] is the
//! bundled implementation, optionally snapshotting to disk via
//! [`ops_persist::JsonStore`] so that several processes can share one state
//! directory.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ops_persist::{JsonStore, SnapshotLock};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::error::{AlertError, Result};
use crate::query::{listing_order, EventFilter, Page, StatusCounts};
use crate::types::{AlertEvent, EventStatus, StateMutation};

/// Name of the snapshot collection used by persistent stores.
pub const EVENTS_COLLECTION: &str = "alert_events";

/// Storage contract for alert events.
///
/// Implementations must make [`update_status`](Self::update_status) atomic per
/// event: either the mutation's expectation holds and the whole change is
/// committed, or the event is left untouched.
pub trait EventStore: Send + Sync {
    /// Stores a newly created event.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Conflict` if the id exists or another unresolved
    /// event already carries the same fingerprint.
    fn insert(&self, event: AlertEvent) -> Result<()>;

    /// Fetches an event by id.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotFound` if the id is absent.
    fn get(&self, id: &str) -> Result<AlertEvent>;

    /// Returns one page of matching events in [`listing_order`] plus the total
    /// number of matches.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Unavailable` if the store cannot be read.
    fn list(&self, filter: &EventFilter, page: &Page) -> Result<(Vec<AlertEvent>, usize)>;

    /// Counts matching events.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Unavailable` if the store cannot be read.
    fn count(&self, filter: &EventFilter) -> Result<usize>;

    /// Counts every event by status from a single read.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Unavailable` if the store cannot be read.
    fn status_counts(&self) -> Result<StatusCounts>;

    /// Applies `mutation` to one event if its state still matches.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotFound`, `AlertError::Conflict` on a state
    /// mismatch, or `AlertError::Unavailable`.
    fn update_status(&self, id: &str, mutation: &StateMutation) -> Result<AlertEvent>;

    /// Applies each mutation independently and reports per id.
    ///
    /// One failing id never affects the others.
    fn batch_update_status(
        &self,
        updates: &[(String, StateMutation)],
    ) -> Vec<(String, Result<AlertEvent>)> {
        updates
            .iter()
            .map(|(id, mutation)| (id.clone(), self.update_status(id, mutation)))
            .collect()
    }

    /// Returns the unresolved event for `fingerprint`, if any.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Unavailable` if the store cannot be read.
    fn find_active(&self, fingerprint: &str) -> Result<Option<AlertEvent>>;

    /// Returns every silenced event whose silence has lapsed at `now`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Unavailable` if the store cannot be read.
    fn expired_silences(&self, now: DateTime<Utc>) -> Result<Vec<AlertEvent>>;
}

/// In-memory event store with optional JSON snapshots.
///
/// Lock acquisition is bounded by the store timeout; a caller that cannot get
/// the lock in time receives `AlertError::Unavailable`.
///
/// A persistent store may share its directory with other processes. Every
/// read reloads the snapshot under a shared file lock, and every write holds
/// the exclusive file lock while it reloads, applies the compare-and-swap
/// against the reloaded events and saves. A failed save rolls the in-memory
/// change back and leaves the file as it was.
#[derive(Debug)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<String, AlertEvent>>,
    snapshot: Option<JsonStore>,
    timeout: Duration,
}

/// Events held for writing, plus the file lock when persistent.
type WriteSession<'a> = (
    RwLockWriteGuard<'a, HashMap<String, AlertEvent>>,
    Option<SnapshotLock>,
);

impl MemoryEventStore {
    /// Default lock timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

    /// Creates an empty, non-persistent store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            snapshot: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Opens a store snapshotting to `dir`, loading any existing events.
    ///
    /// # Errors
    ///
    /// `AlertError::Serialization` if the snapshot on disk is corrupt, which
    /// is left untouched; `AlertError::Unavailable` if it cannot be read or
    /// locked.
    pub fn persistent(dir: &Path) -> Result<Self> {
        let store = JsonStore::new(dir, EVENTS_COLLECTION);
        let events: HashMap<String, AlertEvent> = {
            let _lock = store.lock_shared(Self::DEFAULT_TIMEOUT)?;
            store.load()?
        };
        debug!(count = events.len(), path = %store.path().display(), "loaded alert events from disk");
        Ok(Self {
            events: RwLock::new(events),
            snapshot: Some(store),
            timeout: Self::DEFAULT_TIMEOUT,
        })
    }

    /// Sets the call-level lock timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns true if writes are snapshotted to disk.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.snapshot.is_some()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, AlertEvent>>> {
        let Some(store) = &self.snapshot else {
            return self
                .events
                .try_read_for(self.timeout)
                .ok_or_else(|| lock_timeout("read", self.timeout));
        };

        let mut events = self.lock_events()?;
        let _lock = store.lock_shared(self.timeout)?;
        *events = store.load()?;
        Ok(RwLockWriteGuard::downgrade(events))
    }

    fn write(&self) -> Result<WriteSession<'_>> {
        let mut events = self.lock_events()?;
        let Some(store) = &self.snapshot else {
            return Ok((events, None));
        };

        let lock = store.lock_exclusive(self.timeout)?;
        *events = store.load()?;
        Ok((events, Some(lock)))
    }

    fn lock_events(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, AlertEvent>>> {
        self.events
            .try_write_for(self.timeout)
            .ok_or_else(|| lock_timeout("write", self.timeout))
    }

    fn persist(&self, events: &HashMap<String, AlertEvent>) -> Result<()> {
        let Some(store) = &self.snapshot else {
            return Ok(());
        };
        store.save(events).map_err(|e| {
            warn!(error = %e, path = %store.path().display(), "failed to snapshot alert events");
            AlertError::Unavailable {
                reason: format!("snapshot failed: {e}"),
            }
        })
    }

    fn apply_locked(
        events: &mut HashMap<String, AlertEvent>,
        id: &str,
        mutation: &StateMutation,
    ) -> Result<(AlertEvent, AlertEvent)> {
        let event = events.get_mut(id).ok_or_else(|| AlertError::not_found(id))?;
        let before = event.clone();
        event.apply(mutation)?;
        Ok((before, event.clone()))
    }
}

fn lock_timeout(kind: &str, timeout: Duration) -> AlertError {
    AlertError::Unavailable {
        reason: format!("{kind} lock not acquired within {timeout:?}"),
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for MemoryEventStore {
    fn insert(&self, event: AlertEvent) -> Result<()> {
        let (mut events, _lock) = self.write()?;

        if events.contains_key(event.id()) {
            return Err(AlertError::Conflict {
                id: event.id().to_string(),
                reason: "event id already exists".to_string(),
            });
        }
        if let Some(active) = events
            .values()
            .find(|e| e.fingerprint() == event.fingerprint() && !e.status().is_terminal())
        {
            return Err(AlertError::Conflict {
                id: active.id().to_string(),
                reason: format!("fingerprint {} already has an active event", event.fingerprint()),
            });
        }

        let id = event.id().to_string();
        events.insert(id.clone(), event);
        if let Err(e) = self.persist(&events) {
            events.remove(&id);
            return Err(e);
        }

        debug!(event_id = %id, "stored alert event");
        Ok(())
    }

    fn get(&self, id: &str) -> Result<AlertEvent> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| AlertError::not_found(id))
    }

    fn list(&self, filter: &EventFilter, page: &Page) -> Result<(Vec<AlertEvent>, usize)> {
        let events = self.read()?;
        let mut matched: Vec<&AlertEvent> = events.values().filter(|e| filter.matches(e)).collect();
        matched.sort_by(|a, b| listing_order(a, b));

        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .cloned()
            .collect();
        Ok((items, total))
    }

    fn count(&self, filter: &EventFilter) -> Result<usize> {
        Ok(self.read()?.values().filter(|e| filter.matches(e)).count())
    }

    fn status_counts(&self) -> Result<StatusCounts> {
        Ok(self
            .read()?
            .values()
            .fold(StatusCounts::default(), |mut counts, event| {
                counts.add(event.status());
                counts
            }))
    }

    fn update_status(&self, id: &str, mutation: &StateMutation) -> Result<AlertEvent> {
        let (mut events, _lock) = self.write()?;
        let (before, after) = Self::apply_locked(&mut events, id, mutation)?;

        if let Err(e) = self.persist(&events) {
            events.insert(id.to_string(), before);
            return Err(e);
        }
        Ok(after)
    }

    fn batch_update_status(
        &self,
        updates: &[(String, StateMutation)],
    ) -> Vec<(String, Result<AlertEvent>)> {
        let (mut events, _lock) = match self.write() {
            Ok(session) => session,
            Err(e) => {
                let reason = e.to_string();
                return updates
                    .iter()
                    .map(|(id, _)| {
                        (
                            id.clone(),
                            Err(AlertError::Unavailable {
                                reason: reason.clone(),
                            }),
                        )
                    })
                    .collect();
            }
        };

        let mut results = Vec::with_capacity(updates.len());
        let mut previous = Vec::new();
        for (id, mutation) in updates {
            match Self::apply_locked(&mut events, id, mutation) {
                Ok((before, after)) => {
                    previous.push(before);
                    results.push((id.clone(), Ok(after)));
                }
                Err(e) => results.push((id.clone(), Err(e))),
            }
        }

        // One snapshot per batch; on failure undo every change from this batch.
        if !previous.is_empty() {
            if let Err(e) = self.persist(&events) {
                let reason = e.to_string();
                for before in previous {
                    events.insert(before.id().to_string(), before);
                }
                for (_, result) in &mut results {
                    if result.is_ok() {
                        *result = Err(AlertError::Unavailable {
                            reason: reason.clone(),
                        });
                    }
                }
            }
        }

        results
    }

    fn find_active(&self, fingerprint: &str) -> Result<Option<AlertEvent>> {
        Ok(self
            .read()?
            .values()
            .find(|e| e.fingerprint() == fingerprint && !e.status().is_terminal())
            .cloned())
    }

    fn expired_silences(&self, now: DateTime<Utc>) -> Result<Vec<AlertEvent>> {
        Ok(self
            .read()?
            .values()
            .filter(|e| e.status() == EventStatus::Silenced && e.silence_expired(now))
            .cloned()
            .collect())
    }
}
