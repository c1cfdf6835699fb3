//! Read side: filtered, paginated listing and aggregate counts.
//!
//! [`QueryFacade`] reads the same [`EventStore`] the lifecycle engine writes.
//! Before answering it settles lapsed silences at a single `now`, so `list` and
//! `count` always agree on which events are firing.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::LifecycleConfig;
use crate::engine::settle;
use crate::error::{AlertError, Result};
use crate::store::EventStore;
use crate::types::{AlertEvent, EventStatus};

/// Predicate over alert events. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventFilter {
    /// Only events in this status.
    pub status: Option<EventStatus>,
    /// Only events carrying all of these label pairs.
    pub labels: BTreeMap<String, String>,
    /// Only events of this condition.
    pub fingerprint: Option<String>,
    /// Only events whose active window ends at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Only events whose active window starts before this instant.
    pub until: Option<DateTime<Utc>>,
    /// Case-insensitive substring over label values.
    pub search: Option<String>,
}

impl EventFilter {
    /// A filter matching everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to one status.
    #[must_use]
    pub const fn with_status(mut self, status: EventStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Requires a label pair.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Restricts to one fingerprint.
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// Restricts to events active within `[since, until)`.
    #[must_use]
    pub const fn within(mut self, since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    /// Adds a free-text search term.
    #[must_use]
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Returns true if `event` satisfies every set field.
    #[must_use]
    pub fn matches(&self, event: &AlertEvent) -> bool {
        if self.status.is_some_and(|s| s != event.status()) {
            return false;
        }

        if self
            .fingerprint
            .as_deref()
            .is_some_and(|fp| fp != event.fingerprint())
        {
            return false;
        }

        if !self
            .labels
            .iter()
            .all(|(k, v)| event.labels().get(k) == Some(v))
        {
            return false;
        }

        // Active window [first, last] must overlap [since, until).
        if self.since.is_some_and(|since| event.last_fired_at() < since) {
            return false;
        }
        if self.until.is_some_and(|until| event.first_fired_at() >= until) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                event
                    .labels()
                    .values()
                    .any(|v| v.to_lowercase().contains(&term))
            }
        }
    }
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page number, starting at 1.
    pub number: usize,
    /// Items per page.
    pub size: usize,
}

impl Page {
    /// Creates a page request.
    #[must_use]
    pub const fn new(number: usize, size: usize) -> Self {
        Self { number, size }
    }

    /// The first page of the given size.
    #[must_use]
    pub const fn first(size: usize) -> Self {
        Self::new(1, size)
    }

    /// Index of the first item on this page.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.number.saturating_sub(1).saturating_mul(self.size)
    }

    /// Checks the page against the configured bounds.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidArgument` for page 0 or a size outside
    /// `1..=max_size`.
    pub fn validate(&self, max_size: usize) -> Result<()> {
        if self.number == 0 {
            return Err(AlertError::invalid_argument("page numbers start at 1"));
        }
        if self.size == 0 || self.size > max_size {
            return Err(AlertError::invalid_argument(format!(
                "page size must be between 1 and {max_size}"
            )));
        }
        Ok(())
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// Events on this page, in listing order.
    pub items: Vec<AlertEvent>,
    /// Number of events matching the filter across all pages.
    pub total: usize,
    /// Page number served.
    pub page: usize,
    /// Page size served.
    pub size: usize,
}

impl PageResult {
    /// Number of pages needed to cover `total`.
    #[must_use]
    pub const fn page_count(&self) -> usize {
        if self.size == 0 {
            0
        } else {
            self.total.div_ceil(self.size)
        }
    }
}

/// Number of events in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Firing, unowned.
    pub firing: usize,
    /// Claimed by an operator.
    pub claimed: usize,
    /// Silenced.
    pub silenced: usize,
    /// Resolved.
    pub resolved: usize,
    /// All events.
    pub total: usize,
}

impl StatusCounts {
    /// Count for one status.
    #[must_use]
    pub const fn get(&self, status: EventStatus) -> usize {
        match status {
            EventStatus::Firing => self.firing,
            EventStatus::Claimed => self.claimed,
            EventStatus::Silenced => self.silenced,
            EventStatus::Resolved => self.resolved,
        }
    }

    /// Tallies one event in `status`.
    pub fn add(&mut self, status: EventStatus) {
        match status {
            EventStatus::Firing => self.firing += 1,
            EventStatus::Claimed => self.claimed += 1,
            EventStatus::Silenced => self.silenced += 1,
            EventStatus::Resolved => self.resolved += 1,
        }
        self.total += 1;
    }
}

/// Listing order: most recently fired first, ties by id ascending.
///
/// Store implementations sort with this before slicing pages, which makes
/// pagination deterministic.
#[must_use]
pub fn listing_order(a: &AlertEvent, b: &AlertEvent) -> Ordering {
    b.last_fired_at()
        .cmp(&a.last_fired_at())
        .then_with(|| a.id().cmp(b.id()))
}

/// Read-side facade over an [`EventStore`].
#[derive(Clone)]
pub struct QueryFacade {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
}

impl std::fmt::Debug for QueryFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryFacade")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl QueryFacade {
    /// Creates a facade reading the wall clock.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, config: LifecycleConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    /// Creates a facade with an explicit clock.
    #[must_use]
    pub fn with_clock(
        store: Arc<dyn EventStore>,
        clock: Arc<dyn Clock>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Lists one page of events matching `filter`.
    ///
    /// `None` requests the first page at the configured default size.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidArgument` for a bad page and
    /// `AlertError::Unavailable` if the store fails.
    pub fn list(&self, filter: &EventFilter, page: Option<Page>) -> Result<PageResult> {
        let page = page.unwrap_or_else(|| Page::first(self.config.default_page_size));
        page.validate(self.config.max_page_size)?;

        self.settle_expired()?;
        let (items, total) = self.store.list(filter, &page)?;

        debug!(
            total,
            page = page.number,
            size = page.size,
            returned = items.len(),
            "listed alert events"
        );

        Ok(PageResult {
            items,
            total,
            page: page.number,
            size: page.size,
        })
    }

    /// Counts events matching `filter`, using the same predicate as [`list`](Self::list).
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Unavailable` if the store fails.
    pub fn count(&self, filter: &EventFilter) -> Result<usize> {
        self.settle_expired()?;
        self.store.count(filter)
    }

    /// Counts events per status.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Unavailable` if the store fails.
    pub fn status_counts(&self) -> Result<StatusCounts> {
        self.settle_expired()?;
        self.store.status_counts()
    }

    /// Reverts every silence that has lapsed by now.
    ///
    /// An event that cannot be settled is left for its next read; only a
    /// failure to scan the store is returned.
    fn settle_expired(&self) -> Result<()> {
        let now = self.clock.now();
        let expired = self.store.expired_silences(now)?;
        if expired.is_empty() {
            return Ok(());
        }

        let mut settled = 0usize;
        for event in expired {
            let id = event.id().to_string();
            match settle(self.store.as_ref(), event, now) {
                Ok(_) => settled += 1,
                Err(e) => debug!(event_id = %id, error = %e, "lapsed silence not settled, retrying on next read"),
            }
        }
        debug!(count = settled, "settled lapsed silences before read");
        Ok(())
    }
}
