//! Batch outcomes and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::AlertError;
use crate::types::AlertEvent;

/// Cancellation signal shared between a batch and whoever may abort it.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What happened to one id in a batch.
#[derive(Debug)]
pub enum BatchOutcome {
    /// The operation applied; holds the resulting event.
    Applied(AlertEvent),
    /// The operation was rejected for this id.
    Failed(AlertError),
    /// The batch was cancelled before this id was attempted.
    Skipped,
}

impl BatchOutcome {
    /// Returns true if the operation applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Outcome for one id.
#[derive(Debug)]
pub struct BatchItem {
    /// The id as given by the caller.
    pub id: String,
    /// What happened.
    pub outcome: BatchOutcome,
}

/// Per-id results of a batch, in the caller's order.
#[derive(Debug, Default)]
pub struct BatchReport {
    items: Vec<BatchItem>,
    cancelled: bool,
}

impl BatchReport {
    pub(crate) const fn new(items: Vec<BatchItem>, cancelled: bool) -> Self {
        Self { items, cancelled }
    }

    /// All items.
    #[must_use]
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    /// Outcome for `id`, if it was part of the batch.
    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<&BatchOutcome> {
        self.items.iter().find(|i| i.id == id).map(|i| &i.outcome)
    }

    /// Events the operation applied to.
    pub fn applied(&self) -> impl Iterator<Item = &AlertEvent> {
        self.items.iter().filter_map(|i| match &i.outcome {
            BatchOutcome::Applied(event) => Some(event),
            _ => None,
        })
    }

    /// Ids that were rejected, with their errors.
    pub fn failed(&self) -> impl Iterator<Item = (&str, &AlertError)> {
        self.items.iter().filter_map(|i| match &i.outcome {
            BatchOutcome::Failed(err) => Some((i.id.as_str(), err)),
            _ => None,
        })
    }

    /// Ids never attempted because of cancellation.
    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, BatchOutcome::Skipped))
            .map(|i| i.id.as_str())
    }

    /// True if every id applied.
    #[must_use]
    pub fn all_applied(&self) -> bool {
        self.items.iter().all(|i| i.outcome.is_applied())
    }

    /// True if the batch stopped early.
    #[must_use]
    pub const fn was_cancelled(&self) -> bool {
        self.cancelled
    }
}
