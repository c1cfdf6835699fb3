//! Hand-off point for the alert ingestion pipeline.
//!
//! The pipeline that evaluates metrics and decides a condition is firing lives
//! outside this crate. It reports through [`ReportEvent`], which the
//! [`LifecycleEngine`] implements.

use tracing::{debug, info};

use crate::engine::{settle, LifecycleEngine};
use crate::error::{AlertError, Result};
use crate::types::{AlertEvent, EventState, FiringReport, StateMutation};

/// How often a refire or insert is re-attempted after losing a race.
const INGEST_ATTEMPTS: usize = 3;

/// Receives firing and resolution reports from the ingestion pipeline.
pub trait ReportEvent {
    /// Records that a condition is firing.
    ///
    /// An unresolved event with the same fingerprint is refired: its
    /// `last_fired_at` moves forward and its lifecycle state is kept.
    /// Otherwise a new episode with a fresh id starts in `Firing`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty label set, `Conflict` if concurrent
    /// writers kept winning, `Unavailable` if the store fails.
    fn report_firing(&self, report: FiringReport) -> Result<AlertEvent>;

    /// Records that the condition with `fingerprint` cleared.
    ///
    /// Returns `None` if no unresolved episode exists.
    ///
    /// # Errors
    ///
    /// `Conflict` if concurrent writers kept winning, `Unavailable` if the
    /// store fails.
    fn report_resolved(&self, fingerprint: &str) -> Result<Option<AlertEvent>>;
}

impl ReportEvent for LifecycleEngine {
    fn report_firing(&self, report: FiringReport) -> Result<AlertEvent> {
        if report.labels.is_empty() {
            return Err(AlertError::invalid_argument("firing report needs at least one label"));
        }

        let now = self.now();
        let fired_at = report.fired_at.unwrap_or(now);
        let fingerprint = report.fingerprint();

        for _ in 0..INGEST_ATTEMPTS {
            if let Some(active) = self.store().find_active(&fingerprint)? {
                let active = settle(self.store(), active, now)?;
                let mutation = StateMutation::refire(active.state().clone(), fired_at);
                match self.store().update_status(active.id(), &mutation) {
                    Ok(event) => {
                        debug!(event_id = %event.id(), fingerprint = %fingerprint, "alert refired");
                        return Ok(event);
                    }
                    Err(AlertError::Conflict { .. } | AlertError::NotFound { .. }) => continue,
                    Err(e) => return Err(e),
                }
            }

            let event = AlertEvent::from_report(&report, now);
            match self.store().insert(event.clone()) {
                Ok(()) => {
                    info!(
                        event_id = %event.id(),
                        fingerprint = %fingerprint,
                        alertname = event.alertname().unwrap_or("-"),
                        severity = %event.severity(),
                        "alert event opened"
                    );
                    return Ok(event);
                }
                // Another report opened the episode first; refire it instead.
                Err(AlertError::Conflict { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        Err(AlertError::Conflict {
            id: fingerprint,
            reason: "concurrent reports kept changing the active episode".to_string(),
        })
    }

    fn report_resolved(&self, fingerprint: &str) -> Result<Option<AlertEvent>> {
        let now = self.now();

        for _ in 0..INGEST_ATTEMPTS {
            let Some(active) = self.store().find_active(fingerprint)? else {
                debug!(fingerprint, "no active episode to resolve");
                return Ok(None);
            };

            let mutation = StateMutation::transition(
                "resolve",
                active.state().clone(),
                EventState::Resolved { resolved_at: now },
            );
            match self.store().update_status(active.id(), &mutation) {
                Ok(event) => {
                    info!(
                        event_id = %event.id(),
                        fingerprint,
                        from = %active.status(),
                        "alert event resolved"
                    );
                    return Ok(Some(event));
                }
                Err(AlertError::Conflict { .. } | AlertError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        Err(AlertError::Conflict {
            id: fingerprint.to_string(),
            reason: "concurrent writers kept changing the active episode".to_string(),
        })
    }
}
