//! Core types for alert event lifecycles.
//!
//! - [`EventStatus`]: the four lifecycle statuses
//! - [`EventState`]: status plus the data only that status may carry
//! - [`AlertEvent`]: one firing episode of an alerting condition
//! - [`StateMutation`]: a compare-and-swap change built by the lifecycle engine
//! - [`FiringReport`]: what the ingestion pipeline hands over when a condition fires

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AlertError, Result};

/// Label carrying the alert's human-readable name.
pub const ALERTNAME_LABEL: &str = "alertname";

/// The severity level of an alert event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational, no action required.
    Info,
    /// Should be investigated.
    #[default]
    Warning,
    /// Requires immediate attention.
    Critical,
}

impl AlertSeverity {
    /// Returns the severity as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlertSeverity {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            other => Err(AlertError::invalid_argument(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

/// Lifecycle status of an alert event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Condition is firing and nobody has taken it.
    Firing,
    /// An operator owns the response.
    Claimed,
    /// Notifications are suppressed until a deadline.
    Silenced,
    /// The condition cleared. Terminal.
    Resolved,
}

impl EventStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Firing, Self::Claimed, Self::Silenced, Self::Resolved];

    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Firing => "firing",
            Self::Claimed => "claimed",
            Self::Silenced => "silenced",
            Self::Resolved => "resolved",
        }
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AlertError::invalid_argument(format!("unknown status '{s}'")))
    }
}

/// Lifecycle state of an event.
///
/// Owner and silence deadline live inside the variant that needs them, so an
/// event can never be claimed and silenced at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EventState {
    /// Firing, unowned.
    Firing,
    /// Owned by an operator.
    Claimed {
        /// Operator that claimed the event.
        claimed_by: String,
    },
    /// Suppressed until `silence_until`.
    Silenced {
        /// When the silence lapses and the event reverts to firing.
        silence_until: DateTime<Utc>,
        /// Operator that set the silence.
        silenced_by: String,
    },
    /// Condition cleared.
    Resolved {
        /// When the resolution was recorded.
        resolved_at: DateTime<Utc>,
    },
}

impl EventState {
    /// The status this state represents.
    #[must_use]
    pub const fn status(&self) -> EventStatus {
        match self {
            Self::Firing => EventStatus::Firing,
            Self::Claimed { .. } => EventStatus::Claimed,
            Self::Silenced { .. } => EventStatus::Silenced,
            Self::Resolved { .. } => EventStatus::Resolved,
        }
    }
}

/// One firing episode of an alerting condition.
///
/// Lifecycle state is only changed through [`StateMutation`]s, which only the
/// lifecycle engine can build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    id: String,
    fingerprint: String,
    #[serde(flatten)]
    state: EventState,
    severity: AlertSeverity,
    first_fired_at: DateTime<Utc>,
    last_fired_at: DateTime<Utc>,
    labels: BTreeMap<String, String>,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
    #[serde(default)]
    revision: u64,
}

impl AlertEvent {
    /// Creates a new firing event from an ingestion report.
    #[must_use]
    pub fn from_report(report: &FiringReport, now: DateTime<Utc>) -> Self {
        let fired_at = report.fired_at.unwrap_or(now);
        Self {
            id: Uuid::new_v4().to_string(),
            fingerprint: report.fingerprint(),
            state: EventState::Firing,
            severity: report.severity,
            first_fired_at: fired_at,
            last_fired_at: fired_at,
            labels: report.labels.clone(),
            annotations: report.annotations.clone(),
            revision: 0,
        }
    }

    /// Unique identifier of this episode.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stable identity of the underlying condition.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Full lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &EventState {
        &self.state
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> EventStatus {
        self.state.status()
    }

    /// Operator owning the event, set only while claimed.
    #[must_use]
    pub fn claimed_by(&self) -> Option<&str> {
        match &self.state {
            EventState::Claimed { claimed_by } => Some(claimed_by),
            _ => None,
        }
    }

    /// Silence deadline, set only while silenced.
    #[must_use]
    pub const fn silence_until(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            EventState::Silenced { silence_until, .. } => Some(*silence_until),
            _ => None,
        }
    }

    /// Returns true if the event is silenced and the silence has lapsed at `now`.
    #[must_use]
    pub fn silence_expired(&self, now: DateTime<Utc>) -> bool {
        self.silence_until().is_some_and(|until| until <= now)
    }

    /// Severity reported at creation.
    #[must_use]
    pub const fn severity(&self) -> AlertSeverity {
        self.severity
    }

    /// When this episode first fired.
    #[must_use]
    pub const fn first_fired_at(&self) -> DateTime<Utc> {
        self.first_fired_at
    }

    /// When the condition was last reported firing.
    #[must_use]
    pub const fn last_fired_at(&self) -> DateTime<Utc> {
        self.last_fired_at
    }

    /// Source labels.
    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Free-form annotations.
    #[must_use]
    pub const fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    /// The `alertname` label, if present.
    #[must_use]
    pub fn alertname(&self) -> Option<&str> {
        self.labels.get(ALERTNAME_LABEL).map(String::as_str)
    }

    /// Number of committed updates applied to this event.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Applies a mutation if the current state still matches its expectation.
    ///
    /// Store implementations call this under their per-key write guard.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Conflict` without touching the event if the state
    /// changed since the mutation was built.
    pub fn apply(&mut self, mutation: &StateMutation) -> Result<()> {
        if self.state != mutation.expected {
            return Err(AlertError::Conflict {
                id: self.id.clone(),
                reason: format!(
                    "{} expected {} but found {}",
                    mutation.operation,
                    mutation.expected.status(),
                    self.status()
                ),
            });
        }

        self.state = mutation.next.clone();
        if let Some(at) = mutation.fired_at {
            self.last_fired_at = self.last_fired_at.max(at);
        }
        self.revision += 1;
        Ok(())
    }
}

/// A conditional change to one event's lifecycle state.
///
/// Built only inside this crate; applying it succeeds only if the event is
/// still in `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMutation {
    operation: &'static str,
    expected: EventState,
    next: EventState,
    fired_at: Option<DateTime<Utc>>,
}

impl StateMutation {
    pub(crate) const fn transition(
        operation: &'static str,
        expected: EventState,
        next: EventState,
    ) -> Self {
        Self {
            operation,
            expected,
            next,
            fired_at: None,
        }
    }

    /// Keeps the state, moves `last_fired_at` forward.
    pub(crate) fn refire(expected: EventState, at: DateTime<Utc>) -> Self {
        Self {
            operation: "refire",
            next: expected.clone(),
            expected,
            fired_at: Some(at),
        }
    }

    /// Name of the lifecycle operation that built this mutation.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// State the event must be in for the mutation to apply.
    #[must_use]
    pub const fn expected(&self) -> &EventState {
        &self.expected
    }

    /// State after the mutation.
    #[must_use]
    pub const fn next(&self) -> &EventState {
        &self.next
    }
}

/// A firing condition as reported by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FiringReport {
    /// Labels identifying the source.
    pub labels: BTreeMap<String, String>,
    /// Free-form context.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Reported severity.
    #[serde(default)]
    pub severity: AlertSeverity,
    /// When the condition fired; defaults to the time of ingestion.
    #[serde(default)]
    pub fired_at: Option<DateTime<Utc>>,
}

impl FiringReport {
    /// Creates a report for the given labels.
    #[must_use]
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self {
            labels,
            ..Self::default()
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Sets the severity.
    #[must_use]
    pub const fn severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the firing timestamp.
    #[must_use]
    pub const fn fired_at(mut self, at: DateTime<Utc>) -> Self {
        self.fired_at = Some(at);
        self
    }

    /// Fingerprint of the reported labels.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        compute_fingerprint(&self.labels)
    }
}

/// Computes the fingerprint of a label set.
///
/// Labels are hashed in key order, so equal label sets always map to the same
/// 16-hex-digit fingerprint regardless of insertion order or process.
#[must_use]
pub fn compute_fingerprint(labels: &BTreeMap<String, String>) -> String {
    let mut hasher = blake3::Hasher::new();
    for (key, value) in labels {
        hasher.update(key.as_bytes());
        hasher.update(&[0xff]);
        hasher.update(value.as_bytes());
        hasher.update(&[0xfe]);
    }
    let digest = hasher.finalize();
    digest.as_bytes()[..8]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
