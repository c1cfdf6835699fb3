//! Ownership and silence-window checks applied before every transition.

use std::time::Duration;

use crate::error::{AlertError, Result};
use crate::types::{AlertEvent, EventState};

/// Enforces claim exclusivity and silence bounds.
///
/// The `can_*` predicates answer yes/no; the `check_*` variants return the
/// error the lifecycle engine reports when the answer is no.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipGuard {
    max_silence: Duration,
}

impl OwnershipGuard {
    /// Creates a guard allowing silences up to `max_silence`.
    #[must_use]
    pub const fn new(max_silence: Duration) -> Self {
        Self { max_silence }
    }

    /// Longest accepted silence.
    #[must_use]
    pub const fn max_silence(&self) -> Duration {
        self.max_silence
    }

    /// True if `operator` may claim `event`: it is firing, or already theirs.
    #[must_use]
    pub fn can_claim(&self, event: &AlertEvent, operator: &str) -> bool {
        self.check_claim(event, operator).is_ok()
    }

    /// True if `operator` may silence `event` for `duration`.
    #[must_use]
    pub fn can_silence(&self, event: &AlertEvent, duration: Duration, operator: &str) -> bool {
        self.check_silence(event, duration, operator).is_ok()
    }

    /// True if `event` is silenced.
    #[must_use]
    pub fn can_unsilence(&self, event: &AlertEvent) -> bool {
        self.check_unsilence(event).is_ok()
    }

    /// True if `operator` holds the claim on `event`.
    #[must_use]
    pub fn can_release(&self, event: &AlertEvent, operator: &str) -> bool {
        self.check_release(event, operator).is_ok()
    }

    /// Checks a claim.
    ///
    /// # Errors
    ///
    /// `Conflict` if another operator holds the claim, `InvalidState` if the
    /// event is silenced or resolved.
    pub fn check_claim(&self, event: &AlertEvent, operator: &str) -> Result<()> {
        match event.state() {
            EventState::Firing => Ok(()),
            EventState::Claimed { claimed_by } if claimed_by == operator => Ok(()),
            EventState::Claimed { claimed_by } => Err(claimed_elsewhere(event, claimed_by)),
            _ => Err(invalid_state(event, "claim")),
        }
    }

    /// Checks a silence.
    ///
    /// Firing events may be silenced by anyone; claimed events only by their
    /// owner. A silence the operator placed themselves passes so a retry can
    /// be answered without a write; anyone else's silence must be lifted
    /// first.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero or over-long duration, `Conflict` if
    /// another operator holds the claim, `InvalidState` if resolved or
    /// silenced by another operator.
    pub fn check_silence(&self, event: &AlertEvent, duration: Duration, operator: &str) -> Result<()> {
        self.check_duration(duration)?;
        match event.state() {
            EventState::Firing => Ok(()),
            EventState::Claimed { claimed_by } if claimed_by == operator => Ok(()),
            EventState::Claimed { claimed_by } => Err(claimed_elsewhere(event, claimed_by)),
            EventState::Silenced { silenced_by, .. } if silenced_by == operator => Ok(()),
            EventState::Silenced { .. } | EventState::Resolved { .. } => {
                Err(invalid_state(event, "silence"))
            }
        }
    }

    /// Checks an unsilence.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the event is silenced.
    pub fn check_unsilence(&self, event: &AlertEvent) -> Result<()> {
        match event.state() {
            EventState::Silenced { .. } => Ok(()),
            _ => Err(invalid_state(event, "unsilence")),
        }
    }

    /// Checks a release.
    ///
    /// # Errors
    ///
    /// `Conflict` if another operator holds the claim, `InvalidState` if the
    /// event is not claimed.
    pub fn check_release(&self, event: &AlertEvent, operator: &str) -> Result<()> {
        match event.state() {
            EventState::Claimed { claimed_by } if claimed_by == operator => Ok(()),
            EventState::Claimed { claimed_by } => Err(claimed_elsewhere(event, claimed_by)),
            _ => Err(invalid_state(event, "release")),
        }
    }

    /// Checks a silence duration against `(0, max_silence]`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the duration is zero or exceeds the maximum.
    pub fn check_duration(&self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return Err(AlertError::invalid_argument("silence duration must be positive"));
        }
        if duration > self.max_silence {
            return Err(AlertError::invalid_argument(format!(
                "silence duration {}s exceeds maximum of {}s",
                duration.as_secs(),
                self.max_silence.as_secs()
            )));
        }
        Ok(())
    }
}

fn claimed_elsewhere(event: &AlertEvent, owner: &str) -> AlertError {
    AlertError::Conflict {
        id: event.id().to_string(),
        reason: format!("claimed by {owner}"),
    }
}

fn invalid_state(event: &AlertEvent, operation: &'static str) -> AlertError {
    AlertError::InvalidState {
        id: event.id().to_string(),
        status: event.status(),
        operation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventStatus, FiringReport, StateMutation};
    use chrono::Utc;
    use test_case::test_case;

    const HOUR: Duration = Duration::from_secs(3600);

    fn guard() -> OwnershipGuard {
        OwnershipGuard::new(Duration::from_secs(24 * 3600))
    }

    fn event_in(status: EventStatus) -> AlertEvent {
        let mut event = AlertEvent::from_report(&FiringReport::default().label("a", "b"), Utc::now());
        let next = match status {
            EventStatus::Firing => return event,
            EventStatus::Claimed => EventState::Claimed {
                claimed_by: "alice".to_string(),
            },
            EventStatus::Silenced => EventState::Silenced {
                silence_until: Utc::now() + chrono::Duration::hours(1),
                silenced_by: "alice".to_string(),
            },
            EventStatus::Resolved => EventState::Resolved {
                resolved_at: Utc::now(),
            },
        };
        event
            .apply(&StateMutation::transition("test", EventState::Firing, next))
            .unwrap();
        event
    }

    #[test_case(EventStatus::Firing, "bob", true ; "firing is claimable")]
    #[test_case(EventStatus::Claimed, "alice", true ; "own claim is idempotent")]
    #[test_case(EventStatus::Claimed, "bob", false ; "foreign claim rejected")]
    #[test_case(EventStatus::Silenced, "bob", false ; "silenced not claimable")]
    #[test_case(EventStatus::Resolved, "bob", false ; "resolved not claimable")]
    fn can_claim(status: EventStatus, operator: &str, expected: bool) {
        assert_eq!(guard().can_claim(&event_in(status), operator), expected);
    }

    #[test_case(EventStatus::Firing, "bob", true ; "firing")]
    #[test_case(EventStatus::Claimed, "alice", true ; "owner silences own claim")]
    #[test_case(EventStatus::Claimed, "bob", false ; "non owner cannot silence claim")]
    #[test_case(EventStatus::Silenced, "alice", true ; "own silence is a retry")]
    #[test_case(EventStatus::Silenced, "bob", false ; "foreign silence rejected")]
    #[test_case(EventStatus::Resolved, "alice", false ; "resolved")]
    fn can_silence(status: EventStatus, operator: &str, expected: bool) {
        assert_eq!(guard().can_silence(&event_in(status), HOUR, operator), expected);
    }

    #[test_case(EventStatus::Firing, false ; "firing")]
    #[test_case(EventStatus::Claimed, false ; "claimed")]
    #[test_case(EventStatus::Silenced, true ; "silenced")]
    #[test_case(EventStatus::Resolved, false ; "resolved")]
    fn can_unsilence(status: EventStatus, expected: bool) {
        assert_eq!(guard().can_unsilence(&event_in(status)), expected);
    }

    #[test_case(EventStatus::Claimed, "alice", true ; "owner releases")]
    #[test_case(EventStatus::Claimed, "bob", false ; "non owner cannot release")]
    #[test_case(EventStatus::Firing, "alice", false ; "nothing to release")]
    fn can_release(status: EventStatus, operator: &str, expected: bool) {
        assert_eq!(guard().can_release(&event_in(status), operator), expected);
    }

    #[test]
    fn duration_bounds() {
        let g = guard();
        assert!(g.check_duration(Duration::from_secs(1)).is_ok());
        assert!(g.check_duration(g.max_silence()).is_ok());
        assert!(g.check_duration(Duration::ZERO).is_err());
        assert!(g.check_duration(g.max_silence() + Duration::from_secs(1)).is_err());
    }

    #[test]
    fn silence_with_bad_duration_is_invalid_argument_even_when_firing() {
        let result = guard().check_silence(&event_in(EventStatus::Firing), Duration::ZERO, "bob");
        assert!(matches!(result, Err(AlertError::InvalidArgument { .. })));
    }

    #[test]
    fn error_kinds() {
        let g = guard();
        assert!(matches!(
            g.check_claim(&event_in(EventStatus::Claimed), "bob"),
            Err(AlertError::Conflict { .. })
        ));
        assert!(matches!(
            g.check_claim(&event_in(EventStatus::Resolved), "bob"),
            Err(AlertError::InvalidState { .. })
        ));
        assert!(matches!(
            g.check_silence(&event_in(EventStatus::Silenced), HOUR, "bob"),
            Err(AlertError::InvalidState {
                status: EventStatus::Silenced,
                ..
            })
        ));
        assert!(matches!(
            g.check_unsilence(&event_in(EventStatus::Firing)),
            Err(AlertError::InvalidState {
                status: EventStatus::Firing,
                ..
            })
        ));
    }
}
