//! Command acknowledgment tracking.
//!
//! A [`CommandTracker`] follows one sent command through
//! `Pending -> Received -> Done | Error | TimedOut`. It is driven from the
//! outside: feed it every fresh snapshot with [`CommandTracker::observe`] and
//! call [`CommandTracker::check_deadline`] on each tick. It never polls and
//! never sleeps, so the same tracker serves the blocking
//! [`Session::wait`](crate::session::Session::wait), the non-blocking
//! [`Session::poll_pending`](crate::session::Session::poll_pending) and the
//! background worker.
//!
//! Serial numbers are compared with wrapping arithmetic: an echo serial is
//! "newer" when `echo.wrapping_sub(serial) > 0`, so ordering survives the
//! 32-bit wrap.

use std::time::{Duration, Instant};

use copilot_common::config::WaitPolicy;
use copilot_common::status::{ExecStatus, StatusSnapshot};

use crate::error::SessionError;

/// Progress of one tracked command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerState {
    /// The controller has not echoed the serial yet.
    Pending,
    /// Echoed, still executing.
    Received,
    /// Finished, or superseded by a newer command.
    Done,
    /// The controller reported failure for this serial.
    Error,
    /// The wait budget ran out.
    TimedOut,
}

/// Tracks one command's serial against published status.
#[derive(Debug, Clone)]
pub struct CommandTracker {
    serial: i32,
    policy: WaitPolicy,
    started: Instant,
    timeout: Option<Duration>,
    state: TrackerState,
    waited: Duration,
}

impl CommandTracker {
    /// Start tracking `serial`. A zero `timeout` waits forever.
    pub fn new(serial: i32, policy: WaitPolicy, timeout: Duration) -> Self {
        Self::started_at(serial, policy, timeout, Instant::now())
    }

    pub fn started_at(serial: i32, policy: WaitPolicy, timeout: Duration, started: Instant) -> Self {
        Self {
            serial,
            policy,
            started,
            timeout: (!timeout.is_zero()).then_some(timeout),
            state: TrackerState::Pending,
            waited: Duration::ZERO,
        }
    }

    pub fn serial(&self) -> i32 {
        self.serial
    }

    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Advance on a fresh snapshot.
    ///
    /// An older echo serial leaves the state untouched. A newer one means the
    /// controller has moved past this command, which implies it completed.
    pub fn observe(&mut self, status: &StatusSnapshot) -> TrackerState {
        if self.is_finished() {
            return self.state;
        }
        let diff = status.echo_serial_number.wrapping_sub(self.serial);
        if diff > 0 {
            self.state = TrackerState::Done;
        } else if diff == 0 {
            self.state = match status.status {
                ExecStatus::Done => TrackerState::Done,
                ExecStatus::Error => TrackerState::Error,
                ExecStatus::Exec => TrackerState::Received,
            };
        }
        self.state
    }

    /// Time out if the budget is spent at `now`. Never fires early.
    pub fn check_deadline(&mut self, now: Instant) -> TrackerState {
        if self.is_finished() {
            return self.state;
        }
        let elapsed = now.saturating_duration_since(self.started);
        if self.timeout.is_some_and(|timeout| elapsed >= timeout) {
            self.state = TrackerState::TimedOut;
            self.waited = elapsed;
        }
        self.state
    }

    /// Budget left at `now`; `None` when unbounded.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.timeout
            .map(|t| t.saturating_sub(now.saturating_duration_since(self.started)))
    }

    /// Whether the wait policy is satisfied or has failed.
    pub fn is_finished(&self) -> bool {
        match (self.policy, self.state) {
            (_, TrackerState::Pending) => false,
            (WaitPolicy::Received, _) => true,
            (WaitPolicy::Done, TrackerState::Received) => false,
            (WaitPolicy::Done, _) => true,
        }
    }

    /// Final outcome, once finished.
    pub fn result(&self) -> Option<Result<(), SessionError>> {
        if !self.is_finished() {
            return None;
        }
        Some(match self.state {
            TrackerState::TimedOut => Err(SessionError::Timeout {
                serial: self.serial,
                waited: self.waited,
            }),
            TrackerState::Error if self.policy == WaitPolicy::Done => {
                Err(SessionError::Controller { serial: self.serial })
            }
            _ => Ok(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(serial: i32, status: ExecStatus) -> StatusSnapshot {
        StatusSnapshot {
            echo_serial_number: serial,
            status,
            ..Default::default()
        }
    }

    #[test]
    fn stale_echo_keeps_pending() {
        let mut t = CommandTracker::new(10, WaitPolicy::Received, Duration::ZERO);
        assert_eq!(t.observe(&echo(9, ExecStatus::Done)), TrackerState::Pending);
        assert!(t.result().is_none());
        assert_eq!(t.observe(&echo(10, ExecStatus::Exec)), TrackerState::Received);
        assert!(matches!(t.result(), Some(Ok(()))));
    }

    #[test]
    fn done_policy_waits_through_exec() {
        let mut t = CommandTracker::new(5, WaitPolicy::Done, Duration::ZERO);
        t.observe(&echo(5, ExecStatus::Exec));
        assert_eq!(t.state(), TrackerState::Received);
        assert!(!t.is_finished());
        t.observe(&echo(5, ExecStatus::Done));
        assert!(matches!(t.result(), Some(Ok(()))));
    }

    #[test]
    fn controller_error_fails_done_policy() {
        let mut t = CommandTracker::new(5, WaitPolicy::Done, Duration::ZERO);
        t.observe(&echo(5, ExecStatus::Error));
        assert!(matches!(
            t.result(),
            Some(Err(SessionError::Controller { serial: 5 }))
        ));
    }

    #[test]
    fn controller_error_still_counts_as_received() {
        let mut t = CommandTracker::new(5, WaitPolicy::Received, Duration::ZERO);
        t.observe(&echo(5, ExecStatus::Error));
        assert!(matches!(t.result(), Some(Ok(()))));
    }

    #[test]
    fn newer_echo_implies_completion() {
        let mut t = CommandTracker::new(5, WaitPolicy::Done, Duration::ZERO);
        t.observe(&echo(6, ExecStatus::Error));
        assert_eq!(t.state(), TrackerState::Done);
        assert!(matches!(t.result(), Some(Ok(()))));
    }

    #[test]
    fn wrapping_serials_keep_order() {
        let mut t = CommandTracker::new(i32::MAX, WaitPolicy::Done, Duration::ZERO);
        t.observe(&echo(i32::MAX - 1, ExecStatus::Done));
        assert_eq!(t.state(), TrackerState::Pending);
        t.observe(&echo(i32::MIN, ExecStatus::Exec));
        assert_eq!(t.state(), TrackerState::Done);
    }

    #[test]
    fn finished_state_is_sticky() {
        let mut t = CommandTracker::new(3, WaitPolicy::Done, Duration::ZERO);
        t.observe(&echo(3, ExecStatus::Done));
        t.observe(&echo(3, ExecStatus::Error));
        assert_eq!(t.state(), TrackerState::Done);
    }

    #[test]
    fn deadline_fires_at_boundary_not_before() {
        let start = Instant::now();
        let budget = Duration::from_millis(500);
        let mut t = CommandTracker::started_at(1, WaitPolicy::Done, budget, start);

        let early = start + Duration::from_millis(499);
        assert_eq!(t.check_deadline(early), TrackerState::Pending);
        assert_eq!(t.remaining(early), Some(Duration::from_millis(1)));

        let at = start + budget;
        assert_eq!(t.check_deadline(at), TrackerState::TimedOut);
        match t.result() {
            Some(Err(SessionError::Timeout { serial, waited })) => {
                assert_eq!(serial, 1);
                assert_eq!(waited, budget);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_never_expires() {
        let start = Instant::now();
        let mut t = CommandTracker::started_at(1, WaitPolicy::Done, Duration::ZERO, start);
        let later = start + Duration::from_secs(3600);
        assert_eq!(t.check_deadline(later), TrackerState::Pending);
        assert_eq!(t.remaining(later), None);
    }

    #[test]
    fn received_under_done_policy_can_still_time_out() {
        let start = Instant::now();
        let mut t =
            CommandTracker::started_at(2, WaitPolicy::Done, Duration::from_millis(100), start);
        t.observe(&echo(2, ExecStatus::Exec));
        assert_eq!(
            t.check_deadline(start + Duration::from_millis(100)),
            TrackerState::TimedOut
        );
    }
}
