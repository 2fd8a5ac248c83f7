/// Cadence of the inactivity countdown evaluation while armed.
const INACTIVITY_CHECK_MS: u64 = 100;
/// Visible auto-restart countdown after a timeout-stop: 2 steps of 1 second.
const AUTO_RESTART_MS: u64 = 2000;

/// Why a session was finalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The player pressed stop.
    Manual,
    /// The inactivity timeout fired.
    Timeout,
}

/// A finalized session, ready for the score aggregator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FinalizedSession {
    /// Counted hits for the session.
    pub score: u32,
    /// Session duration in seconds. For a timeout-stop this is the
    /// configured timeout exactly, not the measured elapsed time.
    pub duration_secs: f64,
    /// What ended the session.
    pub reason: StopReason,
}

/// Event produced by a controller tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SessionEvent {
    /// The inactivity timeout finalized the session.
    Finalized(FinalizedSession),
    /// The auto-restart countdown elapsed and a new session began.
    Restarted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Active,
    AutoRestartPending { resume_at_ms: u64 },
}

/// Session lifecycle state machine.
///
/// Owns the inactivity countdown and the auto-restart overlay so callers
/// never reason about timer interleavings: all time-driven behavior funnels
/// through the single `tick(now_ms)` entry point, with caller-supplied
/// milliseconds. One mutation is fully applied before anything observes the
/// state.
///
/// # Example
/// ```
/// use rally_session::SessionController;
/// let mut session = SessionController::new(3.0);
/// session.start(0);
/// assert!(session.is_active());
/// ```
pub struct SessionController {
    phase: Phase,
    /// Inactivity timeout in seconds. 0 = the timer never arms.
    timeout_secs: f64,
    session_start_ms: u64,
    last_hit_ms: u64,
    session_hits: u32,
    /// The inactivity timer arms on the first counted hit, not at start.
    armed: bool,
    next_check_ms: u64,
}

impl SessionController {
    /// Create an idle controller with the given inactivity timeout.
    #[must_use]
    pub fn new(timeout_secs: f64) -> Self {
        Self {
            phase: Phase::Idle,
            timeout_secs,
            session_start_ms: 0,
            last_hit_ms: 0,
            session_hits: 0,
            armed: false,
            next_check_ms: 0,
        }
    }

    /// Begin a session: resets the hit count and reference timestamps.
    ///
    /// The inactivity timer is not armed here; it arms on the first counted
    /// hit. Also used by the auto-restart path.
    pub fn start(&mut self, now_ms: u64) {
        self.phase = Phase::Active;
        self.session_hits = 0;
        self.session_start_ms = now_ms;
        self.last_hit_ms = now_ms;
        self.armed = false;
    }

    /// Record a counted hit. Ignored unless active.
    ///
    /// The first hit arms the periodic inactivity check (when a timeout is
    /// configured); later hits only move the last-hit timestamp the running
    /// check reads.
    pub fn on_hit(&mut self, now_ms: u64) {
        if self.phase != Phase::Active {
            return;
        }
        self.session_hits += 1;
        self.last_hit_ms = now_ms;
        if self.session_hits == 1 && self.timeout_secs > 0.0 && !self.armed {
            self.armed = true;
            self.next_check_ms = now_ms + INACTIVITY_CHECK_MS;
        }
    }

    /// Advance time-driven behavior: the inactivity countdown while active,
    /// the restart countdown while pending.
    pub fn tick(&mut self, now_ms: u64) -> Option<SessionEvent> {
        match self.phase {
            Phase::Active if self.armed && now_ms >= self.next_check_ms => {
                self.next_check_ms = now_ms + INACTIVITY_CHECK_MS;
                let since_hit = (now_ms.saturating_sub(self.last_hit_ms)) as f64 / 1000.0;
                let remaining = self.timeout_secs - since_hit;
                if remaining <= 0.0 {
                    let done = FinalizedSession {
                        score: self.session_hits,
                        duration_secs: self.timeout_secs,
                        reason: StopReason::Timeout,
                    };
                    self.armed = false;
                    self.phase = Phase::AutoRestartPending {
                        resume_at_ms: now_ms + AUTO_RESTART_MS,
                    };
                    log::info!(
                        "session timed out: {} hits, restarting in {}s",
                        done.score,
                        AUTO_RESTART_MS / 1000
                    );
                    return Some(SessionEvent::Finalized(done));
                }
                None
            }
            Phase::AutoRestartPending { resume_at_ms } if now_ms >= resume_at_ms => {
                self.start(now_ms);
                Some(SessionEvent::Restarted)
            }
            _ => None,
        }
    }

    /// End the session on user request.
    ///
    /// Returns the finalized session when one was running (duration is the
    /// measured elapsed time). From the auto-restart overlay this cancels
    /// the pending restart without finalizing again; from idle it is a
    /// no-op, so two consecutive stops finalize exactly once.
    pub fn stop(&mut self, now_ms: u64) -> Option<FinalizedSession> {
        match self.phase {
            Phase::Active => {
                let done = FinalizedSession {
                    score: self.session_hits,
                    duration_secs: (now_ms.saturating_sub(self.session_start_ms)) as f64 / 1000.0,
                    reason: StopReason::Manual,
                };
                self.phase = Phase::Idle;
                self.armed = false;
                Some(done)
            }
            Phase::AutoRestartPending { .. } => {
                self.phase = Phase::Idle;
                None
            }
            Phase::Idle => None,
        }
    }

    /// Return to idle from any state, clearing the count and all timers.
    /// Finalizes nothing.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.session_hits = 0;
        self.armed = false;
    }

    /// `true` while a session is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Hits counted in the current session.
    #[must_use]
    pub fn session_hits(&self) -> u32 {
        self.session_hits
    }

    /// Seconds left before the inactivity timeout fires, while armed.
    #[must_use]
    pub fn time_remaining(&self, now_ms: u64) -> Option<f64> {
        if self.phase == Phase::Active && self.armed {
            let since_hit = (now_ms.saturating_sub(self.last_hit_ms)) as f64 / 1000.0;
            Some((self.timeout_secs - since_hit).max(0.0))
        } else {
            None
        }
    }

    /// Whole seconds left on the auto-restart countdown, while pending.
    #[must_use]
    pub fn auto_restart_countdown(&self, now_ms: u64) -> Option<u32> {
        if let Phase::AutoRestartPending { resume_at_ms } = self.phase {
            let left_ms = resume_at_ms.saturating_sub(now_ms);
            Some(left_ms.div_ceil(1000) as u32)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_start_activates() {
        let mut s = SessionController::new(3.0);
        assert!(!s.is_active());
        s.start(100);
        assert!(s.is_active());
        assert_eq!(s.session_hits(), 0);
    }

    #[test]
    fn hits_are_ignored_while_idle() {
        let mut s = SessionController::new(3.0);
        s.on_hit(50);
        assert_eq!(s.session_hits(), 0);
    }

    #[test]
    fn timer_arms_on_first_hit_only() {
        let mut s = SessionController::new(3.0);
        s.start(0);
        assert_eq!(s.time_remaining(500), None);

        s.on_hit(1000);
        let remaining = s.time_remaining(1000).unwrap();
        assert!((remaining - 3.0).abs() < 1e-9);

        // A later hit moves last_hit without re-arming.
        s.on_hit(2000);
        let remaining = s.time_remaining(2500).unwrap();
        assert!((remaining - 2.5).abs() < 1e-9);
    }

    #[test]
    fn timeout_finalizes_with_configured_duration() {
        // Scenario: 3s timeout, one hit at t=0, nothing after.
        let mut s = SessionController::new(3.0);
        s.start(0);
        s.on_hit(0);

        let mut finalized = None;
        let mut fired_at = 0;
        for t in (0..=4000).step_by(100) {
            if let Some(SessionEvent::Finalized(done)) = s.tick(t) {
                finalized = Some(done);
                fired_at = t;
                break;
            }
        }
        let done = finalized.expect("timeout should fire");
        assert_eq!(fired_at, 3000);
        assert_eq!(done.score, 1);
        assert!((done.duration_secs - 3.0).abs() < 1e-9);
        assert_eq!(done.reason, StopReason::Timeout);
    }

    #[test]
    fn auto_restart_counts_down_two_steps_then_restarts() {
        let mut s = SessionController::new(3.0);
        s.start(0);
        s.on_hit(0);
        assert!(matches!(s.tick(3000), Some(SessionEvent::Finalized(_))));

        assert_eq!(s.auto_restart_countdown(3100), Some(2));
        assert_eq!(s.auto_restart_countdown(4100), Some(1));
        assert!(s.tick(4900).is_none());
        assert_eq!(s.tick(5000), Some(SessionEvent::Restarted));
        assert!(s.is_active());
        assert_eq!(s.session_hits(), 0);
        assert_eq!(s.auto_restart_countdown(5000), None);
    }

    #[test]
    fn manual_stop_during_countdown_cancels_the_restart() {
        let mut s = SessionController::new(3.0);
        s.start(0);
        s.on_hit(0);
        assert!(matches!(s.tick(3000), Some(SessionEvent::Finalized(_))));

        // Already finalized by the timeout: the stop returns nothing.
        assert_eq!(s.stop(3500), None);
        assert!(s.tick(6000).is_none());
        assert!(!s.is_active());
    }

    #[test]
    fn stop_twice_finalizes_exactly_once() {
        let mut s = SessionController::new(3.0);
        s.start(1000);
        s.on_hit(1500);
        s.on_hit(2000);

        let first = s.stop(4000);
        let second = s.stop(4000);
        let done = first.expect("first stop finalizes");
        assert_eq!(done.score, 2);
        assert!((done.duration_secs - 3.0).abs() < 1e-9);
        assert_eq!(done.reason, StopReason::Manual);
        assert_eq!(second, None);
    }

    #[test]
    fn zero_timeout_never_arms() {
        let mut s = SessionController::new(0.0);
        s.start(0);
        s.on_hit(100);
        assert_eq!(s.time_remaining(100), None);
        for t in (0..60_000).step_by(100) {
            assert!(s.tick(t).is_none());
        }
        assert!(s.is_active());
    }

    #[test]
    fn reset_returns_to_idle_without_finalizing() {
        let mut s = SessionController::new(3.0);
        s.start(0);
        s.on_hit(100);
        s.reset();
        assert!(!s.is_active());
        assert_eq!(s.session_hits(), 0);
        assert!(s.tick(10_000).is_none());
        assert_eq!(s.stop(10_000), None);
    }

    #[test]
    fn hits_keep_the_session_alive() {
        let mut s = SessionController::new(1.0);
        s.start(0);
        s.on_hit(0);
        // A hit every 500ms stays ahead of the 1s timeout.
        let mut t = 0;
        while t <= 5000 {
            assert!(s.tick(t).is_none(), "timed out at {t}");
            if t % 500 == 0 && t > 0 {
                s.on_hit(t);
            }
            t += 100;
        }
        assert_eq!(s.session_hits(), 11);
    }
}
