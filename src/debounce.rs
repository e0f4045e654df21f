use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Debounce phase for one (orientation, flaw_type) pair at a given
/// stability threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncePhase {
    /// No active detection streak.
    None,
    /// A streak is in progress but has not yet spanned the threshold.
    Candidate,
    /// The streak has been continuously present for at least the
    /// threshold; the flaw is considered real.
    Confirmed,
}

/// Streak tracker for one (orientation, flaw_type) pair.
///
/// The upstream detector flickers, so a flaw only counts once it has
/// been reported present on every tick across a contiguous window of at
/// least `stability_seconds`. A single `present=false` tick breaks the
/// streak with no partial credit; a confirmed flaw is revoked the same
/// way (the sewer may fix it mid-inspection).
///
/// Rules with different stability thresholds can share one pair, so the
/// tracker keeps the raw streak facts and each rule queries `phase_at`
/// / `ever_confirmed` with its own threshold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebounceTracker {
    candidate_since: Option<DateTime<Utc>>,
    last_event_at: Option<DateTime<Utc>>,
    /// Longest contiguous presence streak observed so far, in seconds,
    /// including the streak currently in progress. `None` until the
    /// first `present=true` tick (a lone tick is a zero-length streak,
    /// which zero-stability rules already treat as confirmed).
    longest_streak_seconds: Option<f64>,
}

fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

impl DebounceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp of the last accepted event, used for the monotonicity
    /// contract.
    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.last_event_at
    }

    /// Feed one observation tick. The caller has already verified the
    /// timestamp is non-decreasing for this pair.
    pub fn observe(&mut self, timestamp: DateTime<Utc>, present: bool) {
        if present {
            let since = *self.candidate_since.get_or_insert(timestamp);
            let streak = elapsed_seconds(since, timestamp);
            if streak > self.longest_streak_seconds.unwrap_or(-1.0) {
                self.longest_streak_seconds = Some(streak);
            }
        } else if self.candidate_since.take().is_some() {
            log::debug!("detection streak broken at {timestamp}");
        }
        self.last_event_at = Some(timestamp);
    }

    /// Current phase as of the last observed tick, judged against the
    /// given stability threshold. A threshold of zero confirms on the
    /// first `present=true` tick.
    pub fn phase_at(&self, stability_seconds: f64) -> DebouncePhase {
        match (self.candidate_since, self.last_event_at) {
            (Some(since), Some(last)) => {
                if elapsed_seconds(since, last) >= stability_seconds {
                    DebouncePhase::Confirmed
                } else {
                    DebouncePhase::Candidate
                }
            }
            _ => DebouncePhase::None,
        }
    }

    /// Whether any streak, past or current, ever spanned the threshold.
    /// Absence rules use this: a flaw that was confirmed and later
    /// revoked still counts as having been present.
    pub fn ever_confirmed(&self, stability_seconds: f64) -> bool {
        self.longest_streak_seconds
            .is_some_and(|longest| longest >= stability_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_initial_phase_is_none() {
        let tracker = DebounceTracker::new();
        assert_eq!(tracker.phase_at(3.0), DebouncePhase::None);
        assert!(!tracker.ever_confirmed(3.0));
    }

    #[test]
    fn test_short_streak_stays_candidate() {
        let mut tracker = DebounceTracker::new();
        tracker.observe(at(0), true);
        tracker.observe(at(1), true);
        tracker.observe(at(2), true);
        assert_eq!(tracker.phase_at(3.0), DebouncePhase::Candidate);
        assert!(!tracker.ever_confirmed(3.0));
    }

    #[test]
    fn test_streak_confirms_at_threshold() {
        let mut tracker = DebounceTracker::new();
        for t in 0..=3 {
            tracker.observe(at(t), true);
        }
        assert_eq!(tracker.phase_at(3.0), DebouncePhase::Confirmed);
        assert!(tracker.ever_confirmed(3.0));
    }

    #[test]
    fn test_flicker_resets_streak() {
        let mut tracker = DebounceTracker::new();
        tracker.observe(at(0), true);
        tracker.observe(at(2), true);
        tracker.observe(at(3), false); // streak broken at 2s
        tracker.observe(at(4), true);
        tracker.observe(at(6), true); // new streak only 2s old
        assert_eq!(tracker.phase_at(3.0), DebouncePhase::Candidate);
        assert!(!tracker.ever_confirmed(3.0));
    }

    #[test]
    fn test_confirmed_can_be_revoked_but_stays_ever_confirmed() {
        let mut tracker = DebounceTracker::new();
        for t in 0..=4 {
            tracker.observe(at(t), true);
        }
        assert_eq!(tracker.phase_at(3.0), DebouncePhase::Confirmed);
        tracker.observe(at(5), false);
        assert_eq!(tracker.phase_at(3.0), DebouncePhase::None);
        assert!(tracker.ever_confirmed(3.0));
    }

    #[test]
    fn test_zero_stability_confirms_on_first_tick() {
        let mut tracker = DebounceTracker::new();
        tracker.observe(at(0), true);
        assert_eq!(tracker.phase_at(0.0), DebouncePhase::Confirmed);
        assert!(tracker.ever_confirmed(0.0));
    }

    #[test]
    fn test_zero_stability_revocation_keeps_ever_confirmed() {
        let mut tracker = DebounceTracker::new();
        tracker.observe(at(0), true);
        tracker.observe(at(1), false);
        assert_eq!(tracker.phase_at(0.0), DebouncePhase::None);
        assert!(tracker.ever_confirmed(0.0));
    }

    #[test]
    fn test_zero_stability_without_presence_never_confirms() {
        let mut tracker = DebounceTracker::new();
        tracker.observe(at(0), false);
        tracker.observe(at(1), false);
        assert_eq!(tracker.phase_at(0.0), DebouncePhase::None);
        assert!(!tracker.ever_confirmed(0.0));
    }

    #[test]
    fn test_two_thresholds_share_one_tracker() {
        let mut tracker = DebounceTracker::new();
        tracker.observe(at(0), true);
        tracker.observe(at(2), true);
        assert_eq!(tracker.phase_at(1.0), DebouncePhase::Confirmed);
        assert_eq!(tracker.phase_at(3.0), DebouncePhase::Candidate);
    }

    #[test]
    fn test_absent_ticks_keep_phase_none() {
        let mut tracker = DebounceTracker::new();
        tracker.observe(at(0), false);
        assert_eq!(tracker.phase_at(3.0), DebouncePhase::None);
        assert_eq!(tracker.last_event_at(), Some(at(0)));
    }
}
