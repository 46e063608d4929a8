use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::{ClassificationResult, IssueTag};
use crate::models::Session;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DetectorStatus {
    Idle,
    Detecting,
    Paused,
    Stopped,
}

impl Default for DetectorStatus {
    fn default() -> Self {
        DetectorStatus::Idle
    }
}

/// Side effects a tick asks the caller to perform. The transition itself
/// only mutates in-memory state.
#[derive(Debug, Clone, PartialEq)]
pub enum TickEffect {
    Alert(Vec<IssueTag>),
}

/// Live detection state: the status machine plus the session being
/// accumulated. All mutation happens through the transition methods below,
/// one caller at a time; two interleaved ticks would break the streak and
/// debounce invariants.
#[derive(Debug, Clone, Default)]
pub struct TrackerState {
    pub status: DetectorStatus,
    pub session: Option<Session>,
    /// Issues from the most recent bad tick, cleared on the next good one.
    pub current_issues: Vec<IssueTag>,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Idle → Detecting` with a fresh session. The session's calendar day
    /// is fixed here.
    pub fn begin_session(&mut self, now: DateTime<Utc>) {
        self.status = DetectorStatus::Detecting;
        self.session = Some(Session::begin(now));
        self.current_issues.clear();
    }

    pub fn pause(&mut self) -> bool {
        if self.status == DetectorStatus::Detecting {
            self.status = DetectorStatus::Paused;
            true
        } else {
            false
        }
    }

    pub fn resume(&mut self) -> bool {
        if self.status == DetectorStatus::Paused {
            self.status = DetectorStatus::Detecting;
            true
        } else {
            false
        }
    }

    /// `Detecting/Paused → Stopped`; stamps the end time and returns the
    /// finalized session. `Stopped` is terminal for the session — detecting
    /// again means beginning a new one.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<Session> {
        if !matches!(self.status, DetectorStatus::Detecting | DetectorStatus::Paused) {
            return None;
        }
        self.status = DetectorStatus::Stopped;
        if let Some(session) = self.session.as_mut() {
            session.ended_at = now;
        }
        self.session.clone()
    }

    /// Reset to a fresh `Idle` tracker. The previous session is gone from
    /// live state; callers persist it before clearing.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn session_snapshot(&self) -> Option<Session> {
        self.session.clone()
    }

    /// Apply one classified sample. Ticks outside `Detecting` are dropped.
    pub fn tick(
        &mut self,
        result: &ClassificationResult,
        now: DateTime<Utc>,
        alert_frequency_secs: u32,
    ) -> Vec<TickEffect> {
        if self.status != DetectorStatus::Detecting {
            return Vec::new();
        }
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };

        session.ended_at = now;
        let mut effects = Vec::new();

        if result.is_good {
            session.good_ticks += 1;
            session.continuous_good += 1;
            if session.continuous_good > session.max_continuous_good {
                session.max_continuous_good = session.continuous_good;
            }
            self.current_issues.clear();
        } else {
            session.bad_ticks += 1;
            session.continuous_good = 0;
            self.current_issues = result.issues.clone();

            let spacing = Duration::seconds(i64::from(alert_frequency_secs));
            let alert_due = match session.last_alert_at {
                Some(last) => now - last >= spacing,
                None => true,
            };
            if alert_due {
                session.alerts += 1;
                session.last_alert_at = Some(now);
                effects.push(TickEffect::Alert(result.issues.clone()));
            }
        }

        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn good() -> ClassificationResult {
        ClassificationResult {
            is_good: true,
            issues: Vec::new(),
        }
    }

    fn bad() -> ClassificationResult {
        ClassificationResult {
            is_good: false,
            issues: vec![IssueTag::HeadDown],
        }
    }

    fn detecting() -> TrackerState {
        let mut state = TrackerState::new();
        state.begin_session(at(0));
        state
    }

    #[test]
    fn begin_session_fixes_the_date() {
        let state = detecting();
        let session = state.session.as_ref().unwrap();
        assert_eq!(state.status, DetectorStatus::Detecting);
        assert_eq!(session.date, at(0).date_naive());
        assert_eq!(session.total_ticks(), 0);
    }

    #[test]
    fn ticks_while_paused_are_dropped() {
        let mut state = detecting();
        state.tick(&good(), at(1), 10);
        assert!(state.pause());

        let effects = state.tick(&bad(), at(2), 10);
        assert!(effects.is_empty());
        let session = state.session.as_ref().unwrap();
        assert_eq!(session.good_ticks, 1);
        assert_eq!(session.bad_ticks, 0);
        assert_eq!(session.alerts, 0);

        assert!(state.resume());
        state.tick(&good(), at(3), 10);
        assert_eq!(state.session.as_ref().unwrap().good_ticks, 2);
    }

    #[test]
    fn bad_tick_resets_the_streak_and_max_never_decreases() {
        let mut state = detecting();
        for i in 0..5 {
            state.tick(&good(), at(i), 10);
        }
        state.tick(&bad(), at(5), 10);

        let session = state.session.as_ref().unwrap();
        assert_eq!(session.continuous_good, 0);
        assert_eq!(session.max_continuous_good, 5);

        state.tick(&good(), at(6), 10);
        state.tick(&good(), at(7), 10);
        let session = state.session.as_ref().unwrap();
        assert_eq!(session.continuous_good, 2);
        assert_eq!(session.max_continuous_good, 5);
    }

    #[test]
    fn bad_tick_surfaces_issues_and_good_tick_clears_them() {
        let mut state = detecting();
        state.tick(&bad(), at(0), 10);
        assert_eq!(state.current_issues, vec![IssueTag::HeadDown]);

        state.tick(&good(), at(1), 10);
        assert!(state.current_issues.is_empty());
    }

    #[test]
    fn alerts_respect_the_minimum_spacing() {
        let mut state = detecting();

        let effects = state.tick(&bad(), at(0), 10);
        assert_eq!(effects.len(), 1);

        // Still inside the window: counted as bad, but no alert.
        let effects = state.tick(&bad(), at(5), 10);
        assert!(effects.is_empty());

        // Spacing is inclusive: exactly alert_frequency seconds later fires.
        let effects = state.tick(&bad(), at(10), 10);
        assert_eq!(effects.len(), 1);

        let session = state.session.as_ref().unwrap();
        assert_eq!(session.bad_ticks, 3);
        assert_eq!(session.alerts, 2);
    }

    #[test]
    fn alert_count_is_bounded_over_a_window() {
        let mut state = detecting();
        for i in 0..60 {
            state.tick(&bad(), at(i), 10);
        }
        // One alert at t=0 and one per full 10s of window after it.
        assert_eq!(state.session.as_ref().unwrap().alerts, 6);
    }

    #[test]
    fn stop_finalizes_and_further_ticks_are_ignored() {
        let mut state = detecting();
        state.tick(&good(), at(1), 10);

        let finalized = state.stop(at(30)).unwrap();
        assert_eq!(state.status, DetectorStatus::Stopped);
        assert_eq!(finalized.ended_at, at(30));
        assert_eq!(finalized.good_ticks, 1);

        let effects = state.tick(&good(), at(31), 10);
        assert!(effects.is_empty());
        assert_eq!(state.session.as_ref().unwrap().good_ticks, 1);
    }

    #[test]
    fn stop_from_idle_returns_none() {
        let mut state = TrackerState::new();
        assert!(state.stop(at(0)).is_none());
        assert_eq!(state.status, DetectorStatus::Idle);
    }
}
