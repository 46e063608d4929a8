use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Achievement, Session};
use crate::settings::Settings;

fn default_version() -> String {
    "1.0.0".to_string()
}

/// The single persisted aggregate: full session history, unlocked
/// achievements, current settings and a format version. Loaded whole,
/// saved whole; every field defaults so older or partial blobs merge
/// cleanly over the current shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryStore {
    pub sessions: Vec<Session>,
    pub achievements: Vec<Achievement>,
    pub settings: Settings,
    pub version: String,
    pub last_save: Option<DateTime<Utc>>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            achievements: Vec::new(),
            settings: Settings::default(),
            version: default_version(),
            last_save: None,
        }
    }
}

impl HistoryStore {
    /// Replace the session with the same id, or append it. Last write wins.
    pub fn upsert_session(&mut self, session: Session) {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session,
            None => self.sessions.push(session),
        }
    }

    pub fn has_achievement(&self, key: &str) -> bool {
        self.achievements.iter().any(|a| a.key == key)
    }

    /// Append achievements whose keys are not present yet; unlock order is
    /// append order.
    pub fn append_achievements(&mut self, achievements: Vec<Achievement>) {
        for achievement in achievements {
            if !self.has_achievement(&achievement.key) {
                self.achievements.push(achievement);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn achievement(key: &str) -> Achievement {
        Achievement {
            key: key.to_string(),
            name: key.to_string(),
            unlocked_at: Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut history = HistoryStore::default();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();

        let mut session = Session::begin(now);
        session.good_ticks = 10;
        history.upsert_session(session.clone());

        session.good_ticks = 25;
        history.upsert_session(session.clone());

        assert_eq!(history.sessions.len(), 1);
        assert_eq!(history.sessions[0].good_ticks, 25);

        history.upsert_session(Session::begin(now));
        assert_eq!(history.sessions.len(), 2);
    }

    #[test]
    fn append_skips_existing_keys() {
        let mut history = HistoryStore::default();
        history.append_achievements(vec![achievement("a"), achievement("b")]);
        history.append_achievements(vec![achievement("b"), achievement("c")]);

        let keys: Vec<&str> = history.achievements.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn partial_blob_merges_over_defaults() {
        let history: HistoryStore =
            serde_json::from_str(r#"{"sessions": [], "settings": {"alertFrequency": 5}}"#).unwrap();

        assert_eq!(history.version, "1.0.0");
        assert_eq!(history.settings.alert_frequency, 5);
        assert_eq!(history.settings.study_duration, 25);
        assert!(history.achievements.is_empty());
    }
}
