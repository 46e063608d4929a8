use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One monitored sitting. Owned and mutated by the tracker while detection
/// runs; an immutable historical record once the tracker moves past it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    /// Calendar day the session was created on. Fixed at creation, never
    /// recomputed even if the session runs past midnight.
    pub date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub good_ticks: u64,
    pub bad_ticks: u64,
    pub alerts: u32,
    pub continuous_good: u64,
    pub max_continuous_good: u64,
    pub last_alert_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn begin(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date: now.date_naive(),
            started_at: now,
            ended_at: now,
            good_ticks: 0,
            bad_ticks: 0,
            alerts: 0,
            continuous_good: 0,
            max_continuous_good: 0,
            last_alert_at: None,
        }
    }

    pub fn total_ticks(&self) -> u64 {
        self.good_ticks + self.bad_ticks
    }

    /// Fraction of monitored ticks classified good, or `None` when nothing
    /// was monitored yet.
    pub fn good_fraction(&self) -> Option<f64> {
        let total = self.total_ticks();
        if total == 0 {
            None
        } else {
            Some(self.good_ticks as f64 / total as f64)
        }
    }

    /// Good ratio as a rounded percentage; 0 when nothing was monitored.
    pub fn good_ratio_percent(&self) -> u32 {
        self.good_fraction()
            .map(|fraction| (fraction * 100.0).round() as u32)
            .unwrap_or(0)
    }
}
