use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{Achievement, HistoryStore, Session};

/// 15 minutes of uninterrupted good posture, in ticks.
const CONTINUOUS_GOOD_TARGET: u64 = 15 * 60;
const DAILY_ALERT_LIMIT: u32 = 10;
const STREAK_DAYS: usize = 3;
const STREAK_RATIO: f64 = 0.7;
const PERFECT_DAY_RATIO: f64 = 0.8;

/// Evaluate the unlock rules against the just-finished session and the full
/// persisted history (which already contains it). Pure: returns the newly
/// unlocked achievements and touches nothing. Every rule is guarded on its
/// key being absent, so re-evaluating identical history yields nothing.
pub fn evaluate(
    latest: &Session,
    history: &HistoryStore,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Vec<Achievement> {
    let mut unlocked = Vec::new();

    if latest.max_continuous_good >= CONTINUOUS_GOOD_TARGET {
        push_unlock(&mut unlocked, history, "连续良好时间15分钟", "专注力冠军", now);
    }

    let todays: Vec<&Session> = history.sessions.iter().filter(|s| s.date == today).collect();

    // Can fire before the day is over and stays unlocked even if the count
    // later passes the limit. Intentional; see DESIGN.md.
    let today_alerts: u32 = todays.iter().map(|s| s.alerts).sum();
    if today_alerts < DAILY_ALERT_LIMIT {
        push_unlock(&mut unlocked, history, "单日提醒次数<10", "自律之星", now);
    }

    if recent_days_all_above_ratio(history) {
        push_unlock(&mut unlocked, history, "连续3天良好率>70%", "坐姿小达人", now);
    }

    let today_good: u64 = todays.iter().map(|s| s.good_ticks).sum();
    let today_total: u64 = todays.iter().map(|s| s.total_ticks()).sum();
    if today_total > 0 && today_good as f64 / today_total as f64 > PERFECT_DAY_RATIO {
        push_unlock(&mut unlocked, history, "单日良好率>80%", "完美坐姿日", now);
    }

    unlocked
}

fn push_unlock(
    unlocked: &mut Vec<Achievement>,
    history: &HistoryStore,
    key: &str,
    name: &str,
    now: DateTime<Utc>,
) {
    if history.has_achievement(key) || unlocked.iter().any(|a| a.key == key) {
        return;
    }
    unlocked.push(Achievement {
        key: key.to_string(),
        name: name.to_string(),
        unlocked_at: now,
    });
}

/// The most recent three calendar days that have sessions, with every
/// session in that window above the ratio bar. Sessions with no ticks fail
/// the bar. Fewer than three such days never fires.
fn recent_days_all_above_ratio(history: &HistoryStore) -> bool {
    let mut days: Vec<NaiveDate> = history.sessions.iter().map(|s| s.date).collect();
    days.sort_unstable();
    days.dedup();
    if days.len() < STREAK_DAYS {
        return false;
    }

    let window = &days[days.len() - STREAK_DAYS..];
    history
        .sessions
        .iter()
        .filter(|s| window.contains(&s.date))
        .all(|s| s.good_fraction().map(|f| f > STREAK_RATIO).unwrap_or(false))
}
