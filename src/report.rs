use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::Session;

const TREND_WINDOW_DAYS: i64 = 7;
const STREAK_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DailyTrend {
    StrongImprovement,
    Improvement,
    Regression,
    Stable,
    InsufficientData,
}

impl DailyTrend {
    pub fn message(&self) -> &'static str {
        match self {
            DailyTrend::StrongImprovement => "📈 良好坐姿时间明显增加，进步很大！",
            DailyTrend::Improvement => "📈 良好坐姿时间有所增加，继续努力！",
            DailyTrend::Regression => "📉 良好坐姿时间减少，注意坐姿！",
            DailyTrend::Stable => "📊 坐姿保持稳定，继续坚持！",
            DailyTrend::InsufficientData => "数据不足，继续学习生成趋势分析",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WeeklyTrend {
    UpwardStreak,
    Excellent,
    Good,
    NeedsImprovement,
    InsufficientData,
}

impl WeeklyTrend {
    pub fn message(&self) -> &'static str {
        match self {
            WeeklyTrend::UpwardStreak => "🎉 连续3天坐姿良好率持续上升，太棒了！",
            WeeklyTrend::Excellent => "🌟 本周表现优秀，继续保持良好习惯！",
            WeeklyTrend::Good => "👍 本周表现良好，还有提升空间！",
            WeeklyTrend::NeedsImprovement => "💪 本周需要更多关注坐姿，加油改进！",
            WeeklyTrend::InsufficientData => "数据不足，请继续学习",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub date: NaiveDate,
    pub session_count: usize,
    /// Wall-clock time across today's sessions, in minutes.
    pub total_minutes: f64,
    pub good_minutes: f64,
    pub bad_minutes: f64,
    pub good_ratio: u32,
    pub alerts: u32,
    pub max_continuous_good_minutes: f64,
    pub trend: DailyTrend,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStat {
    pub date: NaiveDate,
    pub good_minutes: f64,
    pub bad_minutes: f64,
    pub ratio: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub day_count: usize,
    pub average_ratio: u32,
    /// Per-day breakdown, days ascending.
    pub days: Vec<DayStat>,
    pub trend: WeeklyTrend,
}

/// Aggregate today's sessions. `None` means no data for the day — callers
/// render their own empty state instead of a zeroed report.
pub fn daily_report(sessions: &[Session], today: NaiveDate) -> Option<DailyReport> {
    let mut todays: Vec<&Session> = sessions.iter().filter(|s| s.date == today).collect();
    if todays.is_empty() {
        return None;
    }
    todays.sort_by_key(|s| s.started_at);

    let total_minutes = todays
        .iter()
        .map(|s| (s.ended_at - s.started_at).num_seconds() as f64 / 60.0)
        .sum();
    let good_ticks: u64 = todays.iter().map(|s| s.good_ticks).sum();
    let bad_ticks: u64 = todays.iter().map(|s| s.bad_ticks).sum();
    let alerts: u32 = todays.iter().map(|s| s.alerts).sum();
    let max_continuous_good = todays
        .iter()
        .map(|s| s.max_continuous_good)
        .max()
        .unwrap_or(0);

    let trend = if todays.len() < 2 {
        DailyTrend::InsufficientData
    } else {
        let first = todays[0].good_ticks as f64;
        let last = todays[todays.len() - 1].good_ticks as f64;
        if last > first * 1.2 {
            DailyTrend::StrongImprovement
        } else if last > first {
            DailyTrend::Improvement
        } else if last < first {
            DailyTrend::Regression
        } else {
            DailyTrend::Stable
        }
    };

    Some(DailyReport {
        date: today,
        session_count: todays.len(),
        total_minutes,
        good_minutes: good_ticks as f64 / 60.0,
        bad_minutes: bad_ticks as f64 / 60.0,
        good_ratio: ratio_percent(good_ticks, bad_ticks),
        alerts,
        max_continuous_good_minutes: max_continuous_good as f64 / 60.0,
        trend,
    })
}

/// Aggregate the trailing seven days. `None` means no data in the window.
pub fn weekly_report(sessions: &[Session], now: DateTime<Utc>) -> Option<WeeklyReport> {
    let days = group_by_day(sessions, now);
    if days.is_empty() {
        return None;
    }

    let average_ratio =
        (days.iter().map(|d| d.ratio as f64).sum::<f64>() / days.len() as f64).round() as u32;

    let trend = if days.len() < STREAK_LEN {
        WeeklyTrend::InsufficientData
    } else {
        let tail = &days[days.len() - STREAK_LEN..];
        if tail[0].ratio < tail[1].ratio && tail[1].ratio < tail[2].ratio {
            WeeklyTrend::UpwardStreak
        } else if average_ratio >= 70 {
            WeeklyTrend::Excellent
        } else if average_ratio >= 50 {
            WeeklyTrend::Good
        } else {
            WeeklyTrend::NeedsImprovement
        }
    };

    Some(WeeklyReport {
        day_count: days.len(),
        average_ratio,
        days,
        trend,
    })
}

/// Chart-ready `(labels, ratios)` arrays for the trailing seven days.
pub fn trend_series(sessions: &[Session], now: DateTime<Utc>) -> (Vec<String>, Vec<u32>) {
    let days = group_by_day(sessions, now);
    let labels = days
        .iter()
        .map(|d| format!("{}/{}", d.date.month(), d.date.day()))
        .collect();
    let ratios = days.iter().map(|d| d.ratio).collect();
    (labels, ratios)
}

fn group_by_day(sessions: &[Session], now: DateTime<Utc>) -> Vec<DayStat> {
    let cutoff = now - Duration::days(TREND_WINDOW_DAYS);
    let mut grouped: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();

    for session in sessions.iter().filter(|s| s.started_at >= cutoff) {
        let entry = grouped.entry(session.date).or_insert((0, 0));
        entry.0 += session.good_ticks;
        entry.1 += session.bad_ticks;
    }

    grouped
        .into_iter()
        .map(|(date, (good, bad))| DayStat {
            date,
            good_minutes: good as f64 / 60.0,
            bad_minutes: bad as f64 / 60.0,
            ratio: ratio_percent(good, bad),
        })
        .collect()
}

fn ratio_percent(good: u64, bad: u64) -> u32 {
    let total = good + bad;
    if total == 0 {
        0
    } else {
        (good as f64 / total as f64 * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 12, 12, 0, 0).unwrap()
    }

    fn session_at(start: DateTime<Utc>, minutes: i64, good: u64, bad: u64) -> Session {
        let mut session = Session::begin(start);
        session.ended_at = start + Duration::minutes(minutes);
        session.good_ticks = good;
        session.bad_ticks = bad;
        session
    }

    #[test]
    fn empty_history_yields_no_daily_report() {
        assert!(daily_report(&[], base().date_naive()).is_none());
    }

    #[test]
    fn daily_report_sums_and_rounds_the_ratio() {
        let sessions = vec![
            session_at(base(), 10, 600, 0),
            session_at(base() + Duration::hours(1), 10, 300, 300),
        ];

        let report = daily_report(&sessions, base().date_naive()).unwrap();
        assert_eq!(report.session_count, 2);
        assert_eq!(report.good_ratio, 75);
        assert_eq!(report.total_minutes, 20.0);
        assert_eq!(report.good_minutes, 15.0);
        assert_eq!(report.bad_minutes, 5.0);
    }

    #[test]
    fn daily_trend_compares_first_and_last_session() {
        let today = base().date_naive();
        let pair = |first: u64, last: u64| {
            vec![
                session_at(base(), 10, first, 10),
                session_at(base() + Duration::hours(1), 10, last, 10),
            ]
        };

        let report = daily_report(&pair(100, 121), today).unwrap();
        assert_eq!(report.trend, DailyTrend::StrongImprovement);

        let report = daily_report(&pair(100, 110), today).unwrap();
        assert_eq!(report.trend, DailyTrend::Improvement);

        let report = daily_report(&pair(100, 90), today).unwrap();
        assert_eq!(report.trend, DailyTrend::Regression);

        let report = daily_report(&pair(100, 100), today).unwrap();
        assert_eq!(report.trend, DailyTrend::Stable);

        let report = daily_report(&[session_at(base(), 10, 100, 0)], today).unwrap();
        assert_eq!(report.trend, DailyTrend::InsufficientData);
    }

    #[test]
    fn zero_tick_day_reports_zero_ratio() {
        let report = daily_report(&[session_at(base(), 10, 0, 0)], base().date_naive()).unwrap();
        assert_eq!(report.good_ratio, 0);
    }

    #[test]
    fn empty_history_yields_no_weekly_report() {
        assert!(weekly_report(&[], base()).is_none());
    }

    #[test]
    fn rising_ratios_make_an_upward_streak() {
        // Ratios 50, 60, 75 across three chronological days.
        let sessions = vec![
            session_at(base() - Duration::days(2), 10, 50, 50),
            session_at(base() - Duration::days(1), 10, 60, 40),
            session_at(base(), 10, 75, 25),
        ];

        let report = weekly_report(&sessions, base()).unwrap();
        assert_eq!(report.day_count, 3);
        assert_eq!(report.trend, WeeklyTrend::UpwardStreak);
        let ratios: Vec<u32> = report.days.iter().map(|d| d.ratio).collect();
        assert_eq!(ratios, vec![50, 60, 75]);
    }

    #[test]
    fn falling_ratios_fall_back_to_the_average_bucket() {
        let sessions = vec![
            session_at(base() - Duration::days(2), 10, 75, 25),
            session_at(base() - Duration::days(1), 10, 60, 40),
            session_at(base(), 10, 50, 50),
        ];

        let report = weekly_report(&sessions, base()).unwrap();
        // Average of 75/60/50 rounds to 62.
        assert_eq!(report.average_ratio, 62);
        assert_eq!(report.trend, WeeklyTrend::Good);
    }

    #[test]
    fn average_buckets_cover_all_ranges() {
        let with_ratios = |ratios: [(u64, u64); 3]| {
            vec![
                session_at(base() - Duration::days(2), 10, ratios[0].0, ratios[0].1),
                session_at(base() - Duration::days(1), 10, ratios[1].0, ratios[1].1),
                session_at(base(), 10, ratios[2].0, ratios[2].1),
            ]
        };

        let report = weekly_report(&with_ratios([(90, 10), (80, 20), (75, 25)]), base()).unwrap();
        assert_eq!(report.trend, WeeklyTrend::Excellent);

        let report = weekly_report(&with_ratios([(40, 60), (30, 70), (20, 80)]), base()).unwrap();
        assert_eq!(report.trend, WeeklyTrend::NeedsImprovement);
    }

    #[test]
    fn fewer_than_three_days_is_insufficient() {
        let sessions = vec![
            session_at(base() - Duration::days(1), 10, 90, 10),
            session_at(base(), 10, 95, 5),
        ];

        let report = weekly_report(&sessions, base()).unwrap();
        assert_eq!(report.trend, WeeklyTrend::InsufficientData);
    }

    #[test]
    fn sessions_outside_the_window_are_ignored() {
        let sessions = vec![
            session_at(base() - Duration::days(10), 10, 0, 100),
            session_at(base(), 10, 80, 20),
        ];

        let report = weekly_report(&sessions, base()).unwrap();
        assert_eq!(report.day_count, 1);
        assert_eq!(report.days[0].ratio, 80);
    }

    #[test]
    fn trend_series_matches_the_grouping() {
        let sessions = vec![
            session_at(base() - Duration::days(1), 10, 60, 40),
            session_at(base(), 10, 75, 25),
            session_at(base() + Duration::hours(2), 10, 25, 75),
        ];

        let (labels, ratios) = trend_series(&sessions, base() + Duration::hours(3));
        assert_eq!(labels, vec!["3/11".to_string(), "3/12".to_string()]);
        assert_eq!(ratios, vec![60, 50]);
    }
}
