pub mod achievements;
pub mod classifier;
pub mod export;
pub mod models;
pub mod notify;
pub mod report;
pub mod settings;
pub mod store;
pub mod tracker;

pub use classifier::{classify, ClassificationResult, IssueTag, Landmark, LandmarkFrame};
pub use models::{Achievement, HistoryStore, Session};
pub use notify::{
    AchievementEvent, AlertEvent, ChannelSink, Notification, NotificationSink, NullSink,
};
pub use report::{DailyReport, DailyTrend, DayStat, WeeklyReport, WeeklyTrend};
pub use settings::{Settings, SettingsPatch};
pub use store::Store;
pub use tracker::{DetectorStatus, TrackerController, TrackerSnapshot};

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Result;
use chrono::Utc;
use log::info;

/// Explicit wiring of the whole core: the persistence handle, the shared
/// settings, the tracker and the notification sink. Constructed once and
/// passed around; nothing here is reachable through globals.
pub struct AppContext {
    store: Store,
    settings: Arc<RwLock<Settings>>,
    tracker: TrackerController,
}

impl AppContext {
    pub async fn new(db_path: PathBuf, sink: Arc<dyn NotificationSink>) -> Result<Self> {
        let store = Store::new(db_path)?;
        let history = store.load().await?;
        info!(
            "Loaded {} session(s), {} achievement(s)",
            history.sessions.len(),
            history.achievements.len()
        );

        let settings = Arc::new(RwLock::new(history.settings));
        let tracker = TrackerController::new(store.clone(), settings.clone(), sink);

        Ok(Self {
            store,
            settings,
            tracker,
        })
    }

    pub fn tracker(&self) -> &TrackerController {
        &self.tracker
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().unwrap().clone()
    }

    /// Merge a partial update into the current settings and persist the
    /// result. The settings shape is never partially overwritten on disk.
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        let updated = {
            let mut guard = self.settings.write().unwrap();
            guard.apply(patch);
            guard.clone()
        };
        self.store.update_settings(updated.clone()).await?;
        Ok(updated)
    }

    pub async fn reset_settings(&self) -> Result<Settings> {
        let defaults = Settings::default();
        *self.settings.write().unwrap() = defaults.clone();
        self.store.update_settings(defaults.clone()).await?;
        Ok(defaults)
    }

    pub async fn daily_report(&self) -> Result<Option<DailyReport>> {
        let history = self.store.load().await?;
        Ok(report::daily_report(
            &history.sessions,
            Utc::now().date_naive(),
        ))
    }

    pub async fn weekly_report(&self) -> Result<Option<WeeklyReport>> {
        let history = self.store.load().await?;
        Ok(report::weekly_report(&history.sessions, Utc::now()))
    }

    /// Chart-ready `(labels, ratios)` for the trailing week.
    pub async fn trend_series(&self) -> Result<(Vec<String>, Vec<u32>)> {
        let history = self.store.load().await?;
        Ok(report::trend_series(&history.sessions, Utc::now()))
    }

    pub async fn achievements(&self) -> Result<Vec<Achievement>> {
        Ok(self.store.load().await?.achievements)
    }

    /// Export the full history to `posture-data-<date>.json` under `dir`.
    pub async fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        let history = self.store.load().await?;
        export::write_export(&history, dir, Utc::now().date_naive())
    }

    /// Wipe all stored data and restore default settings. Irreversible.
    pub async fn clear_data(&self) -> Result<()> {
        self.store.clear().await?;
        *self.settings.write().unwrap() = Settings::default();
        Ok(())
    }
}
