use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use log::{error, info};
use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::achievements;
use crate::classifier::{classify, IssueTag, LandmarkFrame};
use crate::models::Session;
use crate::notify::{AchievementEvent, AlertEvent, NotificationSink};
use crate::settings::Settings;
use crate::store::Store;

use super::state::{DetectorStatus, TickEffect, TrackerState};

const SNAPSHOT_INTERVAL_SECS: u64 = 5;

/// Read-only view of live detection for the display refresh loop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub status: DetectorStatus,
    pub elapsed_secs: i64,
    pub good_ratio: u32,
    pub alerts: u32,
    pub continuous_good_minutes: u64,
    pub current_issues: Vec<IssueTag>,
}

/// Drives one detection run at a time: consumes classified ticks, persists
/// periodic session snapshots, and emits alert/achievement events through
/// the caller-supplied sink. Clones share the same underlying state.
#[derive(Clone)]
pub struct TrackerController {
    state: Arc<Mutex<TrackerState>>,
    store: Store,
    settings: Arc<RwLock<Settings>>,
    sink: Arc<dyn NotificationSink>,
    snapshot_task: Arc<Mutex<Option<(JoinHandle<()>, CancellationToken)>>>,
}

impl TrackerController {
    pub fn new(
        store: Store,
        settings: Arc<RwLock<Settings>>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(TrackerState::new())),
            store,
            settings,
            sink,
            snapshot_task: Arc::new(Mutex::new(None)),
        }
    }

    /// Begin a new detection run. Errors unless the tracker is idle.
    pub async fn start(&self) -> Result<Session> {
        let session = {
            let mut state = self.state.lock().await;
            if state.status != DetectorStatus::Idle {
                bail!("detection already active");
            }
            state.begin_session(Utc::now());
            state
                .session_snapshot()
                .ok_or_else(|| anyhow!("missing session after start"))?
        };

        self.store.upsert_session(session.clone()).await?;
        self.spawn_snapshot_loop().await;

        info!("Detection started, session {}", session.id);
        Ok(session)
    }

    pub async fn pause(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.pause() {
            bail!("no active detection to pause");
        }
        Ok(())
    }

    pub async fn resume(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.resume() {
            bail!("detection is not paused");
        }
        Ok(())
    }

    /// Feed one landmark frame. Never fails: malformed or empty frames
    /// degrade through the classifier's missing-data policy, and ticks
    /// arriving while paused or stopped are dropped. Ticks are serialized
    /// by the state lock so they cannot interleave.
    pub async fn tick(&self, frame: &LandmarkFrame) {
        let settings = self.settings.read().unwrap().clone();
        let result = classify(frame, &settings);

        let effects = {
            let mut state = self.state.lock().await;
            state.tick(&result, Utc::now(), settings.alert_frequency)
        };

        for effect in effects {
            match effect {
                TickEffect::Alert(issues) => self.sink.alert(AlertEvent {
                    issues,
                    sound_enabled: settings.sound_enabled,
                }),
            }
        }
    }

    /// End the current run. The final snapshot is persisted before this
    /// returns; the finalized session plus full history then go through
    /// achievement evaluation, and the tracker resets to idle so a new
    /// session can be started.
    pub async fn stop(&self) -> Result<Session> {
        let stopped_at = Utc::now();
        let finalized = {
            let mut state = self.state.lock().await;
            let finalized = state
                .stop(stopped_at)
                .ok_or_else(|| anyhow!("no active detection to stop"))?;
            state.clear();
            finalized
        };

        self.cancel_snapshot_loop().await;
        self.store.upsert_session(finalized.clone()).await?;

        let history = self.store.load().await?;
        let unlocked =
            achievements::evaluate(&finalized, &history, stopped_at.date_naive(), stopped_at);
        if !unlocked.is_empty() {
            self.store.append_achievements(unlocked.clone()).await?;
            for achievement in &unlocked {
                self.sink
                    .achievement_unlocked(AchievementEvent::from(achievement));
            }
            info!(
                "Unlocked {} achievement(s) after session {}",
                unlocked.len(),
                finalized.id
            );
        }

        info!(
            "Detection stopped, session {}: {} good / {} bad ticks, {} alerts",
            finalized.id, finalized.good_ticks, finalized.bad_ticks, finalized.alerts
        );
        Ok(finalized)
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        let state = self.state.lock().await;
        match state.session.as_ref() {
            Some(session) => TrackerSnapshot {
                status: state.status,
                elapsed_secs: (Utc::now() - session.started_at).num_seconds(),
                good_ratio: session.good_ratio_percent(),
                alerts: session.alerts,
                continuous_good_minutes: session.continuous_good / 60,
                current_issues: state.current_issues.clone(),
            },
            None => TrackerSnapshot {
                status: state.status,
                elapsed_secs: 0,
                good_ratio: 0,
                alerts: 0,
                continuous_good_minutes: 0,
                current_issues: Vec::new(),
            },
        }
    }

    /// Persist a session snapshot every few seconds while detection is
    /// active. Write failures are logged and retried on the next interval.
    async fn spawn_snapshot_loop(&self) {
        let mut guard = self.snapshot_task.lock().await;
        if let Some((handle, token)) = guard.take() {
            token.cancel();
            handle.abort();
        }

        let state = self.state.clone();
        let store = self.store.clone();
        let token = CancellationToken::new();
        let loop_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(SNAPSHOT_INTERVAL_SECS));
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let snapshot = {
                            let state = state.lock().await;
                            if !matches!(
                                state.status,
                                DetectorStatus::Detecting | DetectorStatus::Paused
                            ) {
                                break;
                            }
                            state.session_snapshot()
                        };
                        if let Some(session) = snapshot {
                            if let Err(err) = store.upsert_session(session).await {
                                error!("Periodic session snapshot failed, will retry: {err:?}");
                            }
                        }
                    }
                    _ = loop_token.cancelled() => break,
                }
            }
        });

        *guard = Some((handle, token));
    }

    async fn cancel_snapshot_loop(&self) {
        if let Some((handle, token)) = self.snapshot_task.lock().await.take() {
            token.cancel();
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    error!("Snapshot loop failed to join: {err}");
                }
            }
        }
    }
}
