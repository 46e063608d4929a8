use serde::Serialize;
use tokio::sync::mpsc;

use crate::classifier::IssueTag;
use crate::models::Achievement;

/// Fired when a bad-posture alert passes the debounce gate. The receiver
/// decides how to present it (sound, vibration, banner); `sound_enabled`
/// carries the user's preference so presentation stays out of the core.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub issues: Vec<IssueTag>,
    pub sound_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementEvent {
    pub key: String,
    pub name: String,
}

impl From<&Achievement> for AchievementEvent {
    fn from(achievement: &Achievement) -> Self {
        Self {
            key: achievement.key.clone(),
            name: achievement.name.clone(),
        }
    }
}

/// Caller-supplied observer for everything the core wants surfaced to the
/// user. The core never renders or plays anything itself.
pub trait NotificationSink: Send + Sync {
    fn alert(&self, event: AlertEvent);
    fn achievement_unlocked(&self, event: AchievementEvent);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Alert(AlertEvent),
    AchievementUnlocked(AchievementEvent),
}

/// Sink that forwards notifications onto an unbounded channel, for callers
/// that consume them from an async loop.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn alert(&self, event: AlertEvent) {
        let _ = self.tx.send(Notification::Alert(event));
    }

    fn achievement_unlocked(&self, event: AchievementEvent) {
        let _ = self.tx.send(Notification::AchievementUnlocked(event));
    }
}

/// Sink that drops everything. Useful for headless runs and tests.
pub struct NullSink;

impl NotificationSink for NullSink {
    fn alert(&self, _event: AlertEvent) {}

    fn achievement_unlocked(&self, _event: AchievementEvent) {}
}
