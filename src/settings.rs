use serde::{Deserialize, Serialize};

/// User-tunable configuration. Every field has its own default so stored
/// blobs from older versions deserialize by merging over defaults: missing
/// keys resolve to the factory value, unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Study block length in minutes.
    pub study_duration: u32,
    /// Break length in minutes.
    pub break_duration: u32,
    pub sound_enabled: bool,
    /// Minimum spacing between posture alerts, in seconds.
    pub alert_frequency: u32,
    pub flip_camera: bool,
    /// Calibrated reference back angle in degrees.
    pub calibrated_angle: f64,
    /// Horizontal nose-to-shoulder offset beyond which the head counts as leaning.
    pub head_threshold: f64,
    /// Horizontal shoulder-to-hip offset beyond which the spine counts as leaning.
    pub spine_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            study_duration: 25,
            break_duration: 5,
            sound_enabled: true,
            alert_frequency: 10,
            flip_camera: true,
            calibrated_angle: 90.0,
            head_threshold: 0.15,
            spine_threshold: 0.08,
        }
    }
}

/// Partial settings update. Fields left `None` keep their current value;
/// the full shape is enumerated here so a patch can never smuggle in keys
/// outside the settings schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub study_duration: Option<u32>,
    pub break_duration: Option<u32>,
    pub sound_enabled: Option<bool>,
    pub alert_frequency: Option<u32>,
    pub flip_camera: Option<bool>,
    pub calibrated_angle: Option<f64>,
    pub head_threshold: Option<f64>,
    pub spine_threshold: Option<f64>,
}

impl Settings {
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(value) = patch.study_duration {
            self.study_duration = value;
        }
        if let Some(value) = patch.break_duration {
            self.break_duration = value;
        }
        if let Some(value) = patch.sound_enabled {
            self.sound_enabled = value;
        }
        if let Some(value) = patch.alert_frequency {
            self.alert_frequency = value;
        }
        if let Some(value) = patch.flip_camera {
            self.flip_camera = value;
        }
        if let Some(value) = patch.calibrated_angle {
            self.calibrated_angle = value;
        }
        if let Some(value) = patch.head_threshold {
            self.head_threshold = value;
        }
        if let Some(value) = patch.spine_threshold {
            self.spine_threshold = value;
        }
    }
}
