use serde::{Deserialize, Serialize};

use crate::settings::Settings;

// MediaPipe pose landmark indices for the points the checks care about.
pub const NOSE: usize = 0;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;

/// Landmarks delivered per frame by the pose engine.
pub const LANDMARK_COUNT: usize = 33;

/// How far the nose may sit below the shoulder line before it counts as a
/// dropped head. Not user-configurable.
const HEAD_DROP_OFFSET: f64 = 0.08;

/// A normalized body keypoint. Coordinates are in [0,1]² image space;
/// visibility is whatever confidence the pose engine reports, if any.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub visibility: Option<f64>,
}

/// One frame's worth of landmarks, indexed by body part. Any entry may be
/// absent when the engine loses track of that part.
#[derive(Debug, Clone, Default)]
pub struct LandmarkFrame {
    points: Vec<Option<Landmark>>,
}

impl LandmarkFrame {
    pub fn empty() -> Self {
        Self {
            points: vec![None; LANDMARK_COUNT],
        }
    }

    pub fn from_points(points: Vec<Option<Landmark>>) -> Self {
        Self { points }
    }

    pub fn set(&mut self, index: usize, landmark: Landmark) {
        if self.points.len() <= index {
            self.points.resize(index + 1, None);
        }
        self.points[index] = Some(landmark);
    }

    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied().flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueTag {
    LeanForward,
    LeanBackward,
    HeadDown,
    SpineLean,
}

impl IssueTag {
    pub fn label(&self) -> &'static str {
        match self {
            IssueTag::LeanForward => "头部前倾",
            IssueTag::LeanBackward => "头部后仰",
            IssueTag::HeadDown => "低头",
            IssueTag::SpineLean => "脊柱侧弯",
        }
    }
}

/// Outcome of classifying a single frame. Derived, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub is_good: bool,
    pub issues: Vec<IssueTag>,
}

/// Classify one landmark frame against the configured thresholds.
///
/// Checks whose landmarks are absent are skipped rather than flagged, so a
/// frame with no landmarks at all classifies good. That mirrors the source
/// behavior this tool grew out of; see DESIGN.md before changing it.
pub fn classify(frame: &LandmarkFrame, settings: &Settings) -> ClassificationResult {
    let mut issues = Vec::new();

    let nose = frame.get(NOSE);
    let left_shoulder = frame.get(LEFT_SHOULDER);
    let right_shoulder = frame.get(RIGHT_SHOULDER);

    if let (Some(nose), Some(left), Some(right)) = (nose, left_shoulder, right_shoulder) {
        let shoulder_avg_x = (left.x + right.x) / 2.0;
        let shoulder_avg_y = (left.y + right.y) / 2.0;
        let head_forward = nose.x - shoulder_avg_x;

        if head_forward.abs() > settings.head_threshold {
            issues.push(if head_forward > 0.0 {
                IssueTag::LeanForward
            } else {
                IssueTag::LeanBackward
            });
        }

        if nose.y > shoulder_avg_y + HEAD_DROP_OFFSET {
            issues.push(IssueTag::HeadDown);
        }
    }

    if let (Some(left_shoulder), Some(right_shoulder), Some(left_hip), Some(right_hip)) = (
        left_shoulder,
        right_shoulder,
        frame.get(LEFT_HIP),
        frame.get(RIGHT_HIP),
    ) {
        let shoulder_avg_x = (left_shoulder.x + right_shoulder.x) / 2.0;
        let hip_avg_x = (left_hip.x + right_hip.x) / 2.0;
        let spine_offset = (shoulder_avg_x - hip_avg_x).abs();

        if spine_offset > settings.spine_threshold {
            issues.push(IssueTag::SpineLean);
        }
    }

    ClassificationResult {
        is_good: issues.is_empty(),
        issues,
    }
}
