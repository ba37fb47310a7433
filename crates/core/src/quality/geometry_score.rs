//! Frontal-pose heuristic over the five facial landmarks.
//!
//! A ranking score, not a probability: a level, symmetric, upright face
//! approaches the sum of the weights (11).

use crate::detection::domain::face_landmarks::{distance, FaceLandmarks};

/// Returned for landmarks that cannot describe a face (negative coordinates
/// from a clamping failure upstream, or coincident eyes / mouth corners).
pub const INVALID_GEOMETRY_SCORE: f64 = -10.0;

const WEIGHTS: [f64; 7] = [2.0, 1.0, 1.0, 2.0, 2.0, 2.0, 1.0];

/// The seven sub-scores, each close to 1 for a frontal face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryBreakdown {
    pub eye_level: f64,
    pub mouth_level: f64,
    pub nose_centered: f64,
    pub mouth_centered: f64,
    /// Not bounded: negative for upside-down faces.
    pub vertical: f64,
    pub eye_symmetry: f64,
    pub mouth_symmetry: f64,
}

impl GeometryBreakdown {
    /// `None` when the landmarks are invalid.
    pub fn from_landmarks(lm: &FaceLandmarks) -> Option<Self> {
        if lm.has_negative_coordinate() {
            return None;
        }
        let eye_dist = lm.eye_distance();
        let mouth_dist = lm.mouth_distance();
        if eye_dist == 0.0 || mouth_dist == 0.0 {
            return None;
        }

        let (le, re, nose) = (lm.left_eye(), lm.right_eye(), lm.nose());
        let (lmo, rmo) = (lm.left_mouth(), lm.right_mouth());
        let eye_center = lm.eye_center();
        let mouth_center = lm.mouth_center();

        let eye_mouth = distance(eye_center, mouth_center);
        let vertical = if eye_mouth > 0.0 {
            (mouth_center.1 - eye_center.1) / eye_mouth
        } else {
            0.0
        };

        let decay = |delta: f64, scale: f64| (-delta.abs() / scale).exp();

        Some(Self {
            eye_level: decay(le.1 - re.1, eye_dist),
            mouth_level: decay(lmo.1 - rmo.1, mouth_dist),
            nose_centered: decay(nose.0 - eye_center.0, eye_dist),
            mouth_centered: decay(mouth_center.0 - nose.0, mouth_dist),
            vertical,
            eye_symmetry: decay(distance(le, nose) - distance(re, nose), eye_dist),
            mouth_symmetry: decay(distance(lmo, nose) - distance(rmo, nose), mouth_dist),
        })
    }

    pub fn terms(&self) -> [f64; 7] {
        [
            self.eye_level,
            self.mouth_level,
            self.nose_centered,
            self.mouth_centered,
            self.vertical,
            self.eye_symmetry,
            self.mouth_symmetry,
        ]
    }

    pub fn total(&self) -> f64 {
        self.terms().iter().zip(WEIGHTS).map(|(t, w)| t * w).sum()
    }
}

pub fn geometry_score(landmarks: &FaceLandmarks) -> f64 {
    GeometryBreakdown::from_landmarks(landmarks)
        .map(|b| b.total())
        .unwrap_or(INVALID_GEOMETRY_SCORE)
}
