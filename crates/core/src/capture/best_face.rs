use crate::quality::face_quality_analyzer::FaceAnalysis;
use crate::shared::frame::Frame;

/// The best face seen so far in a detection cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct BestFaceRecord {
    pub analysis: FaceAnalysis,
    /// Aligned crop the analysis was computed on.
    pub crop: Frame,
    pub detection_score: f32,
}

/// Outcome of offering a face to [`BestFace`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Offer {
    Accepted,
    TooBlurry { blur: f64, threshold: f64 },
    NotBetter { score: f64, best: f64 },
}

/// Keeps the single best face of the current cycle.
///
/// A face must pass the blur gate (`blur_score >= blur_threshold`) and score
/// strictly higher than the current best, which starts at 0.
#[derive(Debug)]
pub struct BestFace {
    blur_threshold: f64,
    record: Option<BestFaceRecord>,
}

impl BestFace {
    pub fn new(blur_threshold: f64) -> Self {
        Self {
            blur_threshold,
            record: None,
        }
    }

    pub fn blur_threshold(&self) -> f64 {
        self.blur_threshold
    }

    pub fn offer(&mut self, analysis: FaceAnalysis, crop: Frame, detection_score: f32) -> Offer {
        if analysis.blur_score < self.blur_threshold {
            return Offer::TooBlurry {
                blur: analysis.blur_score,
                threshold: self.blur_threshold,
            };
        }

        let best = self.best_score();
        if analysis.overall_score <= best {
            return Offer::NotBetter {
                score: analysis.overall_score,
                best,
            };
        }

        self.record = Some(BestFaceRecord {
            analysis,
            crop,
            detection_score,
        });
        Offer::Accepted
    }

    pub fn best(&self) -> Option<&BestFaceRecord> {
        self.record.as_ref()
    }

    pub fn best_score(&self) -> f64 {
        self.record
            .as_ref()
            .map_or(0.0, |r| r.analysis.overall_score)
    }

    pub fn take(&mut self) -> Option<BestFaceRecord> {
        self.record.take()
    }

    pub fn reset(&mut self) {
        self.record = None;
    }
}
