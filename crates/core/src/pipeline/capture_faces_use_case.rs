use std::time::Instant;

use crate::alignment::face_aligner::FaceAligner;
use crate::capture::best_face::{BestFace, Offer};
use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::pipeline::capture_logger::CaptureLogger;
use crate::quality::face_quality_analyzer::analyze;
use crate::shared::frame::Frame;

/// What one detection pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Faces the detector returned.
    pub detections: usize,
    /// Faces with landmarks that went through alignment and scoring.
    pub processed: usize,
    /// Faces that became the new best.
    pub accepted: usize,
}

/// Per-frame pass: detect → align → analyze → offer to the cycle's best.
pub struct CaptureFacesUseCase {
    detector: Box<dyn FaceDetector>,
    aligner: FaceAligner,
    detection_threshold: f32,
}

impl CaptureFacesUseCase {
    pub fn new(detector: Box<dyn FaceDetector>, aligner: FaceAligner, detection_threshold: f32) -> Self {
        Self {
            detector,
            aligner,
            detection_threshold,
        }
    }

    /// Run one pass over `frame`.
    ///
    /// A face that fails alignment or analysis is skipped on its own; only a
    /// detector failure fails the pass.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        best: &mut BestFace,
        logger: &mut dyn CaptureLogger,
    ) -> Result<FrameReport, DetectionError> {
        let t0 = Instant::now();
        let detections = self.detector.detect(frame, self.detection_threshold)?;
        logger.timing("detect", t0.elapsed().as_secs_f64() * 1000.0);
        logger.metric("faces", detections.len() as f64);

        let mut report = FrameReport {
            detections: detections.len(),
            ..FrameReport::default()
        };

        for detection in &detections {
            if detection.landmarks.is_none() {
                continue;
            }
            report.processed += 1;
            if self.process_face(frame, detection, best, logger) {
                report.accepted += 1;
            }
        }
        Ok(report)
    }

    fn process_face(
        &self,
        frame: &Frame,
        detection: &Detection,
        best: &mut BestFace,
        logger: &mut dyn CaptureLogger,
    ) -> bool {
        let Some(landmarks) = detection.landmarks.as_ref() else {
            return false;
        };

        let t0 = Instant::now();
        let aligned = self.aligner.align(frame, landmarks.points(), &detection.bbox);
        logger.timing("align", t0.elapsed().as_secs_f64() * 1000.0);
        let Some(crop) = aligned else {
            logger.debug("Face alignment failed");
            return false;
        };

        let Some(analysis) = analyze(&crop, landmarks, &detection.bbox) else {
            logger.debug("Face quality analysis failed");
            return false;
        };
        logger.metric("blur_score", analysis.blur_score);
        logger.metric("quality_score", analysis.quality_score);

        match best.offer(analysis, crop, detection.score) {
            Offer::Accepted => {
                logger.info(&format!("New best face! Score: {:.3}", analysis.overall_score));
                true
            }
            Offer::TooBlurry { blur, threshold } => {
                logger.debug(&format!("Face too blurry: {blur:.1} < {threshold}"));
                false
            }
            Offer::NotBetter { score, best } => {
                logger.debug(&format!("Face score {score:.3} does not beat {best:.3}"));
                false
            }
        }
    }
}
