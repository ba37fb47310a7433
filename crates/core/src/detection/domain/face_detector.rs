use thiserror::Error;

use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("unsupported detector output count {0}; expected 6, 9, 10 or 15")]
    UnsupportedOutputCount(usize),
    #[error("output {output} has {actual} values, expected {expected}")]
    OutputShape {
        output: usize,
        expected: usize,
        actual: usize,
    },
    #[error("failed to load detection model: {0}")]
    Model(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Domain interface for face detection.
///
/// Returned detections are in source-frame pixels, highest score first.
/// Implementations may cache per-instance state, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame, threshold: f32) -> Result<Vec<Detection>, DetectionError>;
}
