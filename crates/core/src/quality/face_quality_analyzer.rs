use crate::detection::domain::detection::BoundingBox;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::frame::Frame;

use super::geometry_score::geometry_score;
use super::sharpness::laplacian_variance;

/// Quality measurements for one aligned face crop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceAnalysis {
    /// Laplacian variance of the crop. Higher is sharper.
    pub blur_score: f64,
    /// Landmark geometry score, or the invalid sentinel.
    pub quality_score: f64,
    /// Detection box area over crop area.
    pub size_ratio: f64,
    pub width: u32,
    pub height: u32,
    /// Ranking key. Currently the geometry score alone.
    pub overall_score: f64,
}

/// Score an aligned crop. Geometry is measured on the landmarks as detected,
/// before alignment.
///
/// Returns `None` for an empty crop.
pub fn analyze(crop: &Frame, landmarks: &FaceLandmarks, bbox: &BoundingBox) -> Option<FaceAnalysis> {
    if crop.is_empty() {
        return None;
    }

    let blur_score = laplacian_variance(crop);
    let quality_score = geometry_score(landmarks);
    let size_ratio = bbox.area() / crop.area() as f64;

    Some(FaceAnalysis {
        blur_score,
        quality_score,
        size_ratio,
        width: crop.width(),
        height: crop.height(),
        overall_score: quality_score,
    })
}
