//! Turns raw SCRFD output tensors into ranked detections.
//!
//! Works in letterboxed input space until the very end, where every
//! coordinate is divided by the letterbox scale to return to frame pixels.

use crate::detection::domain::anchor_grid::AnchorGrid;
use crate::detection::domain::detection::{Detection, RawDetection};
use crate::detection::domain::detector_variant::DetectorVariant;
use crate::detection::domain::distance_decoder::{
    decode_box_at, decode_landmarks_at, landmark_count,
};
use crate::detection::domain::face_detector::DetectionError;
use crate::detection::domain::face_landmarks::NUM_LANDMARKS;
use crate::detection::domain::suppressor::suppress;

pub struct ScrfdDecoder {
    variant: DetectorVariant,
    input_height: u32,
    input_width: u32,
    nms_threshold: f32,
    anchors: AnchorGrid,
}

impl ScrfdDecoder {
    pub fn new(variant: DetectorVariant, input_size: (u32, u32), nms_threshold: f32) -> Self {
        Self {
            variant,
            input_height: input_size.0,
            input_width: input_size.1,
            nms_threshold,
            anchors: AnchorGrid::new(),
        }
    }

    pub fn variant(&self) -> DetectorVariant {
        self.variant
    }

    /// Decode, filter and suppress one inference pass.
    ///
    /// `outputs` are the model's flat output tensors in session order;
    /// `det_scale` is the letterbox factor used to build the input tensor.
    pub fn decode(
        &mut self,
        outputs: &[&[f32]],
        threshold: f32,
        det_scale: f32,
    ) -> Result<Vec<Detection>, DetectionError> {
        let candidates = self.candidates(outputs, threshold)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let boxes: Vec<[f32; 4]> = candidates.iter().map(|c| c.bbox).collect();
        let scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
        let keep = suppress(&boxes, &scores, self.nms_threshold);

        Ok(keep
            .into_iter()
            .map(|i| Detection::from_raw(&candidates[i], det_scale))
            .collect())
    }

    /// All above-threshold anchors from every scale, in input-tensor space.
    pub fn candidates(
        &mut self,
        outputs: &[&[f32]],
        threshold: f32,
    ) -> Result<Vec<RawDetection>, DetectionError> {
        let variant = self.variant;
        if outputs.len() != variant.output_count() {
            return Err(DetectionError::UnsupportedOutputCount(outputs.len()));
        }

        let clamp = Some((self.input_height as f32, self.input_width as f32));
        let mut candidates = Vec::new();

        for (scale, &stride) in variant.strides().iter().enumerate() {
            let anchors = self.anchors.anchors(
                stride,
                self.input_height,
                self.input_width,
                variant.anchors_per_cell(),
            );
            let n = anchors.len();

            let scores = expect_len(outputs, variant.score_output(scale), n)?;
            let box_dist = expect_len(outputs, variant.box_output(scale), n * 4)?;
            let box_dist: Vec<f32> = box_dist.iter().map(|d| d * stride as f32).collect();

            let kps_dist = match variant.landmark_output(scale) {
                Some(idx) => {
                    let raw = expect_len(outputs, idx, n * NUM_LANDMARKS * 2)?;
                    Some(raw.iter().map(|d| d * stride as f32).collect::<Vec<f32>>())
                }
                None => None,
            };

            for (i, &score) in scores.iter().enumerate() {
                if score < threshold {
                    continue;
                }
                let bbox = decode_box_at(anchors[i], &box_dist, i, clamp);
                let landmarks = kps_dist.as_ref().and_then(|kps| {
                    let num_points = landmark_count(n, kps.len());
                    let pts = decode_landmarks_at(anchors[i], kps, i, num_points, clamp);
                    pts.try_into().ok()
                });
                candidates.push(RawDetection {
                    bbox,
                    score,
                    landmarks,
                });
            }
        }

        Ok(candidates)
    }
}

fn expect_len<'a>(
    outputs: &[&'a [f32]],
    output: usize,
    expected: usize,
) -> Result<&'a [f32], DetectionError> {
    let data = outputs[output];
    if data.len() != expected {
        return Err(DetectionError::OutputShape {
            output,
            expected,
            actual: data.len(),
        });
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const INPUT: (u32, u32) = (640, 640);

    /// Zeroed outputs for a three-scale model with landmarks.
    fn blank_outputs() -> Vec<Vec<f32>> {
        let counts: Vec<usize> = [8u32, 16, 32]
            .iter()
            .map(|s| ((640 / s) * (640 / s) * 2) as usize)
            .collect();
        let mut outputs = Vec::new();
        outputs.extend(counts.iter().map(|&n| vec![0.0; n]));
        outputs.extend(counts.iter().map(|&n| vec![0.0; n * 4]));
        outputs.extend(counts.iter().map(|&n| vec![0.0; n * 10]));
        outputs
    }

    fn as_slices(outputs: &[Vec<f32>]) -> Vec<&[f32]> {
        outputs.iter().map(|v| v.as_slice()).collect()
    }

    /// Plant a face at anchor index `i` of stride 8, with box distance `d`
    /// cells on every side and landmarks at fixed offsets.
    fn plant(outputs: &mut [Vec<f32>], i: usize, score: f32, d: f32) {
        outputs[0][i] = score;
        outputs[3][i * 4..i * 4 + 4].copy_from_slice(&[d, d, d, d]);
        let kps = [-1.0, -1.0, 1.0, -1.0, 0.0, 0.0, -0.5, 1.0, 0.5, 1.0];
        outputs[6][i * 10..i * 10 + 10].copy_from_slice(&kps);
    }

    #[test]
    fn test_single_anchor_end_to_end() {
        let mut outputs = blank_outputs();
        // cell (10, 10) on the 80x80 grid, first of its two anchors
        let idx = (10 * 80 + 10) * 2;
        plant(&mut outputs, idx, 0.9, 2.0);

        let mut decoder = ScrfdDecoder::new(DetectorVariant::ThreeScale { landmarks: true }, INPUT, 0.4);
        let dets = decoder.decode(&as_slices(&outputs), 0.5, 1.0).unwrap();

        assert_eq!(dets.len(), 1);
        let det = &dets[0];
        let (cx, cy) = det.bbox.center();
        assert_relative_eq!(cx, 80.0);
        assert_relative_eq!(cy, 80.0);
        assert_relative_eq!(det.bbox.width, 32.0);
        let lm = det.landmarks.as_ref().unwrap();
        assert_eq!(lm.nose(), (80.0, 80.0));
        assert_eq!(lm.left_eye(), (72.0, 72.0));
    }

    #[test]
    fn test_rescale_divides_by_det_scale() {
        let mut outputs = blank_outputs();
        plant(&mut outputs, (10 * 80 + 10) * 2, 0.9, 2.0);

        let mut decoder = ScrfdDecoder::new(DetectorVariant::ThreeScale { landmarks: true }, INPUT, 0.4);
        let dets = decoder.decode(&as_slices(&outputs), 0.5, 0.5).unwrap();

        let (cx, cy) = dets[0].bbox.center();
        assert_relative_eq!(cx, 160.0);
        assert_relative_eq!(cy, 160.0);
        assert_eq!(dets[0].landmarks.as_ref().unwrap().nose(), (160.0, 160.0));
    }

    #[test]
    fn test_below_threshold_ignored() {
        let mut outputs = blank_outputs();
        plant(&mut outputs, 100, 0.49, 2.0);
        let mut decoder = ScrfdDecoder::new(DetectorVariant::ThreeScale { landmarks: true }, INPUT, 0.4);
        assert!(decoder.decode(&as_slices(&outputs), 0.5, 1.0).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_anchors_suppressed() {
        let mut outputs = blank_outputs();
        let idx = (10 * 80 + 10) * 2;
        plant(&mut outputs, idx, 0.9, 2.0);
        plant(&mut outputs, idx + 1, 0.8, 2.0);

        let mut decoder = ScrfdDecoder::new(DetectorVariant::ThreeScale { landmarks: true }, INPUT, 0.4);
        let dets = decoder.decode(&as_slices(&outputs), 0.5, 1.0).unwrap();
        assert_eq!(dets.len(), 1);
        assert_relative_eq!(dets[0].score, 0.9);
    }

    #[test]
    fn test_boxes_clamped_to_input() {
        let mut outputs = blank_outputs();
        plant(&mut outputs, 0, 0.9, 3.0);
        let mut decoder = ScrfdDecoder::new(DetectorVariant::ThreeScale { landmarks: true }, INPUT, 0.4);
        let candidates = decoder.candidates(&as_slices(&outputs), 0.5).unwrap();
        assert_eq!(candidates[0].bbox, [0.0, 0.0, 24.0, 24.0]);
    }

    #[test]
    fn test_model_without_landmarks() {
        let mut outputs = blank_outputs();
        outputs.truncate(6);
        outputs[0][0] = 0.9;
        let mut decoder = ScrfdDecoder::new(DetectorVariant::ThreeScale { landmarks: false }, INPUT, 0.4);
        let dets = decoder.decode(&as_slices(&outputs), 0.5, 1.0).unwrap();
        assert_eq!(dets.len(), 1);
        assert!(dets[0].landmarks.is_none());
    }

    #[test]
    fn test_wrong_output_count_rejected() {
        let outputs = blank_outputs();
        let mut decoder = ScrfdDecoder::new(DetectorVariant::ThreeScale { landmarks: false }, INPUT, 0.4);
        assert!(matches!(
            decoder.decode(&as_slices(&outputs), 0.5, 1.0),
            Err(DetectionError::UnsupportedOutputCount(9))
        ));
    }

    #[test]
    fn test_short_output_rejected() {
        let mut outputs = blank_outputs();
        outputs[4].pop();
        let mut decoder = ScrfdDecoder::new(DetectorVariant::ThreeScale { landmarks: true }, INPUT, 0.4);
        assert!(matches!(
            decoder.decode(&as_slices(&outputs), 0.5, 1.0),
            Err(DetectionError::OutputShape { output: 4, .. })
        ));
    }

    #[test]
    fn test_anchor_layouts_cached_across_passes() {
        let outputs = blank_outputs();
        let mut decoder = ScrfdDecoder::new(DetectorVariant::ThreeScale { landmarks: true }, INPUT, 0.4);
        decoder.decode(&as_slices(&outputs), 0.5, 1.0).unwrap();
        decoder.decode(&as_slices(&outputs), 0.5, 1.0).unwrap();
        assert_eq!(decoder.anchors.len(), 3);
    }
}
