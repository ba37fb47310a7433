/// SCRFD face detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, and hands the raw outputs to
/// [`ScrfdDecoder`] for anchor decoding, NMS and rescaling.
use std::path::Path;

use image::imageops::FilterType;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::detector_variant::DetectorVariant;
use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::shared::constants::DETECTOR_INPUT_SIZE;
use crate::shared::frame::Frame;

use super::scrfd_decoder::ScrfdDecoder;

/// Pixel normalisation used at training time: `(p - MEAN) / STD`.
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 128.0;

/// SCRFD face detector backed by an ONNX Runtime session.
pub struct OnnxScrfdDetector {
    session: ort::session::Session,
    decoder: ScrfdDecoder,
    input_size: (u32, u32),
}

impl OnnxScrfdDetector {
    /// Load a SCRFD ONNX model and resolve its output layout.
    ///
    /// The variant is fixed here from the session's output count and never
    /// re-inspected per frame.
    pub fn new(model_path: &Path, nms_threshold: f32) -> Result<Self, DetectionError> {
        let session = ort::session::Session::builder()
            .map_err(model_error)?
            .with_execution_providers(preferred_execution_providers())
            .map_err(model_error)?
            .commit_from_file(model_path)
            .map_err(model_error)?;

        let variant = DetectorVariant::from_output_count(session.outputs().len())?;
        log::info!(
            "Loaded detector {} ({:?}, strides {:?})",
            model_path.display(),
            variant,
            variant.strides()
        );

        let input_size = DETECTOR_INPUT_SIZE;
        Ok(Self {
            session,
            decoder: ScrfdDecoder::new(variant, input_size, nms_threshold),
            input_size,
        })
    }

    pub fn variant(&self) -> DetectorVariant {
        self.decoder.variant()
    }
}

impl FaceDetector for OnnxScrfdDetector {
    fn detect(&mut self, frame: &Frame, threshold: f32) -> Result<Vec<Detection>, DetectionError> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        // 1. Preprocess: letterbox to the top-left corner, BGR, normalised NCHW
        let (input_tensor, det_scale) = letterbox(frame, self.input_size);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor).map_err(inference_error)?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(inference_error)?;

        let mut flat: Vec<Vec<f32>> = Vec::with_capacity(outputs.len());
        for i in 0..outputs.len() {
            let array = outputs[i]
                .try_extract_array::<f32>()
                .map_err(inference_error)?;
            flat.push(array.iter().copied().collect());
        }
        drop(outputs);

        // 3. Decode, suppress, rescale to frame pixels
        let slices: Vec<&[f32]> = flat.iter().map(|v| v.as_slice()).collect();
        self.decoder.decode(&slices, threshold, det_scale)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize `frame` to fit `(height, width)` preserving aspect ratio, anchored
/// at the top-left with black padding.
///
/// Returns `(NCHW float32 tensor in BGR order, det_scale)` where `det_scale`
/// is input pixels per frame pixel.
fn letterbox(frame: &Frame, input_size: (u32, u32)) -> (ndarray::Array4<f32>, f32) {
    let (input_h, input_w) = input_size;
    let (new_w, new_h) = letterbox_size(frame.width(), frame.height(), input_size);
    let det_scale = new_h as f32 / frame.height() as f32;

    let pad = (0.0 - PIXEL_MEAN) / PIXEL_STD;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, input_h as usize, input_w as usize), pad);

    let resized = match frame.to_image() {
        Some(img) => image::imageops::resize(&img, new_w, new_h, FilterType::Triangle),
        None => return (tensor, det_scale),
    };

    for (x, y, pixel) in resized.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (x, y) = (x as usize, y as usize);
        tensor[[0, 0, y, x]] = (b as f32 - PIXEL_MEAN) / PIXEL_STD;
        tensor[[0, 1, y, x]] = (g as f32 - PIXEL_MEAN) / PIXEL_STD;
        tensor[[0, 2, y, x]] = (r as f32 - PIXEL_MEAN) / PIXEL_STD;
    }

    (tensor, det_scale)
}

/// Letterboxed `(width, height)` for a frame inside the detector input.
fn letterbox_size(width: u32, height: u32, input_size: (u32, u32)) -> (u32, u32) {
    let (input_h, input_w) = input_size;
    let im_ratio = height as f64 / width as f64;
    let model_ratio = input_h as f64 / input_w as f64;

    if im_ratio > model_ratio {
        let new_h = input_h;
        let new_w = ((new_h as f64 / im_ratio).round() as u32).clamp(1, input_w);
        (new_w, new_h)
    } else {
        let new_w = input_w;
        let new_h = ((new_w as f64 * im_ratio).round() as u32).clamp(1, input_h);
        (new_w, new_h)
    }
}

/// Preferred ONNX execution providers for the current platform; CPU otherwise.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

fn model_error(e: impl std::fmt::Display) -> DetectionError {
    DetectionError::Model(e.to_string())
}

fn inference_error(e: impl std::fmt::Display) -> DetectionError {
    DetectionError::Inference(e.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::landscape(640, 480, (640, 480))]
    #[case::portrait(480, 640, (480, 640))]
    #[case::square(100, 100, (640, 640))]
    #[case::wide(200, 100, (640, 320))]
    #[case::tall(100, 300, (213, 640))]
    fn test_letterbox_size(#[case] w: u32, #[case] h: u32, #[case] expected: (u32, u32)) {
        assert_eq!(letterbox_size(w, h, (640, 640)), expected);
    }

    #[test]
    fn test_letterbox_scale_and_shape() {
        let frame = Frame::filled(320, 240, [0, 0, 0]);
        let (tensor, det_scale) = letterbox(&frame, (640, 640));
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(det_scale, 2.0);
    }

    #[test]
    fn test_letterbox_channel_order_is_bgr() {
        let frame = Frame::filled(64, 64, [255, 128, 0]);
        let (tensor, _) = letterbox(&frame, (640, 640));
        assert_relative_eq!(tensor[[0, 0, 10, 10]], (0.0 - 127.5) / 128.0);
        assert_relative_eq!(tensor[[0, 1, 10, 10]], (128.0 - 127.5) / 128.0);
        assert_relative_eq!(tensor[[0, 2, 10, 10]], (255.0 - 127.5) / 128.0);
    }

    #[test]
    fn test_letterbox_pads_bottom_with_black() {
        // 200x100 → 640x320 drawn at the top; rows below 320 are padding
        let frame = Frame::filled(200, 100, [255, 255, 255]);
        let (tensor, _) = letterbox(&frame, (640, 640));
        let black = -127.5 / 128.0;
        assert_relative_eq!(tensor[[0, 0, 100, 100]], 127.5 / 128.0);
        assert_relative_eq!(tensor[[0, 0, 400, 100]], black);
        assert_relative_eq!(tensor[[0, 2, 639, 639]], black);
    }
}
