pub const SCRFD_MODEL_NAME: &str = "scrfd_kps.onnx";

/// Detector input resolution `(height, width)`. Fixed for the life of a detector.
pub const DETECTOR_INPUT_SIZE: (u32, u32) = (640, 640);

pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.5;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.4;
pub const DEFAULT_BLUR_THRESHOLD: f64 = 50.0;
pub const DEFAULT_ALIGNMENT_PADDING: u32 = 2;

/// Uploads larger than this are rejected before any request is made.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Number of recent log messages kept for status display.
pub const MAX_RECENT_MESSAGES: usize = 50;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
