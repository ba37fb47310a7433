//! Roll-corrects a face so the eye line is level, then crops the face box
//! out of the rotated image.
//!
//! Everything here works in image coordinates (origin top-left, y down).
//! A single [`Rotation`] drives both the pixel resampling and the box
//! transform.

use crate::detection::domain::detection::BoundingBox;
use crate::detection::domain::face_landmarks::{FaceLandmarks, Point};
use crate::shared::constants::DEFAULT_ALIGNMENT_PADDING;
use crate::shared::frame::{Frame, CHANNELS};

/// Rotation by `-roll` about the eye centre, levelling the eye line.
#[derive(Clone, Copy, Debug)]
struct Rotation {
    center: Point,
    cos: f64,
    sin: f64,
}

impl Rotation {
    fn levelling(landmarks: &FaceLandmarks) -> Self {
        let angle = -landmarks.roll();
        Self {
            center: landmarks.eye_center(),
            cos: angle.cos(),
            sin: angle.sin(),
        }
    }

    /// Source image point → rotated image point.
    fn forward(&self, (x, y): Point) -> Point {
        let (cx, cy) = self.center;
        let (dx, dy) = (x - cx, y - cy);
        (
            cx + dx * self.cos - dy * self.sin,
            cy + dx * self.sin + dy * self.cos,
        )
    }

    /// Rotated image point → source image point.
    fn inverse(&self, (x, y): Point) -> Point {
        let (cx, cy) = self.center;
        let (dx, dy) = (x - cx, y - cy);
        (
            cx + dx * self.cos + dy * self.sin,
            cy - dx * self.sin + dy * self.cos,
        )
    }

    /// Axis-aligned bounds `(min_x, min_y, max_x, max_y)` of mapped points.
    fn bounds(&self, points: &[Point]) -> (f64, f64, f64, f64) {
        points.iter().map(|&p| self.forward(p)).fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), (x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }
}

/// Rotated canvas: its size and the offset of its origin in rotated space.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Canvas {
    origin: Point,
    width: u32,
    height: u32,
}

impl Canvas {
    fn around(rotation: &Rotation, frame_width: u32, frame_height: u32) -> Self {
        let (w, h) = (frame_width as f64, frame_height as f64);
        let (min_x, min_y, max_x, max_y) =
            rotation.bounds(&[(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]);
        Self {
            origin: (min_x, min_y),
            width: (max_x - min_x).ceil().max(0.0) as u32,
            height: (max_y - min_y).ceil().max(0.0) as u32,
        }
    }
}

/// Pixel region `(x, y, width, height)` inside the rotated canvas.
type Region = (u32, u32, u32, u32);

pub struct FaceAligner {
    padding: u32,
}

impl Default for FaceAligner {
    fn default() -> Self {
        Self::new(DEFAULT_ALIGNMENT_PADDING)
    }
}

impl FaceAligner {
    pub fn new(padding: u32) -> Self {
        Self { padding }
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// Level the eye line and crop the (rotated, padded) face box.
    ///
    /// Returns `None` unless exactly five landmarks are given, or when the
    /// rotated box falls entirely outside the rotated image.
    pub fn align(&self, frame: &Frame, landmarks: &[Point], bbox: &BoundingBox) -> Option<Frame> {
        let landmarks = FaceLandmarks::from_slice(landmarks)?;
        if frame.is_empty() {
            return None;
        }

        let rotation = Rotation::levelling(&landmarks);
        let canvas = Canvas::around(&rotation, frame.width(), frame.height());
        let region = self.face_region(&rotation, &canvas, bbox)?;

        Some(render(frame, &rotation, &canvas, region))
    }

    fn face_region(&self, rotation: &Rotation, canvas: &Canvas, bbox: &BoundingBox) -> Option<Region> {
        let (min_x, min_y, max_x, max_y) = rotation.bounds(&bbox.corners());
        let (ox, oy) = canvas.origin;
        let pad = self.padding as f64;

        let x0 = ((min_x - ox).floor() - pad).max(0.0);
        let y0 = ((min_y - oy).floor() - pad).max(0.0);
        let x1 = ((max_x - ox).ceil() + pad).min(canvas.width as f64);
        let y1 = ((max_y - oy).ceil() + pad).min(canvas.height as f64);

        if !(x1 - x0 > 0.0 && y1 - y0 > 0.0) {
            return None;
        }
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

/// Resample `region` of the rotated canvas from the source frame.
fn render(frame: &Frame, rotation: &Rotation, canvas: &Canvas, region: Region) -> Frame {
    let (rx, ry, rw, rh) = region;
    let (ox, oy) = canvas.origin;
    let mut data = Vec::with_capacity(rw as usize * rh as usize * CHANNELS);

    for y in ry..ry + rh {
        for x in rx..rx + rw {
            let centre = (x as f64 + 0.5 + ox, y as f64 + 0.5 + oy);
            let (sx, sy) = rotation.inverse(centre);
            data.extend_from_slice(&bilinear(frame, sx - 0.5, sy - 0.5));
        }
    }
    Frame::new(data, rw, rh, frame.index())
}

/// Bilinear sample at continuous pixel coordinates; out-of-frame taps are black.
fn bilinear(frame: &Frame, x: f64, y: f64) -> [u8; 3] {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let tap = |dx: f64, dy: f64| -> [f64; 3] {
        let (px, py) = (x0 + dx, y0 + dy);
        if px < 0.0 || py < 0.0 || px >= frame.width() as f64 || py >= frame.height() as f64 {
            return [0.0; 3];
        }
        frame.pixel(px as u32, py as u32).map(f64::from)
    };

    let (a, b, c, d) = (tap(0.0, 0.0), tap(1.0, 0.0), tap(0.0, 1.0), tap(1.0, 1.0));
    let mut out = [0u8; 3];
    for ch in 0..3 {
        let top = a[ch] * (1.0 - fx) + b[ch] * fx;
        let bottom = c[ch] * (1.0 - fx) + d[ch] * fx;
        out[ch] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}
