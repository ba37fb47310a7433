use crate::detection::domain::face_landmarks::FaceLandmarks;

/// Decoded candidate in detector input-tensor coordinates, before NMS.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    /// `[x1, y1, x2, y2]`
    pub bbox: [f32; 4],
    pub score: f32,
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Axis-aligned box in source-frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Corners in the order top-left, top-right, bottom-left, bottom-right.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.x, self.y),
            (self.x2(), self.y),
            (self.x, self.y2()),
            (self.x2(), self.y2()),
        ]
    }
}

/// A kept detection in source-frame pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub score: f32,
    pub landmarks: Option<FaceLandmarks>,
}

impl Detection {
    /// Maps a raw detection from input-tensor space back to frame pixels.
    ///
    /// `det_scale` is the letterbox factor (input pixels per frame pixel).
    pub fn from_raw(raw: &RawDetection, det_scale: f32) -> Self {
        let s = det_scale as f64;
        let [x1, y1, x2, y2] = raw.bbox.map(|v| v as f64 / s);
        let landmarks = raw
            .landmarks
            .map(|pts| FaceLandmarks::new(pts.map(|(x, y)| (x as f64, y as f64))).scaled(1.0 / s));
        Self {
            bbox: BoundingBox::from_corners(x1, y1, x2, y2),
            score: raw.score,
            landmarks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounding_box_geometry() {
        let b = BoundingBox::from_corners(10.0, 20.0, 50.0, 100.0);
        assert_relative_eq!(b.width, 40.0);
        assert_relative_eq!(b.height, 80.0);
        assert_relative_eq!(b.area(), 3200.0);
        assert_eq!(b.center(), (30.0, 60.0));
        assert_eq!(b.corners()[3], (50.0, 100.0));
    }

    #[test]
    fn test_from_raw_rescales_box_and_landmarks() {
        let raw = RawDetection {
            bbox: [20.0, 40.0, 60.0, 100.0],
            score: 0.9,
            landmarks: Some([(30.0, 50.0); 5]),
        };
        let det = Detection::from_raw(&raw, 2.0);
        assert_eq!(det.bbox, BoundingBox::from_corners(10.0, 20.0, 30.0, 50.0));
        assert_relative_eq!(det.score, 0.9);
        assert_eq!(det.landmarks.unwrap().nose(), (15.0, 25.0));
    }

    #[test]
    fn test_from_raw_without_landmarks() {
        let raw = RawDetection {
            bbox: [0.0, 0.0, 10.0, 10.0],
            score: 0.5,
            landmarks: None,
        };
        assert!(Detection::from_raw(&raw, 1.0).landmarks.is_none());
    }
}
