//! 5-point face landmarks in the detector's fixed order.
//!
//! The order `[left_eye, right_eye, nose, left_mouth, right_mouth]` is relied on
//! by alignment and geometry scoring.

pub const LEFT_EYE: usize = 0;
pub const RIGHT_EYE: usize = 1;
pub const NOSE: usize = 2;
pub const LEFT_MOUTH: usize = 3;
pub const RIGHT_MOUTH: usize = 4;

pub const NUM_LANDMARKS: usize = 5;

pub type Point = (f64, f64);

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: [Point; NUM_LANDMARKS],
}

impl FaceLandmarks {
    pub fn new(points: [Point; NUM_LANDMARKS]) -> Self {
        Self { points }
    }

    /// Builds landmarks from a decoded point list; `None` unless exactly 5 points.
    pub fn from_slice(points: &[Point]) -> Option<Self> {
        let points: [Point; NUM_LANDMARKS] = points.try_into().ok()?;
        Some(Self::new(points))
    }

    pub fn points(&self) -> &[Point; NUM_LANDMARKS] {
        &self.points
    }

    pub fn left_eye(&self) -> Point {
        self.points[LEFT_EYE]
    }

    pub fn right_eye(&self) -> Point {
        self.points[RIGHT_EYE]
    }

    pub fn nose(&self) -> Point {
        self.points[NOSE]
    }

    pub fn left_mouth(&self) -> Point {
        self.points[LEFT_MOUTH]
    }

    pub fn right_mouth(&self) -> Point {
        self.points[RIGHT_MOUTH]
    }

    pub fn eye_center(&self) -> Point {
        midpoint(self.left_eye(), self.right_eye())
    }

    pub fn mouth_center(&self) -> Point {
        midpoint(self.left_mouth(), self.right_mouth())
    }

    pub fn eye_distance(&self) -> f64 {
        distance(self.left_eye(), self.right_eye())
    }

    pub fn mouth_distance(&self) -> f64 {
        distance(self.left_mouth(), self.right_mouth())
    }

    /// Roll angle of the eye line in radians (image coordinates, y down).
    pub fn roll(&self) -> f64 {
        let (lx, ly) = self.left_eye();
        let (rx, ry) = self.right_eye();
        (ry - ly).atan2(rx - lx)
    }

    pub fn has_negative_coordinate(&self) -> bool {
        self.points.iter().any(|&(x, y)| x < 0.0 || y < 0.0)
    }

    /// Uniformly rescale every point, e.g. from detector input space to frame pixels.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.points.map(|(x, y)| (x * factor, y * factor)))
    }
}

pub fn midpoint(a: Point, b: Point) -> Point {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

pub fn distance(a: Point, b: Point) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}
