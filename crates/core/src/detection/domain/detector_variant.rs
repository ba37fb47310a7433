use crate::detection::domain::face_detector::DetectionError;

/// Output layout of a SCRFD-family model, resolved once from its output count.
///
/// Outputs are grouped by kind: `num_scales` score tensors, then the same
/// number of box-distance tensors, then (optionally) landmark-distance tensors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorVariant {
    /// Strides 8/16/32 with two anchors per cell.
    ThreeScale { landmarks: bool },
    /// Strides 8/16/32/64/128 with one anchor per cell.
    FiveScale { landmarks: bool },
}

const THREE_SCALE_STRIDES: &[u32] = &[8, 16, 32];
const FIVE_SCALE_STRIDES: &[u32] = &[8, 16, 32, 64, 128];

impl DetectorVariant {
    pub fn from_output_count(count: usize) -> Result<Self, DetectionError> {
        match count {
            6 => Ok(Self::ThreeScale { landmarks: false }),
            9 => Ok(Self::ThreeScale { landmarks: true }),
            10 => Ok(Self::FiveScale { landmarks: false }),
            15 => Ok(Self::FiveScale { landmarks: true }),
            n => Err(DetectionError::UnsupportedOutputCount(n)),
        }
    }

    pub fn strides(&self) -> &'static [u32] {
        match self {
            Self::ThreeScale { .. } => THREE_SCALE_STRIDES,
            Self::FiveScale { .. } => FIVE_SCALE_STRIDES,
        }
    }

    pub fn num_scales(&self) -> usize {
        self.strides().len()
    }

    pub fn anchors_per_cell(&self) -> usize {
        match self {
            Self::ThreeScale { .. } => 2,
            Self::FiveScale { .. } => 1,
        }
    }

    pub fn has_landmarks(&self) -> bool {
        match *self {
            Self::ThreeScale { landmarks } | Self::FiveScale { landmarks } => landmarks,
        }
    }

    pub fn output_count(&self) -> usize {
        let groups = if self.has_landmarks() { 3 } else { 2 };
        self.num_scales() * groups
    }

    pub fn score_output(&self, scale: usize) -> usize {
        scale
    }

    pub fn box_output(&self, scale: usize) -> usize {
        scale + self.num_scales()
    }

    /// Index of the landmark output for `scale`, if the model predicts landmarks.
    pub fn landmark_output(&self, scale: usize) -> Option<usize> {
        self.has_landmarks().then(|| scale + 2 * self.num_scales())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(6, &[8, 16, 32], 2, false)]
    #[case(9, &[8, 16, 32], 2, true)]
    #[case(10, &[8, 16, 32, 64, 128], 1, false)]
    #[case(15, &[8, 16, 32, 64, 128], 1, true)]
    fn test_variant_from_output_count(
        #[case] count: usize,
        #[case] strides: &[u32],
        #[case] per_cell: usize,
        #[case] landmarks: bool,
    ) {
        let v = DetectorVariant::from_output_count(count).unwrap();
        assert_eq!(v.strides(), strides);
        assert_eq!(v.anchors_per_cell(), per_cell);
        assert_eq!(v.has_landmarks(), landmarks);
        assert_eq!(v.output_count(), count);
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(12)]
    fn test_unknown_count_rejected(#[case] count: usize) {
        assert!(matches!(
            DetectorVariant::from_output_count(count),
            Err(DetectionError::UnsupportedOutputCount(n)) if n == count
        ));
    }

    #[test]
    fn test_output_indices_grouped_by_kind() {
        let v = DetectorVariant::ThreeScale { landmarks: true };
        assert_eq!(v.score_output(1), 1);
        assert_eq!(v.box_output(1), 4);
        assert_eq!(v.landmark_output(1), Some(7));
    }

    #[test]
    fn test_no_landmark_output_without_landmarks() {
        let v = DetectorVariant::FiveScale { landmarks: false };
        assert_eq!(v.landmark_output(0), None);
        assert_eq!(v.box_output(4), 9);
    }
}
