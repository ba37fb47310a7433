//! Distance-encoded box and landmark decoding.
//!
//! Predictions are distances from an anchor centre, already multiplied by the
//! stride. Clamping is optional and per axis: x to `[0, width]`, y to
//! `[0, height]`.

/// `(height, width)` bounds for clamping decoded coordinates.
pub type ClampShape = (f32, f32);

/// Decode the box of anchor `i`: distances `(left, top, right, bottom)` at `i * 4`.
pub fn decode_box_at(
    anchor: (f32, f32),
    distances: &[f32],
    i: usize,
    clamp: Option<ClampShape>,
) -> [f32; 4] {
    let (px, py) = anchor;
    let d = &distances[i * 4..i * 4 + 4];
    let mut bbox = [px - d[0], py - d[1], px + d[2], py + d[3]];
    if let Some((h, w)) = clamp {
        bbox[0] = bbox[0].clamp(0.0, w);
        bbox[1] = bbox[1].clamp(0.0, h);
        bbox[2] = bbox[2].clamp(0.0, w);
        bbox[3] = bbox[3].clamp(0.0, h);
    }
    bbox
}

/// Decode the `num_points` landmarks of anchor `i`.
pub fn decode_landmarks_at(
    anchor: (f32, f32),
    distances: &[f32],
    i: usize,
    num_points: usize,
    clamp: Option<ClampShape>,
) -> Vec<(f32, f32)> {
    let (px, py) = anchor;
    let base = i * num_points * 2;
    (0..num_points)
        .map(|j| {
            let mut x = px + distances[base + j * 2];
            let mut y = py + distances[base + j * 2 + 1];
            if let Some((h, w)) = clamp {
                x = x.clamp(0.0, w);
                y = y.clamp(0.0, h);
            }
            (x, y)
        })
        .collect()
}

/// Decode one box per anchor.
pub fn decode_boxes(
    anchors: &[(f32, f32)],
    distances: &[f32],
    clamp: Option<ClampShape>,
) -> Vec<[f32; 4]> {
    anchors
        .iter()
        .enumerate()
        .map(|(i, &anchor)| decode_box_at(anchor, distances, i, clamp))
        .collect()
}

/// Decode one landmark set per anchor; the point count is inferred from the
/// distance length.
pub fn decode_landmarks(
    anchors: &[(f32, f32)],
    distances: &[f32],
    clamp: Option<ClampShape>,
) -> Vec<Vec<(f32, f32)>> {
    if anchors.is_empty() {
        return Vec::new();
    }
    let num_points = landmark_count(anchors.len(), distances.len());
    anchors
        .iter()
        .enumerate()
        .map(|(i, &anchor)| decode_landmarks_at(anchor, distances, i, num_points, clamp))
        .collect()
}

/// Points per anchor implied by a landmark-distance vector.
pub fn landmark_count(num_anchors: usize, num_distances: usize) -> usize {
    if num_anchors == 0 {
        0
    } else {
        num_distances / (num_anchors * 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_box() {
        let boxes = decode_boxes(&[(100.0, 100.0)], &[10.0, 10.0, 10.0, 10.0], None);
        assert_eq!(boxes, vec![[90.0, 90.0, 110.0, 110.0]]);
    }

    #[test]
    fn test_decode_box_clamped() {
        let boxes = decode_boxes(
            &[(100.0, 100.0)],
            &[10.0, 10.0, 10.0, 10.0],
            Some((105.0, 105.0)),
        );
        assert_eq!(boxes, vec![[90.0, 90.0, 105.0, 105.0]]);
    }

    #[test]
    fn test_clamp_is_per_axis() {
        // height 50, width 200: only y is limited
        let bbox = decode_box_at((100.0, 40.0), &[150.0, 60.0, 150.0, 30.0], 0, Some((50.0, 200.0)));
        assert_eq!(bbox, [0.0, 0.0, 200.0, 50.0]);
    }

    #[test]
    fn test_clamped_box_keeps_ordering() {
        let bbox = decode_box_at((5.0, 5.0), &[20.0, 20.0, 1.0, 1.0], 0, Some((100.0, 100.0)));
        assert!(bbox[2] >= bbox[0]);
        assert!(bbox[3] >= bbox[1]);
    }

    #[test]
    fn test_box_uses_anchor_offset() {
        let anchors = [(0.0, 0.0), (8.0, 16.0)];
        let distances = [1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let boxes = decode_boxes(&anchors, &distances, None);
        assert_eq!(boxes[1], [6.0, 13.0, 12.0, 21.0]);
    }

    #[test]
    fn test_landmark_count_and_shape() {
        let anchors = [(0.0, 0.0), (10.0, 10.0)];
        let distances: Vec<f32> = (0..20).map(|v| v as f32).collect();
        let sets = decode_landmarks(&anchors, &distances, None);
        assert_eq!(sets.len(), 2);
        assert!(sets.iter().all(|s| s.len() == 5));
        // anchor 1, point 0 reads distances[10], distances[11]
        assert_eq!(sets[1][0], (20.0, 21.0));
        assert_eq!(sets[0][4], (8.0, 9.0));
    }

    #[test]
    fn test_landmarks_clamped() {
        let sets = decode_landmarks(&[(10.0, 10.0)], &[-20.0, 5.0, 100.0, 100.0], Some((50.0, 60.0)));
        assert_eq!(sets[0], vec![(0.0, 15.0), (60.0, 50.0)]);
    }

    #[test]
    fn test_empty_anchors() {
        assert!(decode_boxes(&[], &[], None).is_empty());
        assert!(decode_landmarks(&[], &[], None).is_empty());
    }
}
