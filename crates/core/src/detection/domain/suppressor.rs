//! Greedy non-max suppression.
//!
//! Overlap uses the inclusive pixel convention, where a box `[x1, y1, x2, y2]`
//! covers `(x2 - x1 + 1) * (y2 - y1 + 1)` pixels.

pub use crate::shared::constants::DEFAULT_NMS_THRESHOLD;

/// Intersection over union of two `[x1, y1, x2, y2]` boxes, inclusive areas.
pub fn inclusive_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let xx1 = a[0].max(b[0]);
    let yy1 = a[1].max(b[1]);
    let xx2 = a[2].min(b[2]);
    let yy2 = a[3].min(b[3]);

    let w = (xx2 - xx1 + 1.0).max(0.0);
    let h = (yy2 - yy1 + 1.0).max(0.0);
    let inter = w * h;

    let area_a = (a[2] - a[0] + 1.0) * (a[3] - a[1] + 1.0);
    let area_b = (b[2] - b[0] + 1.0) * (b[3] - b[1] + 1.0);
    inter / (area_a + area_b - inter)
}

/// Indices of the boxes to keep, highest score first.
///
/// Ties keep their original order. A box is dropped when its overlap with an
/// already-kept box exceeds `iou_threshold`.
pub fn suppress(boxes: &[[f32; 4]], scores: &[f32], iou_threshold: f32) -> Vec<usize> {
    debug_assert_eq!(boxes.len(), scores.len(), "one score per box");

    let mut order: Vec<usize> = (0..boxes.len().min(scores.len())).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; boxes.len()];

    for (pos, &i) in order.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        keep.push(i);
        for &j in &order[pos + 1..] {
            if suppressed[j] {
                continue;
            }
            if inclusive_iou(&boxes[i], &boxes[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_iou_identical() {
        let b = [0.0, 0.0, 9.0, 9.0];
        assert_relative_eq!(inclusive_iou(&b, &b), 1.0);
    }

    #[test]
    fn test_iou_uses_inclusive_area() {
        // 10x10 pixel boxes sharing a 5x10 strip
        let a = [0.0, 0.0, 9.0, 9.0];
        let b = [5.0, 0.0, 14.0, 9.0];
        assert_relative_eq!(inclusive_iou(&a, &b), 50.0 / 150.0);
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = [0.0, 0.0, 9.0, 9.0];
        let b = [20.0, 20.0, 29.0, 29.0];
        assert_relative_eq!(inclusive_iou(&a, &b), 0.0);
    }

    // Box b spans [off, 0]..[off + 9, 9]; a 10x10 pixel box at offset `off`
    // overlaps a by (10 - off) * 10 pixels.
    #[rstest]
    #[case::iou_0_6(2.5, 1)] // 75 / 125 = 0.6
    #[case::iou_0_2(6.6666665, 2)] // ~33.3 / ~166.7 = 0.2
    fn test_nms_threshold_0_4(#[case] off: f32, #[case] expected_kept: usize) {
        let boxes = [[0.0, 0.0, 9.0, 9.0], [off, 0.0, off + 9.0, 9.0]];
        let kept = suppress(&boxes, &[0.9, 0.8], 0.4);
        assert_eq!(kept.len(), expected_kept);
        assert_eq!(kept[0], 0);
    }

    #[test]
    fn test_lower_score_is_the_one_suppressed() {
        let boxes = [[0.0, 0.0, 99.0, 99.0], [2.0, 2.0, 101.0, 101.0]];
        let kept = suppress(&boxes, &[0.5, 0.9], DEFAULT_NMS_THRESHOLD);
        assert_eq!(kept, vec![1]);
    }

    #[test]
    fn test_output_sorted_by_score() {
        let boxes = [
            [0.0, 0.0, 10.0, 10.0],
            [100.0, 100.0, 110.0, 110.0],
            [200.0, 200.0, 210.0, 210.0],
        ];
        let kept = suppress(&boxes, &[0.6, 0.9, 0.7], 0.4);
        assert_eq!(kept, vec![1, 2, 0]);
    }

    #[test]
    fn test_ties_resolved_by_original_index() {
        let boxes = [[0.0, 0.0, 10.0, 10.0], [0.0, 0.0, 10.0, 10.0]];
        assert_eq!(suppress(&boxes, &[0.8, 0.8], 0.4), vec![0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(suppress(&[], &[], 0.4).is_empty());
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let boxes = vec![
            [0.0, 0.0, 50.0, 50.0],
            [5.0, 5.0, 55.0, 55.0],
            [30.0, 30.0, 80.0, 80.0],
            [200.0, 0.0, 240.0, 40.0],
            [202.0, 1.0, 241.0, 42.0],
        ];
        let scores = vec![0.9, 0.85, 0.7, 0.6, 0.95];
        let first = suppress(&boxes, &scores, 0.4);

        let kept_boxes: Vec<[f32; 4]> = first.iter().map(|&i| boxes[i]).collect();
        let kept_scores: Vec<f32> = first.iter().map(|&i| scores[i]).collect();
        let second = suppress(&kept_boxes, &kept_scores, 0.4);

        assert_eq!(second, (0..first.len()).collect::<Vec<_>>());
    }
}
