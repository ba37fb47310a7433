use ndarray::{s, Array2, Axis};

use crate::shared::frame::Frame;

/// Variance of the 4-neighbour Laplacian of the frame's luma.
///
/// Higher is sharper. Only interior pixels contribute; frames smaller than
/// 3x3 have none and score `0.0`.
pub fn laplacian_variance(frame: &Frame) -> f64 {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    if w < 3 || h < 3 {
        return 0.0;
    }

    let gray = luma(frame);
    let center = gray.slice(s![1..h - 1, 1..w - 1]);
    let up = gray.slice(s![0..h - 2, 1..w - 1]);
    let down = gray.slice(s![2..h, 1..w - 1]);
    let left = gray.slice(s![1..h - 1, 0..w - 2]);
    let right = gray.slice(s![1..h - 1, 2..w]);

    let lap = &up + &down + &left + &right - &center * 4.0;

    let count = lap.len() as f64;
    let mean = lap.sum() / count;
    let mean_sq = lap.iter().map(|v| v * v).sum::<f64>() / count;
    mean_sq - mean * mean
}

/// ITU-R BT.601 luma, one value per pixel.
fn luma(frame: &Frame) -> Array2<f64> {
    frame.as_ndarray().map_axis(Axis(2), |px| {
        0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64
    })
}
