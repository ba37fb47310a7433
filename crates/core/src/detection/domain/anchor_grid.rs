//! Anchor-centre generation for distance-encoded detector heads.
//!
//! Each feature-map scale predicts one or more boxes per grid cell, offset from
//! the cell's top-left corner in input pixels. Layouts depend only on the
//! stride and the fixed input size, so they are computed once and reused.

use std::collections::HashMap;
use std::sync::Arc;

/// Anchor centres `(x, y)` in input-tensor pixels, one entry per prediction.
pub type AnchorSet = Arc<[(f32, f32)]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnchorKey {
    pub stride: u32,
    pub grid_height: u32,
    pub grid_width: u32,
}

impl AnchorKey {
    fn cells(&self) -> usize {
        self.grid_height as usize * self.grid_width as usize
    }
}

/// Memoizing anchor generator, owned by one detector instance.
#[derive(Debug, Default)]
pub struct AnchorGrid {
    cache: HashMap<AnchorKey, AnchorSet>,
}

impl AnchorGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor centres for one scale, enumerated row-major.
    ///
    /// With `anchors_per_cell > 1` every centre repeats consecutively, so
    /// prediction `i` belongs to centre `i / anchors_per_cell`.
    pub fn anchors(
        &mut self,
        stride: u32,
        input_height: u32,
        input_width: u32,
        anchors_per_cell: usize,
    ) -> AnchorSet {
        let key = AnchorKey {
            stride,
            grid_height: input_height / stride,
            grid_width: input_width / stride,
        };
        let set = self
            .cache
            .entry(key)
            .or_insert_with(|| generate(key, anchors_per_cell))
            .clone();
        debug_assert_eq!(
            set.len(),
            key.cells() * anchors_per_cell.max(1),
            "cached layout for {key:?} has a different anchors-per-cell count"
        );
        set
    }

    /// Number of cached layouts.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

fn generate(key: AnchorKey, anchors_per_cell: usize) -> AnchorSet {
    let per_cell = anchors_per_cell.max(1);
    let cells = key.cells();
    let stride = key.stride as f32;

    let mut centers = Vec::with_capacity(cells * per_cell);
    for y in 0..key.grid_height {
        for x in 0..key.grid_width {
            let center = (x as f32 * stride, y as f32 * stride);
            centers.extend(std::iter::repeat(center).take(per_cell));
        }
    }
    centers.into()
}
