use std::collections::HashMap;

use crate::coords::Rect;

/// Bounding-box queries over scene entries.
///
/// The occlusion pass rebuilds the index every frame from the occludable
/// tokens, so `rebuild` must be cheap for small populations and `query_rect`
/// must not allocate per call.
pub trait SpatialIndex {
    /// Rebuilds internal structures from `(id, bounds)` entries.
    fn rebuild(&mut self, entries: &[(String, Rect)]);

    /// Visits every entry whose bounds overlap `rect`.
    fn query_rect(&self, rect: Rect, visitor: &mut dyn FnMut(&str, Rect));
}

/// Uniform-grid bounding-box index.
///
/// Entries are bucketed into every cell their bounds touch; queries visit
/// the touched cells and deduplicate via a generation-free seen list
/// (entry count is small, a linear scan is fine).
#[derive(Debug)]
pub struct UniformGridIndex {
    cell_size: f32,
    entries: Vec<(String, Rect)>,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl UniformGridIndex {
    pub fn new(cell_size: f32) -> Self {
        debug_assert!(cell_size > 0.0, "cell_size must be positive");
        Self {
            cell_size: cell_size.max(1.0),
            entries: Vec::new(),
            cells: HashMap::new(),
        }
    }

    fn cell_range(&self, rect: Rect) -> (i32, i32, i32, i32) {
        let r = rect.normalized();
        let min = r.min();
        let max = r.max();
        (
            (min.x / self.cell_size).floor() as i32,
            (min.y / self.cell_size).floor() as i32,
            (max.x / self.cell_size).floor() as i32,
            (max.y / self.cell_size).floor() as i32,
        )
    }
}

impl Default for UniformGridIndex {
    fn default() -> Self {
        Self::new(256.0)
    }
}

impl SpatialIndex for UniformGridIndex {
    fn rebuild(&mut self, entries: &[(String, Rect)]) {
        self.entries.clear();
        self.entries.extend_from_slice(entries);
        self.cells.clear();

        for (idx, (_, bounds)) in self.entries.iter().enumerate() {
            let (x0, y0, x1, y1) = self.cell_range(*bounds);
            for cy in y0..=y1 {
                for cx in x0..=x1 {
                    self.cells.entry((cx, cy)).or_default().push(idx);
                }
            }
        }
    }

    fn query_rect(&self, rect: Rect, visitor: &mut dyn FnMut(&str, Rect)) {
        let (x0, y0, x1, y1) = self.cell_range(rect);
        let mut seen: Vec<usize> = Vec::new();

        for cy in y0..=y1 {
            for cx in x0..=x1 {
                let Some(bucket) = self.cells.get(&(cx, cy)) else { continue };
                for &idx in bucket {
                    if seen.contains(&idx) {
                        continue;
                    }
                    seen.push(idx);
                    let (id, bounds) = &self.entries[idx];
                    if bounds.overlaps(rect) {
                        visitor(id, *bounds);
                    }
                }
            }
        }
    }
}
