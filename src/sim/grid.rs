//! Uniform collision grid
//!
//! A one-tick spatial index: rebuilt from the live entity set every tick,
//! discarded at the end of it. Entities are bucketed into every cell their
//! footprint (position ± radius) touches, so a `query` may over-approximate
//! the true candidate set but never misses an overlapping entity.

use std::collections::HashMap;

use glam::Vec2;

use crate::consts::GRID_CELL_SIZE;

/// Uniform-cell spatial index keyed by floor-divided world position.
#[derive(Debug, Clone)]
pub struct SpatialGrid<T> {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<T>>,
}

impl<T: Copy + PartialEq> SpatialGrid<T> {
    pub fn new() -> Self {
        Self::with_cell_size(GRID_CELL_SIZE)
    }

    pub fn with_cell_size(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    /// Drop all buckets. Bucket storage is reused across ticks.
    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
    }

    #[inline]
    fn key_range(&self, pos: Vec2, radius: f32) -> (i32, i32, i32, i32) {
        let min_x = ((pos.x - radius) / self.cell_size).floor() as i32;
        let max_x = ((pos.x + radius) / self.cell_size).floor() as i32;
        let min_y = ((pos.y - radius) / self.cell_size).floor() as i32;
        let max_y = ((pos.y + radius) / self.cell_size).floor() as i32;
        (min_x, max_x, min_y, max_y)
    }

    /// Bucket `item` into every cell its footprint touches.
    pub fn insert(&mut self, item: T, pos: Vec2, radius: f32) {
        let (min_x, max_x, min_y, max_y) = self.key_range(pos, radius);
        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                self.cells.entry((cx, cy)).or_default().push(item);
            }
        }
    }

    /// Deduplicated union of the buckets touched by a footprint, excluding
    /// `exclude`. Order follows cell scan then insertion order, which is
    /// stable within a tick.
    pub fn query(&self, pos: Vec2, radius: f32, exclude: Option<T>) -> Vec<T> {
        let (min_x, max_x, min_y, max_y) = self.key_range(pos, radius);
        let mut out: Vec<T> = Vec::new();
        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                let Some(bucket) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                for &item in bucket {
                    if Some(item) == exclude || out.contains(&item) {
                        continue;
                    }
                    out.push(item);
                }
            }
        }
        out
    }
}

impl<T: Copy + PartialEq> Default for SpatialGrid<T> {
    fn default() -> Self {
        Self::new()
    }
}
