//! Spatial-hash broad phase.
//!
//! Primitives (triangles, edges) are binned into a uniform grid by
//! their gap-inflated AABBs; queries gather the candidates overlapping
//! a point's cell or a box's cells. Cell size is chosen from the
//! activation distance, so a primitive rarely spans more than a
//! handful of cells.

use std::collections::HashMap;

use weft_math::Vec3;
use weft_types::Scalar;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box containing a set of points, inflated by `margin`.
    pub fn from_points(points: &[Vec3], margin: Scalar) -> Self {
        let mut min = Vec3::splat(Scalar::MAX);
        let mut max = Vec3::splat(Scalar::MIN);
        for &p in points {
            min = min.min(p);
            max = max.max(p);
        }
        Self {
            min: min - Vec3::splat(margin),
            max: max + Vec3::splat(margin),
        }
    }
}

/// Uniform grid over primitive AABBs.
pub struct SpatialHash {
    inv_cell: Scalar,
    grid: HashMap<(i64, i64, i64), Vec<u32>>,
}

impl SpatialHash {
    /// Creates an empty hash with the given cell size.
    pub fn new(cell_size: Scalar) -> Self {
        Self {
            inv_cell: 1.0 / cell_size.max(1e-9),
            grid: HashMap::new(),
        }
    }

    fn cell_of(&self, p: Vec3) -> (i64, i64, i64) {
        (
            (p.x * self.inv_cell).floor() as i64,
            (p.y * self.inv_cell).floor() as i64,
            (p.z * self.inv_cell).floor() as i64,
        )
    }

    /// Inserts primitive `id` into every cell its box overlaps.
    pub fn insert(&mut self, id: u32, aabb: &Aabb) {
        let lo = self.cell_of(aabb.min);
        let hi = self.cell_of(aabb.max);
        for cx in lo.0..=hi.0 {
            for cy in lo.1..=hi.1 {
                for cz in lo.2..=hi.2 {
                    self.grid.entry((cx, cy, cz)).or_default().push(id);
                }
            }
        }
    }

    /// Collects primitives whose cells overlap the query box.
    /// Results are sorted and deduplicated.
    pub fn query(&self, aabb: &Aabb, out: &mut Vec<u32>) {
        out.clear();
        let lo = self.cell_of(aabb.min);
        let hi = self.cell_of(aabb.max);
        for cx in lo.0..=hi.0 {
            for cy in lo.1..=hi.1 {
                for cz in lo.2..=hi.2 {
                    if let Some(ids) = self.grid.get(&(cx, cy, cz)) {
                        out.extend_from_slice(ids);
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }

    /// Collects primitives sharing the cell of a single point,
    /// including the 26 neighbouring cells within `margin`.
    pub fn query_point(&self, p: Vec3, margin: Scalar, out: &mut Vec<u32>) {
        let aabb = Aabb {
            min: p - Vec3::splat(margin),
            max: p + Vec3::splat(margin),
        };
        self.query(&aabb, out);
    }
}
