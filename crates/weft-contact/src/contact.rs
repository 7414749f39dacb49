//! Contact pair data types.
//!
//! A [`ContactPair`] is one separating constraint between two
//! primitives, produced by the detection pass with a strictly
//! positive gap. It carries everything the barrier kernel needs:
//! indices, gap, unit normal, witness points, and the weights that
//! distribute the gap gradient over the participating vertices.

use serde::{Deserialize, Serialize};
use weft_math::Vec3;
use weft_types::Scalar;

/// Type of contact between two primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactKind {
    /// Vertex against a triangle.
    PointTriangle,
    /// Edge against edge.
    EdgeEdge,
    /// Vertex against a half-space wall.
    PointWall,
}

/// A detected contact between two primitives.
///
/// Index interpretation:
/// - `PointTriangle`: `[vertex, tri_v0, tri_v1, tri_v2]`
/// - `EdgeEdge`: `[edge_a_v0, edge_a_v1, edge_b_v0, edge_b_v1]`
/// - `PointWall`: `[vertex, -1, -1, -1]`
///
/// Unused slots hold `-1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactPair {
    /// Contact type.
    pub kind: ContactKind,

    /// Participating vertex indices (−1 for unused slots).
    pub indices: [i32; 4],

    /// Separation distance (strictly positive for emitted pairs).
    pub gap: Scalar,

    /// Unit contact normal, pointing from the witness point on
    /// primitive B toward the witness point on primitive A.
    pub normal: Vec3,

    /// Witness point on primitive A (the vertex / first edge).
    pub witness_p: Vec3,

    /// Witness point on primitive B (triangle / second edge / wall).
    pub witness_q: Vec3,

    /// Gap-gradient distribution weights, aligned with `indices`:
    /// `(+1, −u, −v, −w)` for point-triangle (clamped barycentrics of
    /// the witness point), `(+½, +½, −½, −½)` for edge-edge, `(+1)`
    /// for point-wall.
    pub weights: [Scalar; 4],

    /// Whether this constraint participates in the solve.
    pub active: bool,
}

impl ContactPair {
    /// Number of participating vertices for this contact kind.
    pub fn vertex_count(&self) -> usize {
        match self.kind {
            ContactKind::PointTriangle | ContactKind::EdgeEdge => 4,
            ContactKind::PointWall => 1,
        }
    }

    /// Iterates the used (index, weight) slots.
    pub fn used_slots(&self) -> impl Iterator<Item = (usize, Scalar)> + '_ {
        self.indices
            .iter()
            .zip(self.weights.iter())
            .take(self.vertex_count())
            .filter(|(&idx, _)| idx >= 0)
            .map(|(&idx, &w)| (idx as usize, w))
    }
}

/// A half-space wall: the feasible region is `n·x − offset ≥ 0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WallPlane {
    /// Unit outward normal of the feasible half-space.
    pub normal: Vec3,
    /// Plane offset along the normal.
    pub offset: Scalar,
}

impl WallPlane {
    /// Signed gap of a point to the wall.
    #[inline]
    pub fn gap(&self, p: Vec3) -> Scalar {
        self.normal.dot(p) - self.offset
    }
}
