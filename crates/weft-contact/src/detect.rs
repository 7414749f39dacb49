//! Per-step collision detection pipeline.
//!
//! Runs broad + narrow phase over the current positions and produces
//! every separating [`ContactPair`] whose gap lies inside the barrier
//! activation distance. Pairs at non-positive (or numerically zero)
//! gap are never emitted: they land in the penetration report and the
//! caller decides whether that is recoverable (skip the pair) or fatal
//! (the step's input state was already penetrating).

use tracing::debug;
use weft_math::Vec3;
use weft_mesh::{Topology, TriangleMesh};
use weft_types::Scalar;

use crate::broad::{Aabb, SpatialHash};
use crate::contact::{ContactKind, ContactPair, WallPlane};
use crate::narrow::{closest_edge_edge, closest_point_triangle};

/// Gaps at or below zero count as penetrating; any strictly positive
/// separation, however small, is emitted (the stiffness clamp bounds
/// the takeover term, and skipping near-zero pairs would leave a
/// crashed vertex with no restoring force at all).
const PENETRATION_EPSILON: Scalar = 0.0;

/// A primitive pair found at a non-positive gap.
#[derive(Debug, Clone)]
pub struct Penetration {
    pub kind: ContactKind,
    pub indices: [i32; 4],
    /// Gap at detection time (≤ the penetration epsilon).
    pub gap: Scalar,
}

/// Everything one detection pass produced.
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    /// Separating pairs with strictly positive gap, ready for the
    /// barrier kernel.
    pub contacts: Vec<ContactPair>,
    /// Pairs found at (numerically) zero or negative gap.
    pub penetrations: Vec<Penetration>,
}

impl DetectionReport {
    /// True when no primitive pair was found penetrating.
    pub fn is_clean(&self) -> bool {
        self.penetrations.is_empty()
    }
}

/// Runs collision detection on the given positions.
///
/// `contact_gap` is the activation distance ḡ for self contacts,
/// `wall_gap` the activation distance for wall proximity.
pub fn detect_contacts(
    mesh: &TriangleMesh,
    topo: &Topology,
    px: &[Scalar],
    py: &[Scalar],
    pz: &[Scalar],
    walls: &[WallPlane],
    contact_gap: Scalar,
    wall_gap: Scalar,
) -> DetectionReport {
    let mut report = DetectionReport::default();
    let pos = |i: usize| Vec3::new(px[i], py[i], pz[i]);

    detect_point_triangle(mesh, &pos, contact_gap, &mut report);
    detect_edge_edge(mesh, topo, &pos, contact_gap, &mut report);
    detect_walls(mesh, &pos, walls, wall_gap, &mut report);

    if !report.penetrations.is_empty() {
        debug!(
            penetrations = report.penetrations.len(),
            contacts = report.contacts.len(),
            "detection found penetrating pairs"
        );
    }
    report
}

fn detect_point_triangle(
    mesh: &TriangleMesh,
    pos: &impl Fn(usize) -> Vec3,
    contact_gap: Scalar,
    report: &mut DetectionReport,
) {
    let tri_count = mesh.triangle_count();
    if tri_count == 0 {
        return;
    }

    // Bin triangles by their inflated boxes; cell size tracks the
    // activation distance with a floor against zero-gap configs.
    let mut hash = SpatialHash::new((contact_gap * 4.0).max(1e-6));
    for t in 0..tri_count {
        let [a, b, c] = mesh.triangle(t);
        let aabb = Aabb::from_points(&[pos(a), pos(b), pos(c)], contact_gap);
        hash.insert(t as u32, &aabb);
    }

    let mut candidates = Vec::new();
    for v in 0..mesh.vertex_count() {
        let p = pos(v);
        hash.query_point(p, contact_gap, &mut candidates);
        for &t in &candidates {
            let tri = mesh.triangle(t as usize);
            if tri.contains(&v) {
                continue;
            }
            let [a, b, c] = tri;
            let hit = closest_point_triangle(p, pos(a), pos(b), pos(c));
            if hit.distance >= contact_gap {
                continue;
            }
            let indices = [v as i32, a as i32, b as i32, c as i32];
            if hit.distance <= PENETRATION_EPSILON {
                report.penetrations.push(Penetration {
                    kind: ContactKind::PointTriangle,
                    indices,
                    gap: hit.distance,
                });
                continue;
            }
            let [u, vb, w] = hit.barycentric;
            report.contacts.push(ContactPair {
                kind: ContactKind::PointTriangle,
                indices,
                gap: hit.distance,
                normal: hit.normal,
                witness_p: p,
                witness_q: hit.witness,
                weights: [1.0, -u, -vb, -w],
                active: true,
            });
        }
    }
}

fn detect_edge_edge(
    mesh: &TriangleMesh,
    topo: &Topology,
    pos: &impl Fn(usize) -> Vec3,
    contact_gap: Scalar,
    report: &mut DetectionReport,
) {
    let edges = &topo.edges;
    if edges.len() < 2 {
        return;
    }

    let mut hash = SpatialHash::new((contact_gap * 4.0).max(1e-6));
    for (e, edge) in edges.iter().enumerate() {
        let aabb = Aabb::from_points(&[pos(edge.v0), pos(edge.v1)], contact_gap);
        hash.insert(e as u32, &aabb);
    }

    let mut candidates = Vec::new();
    for (e1, edge1) in edges.iter().enumerate() {
        let aabb = Aabb::from_points(&[pos(edge1.v0), pos(edge1.v1)], contact_gap);
        hash.query(&aabb, &mut candidates);
        for &e2 in &candidates {
            let e2 = e2 as usize;
            if e2 <= e1 {
                continue;
            }
            let edge2 = &edges[e2];
            if edge1.v0 == edge2.v0
                || edge1.v0 == edge2.v1
                || edge1.v1 == edge2.v0
                || edge1.v1 == edge2.v1
            {
                continue;
            }
            let hit = closest_edge_edge(pos(edge1.v0), pos(edge1.v1), pos(edge2.v0), pos(edge2.v1));
            if hit.distance >= contact_gap {
                continue;
            }
            let indices = [
                edge1.v0 as i32,
                edge1.v1 as i32,
                edge2.v0 as i32,
                edge2.v1 as i32,
            ];
            if hit.distance <= PENETRATION_EPSILON {
                report.penetrations.push(Penetration {
                    kind: ContactKind::EdgeEdge,
                    indices,
                    gap: hit.distance,
                });
                continue;
            }
            report.contacts.push(ContactPair {
                kind: ContactKind::EdgeEdge,
                indices,
                gap: hit.distance,
                normal: hit.normal,
                witness_p: hit.witness_p,
                witness_q: hit.witness_q,
                weights: [0.5, 0.5, -0.5, -0.5],
                active: true,
            });
        }
    }
}

fn detect_walls(
    mesh: &TriangleMesh,
    pos: &impl Fn(usize) -> Vec3,
    walls: &[WallPlane],
    wall_gap: Scalar,
    report: &mut DetectionReport,
) {
    for wall in walls {
        for v in 0..mesh.vertex_count() {
            let p = pos(v);
            let gap = wall.gap(p);
            if gap >= wall_gap {
                continue;
            }
            let indices = [v as i32, -1, -1, -1];
            if gap <= PENETRATION_EPSILON {
                report.penetrations.push(Penetration {
                    kind: ContactKind::PointWall,
                    indices,
                    gap,
                });
                continue;
            }
            report.contacts.push(ContactPair {
                kind: ContactKind::PointWall,
                indices,
                gap,
                normal: wall.normal,
                witness_p: p,
                witness_q: p - wall.normal * gap,
                weights: [1.0, 0.0, 0.0, 0.0],
                active: true,
            });
        }
    }
}
