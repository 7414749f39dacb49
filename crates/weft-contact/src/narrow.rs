//! Narrow-phase proximity queries.
//!
//! Closest point on a triangle (Voronoi-region walk) and closest
//! points between two segments. Both return witness points and a
//! normal oriented from the second primitive toward the first.

use weft_math::Vec3;
use weft_types::Scalar;

/// Result of a point-triangle proximity query.
#[derive(Debug, Clone, Copy)]
pub struct PointTriangleResult {
    pub distance: Scalar,
    /// Unit vector from the closest point on the triangle toward `p`.
    pub normal: Vec3,
    /// Closest point on the triangle.
    pub witness: Vec3,
    /// Barycentric coordinates (u, v, w) of the witness point,
    /// clamped to the simplex.
    pub barycentric: [Scalar; 3],
}

/// Closest point on triangle (a, b, c) to point `p`.
///
/// Walks the Voronoi regions of the triangle (vertices, edges, face)
/// and returns the closest feature. When the witness lies in the face
/// interior the normal is the oriented face normal; on edges and
/// vertices it is the radial direction.
pub fn closest_point_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> PointTriangleResult {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return radial_result(p, a, [1.0, 0.0, 0.0]);
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return radial_result(p, b, [0.0, 1.0, 0.0]);
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return radial_result(p, c, [0.0, 0.0, 1.0]);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return radial_result(p, a + ab * v, [1.0 - v, v, 0.0]);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return radial_result(p, a + ac * w, [1.0 - w, 0.0, w]);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return radial_result(p, b + (c - b) * w, [0.0, 1.0 - w, w]);
    }

    // Face interior.
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    let witness = a + ab * v + ac * w;
    let diff = p - witness;
    let distance = diff.length();

    let mut normal = ab.cross(ac);
    let area2 = normal.length();
    if area2 > 1e-12 {
        normal /= area2;
        if normal.dot(diff) < 0.0 {
            normal = -normal;
        }
    } else if distance > 1e-12 {
        normal = diff / distance;
    } else {
        normal = Vec3::Z;
    }

    PointTriangleResult {
        distance,
        normal,
        witness,
        barycentric: [1.0 - v - w, v, w],
    }
}

fn radial_result(p: Vec3, witness: Vec3, barycentric: [Scalar; 3]) -> PointTriangleResult {
    let diff = p - witness;
    let distance = diff.length();
    let normal = if distance > 1e-12 {
        diff / distance
    } else {
        Vec3::Z
    };
    PointTriangleResult {
        distance,
        normal,
        witness,
        barycentric,
    }
}

/// Result of a segment-segment proximity query.
#[derive(Debug, Clone, Copy)]
pub struct EdgeEdgeResult {
    pub distance: Scalar,
    /// Unit vector from the closest point on (q0, q1) toward the
    /// closest point on (p0, p1).
    pub normal: Vec3,
    /// Closest point on the first segment.
    pub witness_p: Vec3,
    /// Closest point on the second segment.
    pub witness_q: Vec3,
    /// Parameters of the witness points along each segment.
    pub s: Scalar,
    pub t: Scalar,
}

/// Closest points between segments (p0, p1) and (q0, q1).
pub fn closest_edge_edge(p0: Vec3, p1: Vec3, q0: Vec3, q1: Vec3) -> EdgeEdgeResult {
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let r = p0 - q0;

    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    let epsilon = 1e-12;
    let (mut s, mut t);

    if a <= epsilon && e <= epsilon {
        s = 0.0;
        t = 0.0;
    } else if a <= epsilon {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(r);
        if e <= epsilon {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            s = if denom.abs() > epsilon {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                // Parallel segments: pick the start of the first.
                0.0
            };
            t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
        }
    }

    let witness_p = p0 + d1 * s;
    let witness_q = q0 + d2 * t;
    let diff = witness_p - witness_q;
    let distance = diff.length();
    let normal = if distance > 1e-12 {
        diff / distance
    } else {
        // Touching segments: fall back to a perpendicular of the first.
        let axis = if d1.length_squared() > epsilon { d1 } else { Vec3::X };
        let perp = axis.cross(Vec3::Z);
        if perp.length_squared() > epsilon {
            perp.normalize()
        } else {
            Vec3::Y
        }
    };

    EdgeEdgeResult {
        distance,
        normal,
        witness_p,
        witness_q,
        s,
        t,
    }
}
