//! Conservative continuous collision detection.
//!
//! Given the linear trajectories of a primitive pair over one
//! candidate step, these routines return a strict lower bound on the
//! time of impact in [0, 1]: sample the distance function along the
//! trajectory, then bisect between the last safe and first unsafe
//! sample. A return value of 1.0 means the whole step stays clear of
//! the margin.

use weft_math::Vec3;
use weft_types::Scalar;

use crate::narrow::{closest_edge_edge, closest_point_triangle};

/// Trajectory samples taken along the step.
const SAMPLES: usize = 16;
/// Bisection refinements after the first unsafe sample.
const BISECTIONS: usize = 12;

#[inline]
fn lerp(a: Vec3, b: Vec3, t: Scalar) -> Vec3 {
    a + (b - a) * t
}

/// Lower bound on the time of impact of a moving point against a
/// moving triangle. `margin` is the distance below which the pair
/// counts as colliding.
#[allow(clippy::too_many_arguments)]
pub fn toi_point_triangle(
    p0: Vec3,
    p1: Vec3,
    a0: Vec3,
    a1: Vec3,
    b0: Vec3,
    b1: Vec3,
    c0: Vec3,
    c1: Vec3,
    margin: Scalar,
) -> Scalar {
    let distance_at = |t: Scalar| {
        closest_point_triangle(
            lerp(p0, p1, t),
            lerp(a0, a1, t),
            lerp(b0, b1, t),
            lerp(c0, c1, t),
        )
        .distance
    };
    bounded_toi(distance_at, margin)
}

/// Lower bound on the time of impact of two moving edges.
#[allow(clippy::too_many_arguments)]
pub fn toi_edge_edge(
    p0_start: Vec3,
    p0_end: Vec3,
    p1_start: Vec3,
    p1_end: Vec3,
    q0_start: Vec3,
    q0_end: Vec3,
    q1_start: Vec3,
    q1_end: Vec3,
    margin: Scalar,
) -> Scalar {
    let distance_at = |t: Scalar| {
        closest_edge_edge(
            lerp(p0_start, p0_end, t),
            lerp(p1_start, p1_end, t),
            lerp(q0_start, q0_end, t),
            lerp(q1_start, q1_end, t),
        )
        .distance
    };
    bounded_toi(distance_at, margin)
}

/// Shared sampling + bisection driver over a distance function.
fn bounded_toi(distance_at: impl Fn(Scalar) -> Scalar, margin: Scalar) -> Scalar {
    let mut last_safe = 0.0;
    let mut first_unsafe = None;

    for i in 1..=SAMPLES {
        let t = i as Scalar / SAMPLES as Scalar;
        if distance_at(t) <= margin {
            first_unsafe = Some(t);
            break;
        }
        last_safe = t;
    }

    let Some(mut hi) = first_unsafe else {
        return 1.0;
    };

    // Tighten the bracket; `last_safe` stays a certified-safe time.
    let mut lo = last_safe;
    for _ in 0..BISECTIONS {
        let mid = 0.5 * (lo + hi);
        if distance_at(mid) <= margin {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    lo
}
