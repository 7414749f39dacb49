//! Feasibility-preserving line search.
//!
//! Given the current iterate and a Newton direction (scaled by the
//! extension factor η), finds the largest α ∈ (0, 1] such that every
//! active constraint's gap at `x + α·η·d` stays strictly positive,
//! with a safety margin: only 90% of any current gap may be consumed
//! in one sub-step.
//!
//! Per constraint type the predicate is closed-form where the gap is
//! linear (walls), a radial bound for pins, and conservative CCD on
//! the actual trajectories for contact pairs (or discrete backtracking
//! on the end-state distance when CCD is disabled). Wall contact
//! pairs need no separate treatment: the wall loop already bounds
//! every vertex against every active plane exactly.

use weft_contact::narrow::{closest_edge_edge, closest_point_triangle};
use weft_contact::{ccd, ContactKind, ContactPair};
use weft_math::Vec3;
use weft_types::{constants::ALPHA_FLOOR, Scalar};

use crate::config::SimParams;
use crate::constraints::Constraints;

/// Fraction of the current gap a single sub-step may consume.
const SAFETY: Scalar = 0.9;

/// Largest feasible step fraction along `extension·d` from `x`.
///
/// Returns 0.0 when no step above the admissibility floor exists.
pub fn feasible_alpha(
    x: &[Scalar],
    direction: &[Scalar],
    contacts: &[ContactPair],
    constraints: &Constraints,
    params: &SimParams,
) -> Scalar {
    let eta = params.extension;
    let point = |v: &[Scalar], i: usize| Vec3::new(v[3 * i], v[3 * i + 1], v[3 * i + 2]);
    let end = |i: usize| point(x, i) + point(direction, i) * eta;

    let mut alpha: Scalar = 1.0;

    // Walls: the gap is linear in α, so the bound is closed-form.
    for wall in constraints.active_walls() {
        for i in 0..x.len() / 3 {
            let g0 = wall.normal.dot(point(x, i)) - wall.offset;
            let rate = wall.normal.dot(point(direction, i)) * eta;
            if rate < 0.0 {
                // α at which 90% of the gap is consumed.
                let limit = SAFETY * g0 / -rate;
                alpha = alpha.min(limit.max(0.0));
            }
        }
    }

    // Pins: the vertex must stay inside its leash ball, so the step
    // may consume at most 90% of the remaining slack. The bound uses
    // the step length, which over-estimates the radial growth and is
    // therefore conservative.
    for pin in constraints.active_pins() {
        let p0 = point(x, pin.vertex);
        let step = point(direction, pin.vertex) * eta;
        let step_len = step.length();
        if step_len < 1e-300 {
            continue;
        }
        let radius = pin.gap.unwrap_or(params.contact_gap_max);
        let slack = radius - (p0 - pin.target).length();
        if slack > 0.0 {
            alpha = alpha.min((SAFETY * slack / step_len).max(0.0));
        }
    }

    // Self-contact pairs: bound by the time of impact on the real
    // trajectories, with the margin set from the *current* distance.
    for contact in contacts.iter().filter(|c| c.active) {
        let bound = match contact.kind {
            ContactKind::PointWall => continue,
            ContactKind::PointTriangle => {
                let [p, a, b, c] = used_indices(contact);
                let current =
                    closest_point_triangle(point(x, p), point(x, a), point(x, b), point(x, c))
                        .distance;
                let margin = (1.0 - SAFETY) * current;
                if params.enable_ccd {
                    ccd::toi_point_triangle(
                        point(x, p),
                        end(p),
                        point(x, a),
                        end(a),
                        point(x, b),
                        end(b),
                        point(x, c),
                        end(c),
                        margin,
                    )
                } else {
                    backtrack(margin, |t| {
                        closest_point_triangle(
                            point(x, p).lerp(end(p), t),
                            point(x, a).lerp(end(a), t),
                            point(x, b).lerp(end(b), t),
                            point(x, c).lerp(end(c), t),
                        )
                        .distance
                    })
                }
            }
            ContactKind::EdgeEdge => {
                let [p0, p1, q0, q1] = used_indices(contact);
                let current =
                    closest_edge_edge(point(x, p0), point(x, p1), point(x, q0), point(x, q1))
                        .distance;
                let margin = (1.0 - SAFETY) * current;
                if params.enable_ccd {
                    ccd::toi_edge_edge(
                        point(x, p0),
                        end(p0),
                        point(x, p1),
                        end(p1),
                        point(x, q0),
                        end(q0),
                        point(x, q1),
                        end(q1),
                        margin,
                    )
                } else {
                    backtrack(margin, |t| {
                        closest_edge_edge(
                            point(x, p0).lerp(end(p0), t),
                            point(x, p1).lerp(end(p1), t),
                            point(x, q0).lerp(end(q0), t),
                            point(x, q1).lerp(end(q1), t),
                        )
                        .distance
                    })
                }
            }
        };
        alpha = alpha.min(bound);
    }

    let alpha = alpha.clamp(0.0, 1.0);
    if alpha < ALPHA_FLOOR {
        0.0
    } else {
        alpha
    }
}

fn used_indices(contact: &ContactPair) -> [usize; 4] {
    [
        contact.indices[0].max(0) as usize,
        contact.indices[1].max(0) as usize,
        contact.indices[2].max(0) as usize,
        contact.indices[3].max(0) as usize,
    ]
}

/// Discrete fallback: halve α until the end-state distance clears the
/// margin.
fn backtrack(margin: Scalar, distance_at: impl Fn(Scalar) -> Scalar) -> Scalar {
    let mut alpha: Scalar = 1.0;
    for _ in 0..24 {
        if distance_at(alpha) > margin {
            return alpha;
        }
        alpha *= 0.5;
        if alpha < ALPHA_FLOOR {
            return 0.0;
        }
    }
    alpha
}
