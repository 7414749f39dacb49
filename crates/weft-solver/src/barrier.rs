//! Cubic barrier kernel.
//!
//! The scalar potential over a constraint gap g with outer width ḡ
//! and stiffness k:
//!
//! ```text
//! V(g) = −(k/2) · (g − ḡ)² · ln(g/ḡ)      for 0 < g < ḡ
//! V(g) = 0                                 for g ≥ ḡ
//! ```
//!
//! V, V′, and V″ all vanish as g → ḡ⁻, so the energy is C² across the
//! activation boundary, and V diverges as g → 0⁺ so the repulsion is
//! unbounded approaching contact. The line search keeps every
//! committed iterate at g > 0; the logarithm argument is still
//! guarded to survive trial evaluations during construction.
//!
//! Chain-ruled accumulation for the constraint flavors lives here
//! too. All routines *add into* caller-supplied buffers.

use weft_math::{Mat3, Vec3};
use weft_types::{constants::GAP_GUARD, Scalar};

use weft_contact::ContactPair;

/// Barrier energy V(g).
pub fn energy(g: Scalar, g_max: Scalar, k: Scalar) -> Scalar {
    if g_max <= 0.0 || g >= g_max {
        return 0.0;
    }
    let g = g.max(GAP_GUARD);
    let d = g - g_max;
    -0.5 * k * d * d * (g / g_max).ln()
}

/// First derivative V′(g).
pub fn gradient(g: Scalar, g_max: Scalar, k: Scalar) -> Scalar {
    if g_max <= 0.0 || g >= g_max {
        return 0.0;
    }
    let g = g.max(GAP_GUARD);
    let d = g - g_max;
    -k * (d * (g / g_max).ln() + 0.5 * d * d / g)
}

/// Second derivative V″(g).
pub fn hessian(g: Scalar, g_max: Scalar, k: Scalar) -> Scalar {
    if g_max <= 0.0 || g >= g_max {
        return 0.0;
    }
    let g = g.max(GAP_GUARD);
    let d = g - g_max;
    -k * ((g / g_max).ln() + 2.0 * d / g - 0.5 * d * d / (g * g))
}

/// True when a gap lies inside the active barrier window.
pub fn in_domain(g: Scalar, g_max: Scalar) -> bool {
    g_max > 0.0 && g < g_max
}

/// Linearized current gap of a contact: the detection-time gap plus
/// the normal-projected displacement of the participating vertices
/// since the step began. Matches the constant-normal approximation
/// used for the gap derivatives.
pub fn linearized_gap(contact: &ContactPair, x: &[Scalar], x_origin: &[Scalar]) -> Scalar {
    let mut g = contact.gap;
    for (idx, w) in contact.used_slots() {
        let delta = Vec3::new(
            x[3 * idx] - x_origin[3 * idx],
            x[3 * idx + 1] - x_origin[3 * idx + 1],
            x[3 * idx + 2] - x_origin[3 * idx + 2],
        );
        g += w * contact.normal.dot(delta);
    }
    g
}

/// Accumulates the barrier gradient of one contact into `grad`.
///
/// The gap gradient w.r.t. vertex i is `wᵢ·n`, so the contribution is
/// `V′(g)·wᵢ·n` per participating vertex.
pub fn accumulate_contact_gradient(
    contact: &ContactPair,
    g: Scalar,
    g_max: Scalar,
    k: Scalar,
    grad: &mut [Scalar],
) {
    if !in_domain(g, g_max) {
        return;
    }
    let dv = gradient(g, g_max, k);
    if dv == 0.0 {
        return;
    }
    for (idx, w) in contact.used_slots() {
        let f = contact.normal * (dv * w);
        grad[3 * idx] += f.x;
        grad[3 * idx + 1] += f.y;
        grad[3 * idx + 2] += f.z;
    }
}

/// Accumulates the barrier Hessian of one contact into `triplets`.
///
/// Constant-normal approximation: the position-space block reduces to
/// `V″(g)·(wᵢn)(wⱼn)ᵀ` for each vertex pair (i, j).
pub fn accumulate_contact_hessian(
    contact: &ContactPair,
    g: Scalar,
    g_max: Scalar,
    k: Scalar,
    tolerance: Scalar,
    triplets: &mut weft_math::sparse::TripletBuffer,
) {
    if !in_domain(g, g_max) {
        return;
    }
    let d2v = hessian(g, g_max, k);
    if d2v == 0.0 {
        return;
    }
    let n = contact.normal;
    let slots: Vec<(usize, Scalar)> = contact.used_slots().collect();
    for &(i, wi) in &slots {
        let gi = n * wi;
        for &(j, wj) in &slots {
            let gj = n * wj;
            let block = outer(gi * d2v, gj);
            triplets.push_block3(i, j, &block, tolerance);
        }
    }
}

/// Slack of a pin leash: the pin holds its vertex inside a ball of
/// `radius` around the target, and the barrier runs on the remaining
/// slack `g = radius − ‖x − target‖`. The barrier diverges as the
/// vertex approaches the leash boundary from inside, which is what
/// makes the pin attractive; a barrier on the raw distance would
/// point the other way.
pub fn pin_slack(position: Vec3, target: Vec3, radius: Scalar) -> Scalar {
    radius - (position - target).length()
}

/// Accumulates the pin barrier gradient. The slack gradient w.r.t.
/// the vertex is `−n` with `n` the unit radial direction.
pub fn accumulate_pin_gradient(
    vertex: usize,
    target: Vec3,
    radius: Scalar,
    x: &[Scalar],
    k: Scalar,
    grad: &mut [Scalar],
) {
    let p = Vec3::new(x[3 * vertex], x[3 * vertex + 1], x[3 * vertex + 2]);
    let diff = p - target;
    let dist = diff.length();
    if dist <= GAP_GUARD {
        return;
    }
    let slack = radius - dist;
    if !in_domain(slack, radius) || slack <= 0.0 {
        return;
    }
    let n = diff / dist;
    let dv = gradient(slack, radius, k);
    let f = n * (-dv);
    grad[3 * vertex] += f.x;
    grad[3 * vertex + 1] += f.y;
    grad[3 * vertex + 2] += f.z;
}

/// Accumulates the pin barrier Hessian: the radial part `V″·nnᵀ` plus
/// the distance-curvature term `−V′/d·(I − nnᵀ)` (positive in the
/// active window, where V′ < 0).
pub fn accumulate_pin_hessian(
    vertex: usize,
    target: Vec3,
    radius: Scalar,
    x: &[Scalar],
    k: Scalar,
    tolerance: Scalar,
    triplets: &mut weft_math::sparse::TripletBuffer,
) {
    let p = Vec3::new(x[3 * vertex], x[3 * vertex + 1], x[3 * vertex + 2]);
    let diff = p - target;
    let dist = diff.length();
    if dist <= GAP_GUARD {
        return;
    }
    let slack = radius - dist;
    if !in_domain(slack, radius) || slack <= 0.0 {
        return;
    }
    let n = diff / dist;
    let dv = gradient(slack, radius, k);
    let d2v = hessian(slack, radius, k);

    let nnt = outer(n, n);
    let block = nnt * d2v + (Mat3::IDENTITY - nnt) * (-dv / dist);
    triplets.push_block3(vertex, vertex, &block, tolerance);
}

#[inline]
fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(b.x * a, b.y * a, b.z * a)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GBAR: Scalar = 1e-3;
    const K: Scalar = 1e4;

    #[test]
    fn vanishes_at_and_beyond_the_outer_edge() {
        assert_eq!(energy(GBAR, GBAR, K), 0.0);
        assert_eq!(energy(2.0 * GBAR, GBAR, K), 0.0);
        assert_eq!(gradient(GBAR, GBAR, K), 0.0);
        assert_eq!(hessian(GBAR, GBAR, K), 0.0);
    }

    #[test]
    fn approaches_zero_smoothly_at_the_outer_edge() {
        let near = energy(GBAR - 1e-6 * GBAR, GBAR, K);
        let mid = energy(0.5 * GBAR, GBAR, K);
        assert!(near > 0.0 && mid > 0.0);
        assert!(near / mid < 1e-6, "ratio {}", near / mid);
        assert!(gradient(GBAR - 1e-9, GBAR, K).abs() < 1e-9 * K);
        assert!(hessian(GBAR - 1e-9, GBAR, K).abs() < 1e-3 * K);
    }

    #[test]
    fn diverges_toward_contact() {
        assert!(energy(1e-9, GBAR, K) > energy(1e-6, GBAR, K));
        assert!(gradient(1e-9, GBAR, K) < 0.0);
        assert!(hessian(1e-9, GBAR, K) > 0.0);
    }

    #[test]
    fn derivative_matches_central_difference() {
        let eps = 1e-5 * GBAR;
        for &g in &[0.2 * GBAR, 0.5 * GBAR, 0.8 * GBAR] {
            let numeric = (energy(g + eps, GBAR, K) - energy(g - eps, GBAR, K)) / (2.0 * eps);
            let analytic = gradient(g, GBAR, K);
            let rel = (analytic - numeric).abs() / analytic.abs().max(1e-12);
            assert!(rel < 2e-2, "g={g}: analytic {analytic} vs numeric {numeric}");

            let numeric2 = (gradient(g + eps, GBAR, K) - gradient(g - eps, GBAR, K)) / (2.0 * eps);
            let analytic2 = hessian(g, GBAR, K);
            let rel2 = (analytic2 - numeric2).abs() / analytic2.abs().max(1e-12);
            assert!(rel2 < 5e-2, "g={g}: V'' {analytic2} vs numeric {numeric2}");
        }
    }
}
