//! Quadratic tangential friction penalty.
//!
//! Per active contact, a spring on the tangential displacement since
//! the step began. The stiffness tracks the current normal force:
//! `k_f = μ·|f_n|/ε²`, capped so extreme normal forces cannot blow up
//! the system conditioning.

use weft_contact::ContactPair;
use weft_math::{sparse::TripletBuffer, Mat3, Vec3};
use weft_types::Scalar;

/// Hard cap on the friction stiffness.
const MAX_STIFFNESS: Scalar = 1e8;

/// Friction stiffness from the current normal force magnitude.
pub fn friction_stiffness(normal_force: Scalar, mu: Scalar, epsilon: Scalar) -> Scalar {
    let eps_sq = (epsilon * epsilon).max(1e-300);
    (mu * normal_force.abs() / eps_sq).min(MAX_STIFFNESS)
}

/// Tangential component of a displacement.
#[inline]
pub fn tangential(displacement: Vec3, normal: Vec3) -> Vec3 {
    displacement - normal * displacement.dot(normal)
}

/// Accumulates the friction gradient for one contact: each
/// participating vertex is penalized for its own tangential motion,
/// weighted by its selector weight squared.
pub fn accumulate_gradient(
    contact: &ContactPair,
    k_f: Scalar,
    x: &[Scalar],
    x_origin: &[Scalar],
    grad: &mut [Scalar],
) {
    if k_f <= 0.0 {
        return;
    }
    for (idx, w) in contact.used_slots() {
        let delta = Vec3::new(
            x[3 * idx] - x_origin[3 * idx],
            x[3 * idx + 1] - x_origin[3 * idx + 1],
            x[3 * idx + 2] - x_origin[3 * idx + 2],
        );
        let f = tangential(delta, contact.normal) * (k_f * w * w);
        grad[3 * idx] += f.x;
        grad[3 * idx + 1] += f.y;
        grad[3 * idx + 2] += f.z;
    }
}

/// Accumulates the friction Hessian: the tangent-space projector
/// `k_f·(I − nnᵀ)` per participating vertex, plus a small ridge so
/// the block stays strictly positive definite.
pub fn accumulate_hessian(contact: &ContactPair, k_f: Scalar, triplets: &mut TripletBuffer) {
    if k_f <= 0.0 {
        return;
    }
    let n = contact.normal;
    let projector = Mat3::IDENTITY - Mat3::from_cols(n.x * n, n.y * n, n.z * n);
    for (idx, w) in contact.used_slots() {
        let block = projector * (k_f * w * w) + Mat3::IDENTITY * 1e-8;
        triplets.push_block3(idx, idx, &block, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stiffness_scales_with_normal_force_and_caps() {
        let k1 = friction_stiffness(1.0, 0.5, 1e-3);
        let k2 = friction_stiffness(2.0, 0.5, 1e-3);
        assert!((k2 - 2.0 * k1).abs() < 1e-9);
        assert_eq!(friction_stiffness(1e12, 0.5, 1e-5), MAX_STIFFNESS);
    }

    #[test]
    fn tangential_removes_normal_component() {
        let t = tangential(Vec3::new(1.0, 2.0, 3.0), Vec3::Z);
        assert_eq!(t, Vec3::new(1.0, 2.0, 0.0));
    }
}
