//! Dynamic barrier stiffness.
//!
//! The per-constraint stiffness k inside the barrier is re-estimated
//! every Newton iteration from three contributions:
//!
//! - an inertial floor `m̄/Δt²` so the barrier can absorb one step's
//!   momentum,
//! - an elastic term `‖w‖·(n̂ᵀ H̃ n̂)⁺` read from the mass+elastic
//!   Hessian so stiff materials do not ring against a soft barrier,
//! - a takeover term `m̄/ĝ²` that dominates as the gap closes and
//!   keeps the repulsion monotone even when the Hessian is small.
//!
//! The Hessian blocks come from a one-sweep diagonal-block cache over
//! the compressed matrix, built before barrier assembly (the barrier
//! blocks themselves depend on these stiffnesses; the two-pass
//! assembly breaks that cycle).

use weft_contact::ContactPair;
use weft_math::{sparse::CsrMatrix, spd::quadratic_form_clamped, Mat3, Vec3};
use weft_types::Scalar;

/// Per-vertex 3×3 diagonal blocks of the mass+elastic Hessian,
/// extracted in a single sweep.
pub struct BlockDiagonal {
    blocks: Vec<Mat3>,
}

impl BlockDiagonal {
    /// Extracts all diagonal blocks of a 3N×3N matrix.
    pub fn build(h: &CsrMatrix) -> Self {
        let n = h.dim / 3;
        Self {
            blocks: (0..n).map(|v| h.block3(v)).collect(),
        }
    }

    /// The 3×3 diagonal block of vertex `v`.
    #[inline]
    pub fn block(&self, v: usize) -> &Mat3 {
        &self.blocks[v]
    }
}

/// Stiffness for a contact pair.
///
/// `g_max` is the barrier width for this pair; the takeover term is
/// suppressed once the gap leaves the barrier window.
pub fn contact_stiffness(
    contact: &ContactPair,
    masses: &[Scalar],
    dt: Scalar,
    gap: Scalar,
    g_max: Scalar,
    min_gap: Scalar,
    blocks: &BlockDiagonal,
) -> Scalar {
    let n = unit_or_up(contact.normal);

    // Weighted participating mass and the weighted elastic block
    // H̃ = Σ wᵢ² Bᵢᵢ over the constraint's selector weights.
    let mut mass_sum = 0.0;
    let mut weight_sum = 0.0;
    let mut weight_sq = 0.0;
    let mut h_tilde = Mat3::ZERO;
    for (idx, w) in contact.used_slots() {
        mass_sum += w.abs() * masses[idx];
        weight_sum += w.abs();
        weight_sq += w * w;
        h_tilde += *blocks.block(idx) * (w * w);
    }
    if weight_sum <= 0.0 {
        return 0.0;
    }
    let mean_mass = mass_sum / weight_sum;

    let k_inertial = if dt > 0.0 { mean_mass / (dt * dt) } else { 0.0 };
    let k_elastic = weight_sq.sqrt() * quadratic_form_clamped(&h_tilde, n);

    let k_takeover = if gap >= g_max {
        0.0
    } else {
        let g_hat = gap.max(min_gap).max(1e-12).min(g_max);
        mean_mass / (g_hat * g_hat)
    };

    k_inertial + k_elastic + k_takeover
}

/// Stiffness for a pin: the offset direction stands in for the
/// contact normal, and the takeover runs on the leash slack so the
/// pull stiffens as the vertex nears its leash boundary.
pub fn pin_stiffness(
    mass: Scalar,
    dt: Scalar,
    offset: Vec3,
    slack: Scalar,
    min_gap: Scalar,
    block: &Mat3,
) -> Scalar {
    let length = offset.length();
    let dir = if length > 1e-9 { offset / length } else { Vec3::X };

    let k_inertial = if dt > 0.0 { mass / (dt * dt) } else { 0.0 };
    let k_elastic = quadratic_form_clamped(block, dir);

    let g_hat = slack.max(min_gap).max(1e-12);
    let k_takeover = mass / (g_hat * g_hat);

    k_inertial + k_elastic + k_takeover
}

/// Stiffness for a wall constraint: the takeover runs on the
/// configured wall gap, which keeps k constant across the window and
/// sized so the wall can stop one step of momentum within it.
pub fn wall_stiffness(
    mass: Scalar,
    dt: Scalar,
    wall_gap: Scalar,
    normal: Vec3,
    min_gap: Scalar,
    block: &Mat3,
) -> Scalar {
    let n = unit_or_up(normal);
    let k_inertial = if dt > 0.0 { mass / (dt * dt) } else { 0.0 };
    let g_hat = wall_gap.max(min_gap).max(1e-12);
    k_inertial + mass / (g_hat * g_hat) + quadratic_form_clamped(block, n)
}

fn unit_or_up(n: Vec3) -> Vec3 {
    let len = n.length();
    if len > 1e-9 {
        n / len
    } else {
        Vec3::Z
    }
}
