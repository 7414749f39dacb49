//! Strain limiting through the barrier.
//!
//! Instead of a hard projection, stretching is limited by running the
//! same barrier potential on a per-face "strain gap": with σ_max the
//! largest in-plane singular value of the 3×2 deformation gradient,
//! the gap is `g = (1 + τ + ε) − σ_max` and the barrier width is ε.
//! The barrier turns on once a face stretches past `1 + τ` and
//! diverges at `1 + τ + ε`, so stretch is capped smoothly.
//!
//! Constraints are rebuilt every step; their stiffness combines the
//! face's inertial scale with the elastic energy along the face's
//! relative-direction vector.

use weft_math::decomposition::{svd_3x2, Mat3x2};
use weft_math::{sparse::TripletBuffer, Mat3, Vec3};
use weft_mesh::TriangleMesh;
use weft_types::Scalar;

use crate::barrier;
use crate::config::SimParams;
use crate::stiffness::BlockDiagonal;

/// Singular values this close together are treated as repeated and
/// get an averaged direction pair.
const SMALL_SINGULAR_DIFF: Scalar = 1e-6;

/// One per-face stretch constraint, rebuilt per step.
#[derive(Debug, Clone, Copy)]
pub struct StrainConstraint {
    pub face: usize,
    pub max_sigma: Scalar,
    pub stiffness: Scalar,
    pub active: bool,
}

/// Effective (τ, ε) pair: τ falls back to the configured stretch
/// limit, ε defaults to τ, and percentage-style inputs are read as
/// percents.
pub fn effective_limits(params: &SimParams) -> (Scalar, Scalar) {
    let tau = to_fraction(if params.strain_tau > 0.0 {
        params.strain_tau
    } else {
        params.strain_limit
    });
    let eps = if params.strain_epsilon > 0.0 {
        to_fraction(params.strain_epsilon)
    } else {
        tau
    };
    (tau, eps)
}

fn to_fraction(value: Scalar) -> Scalar {
    if value > 1.0 {
        value * 0.01
    } else {
        value
    }
}

/// 3×2 deformation gradient of face `t` at positions `x`.
fn deformation(mesh: &TriangleMesh, x: &[Scalar], t: usize) -> Mat3x2 {
    let [a, b, c] = mesh.triangle(t);
    let p = |i: usize| Vec3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2]);
    let ds = Mat3x2::from_cols(p(b) - p(a), p(c) - p(a));
    ds.mul_mat2(&mesh.dm_inv_mat(t))
}

/// Rebuilds the strain-constraint list for the current positions.
///
/// Faces stretched into the barrier window get a constraint whose
/// stiffness is `face_mass/ĝ²` plus the elastic quadratic form along
/// the face's relative-direction vector, read from the cached
/// diagonal blocks of the mass+elastic Hessian.
pub fn rebuild_constraints(
    mesh: &TriangleMesh,
    x: &[Scalar],
    params: &SimParams,
    blocks: &BlockDiagonal,
) -> Vec<StrainConstraint> {
    if !params.enable_strain_limiting {
        return Vec::new();
    }
    let (tau, eps) = effective_limits(params);
    if eps <= 0.0 {
        return Vec::new();
    }
    let min_gap = params.min_gap.max(1e-8);

    let mut constraints = Vec::new();
    for face in 0..mesh.triangle_count() {
        let f = deformation(mesh, x, face);
        if !f.is_finite() {
            continue;
        }
        let svd = svd_3x2(&f);
        let sigma_max = svd.sigma[0];
        let gap = (1.0 + tau + eps) - sigma_max;
        if !barrier::in_domain(gap, eps) || gap <= 0.0 {
            continue;
        }

        let face_mass =
            mesh.rest_area[face] * mesh.material.thickness * mesh.material.density;

        // Elastic term: the quadratic form of the cached diagonal
        // blocks along each vertex's offset from the face centroid.
        let [ia, ib, ic] = mesh.triangle(face);
        let p = |i: usize| Vec3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2]);
        let centroid = (p(ia) + p(ib) + p(ic)) / 3.0;
        let mut elastic = 0.0;
        for idx in [ia, ib, ic] {
            let w = p(idx) - centroid;
            elastic += w.dot(*blocks.block(idx) * w);
        }
        let elastic = elastic.max(0.0);

        let g_clamped = gap.abs().max(min_gap);
        let stiffness = face_mass / (g_clamped * g_clamped) + elastic;

        constraints.push(StrainConstraint {
            face,
            max_sigma: sigma_max,
            stiffness,
            active: true,
        });
    }
    constraints
}

/// Per-vertex gradient of σ_max for one face: chains `∂σ/∂F = u·vᵀ`
/// through the rest shape matrix. Returns `None` on degenerate faces.
fn sigma_gradient(
    mesh: &TriangleMesh,
    x: &[Scalar],
    face: usize,
    target_sigma: Scalar,
) -> Option<(Scalar, [Vec3; 3])> {
    let f = deformation(mesh, x, face);
    if !f.is_finite() {
        return None;
    }
    let svd = svd_3x2(&f);

    // Pick the singular pair matching the constraint's σ.
    let idx = if (svd.sigma[1] - target_sigma).abs() < (svd.sigma[0] - target_sigma).abs() {
        1
    } else {
        0
    };

    // ∂σ/∂F as a 3×2, with the repeated-σ average fallback.
    let dsigma_df = if (svd.sigma[0] - svd.sigma[1]).abs() < SMALL_SINGULAR_DIFF {
        Mat3x2 {
            col0: (svd.u[0] * svd.v[0].x + svd.u[1] * svd.v[1].x) * 0.5,
            col1: (svd.u[0] * svd.v[0].y + svd.u[1] * svd.v[1].y) * 0.5,
        }
    } else {
        Mat3x2 {
            col0: svd.u[idx] * svd.v[idx].x,
            col1: svd.u[idx] * svd.v[idx].y,
        }
    };

    // Map through Dm⁻ᵀ to per-vertex directions.
    let dm_inv = mesh.dm_inv_mat(face);
    let mapped = dsigma_df.mul_mat2(&dm_inv.transpose());
    let d1 = mapped.col0;
    let d2 = mapped.col1;
    let d0 = -(d1 + d2);

    Some((svd.sigma[idx], [d0, d1, d2]))
}

/// Accumulates strain-limit barrier gradients.
pub fn accumulate_gradient(
    mesh: &TriangleMesh,
    x: &[Scalar],
    constraints: &[StrainConstraint],
    params: &SimParams,
    grad: &mut [Scalar],
) {
    if constraints.is_empty() {
        return;
    }
    let (tau, eps) = effective_limits(params);

    for constraint in constraints.iter().filter(|c| c.active) {
        let Some((sigma, dirs)) = sigma_gradient(mesh, x, constraint.face, constraint.max_sigma)
        else {
            continue;
        };
        let gap = (1.0 + tau + eps) - sigma;
        if !barrier::in_domain(gap, eps) || gap <= 0.0 {
            continue;
        }
        let dv = barrier::gradient(gap, eps, constraint.stiffness);
        if dv.abs() < 1e-300 {
            continue;
        }

        // ∂V/∂x = V'(g)·∂g/∂x = −V'(g)·∂σ/∂x.
        let tri = mesh.triangle(constraint.face);
        for (slot, &idx) in tri.iter().enumerate() {
            let f = dirs[slot] * (-dv);
            grad[3 * idx] += f.x;
            grad[3 * idx + 1] += f.y;
            grad[3 * idx + 2] += f.z;
        }
    }
}

/// Accumulates the rank-one Gauss-Newton strain-limit Hessian.
pub fn accumulate_hessian(
    mesh: &TriangleMesh,
    x: &[Scalar],
    constraints: &[StrainConstraint],
    params: &SimParams,
    triplets: &mut TripletBuffer,
) {
    if constraints.is_empty() {
        return;
    }
    let (tau, eps) = effective_limits(params);

    for constraint in constraints.iter().filter(|c| c.active) {
        let Some((sigma, dirs)) = sigma_gradient(mesh, x, constraint.face, constraint.max_sigma)
        else {
            continue;
        };
        let gap = (1.0 + tau + eps) - sigma;
        if !barrier::in_domain(gap, eps) || gap <= 0.0 {
            continue;
        }
        let d2v = barrier::hessian(gap, eps, constraint.stiffness);
        if d2v.abs() < 1e-300 {
            continue;
        }

        let tri = mesh.triangle(constraint.face);
        for i in 0..3 {
            for j in 0..3 {
                let block = outer(dirs[i] * d2v, dirs[j]);
                triplets.push_block3(tri[i], tri[j], &block, 1e-14);
            }
        }
    }
}

#[inline]
fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(b.x * a, b.y * a, b.z * a)
}
