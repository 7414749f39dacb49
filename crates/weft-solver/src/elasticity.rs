//! Membrane elasticity.
//!
//! Per-face ARAP-style energy over the in-plane deformation gradient
//! `F = Ds·Dm⁻¹`, measured in the face's current orthonormal frame:
//!
//! ```text
//! Ψ = μ·a·h · ‖F − I‖²_F
//! ```
//!
//! with shear modulus μ, rest area a, thickness h. At the rest
//! configuration F = I, so both the energy and the gradient vanish
//! identically.
//!
//! The Hessian uses the constant Gauss-Newton form
//! `H_ab = 2μah·(gₐ·g_b)·I₃` over the rest shape gradients, which is
//! symmetric positive semi-definite by construction (a weighted graph
//! Laplacian), so no per-element eigen clamp is needed before
//! scattering.

use weft_math::{sparse::TripletBuffer, Mat2, Mat3, Vec2, Vec3};
use weft_mesh::TriangleMesh;
use weft_types::Scalar;

/// Current-frame in-plane deformation gradient of face `t`.
///
/// Builds the face's orthonormal frame from the deformed edges and
/// projects them into it, mirroring the rest-state construction so
/// F = I at rest.
pub fn face_deformation(mesh: &TriangleMesh, x: &[Scalar], t: usize) -> (Mat2, Vec3, Vec3) {
    let [a, b, c] = mesh.triangle(t);
    let p = |i: usize| Vec3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2]);
    let e1 = p(b) - p(a);
    let e2 = p(c) - p(a);

    let n = e1.cross(e2);
    let n_len = n.length().max(1e-12);
    let t1 = e1 / e1.length().max(1e-12);
    let t2 = (n / n_len).cross(t1);

    let ds = Mat2::from_cols(
        Vec2::new(e1.dot(t1), e1.dot(t2)),
        Vec2::new(e2.dot(t1), e2.dot(t2)),
    );
    (ds * mesh.dm_inv_mat(t), t1, t2)
}

/// Per-face stiffness coefficient μ·a·h.
fn face_coefficient(mesh: &TriangleMesh, t: usize) -> Scalar {
    mesh.rest_area[t] * mesh.material.thickness * mesh.material.shear_modulus()
}

/// Total membrane energy.
pub fn energy(mesh: &TriangleMesh, x: &[Scalar]) -> Scalar {
    let mut total = 0.0;
    for t in 0..mesh.triangle_count() {
        let (f, _, _) = face_deformation(mesh, x, t);
        let diff = f - Mat2::IDENTITY;
        let frobenius_sq = diff.col(0).length_squared() + diff.col(1).length_squared();
        total += face_coefficient(mesh, t) * frobenius_sq;
    }
    total
}

/// Accumulates the membrane gradient into `grad`.
///
/// The 2D Piola stress `P = 2k(F − I)` maps through `Dm⁻ᵀ` to
/// per-edge forces in frame coordinates, which the face frame lifts
/// back to 3D. Vertex 0 takes the negated sum (force balance).
pub fn accumulate_gradient(mesh: &TriangleMesh, x: &[Scalar], grad: &mut [Scalar]) {
    for t in 0..mesh.triangle_count() {
        let [a, b, c] = mesh.triangle(t);
        let (f, t1, t2) = face_deformation(mesh, x, t);
        let k = face_coefficient(mesh, t);

        let p = (f - Mat2::IDENTITY) * (2.0 * k);
        let h = p * mesh.dm_inv_mat(t).transpose();

        let f1 = t1 * h.col(0).x + t2 * h.col(0).y;
        let f2 = t1 * h.col(1).x + t2 * h.col(1).y;
        let f0 = -(f1 + f2);

        for (idx, f) in [(a, f0), (b, f1), (c, f2)] {
            grad[3 * idx] += f.x;
            grad[3 * idx + 1] += f.y;
            grad[3 * idx + 2] += f.z;
        }
    }
}

/// Accumulates the membrane Hessian triplets.
///
/// Constant blocks `H_ab = 2k·(gₐ·g_b)·I₃` with the rest shape
/// gradients `g₁ = Dm⁻¹ column 0`, `g₂ = column 1`,
/// `g₀ = −(g₁ + g₂)`.
pub fn accumulate_hessian(mesh: &TriangleMesh, triplets: &mut TripletBuffer) {
    for t in 0..mesh.triangle_count() {
        let [a, b, c] = mesh.triangle(t);
        let k = face_coefficient(mesh, t);
        let dm_inv = mesh.dm_inv_mat(t);

        let g1 = dm_inv.col(0);
        let g2 = dm_inv.col(1);
        let g = [-(g1 + g2), g1, g2];
        let idx = [a, b, c];

        for i in 0..3 {
            for j in 0..3 {
                let weight = 2.0 * k * g[i].dot(g[j]);
                if weight.abs() < 1e-14 {
                    continue;
                }
                let block = Mat3::IDENTITY * weight;
                triplets.push_block3(idx[i], idx[j], &block, 0.0);
            }
        }
    }
}
