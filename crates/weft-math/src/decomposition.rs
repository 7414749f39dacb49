//! Singular values of 3×2 deformation gradients.
//!
//! The in-plane deformation gradient of a shell face maps the 2D rest
//! configuration into 3D, so it is a 3×2 matrix. Strain limiting only
//! needs its singular values and the corresponding left/right pair,
//! which come from the 2×2 Gram matrix FᵀF in closed form.

use weft_types::Scalar;

use crate::{Mat2, Vec2, Vec3};

/// A 3×2 matrix stored as two 3D columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3x2 {
    pub col0: Vec3,
    pub col1: Vec3,
}

impl Mat3x2 {
    pub fn from_cols(col0: Vec3, col1: Vec3) -> Self {
        Self { col0, col1 }
    }

    /// Product with a 2×2 matrix on the right.
    pub fn mul_mat2(&self, m: &Mat2) -> Mat3x2 {
        Mat3x2 {
            col0: self.col0 * m.col(0).x + self.col1 * m.col(0).y,
            col1: self.col0 * m.col(1).x + self.col1 * m.col(1).y,
        }
    }

    /// Product with a 2D vector: `self · v`.
    pub fn mul_vec2(&self, v: Vec2) -> Vec3 {
        self.col0 * v.x + self.col1 * v.y
    }

    /// Gram matrix FᵀF.
    pub fn gram(&self) -> Mat2 {
        Mat2::from_cols(
            Vec2::new(self.col0.dot(self.col0), self.col1.dot(self.col0)),
            Vec2::new(self.col0.dot(self.col1), self.col1.dot(self.col1)),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.col0.is_finite() && self.col1.is_finite()
    }
}

/// Thin SVD of a 3×2 matrix: `F = σ₀·u₀v₀ᵀ + σ₁·u₁v₁ᵀ`.
///
/// Singular values are ordered `σ₀ ≥ σ₁ ≥ 0`.
#[derive(Debug, Clone, Copy)]
pub struct Svd3x2 {
    pub sigma: [Scalar; 2],
    /// Left singular vectors (3D).
    pub u: [Vec3; 2],
    /// Right singular vectors (2D).
    pub v: [Vec2; 2],
}

/// Computes the thin SVD of a 3×2 matrix via the eigendecomposition
/// of its 2×2 Gram matrix.
///
/// Degenerate directions (σ ≈ 0) get a left vector of zero; callers
/// treat those faces as collapsed and skip them.
pub fn svd_3x2(f: &Mat3x2) -> Svd3x2 {
    let g = f.gram();
    let a = g.col(0).x;
    let b = g.col(1).x; // symmetric off-diagonal
    let d = g.col(1).y;

    // Eigenvalues of [[a, b], [b, d]].
    let trace_half = 0.5 * (a + d);
    let det = a * d - b * b;
    let disc = (trace_half * trace_half - det).max(0.0).sqrt();
    let lam0 = (trace_half + disc).max(0.0);
    let lam1 = (trace_half - disc).max(0.0);

    let eigvec = |lam: Scalar| -> Vec2 {
        // (G - λI) v = 0; pick the larger row for stability.
        let r0 = Vec2::new(a - lam, b);
        let r1 = Vec2::new(b, d - lam);
        let v = if r0.length_squared() >= r1.length_squared() {
            Vec2::new(-r0.y, r0.x)
        } else {
            Vec2::new(-r1.y, r1.x)
        };
        let len = v.length();
        if len > 1e-300 {
            v / len
        } else {
            Vec2::new(1.0, 0.0)
        }
    };

    let mut v0 = eigvec(lam0);
    let mut v1 = Vec2::new(-v0.y, v0.x);
    if (lam0 - lam1).abs() < 1e-14 * lam0.max(1.0) {
        // Nearly isotropic Gram matrix: any orthonormal pair works.
        v0 = Vec2::new(1.0, 0.0);
        v1 = Vec2::new(0.0, 1.0);
    }

    let sigma0 = lam0.sqrt();
    let sigma1 = lam1.sqrt();

    let left = |v: Vec2, sigma: Scalar| -> Vec3 {
        if sigma > 1e-12 {
            f.mul_vec2(v) / sigma
        } else {
            Vec3::ZERO
        }
    };

    Svd3x2 {
        sigma: [sigma0, sigma1],
        u: [left(v0, sigma0), left(v1, sigma1)],
        v: [v0, v1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_embedding_has_unit_singular_values() {
        let f = Mat3x2::from_cols(Vec3::X, Vec3::Y);
        let svd = svd_3x2(&f);
        assert!((svd.sigma[0] - 1.0).abs() < 1e-12);
        assert!((svd.sigma[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn stretch_shows_up_in_sigma_max() {
        let f = Mat3x2::from_cols(Vec3::X * 1.5, Vec3::Y);
        let svd = svd_3x2(&f);
        assert!((svd.sigma[0] - 1.5).abs() < 1e-12);
        assert!((svd.sigma[1] - 1.0).abs() < 1e-12);
        // Reconstruction along the max pair.
        let reconstructed = svd.u[0] * svd.sigma[0];
        let mapped = f.mul_vec2(svd.v[0]);
        assert!((reconstructed - mapped).length() < 1e-12);
    }

    #[test]
    fn out_of_plane_column_is_handled() {
        let f = Mat3x2::from_cols(Vec3::new(0.0, 0.0, 2.0), Vec3::Y * 0.5);
        let svd = svd_3x2(&f);
        assert!((svd.sigma[0] - 2.0).abs() < 1e-12);
        assert!((svd.sigma[1] - 0.5).abs() < 1e-12);
    }
}
