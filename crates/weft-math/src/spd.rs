//! Symmetric 3×3 eigendecomposition and SPD projection.
//!
//! Constraint stiffness estimation and per-element Hessian scattering
//! both require their 3×3 blocks to be symmetric positive definite.
//! The projection used everywhere is: symmetrize, eigendecompose,
//! clamp eigenvalues below `epsilon` up to `epsilon`, recompose. The
//! operation is idempotent (a second projection is a no-op up to
//! rounding).

use weft_types::{constants::SPD_EPSILON, Scalar};

use crate::{Mat3, Vec3};

/// Maximum Jacobi sweeps for the 3×3 eigensolver. Convergence for
/// symmetric 3×3 input is typically reached in 3–4 sweeps.
const MAX_JACOBI_SWEEPS: usize = 24;

/// Eigendecomposition of a symmetric 3×3 matrix.
///
/// Returns `(eigenvalues, eigenvectors)` where `eigenvectors.col(i)`
/// pairs with `eigenvalues[i]`. Uses cyclic Jacobi rotations, which
/// are unconditionally stable for symmetric input.
pub fn sym_eigen3(m: &Mat3) -> (Vec3, Mat3) {
    // Work on the symmetrized copy; callers may pass slightly
    // asymmetric accumulation results.
    let s = (*m + m.transpose()) * 0.5;
    let mut a = [
        [s.col(0).x, s.col(1).x, s.col(2).x],
        [s.col(0).y, s.col(1).y, s.col(2).y],
        [s.col(0).z, s.col(1).z, s.col(2).z],
    ];
    let mut v = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    for _ in 0..MAX_JACOBI_SWEEPS {
        let off = a[0][1] * a[0][1] + a[0][2] * a[0][2] + a[1][2] * a[1][2];
        if off < 1e-30 {
            break;
        }
        for (p, q) in [(0usize, 1usize), (0, 2), (1, 2)] {
            let apq = a[p][q];
            if apq.abs() < 1e-300 {
                continue;
            }
            let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
            let t = if theta >= 0.0 {
                1.0 / (theta + (1.0 + theta * theta).sqrt())
            } else {
                -1.0 / (-theta + (1.0 + theta * theta).sqrt())
            };
            let c = 1.0 / (1.0 + t * t).sqrt();
            let s = t * c;

            for k in 0..3 {
                let akp = a[k][p];
                let akq = a[k][q];
                a[k][p] = c * akp - s * akq;
                a[k][q] = s * akp + c * akq;
            }
            for k in 0..3 {
                let apk = a[p][k];
                let aqk = a[q][k];
                a[p][k] = c * apk - s * aqk;
                a[q][k] = s * apk + c * aqk;
            }
            for k in 0..3 {
                let vkp = v[k][p];
                let vkq = v[k][q];
                v[k][p] = c * vkp - s * vkq;
                v[k][q] = s * vkp + c * vkq;
            }
        }
    }

    let eigenvalues = Vec3::new(a[0][0], a[1][1], a[2][2]);
    let eigenvectors = Mat3::from_cols(
        Vec3::new(v[0][0], v[1][0], v[2][0]),
        Vec3::new(v[0][1], v[1][1], v[2][1]),
        Vec3::new(v[0][2], v[1][2], v[2][2]),
    );
    (eigenvalues, eigenvectors)
}

/// Projects a 3×3 matrix onto the SPD cone.
///
/// Symmetrizes, clamps eigenvalues below `epsilon` up to `epsilon`,
/// and recomposes.
pub fn project_spd_with(m: &Mat3, epsilon: Scalar) -> Mat3 {
    let (mut eigenvalues, q) = sym_eigen3(m);
    for i in 0..3 {
        if eigenvalues[i] < epsilon {
            eigenvalues[i] = epsilon;
        }
    }
    q * Mat3::from_diagonal(eigenvalues) * q.transpose()
}

/// Projects with the default clamp epsilon.
pub fn project_spd(m: &Mat3) -> Mat3 {
    project_spd_with(m, SPD_EPSILON)
}

/// Largest value of `n·(M n)` admissible as an elastic stiffness:
/// SPD-projects the block, then evaluates the quadratic form, clamped
/// at zero.
pub fn quadratic_form_clamped(m: &Mat3, n: Vec3) -> Scalar {
    let h = project_spd(m);
    (n.dot(h * n)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eigen_recovers_diagonal() {
        let m = Mat3::from_diagonal(Vec3::new(3.0, -1.0, 2.0));
        let (vals, _) = sym_eigen3(&m);
        let mut sorted = [vals.x, vals.y, vals.z];
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((sorted[0] + 1.0).abs() < 1e-12);
        assert!((sorted[1] - 2.0).abs() < 1e-12);
        assert!((sorted[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn projection_clamps_negative_direction() {
        let m = Mat3::from_diagonal(Vec3::new(5.0, -4.0, 1.0));
        let p = project_spd(&m);
        let (vals, _) = sym_eigen3(&p);
        assert!(vals.min_element() >= SPD_EPSILON * 0.5);
    }

    #[test]
    fn projection_is_idempotent() {
        let m = Mat3::from_cols(
            Vec3::new(2.0, 1.0, -3.0),
            Vec3::new(1.0, -1.0, 0.5),
            Vec3::new(-3.0, 0.5, 4.0),
        );
        let once = project_spd(&m);
        let twice = project_spd(&once);
        let diff = twice - once;
        let mut max = 0.0f64;
        for c in 0..3 {
            for r in 0..3 {
                max = max.max(diff.col(c)[r].abs());
            }
        }
        assert!(max < 1e-10, "projection drifted by {max}");
    }
}
