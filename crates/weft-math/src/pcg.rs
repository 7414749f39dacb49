//! Jacobi-preconditioned conjugate gradient solver.
//!
//! Solves `A d = b` for symmetric positive definite `A` to a relative
//! residual tolerance or an iteration cap. On a stall the solver hands
//! back the best iterate seen so far (tracked by residual norm) and
//! reports non-convergence; the caller decides whether that is fatal.

use weft_types::Scalar;

use crate::sparse::CsrMatrix;

/// Statistics and result flags from one linear solve.
#[derive(Debug, Clone, Copy)]
pub struct PcgStats {
    /// Iterations actually performed.
    pub iterations: usize,
    /// Final relative residual `‖b − Ax‖ / ‖b‖`.
    pub relative_residual: Scalar,
    /// Whether the tolerance was reached within the cap.
    pub converged: bool,
}

/// Solves `A x = b` with Jacobi (diagonal) preconditioning.
///
/// `x` is used as the initial guess and overwritten with the solution
/// (or the best iterate seen, when the cap is reached).
pub fn solve(a: &CsrMatrix, b: &[Scalar], x: &mut [Scalar], tol: Scalar, max_iters: usize) -> PcgStats {
    let n = b.len();
    debug_assert_eq!(a.dim, n);
    debug_assert_eq!(x.len(), n);

    let b_norm = norm(b);
    if b_norm < 1e-300 {
        x.fill(0.0);
        return PcgStats {
            iterations: 0,
            relative_residual: 0.0,
            converged: true,
        };
    }

    // Diagonal preconditioner. Zero diagonal entries fall back to
    // identity scaling; assembly adds a ridge before that can happen.
    let inv_diag: Vec<Scalar> = a
        .diagonal()
        .into_iter()
        .map(|d| if d.abs() > 1e-300 { 1.0 / d } else { 1.0 })
        .collect();

    // r = b - A x
    let mut r = vec![0.0; n];
    a.mul_vec(x, &mut r);
    for i in 0..n {
        r[i] = b[i] - r[i];
    }

    let mut rel = norm(&r) / b_norm;
    if rel < tol {
        return PcgStats {
            iterations: 0,
            relative_residual: rel,
            converged: true,
        };
    }

    let mut z: Vec<Scalar> = r.iter().zip(&inv_diag).map(|(ri, di)| ri * di).collect();
    let mut p = z.clone();
    let mut rz = dot(&r, &z);

    let mut best_x = x.to_vec();
    let mut best_rel = rel;

    let mut ap = vec![0.0; n];
    let mut iterations = 0;

    for iter in 0..max_iters {
        a.mul_vec(&p, &mut ap);
        let p_ap = dot(&p, &ap);
        if p_ap.abs() < 1e-300 {
            // Search direction annihilated: the matrix is not SPD in
            // this direction. Stop with what we have.
            break;
        }
        let alpha = rz / p_ap;

        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }
        iterations = iter + 1;

        rel = norm(&r) / b_norm;
        if rel < best_rel {
            best_rel = rel;
            best_x.copy_from_slice(x);
        }
        if rel < tol {
            return PcgStats {
                iterations,
                relative_residual: rel,
                converged: true,
            };
        }

        for i in 0..n {
            z[i] = r[i] * inv_diag[i];
        }
        let rz_new = dot(&r, &z);
        let beta = rz_new / rz;
        rz = rz_new;

        for i in 0..n {
            p[i] = z[i] + beta * p[i];
        }
    }

    // Cap reached or stalled: return the best iterate seen.
    x.copy_from_slice(&best_x);
    PcgStats {
        iterations,
        relative_residual: best_rel,
        converged: false,
    }
}

fn dot(a: &[Scalar], b: &[Scalar]) -> Scalar {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[Scalar]) -> Scalar {
    dot(v, v).sqrt()
}
