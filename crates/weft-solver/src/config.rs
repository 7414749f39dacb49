//! Simulation parameters.
//!
//! A flat, immutable record passed into every step. No global state:
//! two steps with the same inputs and parameters produce the same
//! output.

use serde::{Deserialize, Serialize};
use weft_types::{Scalar, WeftError, WeftResult};

/// Configuration for one simulation step (and usually the whole run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    /// Time step Δt in seconds.
    pub dt: Scalar,

    /// Gravity vector (m/s²), folded into the predicted target.
    pub gravity: [Scalar; 3],

    /// Early-termination threshold for the β accumulation loop.
    pub beta_max: Scalar,

    /// Cap on β accumulation rounds per step.
    pub max_beta_iters: usize,

    /// Cap on Newton iterations inside one β round.
    pub max_newton_steps: usize,

    /// Relative residual tolerance for the inner linear solve. Also
    /// the ∞-norm gradient threshold for Newton convergence.
    pub pcg_tol: Scalar,

    /// Cap on inner-solve iterations; the effective cap is
    /// `min(pcg_max_iters, 3N)`.
    pub pcg_max_iters: usize,

    /// Outer barrier width ḡ for contact constraints (m).
    pub contact_gap_max: Scalar,

    /// Outer barrier width for walls (also used in their takeover
    /// stiffness).
    pub wall_gap: Scalar,

    /// Line-search direction extension factor η.
    pub extension: Scalar,

    /// When false, the line search uses discrete gap checks only.
    pub enable_ccd: bool,

    /// Friction model toggle and parameters.
    pub enable_friction: bool,
    pub friction_mu: Scalar,
    pub friction_epsilon: Scalar,

    /// Strain limiting toggle and parameters. `strain_tau` is the
    /// stretch fraction above rest; `strain_epsilon` is the barrier
    /// width (0 = follow τ). Values above 1 are read as percents.
    pub enable_strain_limiting: bool,
    pub strain_limit: Scalar,
    pub strain_tau: Scalar,
    pub strain_epsilon: Scalar,

    /// Eigenvalue clamp for SPD enforcement, also the diagonal ridge
    /// used when the preconditioner would divide by zero.
    pub hessian_epsilon: Scalar,

    /// Gap floor for the takeover stiffness.
    pub min_gap: Scalar,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            dt: 0.002,
            gravity: [0.0, 0.0, -9.81],
            beta_max: 0.999,
            max_beta_iters: 20,
            max_newton_steps: 8,
            pcg_tol: 1e-6,
            pcg_max_iters: 1000,
            contact_gap_max: 1e-3,
            wall_gap: 1e-3,
            extension: 1.25,
            enable_ccd: true,
            enable_friction: false,
            friction_mu: 0.1,
            friction_epsilon: 1e-5,
            enable_strain_limiting: false,
            strain_limit: 0.05,
            strain_tau: 0.05,
            strain_epsilon: 0.0,
            hessian_epsilon: 1e-8,
            min_gap: 1e-8,
        }
    }
}

impl SimParams {
    /// Checks admissibility of the numeric fields.
    pub fn validate(&self) -> WeftResult<()> {
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(WeftError::InvalidConfig(format!(
                "dt must be positive and finite, got {}",
                self.dt
            )));
        }
        if !(0.0..=1.0).contains(&self.beta_max) {
            return Err(WeftError::InvalidConfig(format!(
                "beta_max must lie in [0, 1], got {}",
                self.beta_max
            )));
        }
        if self.max_newton_steps == 0 {
            return Err(WeftError::InvalidConfig(
                "max_newton_steps must be at least 1".into(),
            ));
        }
        if !(self.contact_gap_max > 0.0) || !(self.wall_gap > 0.0) {
            return Err(WeftError::InvalidConfig(
                "barrier widths must be positive".into(),
            ));
        }
        if !(self.extension >= 1.0) {
            return Err(WeftError::InvalidConfig(format!(
                "line-search extension must be ≥ 1, got {}",
                self.extension
            )));
        }
        if !(self.pcg_tol > 0.0) {
            return Err(WeftError::InvalidConfig(
                "pcg_tol must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Effective inner-solve iteration cap for `vertices` unknowns
    /// (three DOFs each).
    pub fn effective_pcg_cap(&self, vertices: usize) -> usize {
        self.pcg_max_iters.min(3 * vertices.max(1))
    }

    /// Gravity as a `Vec3`.
    pub fn gravity_vec(&self) -> weft_math::Vec3 {
        weft_math::Vec3::from_array(self.gravity)
    }
}
