//! The β-accumulation time integrator.
//!
//! One step advances the state by a fraction β ∈ [0, 1] of the
//! requested Δt, composed from feasibility-preserving Newton
//! sub-steps: each inner round produces a feasible fraction α of the
//! remaining motion toward the predicted target, and the cumulative
//! progress composes as `β ← β + (1 − β)·α`. Collision detection runs
//! once per step, at the incoming positions; feasibility inside the
//! step is maintained by the line search alone.
//!
//! Velocities are rescaled by the *achieved* fraction,
//! `v = (x − x₀)/(β·Δt)`, so the emitted momentum is consistent with
//! the distance actually travelled.

use tracing::{debug, warn};
use weft_contact::{detect_contacts, ContactPair};
use weft_math::pcg;
use weft_mesh::{Topology, TriangleMesh};
use weft_types::{Scalar, WeftError, WeftResult};

use crate::assembly::{self, inf_norm};
use crate::bending::BendingElements;
use crate::config::SimParams;
use crate::constraints::Constraints;
use crate::line_search;
use crate::state::SimulationState;
use crate::strain_limit;

/// β below which a step is considered to have made no progress.
const BETA_FLOOR: Scalar = 1e-6;

/// A recoverable event the step survived with partial quality.
#[derive(Debug, Clone, PartialEq)]
pub enum Degradation {
    /// The inner linear solve stalled before tolerance; the best
    /// iterate was used.
    PcgStall { relative_residual: Scalar },
    /// The line search found no admissible step; β accumulation
    /// stopped early.
    LineSearchRejected,
    /// A Newton round hit its iteration cap before converging.
    NewtonCapReached,
    /// Touching pairs were reported by detection and skipped.
    PenetratingPairsSkipped { count: usize },
}

/// Outcome of one integration step.
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    /// Fraction of Δt actually advanced.
    pub beta: Scalar,
    /// β accumulation rounds performed.
    pub beta_rounds: usize,
    /// Total Newton iterations across all rounds.
    pub newton_iterations: usize,
    /// Total inner-solve iterations.
    pub pcg_iterations: usize,
    /// Contacts active this step.
    pub contact_count: usize,
    /// Recoverable events; empty means a clean full-quality step.
    pub degradations: Vec<Degradation>,
}

impl StepReport {
    /// True when the step completed without degradations.
    pub fn is_clean(&self) -> bool {
        self.degradations.is_empty()
    }
}

/// Advances the state by one timestep.
///
/// On success the state holds the new positions and velocities; on
/// error the state is untouched (step-fatal semantics).
pub fn step(
    mesh: &TriangleMesh,
    topo: &Topology,
    state: &mut SimulationState,
    constraints: &Constraints,
    params: &SimParams,
) -> WeftResult<StepReport> {
    params.validate()?;
    let n = state.vertex_count;
    let dt = params.dt;
    let mut report = StepReport::default();

    // Predicted target: x̂ = x₀ + Δt·v + Δt²·g.
    let x0 = state.flatten_positions();
    let v = state.flatten_velocities();
    let gravity = params.gravity_vec();
    let mut x_target = x0.clone();
    for i in 0..n {
        for k in 0..3 {
            x_target[3 * i + k] += dt * v[3 * i + k] + dt * dt * gravity[k];
        }
    }

    // Collision detection at the incoming positions.
    let detection = detect_contacts(
        mesh,
        topo,
        &state.pos_x,
        &state.pos_y,
        &state.pos_z,
        &constraints.wall_planes(),
        params.contact_gap_max,
        params.wall_gap,
    );
    if detection.penetrations.iter().any(|p| p.gap < 0.0) {
        return Err(WeftError::PenetratingState(format!(
            "{} pairs penetrating at step start",
            detection.penetrations.len()
        )));
    }
    if !detection.penetrations.is_empty() {
        warn!(
            count = detection.penetrations.len(),
            "skipping touching pairs this step"
        );
        report.degradations.push(Degradation::PenetratingPairsSkipped {
            count: detection.penetrations.len(),
        });
    }
    let contacts = detection.contacts;
    report.contact_count = contacts.len();

    let bending = BendingElements::build(mesh, topo);

    // β accumulation.
    let mut x = x0.clone();
    let mut beta: Scalar = 0.0;
    for _ in 0..params.max_beta_iters {
        let alpha = newton_rounds(
            mesh, &bending, state, &mut x, &x_target, &x0, &contacts, constraints, params,
            &mut report,
        )?;
        beta += (1.0 - beta) * alpha;
        report.beta_rounds += 1;

        if alpha < BETA_FLOOR {
            debug!(beta, "line search stalled, freezing β accumulation");
            report.degradations.push(Degradation::LineSearchRejected);
            break;
        }
        if beta >= params.beta_max {
            break;
        }
    }

    // Error-reduction pass plus the velocity update from achieved β.
    if beta > BETA_FLOOR {
        newton_rounds(
            mesh, &bending, state, &mut x, &x_target, &x0, &contacts, constraints, params,
            &mut report,
        )?;

        let beta_dt = beta * dt;
        for i in 0..n {
            state.set_velocity(
                i,
                weft_math::Vec3::new(
                    (x[3 * i] - x0[3 * i]) / beta_dt,
                    (x[3 * i + 1] - x0[3 * i + 1]) / beta_dt,
                    (x[3 * i + 2] - x0[3 * i + 2]) / beta_dt,
                ),
            );
        }
    }
    state.unflatten_positions(&x);

    report.beta = beta;
    Ok(report)
}

/// One Newton round: up to `max_newton_steps` iterations of
/// build → solve → line search → commit. Returns the progress
/// fraction this round contributed: 1.0 on convergence or a full
/// step, the last admitted α when the cap is hit, 0.0 on rejection.
#[allow(clippy::too_many_arguments)]
fn newton_rounds(
    mesh: &TriangleMesh,
    bending: &BendingElements,
    state: &SimulationState,
    x: &mut [Scalar],
    x_target: &[Scalar],
    x0: &[Scalar],
    contacts: &[ContactPair],
    constraints: &Constraints,
    params: &SimParams,
    report: &mut StepReport,
) -> WeftResult<Scalar> {
    let masses = &state.mass;
    let n = state.vertex_count;
    let pcg_cap = params.effective_pcg_cap(n);
    let mut last_alpha = 0.0;

    for _ in 0..params.max_newton_steps {
        report.newton_iterations += 1;

        // Pass 1: mass + elastic system and its diagonal blocks.
        let pass1 = assembly::assemble_mass_elastic(mesh, bending, masses, x, params.dt)?;
        let strain = strain_limit::rebuild_constraints(mesh, x, params, &pass1.blocks);
        let stiffnesses = assembly::compute_barrier_stiffnesses(
            contacts,
            &constraints.pins,
            masses,
            x,
            x0,
            params,
            &pass1.blocks,
        );

        let grad = assembly::assemble_gradient(
            mesh,
            bending,
            masses,
            x,
            x_target,
            x0,
            contacts,
            constraints,
            &strain,
            &stiffnesses,
            params,
        )?;
        if inf_norm(&grad) < params.pcg_tol {
            return Ok(1.0);
        }

        // Pass 2: barrier-augmented Hessian.
        let hessian = assembly::assemble_full_hessian(
            mesh,
            &pass1,
            x,
            x0,
            contacts,
            constraints,
            &strain,
            &stiffnesses,
            params,
        )?;

        let rhs: Vec<Scalar> = grad.iter().map(|g| -g).collect();
        let mut direction = vec![0.0; rhs.len()];
        let stats = pcg::solve(&hessian, &rhs, &mut direction, params.pcg_tol, pcg_cap);
        report.pcg_iterations += stats.iterations;
        if !stats.converged {
            warn!(
                residual = stats.relative_residual,
                iterations = stats.iterations,
                "inner solve stalled, continuing with best iterate"
            );
            report.degradations.push(Degradation::PcgStall {
                relative_residual: stats.relative_residual,
            });
        }

        let alpha = line_search::feasible_alpha(x, &direction, contacts, constraints, params);
        if alpha <= 0.0 {
            return Ok(0.0);
        }

        // Commit no more than the full Newton step: the extension only
        // helps when the line search restricted α, it must not
        // overshoot the minimum in free space.
        let scale = (alpha * params.extension).min(1.0);
        for (xi, di) in x.iter_mut().zip(&direction) {
            *xi += scale * di;
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(WeftError::NonFinite {
                context: "Newton iterate",
            });
        }

        last_alpha = alpha;
    }

    // Iteration cap: report the last admitted fraction rather than a
    // synthetic constant, so β only counts line-search progress.
    report.degradations.push(Degradation::NewtonCapReached);
    Ok(last_alpha)
}
