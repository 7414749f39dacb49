//! Gradient and Hessian assembly.
//!
//! The dynamic barrier stiffness depends on the mass+elastic Hessian,
//! and the full Hessian's barrier blocks depend on the stiffness.
//! Assembly therefore runs in two passes:
//!
//! 1. mass/Δt² diagonal + elastic + bending → compressed once, its
//!    diagonal blocks cached;
//! 2. barrier stiffness per constraint from the pass-1 blocks, then
//!    the barrier, friction, and strain-limit blocks appended on top
//!    of the pass-1 triplets.
//!
//! The final matrix is symmetrized (`½(H + Hᵀ)` at the triplet level)
//! and gets a small diagonal ridge only where the Jacobi
//! preconditioner would otherwise divide by zero.

use weft_contact::{ContactKind, ContactPair};
use weft_math::sparse::{CsrMatrix, TripletBuffer};
use weft_types::{Scalar, WeftError, WeftResult};
use weft_mesh::TriangleMesh;

use crate::bending::BendingElements;
use crate::config::SimParams;
use crate::constraints::{Constraints, Pin};
use crate::strain_limit::{self, StrainConstraint};
use crate::stiffness::{self, BlockDiagonal};
use crate::{barrier, elasticity, friction};

/// Pass-1 products: the mass+elastic system and its diagonal blocks.
pub struct MassElasticSystem {
    pub triplets: TripletBuffer,
    pub matrix: CsrMatrix,
    pub blocks: BlockDiagonal,
}

/// Barrier stiffnesses for the current iterate, one per constraint.
pub struct BarrierStiffnesses {
    pub contacts: Vec<Scalar>,
    pub pins: Vec<Scalar>,
}

/// Pass 1: mass/Δt² diagonal plus elastic and bending Hessians.
pub fn assemble_mass_elastic(
    mesh: &TriangleMesh,
    bending: &BendingElements,
    masses: &[Scalar],
    x: &[Scalar],
    dt: Scalar,
) -> WeftResult<MassElasticSystem> {
    let n3 = x.len();
    let mut triplets =
        TripletBuffer::with_capacity(n3 + 81 * mesh.triangle_count() + 144 * bending.elements.len());

    if dt > 0.0 {
        let dt2_inv = 1.0 / (dt * dt);
        for (i, &m) in masses.iter().enumerate() {
            let value = m * dt2_inv;
            for k in 0..3 {
                triplets.push_diagonal(3 * i + k, value);
            }
        }
    }

    elasticity::accumulate_hessian(mesh, &mut triplets);
    bending.accumulate_hessian(x, &mut triplets);

    if !triplets.all_finite() {
        return Err(WeftError::NonFinite {
            context: "mass+elastic Hessian",
        });
    }

    let matrix = CsrMatrix::from_triplets(n3, &triplets);
    let blocks = BlockDiagonal::build(&matrix);
    Ok(MassElasticSystem {
        triplets,
        matrix,
        blocks,
    })
}

/// Per-constraint barrier gap width ḡ.
fn contact_gap_max(contact: &ContactPair, params: &SimParams) -> Scalar {
    match contact.kind {
        ContactKind::PointWall => params.wall_gap,
        _ => params.contact_gap_max,
    }
}

/// Computes the dynamic stiffness of every contact and pin at the
/// current iterate.
pub fn compute_barrier_stiffnesses(
    contacts: &[ContactPair],
    pins: &[Pin],
    masses: &[Scalar],
    x: &[Scalar],
    x_origin: &[Scalar],
    params: &SimParams,
    blocks: &BlockDiagonal,
) -> BarrierStiffnesses {
    let contact_ks = contacts
        .iter()
        .map(|contact| {
            if !contact.active {
                return 0.0;
            }
            match contact.kind {
                ContactKind::PointWall => {
                    let v = contact.indices[0] as usize;
                    stiffness::wall_stiffness(
                        masses[v],
                        params.dt,
                        params.wall_gap,
                        contact.normal,
                        params.min_gap,
                        blocks.block(v),
                    )
                }
                _ => stiffness::contact_stiffness(
                    contact,
                    masses,
                    params.dt,
                    barrier::linearized_gap(contact, x, x_origin),
                    contact_gap_max(contact, params),
                    params.min_gap,
                    blocks,
                ),
            }
        })
        .collect();

    let pin_ks = pins
        .iter()
        .map(|pin| {
            if !pin.active {
                return 0.0;
            }
            let v = pin.vertex;
            let p = weft_math::Vec3::new(x[3 * v], x[3 * v + 1], x[3 * v + 2]);
            let radius = pin.gap.unwrap_or(params.contact_gap_max);
            stiffness::pin_stiffness(
                masses[v],
                params.dt,
                p - pin.target,
                barrier::pin_slack(p, pin.target, radius),
                params.min_gap,
                blocks.block(v),
            )
        })
        .collect();

    BarrierStiffnesses {
        contacts: contact_ks,
        pins: pin_ks,
    }
}

/// Assembles the full energy gradient at the current iterate.
#[allow(clippy::too_many_arguments)]
pub fn assemble_gradient(
    mesh: &TriangleMesh,
    bending: &BendingElements,
    masses: &[Scalar],
    x: &[Scalar],
    x_target: &[Scalar],
    x_origin: &[Scalar],
    contacts: &[ContactPair],
    constraints: &Constraints,
    strain: &[StrainConstraint],
    stiffnesses: &BarrierStiffnesses,
    params: &SimParams,
) -> WeftResult<Vec<Scalar>> {
    let n3 = x.len();
    let mut grad = vec![0.0; n3];

    // Inertia: (1/Δt²)·M·(x − x̂).
    let dt2_inv = 1.0 / (params.dt * params.dt);
    for i in 0..masses.len() {
        let factor = masses[i] * dt2_inv;
        for k in 0..3 {
            grad[3 * i + k] += factor * (x[3 * i + k] - x_target[3 * i + k]);
        }
    }

    elasticity::accumulate_gradient(mesh, x, &mut grad);
    bending.accumulate_gradient(x, &mut grad);

    for (contact, &k) in contacts.iter().zip(&stiffnesses.contacts) {
        if !contact.active {
            continue;
        }
        let g = barrier::linearized_gap(contact, x, x_origin);
        let g_max = contact_gap_max(contact, params);
        barrier::accumulate_contact_gradient(contact, g, g_max, k, &mut grad);

        if params.enable_friction {
            let normal_force = barrier::gradient(g, g_max, k).abs();
            let k_f =
                friction::friction_stiffness(normal_force, params.friction_mu, params.friction_epsilon);
            friction::accumulate_gradient(contact, k_f, x, x_origin, &mut grad);
        }
    }

    for (pin, &k) in constraints.pins.iter().zip(&stiffnesses.pins) {
        if !pin.active {
            continue;
        }
        let radius = pin.gap.unwrap_or(params.contact_gap_max);
        barrier::accumulate_pin_gradient(pin.vertex, pin.target, radius, x, k, &mut grad);
    }

    strain_limit::accumulate_gradient(mesh, x, strain, params, &mut grad);

    if grad.iter().any(|v| !v.is_finite()) {
        return Err(WeftError::NonFinite {
            context: "energy gradient",
        });
    }
    Ok(grad)
}

/// Pass 2: the full Hessian. Appends barrier, friction, and
/// strain-limit blocks to the pass-1 triplets, symmetrizes, and
/// compresses.
#[allow(clippy::too_many_arguments)]
pub fn assemble_full_hessian(
    mesh: &TriangleMesh,
    pass1: &MassElasticSystem,
    x: &[Scalar],
    x_origin: &[Scalar],
    contacts: &[ContactPair],
    constraints: &Constraints,
    strain: &[StrainConstraint],
    stiffnesses: &BarrierStiffnesses,
    params: &SimParams,
) -> WeftResult<CsrMatrix> {
    let n3 = x.len();
    let tol = 0.0;
    let mut triplets = TripletBuffer::with_capacity(pass1.triplets.len() + 144 * contacts.len());
    triplets.extend_from(&pass1.triplets);

    for (contact, &k) in contacts.iter().zip(&stiffnesses.contacts) {
        if !contact.active {
            continue;
        }
        let g = barrier::linearized_gap(contact, x, x_origin);
        let g_max = contact_gap_max(contact, params);
        barrier::accumulate_contact_hessian(contact, g, g_max, k, tol, &mut triplets);

        if params.enable_friction {
            let normal_force = barrier::gradient(g, g_max, k).abs();
            let k_f =
                friction::friction_stiffness(normal_force, params.friction_mu, params.friction_epsilon);
            friction::accumulate_hessian(contact, k_f, &mut triplets);
        }
    }

    for (pin, &k) in constraints.pins.iter().zip(&stiffnesses.pins) {
        if !pin.active {
            continue;
        }
        let radius = pin.gap.unwrap_or(params.contact_gap_max);
        barrier::accumulate_pin_hessian(pin.vertex, pin.target, radius, x, k, tol, &mut triplets);
    }

    strain_limit::accumulate_hessian(mesh, x, strain, params, &mut triplets);

    if !triplets.all_finite() {
        return Err(WeftError::NonFinite {
            context: "system Hessian",
        });
    }

    // Symmetrize at the triplet level: H ← ½(H + Hᵀ).
    let mut symmetric = TripletBuffer::with_capacity(2 * triplets.len());
    for &(r, c, v) in triplets.entries() {
        symmetric.push(r, c, 0.5 * v);
        symmetric.push(c, r, 0.5 * v);
    }

    let matrix = CsrMatrix::from_triplets(n3, &symmetric);

    // Ridge only where the preconditioner would divide by zero.
    let needs_ridge = (0..n3).any(|i| matrix.diagonal_entry(i).abs() < 1e-300);
    if needs_ridge {
        for i in 0..n3 {
            symmetric.push_diagonal(i, params.hessian_epsilon);
        }
        return Ok(CsrMatrix::from_triplets(n3, &symmetric));
    }
    Ok(matrix)
}

/// ∞-norm of a flattened vector.
pub fn inf_norm(v: &[Scalar]) -> Scalar {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}
