//! Per-step energy diagnostics.
//!
//! Report-only: the breakdown never feeds back into the solve. Useful
//! for log lines and regression tests that watch energy drift.

use weft_contact::ContactPair;
use weft_math::sparse::CsrMatrix;
use weft_mesh::{Topology, TriangleMesh};
use weft_types::Scalar;

use crate::bending::BendingElements;
use crate::config::SimParams;
use crate::state::SimulationState;
use crate::stiffness::BlockDiagonal;
use crate::{assembly, barrier, elasticity};

/// Energy breakdown at the current state.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyBreakdown {
    pub kinetic: Scalar,
    pub membrane: Scalar,
    pub bending: Scalar,
    pub barrier: Scalar,
}

impl EnergyBreakdown {
    /// Sum of all tracked terms.
    pub fn total(&self) -> Scalar {
        self.kinetic + self.membrane + self.bending + self.barrier
    }
}

/// Measures the energy content of a state, using detection-time
/// contacts and their current stiffness estimates.
pub fn measure(
    mesh: &TriangleMesh,
    topo: &Topology,
    state: &SimulationState,
    contacts: &[ContactPair],
    params: &SimParams,
) -> EnergyBreakdown {
    let x = state.flatten_positions();
    let bending = BendingElements::build(mesh, topo);

    let mut breakdown = EnergyBreakdown {
        kinetic: state.kinetic_energy(),
        membrane: elasticity::energy(mesh, &x),
        bending: bending.energy(&x),
        barrier: 0.0,
    };

    if !contacts.is_empty() {
        // Stiffnesses need the mass+elastic diagonal blocks; reuse
        // the assembly path so the numbers match the solver's.
        let blocks = match assembly::assemble_mass_elastic(mesh, &bending, &state.mass, &x, params.dt)
        {
            Ok(pass1) => pass1.blocks,
            Err(_) => BlockDiagonal::build(&CsrMatrix::from_triplets(
                x.len(),
                &weft_math::sparse::TripletBuffer::default(),
            )),
        };
        let stiffnesses = assembly::compute_barrier_stiffnesses(
            contacts,
            &[],
            &state.mass,
            &x,
            &x,
            params,
            &blocks,
        );
        for (contact, &k) in contacts.iter().zip(&stiffnesses.contacts) {
            if !contact.active {
                continue;
            }
            let g_max = match contact.kind {
                weft_contact::ContactKind::PointWall => params.wall_gap,
                _ => params.contact_gap_max,
            };
            breakdown.barrier += barrier::energy(contact.gap, g_max, k);
        }
    }

    breakdown
}
