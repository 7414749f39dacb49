//! # weft-solver
//!
//! The Weft time-stepping core: an inexact Newton integrator with
//! incremental step-length (β) accumulation over a cubic barrier
//! potential. One [`step`](integrator::step) advances a
//! [`SimulationState`] by one timestep under elastic, bending,
//! barrier, friction, and strain-limiting forces while keeping every
//! emitted frame penetration-free.
//!
//! The integrator owns no persistent state: a step is a pure
//! transformation on (mesh, state, constraints, params).

pub mod adaptive;
pub mod assembly;
pub mod barrier;
pub mod bending;
pub mod config;
pub mod constraints;
pub mod diagnostics;
pub mod elasticity;
pub mod friction;
pub mod integrator;
pub mod line_search;
pub mod state;
pub mod stiffness;
pub mod strain_limit;

pub use config::SimParams;
pub use constraints::{Constraints, Pin, Wall};
pub use integrator::{step, Degradation, StepReport};
pub use state::SimulationState;
