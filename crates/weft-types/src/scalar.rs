//! Scalar type alias for the simulation.
//!
//! Double precision throughout: the feasibility line search guards
//! gaps down to 1e-12 and the SPD projector is held to 1e-10
//! idempotence, neither of which survives a round-trip through f32.

/// The floating-point type used throughout the simulation.
pub type Scalar = f64;
