//! # weft-math
//!
//! Linear algebra primitives for the Weft simulation engine.
//!
//! Provides:
//! - Re-exports of `glam` double-precision types (`Vec3`, `Mat3`, etc.)
//! - Triplet buffer and CSR sparse matrix for Hessian assembly
//! - Symmetric 3×3 eigendecomposition and SPD projection
//! - Singular values of 3×2 deformation gradients
//! - Jacobi-preconditioned conjugate gradient solver

pub mod decomposition;
pub mod pcg;
pub mod sparse;
pub mod spd;

// Re-export glam's f64 types as the canonical math types for Weft.
pub use glam::{DMat2 as Mat2, DMat3 as Mat3, DVec2 as Vec2, DVec3 as Vec3};
