//! # weft-mesh
//!
//! Triangle shell mesh for the Weft simulator: immutable topology,
//! per-face rest-state cache (local-frame shape matrices and areas),
//! material record, edge/hinge extraction, and procedural generators
//! for tests and benchmarks.

pub mod generators;
pub mod material;
pub mod mesh;
pub mod topology;

pub use material::Material;
pub use mesh::TriangleMesh;
pub use topology::Topology;
