//! Simulation state — SoA buffers for all per-vertex data.
//!
//! The only structure the integrator mutates. Positions and
//! velocities are stored per-channel; the solver core works on a
//! flattened `[x0, y0, z0, x1, ...]` vector and writes results back
//! once a step commits.

use weft_math::Vec3;
use weft_mesh::TriangleMesh;
use weft_types::{Scalar, WeftError, WeftResult};

/// SoA simulation state buffers.
pub struct SimulationState {
    /// Number of vertices.
    pub vertex_count: usize,

    // ─── Position (current) ───
    pub pos_x: Vec<Scalar>,
    pub pos_y: Vec<Scalar>,
    pub pos_z: Vec<Scalar>,

    // ─── Velocity ───
    pub vel_x: Vec<Scalar>,
    pub vel_y: Vec<Scalar>,
    pub vel_z: Vec<Scalar>,

    /// Per-vertex lumped mass (strictly positive).
    pub mass: Vec<Scalar>,
}

impl SimulationState {
    /// Initializes the state at the mesh's rest configuration with
    /// zero velocities and area-weighted lumped masses.
    pub fn from_mesh(mesh: &TriangleMesh) -> WeftResult<Self> {
        let mass = mesh.lumped_masses();
        Self::with_buffers(
            mesh.rest_x.clone(),
            mesh.rest_y.clone(),
            mesh.rest_z.clone(),
            mass,
        )
    }

    /// Builds a state from explicit buffers. All arrays must share
    /// one length; masses must be positive.
    pub fn with_buffers(
        pos_x: Vec<Scalar>,
        pos_y: Vec<Scalar>,
        pos_z: Vec<Scalar>,
        mass: Vec<Scalar>,
    ) -> WeftResult<Self> {
        let n = pos_x.len();
        if pos_y.len() != n || pos_z.len() != n || mass.len() != n {
            return Err(WeftError::InvalidMesh(
                "State buffers have inconsistent lengths".into(),
            ));
        }
        Self {
            vertex_count: n,
            pos_x,
            pos_y,
            pos_z,
            vel_x: vec![0.0; n],
            vel_y: vec![0.0; n],
            vel_z: vec![0.0; n],
            mass,
        }
        .validated()
    }

    fn validated(self) -> WeftResult<Self> {
        for (i, &m) in self.mass.iter().enumerate() {
            if !(m > 0.0) {
                return Err(WeftError::InvalidMesh(format!(
                    "Vertex {} has non-positive mass {}",
                    i, m
                )));
            }
        }
        Ok(self)
    }

    /// Position of vertex `i`.
    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::new(self.pos_x[i], self.pos_y[i], self.pos_z[i])
    }

    /// Velocity of vertex `i`.
    #[inline]
    pub fn velocity(&self, i: usize) -> Vec3 {
        Vec3::new(self.vel_x[i], self.vel_y[i], self.vel_z[i])
    }

    /// Sets the velocity of vertex `i`.
    #[inline]
    pub fn set_velocity(&mut self, i: usize, v: Vec3) {
        self.vel_x[i] = v.x;
        self.vel_y[i] = v.y;
        self.vel_z[i] = v.z;
    }

    /// Flattens positions into `[x0, y0, z0, x1, ...]`.
    pub fn flatten_positions(&self) -> Vec<Scalar> {
        let mut out = Vec::with_capacity(3 * self.vertex_count);
        for i in 0..self.vertex_count {
            out.push(self.pos_x[i]);
            out.push(self.pos_y[i]);
            out.push(self.pos_z[i]);
        }
        out
    }

    /// Flattens velocities into `[vx0, vy0, vz0, vx1, ...]`.
    pub fn flatten_velocities(&self) -> Vec<Scalar> {
        let mut out = Vec::with_capacity(3 * self.vertex_count);
        for i in 0..self.vertex_count {
            out.push(self.vel_x[i]);
            out.push(self.vel_y[i]);
            out.push(self.vel_z[i]);
        }
        out
    }

    /// Writes a flattened position vector back into the SoA buffers.
    pub fn unflatten_positions(&mut self, flat: &[Scalar]) {
        debug_assert_eq!(flat.len(), 3 * self.vertex_count);
        for i in 0..self.vertex_count {
            self.pos_x[i] = flat[3 * i];
            self.pos_y[i] = flat[3 * i + 1];
            self.pos_z[i] = flat[3 * i + 2];
        }
    }

    /// Total kinetic energy `½ Σ mᵢ ‖vᵢ‖²`.
    pub fn kinetic_energy(&self) -> Scalar {
        let mut energy = 0.0;
        for i in 0..self.vertex_count {
            energy += 0.5 * self.mass[i] * self.velocity(i).length_squared();
        }
        energy
    }
}
