//! Core triangle mesh type with SoA (Structure of Arrays) layout.
//!
//! The mesh owns the *rest* configuration and everything derived from
//! it; current positions and velocities live in the solver state. All
//! rest data is computed once at construction and never mutated:
//! solvers borrow the mesh read-only for the duration of a step.

use serde::{Deserialize, Serialize};
use weft_math::{Mat2, Vec2, Vec3};
use weft_types::{Scalar, WeftError, WeftResult};

use crate::material::Material;

/// A triangle shell mesh stored in Structure-of-Arrays layout.
///
/// Rest positions are stored per-channel (`rest_x`, `rest_y`,
/// `rest_z`); triangle indices reference into these arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// X coordinates of all rest vertices.
    pub rest_x: Vec<Scalar>,
    /// Y coordinates of all rest vertices.
    pub rest_y: Vec<Scalar>,
    /// Z coordinates of all rest vertices.
    pub rest_z: Vec<Scalar>,

    /// Triangle indices — stored flat: `[t0v0, t0v1, t0v2, t1v0, ...]`.
    pub indices: Vec<u32>,

    /// Material shared by all faces.
    pub material: Material,

    /// Per-face inverse rest shape matrix in the face's local
    /// orthonormal frame, stored column-major `[m00, m10, m01, m11]`.
    pub dm_inv: Vec<[Scalar; 4]>,

    /// Per-face rest area (strictly positive).
    pub rest_area: Vec<Scalar>,
}

impl TriangleMesh {
    /// Builds a mesh from rest positions and triangle indices,
    /// computing the per-face rest cache.
    ///
    /// Fails on out-of-range indices, repeated vertices within a
    /// triangle, or degenerate (zero-area) rest faces.
    pub fn new(
        positions: &[Vec3],
        indices: &[u32],
        material: Material,
    ) -> WeftResult<Self> {
        material.validate()?;

        let mut mesh = Self {
            rest_x: positions.iter().map(|p| p.x).collect(),
            rest_y: positions.iter().map(|p| p.y).collect(),
            rest_z: positions.iter().map(|p| p.z).collect(),
            indices: indices.to_vec(),
            material,
            dm_inv: Vec::new(),
            rest_area: Vec::new(),
        };
        mesh.validate_topology()?;
        mesh.compute_rest_state()?;
        Ok(mesh)
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.rest_x.len()
    }

    /// Returns the number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns the three vertex indices of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [usize; 3] {
        let base = t * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Returns the rest position of vertex `i`.
    #[inline]
    pub fn rest_position(&self, i: usize) -> Vec3 {
        Vec3::new(self.rest_x[i], self.rest_y[i], self.rest_z[i])
    }

    /// Inverse rest shape matrix of face `t` as a `Mat2`.
    #[inline]
    pub fn dm_inv_mat(&self, t: usize) -> Mat2 {
        let m = self.dm_inv[t];
        Mat2::from_cols(Vec2::new(m[0], m[1]), Vec2::new(m[2], m[3]))
    }

    /// Area-weighted lumped vertex masses: each face distributes a
    /// third of `ρ·h·area` to its corners.
    pub fn lumped_masses(&self) -> Vec<Scalar> {
        let mut mass = vec![0.0; self.vertex_count()];
        let areal = self.material.areal_density();
        for t in 0..self.triangle_count() {
            let third = self.rest_area[t] * areal / 3.0;
            for &v in &self.triangle(t) {
                mass[v] += third;
            }
        }
        // Floating vertices would otherwise get zero mass.
        for m in &mut mass {
            if *m < 1e-12 {
                *m = 1e-12;
            }
        }
        mass
    }

    fn validate_topology(&self) -> WeftResult<()> {
        let n = self.vertex_count();
        if self.rest_y.len() != n || self.rest_z.len() != n {
            return Err(WeftError::InvalidMesh(
                "Position arrays have inconsistent lengths".into(),
            ));
        }
        if self.indices.len() % 3 != 0 {
            return Err(WeftError::InvalidMesh(
                "Index count is not divisible by 3".into(),
            ));
        }
        for (i, &idx) in self.indices.iter().enumerate() {
            if idx as usize >= n {
                return Err(WeftError::InvalidMesh(format!(
                    "Index {} at position {} is out of range (vertex count: {})",
                    idx, i, n
                )));
            }
        }
        for t in 0..self.triangle_count() {
            let [a, b, c] = self.triangle(t);
            if a == b || b == c || a == c {
                return Err(WeftError::InvalidMesh(format!(
                    "Triangle {} has repeated vertex indices: [{}, {}, {}]",
                    t, a, b, c
                )));
            }
        }
        Ok(())
    }

    /// Computes per-face rest areas and frame-projected inverse shape
    /// matrices.
    fn compute_rest_state(&mut self) -> WeftResult<()> {
        let tri_count = self.triangle_count();
        self.dm_inv = Vec::with_capacity(tri_count);
        self.rest_area = Vec::with_capacity(tri_count);

        for t in 0..tri_count {
            let [a, b, c] = self.triangle(t);
            let v0 = self.rest_position(a);
            let e1 = self.rest_position(b) - v0;
            let e2 = self.rest_position(c) - v0;

            let n = e1.cross(e2);
            let doubled_area = n.length();
            let area = 0.5 * doubled_area;
            if area <= 1e-12 {
                return Err(WeftError::InvalidMesh(format!(
                    "Triangle {} has degenerate rest area {}",
                    t, area
                )));
            }
            self.rest_area.push(area);

            // Local orthonormal frame: t1 along the first edge,
            // t2 completing it in the face plane.
            let t1 = e1 / e1.length();
            let t2 = (n / doubled_area).cross(t1);

            let dm = Mat2::from_cols(
                Vec2::new(e1.dot(t1), e1.dot(t2)),
                Vec2::new(e2.dot(t1), e2.dot(t2)),
            );
            let det = dm.determinant();
            if det.abs() <= 1e-14 {
                return Err(WeftError::InvalidMesh(format!(
                    "Triangle {} has a singular rest shape matrix",
                    t
                )));
            }
            let inv = dm.inverse();
            self.dm_inv
                .push([inv.col(0).x, inv.col(0).y, inv.col(1).x, inv.col(1).y]);
        }
        Ok(())
    }
}
