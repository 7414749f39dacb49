//! Procedural mesh generators for tests and benchmarks.
//!
//! Deterministic, resolution-configurable meshes with consistent
//! winding order.

use weft_math::Vec3;
use weft_types::{Scalar, WeftResult};

use crate::material::Material;
use crate::mesh::TriangleMesh;

/// Generates a flat rectangular quad grid in the XY plane.
///
/// The grid spans `[-width/2, width/2]` in X and `[-height/2, height/2]`
/// in Y, centered at the origin at Z=0.
///
/// Quads alternate their diagonal in a checkerboard pattern to avoid
/// structural anisotropy.
///
/// # Arguments
/// - `cols` — Number of quads along X (vertex count = cols + 1).
/// - `rows` — Number of quads along Y (vertex count = rows + 1).
/// - `width` / `height` — Total extent in meters.
pub fn quad_grid(
    cols: usize,
    rows: usize,
    width: Scalar,
    height: Scalar,
    material: Material,
) -> WeftResult<TriangleMesh> {
    let verts_x = cols + 1;
    let verts_y = rows + 1;

    let half_w = width / 2.0;
    let half_h = height / 2.0;

    let mut positions = Vec::with_capacity(verts_x * verts_y);
    for j in 0..verts_y {
        for i in 0..verts_x {
            let u = i as Scalar / cols as Scalar;
            let v = j as Scalar / rows as Scalar;
            positions.push(Vec3::new(-half_w + u * width, half_h - v * height, 0.0));
        }
    }

    let mut indices = Vec::with_capacity(cols * rows * 6);
    for j in 0..rows {
        for i in 0..cols {
            let top_left = (j * verts_x + i) as u32;
            let top_right = top_left + 1;
            let bot_left = top_left + verts_x as u32;
            let bot_right = bot_left + 1;

            if (i + j) % 2 == 0 {
                // Diagonal: top-left to bottom-right.
                indices.extend_from_slice(&[top_left, bot_left, top_right]);
                indices.extend_from_slice(&[top_right, bot_left, bot_right]);
            } else {
                // Diagonal: bottom-left to top-right.
                indices.extend_from_slice(&[top_left, bot_left, bot_right]);
                indices.extend_from_slice(&[top_left, bot_right, top_right]);
            }
        }
    }

    TriangleMesh::new(&positions, &indices, material)
}

/// A single right triangle at the origin in the XY plane. Handy for
/// unit tests that need the smallest valid mesh.
pub fn single_triangle(material: Material) -> WeftResult<TriangleMesh> {
    TriangleMesh::new(
        &[Vec3::ZERO, Vec3::X, Vec3::Y],
        &[0, 1, 2],
        material,
    )
}
