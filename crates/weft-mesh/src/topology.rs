//! Derived connectivity: unique edges and interior-edge hinges.

use std::collections::HashMap;

use crate::mesh::TriangleMesh;

/// An undirected mesh edge, stored with `v0 < v1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub v0: usize,
    pub v1: usize,
}

/// A bending hinge: an interior edge plus the two opposite ("wing")
/// vertices of its incident faces.
#[derive(Debug, Clone, Copy)]
pub struct Hinge {
    pub v0: usize,
    pub v1: usize,
    pub wing_a: usize,
    pub wing_b: usize,
}

/// Connectivity derived from the triangle list.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// All unique edges.
    pub edges: Vec<Edge>,
    /// Interior edges with both wing vertices.
    pub hinges: Vec<Hinge>,
}

impl Topology {
    /// Extracts edges and hinges from a mesh.
    pub fn build(mesh: &TriangleMesh) -> Self {
        // Edge key -> (edge slot, wing of the first face seen).
        let mut edge_map: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
        let mut edges = Vec::new();
        let mut hinges = Vec::new();

        for t in 0..mesh.triangle_count() {
            let tri = mesh.triangle(t);
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                let wing = tri[(k + 2) % 3];
                let key = (a.min(b), a.max(b));
                match edge_map.get(&key) {
                    None => {
                        edge_map.insert(key, (edges.len(), wing));
                        edges.push(Edge {
                            v0: key.0,
                            v1: key.1,
                        });
                    }
                    Some(&(_, first_wing)) => {
                        // Second face on this edge: it is interior.
                        hinges.push(Hinge {
                            v0: key.0,
                            v1: key.1,
                            wing_a: first_wing,
                            wing_b: wing,
                        });
                    }
                }
            }
        }

        Self { edges, hinges }
    }
}
