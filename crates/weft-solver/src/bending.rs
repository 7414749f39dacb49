//! Discrete hinge bending.
//!
//! A quadratic spring on the bend angle of every interior edge. The
//! bend angle φ is the signed angle between the two face normals,
//! zero for a flat hinge; the rest angle is captured at mesh load so
//! curved rest shapes carry no spurious moment.
//!
//! Energy per hinge: `½·k_b·w·(φ − φ̄)²` with the discrete-shells
//! weight `w = 3‖ē‖²/(Āₐ + Ā_b)` from rest quantities. The Hessian
//! uses the Gauss-Newton form `k_b·w·(∇φ)(∇φ)ᵀ`, positive
//! semi-definite by construction.
//!
//! Active only when the material's `bending_stiffness` is positive.

use weft_math::{sparse::TripletBuffer, Mat3, Vec3};
use weft_mesh::{Topology, TriangleMesh};
use weft_types::Scalar;

/// Precomputed hinge element.
#[derive(Debug, Clone, Copy)]
pub struct HingeElement {
    pub v0: usize,
    pub v1: usize,
    pub wing_a: usize,
    pub wing_b: usize,
    /// Rest bend angle φ̄.
    pub rest_angle: Scalar,
    /// k_b times the discrete-shells rest weight.
    pub weight: Scalar,
}

/// All hinge elements of a mesh.
#[derive(Debug, Clone, Default)]
pub struct BendingElements {
    pub elements: Vec<HingeElement>,
}

impl BendingElements {
    /// Builds hinge elements from the mesh's interior edges. Returns
    /// an empty set when bending is disabled by the material.
    pub fn build(mesh: &TriangleMesh, topo: &Topology) -> Self {
        let k_b = mesh.material.bending_stiffness;
        if k_b <= 0.0 {
            return Self::default();
        }

        let rest = |i: usize| mesh.rest_position(i);
        let mut elements = Vec::with_capacity(topo.hinges.len());
        for hinge in &topo.hinges {
            let x0 = rest(hinge.v0);
            let x1 = rest(hinge.v1);
            let xa = rest(hinge.wing_a);
            let xb = rest(hinge.wing_b);

            let e = x1 - x0;
            let area_a = 0.5 * e.cross(xa - x0).length();
            let area_b = 0.5 * (xb - x0).cross(e).length();
            let denom = (area_a + area_b).max(1e-12);
            let weight = k_b * 3.0 * e.length_squared() / denom;

            let rest_angle = bend_angle(x0, x1, xa, xb).unwrap_or(0.0);
            elements.push(HingeElement {
                v0: hinge.v0,
                v1: hinge.v1,
                wing_a: hinge.wing_a,
                wing_b: hinge.wing_b,
                rest_angle,
                weight,
            });
        }
        Self { elements }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Total bending energy.
    pub fn energy(&self, x: &[Scalar]) -> Scalar {
        let mut total = 0.0;
        for elem in &self.elements {
            if let Some(phi) = hinge_angle(elem, x) {
                let d = phi - elem.rest_angle;
                total += 0.5 * elem.weight * d * d;
            }
        }
        total
    }

    /// Accumulates the bending gradient.
    pub fn accumulate_gradient(&self, x: &[Scalar], grad: &mut [Scalar]) {
        for elem in &self.elements {
            let Some((phi, dphi)) = hinge_angle_gradient(elem, x) else {
                continue;
            };
            let scale = elem.weight * (phi - elem.rest_angle);
            for (idx, g) in [elem.v0, elem.v1, elem.wing_a, elem.wing_b]
                .into_iter()
                .zip(dphi)
            {
                grad[3 * idx] += scale * g.x;
                grad[3 * idx + 1] += scale * g.y;
                grad[3 * idx + 2] += scale * g.z;
            }
        }
    }

    /// Accumulates the Gauss-Newton bending Hessian.
    pub fn accumulate_hessian(&self, x: &[Scalar], triplets: &mut TripletBuffer) {
        for elem in &self.elements {
            let Some((_, dphi)) = hinge_angle_gradient(elem, x) else {
                continue;
            };
            let ids = [elem.v0, elem.v1, elem.wing_a, elem.wing_b];
            for i in 0..4 {
                for j in 0..4 {
                    let block = outer(dphi[i] * elem.weight, dphi[j]);
                    triplets.push_block3(ids[i], ids[j], &block, 1e-14);
                }
            }
        }
    }
}

fn hinge_angle(elem: &HingeElement, x: &[Scalar]) -> Option<Scalar> {
    let p = |i: usize| Vec3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2]);
    bend_angle(p(elem.v0), p(elem.v1), p(elem.wing_a), p(elem.wing_b))
}

/// Signed bend angle between the faces (x0, x1, xa) and (x0, xb, x1):
/// zero when flat, positive when the wings fold toward the first
/// face's normal. Returns `None` for degenerate faces.
fn bend_angle(x0: Vec3, x1: Vec3, xa: Vec3, xb: Vec3) -> Option<Scalar> {
    let e = x1 - x0;
    let n1 = e.cross(xa - x0);
    let n2 = (xb - x0).cross(e);
    let e_len = e.length();
    if e_len < 1e-12 || n1.length_squared() < 1e-24 || n2.length_squared() < 1e-24 {
        return None;
    }
    let sin_term = n2.cross(n1).dot(e) / e_len;
    let cos_term = n1.dot(n2);
    Some(sin_term.atan2(cos_term))
}

/// Bend angle plus its gradient with respect to (v0, v1, wing_a,
/// wing_b). The per-wing gradients are the unnormalized face normals
/// scaled by edge length over squared normal length; the edge
/// endpoints take the complementary combinations so the gradients sum
/// to zero (translation invariance).
fn hinge_angle_gradient(elem: &HingeElement, x: &[Scalar]) -> Option<(Scalar, [Vec3; 4])> {
    let p = |i: usize| Vec3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2]);
    let x0 = p(elem.v0);
    let x1 = p(elem.v1);
    let xa = p(elem.wing_a);
    let xb = p(elem.wing_b);

    let e = x1 - x0;
    let e_len = e.length();
    let n1 = e.cross(xa - x0);
    let n2 = (xb - x0).cross(e);
    let n1_sq = n1.length_squared();
    let n2_sq = n2.length_squared();
    if e_len < 1e-12 || n1_sq < 1e-24 || n2_sq < 1e-24 {
        return None;
    }

    let phi = bend_angle(x0, x1, xa, xb)?;

    let da = n1 * (e_len / n1_sq);
    let db = n2 * (e_len / n2_sq);
    let d0 = n1 * ((xa - x1).dot(e) / (e_len * n1_sq)) + n2 * ((xb - x1).dot(e) / (e_len * n2_sq));
    let d1 = -(n1 * ((xa - x0).dot(e) / (e_len * n1_sq))) - n2 * ((xb - x0).dot(e) / (e_len * n2_sq));

    Some((phi, [d0, d1, da, db]))
}

#[inline]
fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(b.x * a, b.y * a, b.z * a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_mesh::generators::quad_grid;
    use weft_mesh::Material;

    fn bent_material() -> Material {
        Material {
            bending_stiffness: 1e-3,
            ..Material::default()
        }
    }

    fn rest_flat(mesh: &TriangleMesh) -> Vec<Scalar> {
        let mut x = Vec::new();
        for i in 0..mesh.vertex_count() {
            let p = mesh.rest_position(i);
            x.extend_from_slice(&[p.x, p.y, p.z]);
        }
        x
    }

    #[test]
    fn disabled_without_bending_stiffness() {
        let mesh = quad_grid(2, 2, 1.0, 1.0, Material::default()).unwrap();
        let topo = Topology::build(&mesh);
        let bending = BendingElements::build(&mesh, &topo);
        assert!(bending.is_empty());
    }

    #[test]
    fn flat_rest_mesh_has_zero_rest_angles_energy_and_gradient() {
        let mesh = quad_grid(3, 3, 1.0, 1.0, bent_material()).unwrap();
        let topo = Topology::build(&mesh);
        let bending = BendingElements::build(&mesh, &topo);
        assert!(!bending.is_empty());
        for elem in &bending.elements {
            assert!(elem.rest_angle.abs() < 1e-9);
            assert!(elem.weight > 0.0);
        }

        let x = rest_flat(&mesh);
        assert!(bending.energy(&x).abs() < 1e-15);
        let mut grad = vec![0.0; x.len()];
        bending.accumulate_gradient(&x, &mut grad);
        assert!(grad.iter().all(|g| g.abs() < 1e-12));
    }

    #[test]
    fn folding_raises_energy() {
        let mesh = quad_grid(1, 2, 1.0, 1.0, bent_material()).unwrap();
        let topo = Topology::build(&mesh);
        let bending = BendingElements::build(&mesh, &topo);

        let mut x = rest_flat(&mesh);
        // Lift one boundary row out of plane.
        for i in 0..mesh.vertex_count() {
            if mesh.rest_position(i).y > 0.4 {
                x[3 * i + 2] += 0.3;
            }
        }
        assert!(bending.energy(&x) > 0.0);
    }

    #[test]
    fn angle_gradient_matches_finite_difference() {
        let mesh = quad_grid(1, 2, 1.0, 1.0, bent_material()).unwrap();
        let topo = Topology::build(&mesh);
        let bending = BendingElements::build(&mesh, &topo);
        let elem = bending.elements[0];

        let mut x = rest_flat(&mesh);
        // Perturb out of flat so the angle is nonzero.
        x[3 * elem.wing_a + 2] += 0.1;

        let (_, dphi) = hinge_angle_gradient(&elem, &x).unwrap();
        let ids = [elem.v0, elem.v1, elem.wing_a, elem.wing_b];
        let eps = 1e-7;
        for (slot, &id) in ids.iter().enumerate() {
            for axis in 0..3 {
                let mut xp = x.clone();
                xp[3 * id + axis] += eps;
                let mut xm = x.clone();
                xm[3 * id + axis] -= eps;
                let numeric = (hinge_angle(&elem, &xp).unwrap() - hinge_angle(&elem, &xm).unwrap())
                    / (2.0 * eps);
                let analytic = dphi[slot][axis];
                assert!(
                    (numeric - analytic).abs() < 1e-5 * analytic.abs().max(1.0),
                    "slot {slot} axis {axis}: numeric {numeric} vs analytic {analytic}"
                );
            }
        }
    }

    #[test]
    fn angle_gradients_sum_to_zero() {
        let mesh = quad_grid(1, 2, 1.0, 1.0, bent_material()).unwrap();
        let topo = Topology::build(&mesh);
        let bending = BendingElements::build(&mesh, &topo);
        let elem = bending.elements[0];

        let mut x = rest_flat(&mesh);
        x[3 * elem.wing_b + 2] -= 0.2;
        let (_, dphi) = hinge_angle_gradient(&elem, &x).unwrap();
        let sum = dphi[0] + dphi[1] + dphi[2] + dphi[3];
        assert!(sum.length() < 1e-10, "gradient sum {sum:?}");
    }
}
