//! Integration tests for weft-contact.

use weft_contact::ccd::{toi_edge_edge, toi_point_triangle};
use weft_contact::{detect_contacts, ContactKind, WallPlane};
use weft_math::Vec3;
use weft_mesh::generators::quad_grid;
use weft_mesh::{Material, Topology, TriangleMesh};

fn soa(positions: &[Vec3]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    (
        positions.iter().map(|p| p.x).collect(),
        positions.iter().map(|p| p.y).collect(),
        positions.iter().map(|p| p.z).collect(),
    )
}

// ─── Detection Pipeline ───────────────────────────────────────

/// A vertex hovering above a separate triangle within the activation
/// distance must produce exactly one point-triangle pair.
#[test]
fn detects_point_triangle_proximity() {
    // Triangle in the XY plane plus a fourth lone vertex above it,
    // attached to a second triangle far away so the mesh is valid.
    let positions = [
        Vec3::ZERO,
        Vec3::X,
        Vec3::Y,
        Vec3::new(0.25, 0.25, 0.05),
        Vec3::new(5.0, 0.0, 0.05),
        Vec3::new(5.0, 1.0, 0.05),
    ];
    let mesh = TriangleMesh::new(&positions, &[0, 1, 2, 3, 4, 5], Material::default()).unwrap();
    let topo = Topology::build(&mesh);
    let (px, py, pz) = soa(&positions);

    let report = detect_contacts(&mesh, &topo, &px, &py, &pz, &[], 0.1, 0.1);
    assert!(report.is_clean());

    let pt: Vec<_> = report
        .contacts
        .iter()
        .filter(|c| c.kind == ContactKind::PointTriangle && c.indices[0] == 3)
        .collect();
    assert_eq!(pt.len(), 1);
    let c = &pt[0];
    assert!((c.gap - 0.05).abs() < 1e-9);
    assert!((c.normal - Vec3::Z).length() < 1e-9);
    // Distribution weights: +1 on the point, clamped barycentrics on
    // the face, summing to zero.
    let sum: f64 = c.weights.iter().sum();
    assert!(sum.abs() < 1e-9);
    assert_eq!(c.weights[0], 1.0);
}

#[test]
fn skips_incident_triangles() {
    let mesh = quad_grid(4, 4, 1.0, 1.0, Material::default()).unwrap();
    let topo = Topology::build(&mesh);
    let (px, py, pz) = soa(
        &(0..mesh.vertex_count())
            .map(|i| mesh.rest_position(i))
            .collect::<Vec<_>>(),
    );

    // A flat grid at rest: every vertex is near its incident faces
    // but none of those may produce contacts. Neighbouring faces
    // within the activation distance are fine as long as gaps stay
    // positive — for a flat grid coplanar neighbours have distance 0
    // only at shared vertices, which are filtered as incident.
    let report = detect_contacts(&mesh, &topo, &px, &py, &pz, &[], 1e-4, 1e-4);
    assert!(
        report
            .contacts
            .iter()
            .all(|c| c.kind != ContactKind::PointTriangle
                || !mesh
                    .triangle(0)
                    .contains(&(c.indices[0] as usize))),
    );
}

#[test]
fn wall_contacts_emitted_within_activation() {
    let positions = [Vec3::new(0.0, 0.0, 0.05), Vec3::new(1.0, 0.0, 0.5), Vec3::new(0.0, 1.0, 0.5)];
    let mesh = TriangleMesh::new(&positions, &[0, 1, 2], Material::default()).unwrap();
    let topo = Topology::build(&mesh);
    let (px, py, pz) = soa(&positions);
    let wall = WallPlane {
        normal: Vec3::Z,
        offset: 0.0,
    };

    let report = detect_contacts(&mesh, &topo, &px, &py, &pz, &[wall], 0.01, 0.1);
    let walls: Vec<_> = report
        .contacts
        .iter()
        .filter(|c| c.kind == ContactKind::PointWall)
        .collect();
    assert_eq!(walls.len(), 1);
    assert_eq!(walls[0].indices, [0, -1, -1, -1]);
    assert!((walls[0].gap - 0.05).abs() < 1e-12);
}

#[test]
fn penetrating_wall_vertex_is_reported_not_emitted() {
    let positions = [Vec3::new(0.0, 0.0, -0.01), Vec3::new(1.0, 0.0, 0.5), Vec3::new(0.0, 1.0, 0.5)];
    let mesh = TriangleMesh::new(&positions, &[0, 1, 2], Material::default()).unwrap();
    let topo = Topology::build(&mesh);
    let (px, py, pz) = soa(&positions);
    let wall = WallPlane {
        normal: Vec3::Z,
        offset: 0.0,
    };

    let report = detect_contacts(&mesh, &topo, &px, &py, &pz, &[wall], 0.01, 0.1);
    assert!(!report.is_clean());
    assert_eq!(report.penetrations.len(), 1);
    assert!(report
        .contacts
        .iter()
        .all(|c| c.kind != ContactKind::PointWall));
}

#[test]
fn edge_edge_pair_between_separated_strips() {
    // Two single-quad strips crossing at right angles, 0.02 apart.
    let positions = [
        // Strip A along X at z = 0.
        Vec3::new(-1.0, -0.1, 0.0),
        Vec3::new(1.0, -0.1, 0.0),
        Vec3::new(-1.0, 0.1, 0.0),
        Vec3::new(1.0, 0.1, 0.0),
        // Strip B along Y at z = 0.02.
        Vec3::new(-0.1, -1.0, 0.02),
        Vec3::new(0.1, -1.0, 0.02),
        Vec3::new(-0.1, 1.0, 0.02),
        Vec3::new(0.1, 1.0, 0.02),
    ];
    let indices = [0u32, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7];
    let mesh = TriangleMesh::new(&positions, &indices, Material::default()).unwrap();
    let topo = Topology::build(&mesh);
    let (px, py, pz) = soa(&positions);

    let report = detect_contacts(&mesh, &topo, &px, &py, &pz, &[], 0.05, 0.05);
    assert!(report.is_clean());
    assert!(
        report
            .contacts
            .iter()
            .any(|c| c.kind == ContactKind::EdgeEdge),
        "expected at least one edge-edge pair, got {:?}",
        report.contacts.iter().map(|c| c.kind).collect::<Vec<_>>()
    );
    for c in report
        .contacts
        .iter()
        .filter(|c| c.kind == ContactKind::EdgeEdge)
    {
        assert!(c.gap > 0.0);
        assert_eq!(c.weights, [0.5, 0.5, -0.5, -0.5]);
    }
}

// ─── CCD Contracts ────────────────────────────────────────────

/// The returned time must always be a strict lower bound: evaluating
/// the trajectory at the bound stays outside the margin.
#[test]
fn ccd_returns_safe_lower_bound() {
    let p0 = Vec3::new(0.2, 0.3, 0.4);
    let p1 = Vec3::new(0.2, 0.3, -0.6);
    let toi = toi_point_triangle(
        p0,
        p1,
        Vec3::ZERO,
        Vec3::ZERO,
        Vec3::X,
        Vec3::X,
        Vec3::Y,
        Vec3::Y,
        1e-3,
    );
    assert!(toi < 1.0);
    let at = p0 + (p1 - p0) * toi;
    assert!(at.z > 0.0, "z at toi {} is {}", toi, at.z);
}

#[test]
fn ccd_edge_edge_parallel_motion_is_free() {
    // Edges slide parallel, never approaching.
    let toi = toi_edge_edge(
        Vec3::new(-1.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(2.0, 0.0, 1.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        1e-3,
    );
    assert_eq!(toi, 1.0);
}
