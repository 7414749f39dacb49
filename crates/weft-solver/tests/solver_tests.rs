//! Integration tests for weft-solver: solver-wide properties and
//! end-to-end stepping scenarios.

use weft_contact::{ContactKind, ContactPair};
use weft_math::Vec3;
use weft_mesh::generators::{quad_grid, single_triangle};
use weft_mesh::{Material, Topology, TriangleMesh};
use weft_solver::{line_search, step, Constraints, SimParams, SimulationState};
use weft_types::Scalar;

fn stiff_material() -> Material {
    Material {
        youngs_modulus: 1e8,
        ..Material::default()
    }
}

fn no_gravity(params: SimParams) -> SimParams {
    SimParams {
        gravity: [0.0, 0.0, 0.0],
        ..params
    }
}

/// Mesh with a single free vertex and no faces — the smallest state
/// the integrator accepts.
fn lone_vertex_mesh() -> TriangleMesh {
    TriangleMesh::new(&[Vec3::new(0.0, 0.0, 1.0)], &[], Material::default()).unwrap()
}

// ─── Scenario: rest stability ─────────────────────────────────

#[test]
fn resting_triangle_does_not_drift() {
    let mesh = single_triangle(Material::default()).unwrap();
    let topo = Topology::build(&mesh);
    let mut state = SimulationState::from_mesh(&mesh).unwrap();
    let params = no_gravity(SimParams {
        dt: 0.01,
        ..SimParams::default()
    });
    let constraints = Constraints::default();

    let rest: Vec<Scalar> = state.flatten_positions();
    for _ in 0..10 {
        let report = step(&mesh, &topo, &mut state, &constraints, &params).unwrap();
        assert!(report.beta >= 0.0 && report.beta <= 1.0);
    }
    let after = state.flatten_positions();
    let max_drift = rest
        .iter()
        .zip(&after)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, Scalar::max);
    assert!(max_drift < 1e-8, "rest drift {max_drift}");
}

// ─── Scenario: wall bounce ────────────────────────────────────

#[test]
fn falling_vertex_never_crosses_the_wall() {
    let mesh = lone_vertex_mesh();
    let topo = Topology::build(&mesh);
    let mut state = SimulationState::with_buffers(
        vec![0.0],
        vec![0.0],
        vec![1.0],
        vec![0.1],
    )
    .unwrap();
    state.vel_z[0] = -5.0;

    let mut constraints = Constraints::default();
    constraints.add_wall(Vec3::Z, 0.0);

    let params = no_gravity(SimParams {
        dt: 0.005,
        wall_gap: 0.1,
        ..SimParams::default()
    });

    for s in 0..40 {
        step(&mesh, &topo, &mut state, &constraints, &params).unwrap();
        assert!(
            state.pos_z[0] > 0.0,
            "vertex crossed the wall at step {s}: z = {}",
            state.pos_z[0]
        );
    }
    // The barrier layer caught the vertex well above the plane, and
    // no energy was created in the exchange.
    assert!(
        state.pos_z[0] > 0.05,
        "vertex should hover in the barrier layer, z = {}",
        state.pos_z[0]
    );
    assert!(
        state.vel_z[0].abs() <= 5.0 + 1e-6,
        "rebound gained energy: vz = {}",
        state.vel_z[0]
    );
}

// ─── Scenario: pinned swing ───────────────────────────────────

#[test]
fn pinned_triangle_pendulum_keeps_its_length() {
    // v0 and v2 pinned on the rotation axis, v1 swinging under
    // gravity one unit away. The stiff membrane keeps the distance.
    let mesh = TriangleMesh::new(
        &[Vec3::ZERO, Vec3::X, Vec3::Y],
        &[0, 1, 2],
        stiff_material(),
    )
    .unwrap();
    let topo = Topology::build(&mesh);
    let mut state = SimulationState::with_buffers(
        mesh.rest_x.clone(),
        mesh.rest_y.clone(),
        mesh.rest_z.clone(),
        vec![0.1; 3],
    )
    .unwrap();

    let mut constraints = Constraints::default();
    constraints.add_pin(0, Vec3::ZERO);
    constraints.add_pin(2, Vec3::Y);

    let params = SimParams {
        dt: 0.005,
        gravity: [0.0, 0.0, -9.81],
        ..SimParams::default()
    };

    let mut max_len: Scalar = 0.0;
    let mut min_len: Scalar = f64::MAX;
    let mut min_z: Scalar = f64::MAX;
    for _ in 0..400 {
        step(&mesh, &topo, &mut state, &constraints, &params).unwrap();
        let len = (state.position(1) - state.position(0)).length();
        max_len = max_len.max(len);
        min_len = min_len.min(len);
        min_z = min_z.min(state.pos_z[1]);
    }
    assert!(
        min_len > 0.9 && max_len < 1.1,
        "edge length left the 10% band: [{min_len}, {max_len}]"
    );
    // The pinned vertices stayed on their leashes.
    assert!(state.position(0).length() < 0.01);
    assert!((state.position(2) - Vec3::Y).length() < 0.01);
    // And the pendulum actually swung through the lower arc.
    assert!(
        min_z < -0.5,
        "free vertex should have swung down, lowest z = {min_z}"
    );
}

// ─── Scenario: cloth drape onto the floor ─────────────────────

#[test]
fn cloth_drapes_onto_the_floor_without_penetration() {
    let mesh = {
        let mut mesh = quad_grid(9, 9, 1.0, 1.0, Material::default()).unwrap();
        for i in 0..mesh.vertex_count() {
            mesh.rest_z[i] += 1.0;
        }
        mesh
    };
    let topo = Topology::build(&mesh);
    let mut state = SimulationState::from_mesh(&mesh).unwrap();

    let mut constraints = Constraints::default();
    constraints.add_wall(Vec3::Z, 0.0);

    let params = SimParams {
        dt: 0.01,
        gravity: [0.0, 0.0, -9.81],
        wall_gap: 0.01,
        ..SimParams::default()
    };

    for s in 0..200 {
        step(&mesh, &topo, &mut state, &constraints, &params).unwrap();
        for (i, &z) in state.pos_z.iter().enumerate() {
            assert!(z > 0.0, "vertex {i} penetrated the floor at step {s}: z = {z}");
        }
    }
    let mean_z: Scalar = state.pos_z.iter().sum::<Scalar>() / state.vertex_count as Scalar;
    assert!(
        mean_z > 0.0 && mean_z < 0.2,
        "cloth should rest on the floor, mean z = {mean_z}"
    );
}

// ─── Scenario: line-search rejection geometry ─────────────────

#[test]
fn closing_direction_is_cut_before_the_crossing() {
    // A vertex 1e-4 above a triangle, moving so the gap would reach
    // −1e-3 at a full step.
    let x = vec![
        0.25, 0.25, 1e-4, // p
        0.0, 0.0, 0.0, // a
        1.0, 0.0, 0.0, // b
        0.0, 1.0, 0.0, // c
    ];
    let mut direction = vec![0.0; 12];
    direction[2] = -1.1e-3;

    let pair = ContactPair {
        kind: ContactKind::PointTriangle,
        indices: [0, 1, 2, 3],
        gap: 1e-4,
        normal: Vec3::Z,
        witness_p: Vec3::new(0.25, 0.25, 1e-4),
        witness_q: Vec3::new(0.25, 0.25, 0.0),
        weights: [1.0, -0.5, -0.25, -0.25],
        active: true,
    };
    let params = SimParams {
        extension: 1.0,
        ..SimParams::default()
    };

    let alpha =
        line_search::feasible_alpha(&x, &direction, &[pair], &Constraints::default(), &params);
    assert!(alpha > 0.0);
    assert!(alpha < 0.11, "alpha {alpha} should stop before the crossing");
    let gap_after = 1e-4 + alpha * direction[2];
    assert!(gap_after > 0.0, "post-step gap {gap_after}");
}

// ─── Property: feasibility under random directions ────────────

struct Lcg(u64);

impl Lcg {
    fn next_unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 11) as f64) / ((1u64 << 53) as f64)
    }
    fn symmetric(&mut self) -> f64 {
        2.0 * self.next_unit() - 1.0
    }
}

#[test]
fn line_search_preserves_feasibility_for_random_directions() {
    let mut rng = Lcg(2024);
    let params = SimParams::default();

    for trial in 0..50 {
        // Random feasible point above the unit triangle.
        let gap = 1e-5 + rng.next_unit() * 5e-4;
        let px = 0.1 + 0.3 * rng.next_unit();
        let py = 0.1 + 0.3 * rng.next_unit();
        let x = vec![
            px, py, gap, //
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0,
        ];
        // Random direction, biased downward so many trials close the gap.
        let mut direction = vec![0.0; 12];
        for d in direction.iter_mut() {
            *d = 2e-3 * rng.symmetric();
        }
        direction[2] -= 2e-3 * rng.next_unit();

        let pair = ContactPair {
            kind: ContactKind::PointTriangle,
            indices: [0, 1, 2, 3],
            gap,
            normal: Vec3::Z,
            witness_p: Vec3::new(px, py, gap),
            witness_q: Vec3::new(px, py, 0.0),
            weights: [1.0, -0.4, -0.3, -0.3],
            active: true,
        };

        let alpha =
            line_search::feasible_alpha(&x, &direction, &[pair], &Constraints::default(), &params);

        // Evaluate the true distance at the committed point.
        let scale = alpha * params.extension;
        let at = |i: usize| {
            Vec3::new(
                x[3 * i] + scale * direction[3 * i],
                x[3 * i + 1] + scale * direction[3 * i + 1],
                x[3 * i + 2] + scale * direction[3 * i + 2],
            )
        };
        let hit = weft_contact::narrow::closest_point_triangle(at(0), at(1), at(2), at(3));
        assert!(
            hit.distance > 0.0,
            "trial {trial}: distance {} not positive after alpha {alpha}",
            hit.distance
        );
    }
}

// ─── Properties: β and velocity consistency ───────────────────

#[test]
fn beta_stays_in_unit_interval_and_velocities_match_displacement() {
    let mesh = {
        let mut mesh = quad_grid(3, 3, 0.5, 0.5, Material::default()).unwrap();
        for i in 0..mesh.vertex_count() {
            mesh.rest_z[i] += 0.2;
        }
        mesh
    };
    let topo = Topology::build(&mesh);
    let mut state = SimulationState::from_mesh(&mesh).unwrap();

    let mut constraints = Constraints::default();
    constraints.add_wall(Vec3::Z, 0.0);
    let params = SimParams {
        dt: 0.005,
        gravity: [0.0, 0.0, -9.81],
        wall_gap: 0.01,
        ..SimParams::default()
    };

    for _ in 0..30 {
        let x0 = state.flatten_positions();
        let report = step(&mesh, &topo, &mut state, &constraints, &params).unwrap();
        assert!((0.0..=1.0).contains(&report.beta), "beta {}", report.beta);

        if report.beta > 1e-6 {
            let x1 = state.flatten_positions();
            let v = state.flatten_velocities();
            for i in 0..x1.len() {
                let reconstructed = v[i] * report.beta * params.dt;
                let displacement = x1[i] - x0[i];
                assert!(
                    (reconstructed - displacement).abs()
                        <= 1e-12 * displacement.abs().max(1e-9),
                    "dof {i}: v·β·Δt = {reconstructed} vs Δx = {displacement}"
                );
            }
        }
    }
}

#[test]
fn identical_steps_are_bitwise_deterministic() {
    let run = || {
        let mesh = quad_grid(3, 3, 0.5, 0.5, Material::default()).unwrap();
        let topo = Topology::build(&mesh);
        let mut state = SimulationState::from_mesh(&mesh).unwrap();
        let params = SimParams {
            dt: 0.005,
            ..SimParams::default()
        };
        let constraints = Constraints::default();
        for _ in 0..5 {
            step(&mesh, &topo, &mut state, &constraints, &params).unwrap();
        }
        state.flatten_positions()
    };
    assert_eq!(run(), run());
}

// ─── Error handling ───────────────────────────────────────────

#[test]
fn penetrating_initial_state_is_step_fatal() {
    let mesh = lone_vertex_mesh();
    let topo = Topology::build(&mesh);
    let mut state =
        SimulationState::with_buffers(vec![0.0], vec![0.0], vec![-0.5], vec![0.1]).unwrap();
    let before = state.flatten_positions();

    let mut constraints = Constraints::default();
    constraints.add_wall(Vec3::Z, 0.0);
    let params = SimParams::default();

    let err = step(&mesh, &topo, &mut state, &constraints, &params);
    assert!(err.is_err(), "penetrating input must abort the step");
    // State untouched on failure.
    assert_eq!(state.flatten_positions(), before);
}

#[test]
fn non_finite_positions_are_step_fatal() {
    let mesh = single_triangle(Material::default()).unwrap();
    let topo = Topology::build(&mesh);
    let mut state = SimulationState::from_mesh(&mesh).unwrap();
    state.pos_x[1] = f64::NAN;

    let err = step(
        &mesh,
        &topo,
        &mut state,
        &Constraints::default(),
        &SimParams::default(),
    );
    assert!(err.is_err());
}

#[test]
fn invalid_params_are_rejected() {
    let mesh = single_triangle(Material::default()).unwrap();
    let topo = Topology::build(&mesh);
    let mut state = SimulationState::from_mesh(&mesh).unwrap();

    let params = SimParams {
        dt: -1.0,
        ..SimParams::default()
    };
    assert!(step(&mesh, &topo, &mut state, &Constraints::default(), &params).is_err());
}

// ─── Config round-trip ────────────────────────────────────────

#[test]
fn params_toml_roundtrip() {
    let params = SimParams {
        dt: 0.004,
        beta_max: 0.95,
        enable_friction: true,
        friction_mu: 0.25,
        ..SimParams::default()
    };
    let text = toml::to_string(&params).unwrap();
    let back: SimParams = toml::from_str(&text).unwrap();
    assert_eq!(back.dt, params.dt);
    assert_eq!(back.beta_max, params.beta_max);
    assert!(back.enable_friction);
    assert_eq!(back.friction_mu, params.friction_mu);
}

// ─── Optional models stay stable when enabled ─────────────────

#[test]
fn friction_and_strain_limiting_steps_run_clean() {
    let mesh = {
        let mut mesh = quad_grid(4, 4, 0.5, 0.5, Material::default()).unwrap();
        for i in 0..mesh.vertex_count() {
            mesh.rest_z[i] += 0.05;
        }
        mesh
    };
    let topo = Topology::build(&mesh);
    let mut state = SimulationState::from_mesh(&mesh).unwrap();
    let mut constraints = Constraints::default();
    constraints.add_wall(Vec3::Z, 0.0);

    let params = SimParams {
        dt: 0.005,
        gravity: [0.3, 0.0, -9.81],
        wall_gap: 0.02,
        enable_friction: true,
        enable_strain_limiting: true,
        ..SimParams::default()
    };

    for _ in 0..40 {
        step(&mesh, &topo, &mut state, &constraints, &params).unwrap();
        for &z in &state.pos_z {
            assert!(z > 0.0);
        }
    }
    for i in 0..state.vertex_count {
        assert!(state.position(i).is_finite());
    }
}

// ─── Diagnostics ──────────────────────────────────────────────

#[test]
fn energy_breakdown_tracks_kinetic_and_membrane_terms() {
    use weft_solver::diagnostics;

    let mesh = single_triangle(Material::default()).unwrap();
    let topo = Topology::build(&mesh);
    let mut state = SimulationState::from_mesh(&mesh).unwrap();
    state.vel_x[0] = 2.0;

    let params = SimParams::default();
    let breakdown = diagnostics::measure(&mesh, &topo, &state, &[], &params);
    let expected_kinetic = 0.5 * state.mass[0] * 4.0;
    assert!((breakdown.kinetic - expected_kinetic).abs() < 1e-12);
    assert!(breakdown.membrane.abs() < 1e-12);
    assert!(breakdown.barrier == 0.0);
    assert!(breakdown.total() >= breakdown.kinetic);
}
