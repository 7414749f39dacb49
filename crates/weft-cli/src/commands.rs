//! CLI command implementations.

use serde::{Deserialize, Serialize};
use tracing::info;
use weft_io::FrameWriter;
use weft_math::Vec3;
use weft_mesh::generators::quad_grid;
use weft_mesh::{Material, Topology, TriangleMesh};
use weft_solver::adaptive::TimestepController;
use weft_solver::{step, Constraints, SimParams, SimulationState};
use weft_types::{Scalar, WeftError, WeftResult};

/// Cloth sheet description inside a scene file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClothSpec {
    /// Quads per side along X / Y.
    cols: usize,
    rows: usize,
    /// Physical extent in meters.
    width: Scalar,
    height: Scalar,
    /// World-space center of the sheet.
    center: [Scalar; 3],
}

/// Pin entry: vertex index plus target position.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PinSpec {
    vertex: usize,
    target: [Scalar; 3],
}

/// Wall entry: half-space `normal·x ≥ offset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WallSpec {
    normal: [Scalar; 3],
    offset: Scalar,
}

/// A complete TOML scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Scene {
    cloth: ClothSpec,
    #[serde(default)]
    material: Option<Material>,
    #[serde(default)]
    params: Option<SimParams>,
    #[serde(default)]
    pins: Vec<PinSpec>,
    #[serde(default)]
    walls: Vec<WallSpec>,
    /// Timesteps to run.
    steps: usize,
    /// Write every n-th frame (default every frame).
    #[serde(default = "default_stride")]
    frame_stride: usize,
    /// Output directory for OBJ frames.
    #[serde(default = "default_output")]
    output: String,
}

fn default_stride() -> usize {
    1
}

fn default_output() -> String {
    "frames".into()
}

fn load_scene(path: &str) -> WeftResult<Scene> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|e| WeftError::Serialization(e.to_string()))
}

fn build_scene(scene: &Scene) -> WeftResult<(TriangleMesh, Topology, SimulationState, Constraints)> {
    let material = scene.material.unwrap_or_default();
    let mut mesh = quad_grid(
        scene.cloth.cols,
        scene.cloth.rows,
        scene.cloth.width,
        scene.cloth.height,
        material,
    )?;
    // Shift the sheet to its world-space center.
    let [cx, cy, cz] = scene.cloth.center;
    for i in 0..mesh.vertex_count() {
        mesh.rest_x[i] += cx;
        mesh.rest_y[i] += cy;
        mesh.rest_z[i] += cz;
    }
    let topo = Topology::build(&mesh);
    let state = SimulationState::from_mesh(&mesh)?;

    let mut constraints = Constraints::default();
    for pin in &scene.pins {
        if pin.vertex >= mesh.vertex_count() {
            return Err(WeftError::InvalidConfig(format!(
                "pin vertex {} out of range",
                pin.vertex
            )));
        }
        constraints.add_pin(pin.vertex, Vec3::from_array(pin.target));
    }
    for wall in &scene.walls {
        constraints.add_wall(Vec3::from_array(wall.normal), wall.offset);
    }
    Ok((mesh, topo, state, constraints))
}

/// `weft simulate`: run a scene file and export frames.
pub fn simulate(scene_path: &str) -> WeftResult<()> {
    let scene = load_scene(scene_path)?;
    let params = scene.params.clone().unwrap_or_default();
    params.validate()?;

    let (mesh, topo, mut state, constraints) = build_scene(&scene)?;
    let mut writer = FrameWriter::new(&scene.output)?;
    writer.write_frame(&mesh, &state)?;

    // Δt shrinks on degraded steps and recovers toward the configured
    // value after a clean streak.
    let mut controller = TimestepController::new(params.dt);

    for frame in 0..scene.steps {
        let step_params = SimParams {
            dt: controller.dt(),
            ..params.clone()
        };
        let report = step(&mesh, &topo, &mut state, &constraints, &step_params)?;
        if !report.is_clean() {
            info!(
                frame,
                beta = report.beta,
                dt = step_params.dt,
                events = report.degradations.len(),
                "degraded step"
            );
        }
        controller.observe(&report);
        if (frame + 1) % scene.frame_stride == 0 {
            writer.write_frame(&mesh, &state)?;
        }
    }

    info!(
        frames = writer.frames_written(),
        output = %scene.output,
        "simulation finished"
    );
    Ok(())
}

/// `weft drape`: built-in demo — a pinned sheet falling onto a floor.
pub fn drape(resolution: usize, steps: usize, output: &str) -> WeftResult<()> {
    let material = Material {
        youngs_modulus: 1e6,
        bending_stiffness: 1e-4,
        ..Material::default()
    };
    let mut mesh = quad_grid(resolution, resolution, 1.0, 1.0, material)?;
    for i in 0..mesh.vertex_count() {
        mesh.rest_z[i] += 0.5;
    }
    let topo = Topology::build(&mesh);
    let mut state = SimulationState::from_mesh(&mesh)?;

    let mut constraints = Constraints::default();
    constraints.add_wall(Vec3::Z, 0.0);
    // Pin two adjacent corners so the sheet swings as it falls.
    constraints.add_pin(0, mesh.rest_position(0));
    constraints.add_pin(resolution, mesh.rest_position(resolution));

    let params = SimParams {
        dt: 0.005,
        wall_gap: 0.005,
        contact_gap_max: 0.005,
        ..SimParams::default()
    };

    let mut writer = FrameWriter::new(output)?;
    writer.write_frame(&mesh, &state)?;
    for frame in 0..steps {
        let report = step(&mesh, &topo, &mut state, &constraints, &params)?;
        if frame % 20 == 0 {
            let energy = weft_solver::diagnostics::measure(&mesh, &topo, &state, &[], &params);
            info!(
                frame,
                beta = report.beta,
                contacts = report.contact_count,
                kinetic = energy.kinetic,
                membrane = energy.membrane,
                "progress"
            );
        }
        writer.write_frame(&mesh, &state)?;
    }

    info!(frames = writer.frames_written(), output, "drape demo finished");
    Ok(())
}

/// `weft validate`: parse and sanity-check a scene without running.
pub fn validate(path: &str) -> WeftResult<()> {
    let scene = load_scene(path)?;
    if let Some(params) = &scene.params {
        params.validate()?;
    }
    if let Some(material) = &scene.material {
        material.validate()?;
    }
    let (mesh, _, _, constraints) = build_scene(&scene)?;
    println!(
        "scene ok: {} vertices, {} triangles, {} pins, {} walls, {} steps",
        mesh.vertex_count(),
        mesh.triangle_count(),
        constraints.pins.len(),
        constraints.walls.len(),
        scene.steps
    );
    Ok(())
}
