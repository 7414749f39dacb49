//! Integration tests for weft-io.

use weft_io::{write_obj, FrameWriter};
use weft_mesh::generators::single_triangle;
use weft_mesh::Material;
use weft_solver::SimulationState;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("weft_io_{name}_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn obj_layout_matches_expectation() {
    let mesh = single_triangle(Material::default()).unwrap();
    let state = SimulationState::from_mesh(&mesh).unwrap();
    let dir = temp_dir("layout");
    let path = dir.join("tri.obj");

    write_obj(&path, &mesh, &state).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let expected = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    assert_eq!(text, expected);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn frame_writer_numbers_sequentially() {
    let mesh = single_triangle(Material::default()).unwrap();
    let state = SimulationState::from_mesh(&mesh).unwrap();
    let dir = temp_dir("frames");

    let mut writer = FrameWriter::new(&dir).unwrap();
    let first = writer.write_frame(&mesh, &state).unwrap();
    let second = writer.write_frame(&mesh, &state).unwrap();

    assert!(first.ends_with("frame_0000.obj"));
    assert!(second.ends_with("frame_0001.obj"));
    assert_eq!(writer.frames_written(), 2);
    assert!(first.exists() && second.exists());

    std::fs::remove_dir_all(&dir).ok();
}
