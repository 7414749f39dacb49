//! Wavefront OBJ export.
//!
//! Emits `v x y z` lines in state order followed by 1-indexed
//! `f i j k` lines for every triangle.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use weft_mesh::TriangleMesh;
use weft_solver::SimulationState;
use weft_types::WeftResult;

/// Writes one frame to `path`.
pub fn write_obj(path: &Path, mesh: &TriangleMesh, state: &SimulationState) -> WeftResult<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    for i in 0..state.vertex_count {
        writeln!(
            out,
            "v {} {} {}",
            state.pos_x[i], state.pos_y[i], state.pos_z[i]
        )?;
    }
    for t in 0..mesh.triangle_count() {
        let [a, b, c] = mesh.triangle(t);
        writeln!(out, "f {} {} {}", a + 1, b + 1, c + 1)?;
    }
    out.flush()?;
    Ok(())
}

/// Writes numbered frame sequences (`frame_0000.obj`, …) into a
/// directory.
pub struct FrameWriter {
    directory: PathBuf,
    next_frame: usize,
}

impl FrameWriter {
    /// Creates the output directory if needed.
    pub fn new(directory: impl Into<PathBuf>) -> WeftResult<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            next_frame: 0,
        })
    }

    /// Writes the next frame and returns its path.
    pub fn write_frame(
        &mut self,
        mesh: &TriangleMesh,
        state: &SimulationState,
    ) -> WeftResult<PathBuf> {
        let path = self
            .directory
            .join(format!("frame_{:04}.obj", self.next_frame));
        write_obj(&path, mesh, state)?;
        self.next_frame += 1;
        Ok(path)
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> usize {
        self.next_frame
    }
}
