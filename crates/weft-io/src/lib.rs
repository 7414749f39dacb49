//! # weft-io
//!
//! Frame export for the Weft simulator. OBJ is the only format in
//! scope: write-only, for visualization — the core never reads it
//! back.

pub mod obj;

pub use obj::{write_obj, FrameWriter};
