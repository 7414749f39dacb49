//! Positional constraints: pins and half-space walls.
//!
//! Both are persistent (authored once, borrowed read-only during a
//! step); contact constraints are rebuilt per step by the detection
//! pass and strain-limit constraints by the strain module.

use serde::{Deserialize, Serialize};
use weft_contact::WallPlane;
use weft_math::Vec3;
use weft_types::Scalar;

/// Pin constraint: hold a vertex inside a small leash ball around a
/// target position. The barrier runs on the remaining leash slack, so
/// the pull stiffens without bound as the vertex strays toward the
/// ball boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pin {
    /// Constrained vertex.
    pub vertex: usize,
    /// Target position (leash center).
    pub target: Vec3,
    /// Leash radius override (falls back to the contact gap width).
    pub gap: Option<Scalar>,
    /// Whether the pin participates in the solve.
    pub active: bool,
}

/// Wall constraint: keep every vertex inside the half-space
/// `n·x ≥ offset`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Wall {
    /// Unit outward normal of the feasible half-space.
    pub normal: Vec3,
    /// Plane offset along the normal.
    pub offset: Scalar,
    /// Whether the wall participates in the solve.
    pub active: bool,
}

impl Wall {
    /// View as the plane type the detection pass consumes.
    pub fn plane(&self) -> WallPlane {
        WallPlane {
            normal: self.normal,
            offset: self.offset,
        }
    }
}

/// Container for all persistent constraints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Constraints {
    pub pins: Vec<Pin>,
    pub walls: Vec<Wall>,
}

impl Constraints {
    /// Adds an active pin at the given target.
    pub fn add_pin(&mut self, vertex: usize, target: Vec3) {
        self.pins.push(Pin {
            vertex,
            target,
            gap: None,
            active: true,
        });
    }

    /// Adds an active wall. The normal is normalized on insertion.
    pub fn add_wall(&mut self, normal: Vec3, offset: Scalar) {
        let n = normal.normalize();
        self.walls.push(Wall {
            normal: n,
            offset,
            active: true,
        });
    }

    /// Active pins.
    pub fn active_pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(|p| p.active)
    }

    /// Active walls.
    pub fn active_walls(&self) -> impl Iterator<Item = &Wall> {
        self.walls.iter().filter(|w| w.active)
    }

    /// Planes of the active walls, for the detection pass.
    pub fn wall_planes(&self) -> Vec<WallPlane> {
        self.active_walls().map(|w| w.plane()).collect()
    }

    /// Number of active constraints of either kind.
    pub fn num_active(&self) -> usize {
        self.active_pins().count() + self.active_walls().count()
    }
}
