//! Shell material record.

use serde::{Deserialize, Serialize};
use weft_types::{Scalar, WeftError, WeftResult};

/// Material parameters shared by every face of a mesh.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Material {
    /// Young's modulus E (Pa).
    pub youngs_modulus: Scalar,
    /// Poisson ratio ν.
    pub poisson_ratio: Scalar,
    /// Density ρ (kg/m³).
    pub density: Scalar,
    /// Shell thickness h (m).
    pub thickness: Scalar,
    /// Bending stiffness; zero disables the hinge model.
    pub bending_stiffness: Scalar,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            youngs_modulus: 1e6,
            poisson_ratio: 0.3,
            density: 1000.0,
            thickness: 0.001,
            bending_stiffness: 0.0,
        }
    }
}

impl Material {
    /// First Lamé shear parameter μ = E / (2(1+ν)).
    pub fn shear_modulus(&self) -> Scalar {
        self.youngs_modulus / (2.0 * (1.0 + self.poisson_ratio))
    }

    /// Areal density ρ·h (kg/m²), used for lumped vertex masses.
    pub fn areal_density(&self) -> Scalar {
        self.density * self.thickness
    }

    /// Checks physical admissibility.
    pub fn validate(&self) -> WeftResult<()> {
        if !(self.youngs_modulus > 0.0) {
            return Err(WeftError::InvalidMaterial(format!(
                "Young's modulus must be positive, got {}",
                self.youngs_modulus
            )));
        }
        if !(-1.0..0.5).contains(&self.poisson_ratio) {
            return Err(WeftError::InvalidMaterial(format!(
                "Poisson ratio must lie in [-1, 0.5), got {}",
                self.poisson_ratio
            )));
        }
        if !(self.density > 0.0) {
            return Err(WeftError::InvalidMaterial(format!(
                "density must be positive, got {}",
                self.density
            )));
        }
        if !(self.thickness > 0.0) {
            return Err(WeftError::InvalidMaterial(format!(
                "thickness must be positive, got {}",
                self.thickness
            )));
        }
        if self.bending_stiffness < 0.0 {
            return Err(WeftError::InvalidMaterial(format!(
                "bending stiffness must be non-negative, got {}",
                self.bending_stiffness
            )));
        }
        Ok(())
    }
}
