use std::fmt;

use crate::{floating_type_mod::FT, sph_kernels::KernelFamily, V3};

/// Rejected simulation parameters or scene description.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Value must be finite and strictly positive.
    NotPositive { field: &'static str, value: FT },
    /// Value must be finite and not negative.
    Negative { field: &'static str, value: FT },
    NotFinite { field: &'static str },
    OutOfRange { field: &'static str, value: FT, min: FT, max: FT },
    /// The box cannot hold a single particle on the given axis.
    BoxTooSmall { axis: usize, extent: FT, particle_diameter: FT },
    ZeroBatchSize,
    /// The creation volume reaches beyond the box shrunk by the particle radius.
    CreationOutsideBox { axis: usize, lower: FT, upper: FT, min: FT, max: FT },
    /// The parameters select a different kernel family than the solver was built with.
    KernelFamilyMismatch { configured: KernelFamily, solver: KernelFamily },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotPositive { field, value } => {
                write!(f, "'{}' must be finite and positive (got {})", field, value)
            }
            ConfigError::Negative { field, value } => {
                write!(f, "'{}' must be finite and non-negative (got {})", field, value)
            }
            ConfigError::NotFinite { field } => write!(f, "'{}' contains a non-finite component", field),
            ConfigError::OutOfRange { field, value, min, max } => {
                write!(f, "'{}' must lie in [{}, {}] (got {})", field, min, max, value)
            }
            ConfigError::BoxTooSmall {
                axis,
                extent,
                particle_diameter,
            } => write!(
                f,
                "box extent {} on axis {} does not exceed the particle diameter {}",
                extent, axis, particle_diameter
            ),
            ConfigError::ZeroBatchSize => write!(f, "'batch_size' must be at least 1"),
            ConfigError::CreationOutsideBox {
                axis,
                lower,
                upper,
                min,
                max,
            } => write!(
                f,
                "creation volume [{}, {}] on axis {} is not inside the box interior [{}, {}]",
                lower, upper, axis, min, max
            ),
            ConfigError::KernelFamilyMismatch { configured, solver } => write!(
                f,
                "'kernel_family' is {:?} but the solver uses {:?} kernels",
                configured, solver
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleField {
    Position,
    Velocity,
    Force,
    Density,
    Pressure,
}

impl ParticleField {
    pub fn as_str_lowercase(&self) -> &'static str {
        match self {
            ParticleField::Position => "position",
            ParticleField::Velocity => "velocity",
            ParticleField::Force => "force",
            ParticleField::Density => "density",
            ParticleField::Pressure => "pressure",
        }
    }
}

/// Divergent simulation state found by [`crate::FluidSimulation::check_state`].
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    NonFiniteState { particle: usize, field: ParticleField },
    OutOfBounds { particle: usize, position: V3 },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::NonFiniteState { particle, field } => write!(
                f,
                "particle {} has a non-finite {} (simulation diverged)",
                particle,
                field.as_str_lowercase()
            ),
            SimulationError::OutOfBounds { particle, position } => write!(
                f,
                "particle {} left the bounding box: [{}, {}, {}]",
                particle, position.x, position.y, position.z
            ),
        }
    }
}

impl std::error::Error for SimulationError {}
