use crate::{
    floating_type_mod::FT,
    simulation_parameters::{BoundaryMode, SimulationParams},
    V3,
};

mod box_boundary;

use enum_dispatch::enum_dispatch;
pub use box_boundary::{AllAxesBox, ExclusiveAxisBox};

/// Closed axis-aligned box shrunk by the particle radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxBounds {
    pub lower: V3,
    pub upper: V3,
    pub particle_radius: FT,
    pub damping: FT,
}

impl BoxBounds {
    pub fn from_params(simulation_params: &SimulationParams) -> BoxBounds {
        BoxBounds {
            lower: simulation_params.box_min(),
            upper: simulation_params.box_max(),
            particle_radius: simulation_params.particle_radius,
            damping: simulation_params.damping,
        }
    }

    /// Inclusive test, accounting for the particle radius (up to rounding of the clamp).
    pub fn contains(&self, position: &V3) -> bool {
        (0..3).all(|d| {
            let eps = 16. * FT::EPSILON * FT::max(1., FT::max(self.lower[d].abs(), self.upper[d].abs()));
            position[d] - self.particle_radius >= self.lower[d] - eps
                && position[d] + self.particle_radius <= self.upper[d] + eps
        })
    }
}

#[enum_dispatch]
pub trait BoundaryHandlerTrait {
    fn bounds(&self) -> &BoxBounds;

    /**
     * Clamp the position back into the box and reflect the velocity component
     * of every handled axis by the damping factor. Returns whether the
     * particle touched the boundary.
     */
    fn resolve_collision(&self, position: &mut V3, velocity: &mut V3) -> bool;
}

#[enum_dispatch(BoundaryHandlerTrait)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryHandler {
    AllAxesBox(AllAxesBox),
    ExclusiveAxisBox(ExclusiveAxisBox),
}

impl BoundaryHandler {
    pub fn from_params(simulation_params: &SimulationParams) -> BoundaryHandler {
        let bounds = BoxBounds::from_params(simulation_params);
        match simulation_params.boundary_mode {
            BoundaryMode::AllAxes => AllAxesBox { bounds }.into(),
            BoundaryMode::ExclusiveFirstMatch => ExclusiveAxisBox { bounds }.into(),
        }
    }
}
