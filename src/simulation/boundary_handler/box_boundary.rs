use crate::{floating_type_mod::FT, V3};

use super::{BoundaryHandlerTrait, BoxBounds};

#[inline(always)]
fn upper_violated(bounds: &BoxBounds, position: &V3, d: usize) -> bool {
    position[d] + bounds.particle_radius > bounds.upper[d]
}

#[inline(always)]
fn lower_violated(bounds: &BoxBounds, position: &V3, d: usize) -> bool {
    position[d] - bounds.particle_radius < bounds.lower[d]
}

#[inline(always)]
fn reflect(bounds: &BoxBounds, position: &mut V3, velocity: &mut V3, d: usize, clamp_to: FT) {
    velocity[d] *= bounds.damping;
    position[d] = clamp_to;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllAxesBox {
    pub bounds: BoxBounds,
}

impl BoundaryHandlerTrait for AllAxesBox {
    fn bounds(&self) -> &BoxBounds {
        &self.bounds
    }

    fn resolve_collision(&self, position: &mut V3, velocity: &mut V3) -> bool {
        let b = &self.bounds;
        let mut collided = false;
        for d in 0..3 {
            if upper_violated(b, position, d) {
                reflect(b, position, velocity, d, b.upper[d] - b.particle_radius);
                collided = true;
            } else if lower_violated(b, position, d) {
                reflect(b, position, velocity, d, b.lower[d] + b.particle_radius);
                collided = true;
            }
        }
        collided
    }
}

/**
 * Reflects the velocity on at most one bound per call, checked in the order
 * x+, y+, z+, x-, y-, z-. The position is clamped on every violated axis so
 * the particle is inside the box after each call.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExclusiveAxisBox {
    pub bounds: BoxBounds,
}

impl BoundaryHandlerTrait for ExclusiveAxisBox {
    fn bounds(&self) -> &BoxBounds {
        &self.bounds
    }

    fn resolve_collision(&self, position: &mut V3, velocity: &mut V3) -> bool {
        let b = &self.bounds;
        let mut reflected = false;

        for d in 0..3 {
            if upper_violated(b, position, d) {
                if !reflected {
                    velocity[d] *= b.damping;
                    reflected = true;
                }
                position[d] = b.upper[d] - b.particle_radius;
            }
        }
        for d in 0..3 {
            if lower_violated(b, position, d) {
                if !reflected {
                    velocity[d] *= b.damping;
                    reflected = true;
                }
                position[d] = b.lower[d] + b.particle_radius;
            }
        }

        reflected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3f;

    fn unit_box() -> BoxBounds {
        BoxBounds {
            lower: vec3f(-1., -1., -1.),
            upper: vec3f(1., 1., 1.),
            particle_radius: 0.1,
            damping: -0.5,
        }
    }

    #[test]
    fn inside_particle_is_untouched() {
        let handler = AllAxesBox { bounds: unit_box() };
        let mut position = vec3f(0.2, -0.3, 0.89);
        let mut velocity = vec3f(1., 2., 3.);
        assert!(!handler.resolve_collision(&mut position, &mut velocity));
        assert_eq!(position, vec3f(0.2, -0.3, 0.89));
        assert_eq!(velocity, vec3f(1., 2., 3.));
    }

    #[test]
    fn upper_bound_reflects_and_damps() {
        let handler = AllAxesBox { bounds: unit_box() };
        let mut position = vec3f(0.95, 0., 0.);
        let mut velocity = vec3f(2., 1., 0.);
        assert!(handler.resolve_collision(&mut position, &mut velocity));
        assert_eq!(position.x, 1. - 0.1);
        assert_eq!(velocity, vec3f(-1., 1., 0.));
    }

    #[test]
    fn corner_penetration_all_axes() {
        let handler = AllAxesBox { bounds: unit_box() };
        let mut position = vec3f(1.5, -1.2, 0.);
        let mut velocity = vec3f(1., -4., 0.);
        handler.resolve_collision(&mut position, &mut velocity);
        assert_eq!(position, vec3f(0.9, -0.9, 0.));
        assert_eq!(velocity, vec3f(-0.5, 2., 0.));
        assert!(handler.bounds().contains(&position));
    }

    #[test]
    fn corner_penetration_first_match_only() {
        let handler = ExclusiveAxisBox { bounds: unit_box() };
        let mut position = vec3f(1.5, -1.2, 0.);
        let mut velocity = vec3f(1., -4., 0.);
        assert!(handler.resolve_collision(&mut position, &mut velocity));

        // both axes clamped, only x+ reflected
        assert_eq!(position, vec3f(0.9, -0.9, 0.));
        assert_eq!(velocity, vec3f(-0.5, -4., 0.));
        assert!(handler.bounds().contains(&position));

        // resting on the wall now, nothing left to resolve
        assert!(!handler.resolve_collision(&mut position, &mut velocity));
        assert_eq!(velocity, vec3f(-0.5, -4., 0.));
    }

    #[test]
    fn lower_bounds_reflect_when_no_upper_bound_is_violated() {
        let handler = ExclusiveAxisBox { bounds: unit_box() };
        let mut position = vec3f(0., -1.5, -0.95);
        let mut velocity = vec3f(0., -2., -1.);
        assert!(handler.resolve_collision(&mut position, &mut velocity));

        assert_eq!(position, vec3f(0., -0.9, -0.9));
        assert_eq!(velocity, vec3f(0., 1., -1.));
    }
}
