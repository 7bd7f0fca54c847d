//! Two-particle symmetry tests.
//!
//! Pairwise pressure and viscosity forces must be equal and opposite, and the
//! pressure force has to vanish exactly at rest density.

use box_sph::{
    particles::Particle,
    simulation_parameters::{ExecutionStrategy, SimulationParams},
    sph_kernels::Volumetric3d,
    vec3f, FluidSimulation, V3,
};

fn params() -> SimulationParams {
    SimulationParams {
        gravity: V3::zeros(),
        execution_strategy: ExecutionStrategy::Scalar,
        ..SimulationParams::default()
    }
}

/// Two particles separated by `0.5 * h` along the x-axis.
fn setup_two_particles(simulation_params: SimulationParams, velocity1: V3) -> FluidSimulation<Volumetric3d> {
    let h = simulation_params.smoothing_radius;
    FluidSimulation::new(
        vec![
            Particle::at(V3::zeros()),
            Particle::at(vec3f(0.5 * h, 0., 0.)).with_velocity(velocity1),
        ],
        simulation_params,
        false,
    )
    .unwrap()
}

#[test]
fn pressure_forces_equal_and_opposite() {
    let mut p = params();
    p.viscosity = 0.;
    // far below the pair density, so both pressures are positive
    p.rest_density = 1.;

    let mut sim = setup_two_particles(p, V3::zeros());
    sim.compute_density_pressure();
    sim.compute_forces();

    let a = sim.particles()[0];
    let b = sim.particles()[1];
    assert_eq!(a.density, b.density);
    assert!(a.pressure > 0.);

    let tol = 1e-6 * a.force.norm();
    assert!((a.force + b.force).norm() <= tol, "forces not opposite: {} {}", a.force, b.force);
    assert!((a.force.norm() - b.force.norm()).abs() <= tol);

    // repulsive and directed along the line between the centers
    assert!(a.force.x < 0.);
    assert!(b.force.x > 0.);
    assert_eq!(a.force.y, 0.);
    assert_eq!(a.force.z, 0.);
}

#[test]
fn negative_pressure_attracts() {
    let mut p = params();
    p.viscosity = 0.;
    p.rest_density = 1.0e6;

    let mut sim = setup_two_particles(p, V3::zeros());
    sim.compute_density_pressure();
    sim.compute_forces();

    assert!(sim.particles()[0].pressure < 0.);
    assert!(sim.particles()[0].force.x > 0.);
    assert!(sim.particles()[1].force.x < 0.);
}

#[test]
fn rest_density_gives_zero_pressure_force() {
    // measure the pair density first
    let mut probe = setup_two_particles(params(), V3::zeros());
    probe.compute_density_pressure();
    let pair_density = probe.particles()[0].density;

    let mut p = params();
    p.rest_density = pair_density;

    let mut sim = setup_two_particles(p, vec3f(0., 1., 0.));
    sim.compute_density_pressure();
    for particle in sim.particles().iter() {
        assert_eq!(particle.density, pair_density);
        assert_eq!(particle.pressure, 0.);
    }

    sim.compute_forces();
    let a = sim.particles()[0];
    let b = sim.particles()[1];

    // only viscosity remains: drags particle 0 along +y, particle 1 along -y
    assert_eq!(a.force.x, 0.);
    assert_eq!(b.force.x, 0.);
    assert!(a.force.y > 0.);
    assert!(b.force.y < 0.);
    assert!((a.force + b.force).norm() <= 1e-6 * a.force.norm());
}

#[test]
fn equal_velocities_give_no_viscosity_force() {
    let mut probe = setup_two_particles(params(), V3::zeros());
    probe.compute_density_pressure();

    let mut p = params();
    p.rest_density = probe.particles()[0].density;

    let velocity = vec3f(0.3, -0.2, 0.1);
    let mut sim = FluidSimulation::<Volumetric3d>::new(
        vec![
            Particle::at(V3::zeros()).with_velocity(velocity),
            Particle::at(vec3f(0.5 * p.smoothing_radius, 0., 0.)).with_velocity(velocity),
        ],
        p,
        false,
    )
    .unwrap();
    sim.compute_density_pressure();
    sim.compute_forces();

    for particle in sim.particles().iter() {
        assert_eq!(particle.force, V3::zeros());
    }
}
