//! Isolated particle scenarios: self-density and the pure integrator.

use box_sph::{
    assert_ft_approx_eq,
    floating_type_mod::FT,
    particles::Particle,
    simulation_parameters::{ExecutionStrategy, SimulationParams},
    sph_kernels::{KernelFamily, Planar, SphKernels, Volumetric3d},
    vec3f, FluidSimulation, V3,
};

fn params(kernel_family: KernelFamily) -> SimulationParams {
    SimulationParams {
        kernel_family,
        execution_strategy: ExecutionStrategy::Scalar,
        ..SimulationParams::default()
    }
}

fn isolated_density<K: SphKernels>(kernel_family: KernelFamily) {
    let p = params(kernel_family);
    let h = p.smoothing_radius;

    // second particle exactly on the support radius: contributes nothing
    let mut sim = FluidSimulation::<K>::new(
        vec![Particle::at(V3::zeros()), Particle::at(vec3f(h, 0., 0.))],
        p,
        false,
    )
    .unwrap();
    sim.compute_density_pressure();

    let self_density = p.particle_mass * K::density(sim.kernel_constants(), 0.);
    for particle in sim.particles().iter() {
        assert_eq!(particle.density, self_density);
        assert_eq!(particle.pressure, p.gas_constant * (self_density - p.rest_density));
    }
}

#[test]
fn isolated_particle_density_is_self_term() {
    isolated_density::<Volumetric3d>(KernelFamily::Volumetric3d);
    isolated_density::<Planar>(KernelFamily::Planar);
}

#[test]
fn single_particle_free_fall() {
    let mut p = params(KernelFamily::Volumetric3d);
    p.time_step = 0.001;
    let position0 = vec3f(0.01, 0.02, -0.03);

    let mut sim = FluidSimulation::<Volumetric3d>::new(vec![Particle::at(position0)], p, false).unwrap();
    sim.single_step();

    let dt = p.time_step;
    let particle = &sim.particles()[0];

    assert_eq!(particle.force, p.gravity * p.particle_mass);
    for d in 0..3 {
        assert_ft_approx_eq(particle.velocity[d], dt * p.gravity[d], 1e-6, || format!("velocity[{}]", d));
        assert_ft_approx_eq(
            particle.position[d],
            position0[d] + dt * dt * p.gravity[d],
            1e-6,
            || format!("position[{}]", d),
        );
    }

    assert_eq!(sim.step_number, 1);
    assert_ft_approx_eq(sim.time, dt, 1e-9 as FT, || "time".to_string());
}

#[test]
fn launched_particle_is_clamped_into_corner() {
    let p = params(KernelFamily::Volumetric3d);
    let upper = p.box_max() - V3::repeat(p.particle_radius);

    let mut sim = FluidSimulation::<Volumetric3d>::new(
        vec![Particle::at(vec3f(0.15, 0.15, 0.15)).with_velocity(vec3f(100., 100., 100.))],
        p,
        false,
    )
    .unwrap();
    sim.single_step();

    let particle = &sim.particles()[0];
    assert_eq!(particle.position, upper);
    for d in 0..3 {
        assert!(particle.velocity[d] < 0., "velocity[{}] not reflected", d);
    }
    sim.check_state().unwrap();
}
