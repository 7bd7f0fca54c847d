use crate::boundary_handler::{BoundaryHandler, BoundaryHandlerTrait};
use crate::concurrency::{for_each_particle_mut, map_particles, par_iter_reduce1};
use crate::error::{ConfigError, ParticleField, SimulationError};
use crate::particles::{scene_rng, seed_particles, Particle, ParticleStore};
use crate::simulation_parameters::{SceneConfig, SimulationParams};
use crate::sph_kernels::{KernelConstants, SphKernels};
use crate::{floating_type_mod::FT, V3};

use num_traits::Float;
use serde::Serialize;

use std::collections::HashMap;
use std::fmt::{Display, Write};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

#[derive(Clone)]
struct Counter {
    values: Vec<Duration>,
    last_start: Instant,
}
impl Counter {
    fn new() -> Self {
        Counter {
            last_start: Instant::now(),
            values: Vec::new(),
        }
    }

    fn begin(&mut self) {
        self.last_start = Instant::now();
    }

    fn end(&mut self) {
        self.values.push(Instant::now() - self.last_start);
    }

    fn avg(&self) -> Duration {
        if self.values.is_empty() {
            return Duration::ZERO;
        }
        self.values.iter().cloned().sum::<Duration>() / self.values.len() as u32
    }

    fn sum(&self) -> Duration {
        self.values.iter().cloned().sum::<Duration>()
    }
}

pub struct PerformanceCounters {
    counters: HashMap<&'static str, Counter>,
    enabled: bool,
}
impl PerformanceCounters {
    pub fn new(enabled: bool) -> PerformanceCounters {
        PerformanceCounters {
            counters: HashMap::default(),
            enabled,
        }
    }

    fn begin(&mut self, id: &'static str) {
        if self.enabled {
            self.counters.entry(id).or_insert_with(Counter::new).begin();
        }
    }

    fn end(&mut self, id: &'static str) {
        if self.enabled {
            if let Some(counter) = self.counters.get_mut(id) {
                counter.end();
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// densities at or below this value make a neighbor degenerate
pub const DENSITY_EPSILON: FT = FT::EPSILON;

// pairs closer than this fraction of h have no usable direction
pub const COINCIDENT_FRACTION: FT = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepDiagnostics {
    pub kinetic_energy: FT,
    pub min_density: FT,
    pub max_density: FT,
    pub avg_density: FT,
    pub max_speed: FT,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SkippedPairs {
    zero_density: usize,
    coincident: usize,
}
impl SkippedPairs {
    fn combine(self, other: SkippedPairs) -> SkippedPairs {
        SkippedPairs {
            zero_density: self.zero_density + other.zero_density,
            coincident: self.coincident + other.coincident,
        }
    }
}

/**
 * All-pairs SPH solver inside an axis-aligned box.
 *
 * One call of [`FluidSimulation::single_step`] runs the passes
 * density/pressure -> forces -> integration -> boundary. Every pass reads
 * the state committed by the previous one and commits its own output only
 * after all particles have been processed.
 */
pub struct FluidSimulation<K: SphKernels> {
    particles: ParticleStore,
    simulation_params: SimulationParams,
    kernel_constants: KernelConstants,
    boundary_handler: BoundaryHandler,

    pub time: FT,
    pub step_number: usize,

    pub pcounters: PerformanceCounters,

    _marker: PhantomData<K>,
}

impl<K: SphKernels> FluidSimulation<K> {
    pub fn new(
        particles: Vec<Particle>,
        simulation_params: SimulationParams,
        counters_enabled: bool,
    ) -> Result<Self, ConfigError> {
        Self::check_params(&simulation_params)?;

        info!(
            "init {} fluid particles ({:?} kernels, {:?})",
            particles.len(),
            K::FAMILY,
            simulation_params.execution_strategy
        );

        Ok(FluidSimulation {
            particles: ParticleStore::new(particles),
            kernel_constants: K::constants(simulation_params.smoothing_radius),
            boundary_handler: BoundaryHandler::from_params(&simulation_params),
            simulation_params,
            time: 0.,
            step_number: 0,
            pcounters: PerformanceCounters::new(counters_enabled),
            _marker: PhantomData::default(),
        })
    }

    /// Seed the creation volume of `scene` and build the solver.
    pub fn initialize(
        simulation_params: SimulationParams,
        scene: &SceneConfig,
        counters_enabled: bool,
    ) -> Result<Self, ConfigError> {
        scene.validate()?;
        Self::check_params(&simulation_params)?;
        scene.validate_within(&simulation_params)?;
        let mut rng = scene_rng(scene);
        let particles = seed_particles(scene, simulation_params.particle_radius, &mut rng);
        Self::new(particles, simulation_params, counters_enabled)
    }

    fn check_params(simulation_params: &SimulationParams) -> Result<(), ConfigError> {
        simulation_params.validate()?;
        if simulation_params.kernel_family != K::FAMILY {
            return Err(ConfigError::KernelFamilyMismatch {
                configured: simulation_params.kernel_family,
                solver: K::FAMILY,
            });
        }
        Ok(())
    }

    /// Replace the parameters between two steps.
    pub fn set_params(&mut self, simulation_params: SimulationParams) -> Result<(), ConfigError> {
        Self::check_params(&simulation_params)?;
        self.kernel_constants = K::constants(simulation_params.smoothing_radius);
        self.boundary_handler = BoundaryHandler::from_params(&simulation_params);
        self.simulation_params = simulation_params;
        Ok(())
    }

    pub fn params(&self) -> &SimulationParams {
        &self.simulation_params
    }

    pub fn kernel_constants(&self) -> &KernelConstants {
        &self.kernel_constants
    }

    pub fn particles(&self) -> &ParticleStore {
        &self.particles
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    #[inline(always)]
    fn calculate_particle_density(
        i: usize,
        particles: &[Particle],
        c: &KernelConstants,
        simulation_params: &SimulationParams,
    ) -> FT {
        let position_i = particles[i].position;

        // the self contribution (r = 0) is part of the sum
        let mut density_acc = 0.;
        for p in particles {
            let r2 = (position_i - p.position).norm_squared();
            if r2 < c.h2 {
                density_acc += K::density(c, r2);
            }
        }
        simulation_params.particle_mass * density_acc
    }

    pub fn compute_density_pressure(&mut self) {
        let simulation_params = self.simulation_params;
        let c = self.kernel_constants;
        let particles = self.particles.as_slice();

        let densities = map_particles(
            simulation_params.execution_strategy,
            simulation_params.batch_size,
            particles.len(),
            |i| Self::calculate_particle_density(i, particles, &c, &simulation_params),
        );

        self.particles.commit(densities, |p, density| {
            p.density = density;
            p.pressure = simulation_params.gas_constant * (density - simulation_params.rest_density);
        });
    }

    #[inline(always)]
    fn calculate_particle_force(
        i: usize,
        particles: &[Particle],
        c: &KernelConstants,
        simulation_params: &SimulationParams,
    ) -> (V3, SkippedPairs) {
        let mass = simulation_params.particle_mass;
        let p_i = &particles[i];
        let coincident_distance = COINCIDENT_FRACTION * c.h;

        let mut pressure_force = V3::zeros();
        let mut viscosity_acc = V3::zeros();
        let mut skipped = SkippedPairs::default();

        for (j, p_j) in particles.iter().enumerate() {
            if i == j {
                continue;
            }

            let x_ij = p_i.position - p_j.position;
            let r2 = x_ij.norm_squared();
            if r2 >= c.h2 {
                continue;
            }

            if !(p_j.density > DENSITY_EPSILON) {
                skipped.zero_density += 1;
                continue;
            }

            let r = r2.sqrt();

            // -m (p_i + p_j) / (2 rho_j) * grad W, with grad W = W'(r) * x_ij / r
            if r > coincident_distance {
                let magnitude = mass * (p_i.pressure + p_j.pressure) / (2. * p_j.density) * K::pressure_gradient(c, r);
                pressure_force -= (x_ij / r) * magnitude;
            } else {
                skipped.coincident += 1;
            }

            viscosity_acc += (p_j.velocity - p_i.velocity)
                * (simulation_params.viscosity * mass / p_j.density * K::viscosity_laplacian(c, r));
        }

        let viscosity_force = if p_i.density > DENSITY_EPSILON {
            viscosity_acc / p_i.density
        } else {
            V3::zeros()
        };

        (simulation_params.gravity * mass + pressure_force + viscosity_force, skipped)
    }

    pub fn compute_forces(&mut self) {
        let simulation_params = self.simulation_params;
        let c = self.kernel_constants;
        let particles = self.particles.as_slice();

        let forces = map_particles(
            simulation_params.execution_strategy,
            simulation_params.batch_size,
            particles.len(),
            |i| Self::calculate_particle_force(i, particles, &c, &simulation_params),
        );

        let skipped = forces
            .iter()
            .fold(SkippedPairs::default(), |acc, (_, s)| acc.combine(*s));
        if skipped != SkippedPairs::default() {
            warn!(
                "step {}: skipped {} zero-density and {} coincident neighbor pairs in force pass",
                self.step_number, skipped.zero_density, skipped.coincident
            );
        }

        self.particles.commit(forces, |p, (force, _)| p.force = force);
    }

    /// Semi-implicit Euler: the updated velocity moves the particle.
    pub fn integrate(&mut self) {
        let simulation_params = self.simulation_params;
        let dt = simulation_params.time_step;
        let inv_mass = 1. / simulation_params.particle_mass;

        for_each_particle_mut(
            simulation_params.execution_strategy,
            simulation_params.batch_size,
            self.particles.as_mut_slice(),
            |_, p| {
                p.velocity += p.force * (dt * inv_mass);
                p.position += p.velocity * dt;
            },
        );
    }

    /// Returns the number of particles that touched the box in this pass.
    pub fn resolve_boundaries(&mut self) -> usize {
        let simulation_params = self.simulation_params;
        let boundary_handler = &self.boundary_handler;
        let collisions = AtomicUsize::new(0);

        for_each_particle_mut(
            simulation_params.execution_strategy,
            simulation_params.batch_size,
            self.particles.as_mut_slice(),
            |_, p| {
                if boundary_handler.resolve_collision(&mut p.position, &mut p.velocity) {
                    collisions.fetch_add(1, Ordering::Relaxed);
                }
            },
        );

        collisions.into_inner()
    }

    pub fn single_step(&mut self) {
        self.pcounters.begin("simulation-step");

        self.pcounters.begin("density-pressure");
        self.compute_density_pressure();
        self.pcounters.end("density-pressure");

        self.pcounters.begin("forces");
        self.compute_forces();
        self.pcounters.end("forces");

        self.pcounters.begin("integrate");
        self.integrate();
        self.pcounters.end("integrate");

        self.pcounters.begin("boundary");
        let collisions = self.resolve_boundaries();
        self.pcounters.end("boundary");

        self.pcounters.end("simulation-step");

        self.time += self.simulation_params.time_step;
        self.step_number += 1;

        if tracing::enabled!(tracing::Level::DEBUG) {
            let d = self.diagnostics();
            debug!(
                "step {:05} t={:.4}: {} boundary contacts, ekin={:.6} density=[{:.3}, {:.3}] avg={:.3} vmax={:.4}",
                self.step_number,
                self.time,
                collisions,
                d.kinetic_energy,
                d.min_density,
                d.max_density,
                d.avg_density,
                d.max_speed
            );
        }
    }

    pub fn diagnostics(&self) -> StepDiagnostics {
        let mass = self.simulation_params.particle_mass;
        let n = self.particles.len();

        let (kinetic_energy, min_density, max_density, density_sum, max_speed) = par_iter_reduce1(
            self.particles.as_slice(),
            || (0., FT::INFINITY, FT::NEG_INFINITY, 0., 0.),
            |a, b| (a.0 + b.0, a.1.min(b.1), a.2.max(b.2), a.3 + b.3, a.4.max(b.4)),
            |_, p| {
                let v2 = p.velocity.norm_squared();
                (0.5 * mass * v2, p.density, p.density, p.density, v2.sqrt())
            },
        );

        StepDiagnostics {
            kinetic_energy,
            min_density: if n > 0 { min_density } else { 0. },
            max_density: if n > 0 { max_density } else { 0. },
            avg_density: if n > 0 { density_sum / n as FT } else { 0. },
            max_speed,
        }
    }

    /**
     * Detect divergence of the simulation state: any non-finite field, or a
     * particle outside of the box. The solver does not repair such a state.
     */
    pub fn check_state(&self) -> Result<(), SimulationError> {
        fn finite(v: &V3) -> bool {
            v.iter().all(|x| x.is_finite())
        }

        for (i, p) in self.particles.iter().enumerate() {
            let field = if !finite(&p.position) {
                Some(ParticleField::Position)
            } else if !finite(&p.velocity) {
                Some(ParticleField::Velocity)
            } else if !finite(&p.force) {
                Some(ParticleField::Force)
            } else if !p.density.is_finite() {
                Some(ParticleField::Density)
            } else if !p.pressure.is_finite() {
                Some(ParticleField::Pressure)
            } else {
                None
            };

            if let Some(field) = field {
                return Err(SimulationError::NonFiniteState { particle: i, field });
            }
        }

        let bounds = self.boundary_handler.bounds();
        for (i, p) in self.particles.iter().enumerate() {
            if !bounds.contains(&p.position) {
                return Err(SimulationError::OutOfBounds {
                    particle: i,
                    position: p.position,
                });
            }
        }

        Ok(())
    }
}

pub fn write_statistics<K: SphKernels>(fluid_simulation: &FluidSimulation<K>) -> String {
    let mut s = String::new();

    let pcounters = &fluid_simulation.pcounters;
    if !pcounters.is_enabled() {
        return s;
    }

    let simulation_time = pcounters
        .counters
        .get("simulation-step")
        .map(|c| c.sum())
        .unwrap_or_default();

    writeln!(
        s,
        "{} particles, {} steps, {:.4}s simulated",
        fluid_simulation.num_particles(),
        fluid_simulation.step_number,
        fluid_simulation.time
    )
    .ok();
    writeln!(s, "simulation-time: {}ms", simulation_time.as_secs_f64() * 1000.).ok();
    writeln!(s).ok();

    let mut v = pcounters.counters.iter().collect::<Vec<_>>();
    v.sort_by(|x, y| x.0.cmp(y.0));
    for (label, pcounter) in v {
        writeln!(s, "{}: avg:{}ms", label, pcounter.avg().as_secs_f64() * 1000.).ok();
    }

    s
}

pub fn is_ft_approx_eq<FT: Float>(a: FT, b: FT, tolerance: FT) -> bool {
    assert!(!a.is_nan());
    assert!(!b.is_nan());
    b <= a + tolerance && b >= a - tolerance
}

pub fn assert_ft_approx_eq<FT: Float + Display>(a: FT, b: FT, tolerance: FT, s: impl FnOnce() -> String) {
    if !is_ft_approx_eq(a, b, tolerance) {
        panic!(
            "{} value not equal with a tolerance of {}:\n\ta={}\n\tb={}\n",
            s(),
            tolerance,
            a,
            b
        );
    }
}
