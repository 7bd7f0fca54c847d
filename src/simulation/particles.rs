use std::ops::Index;

use nalgebra::zero;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::{
    floating_type_mod::{FT, TAU},
    simulation_parameters::SceneConfig,
    vec3f, V3,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub position: V3,
    pub velocity: V3,

    // net force of the current step, overwritten by the force pass
    pub force: V3,

    // overwritten by the density/pressure pass
    pub density: FT,
    // negative below rest density
    pub pressure: FT,
}

impl Particle {
    pub fn at(position: V3) -> Particle {
        Particle {
            position,
            velocity: zero(),
            force: zero(),
            density: 0.,
            pressure: 0.,
        }
    }

    pub fn with_velocity(mut self, velocity: V3) -> Particle {
        self.velocity = velocity;
        self
    }
}

/**
 * Flat, insertion ordered particle array. The length is fixed once the store
 * is built; particles refer to each other only by index.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    pub fn new(particles: Vec<Particle>) -> ParticleStore {
        ParticleStore { particles }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Particle> {
        self.particles.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    /// Read-only snapshot for a pass.
    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable view of all records. The length cannot change through it.
    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /**
     * Bulk write of one pass result. `values` must contain exactly one entry
     * per particle.
     */
    pub fn commit<X>(&mut self, values: Vec<X>, mut write: impl FnMut(&mut Particle, X)) {
        assert_eq!(values.len(), self.particles.len(), "pass output has wrong length");
        for (p, v) in self.particles.iter_mut().zip(values) {
            write(p, v);
        }
    }
}

impl Index<usize> for ParticleStore {
    type Output = Particle;

    fn index(&self, i: usize) -> &Particle {
        &self.particles[i]
    }
}

/// Uniform sample on the surface of the unit sphere.
pub fn random_on_unit_sphere<R: Rng>(rng: &mut R) -> V3 {
    let z: FT = rng.gen_range(-1.0..=1.0);
    let phi: FT = rng.gen_range(0.0..TAU);
    let r = (1. - z * z).max(0.).sqrt();
    vec3f(r * phi.cos(), r * phi.sin(), z)
}

/**
 * Fill the creation volume with a lattice of spacing `2 * particle_radius`.
 * Lattice index 0 (the lower face of the volume) is skipped on every axis so
 * that no particle starts on the border of the creation volume. Each lattice
 * point is displaced by a point on the sphere of radius
 * `jitter * particle_radius`.
 */
pub fn seed_particles<R: Rng>(scene: &SceneConfig, particle_radius: FT, rng: &mut R) -> Vec<Particle> {
    let spacing = 2. * particle_radius;
    if spacing <= 0. {
        return Vec::new();
    }

    let iters = scene.creation_size.map(|extent| (extent / spacing).round() as usize);
    let corner = scene.creation_center - scene.creation_size * 0.5;

    let mut particles = Vec::with_capacity(iters.iter().map(|&k| k.saturating_sub(1)).product());

    for x in 1..iters.x {
        for y in 1..iters.y {
            for z in 1..iters.z {
                let lattice_point = corner + vec3f(x as FT, y as FT, z as FT) * spacing;
                let offset = random_on_unit_sphere(rng) * (particle_radius * scene.jitter);
                particles.push(Particle::at(lattice_point + offset).with_velocity(scene.initial_velocity));
            }
        }
    }

    particles
}

pub fn scene_rng(scene: &SceneConfig) -> StdRng {
    match scene.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[test]
fn seeded_lattice_layout() {
    let scene = SceneConfig {
        creation_size: vec3f(1.0, 0.5, 0.5),
        creation_center: vec3f(0., 2., 0.),
        jitter: 0.5,
        seed: Some(7),
        initial_velocity: vec3f(0., -1., 0.),
    };
    let particle_radius = 0.05;

    let mut rng = scene_rng(&scene);
    let particles = seed_particles(&scene, particle_radius, &mut rng);

    // round(1.0/0.1)=10 and round(0.5/0.1)=5 lattice steps, index 0 skipped
    assert_eq!(particles.len(), 9 * 4 * 4);

    let lower = scene.creation_center - scene.creation_size * 0.5;
    let upper = scene.creation_center + scene.creation_size * 0.5;
    for p in &particles {
        for d in 0..3 {
            assert!(p.position[d] > lower[d]);
            assert!(p.position[d] < upper[d] + particle_radius);
        }
        assert_eq!(p.velocity, vec3f(0., -1., 0.));
        assert_eq!(p.density, 0.);
    }

    // perturbation is on the jitter sphere around the lattice point
    let first_lattice_point = lower + vec3f(0.1, 0.1, 0.1);
    let offset = (particles[0].position - first_lattice_point).norm();
    crate::assert_ft_approx_eq(offset, 0.025, 1e-5, || "jitter offset".to_string());

    // same seed, same state
    let again = seed_particles(&scene, particle_radius, &mut scene_rng(&scene));
    assert_eq!(particles, again);
}

#[test]
fn unit_sphere_samples_have_unit_length() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..1000 {
        let v = random_on_unit_sphere(&mut rng);
        crate::assert_ft_approx_eq(v.norm(), 1., 1e-5, || "|v|".to_string());
    }
}

#[test]
fn store_commit_writes_every_record() {
    let mut store = ParticleStore::new((0..5).map(|i| Particle::at(vec3f(i as FT, 0., 0.))).collect());
    store.commit((0..5).map(|i| i as FT * 2.).collect(), |p, d| p.density = d);
    assert_eq!(store.len(), 5);
    assert_eq!(store[3].density, 6.);
    assert_eq!(store.get(5), None);
}
