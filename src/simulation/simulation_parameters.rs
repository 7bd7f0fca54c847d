use crate::{error::ConfigError, floating_type_mod::FT, sph_kernels::KernelFamily, vec3f, V3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryMode {
    /// Every violated axis is clamped and reflected in the same step.
    AllAxes,

    /// Only the first violated bound (x+, y+, z+, x-, y-, z-) reflects the
    /// velocity. Positions are still clamped on every violated axis.
    ExclusiveFirstMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    /// Sequential all-pairs passes in index order.
    Scalar,

    /// Per-particle tasks distributed over the rayon thread pool.
    ParallelBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    // kernel support radius
    pub smoothing_radius: FT,
    // used for spawning and for the box collision
    pub particle_radius: FT,
    pub rest_density: FT,
    // EOS stiffness
    pub gas_constant: FT,
    pub viscosity: FT,
    pub particle_mass: FT,
    pub gravity: V3,
    // velocity factor on collision (negative: reflect and attenuate)
    pub damping: FT,
    pub box_size: V3,
    #[serde(default = "default_box_center")]
    pub box_center: V3,
    pub time_step: FT,

    #[serde(default = "default_kernel_family")]
    pub kernel_family: KernelFamily,
    #[serde(default = "default_boundary_mode")]
    pub boundary_mode: BoundaryMode,
    #[serde(default = "default_execution_strategy")]
    pub execution_strategy: ExecutionStrategy,
    // minimum number of particles per parallel task
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_box_center() -> V3 {
    V3::zeros()
}

fn default_kernel_family() -> KernelFamily {
    KernelFamily::Volumetric3d
}

fn default_boundary_mode() -> BoundaryMode {
    BoundaryMode::AllAxes
}

fn default_execution_strategy() -> ExecutionStrategy {
    ExecutionStrategy::ParallelBatch
}

fn default_batch_size() -> usize {
    100
}

impl Default for SimulationParams {
    /**
     * Water-like parameter set (support radius 4.57cm, 20g particles).
     *
     * The force pass does not divide the pressure term by the particle's own
     * density, so `gas_constant` and `viscosity` are per particle volume
     * (`particle_mass / rest_density`): 6e-5 and 0.07 here correspond to a
     * stiffness of 3 and a dynamic viscosity of 3.5.
     */
    fn default() -> Self {
        SimulationParams {
            smoothing_radius: 0.0457,
            particle_radius: 0.0136,
            rest_density: 998.29,
            gas_constant: 6.0e-5,
            viscosity: 0.07,
            particle_mass: 0.02,
            gravity: vec3f(0., -9.81, 0.),
            damping: -0.5,
            box_size: vec3f(0.4, 0.4, 0.4),
            box_center: default_box_center(),
            time_step: 0.005,
            kernel_family: default_kernel_family(),
            boundary_mode: default_boundary_mode(),
            execution_strategy: default_execution_strategy(),
            batch_size: default_batch_size(),
        }
    }
}

fn check_positive(field: &'static str, value: FT) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0. {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn check_non_negative(field: &'static str, value: FT) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0. {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn check_finite_vector(field: &'static str, v: &V3) -> Result<(), ConfigError> {
    if v.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field })
    }
}

fn check_range(field: &'static str, value: FT, min: FT, max: FT) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("smoothing_radius", self.smoothing_radius)?;
        check_positive("particle_mass", self.particle_mass)?;
        check_positive("time_step", self.time_step)?;
        check_positive("rest_density", self.rest_density)?;
        check_non_negative("particle_radius", self.particle_radius)?;
        check_non_negative("gas_constant", self.gas_constant)?;
        check_non_negative("viscosity", self.viscosity)?;
        check_range("damping", self.damping, -1., 0.)?;
        check_finite_vector("gravity", &self.gravity)?;
        check_finite_vector("box_size", &self.box_size)?;
        check_finite_vector("box_center", &self.box_center)?;

        let particle_diameter = 2. * self.particle_radius;
        for axis in 0..3 {
            if self.box_size[axis] <= particle_diameter {
                return Err(ConfigError::BoxTooSmall {
                    axis,
                    extent: self.box_size[axis],
                    particle_diameter,
                });
            }
        }

        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }

        Ok(())
    }

    pub fn box_min(&self) -> V3 {
        self.box_center - self.box_size * 0.5
    }

    pub fn box_max(&self) -> V3 {
        self.box_center + self.box_size * 0.5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    // extents of the volume that is filled with particles
    pub creation_size: V3,
    pub creation_center: V3,
    // lattice jitter in units of particle radius
    #[serde(default = "default_jitter")]
    pub jitter: FT,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_initial_velocity")]
    pub initial_velocity: V3,
}

fn default_jitter() -> FT {
    0.5
}

fn default_initial_velocity() -> V3 {
    V3::zeros()
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            creation_size: vec3f(0.2, 0.2, 0.2),
            creation_center: vec3f(0., 0.05, 0.),
            jitter: default_jitter(),
            seed: None,
            initial_velocity: default_initial_velocity(),
        }
    }
}

impl SceneConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("creation_size.x", self.creation_size.x)?;
        check_positive("creation_size.y", self.creation_size.y)?;
        check_positive("creation_size.z", self.creation_size.z)?;
        check_finite_vector("creation_center", &self.creation_center)?;
        check_finite_vector("initial_velocity", &self.initial_velocity)?;
        check_range("jitter", self.jitter, 0., 1.)?;
        Ok(())
    }

    /// The seeded lattice (including jitter) stays inside the creation volume,
    /// so the volume itself has to fit between the particle-radius walls.
    pub fn validate_within(&self, simulation_params: &SimulationParams) -> Result<(), ConfigError> {
        let r = simulation_params.particle_radius;
        let min = simulation_params.box_min() + V3::repeat(r);
        let max = simulation_params.box_max() - V3::repeat(r);
        let lower = self.creation_center - self.creation_size * 0.5;
        let upper = self.creation_center + self.creation_size * 0.5;

        for axis in 0..3 {
            if lower[axis] < min[axis] || upper[axis] > max[axis] {
                return Err(ConfigError::CreationOutsideBox {
                    axis,
                    lower: lower[axis],
                    upper: upper[axis],
                    min: min[axis],
                    max: max[axis],
                });
            }
        }
        Ok(())
    }
}

#[test]
fn default_parameters_are_valid() {
    SimulationParams::default().validate().unwrap();
    SceneConfig::default().validate().unwrap();
}

#[test]
fn invalid_parameters_are_rejected() {
    fn assert_rejected(field: &str, modify: impl Fn(&mut SimulationParams)) {
        let mut params = SimulationParams::default();
        modify(&mut params);
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains(field), "{} not mentioned in '{}'", field, err);
    }

    assert_rejected("smoothing_radius", |p| p.smoothing_radius = 0.);
    assert_rejected("smoothing_radius", |p| p.smoothing_radius = -0.1);
    assert_rejected("particle_mass", |p| p.particle_mass = 0.);
    assert_rejected("time_step", |p| p.time_step = 0.);
    assert_rejected("time_step", |p| p.time_step = -0.001);
    assert_rejected("time_step", |p| p.time_step = FT::NAN);
    assert_rejected("viscosity", |p| p.viscosity = -1.);
    assert_rejected("damping", |p| p.damping = 0.5);
    assert_rejected("damping", |p| p.damping = -1.5);

    let mut params = SimulationParams::default();
    params.box_size.y = params.particle_radius;
    assert!(matches!(params.validate(), Err(ConfigError::BoxTooSmall { axis: 1, .. })));

    let mut params = SimulationParams::default();
    params.gravity.z = FT::INFINITY;
    assert!(matches!(params.validate(), Err(ConfigError::NotFinite { field: "gravity" })));

    let mut params = SimulationParams::default();
    params.batch_size = 0;
    assert_eq!(params.validate(), Err(ConfigError::ZeroBatchSize));
}

#[test]
fn parameters_from_yaml() {
    let yaml = "
smoothing_radius: 0.1
particle_radius: 0.02
rest_density: 1000.0
gas_constant: 2.0
viscosity: 1.0
particle_mass: 0.5
gravity: [0.0, -9.81, 0.0]
damping: -0.5
box_size: [1.0, 2.0, 1.0]
time_step: 0.001
boundary_mode: ExclusiveFirstMatch
";
    let params: SimulationParams = serde_yaml::from_str(yaml).unwrap();
    params.validate().unwrap();
    assert_eq!(params.boundary_mode, BoundaryMode::ExclusiveFirstMatch);
    assert_eq!(params.kernel_family, KernelFamily::Volumetric3d);
    assert_eq!(params.box_center, V3::zeros());
    assert_eq!(params.box_max(), vec3f(0.5, 1.0, 0.5));
    assert_eq!(params.batch_size, 100);
}
