use std::{collections::HashMap, path::Path, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

use box_sph::{
    simulation_parameters::{SceneConfig, SimulationParams},
    sph_kernels::{KernelFamily, Planar, SphKernels, Volumetric3d},
    write_statistics, FluidSimulation,
};

use super::snapshot_exporter::SnapshotExporter;

const CARGO_PKG_AUTHORS: &'static str = env!("CARGO_PKG_AUTHORS");
const CARGO_PKG_VERSION: &'static str = env!("CARGO_PKG_VERSION");
const CARGO_PKG_DESCRIPTION: &'static str = env!("CARGO_PKG_DESCRIPTION");

pub fn start() -> Result<()> {
    let matches = App::new("Box SPH Simulation")
        .version(CARGO_PKG_VERSION)
        .author(CARGO_PKG_AUTHORS)
        .about(CARGO_PKG_DESCRIPTION)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(
            SubCommand::with_name("run")
                .about("Run simulation with given config")
                .arg(
                    Arg::with_name("SIMULATION_CONFIG")
                        .help("Sets the simulation paramaters")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("SCENE_CONFIG")
                        .help("Scene setup")
                        .required(true)
                        .index(2),
                )
                .arg(
                    Arg::with_name("STEPS")
                        .long("steps")
                        .short("n")
                        .takes_value(true)
                        .default_value("1000")
                        .help("Number of fixed time steps to simulate"),
                )
                .arg(
                    Arg::with_name("OVERWRITE_CONFIG_FILE")
                        .long("overwrite-config-file")
                        .short("c")
                        .required(false)
                        .takes_value(true)
                        .help("Overwrite config"),
                )
                .arg(
                    Arg::with_name("STATISTICS_ENABLED")
                        .help("Track performance of individual passes")
                        .short("p")
                        .long("statistics-enabled")
                        .takes_value(false),
                )
                .arg(
                    Arg::with_name("STATISTICS_PATH")
                        .long("statistics-path")
                        .short("w")
                        .required(false)
                        .takes_value(true)
                        .help("Where to write statistics to"),
                )
                .arg(
                    Arg::with_name("SNAPSHOT_DIR")
                        .long("snapshot-dir")
                        .short("o")
                        .required(false)
                        .takes_value(true)
                        .help("Write particle snapshots (YAML) into this folder"),
                )
                .arg(
                    Arg::with_name("SNAPSHOT_EVERY")
                        .long("snapshot-every")
                        .takes_value(true)
                        .default_value("0")
                        .help("Snapshot interval in steps (0: only the final state)"),
                )
                .arg(
                    Arg::with_name("LOG_EVERY")
                        .long("log-every")
                        .takes_value(true)
                        .default_value("100")
                        .help("Log progress every N steps"),
                ),
        )
        .subcommand(SubCommand::with_name("print-default-config").about("Print default simulation parameters as YAML"))
        .get_matches();

    init_logging(matches.occurrences_of("v"));

    if let Some(run_matches) = matches.subcommand_matches("run") {
        let simulation_params = load_simulation_params(run_matches)?;
        tracing::info!("{:?}", simulation_params);

        let scene_file_path = run_matches.value_of("SCENE_CONFIG").context("missing scene config")?;
        let scene_yaml = std::fs::read_to_string(scene_file_path)
            .with_context(|| format!("failed reading scene file {}", scene_file_path))?;
        let scene_config: SceneConfig =
            serde_yaml::from_str(&scene_yaml).context("failed parsing scene config file")?;
        tracing::info!("{:?}", scene_config);

        let run_config = RunConfig::from_matches(run_matches)?;

        match simulation_params.kernel_family {
            KernelFamily::Volumetric3d => fluid_main::<Volumetric3d>(simulation_params, &scene_config, &run_config),
            KernelFamily::Planar => fluid_main::<Planar>(simulation_params, &scene_config, &run_config),
        }
    } else if matches.subcommand_matches("print-default-config").is_some() {
        let yaml = serde_yaml::to_string(&SimulationParams::default()).context("failed serializing parameters")?;
        print!("{}", yaml);
        Ok(())
    } else {
        unreachable!()
    }
}

fn init_logging(verbosity: u64) {
    let level = match verbosity {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();
}

fn load_simulation_params(run_matches: &ArgMatches) -> Result<SimulationParams> {
    let parameter_file = run_matches
        .value_of("SIMULATION_CONFIG")
        .context("missing simulation config")?;
    let params_yaml = std::fs::read_to_string(parameter_file)
        .with_context(|| format!("failed reading parameter file {}", parameter_file))?;
    let mut simulation_params_serde: serde_yaml::Value =
        serde_yaml::from_str(&params_yaml).context("failed parsing simulation config file")?;

    if let Some(overwrite_value_config) = run_matches.value_of("OVERWRITE_CONFIG_FILE") {
        let overwrite_config_str = std::fs::read_to_string(overwrite_value_config)
            .with_context(|| format!("failed reading overwrite file {}", overwrite_value_config))?;
        let overwrite_config_file: HashMap<String, serde_yaml::Value> =
            serde_yaml::from_str(&overwrite_config_str).context("failed parsing overwrite config file")?;

        let mapping = simulation_params_serde
            .as_mapping_mut()
            .ok_or_else(|| anyhow!("cannot get parsed simulation parameters as mapping"))?;
        for (k, v) in overwrite_config_file.into_iter() {
            let entry = mapping
                .get_mut(&serde_yaml::Value::String(k.clone()))
                .ok_or_else(|| anyhow!("not able to find attribute {}", k))?;
            *entry = v;
        }
    }

    serde_yaml::from_value(simulation_params_serde).context("failed to unpack SimulationParams")
}

struct RunConfig {
    steps: usize,
    log_every: usize,
    counters_enabled: bool,
    statistics_path: Option<String>,
    snapshot_dir: Option<String>,
    snapshot_every: usize,
}

impl RunConfig {
    fn from_matches(run_matches: &ArgMatches) -> Result<RunConfig> {
        fn parse_count(run_matches: &ArgMatches, name: &str) -> Result<usize> {
            let value = run_matches.value_of(name).unwrap_or("0");
            value
                .parse::<usize>()
                .with_context(|| format!("{} expects a non-negative integer, got '{}'", name, value))
        }

        Ok(RunConfig {
            steps: parse_count(run_matches, "STEPS")?,
            log_every: parse_count(run_matches, "LOG_EVERY")?,
            counters_enabled: run_matches.is_present("STATISTICS_ENABLED"),
            statistics_path: run_matches.value_of("STATISTICS_PATH").map(String::from),
            snapshot_dir: run_matches.value_of("SNAPSHOT_DIR").map(String::from),
            snapshot_every: parse_count(run_matches, "SNAPSHOT_EVERY")?,
        })
    }
}

fn fluid_main<K: SphKernels>(
    simulation_params: SimulationParams,
    scene_config: &SceneConfig,
    run_config: &RunConfig,
) -> Result<()> {
    let mut fluid_simulation =
        FluidSimulation::<K>::initialize(simulation_params, scene_config, run_config.counters_enabled)
            .context("refusing to start simulation")?;

    let mut snapshot_exporter = match &run_config.snapshot_dir {
        Some(dir) => Some(SnapshotExporter::new(dir, "box-sph")?),
        None => None,
    };

    let mut total_duration: Duration = Duration::from_nanos(0);

    for frame_number in 0..run_config.steps {
        let a = std::time::Instant::now();
        fluid_simulation.single_step();
        total_duration += std::time::Instant::now() - a;

        if let Err(e) = fluid_simulation.check_state() {
            tracing::error!("step {}: {}", fluid_simulation.step_number, e);
            bail!("simulation diverged after {} steps: {}", fluid_simulation.step_number, e);
        }

        if run_config.log_every > 0 && (frame_number + 1) % run_config.log_every == 0 {
            let d = fluid_simulation.diagnostics();
            tracing::info!(
                "{:05}: {} fluid particles t={:.4}s ekin={:.6} avg density={:.3} ({}msec AVG)",
                fluid_simulation.step_number,
                fluid_simulation.num_particles(),
                fluid_simulation.time,
                d.kinetic_energy,
                d.avg_density,
                (total_duration / fluid_simulation.step_number as u32).as_secs_f32() * 1000.
            );
        }

        if let Some(exporter) = &mut snapshot_exporter {
            if run_config.snapshot_every > 0 && (frame_number + 1) % run_config.snapshot_every == 0 {
                exporter.add_snapshot(
                    fluid_simulation.time,
                    fluid_simulation.step_number,
                    fluid_simulation.particles(),
                )?;
            }
        }
    }

    let final_state_written = run_config.snapshot_every > 0 && run_config.steps % run_config.snapshot_every == 0;
    if let (Some(exporter), false) = (&mut snapshot_exporter, final_state_written) {
        let path = exporter.add_snapshot(
            fluid_simulation.time,
            fluid_simulation.step_number,
            fluid_simulation.particles(),
        )?;
        tracing::info!("wrote final snapshot to {:?}", path);
    }

    if run_config.counters_enabled {
        let s = write_statistics(&fluid_simulation);
        print!("{}", s);
        if let Some(statistics_path) = &run_config.statistics_path {
            std::fs::write(Path::new(statistics_path), s)
                .with_context(|| format!("failed writing statistics to {}", statistics_path))?;
        }
    }

    Ok(())
}
