use std::{fs::create_dir_all, path::PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use box_sph::{floating_type_mod::FT, particles::ParticleStore};

#[derive(Serialize)]
struct Snapshot<'a> {
    time: FT,
    step: usize,
    particles: &'a ParticleStore,
}

/// Writes the particle array as a series of YAML files.
pub(crate) struct SnapshotExporter {
    /// something like './data' which will get expanded to './data/box-sph-00001.yaml'
    folder: PathBuf,
    basename: String,
    snapshot_number: usize,
}

impl SnapshotExporter {
    pub(crate) fn new(folder: impl Into<PathBuf>, basename: impl Into<String>) -> Result<SnapshotExporter> {
        let folder: PathBuf = folder.into();
        create_dir_all(&folder).with_context(|| format!("failed creating snapshot folder {:?}", folder))?;

        Ok(SnapshotExporter {
            folder,
            basename: basename.into(),
            snapshot_number: 1,
        })
    }

    pub(crate) fn add_snapshot(&mut self, time: FT, step: usize, particles: &ParticleStore) -> Result<PathBuf> {
        let path = self
            .folder
            .join(format!("{}-{:05}.yaml", self.basename, self.snapshot_number));

        let yaml = serde_yaml::to_string(&Snapshot { time, step, particles }).context("failed serializing snapshot")?;
        std::fs::write(&path, yaml).with_context(|| format!("failed writing snapshot {:?}", path))?;

        self.snapshot_number += 1;
        Ok(path)
    }
}
