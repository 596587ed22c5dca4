use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::sampler::{PairSampler, Sample};
use crate::volume_loader::{AutoReader, VolumeReader, is_volume_path};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

fn get_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Volumes of one phase under `<root>/<domain_a>/<phase_dir>/`, each with a
/// same-named counterpart under `<root>/<domain_b>/<phase_dir>/`.
///
/// Entries are sorted by file name so indices are stable across runs. The
/// dataset owns one random stream, seeded from [`RunConfig::seed`] when set.
pub struct PairedDataset<R = AutoReader> {
    sampler: PairSampler<R>,
    paths: Vec<PathBuf>,
    rng: ChaCha8Rng,
}

impl PairedDataset<AutoReader> {
    pub fn scan(root: impl AsRef<Path>, config: RunConfig) -> Result<Self> {
        Self::with_reader(root, config, AutoReader::default())
    }
}

impl<R: VolumeReader> PairedDataset<R> {
    /// # Errors
    ///
    /// [`Error::Io`] if the A directory cannot be listed,
    /// [`Error::Config`] if it holds no volumes and [`Error::MissingPair`]
    /// for the first A volume without a B counterpart.
    pub fn with_reader(root: impl AsRef<Path>, config: RunConfig, reader: R) -> Result<Self> {
        let root = root.as_ref();
        let sampler = PairSampler::new(config, reader)?.with_root(root);
        let config = sampler.config();
        let dir_a = root
            .join(&config.domain_a)
            .join(config.phase_dir());

        let mut paths: Vec<_> = fs::read_dir(&dir_a)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|s| s.to_str())
                    .is_some_and(|name| !name.starts_with('.'))
            })
            .filter(|path| is_volume_path(path))
            .collect();

        if paths.is_empty() {
            return Err(Error::Config(format!(
                "no volumes found in {}",
                dir_a.display()
            )));
        }
        paths.sort();

        for path in &paths {
            sampler.pair_of(path)?;
        }

        info!(
            dir = %dir_a.display(),
            count = paths.len(),
            phase = %config.phase,
            "indexed paired volumes"
        );

        let rng = get_rng(config.seed);
        Ok(Self { sampler, paths, rng })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn config(&self) -> &RunConfig {
        self.sampler.config()
    }

    /// B counterpart of an A volume path.
    pub fn pair_of(&self, path_a: &Path) -> Result<PathBuf> {
        self.sampler.pair_of(path_a)
    }

    /// Sample entry `index` using the dataset's own random stream.
    ///
    /// # Panics
    ///
    /// If `index >= self.len()`.
    pub fn get(&mut self, index: usize) -> Result<Sample> {
        self.sampler.sample(&self.paths[index], &mut self.rng)
    }

    /// Sample entry `index` with a caller-provided random stream, e.g. one
    /// per worker thread.
    ///
    /// # Panics
    ///
    /// If `index >= self.len()`.
    pub fn get_with<G: Rng + ?Sized>(&self, index: usize, rng: &mut G) -> Result<Sample> {
        self.sampler.sample(&self.paths[index], rng)
    }
}
