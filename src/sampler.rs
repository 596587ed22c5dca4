use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::intensity::normalize;
use crate::slicing::{SlicePair, reconcile};
use crate::transform::GeometricTransform;
use crate::volume_loader::{AutoReader, VolumeReader};

use image::{GrayImage, ImageBuffer};
use ndarray::{Array3, ArrayView2, Axis, s};
use rand::Rng;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// One training pair: channel 0 is domain A, channel 1 is domain B.
#[derive(Clone, Debug)]
pub struct Sample {
    /// `[2, fine_size, fine_size]`, values in `[-1, 1]`.
    pub data: Array3<f32>,
    pub path_a: PathBuf,
    pub path_b: PathBuf,
    pub slices: SlicePair,
}

impl Sample {
    pub fn a(&self) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), 0)
    }

    pub fn b(&self) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), 1)
    }

    #[inline]
    fn normalize_to_u8(value: f32) -> u8 {
        ((value + 1.0) * 127.5).round().clamp(0.0, 255.0) as u8
    }

    /// Render A and B side by side as an 8-bit grayscale image.
    pub fn to_image(&self) -> Option<GrayImage> {
        let (_, height, width) = self.data.dim();
        let pixel_data: Vec<u8> = (0..height)
            .flat_map(|y| {
                let row_a = self.data.slice(s![0, y, ..]);
                let row_b = self.data.slice(s![1, y, ..]);
                row_a
                    .into_iter()
                    .chain(row_b)
                    .map(|&v| Self::normalize_to_u8(v))
                    .collect::<Vec<u8>>()
            })
            .collect();
        ImageBuffer::from_raw(2 * width as u32, height as u32, pixel_data)
    }
}

/// Replace the first path component equal to `domain_a` with `domain_b`.
pub fn paired_path(path_a: &Path, domain_a: &str, domain_b: &str) -> Option<PathBuf> {
    let mut replaced = false;
    let path_b: PathBuf = path_a
        .components()
        .map(|component| match component {
            Component::Normal(name) if !replaced && name == OsStr::new(domain_a) => {
                replaced = true;
                Component::Normal(OsStr::new(domain_b))
            }
            other => other,
        })
        .collect();
    replaced.then_some(path_b)
}

/// [`paired_path`] applied below `root` only, so components of the root
/// itself are never rewritten.
pub fn paired_path_under(
    root: &Path,
    path_a: &Path,
    domain_a: &str,
    domain_b: &str,
) -> Option<PathBuf> {
    let relative = path_a.strip_prefix(root).ok()?;
    paired_path(relative, domain_a, domain_b).map(|path_b| root.join(path_b))
}

/// Turns the path of an A volume into a normalized, augmented slice pair.
pub struct PairSampler<R = AutoReader> {
    config: RunConfig,
    reader: R,
    transform: GeometricTransform,
    root: Option<PathBuf>,
}

impl PairSampler<AutoReader> {
    pub fn from_config(config: RunConfig) -> Result<Self> {
        Self::new(config, AutoReader::default())
    }
}

impl<R: VolumeReader> PairSampler<R> {
    /// # Errors
    ///
    /// Whatever [`RunConfig::validate`] rejects.
    pub fn new(config: RunConfig, reader: R) -> Result<Self> {
        let config = config.validate()?;
        let transform = GeometricTransform::from_config(&config)?;
        Ok(Self {
            config,
            reader,
            transform,
            root: None,
        })
    }

    /// Derive B paths relative to the dataset `root` for A paths below it.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Location of the B volume paired with `path_a`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingPair`] when the path has no A-domain segment or the
    /// derived B path does not exist. With a root set, only the part of the
    /// path below the root is searched for the A-domain segment.
    pub fn pair_of(&self, path_a: &Path) -> Result<PathBuf> {
        let (domain_a, domain_b) = (&self.config.domain_a, &self.config.domain_b);
        let path_b = match &self.root {
            Some(root) if path_a.starts_with(root) => {
                paired_path_under(root, path_a, domain_a, domain_b)
            }
            _ => paired_path(path_a, domain_a, domain_b),
        };
        let path_b = path_b
            .ok_or_else(|| Error::MissingPair {
                a: path_a.to_path_buf(),
                b: path_a.to_path_buf(),
            })?;
        if !path_b.exists() {
            return Err(Error::MissingPair {
                a: path_a.to_path_buf(),
                b: path_b,
            });
        }
        Ok(path_b)
    }

    /// Draw one `[2, fine_size, fine_size]` sample for the volume at `path_a`.
    ///
    /// Random draws happen in a fixed order: slice index, then crop and flip
    /// for A, then crop and flip for B. A and B are augmented independently.
    ///
    /// # Panics
    ///
    /// If a normalized value falls outside `[-1, 1]`.
    pub fn sample<G: Rng + ?Sized>(&self, path_a: &Path, rng: &mut G) -> Result<Sample> {
        let path_b = self.pair_of(path_a)?;

        let volume_a = self.reader.read(path_a)?;
        let volume_b = self.reader.read(&path_b)?;

        let slices = reconcile(
            volume_a.depth(),
            volume_b.depth(),
            self.config.exclude_slices,
            self.config.phase,
            self.config.randomize_slices(),
            rng,
        );
        debug!(
            path = %path_a.display(),
            depth_a = volume_a.depth(),
            depth_b = volume_b.depth(),
            slice_a = slices.index_a,
            slice_b = slices.index_b,
            "sampling slice pair"
        );

        let plane_a = volume_a.extract(slices.index_a)?;
        let plane_b = volume_b.extract(slices.index_b)?;

        let plane_a = self.transform.apply(&plane_a.view(), rng);
        let plane_b = self.transform.apply(&plane_b.view(), rng);

        let plane_a = normalize(&plane_a.view(), self.config.hu_min, self.config.hu_max)?;
        let plane_b = normalize(&plane_b.view(), self.config.hu_min, self.config.hu_max)?;

        let fine_size = self.transform.fine_size();
        let mut data = Array3::<f32>::zeros((2, fine_size, fine_size));
        data.index_axis_mut(Axis(0), 0).assign(&plane_a);
        data.index_axis_mut(Axis(0), 1).assign(&plane_b);

        assert!(
            data.iter().all(|v| (-1.0..=1.0).contains(v)),
            "normalized sample left [-1, 1]"
        );

        Ok(Sample {
            data,
            path_a: path_a.to_path_buf(),
            path_b,
            slices,
        })
    }
}
