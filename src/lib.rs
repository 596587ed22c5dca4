//! # CT slice pairs
//!
//! This crate turns paired, co-registered CT volumes into 2-channel 2D
//! samples for supervised image-translation training.
//!
//! A dataset root holds two domains, `A/<phase>/` and `B/<phase>/`, where
//! every volume under `A` has a same-named counterpart under `B`. Volumes
//! are NIfTI files (`.nii`, `.nii.gz`) or directories of DICOM slices. For
//! every request the sampler:
//!  - reads both volumes (rank 2, 3 or 4; only the first time point of a
//!    4D volume is used)
//!  - picks one axial slice against the shallower of the two, skipping
//!    `exclude_slices` at each end
//!  - resizes each plane to `load_size`, crops it to `fine_size` (random in
//!    training, centered in evaluation) and optionally flips it
//!  - clamps intensities to the HU window and maps them onto `[-1, 1]`
//!
//! The result is a `[2, fine_size, fine_size]` array with A in channel 0
//! and B in channel 1.
//!
//! Every random draw goes through an injected [`rand::Rng`], so training
//! runs are reproducible from a seed and evaluation runs are fully
//! deterministic.
//!
//! # Examples
//!
//! ## Sampling the evaluation split
//!
//! ```no_run
//! # use ct_slice_pairs::{PairedDataset, Phase, RunConfig};
//! let config = RunConfig::new(Phase::Eval)
//!     .with_sizes(286, 256)
//!     .with_exclude_slices(5);
//! let mut dataset = PairedDataset::scan("data/ct_pairs", config)
//!     .expect("should have indexed paired volumes");
//! let sample = dataset.get(0).expect("should have sampled the first pair");
//! assert_eq!(sample.data.dim(), (2, 256, 256));
//! if let Some(image) = sample.to_image() {
//!     image.save("pair.png").expect("should have written the preview");
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod enums;
pub mod error;
pub mod intensity;
mod interpolator;
pub mod sampler;
pub mod slicing;
pub mod transform;
pub mod volume;
pub mod volume_loader;

pub use config::RunConfig;
pub use dataset::PairedDataset;
pub use enums::{Interpolation, Phase, SortBy};
pub use error::{Error, Result};
pub use sampler::{PairSampler, Sample};
pub use volume::Volume;
pub use volume_loader::{AutoReader, DicomSeriesReader, NiftiReader, VolumeReader};
