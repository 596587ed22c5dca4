use crate::enums::{Interpolation, Phase};
use crate::error::{Error, Result};

/// Loader configuration, fixed once the loader is built.
///
/// Construct with [`RunConfig::new`] (or [`Default`]) and the `with_*`
/// methods, then hand it to [`RunConfig::validate`]. Components only ever
/// receive a shared reference.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    pub phase: Phase,
    pub input_nc: usize,
    pub output_nc: usize,
    pub load_size: usize,
    pub fine_size: usize,
    pub hu_min: f32,
    pub hu_max: f32,
    pub exclude_slices: usize,
    /// Disables random slice selection in the train phase.
    pub serial_batches: bool,
    pub flip: bool,
    pub interpolation: Interpolation,
    pub domain_a: String,
    pub domain_b: String,
    pub phase_dir: Option<String>,
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            phase: Phase::Train,
            input_nc: 1,
            output_nc: 1,
            load_size: 286,
            fine_size: 256,
            hu_min: -1000.0,
            hu_max: 3000.0,
            exclude_slices: 0,
            serial_batches: false,
            flip: false,
            interpolation: Interpolation::Bilinear,
            domain_a: "A".to_owned(),
            domain_b: "B".to_owned(),
            phase_dir: None,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            ..Self::default()
        }
    }

    pub fn with_sizes(mut self, load_size: usize, fine_size: usize) -> Self {
        self.load_size = load_size;
        self.fine_size = fine_size;
        self
    }

    pub fn with_hu_window(mut self, hu_min: f32, hu_max: f32) -> Self {
        self.hu_min = hu_min;
        self.hu_max = hu_max;
        self
    }

    pub fn with_exclude_slices(mut self, exclude_slices: usize) -> Self {
        self.exclude_slices = exclude_slices;
        self
    }

    pub fn with_serial_batches(mut self, serial_batches: bool) -> Self {
        self.serial_batches = serial_batches;
        self
    }

    pub fn with_flip(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_domains(mut self, domain_a: impl Into<String>, domain_b: impl Into<String>) -> Self {
        self.domain_a = domain_a.into();
        self.domain_b = domain_b.into();
        self
    }

    pub fn with_phase_dir(mut self, phase_dir: impl Into<String>) -> Self {
        self.phase_dir = Some(phase_dir.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Directory name under each domain holding this phase's volumes.
    pub fn phase_dir(&self) -> &str {
        self.phase_dir
            .as_deref()
            .unwrap_or_else(|| self.phase.default_dir())
    }

    /// Whether the slice selector may draw at random.
    pub fn randomize_slices(&self) -> bool {
        self.phase.is_train() && !self.serial_batches
    }

    /// Check the configuration and return it unchanged when usable.
    ///
    /// # Errors
    ///
    /// [`Error::Range`] for an empty HU window, [`Error::Config`] for
    /// anything else.
    pub fn validate(self) -> Result<Self> {
        if self.input_nc != 1 || self.output_nc != 1 {
            return Err(Error::Config(format!(
                "input_nc and output_nc must both be 1, got {} and {}",
                self.input_nc, self.output_nc
            )));
        }
        if self.fine_size == 0 {
            return Err(Error::Config("fine_size must be at least 1".to_owned()));
        }
        if self.fine_size > self.load_size {
            return Err(Error::Config(format!(
                "fine_size {} exceeds load_size {}",
                self.fine_size, self.load_size
            )));
        }
        if !(self.hu_max > self.hu_min) || !self.hu_min.is_finite() || !self.hu_max.is_finite() {
            return Err(Error::Range {
                min: self.hu_min,
                max: self.hu_max,
            });
        }
        if self.domain_a.is_empty() || self.domain_b.is_empty() || self.domain_a == self.domain_b {
            return Err(Error::Config(format!(
                "domain names must be distinct and non-empty, got {:?} and {:?}",
                self.domain_a, self.domain_b
            )));
        }
        Ok(self)
    }
}
