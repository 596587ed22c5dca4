use crate::config::RunConfig;
use crate::enums::{Interpolation, Phase};
use crate::error::{Error, Result};
use crate::interpolator::Interpolator;

use ndarray::{Array2, ArrayView2, s};
use rand::Rng;

/// Resize, crop and optionally flip a single plane.
///
/// Every call resizes to `load_size × load_size` and crops a
/// `fine_size × fine_size` window: random in the train phase, centered in
/// eval. With `flip` set, train-phase planes are mirrored left-right half of
/// the time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeometricTransform {
    load_size: usize,
    fine_size: usize,
    phase: Phase,
    flip: bool,
    interpolation: Interpolation,
}

impl GeometricTransform {
    /// # Errors
    ///
    /// [`Error::Config`] unless `1 <= fine_size <= load_size`.
    pub fn new(load_size: usize, fine_size: usize, phase: Phase, flip: bool) -> Result<Self> {
        if fine_size == 0 || fine_size > load_size {
            return Err(Error::Config(format!(
                "crop size {fine_size} must be between 1 and load size {load_size}"
            )));
        }
        Ok(Self {
            load_size,
            fine_size,
            phase,
            flip,
            interpolation: Interpolation::Bilinear,
        })
    }

    pub fn from_config(config: &RunConfig) -> Result<Self> {
        Ok(Self::new(config.load_size, config.fine_size, config.phase, config.flip)?
            .with_interpolation(config.interpolation))
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn fine_size(&self) -> usize {
        self.fine_size
    }

    /// Produce a `fine_size × fine_size` plane.
    ///
    /// Draws from `rng` (row offset, column offset, flip) only in the train
    /// phase; eval output is a pure function of `plane`.
    pub fn apply<R: Rng + ?Sized>(&self, plane: &ArrayView2<'_, f32>, rng: &mut R) -> Array2<f32> {
        let resized = Interpolator::resize(plane, self.load_size, self.load_size, self.interpolation);
        let (height, width) = resized.dim();

        let row = self.crop_offset(height, rng);
        let col = self.crop_offset(width, rng);
        let cropped = resized.slice(s![row..row + self.fine_size, col..col + self.fine_size]);

        if self.flip && self.phase.is_train() && rng.r#gen::<f64>() > 0.5 {
            cropped.slice(s![.., ..;-1]).to_owned()
        } else {
            cropped.to_owned()
        }
    }

    // Train offsets cover 0..=max_offset, so 0 is a possible draw even
    // when the plane is larger than the crop.
    fn crop_offset<R: Rng + ?Sized>(&self, dim: usize, rng: &mut R) -> usize {
        let max_offset = dim - self.fine_size;
        match self.phase {
            Phase::Train if max_offset > 0 => rng.gen_range(0..=max_offset),
            Phase::Train => 0,
            Phase::Eval => max_offset.div_ceil(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn gradient(height: usize, width: usize) -> Array2<f32> {
        Array2::from_shape_fn((height, width), |(y, x)| (y * width + x) as f32)
    }

    #[test]
    fn rejects_crop_larger_than_load() {
        assert!(GeometricTransform::new(8, 9, Phase::Eval, false).is_err());
        assert!(GeometricTransform::new(8, 0, Phase::Eval, false).is_err());
    }

    #[test]
    fn eval_is_deterministic_and_exact_size() {
        let transform = GeometricTransform::new(12, 8, Phase::Eval, false).unwrap();
        let plane = gradient(10, 14);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let first = transform.apply(&plane.view(), &mut rng);
        let second = transform.apply(&plane.view(), &mut rng);
        assert_eq!(first.dim(), (8, 8));
        assert_eq!(first, second);
    }

    #[test]
    fn eval_crop_is_centered() {
        let transform = GeometricTransform::new(7, 4, Phase::Eval, true).unwrap();
        let plane = gradient(7, 7);
        let out = transform.apply(&plane.view(), &mut ChaCha8Rng::seed_from_u64(0));
        // ceil((7 - 4) / 2) = 2, and eval never flips
        assert_eq!(out, plane.slice(s![2..6, 2..6]));
    }

    #[test]
    fn train_crop_is_a_window_of_the_resized_plane() {
        let transform = GeometricTransform::new(9, 5, Phase::Train, false).unwrap();
        let plane = gradient(9, 9);
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut offsets = std::collections::HashSet::new();
        for _ in 0..300 {
            let out = transform.apply(&plane.view(), &mut rng);
            assert_eq!(out.dim(), (5, 5));
            let row = (out[[0, 0]] as usize) / 9;
            let col = (out[[0, 0]] as usize) % 9;
            assert!(row <= 4 && col <= 4);
            assert_eq!(out, plane.slice(s![row..row + 5, col..col + 5]));
            offsets.insert((row, col));
        }
        assert!(offsets.contains(&(0, 0)) && offsets.contains(&(4, 4)));
    }

    #[test]
    fn train_crop_of_exact_size_keeps_origin() {
        let transform = GeometricTransform::new(6, 6, Phase::Train, false).unwrap();
        let plane = gradient(6, 6);
        let out = transform.apply(&plane.view(), &mut ChaCha8Rng::seed_from_u64(2));
        assert_eq!(out, plane);
    }

    #[test]
    fn train_flip_mirrors_columns() {
        let transform = GeometricTransform::new(4, 4, Phase::Train, true).unwrap();
        let plane = gradient(4, 4);
        let mirrored = plane.slice(s![.., ..;-1]).to_owned();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let (mut kept, mut flipped) = (0, 0);
        for _ in 0..200 {
            let out = transform.apply(&plane.view(), &mut rng);
            if out == plane {
                kept += 1;
            } else {
                assert_eq!(out, mirrored);
                flipped += 1;
            }
        }
        assert!(kept > 0 && flipped > 0);
    }

    #[test]
    fn flip_disabled_never_mirrors() {
        let transform = GeometricTransform::new(4, 4, Phase::Train, false).unwrap();
        let plane = gradient(4, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        for _ in 0..50 {
            assert_eq!(transform.apply(&plane.view(), &mut rng), plane);
        }
    }
}
