use crate::error::{Error, Result};

use ndarray::{Array2, ArrayView2};

/// Clamp to `[min, max]` and map linearly onto `[-1, 1]`.
///
/// NaN voxels map to `-1`, the value of `min`.
///
/// # Errors
///
/// [`Error::Range`] when `max <= min` or either bound is not finite.
pub fn normalize(plane: &ArrayView2<'_, f32>, min: f32, max: f32) -> Result<Array2<f32>> {
    if !(max > min) || !min.is_finite() || !max.is_finite() {
        return Err(Error::Range { min, max });
    }
    // f64 keeps `max - min` finite for any pair of finite f32 bounds.
    let (low, span) = (f64::from(min), f64::from(max) - f64::from(min));
    Ok(plane.mapv(|v| {
        let v = if v.is_nan() { min } else { v.clamp(min, max) };
        (2.0 * (f64::from(v) - low) / span - 1.0) as f32
    }))
}
