use crate::error::{Error, Result};

use ndarray::Array2;
use ndarray::Array3;
use ndarray::Array4;
use ndarray::ArrayD;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray::Ix2;
use ndarray::Ix3;
use ndarray::Ix4;
use ndarray::s;

/// Decoded intensity data, tagged by rank.
///
/// Axes are ordered `H × W [× Z [× T]]`. Only the first `T` index of a
/// [`Volume::Series`] is ever read.
#[derive(Clone, Debug, PartialEq)]
pub enum Volume {
    Plane(Array2<f32>),
    Stack(Array3<f32>),
    Series(Array4<f32>),
}

impl Volume {
    /// Tag a dynamic-rank array.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedShape`] for ranks outside 2..=4 and
    /// [`Error::EmptyVolume`] when any axis has length zero.
    pub fn from_dyn(data: ArrayD<f32>) -> Result<Self> {
        if data.shape().contains(&0) {
            return Err(Error::EmptyVolume);
        }
        let rank = data.ndim();
        let unsupported = |_| Error::UnsupportedShape { rank };
        match rank {
            2 => Ok(Volume::Plane(data.into_dimensionality::<Ix2>().map_err(unsupported)?)),
            3 => Ok(Volume::Stack(data.into_dimensionality::<Ix3>().map_err(unsupported)?)),
            4 => Ok(Volume::Series(data.into_dimensionality::<Ix4>().map_err(unsupported)?)),
            _ => Err(Error::UnsupportedShape { rank }),
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            Volume::Plane(_) => 2,
            Volume::Stack(_) => 3,
            Volume::Series(_) => 4,
        }
    }

    /// Number of axial slices: 1 for a plane, otherwise the Z extent.
    pub fn depth(&self) -> usize {
        match self {
            Volume::Plane(_) => 1,
            Volume::Stack(data) => data.len_of(Axis(2)),
            Volume::Series(data) => data.len_of(Axis(2)),
        }
    }

    /// In-plane dimensions `(height, width)`.
    pub fn plane_dim(&self) -> (usize, usize) {
        match self {
            Volume::Plane(data) => data.dim(),
            Volume::Stack(data) => (data.len_of(Axis(0)), data.len_of(Axis(1))),
            Volume::Series(data) => (data.len_of(Axis(0)), data.len_of(Axis(1))),
        }
    }

    /// Axial plane `index` (0-based). A plane ignores the index.
    ///
    /// Returns `None` when `index` is outside the volume's depth.
    pub fn axial_slice(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        match self {
            Volume::Plane(data) => Some(data.view()),
            _ if index >= self.depth() => None,
            Volume::Stack(data) => Some(data.slice(s![.., .., index])),
            Volume::Series(data) => Some(data.slice(s![.., .., index, 0])),
        }
    }

    /// Owned copy of the axial plane at `index`, clamped to the last slice.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyVolume`] when the volume has no slices.
    pub fn extract(&self, index: usize) -> Result<Array2<f32>> {
        let depth = self.depth();
        if depth == 0 {
            return Err(Error::EmptyVolume);
        }
        self.axial_slice(index.min(depth - 1))
            .map(|view| view.to_owned())
            .ok_or(Error::EmptyVolume)
    }
}
