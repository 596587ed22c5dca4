use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not decode volume {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("no paired volume for {}: expected {}", a.display(), b.display())]
    MissingPair { a: PathBuf, b: PathBuf },

    #[error("unsupported volume rank {rank}, expected 2, 3 or 4")]
    UnsupportedShape { rank: usize },

    #[error("invalid intensity range [{min}, {max}]: max must be greater than min")]
    Range { min: f32, max: f32 },

    #[error("volume has no voxels along one of its axes")]
    EmptyVolume,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
