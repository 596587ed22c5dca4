use std::fmt;

/// Run mode controlling the randomization policy of every sampling stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Train,
    Eval,
}

impl Phase {
    /// Directory name used under each domain when no explicit one is configured.
    pub fn default_dir(self) -> &'static str {
        match self {
            Phase::Train => "train",
            Phase::Eval => "test",
        }
    }

    pub fn is_train(self) -> bool {
        matches!(self, Phase::Train)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Train => f.write_str("train"),
            Phase::Eval => f.write_str("eval"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    #[default]
    Bilinear,
    Nearest,
}

/// Ordering applied to the slices of a DICOM series before stacking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}
