use chrono::TimeDelta;
use thiserror::Error;

/// Reasons a sequence of epochs cannot form a [`Timeline`](crate::Timeline).
///
/// `index` always refers to the position in the caller's input, not in the
/// resulting timeline (which may contain filled gaps).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("epoch duration must be positive, got {0}")]
    NonPositiveDuration(TimeDelta),
    #[error("epoch {index} starts before the previous epoch")]
    Unsorted { index: usize },
    #[error("epoch {index} repeats the previous timestamp")]
    DuplicateTimestamp { index: usize },
    #[error("epoch {index} overlaps the previous epoch")]
    Overlapping { index: usize },
    #[error("gap before epoch {index} is not a whole number of epochs")]
    MisalignedGap { index: usize },
    #[error("gap before epoch {index} spans {epochs} epochs, more than {max}")]
    GapTooLarge { index: usize, epochs: i128, max: usize },
    #[error("epoch {index} ends outside the representable time range")]
    OutOfRange { index: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognised {kind} label `{label}`")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub label: String,
}
