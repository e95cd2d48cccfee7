use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator as _, IntoStaticStr};

use crate::ParseLabelError;

/// Scored sleep stage of a single epoch.
///
/// Stages have no natural ordering; compare NREM depth with
/// [`StageKind::depth`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    Display,
    IntoStaticStr,
)]
pub enum StageKind {
    Wake,
    N1,
    N2,
    N3,
    #[serde(rename = "REM")]
    #[strum(serialize = "REM")]
    Rem,
    #[default]
    Unknown,
}

/// Coarse grouping used in hypnogram reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
pub enum StageGroup {
    Wake,
    Light,
    Deep,
    #[serde(rename = "REM")]
    #[strum(serialize = "REM")]
    Rem,
    Unknown,
}

/// Respiratory annotation attached to an epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RespiratoryEvent {
    #[default]
    NoEvent,
    Apnea,
    Hypopnea,
    Snore,
}

impl StageKind {
    pub fn is_sleep(self) -> bool {
        matches!(self, Self::N1 | Self::N2 | Self::N3 | Self::Rem)
    }

    pub fn is_wake(self) -> bool {
        matches!(self, Self::Wake)
    }

    /// Wake or any sleep stage.
    pub fn is_scored(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// NREM depth, Wake being the shallowest. REM and Unknown have no depth.
    pub fn depth(self) -> Option<u8> {
        match self {
            Self::Wake => Some(0),
            Self::N1 => Some(1),
            Self::N2 => Some(2),
            Self::N3 => Some(3),
            Self::Rem | Self::Unknown => None,
        }
    }

    pub fn sleep_stages() -> impl Iterator<Item = StageKind> {
        Self::iter().filter(|stage| stage.is_sleep())
    }

    pub fn group(self) -> StageGroup {
        match self {
            Self::Wake => StageGroup::Wake,
            Self::N1 | Self::N2 => StageGroup::Light,
            Self::N3 => StageGroup::Deep,
            Self::Rem => StageGroup::Rem,
            Self::Unknown => StageGroup::Unknown,
        }
    }

    /// Numeric hypnogram code: 0 Wake, 1 N1, 2 N2, 3 N3, 4 REM.
    /// Anything else is treated as unscored.
    ///
    /// Four-level device hypnograms (0 Wake, 1 Light, 2 Deep, 3 REM) do not
    /// follow this scheme; their code 3 reads as N3 here. Map them through
    /// labels instead.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Wake,
            1 => Self::N1,
            2 => Self::N2,
            3 => Self::N3,
            4 => Self::Rem,
            _ => Self::Unknown,
        }
    }
}

impl FromStr for StageKind {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "w" | "wake" | "awake" => Ok(Self::Wake),
            "n1" | "s1" => Ok(Self::N1),
            "n2" | "s2" => Ok(Self::N2),
            "n3" | "s3" | "s4" => Ok(Self::N3),
            "r" | "rem" => Ok(Self::Rem),
            "?" | "u" | "unknown" | "unscored" => Ok(Self::Unknown),
            _ => Err(ParseLabelError {
                kind: "stage",
                label: s.to_string(),
            }),
        }
    }
}

impl RespiratoryEvent {
    /// Apnea or hypopnea.
    pub fn is_unstable(self) -> bool {
        matches!(self, Self::Apnea | Self::Hypopnea)
    }

    pub fn is_snore(self) -> bool {
        matches!(self, Self::Snore)
    }
}

impl FromStr for RespiratoryEvent {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "no_event" => Ok(Self::NoEvent),
            "apnea" => Ok(Self::Apnea),
            "hypopnea" => Ok(Self::Hypopnea),
            "snore" | "snoring" => Ok(Self::Snore),
            _ => Err(ParseLabelError {
                kind: "respiratory event",
                label: s.to_string(),
            }),
        }
    }
}
