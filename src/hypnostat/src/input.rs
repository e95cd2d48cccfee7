use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, TimeDelta};
use hypnostat_types::{ParseLabelError, RespiratoryEvent, StageKind, Timeline, ValidationError};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid hypnogram file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Label(#[from] ParseLabelError),
    #[error("{events} respiratory events for {stages} stages")]
    EventCountMismatch { stages: usize, events: usize },
    #[error("epoch length must be a positive number of seconds, got {0}")]
    InvalidEpochSeconds(i64),
    #[error(transparent)]
    Timeline(#[from] ValidationError),
}

/// Stage given either as a numeric code or as a label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StageLabel {
    Code(i64),
    Name(String),
}

impl StageLabel {
    pub fn to_stage(&self) -> Result<StageKind, ParseLabelError> {
        match self {
            StageLabel::Code(code) => Ok(StageKind::from_code(*code)),
            StageLabel::Name(name) => name.parse(),
        }
    }
}

/// Hypnogram file as read by the command line.
#[derive(Debug, Clone, Deserialize)]
pub struct HypnogramInput {
    pub start: NaiveDateTime,
    #[serde(default)]
    pub epoch_seconds: Option<i64>,
    pub stages: Vec<StageLabel>,
    #[serde(default)]
    pub events: Option<Vec<String>>,
}

impl HypnogramInput {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Builds the timeline, using `default_epoch_seconds` when the file has no epoch length.
    pub fn into_timeline(self, default_epoch_seconds: i64) -> Result<Timeline, InputError> {
        let seconds = self.epoch_seconds.unwrap_or(default_epoch_seconds);
        let epoch_duration = TimeDelta::try_seconds(seconds)
            .filter(|d| *d > TimeDelta::zero())
            .ok_or(InputError::InvalidEpochSeconds(seconds))?;

        let stages = self
            .stages
            .iter()
            .map(StageLabel::to_stage)
            .collect::<Result<Vec<_>, _>>()?;

        let timeline = match self.events {
            Some(events) => {
                if events.len() != stages.len() {
                    return Err(InputError::EventCountMismatch {
                        stages: stages.len(),
                        events: events.len(),
                    });
                }
                let events = events
                    .iter()
                    .map(|e| e.parse::<RespiratoryEvent>())
                    .collect::<Result<Vec<_>, _>>()?;
                Timeline::from_annotated_stages(
                    self.start,
                    epoch_duration,
                    stages.into_iter().zip(events),
                )?
            }
            None => Timeline::from_stages(self.start, epoch_duration, stages)?,
        };

        debug!(
            "loaded {} epochs of {}s starting {}",
            timeline.len(),
            seconds,
            self.start
        );
        Ok(timeline)
    }
}
