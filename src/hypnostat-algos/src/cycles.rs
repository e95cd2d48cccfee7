use chrono::{NaiveDateTime, TimeDelta};
use hypnostat_types::{StageKind, Timeline};

use crate::helpers::time_math::mean_deltas;

/// REM epochs closer than this belong to the same REM episode.
pub const REM_MERGE_GAP: TimeDelta = TimeDelta::minutes(15);

/// NREM/REM cycles of one night.
///
/// A cycle starts at sleep onset (or where the previous cycle ended) and
/// ends with a REM episode. Sleep after the last REM episode is not a cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SleepCycles {
    pub start_times: Vec<NaiveDateTime>,
    pub durations: Vec<TimeDelta>,
    pub mean_duration: Option<TimeDelta>,
}

impl SleepCycles {
    pub fn detect(timeline: &Timeline, onset: Option<usize>) -> Self {
        let Some(onset) = onset else {
            return Self::default();
        };
        let epochs = &timeline.epochs()[onset..];
        let Some(first) = epochs.first() else {
            return Self::default();
        };

        let episodes = Self::rem_episodes(
            epochs
                .iter()
                .filter(|e| e.stage() == StageKind::Rem)
                .map(|e| (e.start(), e.end())),
        );

        let mut start = first.start();
        let mut start_times = Vec::with_capacity(episodes.len());
        let mut durations = Vec::with_capacity(episodes.len());
        for (_, episode_end) in episodes {
            start_times.push(start);
            durations.push(episode_end - start);
            start = episode_end;
        }

        debug!("detected {} sleep cycles", durations.len());

        let mean_duration = (!durations.is_empty()).then(|| mean_deltas(&durations));
        Self {
            start_times,
            durations,
            mean_duration,
        }
    }

    pub fn count(&self) -> usize {
        self.durations.len()
    }

    fn rem_episodes(
        rem: impl Iterator<Item = (NaiveDateTime, NaiveDateTime)>,
    ) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        let mut episodes: Vec<(NaiveDateTime, NaiveDateTime)> = Vec::new();
        for (start, end) in rem {
            match episodes.last_mut() {
                Some(last) if start - last.1 < REM_MERGE_GAP => last.1 = end,
                _ => episodes.push((start, end)),
            }
        }
        episodes
    }
}
