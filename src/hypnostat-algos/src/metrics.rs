use std::{collections::BTreeMap, fmt::Display};

use chrono::{FixedOffset, NaiveDateTime, TimeDelta};
use hypnostat_types::{StageKind, Timeline};
use serde::Serialize;
use thiserror::Error;

use crate::{
    BreathingMetrics, SleepCycles,
    helpers::{
        format_hm::FormatHM,
        time_math::{minutes, ratio_pct, round_float},
    },
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricsError {
    #[error("no sleep epoch found among {epochs} epochs")]
    NoSleepDetected { epochs: usize },
}

/// Time spent in one sleep stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageStat {
    pub time: TimeDelta,
    /// Share of total sleep time.
    pub pct: f64,
    /// Time from sleep onset to the first epoch of this stage.
    pub latency: Option<TimeDelta>,
}

/// Summary of one night.
///
/// Onset-dependent fields are `None` when the timeline contains no sleep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SleepMetrics {
    pub epoch_count: usize,
    /// Position of the first sleep epoch.
    pub sleep_onset: Option<usize>,
    pub sleep_time: Option<NaiveDateTime>,
    /// End of the last sleep epoch.
    pub wake_time: Option<NaiveDateTime>,
    pub total_recording_time: TimeDelta,
    pub total_sleep_time: TimeDelta,
    pub sleep_onset_latency: Option<TimeDelta>,
    /// Wake after sleep onset.
    pub waso: TimeDelta,
    pub wake_before_onset: TimeDelta,
    pub sleep_period_time: Option<TimeDelta>,
    /// From the end of the last sleep epoch to the end of the recording.
    pub wakeup_latency: Option<TimeDelta>,
    pub time_in_wake: TimeDelta,
    pub time_in_unknown: TimeDelta,
    pub n1: StageStat,
    pub n2: StageStat,
    pub n3: StageStat,
    pub rem: StageStat,
    pub sleep_efficiency: f64,
    pub wake_ratio: f64,
    pub awakenings: u32,
    pub longest_waso: Option<TimeDelta>,
    pub cycles: SleepCycles,
    pub breathing: BreathingMetrics,
}

/// Flat metric name to value mapping, values rounded to two decimals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricResult(BTreeMap<&'static str, f64>);

#[derive(Default)]
struct EpochCounts {
    n1: usize,
    n2: usize,
    n3: usize,
    rem: usize,
    wake_before_onset: usize,
    wake_after_onset: usize,
    unknown: usize,
    first_n1: Option<usize>,
    first_n2: Option<usize>,
    first_n3: Option<usize>,
    first_rem: Option<usize>,
    awakenings: u32,
    longest_wake_bout: usize,
}

/// Computes the metrics of `timeline`, failing when it has epochs but no sleep.
///
/// Empty timelines are not an error; every metric is zero or undefined.
pub fn compute_metrics(timeline: &Timeline) -> Result<SleepMetrics, MetricsError> {
    let metrics = SleepMetrics::summarize(timeline);
    if !timeline.is_empty() && metrics.sleep_onset.is_none() {
        return Err(MetricsError::NoSleepDetected {
            epochs: timeline.len(),
        });
    }
    Ok(metrics)
}

impl SleepMetrics {
    /// Never fails; a night without sleep reports onset metrics as undefined.
    pub fn summarize(timeline: &Timeline) -> Self {
        let epochs = timeline.epochs();
        let onset = epochs.iter().position(|e| e.stage().is_sleep());
        let last_sleep = epochs.iter().rposition(|e| e.stage().is_sleep());
        let counts = EpochCounts::count(timeline, onset);

        let sleep_count = counts.n1 + counts.n2 + counts.n3 + counts.rem;
        let wake_count = counts.wake_before_onset + counts.wake_after_onset;
        let total = epochs.len();

        let onset_epoch = onset.map(|i| epochs[i]);
        let sleep_time = onset_epoch.map(|e| e.start());
        let wake_time = last_sleep.map(|i| epochs[i].end());

        let latency_to = |first: Option<usize>| {
            first
                .zip(sleep_time)
                .map(|(i, onset)| epochs[i].start() - onset)
        };
        let stage_stat = |count: usize, first: Option<usize>| StageStat {
            time: timeline.span(count),
            pct: ratio_pct(count, sleep_count),
            latency: latency_to(first),
        };

        Self {
            epoch_count: total,
            sleep_onset: onset,
            sleep_time,
            wake_time,
            total_recording_time: timeline.duration(),
            total_sleep_time: timeline.span(sleep_count),
            sleep_onset_latency: sleep_time
                .zip(timeline.start())
                .map(|(onset, start)| onset - start),
            waso: timeline.span(counts.wake_after_onset),
            wake_before_onset: timeline.span(counts.wake_before_onset),
            sleep_period_time: sleep_time.zip(wake_time).map(|(s, w)| w - s),
            wakeup_latency: wake_time.zip(timeline.end()).map(|(w, end)| end - w),
            time_in_wake: timeline.span(wake_count),
            time_in_unknown: timeline.span(counts.unknown),
            n1: stage_stat(counts.n1, counts.first_n1),
            n2: stage_stat(counts.n2, counts.first_n2),
            n3: stage_stat(counts.n3, counts.first_n3),
            rem: stage_stat(counts.rem, counts.first_rem),
            sleep_efficiency: ratio_pct(sleep_count, total),
            wake_ratio: ratio_pct(wake_count, total),
            awakenings: counts.awakenings,
            longest_waso: onset.map(|_| timeline.span(counts.longest_wake_bout)),
            cycles: SleepCycles::detect(timeline, onset),
            breathing: BreathingMetrics::calculate(timeline),
        }
    }

    pub fn stage(&self, stage: StageKind) -> Option<&StageStat> {
        match stage {
            StageKind::N1 => Some(&self.n1),
            StageKind::N2 => Some(&self.n2),
            StageKind::N3 => Some(&self.n3),
            StageKind::Rem => Some(&self.rem),
            StageKind::Wake | StageKind::Unknown => None,
        }
    }

    /// N1 + N2.
    pub fn time_in_light(&self) -> TimeDelta {
        self.n1.time + self.n2.time
    }

    /// N3.
    pub fn time_in_deep(&self) -> TimeDelta {
        self.n3.time
    }

    /// Shifts clock times, read as UTC, into `offset`. Durations are unchanged.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        let shift = TimeDelta::seconds(i64::from(offset.local_minus_utc()));
        let local = |t: NaiveDateTime| t.checked_add_signed(shift).unwrap_or(t);

        self.sleep_time = self.sleep_time.map(local);
        self.wake_time = self.wake_time.map(local);
        for start in &mut self.cycles.start_times {
            *start = local(*start);
        }
        self
    }

    pub fn to_metric_result(&self) -> MetricResult {
        let mut result = MetricResult::default();

        result.insert_minutes("total_recording_time_min", self.total_recording_time);
        result.insert_minutes("total_sleep_time_min", self.total_sleep_time);
        result.insert("sleep_efficiency_pct", self.sleep_efficiency);
        result.insert_opt_minutes("sleep_onset_latency_min", self.sleep_onset_latency);
        result.insert_minutes("waso_min", self.waso);
        result.insert_minutes("wake_before_onset_min", self.wake_before_onset);
        result.insert_opt_minutes("sleep_period_time_min", self.sleep_period_time);
        result.insert_opt_minutes("wakeup_latency_min", self.wakeup_latency);
        result.insert_minutes("wake_min", self.time_in_wake);
        result.insert_minutes("unknown_min", self.time_in_unknown);
        result.insert_minutes("light_min", self.time_in_light());
        result.insert_minutes("deep_min", self.time_in_deep());
        result.insert("wake_pct", self.wake_ratio);
        result.insert("awakenings", f64::from(self.awakenings));
        result.insert_opt_minutes("longest_waso_min", self.longest_waso);

        let stages = [
            (["n1_min", "n1_pct", "n1_latency_min"], &self.n1),
            (["n2_min", "n2_pct", "n2_latency_min"], &self.n2),
            (["n3_min", "n3_pct", "n3_latency_min"], &self.n3),
            (["rem_min", "rem_pct", "rem_latency_min"], &self.rem),
        ];
        for ([time_key, pct_key, latency_key], stat) in stages {
            result.insert_minutes(time_key, stat.time);
            result.insert(pct_key, stat.pct);
            result.insert_opt_minutes(latency_key, stat.latency);
        }

        result.insert("sleep_cycle_count", self.cycles.count() as f64);
        result.insert_opt_minutes("sleep_cycle_min", self.cycles.mean_duration);

        self.breathing.extend_metric_result(&mut result);

        result
    }
}

impl EpochCounts {
    fn count(timeline: &Timeline, onset: Option<usize>) -> Self {
        let mut counts = Self::default();
        let mut previous_scored: Option<StageKind> = None;
        let mut wake_bout = 0;

        for (index, epoch) in timeline.iter().enumerate() {
            let stage = epoch.stage();
            let after_onset = onset.is_some_and(|onset| index > onset);

            match stage {
                StageKind::Wake if after_onset => {
                    counts.wake_after_onset += 1;
                    wake_bout += 1;
                    counts.longest_wake_bout = counts.longest_wake_bout.max(wake_bout);
                    if previous_scored.is_some_and(StageKind::is_sleep) {
                        counts.awakenings += 1;
                    }
                }
                StageKind::Wake => counts.wake_before_onset += 1,
                StageKind::Unknown => counts.unknown += 1,
                StageKind::N1 => {
                    counts.n1 += 1;
                    counts.first_n1.get_or_insert(index);
                }
                StageKind::N2 => {
                    counts.n2 += 1;
                    counts.first_n2.get_or_insert(index);
                }
                StageKind::N3 => {
                    counts.n3 += 1;
                    counts.first_n3.get_or_insert(index);
                }
                StageKind::Rem => {
                    counts.rem += 1;
                    counts.first_rem.get_or_insert(index);
                }
            }

            // unscored epochs end a wake bout
            if !stage.is_wake() {
                wake_bout = 0;
            }
            if stage.is_scored() {
                previous_scored = Some(stage);
            }
        }

        counts
    }
}

impl MetricResult {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, name: &'static str, value: f64) {
        self.0.insert(name, round_float(value));
    }

    pub(crate) fn insert_minutes(&mut self, name: &'static str, value: TimeDelta) {
        self.insert(name, minutes(value));
    }

    pub(crate) fn insert_opt(&mut self, name: &'static str, value: Option<f64>) {
        if let Some(value) = value {
            self.insert(name, value);
        }
    }

    pub(crate) fn insert_opt_minutes(&mut self, name: &'static str, value: Option<TimeDelta>) {
        if let Some(value) = value {
            self.insert_minutes(name, value);
        }
    }
}

fn format_opt(value: Option<TimeDelta>) -> String {
    value.map(|v| v.format_hm()).unwrap_or_else(|| "-".to_string())
}

impl Display for SleepMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clock = |t: Option<NaiveDateTime>| {
            t.map(|t| t.time().format_hm())
                .unwrap_or_else(|| "-".to_string())
        };

        f.write_fmt(format_args!(
            "Sleep time: {}\nWake time: {}\nTime in bed: {}\nTotal sleep: {}\nEfficiency: {}%\n",
            clock(self.sleep_time),
            clock(self.wake_time),
            self.total_recording_time.format_hm(),
            self.total_sleep_time.format_hm(),
            round_float(self.sleep_efficiency),
        ))?;
        f.write_fmt(format_args!(
            "Onset latency: {}\nWASO: {}\nAwakenings: {}\nLongest WASO: {}\n",
            format_opt(self.sleep_onset_latency),
            self.waso.format_hm(),
            self.awakenings,
            format_opt(self.longest_waso),
        ))?;
        f.write_str("Stages:\n")?;
        for stage in StageKind::sleep_stages() {
            if let Some(stat) = self.stage(stage) {
                f.write_fmt(format_args!(
                    "\t{}: {} ({}%), latency {}\n",
                    stage,
                    stat.time.format_hm(),
                    round_float(stat.pct),
                    format_opt(stat.latency),
                ))?;
            }
        }
        f.write_fmt(format_args!(
            "Cycles: {} (mean {})",
            self.cycles.count(),
            format_opt(self.cycles.mean_duration),
        ))?;
        f.write_fmt(format_args!("\n{}", self.breathing))
    }
}
