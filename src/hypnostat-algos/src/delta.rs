use std::{fmt::Display, ops::Sub};

use chrono::TimeDelta;

use crate::{
    SleepMetrics, StageStat,
    helpers::{
        format_hm::FormatHM,
        time_math::{round_float, subtract_relative_time},
    },
};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageStatDelta {
    pub time: TimeDelta,
    pub pct: f64,
    pub latency: Option<TimeDelta>,
}

/// Change from one night (right-hand side) to another.
///
/// Clock times are compared by time of day; optional metrics are defined
/// only when both nights define them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SleepMetricsDelta {
    pub sleep_time: Option<TimeDelta>,
    pub wake_time: Option<TimeDelta>,
    pub total_recording_time: TimeDelta,
    pub total_sleep_time: TimeDelta,
    pub sleep_onset_latency: Option<TimeDelta>,
    pub waso: TimeDelta,
    pub sleep_period_time: Option<TimeDelta>,
    pub wakeup_latency: Option<TimeDelta>,
    pub time_in_wake: TimeDelta,
    pub n1: StageStatDelta,
    pub n2: StageStatDelta,
    pub n3: StageStatDelta,
    pub rem: StageStatDelta,
    pub sleep_efficiency: f64,
    pub wake_ratio: f64,
    pub awakenings: i64,
    pub longest_waso: Option<TimeDelta>,
    pub sleep_cycle_count: i64,
    pub sleep_cycle: Option<TimeDelta>,
    pub breathing_index: f64,
    pub unstable_breath_count: i64,
    pub time_in_snoring: Option<TimeDelta>,
}

fn both<T, U>(a: Option<T>, b: Option<T>, f: impl FnOnce(T, T) -> U) -> Option<U> {
    a.zip(b).map(|(a, b)| f(a, b))
}

fn sub_delta(a: TimeDelta, b: TimeDelta) -> TimeDelta {
    a - b
}

impl Sub for &StageStat {
    type Output = StageStatDelta;

    fn sub(self, other: &StageStat) -> StageStatDelta {
        StageStatDelta {
            time: self.time - other.time,
            pct: self.pct - other.pct,
            latency: both(self.latency, other.latency, sub_delta),
        }
    }
}

impl Sub for &SleepMetrics {
    type Output = SleepMetricsDelta;

    fn sub(self, other: &SleepMetrics) -> SleepMetricsDelta {
        SleepMetricsDelta {
            sleep_time: both(self.sleep_time, other.sleep_time, subtract_relative_time),
            wake_time: both(self.wake_time, other.wake_time, subtract_relative_time),
            total_recording_time: self.total_recording_time - other.total_recording_time,
            total_sleep_time: self.total_sleep_time - other.total_sleep_time,
            sleep_onset_latency: both(
                self.sleep_onset_latency,
                other.sleep_onset_latency,
                sub_delta,
            ),
            waso: self.waso - other.waso,
            sleep_period_time: both(self.sleep_period_time, other.sleep_period_time, sub_delta),
            wakeup_latency: both(self.wakeup_latency, other.wakeup_latency, sub_delta),
            time_in_wake: self.time_in_wake - other.time_in_wake,
            n1: &self.n1 - &other.n1,
            n2: &self.n2 - &other.n2,
            n3: &self.n3 - &other.n3,
            rem: &self.rem - &other.rem,
            sleep_efficiency: self.sleep_efficiency - other.sleep_efficiency,
            wake_ratio: self.wake_ratio - other.wake_ratio,
            awakenings: i64::from(self.awakenings) - i64::from(other.awakenings),
            longest_waso: both(self.longest_waso, other.longest_waso, sub_delta),
            sleep_cycle_count: self.cycles.count() as i64 - other.cycles.count() as i64,
            sleep_cycle: both(
                self.cycles.mean_duration,
                other.cycles.mean_duration,
                sub_delta,
            ),
            breathing_index: self.breathing.breathing_index - other.breathing.breathing_index,
            unstable_breath_count: i64::from(self.breathing.unstable_breath_count)
                - i64::from(other.breathing.unstable_breath_count),
            time_in_snoring: both(
                self.breathing.time_in_snoring,
                other.breathing.time_in_snoring,
                sub_delta,
            ),
        }
    }
}

fn signed_hm(value: TimeDelta) -> String {
    if value < TimeDelta::zero() {
        value.format_hm()
    } else {
        format!("+{}", value.format_hm())
    }
}

fn signed_opt(value: Option<TimeDelta>) -> String {
    value.map(signed_hm).unwrap_or_else(|| "-".to_string())
}

impl Display for SleepMetricsDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "Sleep time: {}\nWake time: {}\nTime in bed: {}\nTotal sleep: {}\nEfficiency: {:+}%\n",
            signed_opt(self.sleep_time),
            signed_opt(self.wake_time),
            signed_hm(self.total_recording_time),
            signed_hm(self.total_sleep_time),
            round_float(self.sleep_efficiency),
        ))?;
        f.write_fmt(format_args!(
            "Onset latency: {}\nWASO: {}\nAwakenings: {:+}\nCycles: {:+}\nBreathing index: {:+}",
            signed_opt(self.sleep_onset_latency),
            signed_hm(self.waso),
            self.awakenings,
            self.sleep_cycle_count,
            round_float(self.breathing_index),
        ))
    }
}
