use std::fmt::Display;

use chrono::TimeDelta;
use hypnostat_types::{Epoch, Timeline};
use serde::Serialize;
use strum::Display as StrumDisplay;

use crate::{
    MetricResult,
    helpers::{
        format_hm::FormatHM,
        time_math::{hours, ratio_pct, round_float},
    },
};

/// Severity bands of the breathing index (events per hour of sleep).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, StrumDisplay)]
#[serde(rename_all = "snake_case")]
pub enum BreathingPattern {
    #[default]
    Normal,
    Mild,
    Moderate,
    Severe,
}

/// Respiratory summary over sleep epochs.
///
/// Unannotated timelines breathe stably throughout; ratios and snoring
/// figures are `None` for them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreathingMetrics {
    pub time_in_stable_breath: TimeDelta,
    pub time_in_unstable_breath: TimeDelta,
    /// Runs of consecutive apnea/hypopnea sleep epochs.
    pub unstable_breath_count: u32,
    pub breathing_index: f64,
    pub pattern: BreathingPattern,
    pub stable_breath_ratio: Option<f64>,
    pub unstable_breath_ratio: Option<f64>,
    pub time_in_snoring: Option<TimeDelta>,
    pub time_in_no_snoring: Option<TimeDelta>,
    pub snoring_ratio: Option<f64>,
    pub no_snoring_ratio: Option<f64>,
    pub snoring_count: Option<u32>,
}

impl BreathingPattern {
    const MILD: f64 = 5.0;
    const MODERATE: f64 = 15.0;
    const SEVERE: f64 = 30.0;

    pub fn from_index(index: f64) -> Self {
        if index >= Self::SEVERE {
            Self::Severe
        } else if index >= Self::MODERATE {
            Self::Moderate
        } else if index >= Self::MILD {
            Self::Mild
        } else {
            Self::Normal
        }
    }
}

impl BreathingMetrics {
    pub fn calculate(timeline: &Timeline) -> Self {
        let epochs = timeline.epochs();
        let is_unstable = |e: &Epoch| e.stage().is_sleep() && e.event().is_unstable();
        let is_snoring = |e: &Epoch| e.stage().is_sleep() && e.event().is_snore();

        let sleep = epochs.iter().filter(|e| e.stage().is_sleep()).count();
        let unstable = epochs.iter().filter(|e| is_unstable(*e)).count();
        let snoring = epochs.iter().filter(|e| is_snoring(*e)).count();

        let unstable_breath_count = count_runs(epochs, is_unstable);
        let sleep_hours = hours(timeline.span(sleep));
        let breathing_index = if sleep_hours > 0.0 {
            f64::from(unstable_breath_count) / sleep_hours
        } else {
            0.0
        };

        let annotated = |value| timeline.has_events().then_some(value);

        Self {
            time_in_stable_breath: timeline.span(sleep - unstable),
            time_in_unstable_breath: timeline.span(unstable),
            unstable_breath_count,
            breathing_index,
            pattern: BreathingPattern::from_index(breathing_index),
            stable_breath_ratio: annotated(ratio_pct(sleep - unstable, sleep)),
            unstable_breath_ratio: annotated(ratio_pct(unstable, sleep)),
            time_in_snoring: timeline.has_events().then(|| timeline.span(snoring)),
            time_in_no_snoring: timeline.has_events().then(|| timeline.span(sleep - snoring)),
            snoring_ratio: annotated(ratio_pct(snoring, sleep)),
            no_snoring_ratio: annotated(ratio_pct(sleep - snoring, sleep)),
            snoring_count: timeline
                .has_events()
                .then(|| count_runs(epochs, is_snoring)),
        }
    }

    pub(crate) fn extend_metric_result(&self, result: &mut MetricResult) {
        result.insert_minutes("stable_breath_min", self.time_in_stable_breath);
        result.insert_minutes("unstable_breath_min", self.time_in_unstable_breath);
        result.insert("unstable_breath_count", f64::from(self.unstable_breath_count));
        result.insert("breathing_index", self.breathing_index);
        result.insert_opt("stable_breath_pct", self.stable_breath_ratio);
        result.insert_opt("unstable_breath_pct", self.unstable_breath_ratio);
        result.insert_opt_minutes("snoring_min", self.time_in_snoring);
        result.insert_opt_minutes("no_snoring_min", self.time_in_no_snoring);
        result.insert_opt("snoring_pct", self.snoring_ratio);
        result.insert_opt("no_snoring_pct", self.no_snoring_ratio);
        result.insert_opt("snoring_count", self.snoring_count.map(f64::from));
    }
}

/// Number of maximal runs of consecutive epochs matching `predicate`.
fn count_runs(epochs: &[Epoch], predicate: impl Fn(&Epoch) -> bool) -> u32 {
    let mut runs = 0;
    let mut in_run = false;
    for epoch in epochs {
        let matched = predicate(epoch);
        if matched && !in_run {
            runs += 1;
        }
        in_run = matched;
    }
    runs
}

impl Display for BreathingMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "Breathing index: {} ({})\nUnstable breath: {} in {} events",
            round_float(self.breathing_index),
            self.pattern,
            self.time_in_unstable_breath.format_hm(),
            self.unstable_breath_count,
        ))?;
        if let Some((time, count)) = self.time_in_snoring.zip(self.snoring_count) {
            f.write_fmt(format_args!(
                "\nSnoring: {} in {} events",
                time.format_hm(),
                count
            ))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use hypnostat_types::{RespiratoryEvent, StageKind};
    use RespiratoryEvent::*;
    use StageKind::*;

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
    }

    fn timeline(epochs: &[(StageKind, RespiratoryEvent)]) -> Timeline {
        Timeline::from_annotated_stages(
            base_time(),
            TimeDelta::minutes(1),
            epochs.iter().copied(),
        )
        .unwrap()
    }

    #[test]
    fn pattern_bands() {
        assert_eq!(BreathingPattern::from_index(0.0), BreathingPattern::Normal);
        assert_eq!(BreathingPattern::from_index(4.99), BreathingPattern::Normal);
        assert_eq!(BreathingPattern::from_index(5.0), BreathingPattern::Mild);
        assert_eq!(BreathingPattern::from_index(15.0), BreathingPattern::Moderate);
        assert_eq!(BreathingPattern::from_index(42.0), BreathingPattern::Severe);
        assert_eq!(BreathingPattern::Moderate.to_string(), "Moderate");
    }

    #[test]
    fn no_sleep_means_zero_index() {
        let metrics = BreathingMetrics::calculate(&timeline(&[(Wake, Apnea), (Wake, Snore)]));
        assert_eq!(metrics.breathing_index, 0.0);
        assert_eq!(metrics.unstable_breath_count, 0);
        assert_eq!(metrics.snoring_count, Some(0));
        assert_eq!(metrics.stable_breath_ratio, Some(0.0));
    }

    #[test]
    fn unannotated_sleep_is_stable() {
        let timeline =
            Timeline::from_stages(base_time(), TimeDelta::minutes(1), [Wake, N2, N2, Rem]).unwrap();
        let metrics = BreathingMetrics::calculate(&timeline);
        assert_eq!(metrics.time_in_stable_breath, TimeDelta::minutes(3));
        assert_eq!(metrics.time_in_unstable_breath, TimeDelta::zero());
        assert_eq!(metrics.unstable_breath_count, 0);
        assert_eq!(metrics.breathing_index, 0.0);
        assert_eq!(metrics.pattern, BreathingPattern::Normal);
        assert_eq!(metrics.stable_breath_ratio, None);
        assert_eq!(metrics.time_in_snoring, None);
        assert_eq!(metrics.snoring_count, None);

        let mut result = MetricResult::default();
        metrics.extend_metric_result(&mut result);
        assert_eq!(result.get("breathing_index"), Some(0.0));
        assert_eq!(result.get("stable_breath_min"), Some(3.0));
        assert!(!result.contains("snoring_pct"));
        assert!(!result.contains("stable_breath_pct"));
        assert!(!metrics.to_string().contains("Snoring"));
    }

    #[test]
    fn counts_runs_during_sleep() {
        let mut epochs = vec![(N2, NoEvent); 60];
        // one apnea run spanning two epochs, one hypopnea, one apnea while awake
        epochs[5] = (N2, Apnea);
        epochs[6] = (N2, Hypopnea);
        epochs[20] = (N3, Hypopnea);
        epochs[30] = (Wake, Apnea);
        epochs[40] = (Rem, Snore);
        epochs[41] = (Rem, Snore);
        epochs[50] = (N2, Snore);

        let metrics = BreathingMetrics::calculate(&timeline(&epochs));
        assert_eq!(metrics.unstable_breath_count, 2);
        assert_eq!(metrics.time_in_unstable_breath, TimeDelta::minutes(3));
        assert_eq!(metrics.time_in_stable_breath, TimeDelta::minutes(56));
        assert_eq!(metrics.snoring_count, Some(2));
        assert_eq!(metrics.time_in_snoring, Some(TimeDelta::minutes(3)));
        assert_eq!(metrics.time_in_no_snoring, Some(TimeDelta::minutes(56)));
        // 2 events over 59 minutes of sleep
        assert!((metrics.breathing_index - 2.0 / (59.0 / 60.0)).abs() < 1e-9);
        assert_eq!(metrics.pattern, BreathingPattern::Normal);
    }

    #[test]
    fn frequent_events_are_severe() {
        let epochs = (0..60)
            .map(|i| {
                if i % 2 == 0 {
                    (N2, Apnea)
                } else {
                    (N2, NoEvent)
                }
            })
            .collect::<Vec<_>>();
        let metrics = BreathingMetrics::calculate(&timeline(&epochs));
        assert_eq!(metrics.unstable_breath_count, 30);
        assert_eq!(metrics.breathing_index, 30.0);
        assert_eq!(metrics.pattern, BreathingPattern::Severe);
        assert_eq!(metrics.unstable_breath_ratio, Some(50.0));
    }
}
