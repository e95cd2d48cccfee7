use std::collections::BTreeMap;

use chrono::{DurationRound as _, NaiveDateTime, TimeDelta};
use hypnostat_types::{StageGroup, Timeline};
use serde::Serialize;

use crate::helpers::{format_hm::FormatVerbose, time_math::ratio_pct};

const TIME_FORMAT: &str = "%I:%M %p";

/// Run of consecutive epochs in the same stage group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageEvent {
    pub start_epoch: usize,
    #[serde(skip)]
    pub start: NaiveDateTime,
    pub stage: StageGroup,
    #[serde(skip)]
    pub epochs: usize,
    pub duration: String,
}

/// Events starting within one clock hour, as `[index, stage, duration]` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourGroup {
    pub hour_range: String,
    pub stages: Vec<(usize, StageGroup, String)>,
}

/// Human-readable hypnogram summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HypnogramReport {
    pub sleep_time: String,
    pub duration: String,
    /// Stage name to `[duration, percentage]`.
    pub sleep_stage_summary: BTreeMap<&'static str, (String, String)>,
    pub sleep_stages_by_hour: Vec<HourGroup>,
}

impl HypnogramReport {
    pub fn generate(timeline: &Timeline) -> Self {
        let events = Self::extract_events(timeline);
        let sleep_time = timeline
            .start()
            .zip(timeline.end())
            .map(|(start, end)| format_time_range(start, end))
            .unwrap_or_default();

        Self {
            sleep_time,
            duration: timeline.duration().format_verbose(),
            sleep_stage_summary: Self::stage_summary(timeline),
            sleep_stages_by_hour: Self::group_by_hour(&events),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn extract_events(timeline: &Timeline) -> Vec<StageEvent> {
        let mut events: Vec<StageEvent> = Vec::new();

        for (index, epoch) in timeline.iter().enumerate() {
            let stage = epoch.stage().group();
            match events.last_mut() {
                Some(last) if last.stage == stage => last.epochs += 1,
                _ => events.push(StageEvent {
                    start_epoch: index,
                    start: epoch.start(),
                    stage,
                    epochs: 1,
                    duration: String::new(),
                }),
            }
        }

        for event in &mut events {
            event.duration = timeline.span(event.epochs).format_verbose();
        }

        events
    }

    fn stage_summary(timeline: &Timeline) -> BTreeMap<&'static str, (String, String)> {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for epoch in timeline {
            *counts.entry(epoch.stage().group().into()).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(name, count)| {
                let duration = timeline.span(count).format_verbose();
                let percentage = format!("{:.1}%", ratio_pct(count, timeline.len()));
                (name, (duration, percentage))
            })
            .collect()
    }

    fn group_by_hour(events: &[StageEvent]) -> Vec<HourGroup> {
        let Some(first) = events.first() else {
            return Vec::new();
        };

        let hour = TimeDelta::hours(1);
        let mut current_hour = first.start.duration_trunc(hour).unwrap_or(first.start);
        let mut next_hour = next(current_hour, hour);
        let mut groups = Vec::new();
        let mut group = HourGroup::new(current_hour, next_hour);

        for (i, event) in events.iter().enumerate() {
            while event.start >= next_hour {
                if !group.stages.is_empty() {
                    groups.push(group);
                }
                current_hour = next_hour;
                next_hour = next(current_hour, hour);
                group = HourGroup::new(current_hour, next_hour);
            }
            group
                .stages
                .push((i + 1, event.stage, event.duration.clone()));
        }

        if !group.stages.is_empty() {
            groups.push(group);
        }

        groups
    }
}

impl HourGroup {
    fn new(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self {
            hour_range: format_time_range(from, to),
            stages: Vec::new(),
        }
    }
}

fn next(time: NaiveDateTime, step: TimeDelta) -> NaiveDateTime {
    time.checked_add_signed(step).unwrap_or(NaiveDateTime::MAX)
}

fn format_time_range(from: NaiveDateTime, to: NaiveDateTime) -> String {
    format!("{} - {}", from.format(TIME_FORMAT), to.format(TIME_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hypnostat_types::StageKind;
    use StageKind::*;

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
    }

    fn timeline(blocks: &[(StageKind, usize)]) -> Timeline {
        let stages = blocks
            .iter()
            .flat_map(|&(stage, n)| std::iter::repeat_n(stage, n))
            .collect::<Vec<_>>();
        Timeline::from_stages(base_time(), TimeDelta::seconds(30), stages).unwrap()
    }

    #[test]
    fn empty_report() {
        let report = HypnogramReport::generate(&timeline(&[]));
        assert_eq!(report.sleep_time, "");
        assert_eq!(report.duration, "0s");
        assert!(report.sleep_stage_summary.is_empty());
        assert!(report.sleep_stages_by_hour.is_empty());
    }

    #[test]
    fn events_merge_light_stages() {
        let events = HypnogramReport::extract_events(&timeline(&[
            (Wake, 2),
            (N1, 1),
            (N2, 3),
            (N3, 2),
            (Rem, 1),
        ]));
        let summary = events
            .iter()
            .map(|e| (e.start_epoch, e.stage, e.duration.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (0, StageGroup::Wake, "1m"),
                (2, StageGroup::Light, "2m"),
                (6, StageGroup::Deep, "1m"),
                (8, StageGroup::Rem, "30s"),
            ]
        );
    }

    #[test]
    fn full_night_report() {
        // 1h wake, 30m light, 40m deep, 20m REM
        let report = HypnogramReport::generate(&timeline(&[
            (Wake, 120),
            (N2, 60),
            (N3, 80),
            (Rem, 40),
        ]));

        assert_eq!(report.sleep_time, "11:00 PM - 01:30 AM");
        assert_eq!(report.duration, "2h 30m");
        assert_eq!(
            report.sleep_stage_summary["Wake"],
            ("1h".to_string(), "40.0%".to_string())
        );
        assert_eq!(
            report.sleep_stage_summary["Deep"],
            ("40m".to_string(), "26.7%".to_string())
        );
        assert_eq!(
            report.sleep_stage_summary["REM"],
            ("20m".to_string(), "13.3%".to_string())
        );

        let hours = &report.sleep_stages_by_hour;
        assert_eq!(hours.len(), 3);
        assert_eq!(hours[0].hour_range, "11:00 PM - 12:00 AM");
        assert_eq!(hours[0].stages, vec![(1, StageGroup::Wake, "1h".to_string())]);
        assert_eq!(hours[1].hour_range, "12:00 AM - 01:00 AM");
        assert_eq!(
            hours[1].stages,
            vec![
                (2, StageGroup::Light, "30m".to_string()),
                (3, StageGroup::Deep, "40m".to_string()),
            ]
        );
        assert_eq!(hours[2].hour_range, "01:00 AM - 02:00 AM");
        assert_eq!(hours[2].stages, vec![(4, StageGroup::Rem, "20m".to_string())]);
    }

    #[test]
    fn skips_empty_hours() {
        let report = HypnogramReport::generate(&timeline(&[(N2, 240), (Rem, 10)]));
        let ranges = report
            .sleep_stages_by_hour
            .iter()
            .map(|h| h.hour_range.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ranges, vec!["11:00 PM - 12:00 AM", "01:00 AM - 02:00 AM"]);
    }

    #[test]
    fn last_hour_of_the_calendar() {
        let start = NaiveDateTime::MAX - TimeDelta::minutes(30);
        let timeline =
            Timeline::from_stages(start, TimeDelta::seconds(30), vec![N2; 20]).unwrap();
        let report = HypnogramReport::generate(&timeline);
        assert_eq!(report.sleep_stages_by_hour.len(), 1);
        assert_eq!(report.duration, "10m");
    }

    #[test]
    fn json_shape() {
        let report = HypnogramReport::generate(&timeline(&[(Wake, 2), (Rem, 2)]));
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["duration"], "2m");
        assert_eq!(json["sleep_stage_summary"]["REM"][1], "50.0%");
        assert_eq!(json["sleep_stages_by_hour"][0]["stages"][1][0], 2);
        assert_eq!(json["sleep_stages_by_hour"][0]["stages"][1][1], "REM");
        assert_eq!(json["sleep_stages_by_hour"][0]["stages"][1][2], "1m");
    }
}
