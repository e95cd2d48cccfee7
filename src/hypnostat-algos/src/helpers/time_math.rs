use chrono::{NaiveDateTime, TimeDelta};

const DAY_MS: i64 = 24 * 3600 * 1000;
const HALF_DAY_MS: i64 = 12 * 3600 * 1000;

/// Difference between the clock times of `a` and `b`, ignoring the date.
///
/// The result is wrapped into `(-12h, +12h]`, so 00:10 minus 23:50 is
/// +20 minutes and a difference of exactly half a day is reported as +12h.
pub fn subtract_relative_time(a: NaiveDateTime, b: NaiveDateTime) -> TimeDelta {
    let delta = (a.time() - b.time()).num_milliseconds();
    let wrapped = (delta + HALF_DAY_MS).rem_euclid(DAY_MS) - HALF_DAY_MS;

    if wrapped == -HALF_DAY_MS {
        TimeDelta::milliseconds(HALF_DAY_MS)
    } else {
        TimeDelta::milliseconds(wrapped)
    }
}

/// Mean at millisecond precision, zero for an empty slice.
pub fn mean_deltas(durations: &[TimeDelta]) -> TimeDelta {
    if durations.is_empty() {
        return TimeDelta::default();
    }
    let total: i128 = durations
        .iter()
        .map(|d| i128::from(d.num_milliseconds()))
        .sum();
    let mean = total / durations.len() as i128;
    i64::try_from(mean)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .unwrap_or(TimeDelta::MAX)
}

/// `part / whole * 100`, zero when `whole` is zero.
pub fn ratio_pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0_f64
    } else {
        part as f64 / whole as f64 * 100_f64
    }
}

pub fn minutes(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 60_000_f64
}

pub fn hours(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 3_600_000_f64
}

pub fn round_float(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 10, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn subtract_relative_time_table() {
        let cases = [
            ("positive_diff", dt(2, 0, 10), dt(1, 23, 50), TimeDelta::minutes(20)),
            ("negative_diff", dt(1, 23, 40), dt(1, 23, 50), TimeDelta::minutes(-10)),
            ("same_time", dt(2, 12, 0), dt(1, 12, 0), TimeDelta::zero()),
            ("wrap_around_midnight", dt(1, 0, 10), dt(1, 23, 50), TimeDelta::minutes(20)),
            (
                "wrap_around_midnight_negative",
                dt(1, 23, 50),
                dt(5, 0, 10),
                TimeDelta::minutes(-20),
            ),
            ("large_diff", dt(1, 18, 0), dt(1, 6, 0), TimeDelta::hours(12)),
            ("more_than_12_hours", dt(1, 6, 0), dt(1, 18, 0), TimeDelta::hours(12)),
        ];

        for (name, a, b, expected) in cases {
            assert_eq!(subtract_relative_time(a, b), expected, "{name}");
        }
    }

    #[test]
    fn subtract_relative_time_just_under_half_day() {
        let a = dt(1, 6, 1);
        let b = dt(1, 18, 0);
        assert_eq!(
            subtract_relative_time(a, b),
            TimeDelta::hours(12) + TimeDelta::minutes(1) - TimeDelta::hours(24)
        );
    }

    #[test]
    fn mean_deltas_empty() {
        assert_eq!(mean_deltas(&[]), TimeDelta::default());
    }

    #[test]
    fn mean_deltas_basic() {
        let durations = vec![TimeDelta::minutes(80), TimeDelta::minutes(100)];
        assert_eq!(mean_deltas(&durations), TimeDelta::minutes(90));
    }

    #[test]
    fn mean_deltas_does_not_overflow() {
        assert_eq!(mean_deltas(&[TimeDelta::MAX, TimeDelta::MAX]), TimeDelta::MAX);
        assert_eq!(
            mean_deltas(&[TimeDelta::seconds(1), TimeDelta::seconds(2)]),
            TimeDelta::milliseconds(1500)
        );
    }

    #[test]
    fn ratio_pct_zero_whole() {
        assert_eq!(ratio_pct(0, 0), 0.0);
        assert_eq!(ratio_pct(3, 0), 0.0);
    }

    #[test]
    fn ratio_pct_basic() {
        assert_eq!(ratio_pct(1, 4), 25.0);
        assert_eq!(ratio_pct(4, 4), 100.0);
    }

    #[test]
    fn minutes_and_hours() {
        assert_eq!(minutes(TimeDelta::seconds(90)), 1.5);
        assert_eq!(hours(TimeDelta::minutes(90)), 1.5);
    }

    #[test]
    fn round_float_basic() {
        assert_eq!(round_float(3.14159), 3.14);
        assert_eq!(round_float(1.999), 2.0);
        assert_eq!(round_float(57.142857), 57.14);
        assert_eq!(round_float(0.0), 0.0);
    }
}
