use chrono::{NaiveTime, TimeDelta, Timelike as _};

pub trait FormatHM {
    fn format_hm(&self) -> String;
}

impl FormatHM for TimeDelta {
    fn format_hm(&self) -> String {
        let total = self.num_seconds() as f64 / 60.0;
        if total < 0.0 {
            format!("-{}", (-total).format_hm())
        } else {
            total.format_hm()
        }
    }
}

impl FormatHM for f64 {
    fn format_hm(&self) -> String {
        let minutes = self % 1440.0;
        let h = (minutes / 60.0) as i32;
        let m = (minutes % 60.0) as i32;
        format!("{:02}:{:02}", h, m)
    }
}

impl FormatHM for NaiveTime {
    fn format_hm(&self) -> String {
        format!("{:02}:{:02}", self.hour(), self.minute())
    }
}

/// `2h 30m 45s` style durations, omitting zero parts.
pub trait FormatVerbose {
    fn format_verbose(&self) -> String;
}

impl FormatVerbose for TimeDelta {
    fn format_verbose(&self) -> String {
        let seconds = self.num_seconds();
        if seconds == 0 {
            return "0s".to_string();
        }

        let sign = if seconds < 0 { "-" } else { "" };
        let seconds = seconds.unsigned_abs();
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        let secs = seconds % 60;

        let mut parts = Vec::new();
        if hours > 0 {
            parts.push(format!("{hours}h"));
        }
        if minutes > 0 {
            parts.push(format!("{minutes}m"));
        }
        if secs > 0 || parts.is_empty() {
            parts.push(format!("{secs}s"));
        }

        format!("{sign}{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_hm_delta() {
        assert_eq!(TimeDelta::minutes(90).format_hm(), "01:30");
        assert_eq!(TimeDelta::minutes(-15).format_hm(), "-00:15");
        assert_eq!(TimeDelta::zero().format_hm(), "00:00");
    }

    #[test]
    fn format_hm_time() {
        let t = NaiveTime::from_hms_opt(23, 5, 59).unwrap();
        assert_eq!(t.format_hm(), "23:05");
    }

    #[test]
    fn format_verbose_examples() {
        assert_eq!(TimeDelta::zero().format_verbose(), "0s");
        assert_eq!(TimeDelta::seconds(300).format_verbose(), "5m");
        assert_eq!(TimeDelta::seconds(3600).format_verbose(), "1h");
        assert_eq!(TimeDelta::seconds(3665).format_verbose(), "1h 1m 5s");
        assert_eq!(TimeDelta::seconds(9045).format_verbose(), "2h 30m 45s");
        assert_eq!(TimeDelta::seconds(30).format_verbose(), "30s");
        assert_eq!(TimeDelta::seconds(-90).format_verbose(), "-1m 30s");
    }
}
