use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Storage format for entry and thought-log timestamps (local wall-clock time).
/// Fixed width, so lexical order in SQLite matches chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "clarity-dev",
            Profile::Prod => "clarity",
        }
    }
}

/// Get the configuration directory path
/// If profile is Dev, uses "clarity-dev" instead of "clarity"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "clarity", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path (database and notification spool)
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "clarity", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
}

/// Midnight at the start of `date`
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Half-open local interval `[midnight(date), midnight(date) + 24h)`
pub fn calendar_day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = start_of_day(date);
    (start, start + Duration::days(1))
}

/// `date` at `hour:minute:00`. Out-of-range components yield `None`.
pub fn at_time(date: NaiveDate, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    NaiveTime::from_hms_opt(hour, minute, 0).map(|time| date.and_time(time))
}

/// Parse a wall-clock time such as `19:00` or `7:05`
pub fn parse_hour_minute(value: &str) -> Option<(u32, u32)> {
    let (hour, minute) = value.trim().split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if hour <= 23 && minute <= 59 {
        Some((hour, minute))
    } else {
        None
    }
}

/// Join comma-separated tag values, trimming whitespace and dropping blanks
pub fn join_tags<S: AsRef<str>>(tags: &[S]) -> String {
    tags.iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_day_is_half_open() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let (start, end) = calendar_day_bounds(date);
        assert_eq!(format_timestamp(&start), "2024-02-28 00:00:00");
        assert_eq!(format_timestamp(&end), "2024-02-29 00:00:00");
    }

    #[test]
    fn timestamps_sort_lexically() {
        let a = parse_timestamp("2024-01-09 23:59:59").unwrap();
        let b = parse_timestamp("2024-01-10 00:00:00").unwrap();
        assert!(format_timestamp(&a) < format_timestamp(&b));
    }

    #[test]
    fn parses_hour_minute() {
        assert_eq!(parse_hour_minute("19:00"), Some((19, 0)));
        assert_eq!(parse_hour_minute(" 7:05 "), Some((7, 5)));
        assert_eq!(parse_hour_minute("24:00"), None);
        assert_eq!(parse_hour_minute("12:60"), None);
        assert_eq!(parse_hour_minute("noon"), None);
    }

    #[test]
    fn joins_tags_without_blanks() {
        assert_eq!(join_tags(&["calm", " tired ", ""]), "calm,tired");
    }

    #[test]
    fn expands_home_prefix_only() {
        assert_eq!(expand_path("/tmp/app.db"), PathBuf::from("/tmp/app.db"));
    }
}
