// src/utils/dates.rs
use chrono::NaiveDate;

/// Parses an acquisition date from a scene directory name like "2023-01-05".
/// Names that do not follow the convention yield None and are ignored by the
/// time-series scans.
pub fn parse_scene_date(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, "%Y-%m-%d").ok()
}

pub fn in_range(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    start <= date && date <= end
}
