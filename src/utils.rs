use chrono::{DateTime, TimeZone, Timelike};
use time::format_description::well_known::Rfc3339;

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// `[local midnight, now]` in whole Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: i64,
    pub end: i64,
}

pub fn local_day_window<Tz: TimeZone>(now: &DateTime<Tz>) -> DayWindow {
    let end = now.timestamp();
    let start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| now.timezone().from_local_datetime(&midnight).earliest())
        .map(|midnight| midnight.timestamp())
        // Midnight can be skipped by a DST jump; count back from now instead.
        .unwrap_or_else(|| end - i64::from(now.num_seconds_from_midnight()));
    DayWindow { start, end }
}

pub fn current_day_window() -> DayWindow {
    local_day_window(&chrono::Local::now())
}
