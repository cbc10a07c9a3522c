use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Timelike, Utc};

/// Input format for operator-supplied times, interpreted in local time.
pub const LOCAL_INPUT_FORMAT: &str = "%Y-%m-%d %H:%M";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to whole seconds.
///
/// Timestamps are stored as fixed-width RFC 3339 text and compared lexically,
/// so nothing with a fractional second may reach the database.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        truncate(Utc::now())
    }
}

pub fn truncate(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_nanosecond(0).unwrap_or(at)
}

/// Instant before which ended announcements are purged.
pub fn cutoff(now: DateTime<Utc>, retention: Duration) -> DateTime<Utc> {
    now - retention
}

/// Parse `YYYY-MM-DD HH:MM` in the process's local timezone.
pub fn parse_local(s: &str) -> Result<DateTime<Utc>, String> {
    parse_local_in(s, &Local)
}

pub fn parse_local_in<Tz: TimeZone>(s: &str, tz: &Tz) -> Result<DateTime<Utc>, String> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), LOCAL_INPUT_FORMAT)
        .map_err(|_| format!("Invalid time '{s}'. Use exactly 'YYYY-MM-DD HH:MM'."))?;
    // Ambiguous wall times (DST fall-back) resolve to the earlier instant;
    // non-existent ones (spring-forward gap) are rejected.
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("Time '{s}' does not exist in the local timezone."))
}

pub fn fmt_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %I:%M %p %Z")
        .to_string()
}
