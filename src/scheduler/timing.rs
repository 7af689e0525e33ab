//! Next-run computation.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Offset, TimeZone, Utc};
use rand::Rng;

/// Runs are never closer together than this.
pub const MIN_INTERVAL_HOURS: i64 = 72;
/// Upper edge of the randomized window.
pub const MAX_WINDOW_HOURS: i64 = 168;

/// Parse `HH:MM`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

/// Draw a point in `[clamp(H, 72h, 168h), max(that, 168h)]` after `now` and snap it
/// forward to the next preferred time of day.
pub fn next_run_at<R: Rng + ?Sized>(
    now: DateTime<Utc>,
    interval_hours: u32,
    preferred: &[NaiveTime],
    utc_offset_minutes: i32,
    rng: &mut R,
) -> DateTime<Utc> {
    let lower = i64::from(interval_hours).clamp(MIN_INTERVAL_HOURS, MAX_WINDOW_HOURS) * 3600;
    let upper = lower.max(MAX_WINDOW_HOURS * 3600);
    let candidate = now + Duration::seconds(rng.gen_range(lower..=upper));
    snap_forward(candidate, preferred, utc_offset_minutes)
}

/// Earliest preferred time at or after `candidate`, evaluated in the given offset.
pub fn snap_forward(
    candidate: DateTime<Utc>,
    preferred: &[NaiveTime],
    utc_offset_minutes: i32,
) -> DateTime<Utc> {
    if preferred.is_empty() {
        return candidate;
    }
    let zone = FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    let local = candidate.with_timezone(&zone);

    let mut times = preferred.to_vec();
    times.sort();

    for day in 0..=1 {
        let date = local.date_naive() + Duration::days(day);
        for time in &times {
            let Some(slot) = zone.from_local_datetime(&date.and_time(*time)).single() else {
                continue;
            };
            if slot >= local {
                return slot.with_timezone(&Utc);
            }
        }
    }
    candidate
}
