//! Relative-time formatting for completed-row date cells
//!
//! Recent completion times display as "3 days ago"; anything older than
//! eight days falls back to the absolute timestamp.

use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 3600;
const DAY: i64 = 86400;
const WEEK: i64 = 7 * DAY;
/// Beyond this the relative form stops being useful
const ABSOLUTE_CUTOFF: i64 = 8 * DAY;

const UNITS: [(i64, &str); 5] = [
    (WEEK, "weeks"),
    (DAY, "days"),
    (HOUR, "hours"),
    (MINUTE, "minutes"),
    (1, "seconds"),
];

/// Format a completion time relative to `now`.
///
/// Returns an empty string for sub-second or future times (the cell is
/// simply left blank until the next refresh).
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vfp_common::relative_time::format_relative;
///
/// let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
/// let then = Utc.with_ymd_and_hms(2024, 5, 7, 12, 0, 0).unwrap();
/// assert_eq!(format_relative(then, now), "3 days ago");
/// ```
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let difference = (now - then).num_seconds();

    if difference > ABSOLUTE_CUTOFF {
        return then.format("%Y-%m-%d %H:%M").to_string();
    }

    for (divisor, unit) in UNITS {
        if difference > divisor {
            let count = difference / divisor;
            let unit = if count == 1 {
                // Remove the 's' if only 1
                &unit[..unit.len() - 1]
            } else {
                unit
            };
            return format!("{} {} ago", count, unit);
        }
    }

    String::new()
}
