//! Delivery gates: the do-not-disturb window and the weekday allowlist.
//!
//! Trigger detection runs regardless; these checks only decide whether a
//! candidate is allowed to fire right now. The quiet window may wrap
//! midnight (23:00–08:00 by default), and equal endpoints disable it.

use chrono::{DateTime, Datelike, Timelike, Utc};

use thymos_core::proactive::{parse_hhmm, weekday_key, ProactiveConfig};

/// Quiet window membership over minutes-of-day. Half-open on the end so a
/// window ending 08:00 frees the 08:00 tick itself.
fn in_quiet_hours(start: u16, end: u16, minute_of_day: u16) -> bool {
    if start == end {
        return false;
    }
    if start < end {
        minute_of_day >= start && minute_of_day < end
    } else {
        // Wraps midnight.
        minute_of_day >= start || minute_of_day < end
    }
}

/// Whether a proactive message may be delivered at `now` under `config`.
///
/// Checks the enabled flag, the weekday allowlist and the quiet window, in
/// that order. Rows with unparseable quiet times (written before validation
/// existed) fall back to no quiet window rather than silencing the pair.
pub fn delivery_allowed(config: &ProactiveConfig, now: DateTime<Utc>) -> bool {
    if !config.enabled {
        return false;
    }

    let day = weekday_key(now.weekday());
    if !config.active_days.iter().any(|d| d == day) {
        return false;
    }

    match (parse_hhmm(&config.quiet_start), parse_hhmm(&config.quiet_end)) {
        (Some(start), Some(end)) => {
            let minute_of_day = (now.hour() * 60 + now.minute()) as u16;
            !in_quiet_hours(start, end, minute_of_day)
        }
        _ => true,
    }
}
