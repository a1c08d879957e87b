//! Time helpers shared by collectors

use chrono::{NaiveDateTime, Timelike};

/// Drop seconds and sub-seconds so readings from one poll share a key
#[must_use]
pub fn truncate_to_minute(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

/// Render seconds since boot as `UP [{d} Days, ]{h}:{mm}:{ss}`
#[must_use]
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let rest = seconds % 86_400;
    let (hours, minutes, secs) = (rest / 3600, (rest % 3600) / 60, rest % 60);

    let mut out = String::from("UP ");
    if days > 0 {
        out.push_str(&format!("{days} Days, "));
    }
    out.push_str(&format!("{hours}:{minutes:02}:{secs:02}"));
    out
}
