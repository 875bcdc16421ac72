//! Clock and countdown helpers for focusd
//!
//! Every timer computation works from wall-clock timestamps, never from a
//! locally incremented counter, so all components read the clock through
//! [`now`].
//!
//! # Mock Time for Development
//!
//! In debug builds, the `FOCUS_MOCK_TIME` environment variable can be set
//! to shift the clock for the daemon and the views. The mock clock advances
//! at the real rate from the given start point.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` in UTC (e.g., `2025-12-25 14:30:00`)

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "FOCUS_MOCK_TIME";

/// Format accepted by [`MOCK_TIME_ENV_VAR`]
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            let raw = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
            match parse_mock_time(&raw) {
                Some(mock_dt) => {
                    let offset = mock_dt.signed_duration_since(Utc::now());
                    tracing::info!(
                        mock_time = %raw,
                        offset_secs = offset.num_seconds(),
                        "Mock time enabled"
                    );
                    Some(offset)
                }
                None => {
                    tracing::warn!(
                        mock_time = %raw,
                        expected_format = MOCK_TIME_FORMAT,
                        "Invalid mock time format"
                    );
                    None
                }
            }
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Parse a mock time string in [`MOCK_TIME_FORMAT`]
pub fn parse_mock_time(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), MOCK_TIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Current wall-clock time, respecting mock time in debug builds.
pub fn now() -> DateTime<Utc> {
    let real_now = Utc::now();
    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Format a countdown as `M:SS`, or `MM:SS` when `pad_minutes` is set.
pub fn format_countdown(total_secs: u64, pad_minutes: bool) -> String {
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    if pad_minutes {
        format!("{:02}:{:02}", minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Whole seconds left in `remaining_ms`, rounded down and clamped at zero.
pub fn floor_secs(remaining_ms: i64) -> u64 {
    if remaining_ms <= 0 {
        0
    } else {
        (remaining_ms / 1000) as u64
    }
}

/// Minutes needed to cover `secs`, rounded up, so one second reads as one minute.
pub fn ceil_minutes(secs: u64) -> u64 {
    secs.div_ceil(60)
}
