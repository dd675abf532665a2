use chrono::{SecondsFormat, Utc};

/// Milliseconds since the unix epoch, or zero if the clock reads before it.
#[inline]
pub fn current_millis() -> u128 {
    u128::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// RFC 3339 UTC timestamp with millisecond precision, as written into the
/// manifest and backup files.
#[inline]
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
