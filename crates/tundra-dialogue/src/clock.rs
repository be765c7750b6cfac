//! In-world time of day, for players who ask what time it is.

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// The reply to a time query at `now`, in the zone `offset_minutes` east of
/// UTC, e.g. `It's currently 03:45pm`.
///
/// Offsets outside a day fall back to UTC.
pub fn time_reply(now: DateTime<Utc>, offset_minutes: i32) -> String {
    let offset = offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());
    let local = now.with_timezone(&offset);
    format!("It's currently {}", local.format("%I:%M%p").to_string().to_lowercase())
}
