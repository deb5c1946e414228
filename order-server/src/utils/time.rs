//! Time helpers in the business timezone
//!
//! Storage only sees `i64` Unix millis and `YYYYMMDD` day keys; conversion
//! from wall-clock time happens here.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Current Unix millis
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Calendar day of `now` in `tz`
pub fn business_day(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// `YYYYMMDD`
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parse an IANA timezone name (e.g. "Europe/Madrid")
pub fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.parse::<Tz>()
        .map_err(|e| format!("Invalid timezone '{}': {}", name, e))
}
