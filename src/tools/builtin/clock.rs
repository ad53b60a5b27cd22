//! `get_current_time`: the server clock in UTC.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::tools::arguments::CurrentTimeArgs;

/// Describe `now`. Only UTC is supported; a different requested zone is
/// echoed back so the model can convert it itself.
pub fn current_time(args: &CurrentTimeArgs, now: DateTime<Utc>) -> Value {
    let mut out = json!({
        "timestamp": now.to_rfc3339_opts(SecondsFormat::Micros, false),
        "timezone": "UTC",
        "unix_timestamp": now.timestamp(),
        "formatted": now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        "date": now.format("%Y-%m-%d").to_string(),
        "time": now.format("%H:%M:%S").to_string(),
    });
    if let Some(tz) = args
        .timezone
        .as_deref()
        .map(str::trim)
        .filter(|tz| !tz.is_empty() && !tz.eq_ignore_ascii_case("utc"))
    {
        out["requested_timezone"] = Value::String(tz.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_the_given_instant() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 5, 30).unwrap();
        let out = current_time(&CurrentTimeArgs::default(), now);
        assert_eq!(out["formatted"], "2026-10-17 09:05:30 UTC");
        assert_eq!(out["date"], "2026-10-17");
        assert_eq!(out["time"], "09:05:30");
        assert_eq!(out["unix_timestamp"], now.timestamp());
        assert!(out.get("requested_timezone").is_none());
    }

    #[test]
    fn echoes_non_utc_zone() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let args = CurrentTimeArgs {
            timezone: Some("America/New_York".into()),
        };
        let out = current_time(&args, now);
        assert_eq!(out["timezone"], "UTC");
        assert_eq!(out["requested_timezone"], "America/New_York");
    }
}
