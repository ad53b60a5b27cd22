//! Recency hints extracted from the user's wording.
//!
//! "today", "last week", "past 3 months" and similar phrases narrow a web
//! search to a freshness window when the model did not ask for one itself.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Freshness bucket understood by search providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TimeHint {
    Day,
    Week,
    Month,
    Year,
}

impl TimeHint {
    fn from_days(days: i64) -> Self {
        match days {
            i64::MIN..=1 => Self::Day,
            2..=7 => Self::Week,
            8..=30 => Self::Month,
            _ => Self::Year,
        }
    }
}

/// A recency window derived from prompt text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeConstraint {
    pub time_hint: TimeHint,
    /// Earliest date of interest, `YYYY-MM-DD`.
    pub after: NaiveDate,
    pub days_ago: i64,
}

static TODAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\btoday\b").expect("today regex must compile"));
static YESTERDAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\byesterday\b").expect("yesterday regex must compile"));
static THIS_WEEK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bthis\s+week\b").expect("this-week regex must compile"));
static LAST_WEEK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\blast\s+week\b").expect("last-week regex must compile"));
static THIS_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bthis\s+month\b").expect("this-month regex must compile"));
static LAST_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\blast\s+month\b").expect("last-month regex must compile"));
static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:last|past|in\s+the\s+last)\s+(\d{1,3})\s+(day|week|month|year)s?\b")
        .expect("relative range regex must compile")
});

/// Extract a recency window from free text, relative to `today`.
///
/// Fixed phrases win over relative ranges; the first matching rule applies.
pub fn parse_time_constraint(text: &str, today: NaiveDate) -> Option<TimeConstraint> {
    let text = text.to_lowercase();
    let fixed = |time_hint, after, days_ago| {
        Some(TimeConstraint {
            time_hint,
            after,
            days_ago,
        })
    };

    if TODAY_RE.is_match(&text) {
        return fixed(TimeHint::Day, today, 1);
    }
    if YESTERDAY_RE.is_match(&text) {
        return fixed(TimeHint::Day, today - Duration::days(1), 1);
    }
    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    if THIS_WEEK_RE.is_match(&text) {
        return fixed(TimeHint::Week, week_start, 7);
    }
    if LAST_WEEK_RE.is_match(&text) {
        return fixed(TimeHint::Week, week_start - Duration::days(7), 7);
    }
    let month_start = today.with_day(1)?;
    if THIS_MONTH_RE.is_match(&text) {
        return fixed(TimeHint::Month, month_start, 30);
    }
    if LAST_MONTH_RE.is_match(&text) {
        let last_month_end = month_start - Duration::days(1);
        return fixed(TimeHint::Month, last_month_end.with_day(1)?, 30);
    }

    let caps = RELATIVE_RE.captures(&text)?;
    let n: i64 = caps.get(1)?.as_str().parse().ok()?;
    let days = match caps.get(2)?.as_str() {
        "day" => n,
        "week" => n * 7,
        "month" => n * 30,
        _ => n * 365,
    };
    fixed(TimeHint::from_days(days), today - Duration::days(days), days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2026-10-14 is a Wednesday.
    const TODAY: (i32, u32, u32) = (2026, 10, 14);

    fn parse(text: &str) -> Option<TimeConstraint> {
        parse_time_constraint(text, date(TODAY.0, TODAY.1, TODAY.2))
    }

    #[test]
    fn today_and_yesterday_map_to_day() {
        let c = parse("What happened TODAY in Rust news?").unwrap();
        assert_eq!((c.time_hint, c.after), (TimeHint::Day, date(2026, 10, 14)));
        let c = parse("scores from yesterday").unwrap();
        assert_eq!((c.time_hint, c.after), (TimeHint::Day, date(2026, 10, 13)));
    }

    #[test]
    fn week_phrases_anchor_on_monday() {
        assert_eq!(parse("releases this week").unwrap().after, date(2026, 10, 12));
        assert_eq!(parse("releases last  week").unwrap().after, date(2026, 10, 5));
    }

    #[test]
    fn month_phrases_anchor_on_the_first() {
        assert_eq!(parse("this month").unwrap().after, date(2026, 10, 1));
        assert_eq!(parse("last month").unwrap().after, date(2026, 9, 1));
    }

    #[test]
    fn relative_ranges_pick_a_bucket_from_the_span() {
        let c = parse("papers from the past 3 days").unwrap();
        assert_eq!((c.time_hint, c.days_ago), (TimeHint::Week, 3));
        assert_eq!(c.after, date(2026, 10, 11));
        assert_eq!(parse("in the last 2 months").unwrap().time_hint, TimeHint::Year);
        assert_eq!(parse("last 1 day").unwrap().time_hint, TimeHint::Day);
    }

    #[test]
    fn unrelated_text_has_no_constraint() {
        assert_eq!(parse("what is 2+2"), None);
        assert_eq!(parse("todayish"), None);
    }
}
