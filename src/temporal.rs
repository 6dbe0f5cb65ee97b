//! Temporal phrase resolution.
//!
//! Turns raw temporal text ("by Friday", "in 3 weeks", "March 15") into an
//! absolute date where possible, and an urgency bucket either way.
//! Unparseable input resolves to nothing; an absent date is a valid,
//! lower-confidence case downstream, never an error.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use regex::Regex;

use crate::types::{TemporalReference, UrgencyBucket};

// Compile-once regex patterns via OnceLock.
fn re_iso_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap())
}

fn re_relative_count() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bin\s+(\d{1,3})\s+(day|week|month)s?\b").unwrap())
}

fn re_month_day() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b",
        )
        .unwrap()
    })
}

fn re_weekday() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(next\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b")
            .unwrap()
    })
}

/// Resolve a temporal phrase to an absolute date, if possible.
pub fn resolve(raw: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
    let today = now.date_naive();
    let lower = raw.to_lowercase();

    if let Some(caps) = re_iso_date().captures(&lower) {
        let y: i32 = caps[1].parse().ok()?;
        let m: u32 = caps[2].parse().ok()?;
        let d: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }

    if lower.contains("tomorrow") {
        return Some(today + Duration::days(1));
    }
    if lower.contains("today") || lower.contains("tonight") {
        return Some(today);
    }

    if let Some(caps) = re_relative_count().captures(&lower) {
        let n: i64 = caps[1].parse().ok()?;
        let days = match caps[2].to_lowercase().as_str() {
            "day" => n,
            "week" => n * 7,
            _ => n * 30,
        };
        return Some(today + Duration::days(days));
    }

    if let Some(caps) = re_month_day().captures(&lower) {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let candidate = NaiveDate::from_ymd_opt(today.year(), month, day)?;
        // A month/day already behind us means next year.
        if candidate < today {
            return NaiveDate::from_ymd_opt(today.year() + 1, month, day);
        }
        return Some(candidate);
    }

    if lower.contains("next week") {
        return Some(today + Duration::days(7));
    }
    if lower.contains("next month") {
        return Some(today + Duration::days(30));
    }
    if lower.contains("this weekend") {
        return Some(upcoming(today, Weekday::Sat));
    }
    if lower.contains("end of the week") || lower.contains("end of week") {
        return Some(upcoming(today, Weekday::Sun));
    }
    if lower.contains("end of the month") || lower.contains("end of month") {
        return last_day_of_month(today);
    }

    if let Some(caps) = re_weekday().captures(&lower) {
        let target = weekday_from(&caps[2])?;
        let mut ahead = days_until(today, target);
        // "next <weekday>" lands in the following week.
        if caps.get(1).is_some() {
            ahead = if ahead == 0 { 7 } else { ahead + 7 };
        }
        return Some(today + Duration::days(ahead));
    }

    None
}

/// Build a full temporal reference from raw text.
///
/// A reference is vague when no absolute date could be resolved; the
/// bucket then comes from phrase cues alone.
pub fn reference_from(raw: &str, now: DateTime<Utc>) -> TemporalReference {
    let raw = raw.trim();
    if raw.is_empty() {
        return TemporalReference {
            raw: String::new(),
            resolved_date: None,
            is_vague: true,
            bucket: None,
        };
    }

    let resolved = resolve(raw, now);
    let bucket = match resolved {
        Some(d) => Some(bucket_from_date(d, now.date_naive())),
        None => bucket_from_text(raw),
    };

    TemporalReference {
        raw: raw.to_string(),
        resolved_date: resolved,
        is_vague: resolved.is_none(),
        bucket,
    }
}

/// Bucket a resolved date by day delta from today.
pub fn bucket_from_date(date: NaiveDate, today: NaiveDate) -> UrgencyBucket {
    let delta = (date - today).num_days();
    if delta <= 0 {
        UrgencyBucket::Today
    } else if delta == 1 {
        UrgencyBucket::Tomorrow
    } else if delta <= 7 {
        UrgencyBucket::ThisWeek
    } else if delta <= 30 {
        UrgencyBucket::ThisMonth
    } else {
        UrgencyBucket::Later
    }
}

/// Bucket from phrase cues when no date resolved.
pub fn bucket_from_text(raw: &str) -> Option<UrgencyBucket> {
    let lower = raw.to_lowercase();
    if lower.contains("today")
        || lower.contains("tonight")
        || lower.contains("asap")
        || lower.contains("right away")
    {
        return Some(UrgencyBucket::Today);
    }
    if lower.contains("tomorrow") {
        return Some(UrgencyBucket::Tomorrow);
    }
    if lower.contains("this week") || lower.contains("soon") || re_weekday().is_match(&lower) {
        return Some(UrgencyBucket::ThisWeek);
    }
    if lower.contains("this month") || lower.contains("next week") {
        return Some(UrgencyBucket::ThisMonth);
    }
    if lower.contains("later")
        || lower.contains("eventually")
        || lower.contains("someday")
        || lower.contains("sometime")
        || lower.contains("next month")
    {
        return Some(UrgencyBucket::Later);
    }
    None
}

fn month_number(abbrev: &str) -> Option<u32> {
    match abbrev.to_lowercase().as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

fn weekday_from(name: &str) -> Option<Weekday> {
    match name.to_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Days from `today` to the next occurrence of `target` (0 when today
/// already is that weekday).
fn days_until(today: NaiveDate, target: Weekday) -> i64 {
    let cur = today.weekday().num_days_from_monday() as i64;
    let tgt = target.num_days_from_monday() as i64;
    (tgt - cur).rem_euclid(7)
}

fn upcoming(today: NaiveDate, target: Weekday) -> NaiveDate {
    today + Duration::days(days_until(today, target))
}

fn last_day_of_month(today: NaiveDate) -> Option<NaiveDate> {
    let (y, m) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1).map(|first_of_next| first_of_next - Duration::days(1))
}
