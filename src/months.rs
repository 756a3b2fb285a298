use crate::utils::first_of_month;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Formats attempted before falling back to the range regex. QuickBooks
/// month columns that survived Excel typing arrive as ISO strings; hand-typed
/// sheets tend to use "January 2025" style labels.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y"];
const MONTH_YEAR_FORMATS: &[&str] = &["%d %B %Y", "%d %b %Y"];

fn range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Month name (full or 3-letter) followed eventually by a 4-digit year,
        // e.g. "Dec 1 - Dec 18 2025" or "December 1-18 2025". First month
        // match wins when a label spans a month boundary.
        Regex::new(
            r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec)\b.*?(\d{4})",
        )
        .expect("month range regex is valid")
    })
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let n = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

/// Parses an arbitrary month-label string into the first day of its calendar
/// month, or None when the label is unparseable. Day-of-month and day-range
/// information is deliberately discarded; only month-year granularity
/// survives.
pub fn parse_month_label(label: &str) -> Option<NaiveDate> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(label, fmt) {
            return Some(first_of_month(date));
        }
    }

    // "January 2025" has no day component; prefix one so chrono can parse it.
    let with_day = format!("1 {label}");
    for fmt in MONTH_YEAR_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&with_day, fmt) {
            return Some(first_of_month(date));
        }
    }

    let caps = range_regex().captures(label)?;
    let month = month_number(caps.get(1)?.as_str())?;
    let year: i32 = caps.get(2)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}
