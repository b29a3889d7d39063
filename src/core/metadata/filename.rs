//! Dates embedded in filenames, e.g. `IMG_20240716_182207.jpg`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;
use tracing::trace;

const MIN_YEAR: u32 = 1900;
const MAX_YEAR: u32 = 3000;

#[derive(Debug, Clone, Copy)]
enum FieldOrder {
    YearMonthDay,
    MonthDayYear,
}

struct DatePattern {
    regex: Regex,
    order: FieldOrder,
}

fn date_patterns() -> &'static [DatePattern] {
    static PATTERNS: OnceLock<Vec<DatePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // 2024-07-16, 2024_7_16
            (r"(\d{4})[_-](\d{1,2})[_-](\d{1,2})", FieldOrder::YearMonthDay),
            // 07-16-2024, 7/16/2024
            (r"(\d{1,2})[_/-](\d{1,2})[_/-](\d{4})", FieldOrder::MonthDayYear),
            // 20240716_182207
            (r"(\d{4})(\d{2})(\d{2})[_-](\d{2})(\d{2})(\d{2})", FieldOrder::YearMonthDay),
            // IMG_20240716
            (r"IMG[_-](\d{4})(\d{2})(\d{2})", FieldOrder::YearMonthDay),
            // Screenshot_2024-07-16
            (r"Screenshot[_-](\d{4})[_-](\d{1,2})[_-](\d{1,2})", FieldOrder::YearMonthDay),
        ]
        .into_iter()
        .filter_map(|(pattern, order)| Regex::new(pattern).ok().map(|regex| DatePattern { regex, order }))
        .collect()
    })
}

fn time_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"(\d{1,2})[:-](\d{1,2})[:-](\d{1,2})", r"(\d{2})(\d{2})(\d{2})"]
            .into_iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

fn numbers(captures: &regex::Captures<'_>) -> Vec<u32> {
    captures
        .iter()
        .skip(1)
        .flatten()
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Extract a date (and time when present) from a filename stem.
///
/// Patterns are tried in order; only the first match of each pattern is
/// considered. A match with an impossible date (or a year outside
/// 1900..=3000) is rejected and the next pattern gets its turn.
pub fn date_from_filename(stem: &str) -> Option<NaiveDateTime> {
    for pattern in date_patterns() {
        let Some(captures) = pattern.regex.captures(stem) else {
            continue;
        };
        let Some(whole) = captures.get(0) else {
            continue;
        };

        let values = numbers(&captures);
        let (year, month, day, clock) = match (pattern.order, values.as_slice()) {
            (FieldOrder::YearMonthDay, [y, m, d, rest @ ..]) => (*y, *m, *d, rest),
            (FieldOrder::MonthDayYear, [m, d, y, rest @ ..]) => (*y, *m, *d, rest),
            _ => continue,
        };

        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            trace!(stem, year, "Filename year out of range");
            continue;
        }
        let Some(date) = NaiveDate::from_ymd_opt(year as i32, month, day) else {
            trace!(stem, year, month, day, "Filename date is not a real date");
            continue;
        };

        let time = match clock {
            [h, m, s] => match NaiveTime::from_hms_opt(*h, *m, *s) {
                Some(time) => time,
                None => continue,
            },
            _ => time_elsewhere(stem, whole.range()).unwrap_or(NaiveTime::MIN),
        };

        return Some(date.and_time(time));
    }
    None
}

/// Look for a time in the parts of the stem the date match did not cover.
fn time_elsewhere(stem: &str, matched: Range<usize>) -> Option<NaiveTime> {
    let parts = [&stem[matched.end..], &stem[..matched.start]];
    for regex in time_patterns() {
        for part in parts {
            let Some(captures) = regex.captures(part) else {
                continue;
            };
            if let [h, m, s] = numbers(&captures).as_slice() {
                if let Some(time) = NaiveTime::from_hms_opt(*h, *m, *s) {
                    return Some(time);
                }
            }
        }
    }
    None
}
