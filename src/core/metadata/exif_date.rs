//! Picking and parsing a capture date out of metadata fields.

use super::source::FieldMap;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use tracing::debug;

/// Fields that may hold a capture date, highest priority first
pub const DATE_FIELDS: &[&str] = &[
    "DateTimeOriginal",
    "EXIF:DateTimeOriginal",
    "CreateDate",
    "EXIF:CreateDate",
    "DateTime",
    "EXIF:DateTime",
    "QuickTime:CreateDate",
    "QuickTime:CreationDate",
    "CreationDate",
    "SubSecDateTimeOriginal",
    "SubSecCreateDate",
    "DateCreated",
    "ModifyDate",
    "FileCreateDate",
    "File:FileCreateDate",
    "FileModifyDate",
    "File:FileModifyDate",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y:%m:%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const ZONED_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y:%m:%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const DATE_FORMATS: &[&str] = &["%Y:%m:%d", "%Y-%m-%d"];

/// Parse a metadata timestamp.
///
/// Timezone suffixes are accepted but dropped: the wall-clock time the
/// camera recorded is what names the file.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in NAIVE_FORMATS {
        if let Ok(date) = NaiveDateTime::parse_from_str(value, format) {
            return Some(date);
        }
    }

    let zoned = match value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        Some(rest) => format!("{}+00:00", rest),
        None => value.to_string(),
    };
    for format in ZONED_FORMATS {
        if let Ok(date) = DateTime::parse_from_str(&zoned, format) {
            return Some(date.naive_local());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// The sub-second field that goes with a date field, keeping its group prefix
fn companion_field(field: &str) -> Option<String> {
    let (prefix, name) = match field.rsplit_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, field),
    };

    let companion = match name {
        "DateTimeOriginal" => "SubSecTimeOriginal",
        "CreateDate" => "SubSecTimeDigitized",
        "DateTime" | "ModifyDate" => "SubSecTime",
        _ => return None,
    };

    Some(match prefix {
        Some(prefix) => format!("{}:{}", prefix, companion),
        None => companion.to_string(),
    })
}

/// Merge a raw sub-second value into a timestamp.
///
/// Cameras disagree on units, so this is a heuristic: values below 1000 are
/// taken as milliseconds and larger ones as microseconds. Values of a
/// million or more are ignored.
pub fn merge_subseconds(date: NaiveDateTime, raw: &str) -> NaiveDateTime {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let Ok(value) = digits.parse::<u32>() else {
        return date;
    };

    let micros = if value < 1000 { value * 1000 } else { value };
    if micros >= 1_000_000 {
        return date;
    }

    date.with_nanosecond(micros * 1000).unwrap_or(date)
}

/// First present, non-empty, parseable date field, with its name.
pub fn date_from_fields(fields: &FieldMap) -> Option<(NaiveDateTime, &'static str)> {
    for &field in DATE_FIELDS {
        let Some(value) = fields.get(field) else {
            continue;
        };
        if value.trim().is_empty() {
            continue;
        }

        match parse_timestamp(value) {
            Some(date) => {
                let date = companion_field(field)
                    .and_then(|name| fields.get(&name))
                    .map(|raw| merge_subseconds(date, raw))
                    .unwrap_or(date);
                return Some((date, field));
            }
            None => debug!(field, value = %value, "Unparseable date field, trying next"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn parses_exif_and_iso_forms() {
        assert_eq!(
            parse_timestamp("2024:07:16 18:22:07"),
            Some(at(2024, 7, 16, 18, 22, 7))
        );
        assert_eq!(
            parse_timestamp("2024-07-16 18:22:07"),
            Some(at(2024, 7, 16, 18, 22, 7))
        );
        assert_eq!(
            parse_timestamp("2024:07:16 18:22:07.25").map(|d| d.nanosecond()),
            Some(250_000_000)
        );
    }

    #[test]
    fn timezone_suffix_keeps_wall_clock() {
        assert_eq!(
            parse_timestamp("2024:07:16 18:22:07+02:00"),
            Some(at(2024, 7, 16, 18, 22, 7))
        );
        assert_eq!(
            parse_timestamp("2024:07:16 18:22:07-0500"),
            Some(at(2024, 7, 16, 18, 22, 7))
        );
        assert_eq!(
            parse_timestamp("2024:07:16 18:22:07Z"),
            Some(at(2024, 7, 16, 18, 22, 7))
        );
    }

    #[test]
    fn date_only_means_midnight() {
        assert_eq!(parse_timestamp("2024:07:16"), Some(at(2024, 7, 16, 0, 0, 0)));
    }

    #[test]
    fn rejects_garbage_and_zero_dates() {
        assert_eq!(parse_timestamp("0000:00:00 00:00:00"), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("   "), None);
    }

    #[test]
    fn highest_priority_field_wins() {
        let map = fields(&[
            ("FileModifyDate", "2020:01:01 00:00:00"),
            ("CreateDate", "2022:02:02 02:02:02"),
            ("DateTimeOriginal", "2021:03:03 03:03:03"),
        ]);

        let (date, field) = date_from_fields(&map).unwrap();
        assert_eq!(field, "DateTimeOriginal");
        assert_eq!(date, at(2021, 3, 3, 3, 3, 3));
    }

    #[test]
    fn unparseable_field_falls_through() {
        let map = fields(&[
            ("DateTimeOriginal", "0000:00:00 00:00:00"),
            ("EXIF:CreateDate", "2022:02:02 02:02:02"),
        ]);

        let (_, field) = date_from_fields(&map).unwrap();
        assert_eq!(field, "EXIF:CreateDate");
    }

    #[test]
    fn companion_subseconds_are_merged() {
        let map = fields(&[
            ("EXIF:DateTimeOriginal", "2024:07:16 18:22:07"),
            ("EXIF:SubSecTimeOriginal", "45"),
        ]);

        let (date, _) = date_from_fields(&map).unwrap();
        assert_eq!(date.nanosecond(), 45_000_000);
    }

    #[test]
    fn subsecond_units_heuristic() {
        let base = at(2024, 1, 1, 0, 0, 0);
        assert_eq!(merge_subseconds(base, "123").nanosecond(), 123_000_000);
        assert_eq!(merge_subseconds(base, "123456").nanosecond(), 123_456_000);
        assert_eq!(merge_subseconds(base, "5000000"), base);
        assert_eq!(merge_subseconds(base, "n/a"), base);
    }
}
