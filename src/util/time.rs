use chrono::{DateTime, SecondsFormat, Utc};

/// ISO-8601 UTC timestamp with millisecond precision, e.g.
/// `2024-05-01T10:20:30.123Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Timestamp safe to embed in a file name: `:` and `.` become `-`.
pub fn file_name_timestamp(at: DateTime<Utc>) -> String {
    iso_timestamp(at).replace([':', '.'], "-")
}
