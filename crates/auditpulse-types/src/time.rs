use chrono::{DateTime, NaiveDateTime};

/// Formats a backend timestamp as `YYYY-MM-DD HH:MM`.
///
/// Accepts RFC 3339 and the naive ISO form the backend emits for UTC values.
/// Unparseable input is returned unchanged.
pub fn format_timestamp(raw: &str) -> String {
    const OUT: &str = "%Y-%m-%d %H:%M";
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(OUT).to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format(OUT).to_string();
    }
    raw.to_string()
}
