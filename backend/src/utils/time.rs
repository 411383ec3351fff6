use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Parses the capture timestamp sent by the capture tool.
///
/// Browsers send `Date.toISOString()` output; naive timestamps are taken as UTC.
pub fn parse_capture_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Capture date as `dd/mm/YYYY` in the configured time zone; unparsable
/// timestamps are returned unchanged.
pub fn capture_date_label(raw: &str, tz: &Tz) -> String {
    parse_capture_datetime(raw)
        .map(|dt| dt.with_timezone(tz).format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_string_from_browser() {
        let dt = parse_capture_datetime("2024-05-01T23:30:00.000Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-05-01T23:30:00+00:00");
    }

    #[test]
    fn parses_naive_and_date_only_values_as_utc() {
        assert!(parse_capture_datetime("2024-05-01T10:00:00").is_some());
        assert!(parse_capture_datetime("2024-05-01 10:00:00.250").is_some());
        assert!(parse_capture_datetime("2024-05-01").is_some());
        assert!(parse_capture_datetime("yesterday").is_none());
    }

    #[test]
    fn date_label_uses_configured_time_zone() {
        let utc = chrono_tz::UTC;
        let sao_paulo = chrono_tz::America::Sao_Paulo;
        assert_eq!(capture_date_label("2024-05-02T01:00:00Z", &utc), "02/05/2024");
        assert_eq!(
            capture_date_label("2024-05-02T01:00:00Z", &sao_paulo),
            "01/05/2024"
        );
    }

    #[test]
    fn date_label_keeps_unparsable_input() {
        assert_eq!(capture_date_label("session-7", &chrono_tz::UTC), "session-7");
    }
}
