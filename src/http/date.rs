//! HTTP-date helpers
//!
//! Formatting and parsing of `Last-Modified` / `If-Modified-Since` style dates.

use std::time::{SystemTime, UNIX_EPOCH};

/// Format a timestamp as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

/// Parse any of the three HTTP-date formats, `None` if malformed
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    httpdate::parse_http_date(value.trim()).ok()
}

/// Seconds since the epoch; HTTP dates have whole-second granularity
pub fn epoch_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_and_parse() {
        let time = UNIX_EPOCH + Duration::from_secs(784_111_777);
        let formatted = format_http_date(time);
        assert_eq!(formatted, "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parse_http_date(&formatted), Some(time));
    }

    #[test]
    fn test_parse_obsolete_formats() {
        let expected = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(
            parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"),
            Some(expected)
        );
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Some(expected));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_http_date("yesterday"), None);
        assert_eq!(parse_http_date(""), None);
    }

    #[test]
    fn test_epoch_seconds_truncates() {
        let time = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(epoch_seconds(time), 1);
    }
}
