use chrono::{DateTime, FixedOffset, Utc};

/// Timestamps handed to the host platform: UTC, whole seconds, `Z` suffix.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parses a git committer date as CodeCommit reports it, `"<epoch> <offset>"`
/// (e.g. `"1484167798 -0800"`). RFC 3339 strings are accepted as well.
pub fn parse_git_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let epoch = raw.split_whitespace().next()?;
    if let Ok(secs) = epoch.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    DateTime::<FixedOffset>::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_drops_subseconds() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap()
            + chrono::Duration::milliseconds(750);
        assert_eq!(format_timestamp(&dt), "2024-03-05T07:08:09Z");
    }

    #[test]
    fn test_parse_epoch_with_offset() {
        let parsed = parse_git_date("1484167798 -0800").unwrap();
        assert_eq!(format_timestamp(&parsed), "2017-01-11T20:49:58Z");
    }

    #[test]
    fn test_parse_rfc3339_and_garbage() {
        let parsed = parse_git_date("2024-01-02T03:04:05+02:00").unwrap();
        assert_eq!(format_timestamp(&parsed), "2024-01-02T01:04:05Z");
        assert!(parse_git_date("").is_none());
        assert!(parse_git_date("yesterday").is_none());
    }
}
