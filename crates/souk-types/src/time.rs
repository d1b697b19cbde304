use tracing::warn;

/// Parse a timestamp as stored by SQLite.
///
/// SQLite's `datetime('now')` produces "YYYY-MM-DD HH:MM:SS" without a
/// timezone; values written by other tools may carry an RFC 3339 suffix.
/// Both are treated as UTC. A corrupt value logs and falls back to the
/// epoch rather than failing the whole response.
pub fn parse_db_timestamp(s: &str) -> chrono::DateTime<chrono::Utc> {
    s.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", s, e);
            chrono::DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_datetime_format() {
        let ts = parse_db_timestamp("2026-08-01 12:30:00");
        assert_eq!(ts.to_rfc3339(), "2026-08-01T12:30:00+00:00");
    }

    #[test]
    fn parses_rfc3339() {
        let ts = parse_db_timestamp("2026-08-01T12:30:00Z");
        assert_eq!(ts.to_rfc3339(), "2026-08-01T12:30:00+00:00");
    }
}
