// Recheck-window filtering for listed clients

use crate::table::ClientRecord;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Whether the client was checked successfully within the last `window`.
///
/// Clients checked recently are skipped so each hourly run focuses on the
/// ones that have not succeeded lately. A timestamp that does not parse as
/// ISO-8601 is a table placeholder ("null", "None") and counts as never
/// checked.
pub fn checked_recently(timestamp: &str, window: Duration, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(last_success) => now - last_success.with_timezone(&Utc) < window,
        Err(_) => false,
    }
}

/// Drop records whose last successful check falls within the recheck window
pub fn filter_recently_checked(
    records: Vec<ClientRecord>,
    window: Duration,
    now: DateTime<Utc>,
) -> Vec<ClientRecord> {
    let total = records.len();
    let kept: Vec<ClientRecord> = records
        .into_iter()
        .filter(|record| !checked_recently(&record.last_success, window, now))
        .collect();

    debug!(
        listed = total,
        kept = kept.len(),
        skipped = total - kept.len(),
        "Filtered recently checked clients"
    );

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(client_id: &str, last_success: &str) -> ClientRecord {
        ClientRecord {
            client_id: client_id.to_string(),
            last_success: last_success.to_string(),
            penultimate_success: "1900-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_recent_check_is_detected() {
        assert!(checked_recently(
            "2026-03-14T11:30:00+00:00",
            Duration::hours(2),
            now()
        ));
    }

    #[test]
    fn test_old_check_is_not_recent() {
        assert!(!checked_recently(
            "2026-03-14T08:00:00+00:00",
            Duration::hours(2),
            now()
        ));
    }

    #[test]
    fn test_placeholder_counts_as_never_checked() {
        assert!(!checked_recently("null", Duration::hours(2), now()));
        assert!(!checked_recently("None", Duration::hours(2), now()));
        assert!(!checked_recently("", Duration::hours(2), now()));
    }

    #[test]
    fn test_filter_keeps_stale_and_never_checked() {
        let records = vec![
            record("1111111111", "2026-03-14T11:45:00+00:00"),
            record("5272097306", "2026-03-14T07:00:00+00:00"),
            record("9999999999", "null"),
        ];

        let kept = filter_recently_checked(records, Duration::hours(2), now());
        let ids: Vec<&str> = kept.iter().map(|r| r.client_id.as_str()).collect();
        assert_eq!(ids, vec!["5272097306", "9999999999"]);
    }

    #[test]
    fn test_filter_of_empty_list_is_empty() {
        let kept = filter_recently_checked(Vec::new(), Duration::hours(2), now());
        assert!(kept.is_empty());
    }
}
