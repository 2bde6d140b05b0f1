// Schedule parsing and next-fire-time calculation
//
// The notifier fires on a fixed cron schedule (top of every hour by
// default). Expressions use Quartz-style syntax with second precision.

use crate::errors::ScheduleError;
use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;
use std::str::FromStr;

/// Parse and validate a cron expression
pub fn parse_cron_expression(expression: &str) -> Result<CronSchedule, ScheduleError> {
    CronSchedule::from_str(expression).map_err(|e| ScheduleError::InvalidCronExpression {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

/// Calculate the next fire time strictly after `reference`
pub fn next_fire_time(
    expression: &str,
    reference: DateTime<Utc>,
) -> Result<DateTime<Utc>, ScheduleError> {
    let schedule = parse_cron_expression(expression)?;
    schedule
        .after(&reference)
        .next()
        .ok_or_else(|| ScheduleError::NoNextFireTime(expression.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const HOURLY: &str = "0 0 * * * *";

    #[test]
    fn test_parse_hourly_expression() {
        assert!(parse_cron_expression(HOURLY).is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_cron_expression("every hour please").unwrap_err();
        assert!(err.to_string().contains("Invalid cron expression"));
    }

    #[test]
    fn test_next_fire_is_top_of_next_hour() {
        let reference = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let next = next_fire_time(HOURLY, reference).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_next_fire_from_exact_boundary_is_following_hour() {
        let reference = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();
        let next = next_fire_time(HOURLY, reference).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 14, 11, 0, 0).unwrap());
    }
}
