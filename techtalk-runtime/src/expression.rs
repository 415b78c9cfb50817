use crate::SchedulerError;
use chrono::{DateTime, TimeZone};
use cron::Schedule;
use std::str::FromStr;

/// Bring an expression into the seconds-first form the `cron` crate parses.
pub fn normalize_expression(expression: &str) -> Result<String, SchedulerError> {
    let expression = expression.trim();
    let field_count = expression.split_whitespace().count();

    match field_count {
        // standard crontab syntax: minute hour day month weekday
        5 => Ok(format!("0 {expression}")),
        // crate-native syntax includes seconds (+ optional year)
        6 | 7 => Ok(expression.to_string()),
        _ => Err(SchedulerError::InvalidCron {
            expression: expression.to_string(),
            reason: format!("expected 5, 6, or 7 fields, got {field_count}"),
        }),
    }
}

pub fn parse_schedule(normalized: &str) -> Result<Schedule, SchedulerError> {
    Schedule::from_str(normalized).map_err(|e| SchedulerError::InvalidCron {
        expression: normalized.to_string(),
        reason: e.to_string(),
    })
}

/// First occurrence strictly after `from`.
pub fn next_run_after<Tz: TimeZone>(
    expression: &str,
    from: &DateTime<Tz>,
) -> Result<Option<DateTime<Tz>>, SchedulerError> {
    let schedule = parse_schedule(&normalize_expression(expression)?)?;
    Ok(schedule.after(from).next())
}
