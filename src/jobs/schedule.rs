//! Recurring schedule arithmetic.
//!
//! Schedule entries name a weekday (optional), hour, and minute. The worker
//! pre-enqueues one row per upcoming tick, so occurrence times have to be
//! computed deterministically from the clock.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};

use crate::config::ScheduleEntry;
use crate::errors::{Error, Result};

/// The next time `entry` fires strictly after `after`.
pub fn next_occurrence(entry: &ScheduleEntry, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let weekday: Option<Weekday> = entry.parsed_weekday()?;

    // Walk forward at most a week plus a day; some day in that window matches
    for day_offset in 0..9 {
        let date = (after + Duration::days(day_offset)).date_naive();
        if let Some(weekday) = weekday {
            if date.weekday() != weekday {
                continue;
            }
        }
        let naive = match date.and_hms_opt(entry.hour, entry.minute, 0) {
            Some(naive) => naive,
            None => {
                return Err(Error::Internal {
                    operation: format!("schedule entry '{}' has an invalid time", entry.job),
                });
            }
        };
        let candidate = Utc.from_utc_datetime(&naive);
        if candidate > after {
            return Ok(candidate);
        }
    }

    Err(Error::Internal {
        operation: format!("no upcoming occurrence for schedule entry '{}'", entry.job),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn wednesday_entry() -> ScheduleEntry {
        ScheduleEntry {
            job: "notify_customers".to_string(),
            weekday: Some("wed".to_string()),
            hour: 22,
            minute: 31,
            args: serde_json::json!({ "message": "Hello wednesday" }),
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap())
    }

    #[test]
    fn fires_later_the_same_day() {
        // 2026-01-07 is a Wednesday
        let after = utc(2026, 1, 7, 12, 0);
        let next = next_occurrence(&wednesday_entry(), after).unwrap();
        assert_eq!(next, utc(2026, 1, 7, 22, 31));
    }

    #[test]
    fn skips_to_next_week_when_past() {
        let after = utc(2026, 1, 7, 23, 0);
        let next = next_occurrence(&wednesday_entry(), after).unwrap();
        assert_eq!(next, utc(2026, 1, 14, 22, 31));
    }

    #[test]
    fn exact_tick_time_moves_to_next_week() {
        let after = utc(2026, 1, 7, 22, 31);
        let next = next_occurrence(&wednesday_entry(), after).unwrap();
        assert_eq!(next, utc(2026, 1, 14, 22, 31));
    }

    #[test]
    fn daily_entry_fires_every_day() {
        let mut entry = wednesday_entry();
        entry.weekday = None;
        let after = utc(2026, 1, 7, 23, 0);
        let next = next_occurrence(&entry, after).unwrap();
        assert_eq!(next, utc(2026, 1, 8, 22, 31));
    }

    #[test]
    fn unknown_weekday_is_an_error() {
        let mut entry = wednesday_entry();
        entry.weekday = Some("someday".to_string());
        assert!(next_occurrence(&entry, Utc::now()).is_err());
    }
}
