use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::services::time::{normalize_time, time_to_minutes};

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// One weekday of a stylist's working-hours template. `day_of_week` is 0 for Sunday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StylistSchedule {
    pub stylist_id: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub is_available: bool,
}

impl StylistSchedule {
    pub fn to_human_readable(&self) -> String {
        let day = DAY_NAMES
            .get(self.day_of_week as usize)
            .copied()
            .unwrap_or("?");
        format!(
            "{day}: {}-{}",
            short_time(&self.start_time),
            short_time(&self.end_time)
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleDay {
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

/// Checks a replacement week and returns it with times normalized to "HH:MM:SS".
pub fn validate_week(stylist_id: &str, days: &[ScheduleDay]) -> Result<Vec<StylistSchedule>, AppError> {
    let mut seen = [false; 7];
    let mut week = Vec::with_capacity(days.len());

    for day in days {
        let idx = day.day_of_week as usize;
        if idx > 6 {
            return Err(AppError::BadRequest(format!(
                "invalid day_of_week: {} (expected 0-6)",
                day.day_of_week
            )));
        }
        if seen[idx] {
            return Err(AppError::BadRequest(format!(
                "duplicate schedule for day_of_week {}",
                day.day_of_week
            )));
        }
        seen[idx] = true;

        if time_to_minutes(&day.start_time)? >= time_to_minutes(&day.end_time)? {
            return Err(AppError::BadRequest(format!(
                "start_time {} must be before end_time {}",
                day.start_time, day.end_time
            )));
        }

        week.push(StylistSchedule {
            stylist_id: stylist_id.to_string(),
            day_of_week: day.day_of_week,
            start_time: normalize_time(&day.start_time)?,
            end_time: normalize_time(&day.end_time)?,
            is_available: day.is_available,
        });
    }

    week.sort_by_key(|d| d.day_of_week);
    Ok(week)
}

/// A candidate start time in the availability listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub time: String,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn short_time(t: &str) -> &str {
    t.get(..5).unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u8, start: &str, end: &str) -> ScheduleDay {
        ScheduleDay {
            day_of_week: d,
            start_time: start.to_string(),
            end_time: end.to_string(),
            is_available: true,
        }
    }

    #[test]
    fn test_validate_week_normalizes_and_sorts() {
        let week = validate_week("st-1", &[day(5, "10:00", "16:00"), day(1, "09:00", "17:00")]).unwrap();
        assert_eq!(week.len(), 2);
        assert_eq!(week[0].day_of_week, 1);
        assert_eq!(week[0].start_time, "09:00:00");
        assert_eq!(week[1].end_time, "16:00:00");
    }

    #[test]
    fn test_validate_week_rejects_bad_day() {
        assert!(matches!(
            validate_week("st-1", &[day(7, "09:00", "17:00")]),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_validate_week_rejects_duplicate_day() {
        assert!(validate_week("st-1", &[day(1, "09:00", "12:00"), day(1, "13:00", "17:00")]).is_err());
    }

    #[test]
    fn test_validate_week_rejects_inverted_hours() {
        assert!(validate_week("st-1", &[day(1, "17:00", "09:00")]).is_err());
        assert!(validate_week("st-1", &[day(1, "09:00", "09:00")]).is_err());
    }

    #[test]
    fn test_validate_week_rejects_bad_time() {
        assert!(matches!(
            validate_week("st-1", &[day(1, "25:00", "17:00")]),
            Err(AppError::TimeFormat(_))
        ));
    }

    #[test]
    fn test_to_human_readable() {
        let week = validate_week("st-1", &[day(1, "09:00", "17:00")]).unwrap();
        assert_eq!(week[0].to_human_readable(), "Mon: 09:00-17:00");
    }
}
