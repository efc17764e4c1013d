use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::services::time::{intervals_overlap, time_to_minutes, MINUTES_PER_DAY};

/// Why a proposed appointment cannot be placed.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotRejection {
    NotWorking,
    OutsideWorkingHours { hours: String },
    AlreadyBooked,
}

impl std::fmt::Display for SlotRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotRejection::NotWorking => write!(f, "The stylist does not work on that day"),
            SlotRejection::OutsideWorkingHours { hours } => {
                write!(f, "That time is outside the stylist's working hours ({hours})")
            }
            SlotRejection::AlreadyBooked => write!(f, "Time slot already booked"),
        }
    }
}

/// An appointment must fit inside one day: `1..MINUTES_PER_DAY` minutes.
pub fn validate_duration(duration_minutes: u32) -> AppResult<()> {
    if duration_minutes == 0 || duration_minutes >= MINUTES_PER_DAY {
        return Err(AppError::BadRequest(format!(
            "duration must be between 1 and {} minutes, got {duration_minutes}",
            MINUTES_PER_DAY - 1
        )));
    }
    Ok(())
}

/// 0 = Sunday .. 6 = Saturday.
pub fn day_of_week(date: &NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Checks working hours, then overlap with the stylist's active bookings that day.
/// `exclude_booking_id` lets a booking being rescheduled ignore itself.
pub fn check_slot(
    conn: &Connection,
    stylist_id: &str,
    date: &NaiveDate,
    time: &str,
    duration_minutes: u32,
    exclude_booking_id: Option<&str>,
) -> AppResult<Option<SlotRejection>> {
    validate_duration(duration_minutes)?;
    let start = time_to_minutes(time)?;

    let schedule = match queries::get_schedule_for_day(conn, stylist_id, day_of_week(date))? {
        Some(s) if s.is_available => s,
        _ => return Ok(Some(SlotRejection::NotWorking)),
    };

    let open = time_to_minutes(&schedule.start_time)?;
    let close = time_to_minutes(&schedule.end_time)?;
    let end = match start.checked_add(duration_minutes) {
        Some(end) if start >= open && end <= close => end,
        _ => {
            return Ok(Some(SlotRejection::OutsideWorkingHours {
                hours: schedule.to_human_readable(),
            }))
        }
    };

    let bookings = queries::get_active_bookings_for_day(conn, stylist_id, date, exclude_booking_id)?;
    for booking in &bookings {
        let (booked_start, booked_end) = booking.interval()?;
        if intervals_overlap(start, end, booked_start, booked_end) {
            return Ok(Some(SlotRejection::AlreadyBooked));
        }
    }

    Ok(None)
}

pub fn is_slot_available(
    conn: &Connection,
    stylist_id: &str,
    date: &NaiveDate,
    time: &str,
    duration_minutes: u32,
    exclude_booking_id: Option<&str>,
) -> AppResult<bool> {
    Ok(check_slot(conn, stylist_id, date, time, duration_minutes, exclude_booking_id)?.is_none())
}
