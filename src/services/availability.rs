use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::Slot;
use crate::services::scheduling::{day_of_week, validate_duration, SlotRejection};
use crate::services::time::{intervals_overlap, minutes_to_time, time_to_minutes, MINUTES_PER_DAY};

pub const DEFAULT_GRANULARITY_MINUTES: u32 = 15;

/// Every start time in the stylist's working window for `date` that leaves room
/// for `duration_minutes`, in ascending order, each flagged against the day's
/// active bookings. Empty when the stylist does not work that day.
pub fn list_available_slots(
    conn: &Connection,
    stylist_id: &str,
    date: &NaiveDate,
    duration_minutes: u32,
    granularity_minutes: u32,
) -> AppResult<Vec<Slot>> {
    validate_duration(duration_minutes)?;
    if granularity_minutes == 0 || granularity_minutes >= MINUTES_PER_DAY {
        return Err(AppError::BadRequest(format!(
            "granularity must be between 1 and {} minutes, got {granularity_minutes}",
            MINUTES_PER_DAY - 1
        )));
    }

    let schedule = match queries::get_schedule_for_day(conn, stylist_id, day_of_week(date))? {
        Some(s) if s.is_available => s,
        _ => return Ok(vec![]),
    };

    let open = time_to_minutes(&schedule.start_time)?;
    let close = time_to_minutes(&schedule.end_time)?;

    let mut booked = vec![];
    for booking in queries::get_active_bookings_for_day(conn, stylist_id, date, None)? {
        booked.push(booking.interval()?);
    }

    let last_start = match close.checked_sub(duration_minutes) {
        Some(last) if last >= open => last,
        _ => return Ok(vec![]),
    };

    let slots = (open..=last_start)
        .step_by(granularity_minutes as usize)
        .map(|start| {
            let end = start + duration_minutes;
            let taken = booked
                .iter()
                .any(|&(b_start, b_end)| intervals_overlap(start, end, b_start, b_end));

            Slot {
                time: minutes_to_time(start),
                is_available: !taken,
                reason: taken.then(|| SlotRejection::AlreadyBooked.to_string()),
            }
        })
        .collect();

    Ok(slots)
}
