use chrono::{Duration, NaiveTime};

use crate::errors::{AppError, AppResult};
use crate::models::{BookingDetail, BookingStatus};

const ICS_TIME: &str = "%Y%m%dT%H%M%S";

/// Single-event VCALENDAR for a booking, in the shop's local time.
pub fn generate_ics(detail: &BookingDetail) -> AppResult<String> {
    let booking = &detail.booking;
    let (start, end) = booking.interval()?;

    let start_time = NaiveTime::from_hms_opt(start / 60, start % 60, 0)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("invalid start minute {start}")))?;
    let starts_at = booking.appointment_date.and_time(start_time);
    // Legacy rows near midnight may end on the next day.
    let ends_at = starts_at + Duration::minutes(i64::from(end.saturating_sub(start)));

    let dtstart = starts_at.format(ICS_TIME).to_string();
    let dtend = ends_at.format(ICS_TIME).to_string();
    let dtstamp = booking.created_at.format(ICS_TIME).to_string();
    let uid = format!("{}@barberbook", booking.id);

    let summary = escape(&format!(
        "{} with {}",
        detail.service.name, detail.stylist.name
    ));
    let description = escape(booking.notes.as_deref().unwrap_or("No additional notes"));
    let status = match booking.status {
        BookingStatus::Cancelled | BookingStatus::NoShow => "CANCELLED",
        BookingStatus::Pending => "TENTATIVE",
        _ => "CONFIRMED",
    };

    Ok(format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Barberbook//Bookings//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    ))
}

// RFC 5545 text escaping.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}
