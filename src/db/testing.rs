//! Seed data for unit tests.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::{self, queries};
use crate::models::schedule::validate_week;
use crate::models::{Booking, BookingStatus, ScheduleDay, Service, User, UserRole};

/// 2025-06-16 is a Monday.
pub const MONDAY: &str = "2025-06-16";

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn add_user(conn: &Connection, id: &str, role: UserRole) {
    queries::create_user(
        conn,
        &User {
            id: id.to_string(),
            name: format!("{id} name"),
            email: Some(format!("{id}@example.com")),
            phone: None,
            role,
            created_at: queries::now(),
        },
    )
    .unwrap();
}

/// Customer `cust-1`, stylist `sty-1` working Monday 09:00-17:00, and a
/// 30 minute, 2500 cent service `svc-1`.
pub fn seeded_db() -> Connection {
    let conn = db::init_db(":memory:").unwrap();
    add_user(&conn, "cust-1", UserRole::Customer);
    add_user(&conn, "sty-1", UserRole::Stylist);
    queries::create_service(
        &conn,
        &Service {
            id: "svc-1".to_string(),
            name: "Haircut".to_string(),
            price: 2500,
            duration_minutes: 30,
            is_active: true,
        },
    )
    .unwrap();
    let week = validate_week(
        "sty-1",
        &[ScheduleDay {
            day_of_week: 1,
            start_time: "09:00".to_string(),
            end_time: "17:00".to_string(),
            is_available: true,
        }],
    )
    .unwrap();
    queries::replace_schedule(&conn, "sty-1", &week).unwrap();
    conn
}

/// Inserts a booking for `sty-1` on `MONDAY` directly, bypassing validation.
pub fn insert_booking(
    conn: &Connection,
    id: &str,
    start: &str,
    end: Option<&str>,
    status: BookingStatus,
) {
    let now = queries::now();
    queries::create_booking(
        conn,
        &Booking {
            id: id.to_string(),
            customer_id: "cust-1".to_string(),
            stylist_id: "sty-1".to_string(),
            service_id: "svc-1".to_string(),
            appointment_date: date(MONDAY),
            appointment_time: start.to_string(),
            end_time: end.map(str::to_string),
            status,
            total_amount: 2500,
            notes: None,
            cancel_reason: None,
            confirmed_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        },
    )
    .unwrap();
}
