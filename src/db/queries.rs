use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, Timelike, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingFilter, BookingHistory, BookingStatus, NewHistoryEntry, PageRequest, Service,
    SortDirection, SortField, StylistSchedule, User, UserRole,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current UTC time truncated to whole seconds, the precision timestamps are stored at.
pub fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn fmt_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).with_context(|| format!("invalid timestamp: {s}"))
}

fn parse_opt_ts(s: Option<String>) -> anyhow::Result<Option<NaiveDateTime>> {
    s.as_deref().map(parse_ts).transpose()
}

fn parse_status(s: &str) -> anyhow::Result<BookingStatus> {
    BookingStatus::parse(s).with_context(|| format!("unknown booking status: {s}"))
}

/// True when `err` is a UNIQUE constraint failure from SQLite.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ── Users ──

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, phone, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id,
            user.name,
            user.email,
            user.phone,
            user.role.as_str(),
            fmt_ts(&user.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, name, email, phone, role, created_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((id, name, email, phone, role, created_at)) = row else {
        return Ok(None);
    };

    Ok(Some(User {
        id,
        name,
        email,
        phone,
        role: UserRole::parse(&role).with_context(|| format!("unknown user role: {role}"))?,
        created_at: parse_ts(&created_at)?,
    }))
}

/// Existence check, optionally restricted to one role.
pub fn user_exists(conn: &Connection, id: &str, role: Option<UserRole>) -> anyhow::Result<bool> {
    let count: i64 = match role {
        Some(role) => conn.query_row(
            "SELECT COUNT(*) FROM users WHERE id = ?1 AND role = ?2",
            params![id, role.as_str()],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COUNT(*) FROM users WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?,
    };
    Ok(count > 0)
}

pub fn get_stylist(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    Ok(get_user(conn, id)?.filter(|u| u.role == UserRole::Stylist))
}

// ── Services ──

pub fn create_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, price, duration_minutes, is_active) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            service.id,
            service.name,
            service.price,
            service.duration_minutes,
            service.is_active as i32,
        ],
    )?;
    Ok(())
}

pub fn update_service(conn: &Connection, service: &Service) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET name = ?1, price = ?2, duration_minutes = ?3, is_active = ?4 WHERE id = ?5",
        params![
            service.name,
            service.price,
            service.duration_minutes,
            service.is_active as i32,
            service.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let service = conn
        .query_row(
            "SELECT id, name, price, duration_minutes, is_active FROM services WHERE id = ?1",
            params![id],
            |row| {
                Ok(Service {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    price: row.get(2)?,
                    duration_minutes: row.get(3)?,
                    is_active: row.get::<_, i32>(4)? != 0,
                })
            },
        )
        .optional()?;
    Ok(service)
}

// ── Stylist Schedules ──

/// Replaces the stylist's whole week in one transaction.
pub fn replace_schedule(
    conn: &Connection,
    stylist_id: &str,
    week: &[StylistSchedule],
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM stylist_schedules WHERE stylist_id = ?1",
        params![stylist_id],
    )?;
    for day in week {
        tx.execute(
            "INSERT INTO stylist_schedules (stylist_id, day_of_week, start_time, end_time, is_available)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                stylist_id,
                day.day_of_week,
                day.start_time,
                day.end_time,
                day.is_available as i32,
            ],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn get_schedule(conn: &Connection, stylist_id: &str) -> anyhow::Result<Vec<StylistSchedule>> {
    let mut stmt = conn.prepare(
        "SELECT stylist_id, day_of_week, start_time, end_time, is_available
         FROM stylist_schedules WHERE stylist_id = ?1 ORDER BY day_of_week ASC",
    )?;
    let rows = stmt.query_map(params![stylist_id], parse_schedule_row)?;

    let mut week = vec![];
    for row in rows {
        week.push(row?);
    }
    Ok(week)
}

pub fn get_schedule_for_day(
    conn: &Connection,
    stylist_id: &str,
    day_of_week: u8,
) -> anyhow::Result<Option<StylistSchedule>> {
    let schedule = conn
        .query_row(
            "SELECT stylist_id, day_of_week, start_time, end_time, is_available
             FROM stylist_schedules WHERE stylist_id = ?1 AND day_of_week = ?2",
            params![stylist_id, day_of_week],
            parse_schedule_row,
        )
        .optional()?;
    Ok(schedule)
}

fn parse_schedule_row(row: &rusqlite::Row) -> rusqlite::Result<StylistSchedule> {
    Ok(StylistSchedule {
        stylist_id: row.get(0)?,
        day_of_week: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        is_available: row.get::<_, i32>(4)? != 0,
    })
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, customer_id, stylist_id, service_id, appointment_date, appointment_time, end_time, \
     status, total_amount, notes, cancel_reason, confirmed_at, completed_at, cancelled_at, created_at, updated_at";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
        ),
        params![
            booking.id,
            booking.customer_id,
            booking.stylist_id,
            booking.service_id,
            fmt_date(&booking.appointment_date),
            booking.appointment_time,
            booking.end_time,
            booking.status.as_str(),
            booking.total_amount,
            booking.notes,
            booking.cancel_reason,
            booking.confirmed_at.as_ref().map(fmt_ts),
            booking.completed_at.as_ref().map(fmt_ts),
            booking.cancelled_at.as_ref().map(fmt_ts),
            fmt_ts(&booking.created_at),
            fmt_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

/// Writes every mutable column of an existing booking.
pub fn save_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET
           appointment_date = ?1,
           appointment_time = ?2,
           end_time = ?3,
           status = ?4,
           notes = ?5,
           cancel_reason = ?6,
           confirmed_at = ?7,
           completed_at = ?8,
           cancelled_at = ?9,
           updated_at = ?10
         WHERE id = ?11",
        params![
            fmt_date(&booking.appointment_date),
            booking.appointment_time,
            booking.end_time,
            booking.status.as_str(),
            booking.notes,
            booking.cancel_reason,
            booking.confirmed_at.as_ref().map(fmt_ts),
            booking.completed_at.as_ref().map(fmt_ts),
            booking.cancelled_at.as_ref().map(fmt_ts),
            fmt_ts(&booking.updated_at),
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// `'pending', 'confirmed', ...` for an SQL `IN (..)`, from `BookingStatus::ACTIVE`.
fn active_status_list() -> String {
    BookingStatus::ACTIVE
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Bookings that still occupy a slot for the stylist on `date`, ordered by start time.
pub fn get_active_bookings_for_day(
    conn: &Connection,
    stylist_id: &str,
    date: &NaiveDate,
    exclude_booking_id: Option<&str>,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE stylist_id = ?1 AND appointment_date = ?2
           AND status IN ({})
           AND (?3 IS NULL OR id != ?3)
         ORDER BY appointment_time ASC",
        active_status_list()
    ))?;

    let rows = stmt.query_map(
        params![stylist_id, fmt_date(date), exclude_booking_id],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn list_bookings(
    conn: &Connection,
    filter: &BookingFilter,
    page: &PageRequest,
    sort: SortField,
    direction: SortDirection,
) -> anyhow::Result<(Vec<Booking>, u64)> {
    let mut clauses: Vec<String> = vec![];
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![];

    let mut push = |clause: &str, value: Box<dyn ToSql>| {
        params_vec.push(value);
        clauses.push(format!("{clause} ?{}", params_vec.len()));
    };

    if let Some(id) = &filter.customer_id {
        push("customer_id =", Box::new(id.clone()));
    }
    if let Some(id) = &filter.stylist_id {
        push("stylist_id =", Box::new(id.clone()));
    }
    if let Some(id) = &filter.service_id {
        push("service_id =", Box::new(id.clone()));
    }
    if let Some(status) = filter.status {
        push("status =", Box::new(status.as_str()));
    }
    if let Some(from) = &filter.date_from {
        push("appointment_date >=", Box::new(fmt_date(from)));
    }
    if let Some(to) = &filter.date_to {
        push("appointment_date <=", Box::new(fmt_date(to)));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM bookings {where_sql}"),
        params_refs.as_slice(),
        |row| row.get(0),
    )?;

    let tiebreak = match sort {
        SortField::AppointmentTime => "id ASC",
        _ => "appointment_time ASC, id ASC",
    };
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings {where_sql}
         ORDER BY {} {}, {tiebreak}
         LIMIT {} OFFSET {}",
        sort.column(),
        direction.keyword(),
        page.limit,
        page.offset(),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok((bookings, total as u64))
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let appointment_date: String = row.get(4)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(14)?;
    let updated_at: String = row.get(15)?;

    Ok(Booking {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        stylist_id: row.get(2)?,
        service_id: row.get(3)?,
        appointment_date: NaiveDate::parse_from_str(&appointment_date, DATE_FORMAT)
            .with_context(|| format!("invalid appointment date: {appointment_date}"))?,
        appointment_time: row.get(5)?,
        end_time: row.get(6)?,
        status: parse_status(&status)?,
        total_amount: row.get(8)?,
        notes: row.get(9)?,
        cancel_reason: row.get(10)?,
        confirmed_at: parse_opt_ts(row.get(11)?)?,
        completed_at: parse_opt_ts(row.get(12)?)?,
        cancelled_at: parse_opt_ts(row.get(13)?)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

// ── Booking History ──

pub fn insert_history(conn: &Connection, entry: &NewHistoryEntry) -> anyhow::Result<BookingHistory> {
    let created_at = now();
    conn.execute(
        "INSERT INTO booking_history (booking_id, action, previous_status, new_status, notes, performed_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.booking_id,
            entry.action,
            entry.previous_status.map(|s| s.as_str()),
            entry.new_status.map(|s| s.as_str()),
            entry.notes,
            entry.performed_by,
            fmt_ts(&created_at),
        ],
    )?;

    Ok(BookingHistory {
        id: conn.last_insert_rowid(),
        booking_id: entry.booking_id.clone(),
        action: entry.action.clone(),
        previous_status: entry.previous_status,
        new_status: entry.new_status,
        notes: entry.notes.clone(),
        performed_by: entry.performed_by.clone(),
        created_at,
    })
}

pub fn get_history_for_booking(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Vec<BookingHistory>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, action, previous_status, new_status, notes, performed_by, created_at
         FROM booking_history WHERE booking_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| Ok(parse_history_row(row)))?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

pub fn get_history_since(conn: &Connection, since_id: i64) -> anyhow::Result<Vec<BookingHistory>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, action, previous_status, new_status, notes, performed_by, created_at
         FROM booking_history WHERE id > ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![since_id], |row| Ok(parse_history_row(row)))?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

fn parse_history_row(row: &rusqlite::Row) -> anyhow::Result<BookingHistory> {
    let previous_status: Option<String> = row.get(3)?;
    let new_status: Option<String> = row.get(4)?;
    let created_at: String = row.get(7)?;

    Ok(BookingHistory {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        action: row.get(2)?,
        previous_status: previous_status.as_deref().map(parse_status).transpose()?,
        new_status: new_status.as_deref().map(parse_status).transpose()?,
        notes: row.get(5)?,
        performed_by: row.get(6)?,
        created_at: parse_ts(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn user(id: &str, role: UserRole) -> User {
        User {
            id: id.to_string(),
            name: id.to_uppercase(),
            email: None,
            phone: None,
            role,
            created_at: now(),
        }
    }

    fn seed(conn: &Connection) {
        create_user(conn, &user("cust-1", UserRole::Customer)).unwrap();
        create_user(conn, &user("sty-1", UserRole::Stylist)).unwrap();
        create_service(
            conn,
            &Service {
                id: "svc-1".to_string(),
                name: "Haircut".to_string(),
                price: 2500,
                duration_minutes: 30,
                is_active: true,
            },
        )
        .unwrap();
    }

    fn booking(id: &str, date: &str, time: &str, status: BookingStatus) -> Booking {
        let now = now();
        Booking {
            id: id.to_string(),
            customer_id: "cust-1".to_string(),
            stylist_id: "sty-1".to_string(),
            service_id: "svc-1".to_string(),
            appointment_date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            appointment_time: time.to_string(),
            end_time: None,
            status,
            total_amount: 2500,
            notes: None,
            cancel_reason: None,
            confirmed_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_user_exists_respects_role() {
        let conn = setup_db();
        seed(&conn);
        assert!(user_exists(&conn, "cust-1", None).unwrap());
        assert!(user_exists(&conn, "cust-1", Some(UserRole::Customer)).unwrap());
        assert!(!user_exists(&conn, "cust-1", Some(UserRole::Stylist)).unwrap());
        assert!(!user_exists(&conn, "nobody", None).unwrap());
        assert!(get_stylist(&conn, "sty-1").unwrap().is_some());
        assert!(get_stylist(&conn, "cust-1").unwrap().is_none());
    }

    #[test]
    fn test_booking_round_trip() {
        let conn = setup_db();
        seed(&conn);
        let mut b = booking("bk-1", "2025-06-16", "10:00:00", BookingStatus::Pending);
        b.end_time = Some("10:30:00".to_string());
        b.notes = Some("fade".to_string());
        create_booking(&conn, &b).unwrap();

        let loaded = get_booking_by_id(&conn, "bk-1").unwrap().unwrap();
        assert_eq!(loaded, b);
        assert!(get_booking_by_id(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_active_bookings_skip_terminal_and_excluded() {
        let conn = setup_db();
        seed(&conn);
        create_booking(&conn, &booking("a", "2025-06-16", "09:00:00", BookingStatus::Pending)).unwrap();
        create_booking(&conn, &booking("b", "2025-06-16", "11:00:00", BookingStatus::Cancelled)).unwrap();
        create_booking(&conn, &booking("c", "2025-06-16", "10:00:00", BookingStatus::InProgress)).unwrap();
        create_booking(&conn, &booking("d", "2025-06-17", "10:00:00", BookingStatus::Confirmed)).unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let ids: Vec<String> = get_active_bookings_for_day(&conn, "sty-1", &date, None)
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);

        let ids: Vec<String> = get_active_bookings_for_day(&conn, "sty-1", &date, Some("a"))
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn test_unique_active_slot_index() {
        let conn = setup_db();
        seed(&conn);
        create_booking(&conn, &booking("a", "2025-06-16", "10:00:00", BookingStatus::Pending)).unwrap();

        let err = create_booking(&conn, &booking("b", "2025-06-16", "10:00:00", BookingStatus::Pending))
            .unwrap_err();
        assert!(is_unique_violation(&err));

        // A cancelled row at the same start does not count.
        create_booking(&conn, &booking("c", "2025-06-16", "10:00:00", BookingStatus::Cancelled)).unwrap();
    }

    #[test]
    fn test_active_slot_index_matches_active_statuses() {
        let conn = setup_db();
        let index_sql: String = conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE name = 'idx_bookings_active_slot'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(
            index_sql.contains(&format!("status IN ({})", active_status_list())),
            "{index_sql}"
        );
    }

    #[test]
    fn test_list_bookings_filters_and_pages() {
        let conn = setup_db();
        seed(&conn);
        for (i, date) in ["2025-06-16", "2025-06-17", "2025-06-18", "2025-06-19"].iter().enumerate() {
            let status = if i == 1 { BookingStatus::Cancelled } else { BookingStatus::Pending };
            create_booking(&conn, &booking(&format!("bk-{i}"), date, "10:00:00", status)).unwrap();
        }

        let page = PageRequest::new(Some(1), Some(2), 20);
        let (items, total) =
            list_bookings(&conn, &BookingFilter::default(), &page, SortField::AppointmentDate, SortDirection::Desc)
                .unwrap();
        assert_eq!(total, 4);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "bk-3");

        let filter = BookingFilter {
            status: Some(BookingStatus::Pending),
            date_from: NaiveDate::from_ymd_opt(2025, 6, 17),
            ..Default::default()
        };
        let (items, total) =
            list_bookings(&conn, &filter, &page, SortField::AppointmentDate, SortDirection::Asc).unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), vec!["bk-2", "bk-3"]);
    }

    #[test]
    fn test_history_is_append_only() {
        let conn = setup_db();
        seed(&conn);
        create_booking(&conn, &booking("bk-1", "2025-06-16", "10:00:00", BookingStatus::Pending)).unwrap();

        let entry = insert_history(
            &conn,
            &NewHistoryEntry {
                booking_id: "bk-1".to_string(),
                action: "CREATED".to_string(),
                previous_status: None,
                new_status: Some(BookingStatus::Pending),
                notes: None,
                performed_by: "cust-1".to_string(),
            },
        )
        .unwrap();
        assert_eq!(get_history_for_booking(&conn, "bk-1").unwrap(), vec![entry.clone()]);
        assert_eq!(get_history_since(&conn, entry.id).unwrap().len(), 0);

        assert!(conn.execute("UPDATE booking_history SET action = 'X'", []).is_err());
        assert!(conn.execute("DELETE FROM booking_history", []).is_err());
    }
}
