//! Booking lifecycle: creation, edits and status transitions.
//!
//! Every mutation runs validate-then-write inside one `BEGIN IMMEDIATE`
//! transaction, so the write lock is held from the availability read until
//! the commit. History is appended after the commit.

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::history::{ACTION_CREATED, ACTION_UPDATED};
use crate::models::{
    Booking, BookingDetail, BookingFilter, BookingHistory, BookingStatus, NewHistoryEntry,
    PageRequest, Paginated, SortDirection, SortField, UserRole,
};
use crate::services::history;
use crate::services::scheduling;
use crate::services::time::{minutes_to_time, normalize_time, time_to_minutes, MINUTES_PER_DAY};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBooking {
    pub customer_id: String,
    pub stylist_id: String,
    pub service_id: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBooking {
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<String>,
    pub notes: Option<String>,
}

pub fn create(state: &AppState, req: CreateBooking) -> AppResult<BookingDetail> {
    let mut db = state.db()?;
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if !queries::user_exists(&tx, &req.customer_id, Some(UserRole::Customer))? {
        return Err(AppError::NotFound(format!("customer {}", req.customer_id)));
    }
    if queries::get_stylist(&tx, &req.stylist_id)?.is_none() {
        return Err(AppError::NotFound(format!("stylist {}", req.stylist_id)));
    }
    let service = queries::get_service(&tx, &req.service_id)?
        .ok_or_else(|| AppError::NotFound(format!("service {}", req.service_id)))?;
    if !service.is_active {
        return Err(AppError::BadRequest(format!(
            "service {} is not currently offered",
            service.id
        )));
    }

    let time = normalize_time(&req.appointment_time)?;
    if let Some(rejection) = scheduling::check_slot(
        &tx,
        &req.stylist_id,
        &req.appointment_date,
        &time,
        service.duration_minutes,
        None,
    )? {
        tracing::warn!(
            stylist_id = %req.stylist_id,
            date = %req.appointment_date,
            time = %time,
            reason = %rejection,
            "booking rejected"
        );
        return Err(AppError::Conflict(rejection.to_string()));
    }

    let now = queries::now();
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        customer_id: req.customer_id,
        stylist_id: req.stylist_id,
        service_id: req.service_id,
        appointment_date: req.appointment_date,
        end_time: Some(end_time(&time, service.duration_minutes)?),
        appointment_time: time,
        status: BookingStatus::Pending,
        total_amount: service.price,
        notes: req.notes,
        cancel_reason: None,
        confirmed_at: None,
        completed_at: None,
        cancelled_at: None,
        created_at: now,
        updated_at: now,
    };

    queries::create_booking(&tx, &booking).map_err(write_error)?;
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        stylist_id = %booking.stylist_id,
        date = %booking.appointment_date,
        time = %booking.appointment_time,
        "booking created"
    );

    history::record(
        &db,
        &state.booking_tx,
        NewHistoryEntry {
            booking_id: booking.id.clone(),
            action: ACTION_CREATED.to_string(),
            previous_status: None,
            new_status: Some(BookingStatus::Pending),
            notes: booking.notes.clone(),
            performed_by: booking.customer_id.clone(),
        },
    );

    resolve(&db, booking)
}

/// Edits date, time or notes. Moving the appointment re-runs the conflict
/// check against everything except this booking and recomputes `end_time`
/// from the service's current duration.
pub fn update(
    state: &AppState,
    booking_id: &str,
    changes: UpdateBooking,
    performed_by: &str,
) -> AppResult<BookingDetail> {
    if changes.appointment_date.is_none()
        && changes.appointment_time.is_none()
        && changes.notes.is_none()
    {
        return Err(AppError::BadRequest("no changes supplied".to_string()));
    }

    let mut db = state.db()?;
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut booking = queries::get_booking_by_id(&tx, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    if booking.status.is_terminal() {
        return Err(AppError::BadRequest(format!(
            "cannot update a {} booking",
            booking.status
        )));
    }

    let date = changes.appointment_date.unwrap_or(booking.appointment_date);
    let time = match &changes.appointment_time {
        Some(t) => normalize_time(t)?,
        None => booking.appointment_time.clone(),
    };

    let mut summary = vec![];
    if date != booking.appointment_date || time != booking.appointment_time {
        let service = queries::get_service(&tx, &booking.service_id)?
            .ok_or_else(|| AppError::NotFound(format!("service {}", booking.service_id)))?;

        if let Some(rejection) = scheduling::check_slot(
            &tx,
            &booking.stylist_id,
            &date,
            &time,
            service.duration_minutes,
            Some(&booking.id),
        )? {
            tracing::warn!(booking_id = %booking.id, reason = %rejection, "reschedule rejected");
            return Err(AppError::Conflict(rejection.to_string()));
        }

        summary.push(format!(
            "rescheduled from {} {} to {date} {time}",
            booking.appointment_date, booking.appointment_time
        ));
        booking.end_time = Some(end_time(&time, service.duration_minutes)?);
        booking.appointment_date = date;
        booking.appointment_time = time;
    }
    if let Some(notes) = changes.notes {
        if booking.notes.as_deref() != Some(notes.as_str()) {
            summary.push("notes updated".to_string());
            booking.notes = Some(notes);
        }
    }
    if summary.is_empty() {
        return Err(AppError::BadRequest(
            "update matches the current booking".to_string(),
        ));
    }

    booking.updated_at = queries::now();
    queries::save_booking(&tx, &booking).map_err(write_error)?;
    tx.commit()?;

    tracing::info!(booking_id = %booking.id, performed_by, "booking updated");

    history::record(
        &db,
        &state.booking_tx,
        NewHistoryEntry {
            booking_id: booking.id.clone(),
            action: ACTION_UPDATED.to_string(),
            previous_status: None,
            new_status: None,
            notes: Some(summary.join("; ")),
            performed_by: performed_by.to_string(),
        },
    );

    resolve(&db, booking)
}

/// Moves a booking along the status table, stamping `confirmed_at`,
/// `completed_at` or `cancelled_at` as the target status requires.
pub fn transition(
    state: &AppState,
    booking_id: &str,
    new_status: BookingStatus,
    performed_by: &str,
    reason: Option<&str>,
) -> AppResult<Booking> {
    let mut db = state.db()?;
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut booking = queries::get_booking_by_id(&tx, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    let previous = booking.status;
    if !previous.can_transition_to(new_status) {
        return Err(AppError::BadRequest(format!(
            "invalid status transition from {previous} to {new_status}"
        )));
    }

    let now = queries::now();
    match new_status {
        BookingStatus::Confirmed => booking.confirmed_at = Some(now),
        BookingStatus::Completed => booking.completed_at = Some(now),
        BookingStatus::Cancelled => booking.cancelled_at = Some(now),
        BookingStatus::Pending | BookingStatus::InProgress | BookingStatus::NoShow => {}
    }
    if matches!(new_status, BookingStatus::Cancelled | BookingStatus::NoShow) {
        if let Some(reason) = reason {
            booking.cancel_reason = Some(reason.to_string());
        }
    }
    booking.status = new_status;
    booking.updated_at = now;

    queries::save_booking(&tx, &booking).map_err(write_error)?;
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        from = %previous,
        to = %new_status,
        performed_by,
        "booking status changed"
    );

    history::record(
        &db,
        &state.booking_tx,
        NewHistoryEntry {
            booking_id: booking.id.clone(),
            action: new_status.history_action(),
            previous_status: Some(previous),
            new_status: Some(new_status),
            notes: reason.map(str::to_string),
            performed_by: performed_by.to_string(),
        },
    );

    Ok(booking)
}

pub fn cancel(
    state: &AppState,
    booking_id: &str,
    reason: &str,
    performed_by: &str,
) -> AppResult<Booking> {
    transition(state, booking_id, BookingStatus::Cancelled, performed_by, Some(reason))
}

pub fn get_by_id(state: &AppState, booking_id: &str) -> AppResult<BookingDetail> {
    let db = state.db()?;
    let booking = queries::get_booking_by_id(&db, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
    resolve(&db, booking)
}

pub fn list(
    state: &AppState,
    filter: &BookingFilter,
    page: PageRequest,
    sort: SortField,
    direction: SortDirection,
) -> AppResult<Paginated<Booking>> {
    if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
        if from > to {
            return Err(AppError::BadRequest(format!(
                "date_from {from} is after date_to {to}"
            )));
        }
    }

    let db = state.db()?;
    let (items, total) = queries::list_bookings(&db, filter, &page, sort, direction)?;
    Ok(Paginated::new(items, total, page))
}

pub fn history(state: &AppState, booking_id: &str) -> AppResult<Vec<BookingHistory>> {
    let db = state.db()?;
    if queries::get_booking_by_id(&db, booking_id)?.is_none() {
        return Err(AppError::NotFound(format!("booking {booking_id}")));
    }
    Ok(queries::get_history_for_booking(&db, booking_id)?)
}

// Callers have already placed the slot inside the working day.
fn end_time(start: &str, duration_minutes: u32) -> AppResult<String> {
    time_to_minutes(start)?
        .checked_add(duration_minutes)
        .filter(|&end| end < MINUTES_PER_DAY)
        .map(minutes_to_time)
        .ok_or_else(|| {
            AppError::BadRequest(format!("{start} plus {duration_minutes} minutes runs past midnight"))
        })
}

/// The partial unique index on active slots is the last line of defence
/// against double-booking; report it the same way as a failed check.
fn write_error(err: anyhow::Error) -> AppError {
    if queries::is_unique_violation(&err) {
        AppError::Conflict(scheduling::SlotRejection::AlreadyBooked.to_string())
    } else {
        AppError::Internal(err)
    }
}

fn resolve(conn: &Connection, booking: Booking) -> AppResult<BookingDetail> {
    let customer = queries::get_user(conn, &booking.customer_id)?
        .ok_or_else(|| AppError::NotFound(format!("customer {}", booking.customer_id)))?;
    let stylist = queries::get_user(conn, &booking.stylist_id)?
        .ok_or_else(|| AppError::NotFound(format!("stylist {}", booking.stylist_id)))?;
    let service = queries::get_service(conn, &booking.service_id)?
        .ok_or_else(|| AppError::NotFound(format!("service {}", booking.service_id)))?;

    Ok(BookingDetail {
        booking,
        customer: customer.into(),
        stylist: stylist.into(),
        service,
    })
}
