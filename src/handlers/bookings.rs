use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{
    Booking, BookingDetail, BookingFilter, BookingHistory, BookingStatus, PageRequest, Paginated,
    SortDirection, SortField,
};
use crate::services::booking::{self, CreateBooking, UpdateBooking};
use crate::services::calendar::generate_ics;
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBooking>,
) -> AppResult<(StatusCode, Json<BookingDetail>)> {
    let detail = booking::create(&state, req)?;
    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(flatten)]
    pub filter: BookingFilter,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub sort: SortField,
    #[serde(default)]
    pub order: SortDirection,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Paginated<Booking>>> {
    let page = PageRequest::new(query.page, query.limit, state.config.default_page_limit);
    let result = booking::list(&state, &query.filter, page, query.sort, query.order)?;
    Ok(Json(result))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<BookingDetail>> {
    Ok(Json(booking::get_by_id(&state, &id)?))
}

// PATCH /api/bookings/:id
#[derive(Deserialize)]
pub struct UpdateRequest {
    #[serde(flatten)]
    pub changes: UpdateBooking,
    pub performed_by: String,
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> AppResult<Json<BookingDetail>> {
    let performed_by = required("performed_by", &req.performed_by)?;
    Ok(Json(booking::update(&state, &id, req.changes, performed_by)?))
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: BookingStatus,
    pub performed_by: String,
    pub reason: Option<String>,
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> AppResult<Json<Booking>> {
    let performed_by = required("performed_by", &req.performed_by)?;
    let reason = req.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
    Ok(Json(booking::transition(
        &state,
        &id,
        req.status,
        performed_by,
        reason,
    )?))
}

// POST /api/bookings/:id/cancel
#[derive(Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: String,
    pub performed_by: String,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> AppResult<Json<Booking>> {
    let reason = required("reason", &req.reason)?;
    let performed_by = required("performed_by", &req.performed_by)?;
    Ok(Json(booking::cancel(&state, &id, reason, performed_by)?))
}

// GET /api/bookings/:id/history
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<BookingHistory>>> {
    Ok(Json(booking::history(&state, &id)?))
}

// GET /api/bookings/:id/calendar.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let detail = booking::get_by_id(&state, &id)?;
    let ics = generate_ics(&detail)?;
    let disposition = format!("attachment; filename=\"booking-{id}.ics\"");

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        ics,
    )
        .into_response())
}

// GET /api/bookings/events
#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
    pub last_id: Option<i64>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> AppResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    // EventSource can't set headers, so the token rides in the query string.
    if query.token.as_deref() != Some(state.config.admin_token.as_str()) {
        return Err(AppError::Unauthorized);
    }

    // Subscribe before the catch-up read so nothing falls in between.
    let rx = state.booking_tx.subscribe();
    let last_id = query.last_id.unwrap_or(0);
    let catchup = {
        let db = state.db()?;
        queries::get_history_since(&db, last_id)?
    };
    let high_water = catchup.last().map(|h| h.id).unwrap_or(last_id);

    let catchup_stream = tokio_stream::iter(catchup.into_iter().map(|entry| Ok(to_event(&entry))));

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(entry) if entry.id > high_water => Some(Ok(to_event(&entry))),
        Ok(_) => None,
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(skipped = n, "booking event subscriber lagged");
            None
        }
    });

    let keepalive_stream = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    let combined = catchup_stream.chain(live_stream);
    Ok(Sse::new(StreamExt::merge(combined, keepalive_stream)))
}

fn to_event(entry: &BookingHistory) -> Event {
    let data = serde_json::to_string(entry).unwrap_or_default();
    Event::default()
        .id(entry.id.to_string())
        .event("booking_event")
        .data(data)
}

fn required<'a>(field: &str, value: &'a str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(trimmed)
}
