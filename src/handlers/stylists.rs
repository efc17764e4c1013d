use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::Slot;
use crate::services::{availability, scheduling};
use crate::state::AppState;

// GET /api/stylists/:id/slots
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
    pub duration: Option<u32>,
    pub service_id: Option<String>,
    pub granularity: Option<u32>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    stylist_id: String,
    date: NaiveDate,
    duration_minutes: u32,
    slots: Vec<Slot>,
}

pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Path(stylist_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> AppResult<Json<SlotsResponse>> {
    let db = state.db()?;
    if queries::get_stylist(&db, &stylist_id)?.is_none() {
        return Err(AppError::NotFound(format!("stylist {stylist_id}")));
    }

    let duration = resolve_duration(&db, query.duration, query.service_id.as_deref())?;
    let granularity = query
        .granularity
        .unwrap_or(state.config.slot_granularity_minutes);
    let slots =
        availability::list_available_slots(&db, &stylist_id, &query.date, duration, granularity)?;

    Ok(Json(SlotsResponse {
        stylist_id,
        date: query.date,
        duration_minutes: duration,
        slots,
    }))
}

// GET /api/stylists/:id/slot-check
#[derive(Deserialize)]
pub struct SlotCheckQuery {
    pub date: NaiveDate,
    pub time: String,
    pub duration: Option<u32>,
    pub service_id: Option<String>,
    pub exclude: Option<String>,
}

#[derive(Serialize)]
pub struct SlotCheckResponse {
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

pub async fn check_slot(
    State(state): State<Arc<AppState>>,
    Path(stylist_id): Path<String>,
    Query(query): Query<SlotCheckQuery>,
) -> AppResult<Json<SlotCheckResponse>> {
    let db = state.db()?;
    if queries::get_stylist(&db, &stylist_id)?.is_none() {
        return Err(AppError::NotFound(format!("stylist {stylist_id}")));
    }

    let duration = resolve_duration(&db, query.duration, query.service_id.as_deref())?;
    let rejection = scheduling::check_slot(
        &db,
        &stylist_id,
        &query.date,
        &query.time,
        duration,
        query.exclude.as_deref(),
    )?;

    Ok(Json(SlotCheckResponse {
        available: rejection.is_none(),
        reason: rejection.map(|r| r.to_string()),
    }))
}

/// An explicit duration wins; otherwise the service's current duration.
fn resolve_duration(
    conn: &rusqlite::Connection,
    duration: Option<u32>,
    service_id: Option<&str>,
) -> AppResult<u32> {
    match (duration, service_id) {
        (Some(d), _) => Ok(d),
        (None, Some(id)) => queries::get_service(conn, id)?
            .map(|s| s.duration_minutes)
            .ok_or_else(|| AppError::NotFound(format!("service {id}"))),
        (None, None) => Err(AppError::BadRequest(
            "either duration or service_id is required".to_string(),
        )),
    }
}
