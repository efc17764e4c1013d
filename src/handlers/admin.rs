use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::schedule::validate_week;
use crate::models::{ScheduleDay, Service, StylistSchedule, User, UserRole};
use crate::services::scheduling;
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> AppResult<()> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// POST /api/admin/users
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    check_auth(&headers, &state.config.admin_token)?;

    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }

    let user = User {
        id: req.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        name: req.name.trim().to_string(),
        email: req.email,
        phone: req.phone,
        role: req.role,
        created_at: queries::now(),
    };

    let db = state.db()?;
    queries::create_user(&db, &user).map_err(|e| {
        if queries::is_unique_violation(&e) {
            AppError::Conflict(format!("user {} already exists", user.id))
        } else {
            AppError::Internal(e)
        }
    })?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

// POST /api/admin/services
#[derive(Deserialize)]
pub struct ServiceRequest {
    pub id: Option<String>,
    pub name: String,
    pub price: i64,
    pub duration_minutes: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

fn validate_service(req: &ServiceRequest) -> AppResult<()> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if req.price < 0 {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }
    scheduling::validate_duration(req.duration_minutes)?;
    Ok(())
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ServiceRequest>,
) -> AppResult<(StatusCode, Json<Service>)> {
    check_auth(&headers, &state.config.admin_token)?;
    validate_service(&req)?;

    let service = Service {
        id: req.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        name: req.name.trim().to_string(),
        price: req.price,
        duration_minutes: req.duration_minutes,
        is_active: req.is_active,
    };

    let db = state.db()?;
    queries::create_service(&db, &service).map_err(|e| {
        if queries::is_unique_violation(&e) {
            AppError::Conflict(format!("service {} already exists", service.id))
        } else {
            AppError::Internal(e)
        }
    })?;

    tracing::info!(service_id = %service.id, price = service.price, "service created");
    Ok((StatusCode::CREATED, Json(service)))
}

// PUT /api/admin/services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<ServiceRequest>,
) -> AppResult<Json<Service>> {
    check_auth(&headers, &state.config.admin_token)?;
    validate_service(&req)?;

    let service = Service {
        id,
        name: req.name.trim().to_string(),
        price: req.price,
        duration_minutes: req.duration_minutes,
        is_active: req.is_active,
    };

    let db = state.db()?;
    if !queries::update_service(&db, &service)? {
        return Err(AppError::NotFound(format!("service {}", service.id)));
    }

    tracing::info!(service_id = %service.id, "service updated");
    Ok(Json(service))
}

// PUT /api/admin/stylists/:id/schedule
pub async fn put_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(stylist_id): Path<String>,
    Json(days): Json<Vec<ScheduleDay>>,
) -> AppResult<Json<Vec<StylistSchedule>>> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db()?;
    if queries::get_stylist(&db, &stylist_id)?.is_none() {
        return Err(AppError::NotFound(format!("stylist {stylist_id}")));
    }

    let week = validate_week(&stylist_id, &days)?;
    queries::replace_schedule(&db, &stylist_id, &week)?;

    tracing::info!(
        stylist_id = %stylist_id,
        days = week.len(),
        "schedule replaced"
    );
    Ok(Json(week))
}

// GET /api/admin/stylists/:id/schedule
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(stylist_id): Path<String>,
) -> AppResult<Json<Vec<StylistSchedule>>> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db()?;
    if queries::get_stylist(&db, &stylist_id)?.is_none() {
        return Err(AppError::NotFound(format!("stylist {stylist_id}")));
    }
    Ok(Json(queries::get_schedule(&db, &stylist_id)?))
}
