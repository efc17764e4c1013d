pub mod admin;
pub mod bookings;
pub mod health;
pub mod stylists;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/stylists/:id/slots", get(stylists::list_slots))
        .route("/api/stylists/:id/slot-check", get(stylists::check_slot))
        .route(
            "/api/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/api/bookings/events", get(bookings::events_stream))
        .route(
            "/api/bookings/:id",
            get(bookings::get_booking).patch(bookings::update_booking),
        )
        .route("/api/bookings/:id/status", post(bookings::change_status))
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/api/bookings/:id/history", get(bookings::get_history))
        .route("/api/bookings/:id/calendar.ics", get(bookings::download_ics))
        .route("/api/admin/users", post(admin::create_user))
        .route("/api/admin/services", post(admin::create_service))
        .route("/api/admin/services/:id", put(admin::update_service))
        .route(
            "/api/admin/stylists/:id/schedule",
            get(admin::get_schedule).put(admin::put_schedule),
        )
        .with_state(state)
}
