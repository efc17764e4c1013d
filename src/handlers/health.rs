use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::errors::AppResult;
use crate::state::AppState;

// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let db = state.db()?;
    db.query_row("SELECT 1", [], |_| Ok(()))?;
    Ok(Json(json!({ "status": "ok" })))
}
