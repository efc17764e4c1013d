use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::BookingStatus;

pub const ACTION_CREATED: &str = "CREATED";
pub const ACTION_UPDATED: &str = "UPDATED";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingHistory {
    pub id: i64,
    pub booking_id: String,
    pub action: String,
    pub previous_status: Option<BookingStatus>,
    pub new_status: Option<BookingStatus>,
    pub notes: Option<String>,
    pub performed_by: String,
    pub created_at: NaiveDateTime,
}

/// An entry about to be appended; the log assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub booking_id: String,
    pub action: String,
    pub previous_status: Option<BookingStatus>,
    pub new_status: Option<BookingStatus>,
    pub notes: Option<String>,
    pub performed_by: String,
}
