use serde::{Deserialize, Serialize};

/// A bookable service. `price` is in cents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub duration_minutes: u32,
    pub is_active: bool,
}
