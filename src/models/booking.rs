use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{Service, UserSummary};
use crate::services::time::{time_to_minutes, TimeFormatError};

/// Assumed length of rows written before `end_time` was stored.
pub const LEGACY_DURATION_MINUTES: u32 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub stylist_id: String,
    pub service_id: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub end_time: Option<String>,
    pub status: BookingStatus,
    pub total_amount: i64,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub confirmed_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    /// `[start, end)` in minutes since midnight.
    pub fn interval(&self) -> Result<(u32, u32), TimeFormatError> {
        let start = time_to_minutes(&self.appointment_time)?;
        let end = match &self.end_time {
            Some(end) => time_to_minutes(end)?,
            None => start + LEGACY_DURATION_MINUTES,
        };
        Ok((start, end))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::NoShow,
    ];

    /// Statuses that still hold a time slot.
    pub const ACTIVE: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "in_progress" => Some(BookingStatus::InProgress),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "no_show" => Some(BookingStatus::NoShow),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        match (self, next) {
            (Pending, Confirmed | Cancelled) => true,
            (Confirmed, InProgress | Cancelled | NoShow) => true,
            (InProgress, Completed | Cancelled) => true,
            (Pending | Confirmed | InProgress | Completed | Cancelled | NoShow, _) => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }

    /// History label for a transition into this status, e.g. `STATUS_CHANGED_TO_IN_PROGRESS`.
    pub fn history_action(self) -> String {
        format!("STATUS_CHANGED_TO_{}", self.as_str().to_uppercase())
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking with its customer, stylist and service resolved.
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub customer: UserSummary,
    pub stylist: UserSummary,
    pub service: Service,
}

/// Filters accepted by the booking listing. Date bounds are inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub customer_id: Option<String>,
    pub stylist_id: Option<String>,
    pub service_id: Option<String>,
    pub status: Option<BookingStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    AppointmentDate,
    AppointmentTime,
    CreatedAt,
    UpdatedAt,
    Status,
    TotalAmount,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::AppointmentDate => "appointment_date",
            SortField::AppointmentTime => "appointment_time",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Status => "status",
            SortField::TotalAmount => "total_amount",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const MAX_LIMIT: u32 = 100;

    /// Clamps `page` to at least 1 and `limit` to `1..=MAX_LIMIT`.
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, page: PageRequest) -> Self {
        Self {
            items,
            total,
            page: page.page,
            limit: page.limit,
            total_pages: total.div_ceil(page.limit as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tokens_round_trip() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert_eq!(BookingStatus::parse("Pending"), None);
        assert_eq!(BookingStatus::parse("noshow"), None);
    }

    #[test]
    fn test_transition_table() {
        use BookingStatus::*;
        let allowed = [
            (Pending, Confirmed),
            (Pending, Cancelled),
            (Confirmed, InProgress),
            (Confirmed, Cancelled),
            (Confirmed, NoShow),
            (InProgress, Completed),
            (InProgress, Cancelled),
        ];
        for from in BookingStatus::ALL {
            for to in BookingStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in BookingStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            assert!(BookingStatus::ALL.iter().all(|to| !from.can_transition_to(*to)));
        }
        assert!(!BookingStatus::ACTIVE.iter().any(|s| s.is_terminal()));
    }

    #[test]
    fn test_page_request_clamps() {
        let page = PageRequest::new(Some(0), Some(500), 20);
        assert_eq!(page, PageRequest { page: 1, limit: 100 });
        assert_eq!(PageRequest::new(None, None, 20).limit, 20);
        assert_eq!(PageRequest::new(Some(3), Some(10), 20).offset(), 20);
    }

    #[test]
    fn test_paginated_total_pages() {
        let page = PageRequest::new(Some(1), Some(10), 20);
        assert_eq!(Paginated::new(Vec::<u8>::new(), 0, page).total_pages, 0);
        assert_eq!(Paginated::new(Vec::<u8>::new(), 21, page).total_pages, 3);
    }

    #[test]
    fn test_history_action() {
        assert_eq!(BookingStatus::InProgress.history_action(), "STATUS_CHANGED_TO_IN_PROGRESS");
        assert_eq!(BookingStatus::Confirmed.history_action(), "STATUS_CHANGED_TO_CONFIRMED");
    }

    #[test]
    fn test_legacy_interval_defaults_to_an_hour() {
        let now = chrono::Utc::now().naive_utc();
        let mut booking = Booking {
            id: "b1".to_string(),
            customer_id: "c1".to_string(),
            stylist_id: "s1".to_string(),
            service_id: "svc1".to_string(),
            appointment_date: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            appointment_time: "10:00:00".to_string(),
            end_time: None,
            status: BookingStatus::Pending,
            total_amount: 2500,
            notes: None,
            cancel_reason: None,
            confirmed_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(booking.interval().unwrap(), (600, 660));

        booking.end_time = Some("10:30:00".to_string());
        assert_eq!(booking.interval().unwrap(), (600, 630));
    }
}
