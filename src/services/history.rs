use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::db::queries;
use crate::models::{BookingHistory, NewHistoryEntry};

/// Appends to the booking's audit trail and publishes the stored entry.
///
/// Failures are logged and swallowed: the booking change being recorded has
/// already been committed and stands on its own.
pub fn record(
    conn: &Connection,
    events: &broadcast::Sender<BookingHistory>,
    entry: NewHistoryEntry,
) -> Option<BookingHistory> {
    match queries::insert_history(conn, &entry) {
        Ok(stored) => {
            // No subscribers is not an error.
            let _ = events.send(stored.clone());
            Some(stored)
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                booking_id = %entry.booking_id,
                action = %entry.action,
                "failed to record booking history"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{insert_booking, seeded_db};
    use crate::models::BookingStatus;

    fn entry(booking_id: &str) -> NewHistoryEntry {
        NewHistoryEntry {
            booking_id: booking_id.to_string(),
            action: "CREATED".to_string(),
            previous_status: None,
            new_status: Some(BookingStatus::Pending),
            notes: None,
            performed_by: "cust-1".to_string(),
        }
    }

    #[test]
    fn test_record_stores_and_broadcasts() {
        let conn = seeded_db();
        insert_booking(&conn, "bk-1", "10:00:00", None, BookingStatus::Pending);
        let (tx, mut rx) = broadcast::channel(8);

        let stored = record(&conn, &tx, entry("bk-1")).unwrap();
        assert_eq!(stored.booking_id, "bk-1");
        assert_eq!(rx.try_recv().unwrap(), stored);
        assert_eq!(queries::get_history_for_booking(&conn, "bk-1").unwrap(), vec![stored]);
    }

    #[test]
    fn test_record_failure_is_swallowed() {
        let conn = seeded_db();
        let (tx, mut rx) = broadcast::channel(8);

        // Unknown booking violates the foreign key.
        assert!(record(&conn, &tx, entry("missing")).is_none());
        assert!(rx.try_recv().is_err());
    }
}
