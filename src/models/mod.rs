pub mod booking;
pub mod catalog;
pub mod history;
pub mod schedule;
pub mod user;

pub use booking::{
    Booking, BookingDetail, BookingFilter, BookingStatus, PageRequest, Paginated, SortDirection,
    SortField,
};
pub use catalog::Service;
pub use history::{BookingHistory, NewHistoryEntry};
pub use schedule::{ScheduleDay, Slot, StylistSchedule};
pub use user::{User, UserRole, UserSummary};
