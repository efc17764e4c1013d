pub mod availability;
pub mod booking;
pub mod calendar;
pub mod history;
pub mod scheduling;
pub mod time;
