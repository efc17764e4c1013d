//! Wall-clock arithmetic on "HH:MM[:SS]" strings.

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time format: {0:?} (expected HH:MM or HH:MM:SS)")]
pub struct TimeFormatError(pub String);

/// Minutes since midnight. Seconds, when present, are validated and dropped.
pub fn time_to_minutes(time: &str) -> Result<u32, TimeFormatError> {
    let err = || TimeFormatError(time.to_string());

    let parts: Vec<&str> = time.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err(err());
    }

    let hour = two_digits(parts[0]).ok_or_else(err)?;
    let minute = two_digits(parts[1]).ok_or_else(err)?;
    if hour > 23 || minute > 59 {
        return Err(err());
    }
    if let Some(seconds) = parts.get(2) {
        if two_digits(seconds).ok_or_else(err)? > 59 {
            return Err(err());
        }
    }

    Ok(hour * 60 + minute)
}

/// Formats minutes since midnight as "HH:MM:SS".
///
/// Callers must pass `minutes < MINUTES_PER_DAY`.
pub fn minutes_to_time(minutes: u32) -> String {
    debug_assert!(minutes < MINUTES_PER_DAY, "minutes out of range: {minutes}");
    format!("{:02}:{:02}:00", minutes / 60, minutes % 60)
}

/// Half-open interval test: `[a_start, a_end)` against `[b_start, b_end)`.
pub fn intervals_overlap(a_start: u32, a_end: u32, b_start: u32, b_end: u32) -> bool {
    a_start < b_end && b_start < a_end
}

/// Canonical "HH:MM:SS" form of a user-supplied time.
pub fn normalize_time(time: &str) -> Result<String, TimeFormatError> {
    time_to_minutes(time).map(minutes_to_time)
}

fn two_digits(s: &str) -> Option<u32> {
    if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
