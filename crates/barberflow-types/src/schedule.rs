use chrono::{DateTime, Datelike, Duration, Utc};

/// Half-open booking interval `[start, end)` on a barber's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    /// Slot covering `duration_minutes` from `start`. `None` for non-positive
    /// durations or when either bound leaves years 0000-9999, where stored
    /// timestamps stop being fixed-width.
    pub fn for_duration(start: DateTime<Utc>, duration_minutes: i64) -> Option<Self> {
        if duration_minutes <= 0 {
            return None;
        }
        let end = start.checked_add_signed(Duration::try_minutes(duration_minutes)?)?;
        if !(0..=9999).contains(&start.year()) || !(0..=9999).contains(&end.year()) {
            return None;
        }
        Some(Self { start, end })
    }
}
