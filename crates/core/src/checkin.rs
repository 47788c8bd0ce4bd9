//! Check-in and check-out state.
//!
//! A child's attendance for a day is derived from their latest
//! `check_in_records` row: no row means not checked in, a row without
//! `timestamp_out` means checked in, otherwise checked out. Session
//! bookings carry their own small lifecycle in [`BookingStatus`].

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Check-in method
// ---------------------------------------------------------------------------

/// How a child was checked in. Stored as `QR`, `OTP` or `PARENT_ID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckInMethod {
    #[serde(rename = "QR")]
    Qr,
    #[serde(rename = "OTP")]
    Otp,
    #[serde(rename = "PARENT_ID")]
    ParentId,
}

impl CheckInMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckInMethod::Qr => "QR",
            CheckInMethod::Otp => "OTP",
            CheckInMethod::ParentId => "PARENT_ID",
        }
    }
}

impl std::fmt::Display for CheckInMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Booking status
// ---------------------------------------------------------------------------

/// Lifecycle of a session booking.
///
/// ```text
/// booked --> checked_in --> checked_out
///    \
///     +--> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Booked,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Booked => "booked",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::CheckedOut => "checked_out",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the stored column value.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "booked" => Ok(BookingStatus::Booked),
            "checked_in" => Ok(BookingStatus::CheckedIn),
            "checked_out" => Ok(BookingStatus::CheckedOut),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(CoreError::Validation(format!(
                "Unknown booking status '{other}'"
            ))),
        }
    }

    /// Only a booking that is still `booked` may be used to check in.
    pub fn can_check_in(self) -> bool {
        self == BookingStatus::Booked
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Booked, BookingStatus::CheckedIn)
                | (BookingStatus::Booked, BookingStatus::Cancelled)
                | (BookingStatus::CheckedIn, BookingStatus::CheckedOut)
        )
    }

    /// Validate a transition, returning the target status on success.
    pub fn transition(self, next: BookingStatus) -> Result<BookingStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::Validation(format!(
                "Booking cannot move from {} to {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Attendance state
// ---------------------------------------------------------------------------

/// A child's check-in state for the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceState {
    NotCheckedIn,
    CheckedIn,
    CheckedOut,
}

impl AttendanceState {
    /// Derive the state from the `timestamp_out` of today's latest record,
    /// or `None` when there is no record today.
    pub fn from_latest(latest_timestamp_out: Option<Option<Timestamp>>) -> Self {
        match latest_timestamp_out {
            None => AttendanceState::NotCheckedIn,
            Some(None) => AttendanceState::CheckedIn,
            Some(Some(_)) => AttendanceState::CheckedOut,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceState::NotCheckedIn => "not_checked_in",
            AttendanceState::CheckedIn => "checked_in",
            AttendanceState::CheckedOut => "checked_out",
        }
    }
}

/// Midnight UTC of the day containing `now`. "Today" queries use
/// `timestamp_in >= start_of_day(now)`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    #[test]
    fn method_wire_names() {
        assert_eq!(CheckInMethod::Qr.as_str(), "QR");
        assert_eq!(CheckInMethod::Otp.as_str(), "OTP");
        assert_eq!(CheckInMethod::ParentId.as_str(), "PARENT_ID");
        assert_eq!(
            serde_json::to_value(CheckInMethod::ParentId).unwrap(),
            "PARENT_ID"
        );
    }

    #[test]
    fn only_booked_can_check_in() {
        assert!(BookingStatus::Booked.can_check_in());
        assert!(!BookingStatus::CheckedIn.can_check_in());
        assert!(!BookingStatus::CheckedOut.can_check_in());
        assert!(!BookingStatus::Cancelled.can_check_in());
    }

    #[test]
    fn booking_transitions() {
        assert_matches!(
            BookingStatus::Booked.transition(BookingStatus::CheckedIn),
            Ok(BookingStatus::CheckedIn)
        );
        assert_matches!(
            BookingStatus::CheckedIn.transition(BookingStatus::CheckedOut),
            Ok(BookingStatus::CheckedOut)
        );
        assert_matches!(
            BookingStatus::Booked.transition(BookingStatus::Cancelled),
            Ok(BookingStatus::Cancelled)
        );
        assert_matches!(
            BookingStatus::Cancelled.transition(BookingStatus::CheckedIn),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            BookingStatus::CheckedOut.transition(BookingStatus::CheckedIn),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn booking_status_parse_round_trips_column_values() {
        for status in [
            BookingStatus::Booked,
            BookingStatus::CheckedIn,
            BookingStatus::CheckedOut,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(BookingStatus::parse("pending").is_err());
    }

    #[test]
    fn attendance_state_from_latest_record() {
        assert_eq!(
            AttendanceState::from_latest(None),
            AttendanceState::NotCheckedIn
        );
        assert_eq!(
            AttendanceState::from_latest(Some(None)),
            AttendanceState::CheckedIn
        );
        assert_eq!(
            AttendanceState::from_latest(Some(Some(Utc::now()))),
            AttendanceState::CheckedOut
        );
        assert_eq!(AttendanceState::CheckedOut.as_str(), "checked_out");
    }

    #[test]
    fn start_of_day_truncates_to_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 8, 14, 37, 5).unwrap();
        let midnight = Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap();
        assert_eq!(start_of_day(now), midnight);
    }
}
