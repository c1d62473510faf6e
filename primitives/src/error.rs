//! Status codes shared by both sides of the boundary.
//!
//! These are the only values that cross the boundary on failure. The
//! numeric values are fixed; the native engine compares against them.

use core::fmt;

/// General bridge status codes returned by every handle-taking entry point.
///
/// `0` is success; failures are small negative integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StatusCode {
    Success = 0,
    InvalidHandle = -1,
    NotFound = -2,
    Io = -3,
    InvalidArgument = -4,
    Panic = -5,
}

impl StatusCode {
    /// Convert from an i32 returned by an entry point.
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            -1 => Some(Self::InvalidHandle),
            -2 => Some(Self::NotFound),
            -3 => Some(Self::Io),
            -4 => Some(Self::InvalidArgument),
            -5 => Some(Self::Panic),
            _ => None,
        }
    }

    /// Return the i32 representation of this status code.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns true if this is the `Success` variant.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::InvalidHandle => write!(f, "ERR_INVALID_HANDLE"),
            Self::NotFound => write!(f, "ERR_NOT_FOUND"),
            Self::Io => write!(f, "ERR_IO"),
            Self::InvalidArgument => write!(f, "ERR_INVALID_ARGUMENT"),
            Self::Panic => write!(f, "ERR_PANIC"),
        }
    }
}

/// Status codes returned by the reservation entry points.
///
/// Every non-`Ok` value is terminal for the current unit of execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ReservationStatus {
    Ok = 0,
    NotImplemented = 1,
    InsufficientFunds = 2,
    SessionOpen = 3,
    SessionClosed = 4,
    NonZeroRemainder = 5,
    PlanTooLarge = 6,
    Overflow = 7,
    InvariantViolation = 8,
}

impl ReservationStatus {
    /// Convert from an i32 returned by a reservation entry point.
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::NotImplemented),
            2 => Some(Self::InsufficientFunds),
            3 => Some(Self::SessionOpen),
            4 => Some(Self::SessionClosed),
            5 => Some(Self::NonZeroRemainder),
            6 => Some(Self::PlanTooLarge),
            7 => Some(Self::Overflow),
            8 => Some(Self::InvariantViolation),
            _ => None,
        }
    }

    /// Return the i32 representation of this status.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns true if this is the `Ok` variant.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::NotImplemented => write!(f, "ERR_NOT_IMPLEMENTED"),
            Self::InsufficientFunds => write!(f, "ERR_INSUFFICIENT_FUNDS"),
            Self::SessionOpen => write!(f, "ERR_SESSION_OPEN"),
            Self::SessionClosed => write!(f, "ERR_SESSION_CLOSED"),
            Self::NonZeroRemainder => write!(f, "ERR_NON_ZERO_REMAINDER"),
            Self::PlanTooLarge => write!(f, "ERR_PLAN_TOO_LARGE"),
            Self::Overflow => write!(f, "ERR_OVERFLOW"),
            Self::InvariantViolation => write!(f, "ERR_RESERVATION_INVARIANT"),
        }
    }
}
