use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::error::Error;
use thiserror::Error;

/// Field-level problems found while constructing a domain value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{entity} name must not be empty")]
    EmptyName { entity: &'static str },
    #[error("service price must be greater than zero, got {0}")]
    NonPositivePrice(Decimal),
    #[error("service name must be between {min} and {max} characters, got {actual}")]
    NameLength { min: usize, max: usize, actual: usize },
    #[error("service price must be between {min} and {max}, got {actual}")]
    PriceOutOfRange {
        min: Decimal,
        max: Decimal,
        actual: Decimal,
    },
    #[error("service description must not exceed {max} characters, got {actual}")]
    DescriptionTooLong { max: usize, actual: usize },
    #[error("service duration must be between {min} and {max} minutes, got {actual}")]
    DurationOutOfRange { min: u16, max: u16, actual: u16 },
}

/// Booking-window violations reported by the appointment validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("appointments cannot be booked in the past ({requested} is not after {now})")]
    PastDate {
        requested: NaiveDateTime,
        now: NaiveDateTime,
    },
    #[error("appointments can be booked at most 7 days ahead ({requested} is after {latest})")]
    TooFarAhead {
        requested: NaiveDateTime,
        latest: NaiveDateTime,
    },
}

/// A failure inside a storage backend.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct StorageError(Box<dyn Error + Send + Sync>);

impl StorageError {
    pub fn new(source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

/// Errors returned by [`crate::application::BookingService`].
#[derive(Debug, Error)]
pub enum BookingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("unknown service: {0}")]
    UnknownService(String),
    #[error("a service named {0} already exists")]
    ServiceExists(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
