//! Appointment, client and service records for a barbershop front desk.

pub mod application;
pub mod domain;
pub mod error;
pub mod memory;
pub mod ports;
pub mod utils;
pub mod validator;

pub use application::{BookingService, ClientRemoval};
pub use domain::{Appointment, AppointmentId, Client, NameKey, Service, ServiceChanges};
pub use error::{BookingError, ScheduleError, StorageError, ValidationError};
pub use memory::InMemoryStore;
