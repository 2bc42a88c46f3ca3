use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::domain::{Appointment, AppointmentId, Client, Service};
use crate::error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage port for clients, services and appointments.
///
/// Clients and services are addressed by case-insensitive name, appointments
/// by integer id. Every `save_*` is an upsert. Listings come back sorted:
/// clients and services by name, appointments by start time.
pub trait Repository: Send + Sync {
    fn save_client(&self, client: Client) -> Result<()>;
    fn find_client(&self, name: &str) -> Result<Option<Client>>;
    fn list_clients(&self) -> Result<Vec<Client>>;
    /// Removes a client unless an appointment still references it.
    /// Returns `false` when refused or when there was nothing to remove.
    fn delete_client(&self, name: &str) -> Result<bool>;
    fn client_has_appointments(&self, name: &str) -> Result<bool>;

    fn save_service(&self, service: Service) -> Result<()>;
    fn find_service(&self, name: &str) -> Result<Option<Service>>;
    fn list_services(&self) -> Result<Vec<Service>>;
    fn delete_service(&self, name: &str) -> Result<bool>;

    /// Hands out a fresh id, never lower than any id already saved.
    fn next_appointment_id(&self) -> Result<AppointmentId>;
    fn save_appointment(&self, appointment: Appointment) -> Result<()>;
    fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>>;
    fn delete_appointment(&self, id: AppointmentId) -> Result<bool>;
    fn list_appointments(&self) -> Result<Vec<Appointment>>;
    fn list_appointments_on_day(&self, day: NaiveDate) -> Result<Vec<Appointment>>;
    fn list_appointments_for_client(&self, name: &str) -> Result<Vec<Appointment>>;
}

/// Source of the reference "now" used by the booking window.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
