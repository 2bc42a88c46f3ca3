use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::domain::{Appointment, AppointmentId, Client, Service, ServiceChanges};
use crate::error::BookingError;
use crate::ports::{Clock, Repository};

type Result<T> = std::result::Result<T, BookingError>;

/// Outcome of [`BookingService::remove_client`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRemoval {
    Removed,
    HasAppointments,
    NotFound,
}

/// Use cases of the front desk, on top of any [`Repository`] backend.
pub struct BookingService {
    repository: Box<dyn Repository>,
    clock: Box<dyn Clock>,
}

impl BookingService {
    /// Creates a BookingService with the given storage backend and clock
    pub fn new(repository: Box<dyn Repository>, clock: Box<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Stores a client unless one already exists under the same name.
    ///
    /// Returns whichever record ends up stored; details passed for an existing
    /// name are ignored (use [`Self::update_client`] to overwrite them).
    #[instrument(skip(self, client), fields(client = %client.name))]
    pub fn register_client(&self, client: Client) -> Result<Client> {
        if let Some(existing) = self.repository.find_client(&client.name)? {
            return Ok(existing);
        }
        self.repository.save_client(client.clone())?;
        info!("Client registered");
        Ok(client)
    }

    #[instrument(skip(self, client), fields(client = %client.name))]
    pub fn update_client(&self, client: Client) -> Result<()> {
        self.repository.save_client(client)?;
        Ok(())
    }

    pub fn find_client(&self, name: &str) -> Result<Option<Client>> {
        Ok(self.repository.find_client(name)?)
    }

    pub fn clients(&self) -> Result<Vec<Client>> {
        Ok(self.repository.list_clients()?)
    }

    /// Removes a client, reporting why nothing was removed.
    #[instrument(skip(self))]
    pub fn remove_client(&self, name: &str) -> Result<ClientRemoval> {
        if self.repository.client_has_appointments(name)? {
            warn!("Client still has appointments");
            return Ok(ClientRemoval::HasAppointments);
        }
        if self.repository.delete_client(name)? {
            Ok(ClientRemoval::Removed)
        } else {
            Ok(ClientRemoval::NotFound)
        }
    }

    pub fn client_history(&self, name: &str) -> Result<Vec<Appointment>> {
        Ok(self.repository.list_appointments_for_client(name)?)
    }

    #[instrument(skip(self, service), fields(service = %service.name, price = %service.price))]
    pub fn add_service(&self, service: Service) -> Result<()> {
        self.repository.save_service(service)?;
        info!("Service saved");
        Ok(())
    }

    pub fn find_service(&self, name: &str) -> Result<Option<Service>> {
        Ok(self.repository.find_service(name)?)
    }

    pub fn services(&self) -> Result<Vec<Service>> {
        Ok(self.repository.list_services()?)
    }

    /// Replaces a service with a copy carrying the new price.
    #[instrument(skip(self))]
    pub fn change_service_price(&self, name: &str, price: Decimal) -> Result<Service> {
        let existing = self.require_service(name)?;
        let repriced = existing.with_price(price)?;
        self.repository.save_service(repriced.clone())?;
        info!("Service repriced");
        Ok(repriced)
    }

    /// Overwrites every editable field of a service.
    ///
    /// A rename moves the record to the new name, which must not belong to
    /// another service.
    #[instrument(skip(self, changes))]
    pub fn edit_service(&self, name: &str, changes: ServiceChanges) -> Result<Service> {
        let mut service = self.require_service(name)?;
        let old_key = service.key();
        service.update(changes)?;

        if service.key() != old_key {
            if self.repository.find_service(&service.name)?.is_some() {
                warn!(target_name = %service.name, "Rename target already exists");
                return Err(BookingError::ServiceExists(service.name));
            }
            self.repository.delete_service(name)?;
        }
        self.repository.save_service(service.clone())?;
        info!(service = %service.name, "Service edited");
        Ok(service)
    }

    pub fn remove_service(&self, name: &str) -> Result<bool> {
        Ok(self.repository.delete_service(name)?)
    }

    /// Books `service_name` for `client` at `starts_at`.
    ///
    /// The client is registered first (see [`Self::register_client`]) and
    /// stays registered even if the booking itself is rejected.
    #[instrument(skip(self, client), fields(client = %client.name))]
    pub fn book_appointment(
        &self,
        client: Client,
        service_name: &str,
        starts_at: NaiveDateTime,
    ) -> Result<Appointment> {
        let client = self.register_client(client)?;
        let service = self.require_service(service_name)?;

        let id = self.repository.next_appointment_id()?;
        let appointment = Appointment::new(id, client, service, starts_at, self.clock.now())
            .inspect_err(|e| warn!(error = %e, "Booking rejected"))?;

        self.repository.save_appointment(appointment.clone())?;
        info!(appointment_id = id, "Appointment booked");
        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub fn cancel_appointment(&self, id: AppointmentId) -> Result<bool> {
        let removed = self.repository.delete_appointment(id)?;
        if removed {
            info!("Appointment cancelled");
        }
        Ok(removed)
    }

    pub fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        Ok(self.repository.find_appointment(id)?)
    }

    pub fn appointments(&self) -> Result<Vec<Appointment>> {
        Ok(self.repository.list_appointments()?)
    }

    pub fn appointments_on(&self, day: NaiveDate) -> Result<Vec<Appointment>> {
        Ok(self.repository.list_appointments_on_day(day)?)
    }

    fn require_service(&self, name: &str) -> Result<Service> {
        self.repository
            .find_service(name)?
            .ok_or_else(|| BookingError::UnknownService(name.trim().to_string()))
    }
}
