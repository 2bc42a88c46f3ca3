use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::fmt;

use crate::error::{ScheduleError, ValidationError};
use crate::utils::format_price;
use crate::validator;

/// Integer identity of an appointment.
pub type AppointmentId = u32;

/// Case-folded lookup key for clients and services.
///
/// The name is trimmed and uppercased, so `" mario"`, `"Mario"` and `"MARIO"`
/// all address the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameKey(String);

impl NameKey {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A customer of the shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub national_id: Option<String>,
}

impl Client {
    /// Creates a client with only a name. Blank names are rejected.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName { entity: "client" });
        }
        Ok(Self {
            name,
            phone: None,
            email: None,
            national_id: None,
        })
    }

    pub fn with_phone(mut self, phone: Option<String>) -> Self {
        self.phone = optional(phone);
        self
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = optional(email);
        self
    }

    pub fn with_national_id(mut self, national_id: Option<String>) -> Self {
        self.national_id = optional(national_id);
        self
    }

    pub fn key(&self) -> NameKey {
        NameKey::new(&self.name)
    }

    /// One-line description for listings.
    pub fn summary(&self) -> String {
        format!(
            "{} | Tel: {} | Email: {} | ID: {}",
            self.name,
            self.phone.as_deref().unwrap_or("-"),
            self.email.as_deref().unwrap_or("-"),
            self.national_id.as_deref().unwrap_or("-"),
        )
    }
}

/// Limits applied to catalog records (see [`Service::check_catalog_limits`]).
pub mod catalog {
    use rust_decimal::Decimal;

    pub const NAME_MIN: usize = 3;
    pub const NAME_MAX: usize = 100;
    pub const DESCRIPTION_MAX: usize = 500;
    pub const DURATION_MIN: u16 = 1;
    pub const DURATION_MAX: u16 = 600;

    pub fn price_min() -> Decimal {
        Decimal::new(1, 2)
    }

    pub fn price_max() -> Decimal {
        Decimal::new(100_000, 2)
    }
}

/// An entry in the shop's price list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub duration_minutes: Option<u16>,
    pub is_active: bool,
}

/// Every editable field of a service, applied together by [`Service::update`].
#[derive(Debug, Clone)]
pub struct ServiceChanges {
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub duration_minutes: Option<u16>,
    pub is_active: bool,
}

impl Service {
    /// Creates an active service. Rejects a blank name and a price `<= 0`.
    pub fn new(name: impl Into<String>, price: Decimal) -> Result<Self, ValidationError> {
        let name = Self::checked_name(name.into())?;
        Self::check_price(price)?;
        Ok(Self {
            name,
            price,
            description: None,
            duration_minutes: None,
            is_active: true,
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = optional(description);
        self
    }

    pub fn with_duration(mut self, duration_minutes: Option<u16>) -> Self {
        self.duration_minutes = duration_minutes;
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Returns a replacement value carrying a new price and every other field unchanged.
    pub fn with_price(&self, price: Decimal) -> Result<Self, ValidationError> {
        Self::check_price(price)?;
        Ok(Self {
            price,
            ..self.clone()
        })
    }

    /// Overwrites all editable fields at once.
    ///
    /// Nothing is modified when the new name or price is rejected.
    pub fn update(&mut self, changes: ServiceChanges) -> Result<(), ValidationError> {
        let name = Self::checked_name(changes.name)?;
        Self::check_price(changes.price)?;

        self.name = name;
        self.price = changes.price;
        self.description = optional(changes.description);
        self.duration_minutes = changes.duration_minutes;
        self.is_active = changes.is_active;
        Ok(())
    }

    pub fn key(&self) -> NameKey {
        NameKey::new(&self.name)
    }

    /// Checks the stricter limits a catalog record must satisfy.
    ///
    /// Not enforced by the constructor; hosts that edit the catalog decide
    /// whether a violation is fatal.
    pub fn check_catalog_limits(&self) -> Result<(), ValidationError> {
        let name_len = self.name.chars().count();
        if !(catalog::NAME_MIN..=catalog::NAME_MAX).contains(&name_len) {
            return Err(ValidationError::NameLength {
                min: catalog::NAME_MIN,
                max: catalog::NAME_MAX,
                actual: name_len,
            });
        }

        if self.price < catalog::price_min() || self.price > catalog::price_max() {
            return Err(ValidationError::PriceOutOfRange {
                min: catalog::price_min(),
                max: catalog::price_max(),
                actual: self.price,
            });
        }

        if let Some(description) = &self.description {
            let len = description.chars().count();
            if len > catalog::DESCRIPTION_MAX {
                return Err(ValidationError::DescriptionTooLong {
                    max: catalog::DESCRIPTION_MAX,
                    actual: len,
                });
            }
        }

        if let Some(minutes) = self.duration_minutes {
            if !(catalog::DURATION_MIN..=catalog::DURATION_MAX).contains(&minutes) {
                return Err(ValidationError::DurationOutOfRange {
                    min: catalog::DURATION_MIN,
                    max: catalog::DURATION_MAX,
                    actual: minutes,
                });
            }
        }

        Ok(())
    }

    fn checked_name(name: String) -> Result<String, ValidationError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName { entity: "service" });
        }
        Ok(name)
    }

    fn check_price(price: Decimal) -> Result<(), ValidationError> {
        if price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(price));
        }
        Ok(())
    }
}

/// A booked visit: one client, one service, one instant.
///
/// The booking window is checked once, when the value is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    pub id: AppointmentId,
    pub client: Client,
    pub service: Service,
    pub starts_at: NaiveDateTime,
}

impl Appointment {
    /// Creates an appointment, rejecting instants outside the booking window
    /// relative to `now`.
    pub fn new(
        id: AppointmentId,
        client: Client,
        service: Service,
        starts_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<Self, ScheduleError> {
        validator::validate(starts_at, now)?;
        Ok(Self::restore(id, client, service, starts_at))
    }

    /// Rebuilds an appointment that was validated when first booked.
    ///
    /// Storage backends use this when loading rows; the booking window is
    /// not re-checked.
    pub fn restore(
        id: AppointmentId,
        client: Client,
        service: Service,
        starts_at: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            client,
            service,
            starts_at,
        }
    }

    pub fn day(&self) -> NaiveDate {
        self.starts_at.date()
    }

    pub fn is_for_client(&self, key: &NameKey) -> bool {
        self.client.key() == *key
    }
}

impl fmt::Display for Appointment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} | {} | {} ({})",
            self.id,
            self.starts_at.format("%Y-%m-%d %H:%M"),
            self.client.name,
            self.service.name,
            format_price(self.service.price),
        )
    }
}
