use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::domain::{Appointment, AppointmentId, Client, NameKey, Service};
use crate::error::StorageError;
use crate::ports::{Repository, Result};

/// In-process store for clients, services and appointments.
///
/// Each table is a [`DashMap`], so one instance can be shared between threads
/// without outside locking. Construct one per host (or per test) and pass it
/// to whoever needs it.
///
/// `delete_client` checks for appointments and then removes the client as two
/// separate steps; a booking that lands in between is not detected.
#[derive(Debug)]
pub struct InMemoryStore {
    clients: DashMap<NameKey, Client>,
    services: DashMap<NameKey, Service>,
    appointments: DashMap<AppointmentId, Appointment>,
    /// Next id to hand out; past `AppointmentId::MAX` once ids are used up.
    next_id: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
            services: DashMap::new(),
            appointments: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    // --- clients ---

    pub fn save_client(&self, client: Client) {
        let key = client.key();
        debug!(client = %key, "Saving client");
        self.clients.insert(key, client);
    }

    pub fn find_client(&self, name: &str) -> Option<Client> {
        self.clients
            .get(&NameKey::new(name))
            .map(|entry| entry.value().clone())
    }

    pub fn list_clients(&self) -> Vec<Client> {
        let mut clients: Vec<Client> = self.clients.iter().map(|e| e.value().clone()).collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.key().cmp(&b.key())));
        clients
    }

    pub fn client_has_appointments(&self, name: &str) -> bool {
        let key = NameKey::new(name);
        self.appointments
            .iter()
            .any(|entry| entry.value().is_for_client(&key))
    }

    /// Removes a client that has no appointments.
    pub fn delete_client(&self, name: &str) -> bool {
        if self.client_has_appointments(name) {
            warn!(client = %name, "Refusing to delete client with appointments");
            return false;
        }
        let removed = self.clients.remove(&NameKey::new(name)).is_some();
        if removed {
            info!(client = %name, "Client deleted");
        }
        removed
    }

    // --- services ---

    pub fn save_service(&self, service: Service) {
        let key = service.key();
        debug!(service = %key, price = %service.price, "Saving service");
        self.services.insert(key, service);
    }

    pub fn find_service(&self, name: &str) -> Option<Service> {
        self.services
            .get(&NameKey::new(name))
            .map(|entry| entry.value().clone())
    }

    pub fn list_services(&self) -> Vec<Service> {
        let mut services: Vec<Service> =
            self.services.iter().map(|e| e.value().clone()).collect();
        services.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.key().cmp(&b.key())));
        services
    }

    pub fn delete_service(&self, name: &str) -> bool {
        self.services.remove(&NameKey::new(name)).is_some()
    }

    // --- appointments ---

    /// Hands out a fresh id, or `None` once every id has been used.
    pub fn next_appointment_id(&self) -> Option<AppointmentId> {
        let last = u64::from(AppointmentId::MAX);
        self.next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                (next <= last).then_some(next + 1)
            })
            .ok()
            .and_then(|next| AppointmentId::try_from(next).ok())
    }

    pub fn save_appointment(&self, appointment: Appointment) {
        let id = appointment.id;
        self.next_id.fetch_max(u64::from(id) + 1, Ordering::SeqCst);
        debug!(appointment_id = id, starts_at = %appointment.starts_at, "Saving appointment");
        self.appointments.insert(id, appointment);
    }

    pub fn find_appointment(&self, id: AppointmentId) -> Option<Appointment> {
        self.appointments.get(&id).map(|entry| entry.value().clone())
    }

    pub fn delete_appointment(&self, id: AppointmentId) -> bool {
        self.appointments.remove(&id).is_some()
    }

    pub fn list_appointments(&self) -> Vec<Appointment> {
        self.collect_appointments(|_| true)
    }

    pub fn list_appointments_on_day(&self, day: NaiveDate) -> Vec<Appointment> {
        self.collect_appointments(|appointment| appointment.day() == day)
    }

    pub fn list_appointments_for_client(&self, name: &str) -> Vec<Appointment> {
        let key = NameKey::new(name);
        self.collect_appointments(|appointment| appointment.is_for_client(&key))
    }

    fn collect_appointments(&self, keep: impl Fn(&Appointment) -> bool) -> Vec<Appointment> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        appointments.sort_by_key(|appointment| (appointment.starts_at, appointment.id));
        appointments
    }
}

impl Repository for InMemoryStore {
    fn save_client(&self, client: Client) -> Result<()> {
        InMemoryStore::save_client(self, client);
        Ok(())
    }

    fn find_client(&self, name: &str) -> Result<Option<Client>> {
        Ok(InMemoryStore::find_client(self, name))
    }

    fn list_clients(&self) -> Result<Vec<Client>> {
        Ok(InMemoryStore::list_clients(self))
    }

    fn delete_client(&self, name: &str) -> Result<bool> {
        Ok(InMemoryStore::delete_client(self, name))
    }

    fn client_has_appointments(&self, name: &str) -> Result<bool> {
        Ok(InMemoryStore::client_has_appointments(self, name))
    }

    fn save_service(&self, service: Service) -> Result<()> {
        InMemoryStore::save_service(self, service);
        Ok(())
    }

    fn find_service(&self, name: &str) -> Result<Option<Service>> {
        Ok(InMemoryStore::find_service(self, name))
    }

    fn list_services(&self) -> Result<Vec<Service>> {
        Ok(InMemoryStore::list_services(self))
    }

    fn delete_service(&self, name: &str) -> Result<bool> {
        Ok(InMemoryStore::delete_service(self, name))
    }

    fn next_appointment_id(&self) -> Result<AppointmentId> {
        InMemoryStore::next_appointment_id(self).ok_or_else(|| {
            warn!("Appointment ids exhausted");
            StorageError::new("appointment ids exhausted")
        })
    }

    fn save_appointment(&self, appointment: Appointment) -> Result<()> {
        InMemoryStore::save_appointment(self, appointment);
        Ok(())
    }

    fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        Ok(InMemoryStore::find_appointment(self, id))
    }

    fn delete_appointment(&self, id: AppointmentId) -> Result<bool> {
        Ok(InMemoryStore::delete_appointment(self, id))
    }

    fn list_appointments(&self) -> Result<Vec<Appointment>> {
        Ok(InMemoryStore::list_appointments(self))
    }

    fn list_appointments_on_day(&self, day: NaiveDate) -> Result<Vec<Appointment>> {
        Ok(InMemoryStore::list_appointments_on_day(self, day))
    }

    fn list_appointments_for_client(&self, name: &str) -> Result<Vec<Appointment>> {
        Ok(InMemoryStore::list_appointments_for_client(self, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rust_decimal::Decimal;
    use std::thread;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .unwrap()
    }

    fn now() -> NaiveDateTime {
        at(22, 10, 0)
    }

    fn client(name: &str) -> Client {
        Client::new(name).unwrap()
    }

    fn service(name: &str, price: i64) -> Service {
        Service::new(name, Decimal::from(price)).unwrap()
    }

    fn book(store: &InMemoryStore, client_name: &str, starts_at: NaiveDateTime) -> AppointmentId {
        let id = store.next_appointment_id().unwrap();
        let appointment =
            Appointment::new(id, client(client_name), service("Corte", 3500), starts_at, now())
                .unwrap();
        store.save_appointment(appointment);
        id
    }

    #[test]
    fn test_save_client_is_case_insensitive_upsert() {
        let store = InMemoryStore::new();
        store.save_client(client("Mario").with_phone(Some("8888-1111".into())));
        store.save_client(client("MARIO").with_email(Some("mario@example.com".into())));

        let found = store.find_client("mario").unwrap();
        assert_eq!(found.name, "MARIO");
        assert_eq!(found.phone, None);
        assert_eq!(found.email.as_deref(), Some("mario@example.com"));
        assert_eq!(store.list_clients().len(), 1);
    }

    #[test]
    fn test_find_client_ignores_surrounding_whitespace() {
        let store = InMemoryStore::new();
        store.save_client(client("Juan Pérez"));
        assert!(store.find_client("  juan pérez ").is_some());
        assert!(store.find_client("Juan").is_none());
    }

    #[test]
    fn test_list_clients_ordered_by_name() {
        let store = InMemoryStore::new();
        for name in ["Pedro", "Ana", "Luis"] {
            store.save_client(client(name));
        }
        let names: Vec<String> = store.list_clients().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Ana", "Luis", "Pedro"]);
    }

    #[test]
    fn test_delete_client_refused_while_booked() {
        let store = InMemoryStore::new();
        store.save_client(client("Mario"));
        store.save_service(service("Barba", 2500));
        let appointment = Appointment::new(
            store.next_appointment_id().unwrap(),
            client("Mario"),
            service("Barba", 2500),
            at(22, 12, 0),
            now(),
        )
        .unwrap();
        store.save_appointment(appointment);

        assert!(store.client_has_appointments("MARIO"));
        assert!(!store.delete_client("Mario"));
        assert!(store.find_client("Mario").is_some());
    }

    #[test]
    fn test_delete_client_after_cancelling_appointments() {
        let store = InMemoryStore::new();
        store.save_client(client("Mario"));
        let id = book(&store, "mario", at(23, 9, 0));

        assert!(!store.delete_client("Mario"));
        assert!(store.delete_appointment(id));
        assert!(store.delete_client("Mario"));
        assert!(store.find_client("Mario").is_none());
        assert!(!store.delete_client("Mario"));
    }

    #[test]
    fn test_save_service_replaces_price() {
        let store = InMemoryStore::new();
        store.save_service(service("Afeitado", 2500));
        store.save_service(service("Afeitado", 3000));

        let found = store.find_service("afeitado").unwrap();
        assert_eq!(found.price, Decimal::from(3000));
        assert_eq!(store.list_services().len(), 1);
    }

    #[test]
    fn test_delete_service_ignores_appointments() {
        let store = InMemoryStore::new();
        store.save_service(service("Corte", 3500));
        book(&store, "Ana", at(23, 9, 0));

        assert!(store.delete_service("CORTE"));
        assert!(!store.delete_service("Corte"));
        assert_eq!(store.list_appointments().len(), 1);
    }

    #[test]
    fn test_list_services_ordered_by_name() {
        let store = InMemoryStore::new();
        store.save_service(service("Corte Niño", 3000));
        store.save_service(service("Afeitado Clásico", 2500));
        store.save_service(service("Barba", 2000));
        let names: Vec<String> = store.list_services().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Afeitado Clásico", "Barba", "Corte Niño"]);
    }

    #[test]
    fn test_list_appointments_sorted_regardless_of_insertion() {
        let store = InMemoryStore::new();
        book(&store, "Ana", at(25, 15, 0));
        book(&store, "Luis", at(22, 11, 0));
        book(&store, "Ana", at(23, 9, 30));

        let starts: Vec<NaiveDateTime> = store
            .list_appointments()
            .into_iter()
            .map(|a| a.starts_at)
            .collect();
        assert_eq!(starts, vec![at(22, 11, 0), at(23, 9, 30), at(25, 15, 0)]);
    }

    #[test]
    fn test_list_appointments_on_day_filters_by_calendar_date() {
        let store = InMemoryStore::new();
        book(&store, "Ana", at(23, 17, 45));
        book(&store, "Luis", at(22, 23, 59));
        book(&store, "Pedro", at(23, 0, 0));
        book(&store, "Ana", at(24, 8, 0));

        let day = NaiveDate::from_ymd_opt(2025, 10, 23).unwrap();
        let on_day: Vec<NaiveDateTime> = store
            .list_appointments_on_day(day)
            .into_iter()
            .map(|a| a.starts_at)
            .collect();
        assert_eq!(on_day, vec![at(23, 0, 0), at(23, 17, 45)]);
    }

    #[test]
    fn test_list_appointments_for_client_is_case_insensitive_and_sorted() {
        let store = InMemoryStore::new();
        book(&store, "Ana", at(26, 10, 0));
        book(&store, "Luis", at(23, 10, 0));
        book(&store, "ANA", at(22, 16, 0));

        let history = store.list_appointments_for_client("ana");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].starts_at, at(22, 16, 0));
        assert_eq!(history[1].starts_at, at(26, 10, 0));
        assert!(store.list_appointments_for_client("Pedro").is_empty());
    }

    #[test]
    fn test_same_slot_can_be_booked_twice() {
        let store = InMemoryStore::new();
        book(&store, "Ana", at(23, 10, 0));
        book(&store, "Luis", at(23, 10, 0));
        assert_eq!(store.list_appointments().len(), 2);
    }

    #[test]
    fn test_next_id_skips_explicitly_saved_ids() {
        let store = InMemoryStore::new();
        assert_eq!(store.next_appointment_id(), Some(1));

        let appointment = Appointment::restore(
            41,
            client("Ana"),
            service("Corte", 3500),
            at(23, 10, 0),
        );
        store.save_appointment(appointment);
        assert_eq!(store.next_appointment_id(), Some(42));
        assert!(store.find_appointment(41).is_some());
    }

    #[test]
    fn test_next_id_never_reuses_the_highest_id() {
        let store = InMemoryStore::new();
        let last = Appointment::restore(
            AppointmentId::MAX,
            client("Ana"),
            service("Corte", 3500),
            at(23, 10, 0),
        );
        store.save_appointment(last);

        assert_eq!(store.next_appointment_id(), None);
        assert_eq!(store.next_appointment_id(), None);
        let repository: &dyn Repository = &store;
        assert!(repository.next_appointment_id().is_err());
        assert!(store.find_appointment(AppointmentId::MAX).is_some());
    }

    #[test]
    fn test_next_id_hands_out_the_highest_id_once() {
        let store = InMemoryStore::new();
        let previous = Appointment::restore(
            AppointmentId::MAX - 1,
            client("Ana"),
            service("Corte", 3500),
            at(23, 10, 0),
        );
        store.save_appointment(previous);

        assert_eq!(store.next_appointment_id(), Some(AppointmentId::MAX));
        assert_eq!(store.next_appointment_id(), None);
    }

    #[test]
    fn test_save_appointment_upserts_by_id() {
        let store = InMemoryStore::new();
        let first = Appointment::restore(5, client("Ana"), service("Corte", 3500), at(23, 10, 0));
        let second = Appointment::restore(5, client("Luis"), service("Barba", 2000), at(24, 10, 0));
        store.save_appointment(first);
        store.save_appointment(second);

        let stored = store.find_appointment(5).unwrap();
        assert_eq!(stored.client.name, "Luis");
        assert_eq!(store.list_appointments().len(), 1);
    }

    #[test]
    fn test_concurrent_saves_of_distinct_keys_all_land() {
        let store = InMemoryStore::new();
        thread::scope(|scope| {
            for worker in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for n in 0..50 {
                        store.save_client(client(&format!("client-{worker}-{n}")));
                        let id = store.next_appointment_id().unwrap();
                        let appointment = Appointment::restore(
                            id,
                            client(&format!("client-{worker}-{n}")),
                            service("Corte", 3500),
                            at(23, 10, 0),
                        );
                        store.save_appointment(appointment);
                    }
                });
            }
        });

        assert_eq!(store.list_clients().len(), 400);
        assert_eq!(store.list_appointments().len(), 400);
    }

    #[test]
    fn test_store_usable_through_the_port() {
        let store = InMemoryStore::new();
        let repository: &dyn Repository = &store;
        repository.save_service(service("Corte", 3500)).unwrap();
        assert!(repository.find_service("corte").unwrap().is_some());
        assert!(repository.delete_service("corte").unwrap());
    }
}
