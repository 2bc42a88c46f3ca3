use barbershop_core::domain::{Appointment, AppointmentId, Client, NameKey, Service};
use barbershop_core::error::StorageError;
use barbershop_core::ports::{Repository, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, info, warn};

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS clients (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name_key    TEXT NOT NULL UNIQUE,
        name        TEXT NOT NULL,
        phone       TEXT,
        email       TEXT,
        national_id TEXT
    );

    CREATE TABLE IF NOT EXISTS services (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        name_key         TEXT NOT NULL UNIQUE,
        name             TEXT NOT NULL,
        price            TEXT NOT NULL,
        description      TEXT,
        duration_minutes INTEGER,
        is_active        INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS appointments (
        id                       INTEGER PRIMARY KEY,
        client_key               TEXT NOT NULL,
        client_name              TEXT NOT NULL,
        client_phone             TEXT,
        client_email             TEXT,
        client_national_id       TEXT,
        service_name             TEXT NOT NULL,
        service_price            TEXT NOT NULL,
        service_description      TEXT,
        service_duration_minutes INTEGER,
        service_is_active        INTEGER NOT NULL,
        starts_at                TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS appointments_by_start ON appointments (starts_at);
    CREATE INDEX IF NOT EXISTS appointments_by_client ON appointments (client_key);

    CREATE TABLE IF NOT EXISTS counters (
        name  TEXT PRIMARY KEY,
        value INTEGER NOT NULL
    );

    INSERT OR IGNORE INTO counters (name, value) VALUES ('appointment', 0);
"#;

const APPOINTMENT_COLUMNS: &str = "id, client_name, client_phone, client_email, \
     client_national_id, service_name, service_price, service_description, \
     service_duration_minutes, service_is_active, starts_at";

trait StorageResult<T> {
    fn storage(self) -> Result<T>;
}

impl<T> StorageResult<T> for rusqlite::Result<T> {
    fn storage(self) -> Result<T> {
        self.map_err(StorageError::new)
    }
}

/// SQLite implementation of the Repository trait
///
/// Appointments keep their own copy of the client and service columns, so a
/// booking reads back exactly as it was made even after the service is
/// repriced or removed.
pub struct SqliteRepository {
    db_path: String,
}

impl SqliteRepository {
    /// Opens the database at `db_path`, creating any missing tables
    pub fn open(db_path: impl Into<String>) -> Result<Self> {
        let repository = Self {
            db_path: db_path.into(),
        };
        repository.connect()?.execute_batch(SCHEMA).storage()?;
        info!(path = %repository.db_path, "SQLite schema ready");
        Ok(repository)
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        debug!(path = %self.db_path, "Opening SQLite connection");
        Connection::open(&self.db_path).storage()
    }

    fn query_appointments<P: Params>(&self, filter: &str, params: P) -> Result<Vec<Appointment>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments {filter} ORDER BY starts_at ASC, id ASC"
        );
        let mut stmt = conn.prepare(&sql).storage()?;
        let appointments = stmt
            .query_map(params, appointment_from_row)
            .storage()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .storage()?;
        Ok(appointments)
    }
}

fn format_date_time(value: NaiveDateTime) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

fn date_time_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let text: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&text, DATE_TIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn client_from_row(row: &Row) -> rusqlite::Result<Client> {
    Ok(Client {
        name: row.get(0)?,
        phone: row.get(1)?,
        email: row.get(2)?,
        national_id: row.get(3)?,
    })
}

fn service_from_row(row: &Row) -> rusqlite::Result<Service> {
    Ok(Service {
        name: row.get(0)?,
        price: decimal_column(row, 1)?,
        description: row.get(2)?,
        duration_minutes: row.get(3)?,
        is_active: row.get(4)?,
    })
}

fn appointment_from_row(row: &Row) -> rusqlite::Result<Appointment> {
    let client = Client {
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        national_id: row.get(4)?,
    };
    let service = Service {
        name: row.get(5)?,
        price: decimal_column(row, 6)?,
        description: row.get(7)?,
        duration_minutes: row.get(8)?,
        is_active: row.get(9)?,
    };
    Ok(Appointment::restore(
        row.get(0)?,
        client,
        service,
        date_time_column(row, 10)?,
    ))
}

impl Repository for SqliteRepository {
    fn save_client(&self, client: Client) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO clients (name_key, name, phone, email, national_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(name_key) DO UPDATE SET
                name = excluded.name,
                phone = excluded.phone,
                email = excluded.email,
                national_id = excluded.national_id
            "#,
            params![
                client.key().as_str(),
                client.name,
                client.phone,
                client.email,
                client.national_id
            ],
        )
        .storage()?;
        Ok(())
    }

    fn find_client(&self, name: &str) -> Result<Option<Client>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT name, phone, email, national_id FROM clients WHERE name_key = ?1",
            [NameKey::new(name).as_str()],
            client_from_row,
        )
        .optional()
        .storage()
    }

    fn list_clients(&self) -> Result<Vec<Client>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT name, phone, email, national_id FROM clients ORDER BY name, name_key")
            .storage()?;
        let clients = stmt
            .query_map([], client_from_row)
            .storage()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .storage()?;
        Ok(clients)
    }

    fn delete_client(&self, name: &str) -> Result<bool> {
        let key = NameKey::new(name);
        let mut conn = self.connect()?;
        let tx = conn.transaction().storage()?;

        let booked: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM appointments WHERE client_key = ?1)",
                [key.as_str()],
                |row| row.get(0),
            )
            .storage()?;
        if booked {
            warn!(client = %name, "Refusing to delete client with appointments");
            return Ok(false);
        }

        let removed = tx
            .execute("DELETE FROM clients WHERE name_key = ?1", [key.as_str()])
            .storage()?;
        tx.commit().storage()?;
        Ok(removed > 0)
    }

    fn client_has_appointments(&self, name: &str) -> Result<bool> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM appointments WHERE client_key = ?1)",
            [NameKey::new(name).as_str()],
            |row| row.get(0),
        )
        .storage()
    }

    fn save_service(&self, service: Service) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO services (name_key, name, price, description, duration_minutes, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(name_key) DO UPDATE SET
                name = excluded.name,
                price = excluded.price,
                description = excluded.description,
                duration_minutes = excluded.duration_minutes,
                is_active = excluded.is_active
            "#,
            params![
                service.key().as_str(),
                service.name,
                service.price.to_string(),
                service.description,
                service.duration_minutes,
                service.is_active
            ],
        )
        .storage()?;
        Ok(())
    }

    fn find_service(&self, name: &str) -> Result<Option<Service>> {
        let conn = self.connect()?;
        conn.query_row(
            r#"
            SELECT name, price, description, duration_minutes, is_active
            FROM services WHERE name_key = ?1
            "#,
            [NameKey::new(name).as_str()],
            service_from_row,
        )
        .optional()
        .storage()
    }

    fn list_services(&self) -> Result<Vec<Service>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT name, price, description, duration_minutes, is_active
                FROM services ORDER BY name, name_key
                "#,
            )
            .storage()?;
        let services = stmt
            .query_map([], service_from_row)
            .storage()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .storage()?;
        Ok(services)
    }

    fn delete_service(&self, name: &str) -> Result<bool> {
        let conn = self.connect()?;
        let removed = conn
            .execute(
                "DELETE FROM services WHERE name_key = ?1",
                [NameKey::new(name).as_str()],
            )
            .storage()?;
        Ok(removed > 0)
    }

    fn next_appointment_id(&self) -> Result<AppointmentId> {
        let conn = self.connect()?;
        conn.query_row(
            "UPDATE counters SET value = value + 1 WHERE name = 'appointment' RETURNING value",
            [],
            |row| row.get(0),
        )
        .storage()
    }

    fn save_appointment(&self, appointment: Appointment) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction().storage()?;
        let Appointment {
            id,
            client,
            service,
            starts_at,
        } = appointment;

        tx.execute(
            r#"
            INSERT INTO appointments (
                id, client_key, client_name, client_phone, client_email, client_national_id,
                service_name, service_price, service_description, service_duration_minutes,
                service_is_active, starts_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                client_key = excluded.client_key,
                client_name = excluded.client_name,
                client_phone = excluded.client_phone,
                client_email = excluded.client_email,
                client_national_id = excluded.client_national_id,
                service_name = excluded.service_name,
                service_price = excluded.service_price,
                service_description = excluded.service_description,
                service_duration_minutes = excluded.service_duration_minutes,
                service_is_active = excluded.service_is_active,
                starts_at = excluded.starts_at
            "#,
            params![
                id,
                client.key().as_str(),
                client.name,
                client.phone,
                client.email,
                client.national_id,
                service.name,
                service.price.to_string(),
                service.description,
                service.duration_minutes,
                service.is_active,
                format_date_time(starts_at)
            ],
        )
        .storage()?;

        tx.execute(
            "UPDATE counters SET value = MAX(value, ?1) WHERE name = 'appointment'",
            [id],
        )
        .storage()?;
        tx.commit().storage()?;
        debug!(appointment_id = id, "Appointment saved");
        Ok(())
    }

    fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        let conn = self.connect()?;
        conn.query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            [id],
            appointment_from_row,
        )
        .optional()
        .storage()
    }

    fn delete_appointment(&self, id: AppointmentId) -> Result<bool> {
        let conn = self.connect()?;
        let removed = conn
            .execute("DELETE FROM appointments WHERE id = ?1", [id])
            .storage()?;
        Ok(removed > 0)
    }

    fn list_appointments(&self) -> Result<Vec<Appointment>> {
        self.query_appointments("", [])
    }

    fn list_appointments_on_day(&self, day: NaiveDate) -> Result<Vec<Appointment>> {
        self.query_appointments(
            "WHERE substr(starts_at, 1, 10) = ?1",
            [day.format("%Y-%m-%d").to_string()],
        )
    }

    fn list_appointments_for_client(&self, name: &str) -> Result<Vec<Appointment>> {
        self.query_appointments(
            "WHERE client_key = ?1",
            [NameKey::new(name).as_str().to_string()],
        )
    }
}
