use barbershop_core::domain::{AppointmentId, Client, Service, ServiceChanges};
use barbershop_core::ports::{Repository, SystemClock};
use barbershop_core::utils::{format_price, parse_date, parse_date_time, parse_price};
use barbershop_core::{BookingService, ClientRemoval};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use sqlite_adapter::SqliteRepository;
use std::error::Error;
use tracing::warn;

/// Front-desk tool for a barbershop: clients, price list and appointments
#[derive(Parser, Debug)]
#[command(name = "barber-cli")]
#[command(about = "Manages barbershop clients, services and appointments in a SQLite file")]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long = "db", env = "BARBER_DB", default_value = "barbershop.db")]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register, look up and remove clients
    #[command(subcommand)]
    Client(ClientCommand),
    /// Maintain the price list
    #[command(subcommand)]
    Service(ServiceCommand),
    /// Book, list and cancel appointments
    #[command(subcommand)]
    Appointment(AppointmentCommand),
}

#[derive(Args, Debug)]
struct ClientDetails {
    /// Client name (matched case-insensitively)
    name: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// National identity number
    #[arg(long = "national-id")]
    national_id: Option<String>,
}

impl ClientDetails {
    fn into_client(self) -> Result<Client, Box<dyn Error>> {
        Ok(Client::new(self.name)?
            .with_phone(self.phone)
            .with_email(self.email)
            .with_national_id(self.national_id))
    }
}

#[derive(Subcommand, Debug)]
enum ClientCommand {
    /// Register a client
    Add {
        #[command(flatten)]
        details: ClientDetails,
        /// Overwrite the stored details if the client already exists
        #[arg(long)]
        update: bool,
    },
    /// Show one client
    Find { name: String },
    /// List every client
    List,
    /// Show a client's appointments
    History { name: String },
    /// Remove a client without appointments
    Remove { name: String },
}

#[derive(Subcommand, Debug)]
enum ServiceCommand {
    /// Add a service, or replace one with the same name
    Add {
        name: String,
        #[arg(value_parser = price_arg)]
        price: Decimal,
        #[arg(long)]
        description: Option<String>,
        /// Duration in minutes
        #[arg(long)]
        duration: Option<u16>,
        /// Store the service as inactive
        #[arg(long)]
        inactive: bool,
    },
    /// List the price list
    List,
    /// Change the price of a service
    SetPrice {
        name: String,
        #[arg(value_parser = price_arg)]
        price: Decimal,
    },
    /// Edit a service; omitted fields keep their current value
    Edit {
        name: String,
        #[command(flatten)]
        edit: ServiceEdit,
    },
    /// Remove a service from the price list
    Remove { name: String },
}

#[derive(Args, Debug)]
struct ServiceEdit {
    #[arg(long = "rename")]
    new_name: Option<String>,
    #[arg(long, value_parser = price_arg)]
    price: Option<Decimal>,
    #[arg(long, conflicts_with = "clear_description")]
    description: Option<String>,
    /// Remove the stored description
    #[arg(long)]
    clear_description: bool,
    #[arg(long, conflicts_with = "clear_duration")]
    duration: Option<u16>,
    /// Remove the stored duration
    #[arg(long)]
    clear_duration: bool,
    #[arg(long, conflicts_with = "inactive")]
    active: bool,
    #[arg(long)]
    inactive: bool,
}

impl ServiceEdit {
    fn apply_to(self, current: Service) -> ServiceChanges {
        let description = if self.clear_description {
            None
        } else {
            self.description.or(current.description)
        };
        let duration_minutes = if self.clear_duration {
            None
        } else {
            self.duration.or(current.duration_minutes)
        };
        ServiceChanges {
            name: self.new_name.unwrap_or(current.name),
            price: self.price.unwrap_or(current.price),
            description,
            duration_minutes,
            is_active: if self.active || self.inactive {
                self.active
            } else {
                current.is_active
            },
        }
    }
}

#[derive(Subcommand, Debug)]
enum AppointmentCommand {
    /// Book a service for a client
    Book {
        #[command(flatten)]
        client: ClientDetails,
        /// Service name
        #[arg(long)]
        service: String,
        /// Start time, e.g. "2025-10-24 10:00"
        #[arg(long, value_parser = date_time_arg)]
        at: NaiveDateTime,
    },
    /// List appointments, optionally for one day or one client
    List {
        #[arg(long, value_parser = date_arg, conflicts_with = "client")]
        day: Option<NaiveDate>,
        #[arg(long)]
        client: Option<String>,
    },
    /// Cancel an appointment by id
    Cancel { id: AppointmentId },
}

fn price_arg(value: &str) -> Result<Decimal, String> {
    parse_price(value).ok_or_else(|| format!("invalid price: {value}"))
}

fn date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("invalid date: {value}"))
}

fn date_time_arg(value: &str) -> Result<NaiveDateTime, String> {
    parse_date_time(value).ok_or_else(|| format!("invalid date and time: {value}"))
}

fn setup_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn describe_service(service: &Service) -> String {
    let mut line = format!("{} | {}", service.name, format_price(service.price));
    if let Some(minutes) = service.duration_minutes {
        line.push_str(&format!(" | {minutes} min"));
    }
    if let Some(description) = &service.description {
        line.push_str(&format!(" | {description}"));
    }
    if !service.is_active {
        line.push_str(" | inactive");
    }
    line
}

fn run_client(desk: &BookingService, command: ClientCommand) -> Result<(), Box<dyn Error>> {
    match command {
        ClientCommand::Add { details, update } => {
            let client = details.into_client()?;
            if update {
                desk.update_client(client.clone())?;
                println!("Updated {}", client.summary());
            } else {
                let stored = desk.register_client(client)?;
                println!("Registered {}", stored.summary());
            }
        }
        ClientCommand::Find { name } => match desk.find_client(&name)? {
            Some(client) => println!("{}", client.summary()),
            None => return Err(format!("client not found: {}", name.trim()).into()),
        },
        ClientCommand::List => {
            for client in desk.clients()? {
                println!("{}", client.summary());
            }
        }
        ClientCommand::History { name } => {
            for appointment in desk.client_history(&name)? {
                println!("{appointment}");
            }
        }
        ClientCommand::Remove { name } => match desk.remove_client(&name)? {
            ClientRemoval::Removed => println!("Removed client {}", name.trim()),
            ClientRemoval::HasAppointments => {
                return Err(format!("client {} still has appointments", name.trim()).into())
            }
            ClientRemoval::NotFound => {
                return Err(format!("client not found: {}", name.trim()).into())
            }
        },
    }
    Ok(())
}

fn run_service(desk: &BookingService, command: ServiceCommand) -> Result<(), Box<dyn Error>> {
    match command {
        ServiceCommand::Add {
            name,
            price,
            description,
            duration,
            inactive,
        } => {
            let service = Service::new(name, price)?
                .with_description(description)
                .with_duration(duration)
                .with_active(!inactive);
            if let Err(e) = service.check_catalog_limits() {
                warn!(service = %service.name, error = %e, "Service is outside catalog limits");
            }
            desk.add_service(service.clone())?;
            println!("Saved {}", describe_service(&service));
        }
        ServiceCommand::List => {
            for service in desk.services()? {
                println!("{}", describe_service(&service));
            }
        }
        ServiceCommand::SetPrice { name, price } => {
            let service = desk.change_service_price(&name, price)?;
            println!("Saved {}", describe_service(&service));
        }
        ServiceCommand::Edit { name, edit } => {
            let current = desk
                .find_service(&name)?
                .ok_or_else(|| format!("unknown service: {}", name.trim()))?;
            let service = desk.edit_service(&name, edit.apply_to(current))?;
            println!("Saved {}", describe_service(&service));
        }
        ServiceCommand::Remove { name } => {
            if !desk.remove_service(&name)? {
                return Err(format!("unknown service: {}", name.trim()).into());
            }
            println!("Removed service {}", name.trim());
        }
    }
    Ok(())
}

fn run_appointment(
    desk: &BookingService,
    command: AppointmentCommand,
) -> Result<(), Box<dyn Error>> {
    match command {
        AppointmentCommand::Book {
            client,
            service,
            at,
        } => {
            let appointment = desk.book_appointment(client.into_client()?, &service, at)?;
            println!("Booked {appointment}");
        }
        AppointmentCommand::List { day, client } => {
            let appointments = match (day, client) {
                (Some(day), _) => desk.appointments_on(day)?,
                (None, Some(name)) => desk.client_history(&name)?,
                (None, None) => desk.appointments()?,
            };
            for appointment in appointments {
                println!("{appointment}");
            }
        }
        AppointmentCommand::Cancel { id } => {
            if !desk.cancel_appointment(id)? {
                return Err(format!("appointment not found: #{id}").into());
            }
            println!("Cancelled appointment #{id}");
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let repository: Box<dyn Repository> = Box::new(SqliteRepository::open(cli.db)?);
    let desk = BookingService::new(repository, Box::new(SystemClock));

    match cli.command {
        Command::Client(command) => run_client(&desk, command),
        Command::Service(command) => run_service(&desk, command),
        Command::Appointment(command) => run_appointment(&desk, command),
    }
}

fn main() {
    setup_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
