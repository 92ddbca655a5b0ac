use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use clinic_core::constants::{DATA_DIR_ENV, DATE_FORMAT, TIME_FORMAT};
use clinic_core::{
    resolve_data_dir, Appointment, BookingRequest, Clinic, CoreConfig, Prescription,
    PrescriptionRequest, Referral, ReferralRequest, Urgency,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic records system CLI")]
struct Cli {
    /// Directory holding the CSV data files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum UrgencyArg {
    Routine,
    Urgent,
}

impl From<UrgencyArg> for Urgency {
    fn from(arg: UrgencyArg) -> Self {
        match arg {
            UrgencyArg::Routine => Urgency::Routine,
            UrgencyArg::Urgent => Urgency::Urgent,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show record counts per entity type
    Summary,
    /// List records whose references do not resolve
    Integrity,
    /// List all patients
    Patients,
    /// List free slots for a clinician and facility
    Slots {
        clinician_id: String,
        facility_id: String,
        /// Date (YYYY-MM-DD)
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },
    /// Book an appointment
    Book {
        patient_id: String,
        clinician_id: String,
        facility_id: String,
        /// Date (YYYY-MM-DD)
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
        /// Start time (HH:MM)
        #[arg(value_parser = parse_time)]
        time: NaiveTime,
        #[arg(long, default_value_t = 15)]
        duration: u32,
        #[arg(long = "type", default_value = "Consultation")]
        appointment_type: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Move an appointment to a new date and time
    Reschedule {
        appointment_id: String,
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
        #[arg(value_parser = parse_time)]
        time: NaiveTime,
    },
    /// Cancel an appointment
    Cancel {
        appointment_id: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Mark an appointment as completed
    Complete {
        appointment_id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Appointments starting in the next 24 hours
    Reminders,
    /// Issue a prescription
    Prescribe {
        patient_id: String,
        clinician_id: String,
        medication: String,
        dosage: String,
        frequency: String,
        /// Duration in days
        days: u32,
        quantity: u32,
        #[arg(long, default_value = "Community Pharmacy")]
        pharmacy: String,
        #[arg(long)]
        appointment_id: Option<String>,
        #[arg(long)]
        instructions: Option<String>,
    },
    /// Record collection of a prescription
    Collect { prescription_id: String },
    /// Prescriptions expiring within the alert window
    Expiring,
    /// Renew a prescription for a new duration
    Renew { prescription_id: String, days: u32 },
    /// Refer a patient
    Refer {
        patient_id: String,
        referring_clinician_id: String,
        referred_to_clinician_id: String,
        referring_facility_id: String,
        referred_to_facility_id: String,
        reason: String,
        #[arg(long, value_enum, default_value_t = UrgencyArg::Routine)]
        urgency: UrgencyArg,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        investigations: Option<String>,
    },
    /// Start processing a new referral
    StartReferral { referral_id: String },
    /// Complete a referral in progress
    CompleteReferral {
        referral_id: String,
        #[arg(long)]
        outcome: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Raise the urgency of a referral
    Escalate {
        referral_id: String,
        #[arg(value_enum)]
        urgency: UrgencyArg,
        reason: String,
    },
    /// Open referrals past the overdue threshold
    Overdue,
    /// Open referrals by urgency, then age
    Triage,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, TIME_FORMAT).map_err(|e| format!("expected HH:MM: {e}"))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("clinic=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    run(cli).inspect_err(|e| tracing::error!("clinic command failed: {:#}", e))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = resolve_data_dir(cli.data_dir, std::env::var(DATA_DIR_ENV).ok());
    let cfg = Arc::new(CoreConfig::new(data_dir)?);
    tracing::debug!("using data directory {}", cfg.data_dir().display());
    let mut clinic = Clinic::open(cfg.clone())
        .with_context(|| format!("failed to open clinic data in {}", cfg.data_dir().display()))?;

    match cli.command {
        Some(Commands::Summary) => {
            println!("{}", clinic.repositories_mut().summary()?);
        }
        Some(Commands::Integrity) => {
            let report = clinic.repositories_mut().integrity_report()?;
            if report.is_clean() {
                println!("All references resolve.");
            } else {
                print_ids("Orphaned appointments", &report.orphaned_appointments);
                print_ids("Orphaned prescriptions", &report.orphaned_prescriptions);
                print_ids("Orphaned referrals", &report.orphaned_referrals);
                print_ids("Orphaned staff", &report.orphaned_staff);
            }
        }
        Some(Commands::Patients) => {
            let patients = clinic.patients().list()?;
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in patients {
                println!(
                    "ID: {}, Name: {}, DOB: {}, NHS: {}",
                    patient.id,
                    patient.full_name(),
                    patient.date_of_birth,
                    patient.national_id
                );
            }
        }
        Some(Commands::Slots {
            clinician_id,
            facility_id,
            date,
        }) => {
            let slots = clinic
                .appointments()
                .available_slots(&clinician_id, &facility_id, date)?;
            if slots.is_empty() {
                println!("No free slots on {date}.");
            }
            for slot in slots {
                println!("{slot}");
            }
        }
        Some(Commands::Book {
            patient_id,
            clinician_id,
            facility_id,
            date,
            time,
            duration,
            appointment_type,
            reason,
        }) => {
            let appointment = clinic.appointments().book(BookingRequest {
                patient_id,
                clinician_id,
                facility_id,
                date,
                start_time: time,
                duration_minutes: duration,
                appointment_type,
                reason,
            })?;
            println!("Booked {}", describe_appointment(&appointment));
        }
        Some(Commands::Reschedule {
            appointment_id,
            date,
            time,
        }) => {
            let appointment = clinic
                .appointments()
                .reschedule(&appointment_id, date, time)?;
            println!("Rescheduled {}", describe_appointment(&appointment));
        }
        Some(Commands::Cancel {
            appointment_id,
            reason,
        }) => {
            let appointment = clinic.appointments().cancel(&appointment_id, &reason)?;
            println!("Cancelled {}", describe_appointment(&appointment));
        }
        Some(Commands::Complete {
            appointment_id,
            notes,
        }) => {
            let appointment = clinic
                .appointments()
                .complete(&appointment_id, notes.as_deref())?;
            println!("Completed {}", describe_appointment(&appointment));
        }
        Some(Commands::Reminders) => {
            let due = clinic.appointments().reminders()?;
            if due.is_empty() {
                println!("No appointments in the next 24 hours.");
            }
            for appointment in due {
                println!("{}", describe_appointment(&appointment));
            }
        }
        Some(Commands::Prescribe {
            patient_id,
            clinician_id,
            medication,
            dosage,
            frequency,
            days,
            quantity,
            pharmacy,
            appointment_id,
            instructions,
        }) => {
            let prescription = clinic.prescriptions().prescribe(PrescriptionRequest {
                patient_id,
                clinician_id,
                appointment_id,
                medication_name: medication,
                dosage,
                frequency,
                duration_days: days,
                quantity,
                instructions,
                pharmacy_name: pharmacy,
            })?;
            println!("Issued {}", describe_prescription(&prescription));
        }
        Some(Commands::Collect { prescription_id }) => {
            let prescription = clinic.prescriptions().collect(&prescription_id)?;
            println!("Collected {}", describe_prescription(&prescription));
        }
        Some(Commands::Expiring) => {
            let expiring = clinic.prescriptions().expiring_soon()?;
            if expiring.is_empty() {
                println!("No prescriptions expiring soon.");
            }
            for prescription in expiring {
                println!("{}", describe_prescription(&prescription));
            }
        }
        Some(Commands::Renew {
            prescription_id,
            days,
        }) => {
            let renewal = clinic.prescriptions().renew(&prescription_id, days)?;
            println!("Renewed as {}", describe_prescription(&renewal));
        }
        Some(Commands::Refer {
            patient_id,
            referring_clinician_id,
            referred_to_clinician_id,
            referring_facility_id,
            referred_to_facility_id,
            reason,
            urgency,
            summary,
            investigations,
        }) => {
            let referral = clinic.referrals().refer(ReferralRequest {
                patient_id,
                referring_clinician_id,
                referred_to_clinician_id,
                referring_facility_id,
                referred_to_facility_id,
                urgency: urgency.into(),
                reason,
                clinical_summary: summary,
                requested_investigations: investigations,
            })?;
            println!("Created {}", describe_referral(&referral));
        }
        Some(Commands::StartReferral { referral_id }) => {
            let referral = clinic.referrals().start_processing(&referral_id)?;
            println!("Started {}", describe_referral(&referral));
        }
        Some(Commands::CompleteReferral {
            referral_id,
            outcome,
            notes,
        }) => {
            let referral =
                clinic
                    .referrals()
                    .complete(&referral_id, outcome.as_deref(), notes.as_deref())?;
            println!("Completed {}", describe_referral(&referral));
        }
        Some(Commands::Escalate {
            referral_id,
            urgency,
            reason,
        }) => {
            let referral = clinic
                .referrals()
                .escalate(&referral_id, urgency.into(), &reason)?;
            println!("Escalated {}", describe_referral(&referral));
        }
        Some(Commands::Overdue) => {
            let overdue = clinic.referrals().overdue()?;
            if overdue.is_empty() {
                println!("No overdue referrals.");
            }
            for referral in overdue {
                println!("{}", describe_referral(&referral));
            }
        }
        Some(Commands::Triage) => {
            for referral in clinic.referrals().triage_queue()? {
                println!("{}", describe_referral(&referral));
            }
        }
        None => {
            println!("Use 'clinic --help' for commands");
        }
    }

    Ok(())
}

fn print_ids(label: &str, ids: &[String]) {
    if !ids.is_empty() {
        println!("{label}: {}", ids.join(", "));
    }
}

fn describe_appointment(a: &Appointment) -> String {
    format!(
        "{} [{}] {} {}-{} patient {} with {} at {}",
        a.id,
        a.status,
        a.date,
        a.start_time.format(TIME_FORMAT),
        a.end_time().format(TIME_FORMAT),
        a.patient_id,
        a.clinician_id,
        a.facility_id
    )
}

fn describe_prescription(p: &Prescription) -> String {
    let expiry = p
        .expiry_date()
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".into());
    format!(
        "{} [{}] {} {} {} for patient {}, expires {}",
        p.id, p.status, p.medication_name, p.dosage, p.frequency, p.patient_id, expiry
    )
}

fn describe_referral(r: &Referral) -> String {
    format!(
        "{} [{} / {}] patient {} {} -> {} on {}: {}",
        r.id,
        r.status,
        r.urgency,
        r.patient_id,
        r.referring_clinician_id,
        r.referred_to_clinician_id,
        r.referral_date,
        r.reason
    )
}
