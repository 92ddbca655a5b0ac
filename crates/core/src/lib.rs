//! # Clinic Core
//!
//! Core business logic for the clinic records system.
//!
//! This crate holds the entity model and the rules that govern it:
//! - Patients, clinicians, facilities, staff, appointments, prescriptions and referrals
//! - One CSV file per entity type under the configured data directory
//! - Appointment scheduling with conflict detection and free-slot enumeration
//! - The prescription and referral state machines
//!
//! **No presentation concerns**: argument parsing, output formatting and subscriber setup
//! belong in `clinic-cli`.

pub mod clinic;
pub mod clock;
pub mod config;
pub mod constants;
pub mod csv_format;
pub mod error;
pub mod ids;
pub mod models;
pub mod repositories;
pub mod scheduling;
pub mod services;
pub mod store;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use clinic::Clinic;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{resolve_data_dir, CoreConfig};
pub use error::{ClinicError, ClinicResult, ErrorKind};
pub use models::{
    Appointment, AppointmentStatus, Clinician, EntityKind, Facility, FacilityType, Patient,
    Prescription, PrescriptionStatus, Record, Referral, ReferralStatus, Staff, Urgency,
};
pub use repositories::{DataSummary, IntegrityReport, Repositories};
pub use scheduling::{TimeSlot, WorkingHours};
pub use services::{
    AppointmentStatistics, BookingRequest, PatientRecord, PrescriptionRequest,
    PrescriptionStatistics, ReferralRequest, ReferralStatistics, ReferralWorkflow,
};
pub use store::RecordStore;
