//! Entity model.
//!
//! Each record type is split into a domain struct (typed fields, derived values, validity
//! predicate) and a private CSV row struct (one `Option` per column, in column order).
//! The [`Record`] trait ties the two together so the generic [`RecordStore`] can load and
//! flush any of the seven entity types.
//!
//! [`RecordStore`]: crate::store::RecordStore

use crate::constants::{
    APPOINTMENTS_FILENAME, CLINICIANS_FILENAME, FACILITIES_FILENAME, PATIENTS_FILENAME,
    PRESCRIPTIONS_FILENAME, REFERRALS_FILENAME, STAFF_FILENAME,
};
use crate::ClinicResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

pub mod appointment;
pub mod clinician;
pub mod facility;
pub mod patient;
pub mod prescription;
pub mod referral;
pub mod staff;

pub use appointment::{Appointment, AppointmentStatus};
pub use clinician::Clinician;
pub use facility::{Facility, FacilityType};
pub use patient::Patient;
pub use prescription::{Prescription, PrescriptionStatus};
pub use referral::{Referral, ReferralStatus, Urgency};
pub use staff::Staff;

/// Tag naming one of the seven record types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Patient,
    Clinician,
    Facility,
    Appointment,
    Prescription,
    Referral,
    Staff,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Patient,
        EntityKind::Clinician,
        EntityKind::Facility,
        EntityKind::Appointment,
        EntityKind::Prescription,
        EntityKind::Referral,
        EntityKind::Staff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Patient => "Patient",
            EntityKind::Clinician => "Clinician",
            EntityKind::Facility => "Facility",
            EntityKind::Appointment => "Appointment",
            EntityKind::Prescription => "Prescription",
            EntityKind::Referral => "Referral",
            EntityKind::Staff => "Staff",
        }
    }

    /// Name of the CSV file backing this record type inside the data directory.
    pub fn file_name(self) -> &'static str {
        match self {
            EntityKind::Patient => PATIENTS_FILENAME,
            EntityKind::Clinician => CLINICIANS_FILENAME,
            EntityKind::Facility => FACILITIES_FILENAME,
            EntityKind::Appointment => APPOINTMENTS_FILENAME,
            EntityKind::Prescription => PRESCRIPTIONS_FILENAME,
            EntityKind::Referral => REFERRALS_FILENAME,
            EntityKind::Staff => STAFF_FILENAME,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record type that can be persisted by a [`RecordStore`](crate::store::RecordStore).
pub trait Record: Clone + fmt::Debug {
    /// CSV row representation, one field per column in [`Record::HEADER`] order.
    type Row: Serialize + DeserializeOwned;

    const KIND: EntityKind;

    /// Column names written as the first line of the file.
    const HEADER: &'static [&'static str];

    fn id(&self) -> &str;

    /// Checks required fields, references and positive numerics.
    fn validate(&self) -> ClinicResult<()>;

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn to_row(&self) -> Self::Row;

    /// Builds the entity from a parsed row.
    ///
    /// Returns `None` when a required column is blank; such rows are excluded from the
    /// store the same way as rows failing [`Record::validate`].
    fn from_row(row: Self::Row) -> Option<Self>;
}

/// Joins first and last name, skipping blank parts.
pub(crate) fn display_name(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole years elapsed from `from` to `to`, counting a year only once its anniversary passed.
pub(crate) fn whole_years_between(from: chrono::NaiveDate, to: chrono::NaiveDate) -> u32 {
    use chrono::Datelike;

    if to < from {
        return 0;
    }
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}
