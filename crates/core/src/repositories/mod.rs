//! Repository management.
//!
//! [`Repositories`] groups the seven record stores of one data directory. It is owned by
//! the `Clinic` and borrowed mutably by the services, so only one operation can touch the
//! stores at a time.
//!
//! ## Key Components
//!
//! - **Lifecycle**: `open`, `reload_all` and `flush_all` act on every store at once
//! - **Reporting**: `summary` counts records per type; `integrity_report` lists records
//!   whose references no longer resolve

use crate::config::CoreConfig;
use crate::models::{
    Appointment, Clinician, EntityKind, Facility, Patient, Prescription, Referral, Staff,
};
use crate::store::RecordStore;
use crate::ClinicResult;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug)]
pub struct Repositories {
    pub patients: RecordStore<Patient>,
    pub clinicians: RecordStore<Clinician>,
    pub facilities: RecordStore<Facility>,
    pub appointments: RecordStore<Appointment>,
    pub prescriptions: RecordStore<Prescription>,
    pub referrals: RecordStore<Referral>,
    pub staff: RecordStore<Staff>,
}

impl Repositories {
    /// Opens and loads every store under the configured data directory.
    ///
    /// Missing files are created with a header row only.
    pub fn open(cfg: &CoreConfig) -> ClinicResult<Self> {
        let repos = Self {
            patients: RecordStore::open(cfg.store_path(EntityKind::Patient))?,
            clinicians: RecordStore::open(cfg.store_path(EntityKind::Clinician))?,
            facilities: RecordStore::open(cfg.store_path(EntityKind::Facility))?,
            appointments: RecordStore::open(cfg.store_path(EntityKind::Appointment))?,
            prescriptions: RecordStore::open(cfg.store_path(EntityKind::Prescription))?,
            referrals: RecordStore::open(cfg.store_path(EntityKind::Referral))?,
            staff: RecordStore::open(cfg.store_path(EntityKind::Staff))?,
        };

        tracing::info!("opened clinic data in {}", cfg.data_dir().display());
        Ok(repos)
    }

    pub fn reload_all(&mut self) -> ClinicResult<()> {
        self.patients.reload()?;
        self.clinicians.reload()?;
        self.facilities.reload()?;
        self.appointments.reload()?;
        self.prescriptions.reload()?;
        self.referrals.reload()?;
        self.staff.reload()?;
        Ok(())
    }

    pub fn flush_all(&mut self) -> ClinicResult<()> {
        self.patients.flush()?;
        self.clinicians.flush()?;
        self.facilities.flush()?;
        self.appointments.flush()?;
        self.prescriptions.flush()?;
        self.referrals.flush()?;
        self.staff.flush()?;
        Ok(())
    }

    pub fn summary(&mut self) -> ClinicResult<DataSummary> {
        Ok(DataSummary {
            patients: self.patients.count()?,
            clinicians: self.clinicians.count()?,
            facilities: self.facilities.count()?,
            appointments: self.appointments.count()?,
            prescriptions: self.prescriptions.count()?,
            referrals: self.referrals.count()?,
            staff: self.staff.count()?,
        })
    }

    /// Lists records whose references point at ids that are not in the stores.
    pub fn integrity_report(&mut self) -> ClinicResult<IntegrityReport> {
        let patient_ids = id_set(self.patients.records()?);
        let clinician_ids = id_set(self.clinicians.records()?);
        let facility_ids = id_set(self.facilities.records()?);
        let appointment_ids = id_set(self.appointments.records()?);

        let orphaned_appointments = self
            .appointments
            .records()?
            .iter()
            .filter(|a| {
                !patient_ids.contains(a.patient_id.as_str())
                    || !clinician_ids.contains(a.clinician_id.as_str())
                    || !facility_ids.contains(a.facility_id.as_str())
            })
            .map(|a| a.id.clone())
            .collect();

        let orphaned_prescriptions = self
            .prescriptions
            .records()?
            .iter()
            .filter(|p| {
                !patient_ids.contains(p.patient_id.as_str())
                    || !clinician_ids.contains(p.clinician_id.as_str())
                    || p.appointment_id
                        .as_deref()
                        .is_some_and(|id| !appointment_ids.contains(id))
            })
            .map(|p| p.id.clone())
            .collect();

        let orphaned_referrals = self
            .referrals
            .records()?
            .iter()
            .filter(|r| {
                !patient_ids.contains(r.patient_id.as_str())
                    || !clinician_ids.contains(r.referring_clinician_id.as_str())
                    || !clinician_ids.contains(r.referred_to_clinician_id.as_str())
                    || !facility_ids.contains(r.referring_facility_id.as_str())
                    || !facility_ids.contains(r.referred_to_facility_id.as_str())
            })
            .map(|r| r.id.clone())
            .collect();

        let orphaned_staff = self
            .staff
            .records()?
            .iter()
            .filter(|s| !facility_ids.contains(s.facility_id.as_str()))
            .map(|s| s.id.clone())
            .collect();

        Ok(IntegrityReport {
            orphaned_appointments,
            orphaned_prescriptions,
            orphaned_referrals,
            orphaned_staff,
        })
    }
}

fn id_set<T: crate::models::Record>(records: &[T]) -> HashSet<String> {
    records.iter().map(|r| r.id().to_string()).collect()
}

/// Record counts per entity type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DataSummary {
    pub patients: usize,
    pub clinicians: usize,
    pub facilities: usize,
    pub appointments: usize,
    pub prescriptions: usize,
    pub referrals: usize,
    pub staff: usize,
}

impl DataSummary {
    pub fn total(&self) -> usize {
        self.patients
            + self.clinicians
            + self.facilities
            + self.appointments
            + self.prescriptions
            + self.referrals
            + self.staff
    }
}

impl fmt::Display for DataSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Patients:      {}", self.patients)?;
        writeln!(f, "Clinicians:    {}", self.clinicians)?;
        writeln!(f, "Facilities:    {}", self.facilities)?;
        writeln!(f, "Appointments:  {}", self.appointments)?;
        writeln!(f, "Prescriptions: {}", self.prescriptions)?;
        writeln!(f, "Referrals:     {}", self.referrals)?;
        write!(f, "Staff:         {}", self.staff)
    }
}

/// Ids of records with dangling references.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub orphaned_appointments: Vec<String>,
    pub orphaned_prescriptions: Vec<String>,
    pub orphaned_referrals: Vec<String>,
    pub orphaned_staff: Vec<String>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned_appointments.is_empty()
            && self.orphaned_prescriptions.is_empty()
            && self.orphaned_referrals.is_empty()
            && self.orphaned_staff.is_empty()
    }
}
