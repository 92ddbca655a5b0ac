//! Patient registration and the per-patient record view.

use super::{
    ensure_id, log_rejection, refuse_duplicate, require_exists, require_record, ServiceContext,
};
use crate::constants::MAX_PATIENT_AGE_YEARS;
use crate::ids::PATIENT_ID_PREFIX;
use crate::models::{Appointment, Patient, Prescription, Record, Referral};
use crate::validation::required_param;
use crate::{ClinicError, ClinicResult};
use chrono::NaiveDate;

/// Everything held about one patient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientRecord {
    pub patient: Patient,
    pub appointments: Vec<Appointment>,
    pub prescriptions: Vec<Prescription>,
    pub referrals: Vec<Referral>,
}

pub struct PatientService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> PatientService<'a> {
    pub(crate) fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    /// Registers a new patient. A blank id is replaced with a freshly allocated one and a
    /// missing registration date defaults to today.
    ///
    /// # Errors
    ///
    /// - `Validation` for blank required fields, a future date of birth or an age above 150
    /// - `NotFound` if the GP facility does not exist
    /// - `BusinessRule` if the id or national id is already registered
    pub fn register(&mut self, patient: Patient) -> ClinicResult<Patient> {
        self.register_checked(patient)
            .inspect_err(|e| log_rejection("register patient", e))
    }

    fn register_checked(&mut self, mut patient: Patient) -> ClinicResult<Patient> {
        patient.tidy();
        let now = self.ctx.now();
        ensure_id(&mut self.ctx.repos.patients, &mut patient.id, PATIENT_ID_PREFIX, now)?;
        patient.validate()?;
        check_date_of_birth(&patient, now.date())?;

        let repos = &mut *self.ctx.repos;
        if let Some(gp) = patient.gp_facility_id.as_deref() {
            require_exists(&mut repos.facilities, gp)?;
        }

        refuse_duplicate(&mut repos.patients, &patient.id, "register patient")?;
        self.check_national_id_unique("register patient", &patient)?;

        patient.registration_date.get_or_insert(now.date());
        let saved = self.ctx.repos.patients.save(patient)?;
        tracing::info!("registered patient {}", saved.id);
        Ok(saved)
    }

    /// Replaces the stored details of an existing patient.
    pub fn update(&mut self, patient: Patient) -> ClinicResult<Patient> {
        self.update_checked(patient)
            .inspect_err(|e| log_rejection("update patient", e))
    }

    fn update_checked(&mut self, mut patient: Patient) -> ClinicResult<Patient> {
        patient.tidy();
        patient.validate()?;
        check_date_of_birth(&patient, self.ctx.today())?;

        let repos = &mut *self.ctx.repos;
        require_exists(&mut repos.patients, &patient.id)?;
        if let Some(gp) = patient.gp_facility_id.as_deref() {
            require_exists(&mut repos.facilities, gp)?;
        }
        self.check_national_id_unique("update patient", &patient)?;

        let saved = self.ctx.repos.patients.save(patient)?;
        tracing::info!("updated patient {}", saved.id);
        Ok(saved)
    }

    /// Removes a patient who has no scheduled appointments left.
    pub fn deregister(&mut self, patient_id: &str) -> ClinicResult<Patient> {
        self.deregister_checked(patient_id)
            .inspect_err(|e| log_rejection("deregister patient", e))
    }

    fn deregister_checked(&mut self, patient_id: &str) -> ClinicResult<Patient> {
        let patient_id = required_param("patient_id", patient_id)?;
        let repos = &mut *self.ctx.repos;
        require_exists(&mut repos.patients, patient_id.as_str())?;

        let pending = repos
            .appointments
            .records()?
            .iter()
            .filter(|a| a.patient_id == patient_id.as_str() && a.is_scheduled())
            .count();
        if pending > 0 {
            return Err(ClinicError::business_rule(
                "deregister patient",
                format!("patient has {pending} scheduled appointment(s)"),
            ));
        }

        let removed = repos.patients.delete_by_id(patient_id.as_str())?;
        tracing::info!("deregistered patient {}", removed.id);
        Ok(removed)
    }

    /// Moves the patient's GP registration to another facility.
    pub fn transfer(&mut self, patient_id: &str, facility_id: &str) -> ClinicResult<Patient> {
        self.transfer_checked(patient_id, facility_id)
            .inspect_err(|e| log_rejection("transfer patient", e))
    }

    fn transfer_checked(&mut self, patient_id: &str, facility_id: &str) -> ClinicResult<Patient> {
        let patient_id = required_param("patient_id", patient_id)?;
        let facility_id = required_param("facility_id", facility_id)?;

        let repos = &mut *self.ctx.repos;
        let mut patient = require_record(&mut repos.patients, patient_id.as_str())?;
        require_exists(&mut repos.facilities, facility_id.as_str())?;

        if patient.gp_facility_id.as_deref() == Some(facility_id.as_str()) {
            return Err(ClinicError::business_rule(
                "transfer patient",
                format!("patient is already registered at {facility_id}"),
            ));
        }

        let previous = patient.gp_facility_id.replace(facility_id.into_inner());
        let saved = repos.patients.save(patient)?;
        tracing::info!(
            "transferred patient {} from {} to {}",
            saved.id,
            previous.as_deref().unwrap_or("none"),
            saved.gp_facility_id.as_deref().unwrap_or("none")
        );
        Ok(saved)
    }

    fn check_national_id_unique(&mut self, operation: &str, patient: &Patient) -> ClinicResult<()> {
        let clash = self
            .ctx
            .repos
            .patients
            .records()?
            .iter()
            .find(|p| p.id != patient.id && p.national_id.trim() == patient.national_id.trim());
        match clash {
            Some(other) => Err(ClinicError::business_rule(
                operation,
                format!("national id already belongs to patient {}", other.id),
            )),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn record(&mut self, patient_id: &str) -> ClinicResult<PatientRecord> {
        let patient_id = required_param("patient_id", patient_id)?;
        let repos = &mut *self.ctx.repos;
        let patient = require_record(&mut repos.patients, patient_id.as_str())?;

        let mut appointments = repos
            .appointments
            .find_where(|a| a.patient_id == patient.id)?;
        appointments.sort_by_key(Appointment::starts_at);

        let mut prescriptions = repos
            .prescriptions
            .find_where(|p| p.patient_id == patient.id)?;
        prescriptions.sort_by_key(|p| p.prescription_date);

        let mut referrals = repos.referrals.find_where(|r| r.patient_id == patient.id)?;
        referrals.sort_by_key(|r| r.referral_date);

        Ok(PatientRecord {
            patient,
            appointments,
            prescriptions,
            referrals,
        })
    }

    pub fn find_by_national_id(&mut self, national_id: &str) -> ClinicResult<Option<Patient>> {
        let national_id = national_id.trim();
        if national_id.is_empty() {
            return Ok(None);
        }
        Ok(self
            .ctx
            .repos
            .patients
            .records()?
            .iter()
            .find(|p| p.national_id.trim() == national_id)
            .cloned())
    }

    /// Case-insensitive match against first, last or full name.
    pub fn search_by_name(&mut self, query: &str) -> ClinicResult<Vec<Patient>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let mut found = self
            .ctx
            .repos
            .patients
            .find_where(|p| p.full_name().to_lowercase().contains(&query))?;
        sort_by_name(&mut found);
        Ok(found)
    }

    /// All patients ordered by surname, then first name.
    pub fn list(&mut self) -> ClinicResult<Vec<Patient>> {
        let mut all = self.ctx.repos.patients.find_all()?;
        sort_by_name(&mut all);
        Ok(all)
    }
}

fn check_date_of_birth(patient: &Patient, today: NaiveDate) -> ClinicResult<()> {
    if patient.date_of_birth > today {
        return Err(ClinicError::validation(
            "date_of_birth",
            "cannot be in the future",
        ));
    }
    if patient.age_on(today) > MAX_PATIENT_AGE_YEARS {
        return Err(ClinicError::validation(
            "date_of_birth",
            format!("implies an age above {MAX_PATIENT_AGE_YEARS} years"),
        ));
    }
    Ok(())
}

fn sort_by_name(patients: &mut [Patient]) {
    patients.sort_by(|a, b| {
        a.last_name
            .cmp(&b.last_name)
            .then_with(|| a.first_name.cmp(&b.first_name))
            .then_with(|| a.id.cmp(&b.id))
    });
}
