//! Prescription lifecycle.
//!
//! `Issued -> Collected` while the prescription is unexpired, and `Issued -> Cancelled`.
//! Expiry is derived from the issue date and duration on every query, never stored.
//! Renewal always creates a new record; the original is left untouched.

use super::{log_rejection, next_id, require_exists, require_record, ServiceContext};
use crate::constants::MAX_PRESCRIPTION_DAYS;
use crate::ids::PRESCRIPTION_ID_PREFIX;
use crate::models::prescription::daily_dose_count;
use crate::models::{Prescription, PrescriptionStatus};
use crate::validation::{optional_text, require_positive, required_param};
use crate::{ClinicError, ClinicResult};
use chrono::{Days, NaiveDate};

/// Parameters for a new prescription.
#[derive(Clone, Debug)]
pub struct PrescriptionRequest {
    pub patient_id: String,
    pub clinician_id: String,
    pub appointment_id: Option<String>,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: u32,
    pub quantity: u32,
    pub instructions: Option<String>,
    pub pharmacy_name: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrescriptionStatistics {
    pub total: usize,
    pub issued: usize,
    pub collected: usize,
    pub cancelled: usize,
    pub expired: usize,
    pub expiring_soon: usize,
}

pub struct PrescriptionService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> PrescriptionService<'a> {
    pub(crate) fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Issues a new prescription dated today.
    ///
    /// # Errors
    ///
    /// - `Validation` for blank fields or a zero duration or quantity
    /// - `NotFound` if the patient, clinician or linked appointment does not exist
    /// - `BusinessRule` if the duration exceeds 365 days
    pub fn prescribe(&mut self, request: PrescriptionRequest) -> ClinicResult<Prescription> {
        self.prescribe_checked(request)
            .inspect_err(|e| log_rejection("issue prescription", e))
    }

    fn prescribe_checked(&mut self, request: PrescriptionRequest) -> ClinicResult<Prescription> {
        let patient_id = required_param("patient_id", &request.patient_id)?;
        let clinician_id = required_param("clinician_id", &request.clinician_id)?;
        let medication_name = required_param("medication_name", &request.medication_name)?;
        let dosage = required_param("dosage", &request.dosage)?;
        let frequency = required_param("frequency", &request.frequency)?;
        let pharmacy_name = required_param("pharmacy_name", &request.pharmacy_name)?;
        require_positive("duration_days", request.duration_days)?;
        require_positive("quantity", request.quantity)?;
        let appointment_id = optional_text(request.appointment_id.as_deref());

        let repos = &mut *self.ctx.repos;
        require_exists(&mut repos.patients, patient_id.as_str())?;
        require_exists(&mut repos.clinicians, clinician_id.as_str())?;
        if let Some(appointment_id) = appointment_id.as_deref() {
            require_exists(&mut repos.appointments, appointment_id)?;
        }

        check_duration("issue prescription", request.duration_days)?;

        let now = self.ctx.now();
        let today = now.date();
        let id = next_id(&mut self.ctx.repos.prescriptions, PRESCRIPTION_ID_PREFIX, now)?;

        let prescription = Prescription {
            id,
            patient_id: patient_id.into_inner(),
            clinician_id: clinician_id.into_inner(),
            appointment_id,
            prescription_date: today,
            medication_name: medication_name.into_inner(),
            dosage: dosage.into_inner(),
            frequency: frequency.into_inner(),
            duration_days: request.duration_days,
            quantity: request.quantity,
            instructions: optional_text(request.instructions.as_deref()),
            pharmacy_name: pharmacy_name.into_inner(),
            status: PrescriptionStatus::Issued,
            issue_date: Some(today),
            collection_date: None,
        };

        let saved = self.ctx.repos.prescriptions.save(prescription)?;
        tracing::info!(
            "issued prescription {} ({}) for patient {}",
            saved.id,
            saved.medication_name,
            saved.patient_id
        );
        Ok(saved)
    }

    /// Associates the prescription with the appointment it was issued in.
    pub fn link_to_appointment(
        &mut self,
        prescription_id: &str,
        appointment_id: &str,
    ) -> ClinicResult<Prescription> {
        self.link_checked(prescription_id, appointment_id)
            .inspect_err(|e| log_rejection("link prescription", e))
    }

    fn link_checked(
        &mut self,
        prescription_id: &str,
        appointment_id: &str,
    ) -> ClinicResult<Prescription> {
        let prescription_id = required_param("prescription_id", prescription_id)?;
        let appointment_id = required_param("appointment_id", appointment_id)?;

        let repos = &mut *self.ctx.repos;
        let mut prescription =
            require_record(&mut repos.prescriptions, prescription_id.as_str())?;
        let appointment = require_record(&mut repos.appointments, appointment_id.as_str())?;

        if appointment.patient_id != prescription.patient_id {
            return Err(ClinicError::business_rule(
                "link prescription",
                format!(
                    "appointment {} belongs to a different patient",
                    appointment.id
                ),
            ));
        }

        prescription.appointment_id = Some(appointment.id);
        let saved = repos.prescriptions.save(prescription)?;
        tracing::info!(
            "linked prescription {} to appointment {}",
            saved.id,
            appointment_id.as_str()
        );
        Ok(saved)
    }

    /// Records collection of an issued, unexpired prescription.
    pub fn collect(&mut self, prescription_id: &str) -> ClinicResult<Prescription> {
        self.collect_checked(prescription_id)
            .inspect_err(|e| log_rejection("collect prescription", e))
    }

    fn collect_checked(&mut self, prescription_id: &str) -> ClinicResult<Prescription> {
        let prescription_id = required_param("prescription_id", prescription_id)?;
        let mut prescription =
            require_record(&mut self.ctx.repos.prescriptions, prescription_id.as_str())?;
        let today = self.ctx.today();

        match prescription.status {
            PrescriptionStatus::Issued => {}
            PrescriptionStatus::Collected => {
                return Err(ClinicError::business_rule(
                    "collect prescription",
                    "prescription has already been collected",
                ))
            }
            PrescriptionStatus::Cancelled => {
                return Err(ClinicError::business_rule(
                    "collect prescription",
                    "cancelled prescriptions cannot be collected",
                ))
            }
        }

        if prescription.is_expired(today) {
            return Err(ClinicError::business_rule(
                "collect prescription",
                format!("prescription {} has expired", prescription.id),
            ));
        }

        prescription.status = PrescriptionStatus::Collected;
        prescription.collection_date = Some(today);

        let saved = self.ctx.repos.prescriptions.save(prescription)?;
        tracing::info!("prescription {} collected", saved.id);
        Ok(saved)
    }

    /// Cancels an issued prescription, recording `Cancelled: <reason>` in its instructions.
    pub fn cancel(&mut self, prescription_id: &str, reason: &str) -> ClinicResult<Prescription> {
        self.cancel_checked(prescription_id, reason)
            .inspect_err(|e| log_rejection("cancel prescription", e))
    }

    fn cancel_checked(
        &mut self,
        prescription_id: &str,
        reason: &str,
    ) -> ClinicResult<Prescription> {
        let prescription_id = required_param("prescription_id", prescription_id)?;
        let mut prescription =
            require_record(&mut self.ctx.repos.prescriptions, prescription_id.as_str())?;

        match prescription.status {
            PrescriptionStatus::Issued => {}
            PrescriptionStatus::Collected => {
                return Err(ClinicError::business_rule(
                    "cancel prescription",
                    "collected prescriptions cannot be cancelled",
                ))
            }
            PrescriptionStatus::Cancelled => {
                return Err(ClinicError::business_rule(
                    "cancel prescription",
                    "prescription is already cancelled",
                ))
            }
        }

        let note = match optional_text(Some(reason)) {
            Some(reason) => format!("Cancelled: {reason}"),
            None => "Cancelled".to_string(),
        };
        prescription.status = PrescriptionStatus::Cancelled;
        prescription.append_instruction(&note);

        let saved = self.ctx.repos.prescriptions.save(prescription)?;
        tracing::info!("prescription {} cancelled", saved.id);
        Ok(saved)
    }

    /// Issues a fresh prescription repeating the medication of `prescription_id` for
    /// `duration_days`. Quantity is recomputed from the frequency.
    pub fn renew(
        &mut self,
        prescription_id: &str,
        duration_days: u32,
    ) -> ClinicResult<Prescription> {
        self.renew_checked(prescription_id, duration_days)
            .inspect_err(|e| log_rejection("renew prescription", e))
    }

    fn renew_checked(
        &mut self,
        prescription_id: &str,
        duration_days: u32,
    ) -> ClinicResult<Prescription> {
        let prescription_id = required_param("prescription_id", prescription_id)?;
        require_positive("duration_days", duration_days)?;

        let original =
            require_record(&mut self.ctx.repos.prescriptions, prescription_id.as_str())?;
        check_duration("renew prescription", duration_days)?;

        let now = self.ctx.now();
        let today = now.date();
        let id = next_id(&mut self.ctx.repos.prescriptions, PRESCRIPTION_ID_PREFIX, now)?;

        let instructions = match optional_text(original.instructions.as_deref()) {
            Some(previous) => format!("Renewal - {previous}"),
            None => "Renewal".to_string(),
        };

        let renewal = Prescription {
            id,
            patient_id: original.patient_id.clone(),
            clinician_id: original.clinician_id.clone(),
            appointment_id: original.appointment_id.clone(),
            prescription_date: today,
            medication_name: original.medication_name.clone(),
            dosage: original.dosage.clone(),
            frequency: original.frequency.clone(),
            duration_days,
            quantity: daily_dose_count(&original.frequency) * duration_days,
            instructions: Some(instructions),
            pharmacy_name: original.pharmacy_name.clone(),
            status: PrescriptionStatus::Issued,
            issue_date: Some(today),
            collection_date: None,
        };

        let saved = self.ctx.repos.prescriptions.save(renewal)?;
        tracing::info!("renewed prescription {} as {}", original.id, saved.id);
        Ok(saved)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Issued prescriptions whose expiry falls within the alert window, soonest first.
    ///
    /// Already expired but uncollected prescriptions are included.
    pub fn expiring_soon(&mut self) -> ClinicResult<Vec<Prescription>> {
        let horizon = self.alert_horizon();
        let mut expiring = self.ctx.repos.prescriptions.find_where(|p| {
            p.status == PrescriptionStatus::Issued
                && p.expiry_date().is_some_and(|expiry| expiry <= horizon)
        })?;
        expiring.sort_by_key(Prescription::expiry_date);
        Ok(expiring)
    }

    pub fn active_for_patient(&mut self, patient_id: &str) -> ClinicResult<Vec<Prescription>> {
        let today = self.ctx.today();
        self.sorted_where(|p| p.patient_id == patient_id && p.is_active(today))
    }

    pub fn for_patient(&mut self, patient_id: &str) -> ClinicResult<Vec<Prescription>> {
        self.sorted_where(|p| p.patient_id == patient_id)
    }

    /// Issued prescriptions past their expiry date.
    pub fn expired(&mut self) -> ClinicResult<Vec<Prescription>> {
        let today = self.ctx.today();
        self.sorted_where(|p| p.status == PrescriptionStatus::Issued && p.is_expired(today))
    }

    pub fn statistics(&mut self) -> ClinicResult<PrescriptionStatistics> {
        let today = self.ctx.today();
        let horizon = self.alert_horizon();
        let all = self.ctx.repos.prescriptions.records()?;

        let mut stats = PrescriptionStatistics {
            total: all.len(),
            ..Default::default()
        };
        for rx in all {
            match rx.status {
                PrescriptionStatus::Issued => {
                    stats.issued += 1;
                    if rx.is_expired(today) {
                        stats.expired += 1;
                    }
                    if rx.expiry_date().is_some_and(|expiry| expiry <= horizon) {
                        stats.expiring_soon += 1;
                    }
                }
                PrescriptionStatus::Collected => stats.collected += 1,
                PrescriptionStatus::Cancelled => stats.cancelled += 1,
            }
        }
        Ok(stats)
    }

    fn alert_horizon(&self) -> NaiveDate {
        let days = u64::try_from(self.ctx.cfg.expiry_alert_days()).unwrap_or(0);
        let today = self.ctx.today();
        today.checked_add_days(Days::new(days)).unwrap_or(today)
    }

    fn sorted_where(
        &mut self,
        predicate: impl Fn(&Prescription) -> bool,
    ) -> ClinicResult<Vec<Prescription>> {
        let mut found = self.ctx.repos.prescriptions.find_where(predicate)?;
        found.sort_by(|a, b| {
            a.prescription_date
                .cmp(&b.prescription_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(found)
    }
}

fn check_duration(operation: &str, duration_days: u32) -> ClinicResult<()> {
    if duration_days > MAX_PRESCRIPTION_DAYS {
        return Err(ClinicError::business_rule(
            operation,
            format!("duration cannot exceed {MAX_PRESCRIPTION_DAYS} days"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::clock::FixedClock;
    use crate::config::CoreConfig;
    use crate::models::PrescriptionStatus;
    use crate::services::PrescriptionRequest;
    use crate::test_support::{at, seed_directory};
    use crate::{Clinic, ClinicError};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn clinic_at(temp_dir: &TempDir, day: u32) -> Clinic {
        let cfg = CoreConfig::new(temp_dir.path().to_path_buf()).expect("config");
        let clock = FixedClock::new(at(2025, 3, day, 10, 0));
        let mut clinic = Clinic::with_clock(Arc::new(cfg), Arc::new(clock)).expect("open");
        seed_directory(&mut clinic);
        clinic
    }

    fn request(days: u32) -> PrescriptionRequest {
        PrescriptionRequest {
            patient_id: "P001".into(),
            clinician_id: "C001".into(),
            appointment_id: None,
            medication_name: "Amoxicillin".into(),
            dosage: "500mg".into(),
            frequency: "Three times daily".into(),
            duration_days: days,
            quantity: 21,
            instructions: Some("Take with food".into()),
            pharmacy_name: "Boots Pharmacy".into(),
        }
    }

    #[test]
    fn test_prescribe_sets_issue_dates() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut clinic = clinic_at(&temp_dir, 1);

        let rx = clinic.prescriptions().prescribe(request(7)).expect("prescribe");
        assert!(rx.id.starts_with("RX"));
        assert_eq!(rx.status, PrescriptionStatus::Issued);
        assert_eq!(rx.issue_date, Some(rx.prescription_date));
    }

    #[test]
    fn test_prescribe_duration_limits() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut clinic = clinic_at(&temp_dir, 1);

        let err = clinic.prescriptions().prescribe(request(0)).unwrap_err();
        assert!(matches!(err, ClinicError::Validation { .. }));
        let err = clinic.prescriptions().prescribe(request(366)).unwrap_err();
        assert!(matches!(err, ClinicError::BusinessRule { .. }));
        clinic.prescriptions().prescribe(request(365)).expect("upper bound");
    }

    #[test]
    fn test_prescribe_unknown_appointment() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut clinic = clinic_at(&temp_dir, 1);

        let mut req = request(7);
        req.appointment_id = Some("A404".into());
        let err = clinic.prescriptions().prescribe(req).unwrap_err();
        assert!(matches!(err, ClinicError::NotFound { .. }));
    }

    #[test]
    fn test_collect_and_cancel_are_terminal() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut clinic = clinic_at(&temp_dir, 1);

        let first = clinic.prescriptions().prescribe(request(7)).expect("prescribe");
        let collected = clinic.prescriptions().collect(&first.id).expect("collect");
        assert_eq!(collected.collection_date, Some(first.prescription_date));
        assert!(clinic.prescriptions().collect(&first.id).is_err());
        assert!(clinic.prescriptions().cancel(&first.id, "error").is_err());

        let second = clinic.prescriptions().prescribe(request(7)).expect("prescribe");
        let cancelled = clinic
            .prescriptions()
            .cancel(&second.id, "Allergy reported")
            .expect("cancel");
        assert_eq!(
            cancelled.instructions.as_deref(),
            Some("Take with food; Cancelled: Allergy reported")
        );
        assert!(clinic.prescriptions().collect(&second.id).is_err());
    }

    #[test]
    fn test_renew_copies_medication_and_recomputes_quantity() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut clinic = clinic_at(&temp_dir, 1);

        let original = clinic.prescriptions().prescribe(request(7)).expect("prescribe");
        let renewal = clinic.prescriptions().renew(&original.id, 10).expect("renew");

        assert_ne!(renewal.id, original.id);
        assert_eq!(renewal.medication_name, "Amoxicillin");
        assert_eq!(renewal.quantity, 30);
        assert_eq!(
            renewal.instructions.as_deref(),
            Some("Renewal - Take with food")
        );

        let unchanged = clinic
            .repositories_mut()
            .prescriptions
            .find_by_id(&original.id)
            .expect("find")
            .expect("present");
        assert_eq!(unchanged, original);
    }

    #[test]
    fn test_expiring_soon_orders_by_expiry() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut clinic = clinic_at(&temp_dir, 1);

        let long = clinic.prescriptions().prescribe(request(6)).expect("prescribe");
        let short = clinic.prescriptions().prescribe(request(3)).expect("prescribe");
        clinic.prescriptions().prescribe(request(30)).expect("prescribe");

        let expiring = clinic.prescriptions().expiring_soon().expect("expiring");
        let ids: Vec<_> = expiring.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![short.id.as_str(), long.id.as_str()]);

        let stats = clinic.prescriptions().statistics().expect("stats");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.issued, 3);
        assert_eq!(stats.expiring_soon, 2);
        assert_eq!(stats.expired, 0);
    }

    #[test]
    fn test_for_patient_orders_by_prescription_date() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let later = {
            let mut clinic = clinic_at(&temp_dir, 9);
            clinic.prescriptions().prescribe(request(7)).expect("prescribe")
        };

        let mut clinic = clinic_at(&temp_dir, 2);
        let earlier = clinic.prescriptions().prescribe(request(7)).expect("prescribe");
        let mut other = request(7);
        other.patient_id = "P002".into();
        clinic.prescriptions().prescribe(other).expect("prescribe");

        let found = clinic.prescriptions().for_patient("P001").expect("query");
        let ids: Vec<_> = found.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![earlier.id.as_str(), later.id.as_str()]);
        assert_eq!(clinic.prescriptions().for_patient("P002").unwrap().len(), 1);
        assert!(clinic.prescriptions().for_patient("P404").unwrap().is_empty());
    }
}
