//! Referral workflow.
//!
//! `New -> In Progress -> Completed`, one direction only. Urgency can be raised, never
//! lowered, until the referral completes. A referral is overdue once it has been open for
//! longer than the configured number of days.

use super::{log_rejection, next_id, require_exists, require_record, ServiceContext};
use crate::ids::REFERRAL_ID_PREFIX;
use crate::models::{Appointment, Referral, ReferralStatus, Urgency};
use crate::validation::{optional_text, required_param};
use crate::{ClinicError, ClinicResult};
use std::cmp::Reverse;

/// Parameters for a new referral.
///
/// `urgency` must be `Routine` or `Urgent`; `Non-urgent` is only accepted from stored data.
#[derive(Clone, Debug)]
pub struct ReferralRequest {
    pub patient_id: String,
    pub referring_clinician_id: String,
    pub referred_to_clinician_id: String,
    pub referring_facility_id: String,
    pub referred_to_facility_id: String,
    pub urgency: Urgency,
    pub reason: String,
    pub clinical_summary: Option<String>,
    pub requested_investigations: Option<String>,
}

/// A referral together with the appointment booked for it, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferralWorkflow {
    pub referral: Referral,
    pub appointment: Option<Appointment>,
    pub days_open: i64,
    pub overdue: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReferralStatistics {
    pub total: usize,
    pub new: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub urgent: usize,
    pub routine: usize,
    pub non_urgent: usize,
    pub overdue: usize,
}

pub struct ReferralService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> ReferralService<'a> {
    pub(crate) fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Creates a `New` referral dated today.
    ///
    /// # Errors
    ///
    /// - `Validation` for blank ids or reason, or a `Non-urgent` priority
    /// - `NotFound` if any referenced patient, clinician or facility does not exist
    /// - `BusinessRule` if the referral points back at the referring clinician or facility
    pub fn refer(&mut self, request: ReferralRequest) -> ClinicResult<Referral> {
        self.refer_checked(request)
            .inspect_err(|e| log_rejection("create referral", e))
    }

    fn refer_checked(&mut self, request: ReferralRequest) -> ClinicResult<Referral> {
        let patient_id = required_param("patient_id", &request.patient_id)?;
        let from_clinician = required_param("referring_clinician_id", &request.referring_clinician_id)?;
        let to_clinician =
            required_param("referred_to_clinician_id", &request.referred_to_clinician_id)?;
        let from_facility = required_param("referring_facility_id", &request.referring_facility_id)?;
        let to_facility =
            required_param("referred_to_facility_id", &request.referred_to_facility_id)?;
        let reason = required_param("referral_reason", &request.reason)?;
        if request.urgency == Urgency::NonUrgent {
            return Err(ClinicError::validation(
                "urgency_level",
                "new referrals must be Routine or Urgent",
            ));
        }

        let repos = &mut *self.ctx.repos;
        require_exists(&mut repos.patients, patient_id.as_str())?;
        require_exists(&mut repos.clinicians, from_clinician.as_str())?;
        require_exists(&mut repos.clinicians, to_clinician.as_str())?;
        require_exists(&mut repos.facilities, from_facility.as_str())?;
        require_exists(&mut repos.facilities, to_facility.as_str())?;

        if from_clinician == to_clinician {
            return Err(ClinicError::business_rule(
                "create referral",
                "a clinician cannot refer a patient to themselves",
            ));
        }
        if from_facility == to_facility {
            return Err(ClinicError::business_rule(
                "create referral",
                "referring and receiving facility must differ",
            ));
        }

        let now = self.ctx.now();
        let today = now.date();
        let id = next_id(&mut self.ctx.repos.referrals, REFERRAL_ID_PREFIX, now)?;

        let referral = Referral {
            id,
            patient_id: patient_id.into_inner(),
            referring_clinician_id: from_clinician.into_inner(),
            referred_to_clinician_id: to_clinician.into_inner(),
            referring_facility_id: from_facility.into_inner(),
            referred_to_facility_id: to_facility.into_inner(),
            referral_date: today,
            urgency: request.urgency,
            reason: reason.into_inner(),
            clinical_summary: optional_text(request.clinical_summary.as_deref()),
            requested_investigations: optional_text(request.requested_investigations.as_deref()),
            status: ReferralStatus::New,
            appointment_id: None,
            notes: None,
            created_date: Some(today),
            last_updated: Some(today),
        };

        let saved = self.ctx.repos.referrals.save(referral)?;
        tracing::info!(
            "created {} referral {} for patient {} to {}",
            saved.urgency,
            saved.id,
            saved.patient_id,
            saved.referred_to_clinician_id
        );
        Ok(saved)
    }

    /// Moves a `New` referral to `In Progress`.
    pub fn start_processing(&mut self, referral_id: &str) -> ClinicResult<Referral> {
        self.start_checked(referral_id)
            .inspect_err(|e| log_rejection("start referral", e))
    }

    fn start_checked(&mut self, referral_id: &str) -> ClinicResult<Referral> {
        let mut referral = self.load("referral_id", referral_id)?;
        if referral.status != ReferralStatus::New {
            return Err(ClinicError::business_rule(
                "start referral",
                format!("referral is {}, expected New", referral.status),
            ));
        }

        referral.status = ReferralStatus::InProgress;
        self.store(referral, "started")
    }

    /// Completes an `In Progress` referral, recording the outcome and any notes.
    pub fn complete(
        &mut self,
        referral_id: &str,
        outcome: Option<&str>,
        notes: Option<&str>,
    ) -> ClinicResult<Referral> {
        self.complete_checked(referral_id, outcome, notes)
            .inspect_err(|e| log_rejection("complete referral", e))
    }

    fn complete_checked(
        &mut self,
        referral_id: &str,
        outcome: Option<&str>,
        notes: Option<&str>,
    ) -> ClinicResult<Referral> {
        let mut referral = self.load("referral_id", referral_id)?;
        if referral.status != ReferralStatus::InProgress {
            return Err(ClinicError::business_rule(
                "complete referral",
                format!("referral is {}, expected In Progress", referral.status),
            ));
        }

        referral.status = ReferralStatus::Completed;
        if let Some(outcome) = optional_text(outcome) {
            referral.append_note(&format!("Outcome: {outcome}"));
        }
        if let Some(notes) = optional_text(notes) {
            referral.append_note(&notes);
        }
        self.store(referral, "completed")
    }

    /// Records the appointment booked to action this referral.
    pub fn link_appointment(
        &mut self,
        referral_id: &str,
        appointment_id: &str,
    ) -> ClinicResult<Referral> {
        self.link_checked(referral_id, appointment_id)
            .inspect_err(|e| log_rejection("link referral", e))
    }

    fn link_checked(&mut self, referral_id: &str, appointment_id: &str) -> ClinicResult<Referral> {
        let referral_id = required_param("referral_id", referral_id)?;
        let appointment_id = required_param("appointment_id", appointment_id)?;

        let repos = &mut *self.ctx.repos;
        let mut referral = require_record(&mut repos.referrals, referral_id.as_str())?;
        let appointment = require_record(&mut repos.appointments, appointment_id.as_str())?;

        if appointment.patient_id != referral.patient_id {
            return Err(ClinicError::business_rule(
                "link referral",
                format!("appointment {} belongs to a different patient", appointment.id),
            ));
        }
        if referral.status == ReferralStatus::Completed {
            return Err(ClinicError::business_rule(
                "link referral",
                "completed referrals cannot be changed",
            ));
        }

        referral.appointment_id = Some(appointment.id);
        self.store(referral, "linked to an appointment")
    }

    /// Raises the urgency of an open referral. The new level must be strictly higher.
    pub fn escalate(
        &mut self,
        referral_id: &str,
        urgency: Urgency,
        reason: &str,
    ) -> ClinicResult<Referral> {
        self.escalate_checked(referral_id, urgency, reason)
            .inspect_err(|e| log_rejection("escalate referral", e))
    }

    fn escalate_checked(
        &mut self,
        referral_id: &str,
        urgency: Urgency,
        reason: &str,
    ) -> ClinicResult<Referral> {
        let reason = required_param("reason", reason)?;
        let mut referral = self.load("referral_id", referral_id)?;

        if referral.status == ReferralStatus::Completed {
            return Err(ClinicError::business_rule(
                "escalate referral",
                "completed referrals cannot be escalated",
            ));
        }
        if urgency <= referral.urgency {
            return Err(ClinicError::business_rule(
                "escalate referral",
                format!(
                    "{} is not higher than the current urgency {}",
                    urgency, referral.urgency
                ),
            ));
        }

        let previous = referral.urgency;
        referral.urgency = urgency;
        referral.append_note(&format!("Escalated: {}", reason.as_str()));
        let saved = self.store(referral, "escalated")?;
        tracing::info!("referral {} urgency {} -> {}", saved.id, previous, saved.urgency);
        Ok(saved)
    }

    fn load(&mut self, field: &str, referral_id: &str) -> ClinicResult<Referral> {
        let referral_id = required_param(field, referral_id)?;
        require_record(&mut self.ctx.repos.referrals, referral_id.as_str())
    }

    fn store(&mut self, mut referral: Referral, action: &str) -> ClinicResult<Referral> {
        referral.last_updated = Some(self.ctx.today());
        let saved = self.ctx.repos.referrals.save(referral)?;
        tracing::info!("referral {} {}", saved.id, action);
        Ok(saved)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn workflow(&mut self, referral_id: &str) -> ClinicResult<ReferralWorkflow> {
        let referral = self.load("referral_id", referral_id)?;
        let appointment = match referral.appointment_id.as_deref() {
            Some(id) => self.ctx.repos.appointments.find_by_id(id)?,
            None => None,
        };

        let today = self.ctx.today();
        Ok(ReferralWorkflow {
            days_open: referral.days_since_referral(today),
            overdue: referral.is_overdue(today, self.ctx.cfg.referral_overdue_days()),
            referral,
            appointment,
        })
    }

    /// Open referrals past the overdue threshold, oldest first.
    pub fn overdue(&mut self) -> ClinicResult<Vec<Referral>> {
        let today = self.ctx.today();
        let threshold = self.ctx.cfg.referral_overdue_days();
        let mut overdue = self
            .ctx
            .repos
            .referrals
            .find_where(|r| r.is_overdue(today, threshold))?;
        overdue.sort_by(|a, b| {
            a.referral_date
                .cmp(&b.referral_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(overdue)
    }

    /// Open referrals, most urgent first and oldest first within a level.
    pub fn triage_queue(&mut self) -> ClinicResult<Vec<Referral>> {
        let mut queue = self.ctx.repos.referrals.find_where(Referral::is_open)?;
        queue.sort_by_key(|r| (Reverse(r.urgency), r.referral_date, r.id.clone()));
        Ok(queue)
    }

    pub fn for_patient(&mut self, patient_id: &str) -> ClinicResult<Vec<Referral>> {
        let mut found = self
            .ctx
            .repos
            .referrals
            .find_where(|r| r.patient_id == patient_id)?;
        found.sort_by(|a, b| a.referral_date.cmp(&b.referral_date));
        Ok(found)
    }

    pub fn statistics(&mut self) -> ClinicResult<ReferralStatistics> {
        let today = self.ctx.today();
        let threshold = self.ctx.cfg.referral_overdue_days();
        let all = self.ctx.repos.referrals.records()?;

        let mut stats = ReferralStatistics {
            total: all.len(),
            ..Default::default()
        };
        for referral in all {
            match referral.status {
                ReferralStatus::New => stats.new += 1,
                ReferralStatus::InProgress => stats.in_progress += 1,
                ReferralStatus::Completed => stats.completed += 1,
            }
            match referral.urgency {
                Urgency::Urgent => stats.urgent += 1,
                Urgency::Routine => stats.routine += 1,
                Urgency::NonUrgent => stats.non_urgent += 1,
            }
            if referral.is_overdue(today, threshold) {
                stats.overdue += 1;
            }
        }
        Ok(stats)
    }
}
