//! Appointment scheduling.
//!
//! Booking, rescheduling, cancellation and completion, plus free-slot enumeration and the
//! read-side queries used for reminders and statistics.
//!
//! State machine: `Scheduled -> Completed` and `Scheduled -> Cancelled`. Both targets are
//! terminal. Cancellation needs at least the configured notice (24 hours by default).

use super::{log_rejection, next_id, require_exists, require_record, ServiceContext};
use crate::constants::{MAX_APPOINTMENT_MINUTES, MIN_APPOINTMENT_MINUTES, REMINDER_WINDOW_HOURS};
use crate::ids::APPOINTMENT_ID_PREFIX;
use crate::models::{Appointment, AppointmentStatus};
use crate::scheduling::{available_slots, find_conflict, Candidate, TimeSlot};
use crate::validation::{optional_text, require_positive, required_param};
use crate::{ClinicError, ClinicResult};
use chrono::{Duration, NaiveDate, NaiveTime};

/// Parameters for a new booking.
#[derive(Clone, Debug)]
pub struct BookingRequest {
    pub patient_id: String,
    pub clinician_id: String,
    pub facility_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub appointment_type: String,
    pub reason: Option<String>,
}

/// Appointment counts by status and timing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AppointmentStatistics {
    pub total: usize,
    pub scheduled: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub today: usize,
    pub upcoming: usize,
}

pub struct AppointmentService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> AppointmentService<'a> {
    pub(crate) fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Books a new appointment with status `Scheduled`.
    ///
    /// # Errors
    ///
    /// - `Validation` for blank ids or type, or a zero duration
    /// - `NotFound` if the patient, clinician or facility does not exist
    /// - `BusinessRule` if the start is not in the future, the duration is outside
    ///   5..=480 minutes, or the slot clashes with an existing appointment
    pub fn book(&mut self, request: BookingRequest) -> ClinicResult<Appointment> {
        self.book_checked(request)
            .inspect_err(|e| log_rejection("book appointment", e))
    }

    fn book_checked(&mut self, request: BookingRequest) -> ClinicResult<Appointment> {
        let patient_id = required_param("patient_id", &request.patient_id)?;
        let clinician_id = required_param("clinician_id", &request.clinician_id)?;
        let facility_id = required_param("facility_id", &request.facility_id)?;
        let appointment_type = required_param("appointment_type", &request.appointment_type)?;
        require_positive("duration_minutes", request.duration_minutes)?;

        let repos = &mut *self.ctx.repos;
        require_exists(&mut repos.patients, patient_id.as_str())?;
        require_exists(&mut repos.clinicians, clinician_id.as_str())?;
        require_exists(&mut repos.facilities, facility_id.as_str())?;

        let candidate = Candidate {
            date: request.date,
            start: request.start_time,
            duration_minutes: request.duration_minutes,
            clinician_id: clinician_id.as_str(),
            facility_id: facility_id.as_str(),
        };
        self.check_schedulable("book appointment", &candidate, None)?;

        let now = self.ctx.now();
        let id = next_id(
            &mut self.ctx.repos.appointments,
            APPOINTMENT_ID_PREFIX,
            now,
        )?;

        let appointment = Appointment {
            id,
            patient_id: patient_id.into_inner(),
            clinician_id: clinician_id.into_inner(),
            facility_id: facility_id.into_inner(),
            date: request.date,
            start_time: request.start_time,
            duration_minutes: request.duration_minutes,
            appointment_type: appointment_type.into_inner(),
            status: AppointmentStatus::Scheduled,
            reason: optional_text(request.reason.as_deref()),
            notes: None,
            created_at: Some(now),
            modified_at: Some(now),
        };

        let saved = self.ctx.repos.appointments.save(appointment)?;
        tracing::info!(
            "booked appointment {} for patient {} with {} at {}",
            saved.id,
            saved.patient_id,
            saved.clinician_id,
            saved.starts_at().format("%Y-%m-%d %H:%M")
        );
        Ok(saved)
    }

    /// Moves a scheduled appointment to a new date and start time.
    ///
    /// The appointment's own current slot is ignored by the conflict check.
    pub fn reschedule(
        &mut self,
        appointment_id: &str,
        new_date: NaiveDate,
        new_time: NaiveTime,
    ) -> ClinicResult<Appointment> {
        self.reschedule_checked(appointment_id, new_date, new_time)
            .inspect_err(|e| log_rejection("reschedule appointment", e))
    }

    fn reschedule_checked(
        &mut self,
        appointment_id: &str,
        new_date: NaiveDate,
        new_time: NaiveTime,
    ) -> ClinicResult<Appointment> {
        let appointment_id = required_param("appointment_id", appointment_id)?;

        let repos = &mut *self.ctx.repos;
        let mut appointment = require_record(&mut repos.appointments, appointment_id.as_str())?;
        require_exists(&mut repos.patients, &appointment.patient_id)?;
        require_exists(&mut repos.clinicians, &appointment.clinician_id)?;
        require_exists(&mut repos.facilities, &appointment.facility_id)?;

        match appointment.status {
            AppointmentStatus::Scheduled => {}
            AppointmentStatus::Completed => {
                return Err(ClinicError::business_rule(
                    "reschedule appointment",
                    "completed appointments cannot be rescheduled",
                ))
            }
            AppointmentStatus::Cancelled => {
                return Err(ClinicError::business_rule(
                    "reschedule appointment",
                    "cancelled appointments cannot be rescheduled",
                ))
            }
        }

        let candidate = Candidate {
            date: new_date,
            start: new_time,
            duration_minutes: appointment.duration_minutes,
            clinician_id: &appointment.clinician_id,
            facility_id: &appointment.facility_id,
        };
        self.check_schedulable("reschedule appointment", &candidate, Some(&appointment.id))?;

        let previous = appointment.starts_at();
        appointment.date = new_date;
        appointment.start_time = new_time;
        appointment.modified_at = Some(self.ctx.now());

        let saved = self.ctx.repos.appointments.save(appointment)?;
        tracing::info!(
            "rescheduled appointment {} from {} to {}",
            saved.id,
            previous.format("%Y-%m-%d %H:%M"),
            saved.starts_at().format("%Y-%m-%d %H:%M")
        );
        Ok(saved)
    }

    /// Cancels a scheduled appointment, recording `Cancelled: <reason>` in its notes.
    ///
    /// Refused when the appointment starts within the cancellation notice period.
    pub fn cancel(&mut self, appointment_id: &str, reason: &str) -> ClinicResult<Appointment> {
        self.cancel_checked(appointment_id, reason)
            .inspect_err(|e| log_rejection("cancel appointment", e))
    }

    fn cancel_checked(&mut self, appointment_id: &str, reason: &str) -> ClinicResult<Appointment> {
        let appointment_id = required_param("appointment_id", appointment_id)?;
        let mut appointment =
            require_record(&mut self.ctx.repos.appointments, appointment_id.as_str())?;

        match appointment.status {
            AppointmentStatus::Scheduled => {}
            AppointmentStatus::Completed => {
                return Err(ClinicError::business_rule(
                    "cancel appointment",
                    "completed appointments cannot be cancelled",
                ))
            }
            AppointmentStatus::Cancelled => {
                return Err(ClinicError::business_rule(
                    "cancel appointment",
                    "appointment is already cancelled",
                ))
            }
        }

        let now = self.ctx.now();
        let notice = Duration::hours(self.ctx.cfg.cancellation_notice_hours());
        if appointment.starts_at() - notice < now {
            return Err(ClinicError::business_rule(
                "cancel appointment",
                format!(
                    "appointments cannot be cancelled less than {} hours before the start",
                    self.ctx.cfg.cancellation_notice_hours()
                ),
            ));
        }

        let note = match optional_text(Some(reason)) {
            Some(reason) => format!("Cancelled: {reason}"),
            None => "Cancelled".to_string(),
        };
        appointment.status = AppointmentStatus::Cancelled;
        appointment.append_note(&note);
        appointment.modified_at = Some(now);

        let saved = self.ctx.repos.appointments.save(appointment)?;
        tracing::info!("cancelled appointment {}", saved.id);
        Ok(saved)
    }

    /// Marks a scheduled appointment as completed, appending `notes` when given.
    pub fn complete(
        &mut self,
        appointment_id: &str,
        notes: Option<&str>,
    ) -> ClinicResult<Appointment> {
        self.complete_checked(appointment_id, notes)
            .inspect_err(|e| log_rejection("complete appointment", e))
    }

    fn complete_checked(
        &mut self,
        appointment_id: &str,
        notes: Option<&str>,
    ) -> ClinicResult<Appointment> {
        let appointment_id = required_param("appointment_id", appointment_id)?;
        let mut appointment =
            require_record(&mut self.ctx.repos.appointments, appointment_id.as_str())?;

        match appointment.status {
            AppointmentStatus::Scheduled => {}
            AppointmentStatus::Completed => {
                return Err(ClinicError::business_rule(
                    "complete appointment",
                    "appointment is already completed",
                ))
            }
            AppointmentStatus::Cancelled => {
                return Err(ClinicError::business_rule(
                    "complete appointment",
                    "cancelled appointments cannot be completed",
                ))
            }
        }

        appointment.status = AppointmentStatus::Completed;
        if let Some(notes) = optional_text(notes) {
            appointment.append_note(&notes);
        }
        appointment.modified_at = Some(self.ctx.now());

        let saved = self.ctx.repos.appointments.save(appointment)?;
        tracing::info!("completed appointment {}", saved.id);
        Ok(saved)
    }

    /// Future start, duration within bounds, and no clash.
    fn check_schedulable(
        &mut self,
        operation: &str,
        candidate: &Candidate<'_>,
        exclude_id: Option<&str>,
    ) -> ClinicResult<()> {
        let starts_at = candidate.date.and_time(candidate.start);
        if starts_at <= self.ctx.now() {
            return Err(ClinicError::business_rule(
                operation,
                "appointment must start in the future",
            ));
        }

        if !(MIN_APPOINTMENT_MINUTES..=MAX_APPOINTMENT_MINUTES)
            .contains(&candidate.duration_minutes)
        {
            return Err(ClinicError::business_rule(
                operation,
                format!(
                    "duration must be between {} and {} minutes",
                    MIN_APPOINTMENT_MINUTES, MAX_APPOINTMENT_MINUTES
                ),
            ));
        }

        let existing = self.ctx.repos.appointments.records()?;
        if let Some(clash) = find_conflict(candidate, existing, exclude_id) {
            return Err(ClinicError::business_rule(
                operation,
                format!(
                    "time slot clashes with appointment {} ({}-{})",
                    clash.id,
                    clash.start_time.format("%H:%M"),
                    clash.end_time().format("%H:%M")
                ),
            ));
        }

        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Free slots for the clinician and facility on `date`, in time order.
    pub fn available_slots(
        &mut self,
        clinician_id: &str,
        facility_id: &str,
        date: NaiveDate,
    ) -> ClinicResult<Vec<TimeSlot>> {
        let clinician_id = required_param("clinician_id", clinician_id)?;
        let facility_id = required_param("facility_id", facility_id)?;
        let hours = self.ctx.cfg.working_hours();
        let slot_minutes = self.ctx.cfg.slot_minutes();

        let existing = self.ctx.repos.appointments.records()?;
        Ok(available_slots(
            existing,
            clinician_id.as_str(),
            facility_id.as_str(),
            date,
            hours,
            slot_minutes,
        ))
    }

    /// Scheduled appointments starting within the next 24 hours, soonest first.
    pub fn reminders(&mut self) -> ClinicResult<Vec<Appointment>> {
        let now = self.ctx.now();
        let horizon = now + Duration::hours(REMINDER_WINDOW_HOURS);
        let mut due = self.ctx.repos.appointments.find_where(|a| {
            let starts_at = a.starts_at();
            a.is_scheduled() && starts_at > now && starts_at < horizon
        })?;
        due.sort_by_key(Appointment::starts_at);
        Ok(due)
    }

    pub fn for_patient(&mut self, patient_id: &str) -> ClinicResult<Vec<Appointment>> {
        self.sorted_where(|a| a.patient_id == patient_id)
    }

    pub fn for_clinician(&mut self, clinician_id: &str) -> ClinicResult<Vec<Appointment>> {
        self.sorted_where(|a| a.clinician_id == clinician_id)
    }

    pub fn for_facility(&mut self, facility_id: &str) -> ClinicResult<Vec<Appointment>> {
        self.sorted_where(|a| a.facility_id == facility_id)
    }

    pub fn on_date(&mut self, date: NaiveDate) -> ClinicResult<Vec<Appointment>> {
        self.sorted_where(|a| a.date == date)
    }

    pub fn with_status(&mut self, status: AppointmentStatus) -> ClinicResult<Vec<Appointment>> {
        self.sorted_where(|a| a.status == status)
    }

    /// Scheduled appointments that have not started yet, soonest first.
    pub fn upcoming(&mut self) -> ClinicResult<Vec<Appointment>> {
        let now = self.ctx.now();
        self.sorted_where(|a| a.is_scheduled() && a.is_upcoming(now))
    }

    pub fn statistics(&mut self) -> ClinicResult<AppointmentStatistics> {
        let now = self.ctx.now();
        let today = now.date();
        let all = self.ctx.repos.appointments.records()?;

        let mut stats = AppointmentStatistics {
            total: all.len(),
            ..Default::default()
        };
        for appt in all {
            match appt.status {
                AppointmentStatus::Scheduled => stats.scheduled += 1,
                AppointmentStatus::Completed => stats.completed += 1,
                AppointmentStatus::Cancelled => stats.cancelled += 1,
            }
            if appt.date == today {
                stats.today += 1;
            }
            if appt.is_scheduled() && appt.is_upcoming(now) {
                stats.upcoming += 1;
            }
        }
        Ok(stats)
    }

    fn sorted_where(
        &mut self,
        predicate: impl Fn(&Appointment) -> bool,
    ) -> ClinicResult<Vec<Appointment>> {
        let mut found = self.ctx.repos.appointments.find_where(predicate)?;
        found.sort_by_key(Appointment::starts_at);
        Ok(found)
    }
}
