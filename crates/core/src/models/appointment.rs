use super::{EntityKind, Record};
use crate::csv_format::{optional_datetime, optional_time};
use crate::scheduling::TimeRange;
use crate::validation::{require_positive, require_text};
use crate::{ClinicError, ClinicResult};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Appointment lifecycle. `Completed` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Scheduled" => Ok(AppointmentStatus::Scheduled),
            "Completed" => Ok(AppointmentStatus::Completed),
            "Cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(ClinicError::validation(
                "status",
                format!("unknown appointment status '{other}'"),
            )),
        }
    }
}

/// A booked consultation slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub clinician_id: String,
    pub facility_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub appointment_type: String,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub modified_at: Option<NaiveDateTime>,
}

impl Appointment {
    /// Start time plus duration. Wraps past midnight; conflict checks use
    /// [`Appointment::time_range`], which does not.
    pub fn end_time(&self) -> NaiveTime {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::starting_at(self.start_time, self.duration_minutes)
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }

    pub fn is_upcoming(&self, now: NaiveDateTime) -> bool {
        self.starts_at() > now
    }

    /// Appends `note` to the notes column, separated by `"; "`.
    pub fn append_note(&mut self, note: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.trim().is_empty() => format!("{existing}; {note}"),
            _ => note.to_string(),
        });
    }
}

impl Record for Appointment {
    type Row = AppointmentRow;

    const KIND: EntityKind = EntityKind::Appointment;

    const HEADER: &'static [&'static str] = &[
        "appointment_id",
        "patient_id",
        "clinician_id",
        "facility_id",
        "appointment_date",
        "appointment_time",
        "duration_minutes",
        "appointment_type",
        "status",
        "reason_for_visit",
        "notes",
        "created_date",
        "last_modified",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> ClinicResult<()> {
        require_text("appointment_id", &self.id)?;
        require_text("patient_id", &self.patient_id)?;
        require_text("clinician_id", &self.clinician_id)?;
        require_text("facility_id", &self.facility_id)?;
        require_positive("duration_minutes", self.duration_minutes)?;
        require_text("appointment_type", &self.appointment_type)?;
        Ok(())
    }

    fn to_row(&self) -> AppointmentRow {
        AppointmentRow {
            appointment_id: Some(self.id.clone()),
            patient_id: Some(self.patient_id.clone()),
            clinician_id: Some(self.clinician_id.clone()),
            facility_id: Some(self.facility_id.clone()),
            appointment_date: Some(self.date),
            appointment_time: Some(self.start_time),
            duration_minutes: Some(self.duration_minutes),
            appointment_type: Some(self.appointment_type.clone()),
            status: Some(self.status),
            reason_for_visit: self.reason.clone(),
            notes: self.notes.clone(),
            created_date: self.created_at,
            last_modified: self.modified_at,
        }
    }

    fn from_row(row: AppointmentRow) -> Option<Self> {
        Some(Self {
            id: row.appointment_id?,
            patient_id: row.patient_id?,
            clinician_id: row.clinician_id?,
            facility_id: row.facility_id?,
            date: row.appointment_date?,
            start_time: row.appointment_time?,
            duration_minutes: row.duration_minutes?,
            appointment_type: row.appointment_type?,
            status: row.status?,
            reason: row.reason_for_visit,
            notes: row.notes,
            created_at: row.created_date,
            modified_at: row.last_modified,
        })
    }
}

/// CSV row for `appointments.csv`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AppointmentRow {
    appointment_id: Option<String>,
    patient_id: Option<String>,
    clinician_id: Option<String>,
    facility_id: Option<String>,
    appointment_date: Option<NaiveDate>,
    #[serde(with = "optional_time")]
    appointment_time: Option<NaiveTime>,
    duration_minutes: Option<u32>,
    appointment_type: Option<String>,
    status: Option<AppointmentStatus>,
    reason_for_visit: Option<String>,
    notes: Option<String>,
    #[serde(with = "optional_datetime")]
    created_date: Option<NaiveDateTime>,
    #[serde(with = "optional_datetime")]
    last_modified: Option<NaiveDateTime>,
}
