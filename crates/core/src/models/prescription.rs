use super::{EntityKind, Record};
use crate::validation::{require_positive, require_text};
use crate::{ClinicError, ClinicResult};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prescription lifecycle. Only `Issued` prescriptions may be collected or cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrescriptionStatus {
    Issued,
    Collected,
    Cancelled,
}

impl PrescriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PrescriptionStatus::Issued => "Issued",
            PrescriptionStatus::Collected => "Collected",
            PrescriptionStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrescriptionStatus {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Issued" => Ok(PrescriptionStatus::Issued),
            "Collected" => Ok(PrescriptionStatus::Collected),
            "Cancelled" => Ok(PrescriptionStatus::Cancelled),
            other => Err(ClinicError::validation(
                "status",
                format!("unknown prescription status '{other}'"),
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prescription {
    pub id: String,
    pub patient_id: String,
    pub clinician_id: String,
    pub appointment_id: Option<String>,
    pub prescription_date: NaiveDate,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: u32,
    pub quantity: u32,
    pub instructions: Option<String>,
    pub pharmacy_name: String,
    pub status: PrescriptionStatus,
    pub issue_date: Option<NaiveDate>,
    pub collection_date: Option<NaiveDate>,
}

impl Prescription {
    /// Issue date plus duration; `None` while the prescription has no issue date.
    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.issue_date?
            .checked_add_days(Days::new(u64::from(self.duration_days)))
    }

    /// Expired once `today` is strictly after the expiry date.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date().is_some_and(|expiry| today > expiry)
    }

    /// Issued, not yet collected, and still within its validity period.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.status == PrescriptionStatus::Issued && !self.is_expired(today)
    }

    pub fn append_instruction(&mut self, text: &str) {
        self.instructions = Some(match self.instructions.take() {
            Some(existing) if !existing.trim().is_empty() => format!("{existing}; {text}"),
            _ => text.to_string(),
        });
    }
}

/// Doses per day implied by a free-text frequency such as "twice daily".
///
/// Anything unrecognised counts as once a day.
pub fn daily_dose_count(frequency: &str) -> u32 {
    let frequency = frequency.to_lowercase();
    if frequency.contains("twice") || frequency.contains("two") {
        2
    } else if frequency.contains("three") {
        3
    } else if frequency.contains("four") {
        4
    } else {
        1
    }
}

impl Record for Prescription {
    type Row = PrescriptionRow;

    const KIND: EntityKind = EntityKind::Prescription;

    const HEADER: &'static [&'static str] = &[
        "prescription_id",
        "patient_id",
        "clinician_id",
        "appointment_id",
        "prescription_date",
        "medication_name",
        "dosage",
        "frequency",
        "duration_days",
        "quantity",
        "instructions",
        "pharmacy_name",
        "status",
        "issue_date",
        "collection_date",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> ClinicResult<()> {
        require_text("prescription_id", &self.id)?;
        require_text("patient_id", &self.patient_id)?;
        require_text("clinician_id", &self.clinician_id)?;
        require_text("medication_name", &self.medication_name)?;
        require_text("dosage", &self.dosage)?;
        require_text("frequency", &self.frequency)?;
        require_positive("duration_days", self.duration_days)?;
        require_positive("quantity", self.quantity)?;
        require_text("pharmacy_name", &self.pharmacy_name)?;
        Ok(())
    }

    fn to_row(&self) -> PrescriptionRow {
        PrescriptionRow {
            prescription_id: Some(self.id.clone()),
            patient_id: Some(self.patient_id.clone()),
            clinician_id: Some(self.clinician_id.clone()),
            appointment_id: self.appointment_id.clone(),
            prescription_date: Some(self.prescription_date),
            medication_name: Some(self.medication_name.clone()),
            dosage: Some(self.dosage.clone()),
            frequency: Some(self.frequency.clone()),
            duration_days: Some(self.duration_days),
            quantity: Some(self.quantity),
            instructions: self.instructions.clone(),
            pharmacy_name: Some(self.pharmacy_name.clone()),
            status: Some(self.status),
            issue_date: self.issue_date,
            collection_date: self.collection_date,
        }
    }

    fn from_row(row: PrescriptionRow) -> Option<Self> {
        Some(Self {
            id: row.prescription_id?,
            patient_id: row.patient_id?,
            clinician_id: row.clinician_id?,
            appointment_id: row.appointment_id,
            prescription_date: row.prescription_date?,
            medication_name: row.medication_name?,
            dosage: row.dosage?,
            frequency: row.frequency?,
            duration_days: row.duration_days?,
            quantity: row.quantity?,
            instructions: row.instructions,
            pharmacy_name: row.pharmacy_name?,
            status: row.status?,
            issue_date: row.issue_date,
            collection_date: row.collection_date,
        })
    }
}

/// CSV row for `prescriptions.csv`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PrescriptionRow {
    prescription_id: Option<String>,
    patient_id: Option<String>,
    clinician_id: Option<String>,
    appointment_id: Option<String>,
    prescription_date: Option<NaiveDate>,
    medication_name: Option<String>,
    dosage: Option<String>,
    frequency: Option<String>,
    duration_days: Option<u32>,
    quantity: Option<u32>,
    instructions: Option<String>,
    pharmacy_name: Option<String>,
    status: Option<PrescriptionStatus>,
    issue_date: Option<NaiveDate>,
    collection_date: Option<NaiveDate>,
}
