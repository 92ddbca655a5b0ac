use super::{EntityKind, Record};
use crate::validation::require_text;
use crate::{ClinicError, ClinicResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Referral priority. Variants are declared lowest first so the derived ordering is the
/// clinical one: `NonUrgent < Routine < Urgent`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Urgency {
    #[serde(rename = "Non-urgent")]
    NonUrgent,
    Routine,
    Urgent,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::NonUrgent => "Non-urgent",
            Urgency::Routine => "Routine",
            Urgency::Urgent => "Urgent",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Non-urgent" => Ok(Urgency::NonUrgent),
            "Routine" => Ok(Urgency::Routine),
            "Urgent" => Ok(Urgency::Urgent),
            other => Err(ClinicError::validation(
                "urgency_level",
                format!("unknown urgency '{other}'"),
            )),
        }
    }
}

/// Referral workflow: `New -> In Progress -> Completed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferralStatus {
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl ReferralStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferralStatus::New => "New",
            ReferralStatus::InProgress => "In Progress",
            ReferralStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferralStatus {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "New" => Ok(ReferralStatus::New),
            "In Progress" => Ok(ReferralStatus::InProgress),
            "Completed" => Ok(ReferralStatus::Completed),
            other => Err(ClinicError::validation(
                "status",
                format!("unknown referral status '{other}'"),
            )),
        }
    }
}

/// A request for a patient to be seen by another clinician at another facility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Referral {
    pub id: String,
    pub patient_id: String,
    pub referring_clinician_id: String,
    pub referred_to_clinician_id: String,
    pub referring_facility_id: String,
    pub referred_to_facility_id: String,
    pub referral_date: NaiveDate,
    pub urgency: Urgency,
    pub reason: String,
    pub clinical_summary: Option<String>,
    pub requested_investigations: Option<String>,
    pub status: ReferralStatus,
    pub appointment_id: Option<String>,
    pub notes: Option<String>,
    pub created_date: Option<NaiveDate>,
    pub last_updated: Option<NaiveDate>,
}

impl Referral {
    /// Days elapsed since the referral date; negative for future-dated referrals.
    pub fn days_since_referral(&self, today: NaiveDate) -> i64 {
        (today - self.referral_date).num_days()
    }

    pub fn is_open(&self) -> bool {
        self.status != ReferralStatus::Completed
    }

    /// Open and older than `threshold_days`.
    pub fn is_overdue(&self, today: NaiveDate, threshold_days: i64) -> bool {
        self.is_open() && self.days_since_referral(today) > threshold_days
    }

    pub fn append_note(&mut self, note: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.trim().is_empty() => format!("{existing}; {note}"),
            _ => note.to_string(),
        });
    }
}

impl Record for Referral {
    type Row = ReferralRow;

    const KIND: EntityKind = EntityKind::Referral;

    const HEADER: &'static [&'static str] = &[
        "referral_id",
        "patient_id",
        "referring_clinician_id",
        "referred_to_clinician_id",
        "referring_facility_id",
        "referred_to_facility_id",
        "referral_date",
        "urgency_level",
        "referral_reason",
        "clinical_summary",
        "requested_investigations",
        "status",
        "appointment_id",
        "notes",
        "created_date",
        "last_updated",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> ClinicResult<()> {
        require_text("referral_id", &self.id)?;
        require_text("patient_id", &self.patient_id)?;
        require_text("referring_clinician_id", &self.referring_clinician_id)?;
        require_text("referred_to_clinician_id", &self.referred_to_clinician_id)?;
        require_text("referring_facility_id", &self.referring_facility_id)?;
        require_text("referred_to_facility_id", &self.referred_to_facility_id)?;
        require_text("referral_reason", &self.reason)?;
        Ok(())
    }

    fn to_row(&self) -> ReferralRow {
        ReferralRow {
            referral_id: Some(self.id.clone()),
            patient_id: Some(self.patient_id.clone()),
            referring_clinician_id: Some(self.referring_clinician_id.clone()),
            referred_to_clinician_id: Some(self.referred_to_clinician_id.clone()),
            referring_facility_id: Some(self.referring_facility_id.clone()),
            referred_to_facility_id: Some(self.referred_to_facility_id.clone()),
            referral_date: Some(self.referral_date),
            urgency_level: Some(self.urgency),
            referral_reason: Some(self.reason.clone()),
            clinical_summary: self.clinical_summary.clone(),
            requested_investigations: self.requested_investigations.clone(),
            status: Some(self.status),
            appointment_id: self.appointment_id.clone(),
            notes: self.notes.clone(),
            created_date: self.created_date,
            last_updated: self.last_updated,
        }
    }

    fn from_row(row: ReferralRow) -> Option<Self> {
        Some(Self {
            id: row.referral_id?,
            patient_id: row.patient_id?,
            referring_clinician_id: row.referring_clinician_id?,
            referred_to_clinician_id: row.referred_to_clinician_id?,
            referring_facility_id: row.referring_facility_id?,
            referred_to_facility_id: row.referred_to_facility_id?,
            referral_date: row.referral_date?,
            urgency: row.urgency_level?,
            reason: row.referral_reason?,
            clinical_summary: row.clinical_summary,
            requested_investigations: row.requested_investigations,
            status: row.status?,
            appointment_id: row.appointment_id,
            notes: row.notes,
            created_date: row.created_date,
            last_updated: row.last_updated,
        })
    }
}

/// CSV row for `referrals.csv`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReferralRow {
    referral_id: Option<String>,
    patient_id: Option<String>,
    referring_clinician_id: Option<String>,
    referred_to_clinician_id: Option<String>,
    referring_facility_id: Option<String>,
    referred_to_facility_id: Option<String>,
    referral_date: Option<NaiveDate>,
    urgency_level: Option<Urgency>,
    referral_reason: Option<String>,
    clinical_summary: Option<String>,
    requested_investigations: Option<String>,
    status: Option<ReferralStatus>,
    appointment_id: Option<String>,
    notes: Option<String>,
    created_date: Option<NaiveDate>,
    last_updated: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(referral_date: NaiveDate) -> Referral {
        Referral {
            id: "R001".into(),
            patient_id: "P001".into(),
            referring_clinician_id: "C001".into(),
            referred_to_clinician_id: "C002".into(),
            referring_facility_id: "F001".into(),
            referred_to_facility_id: "F002".into(),
            referral_date,
            urgency: Urgency::Routine,
            reason: "Persistent chest pain".into(),
            clinical_summary: None,
            requested_investigations: Some("ECG".into()),
            status: ReferralStatus::New,
            appointment_id: None,
            notes: None,
            created_date: Some(referral_date),
            last_updated: Some(referral_date),
        }
    }

    #[test]
    fn test_urgency_ordering() {
        assert!(Urgency::Urgent > Urgency::Routine);
        assert!(Urgency::Routine > Urgency::NonUrgent);
        assert_eq!("Non-urgent".parse::<Urgency>().unwrap(), Urgency::NonUrgent);
    }

    #[test]
    fn test_overdue_after_thirty_days_unless_completed() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut referral = sample(date);
        let day_30 = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let day_31 = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        assert!(!referral.is_overdue(day_30, 30));
        assert!(referral.is_overdue(day_31, 30));

        referral.status = ReferralStatus::Completed;
        assert!(!referral.is_overdue(day_31, 30));
    }

    #[test]
    fn test_status_parse_with_space() {
        assert_eq!(
            "In Progress".parse::<ReferralStatus>().unwrap(),
            ReferralStatus::InProgress
        );
    }
}
