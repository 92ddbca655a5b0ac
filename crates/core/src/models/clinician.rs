use super::{display_name, whole_years_between, EntityKind, FacilityType, Record};
use crate::validation::{require_text, tidy, tidy_optional};
use crate::ClinicResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A doctor, nurse or other practitioner attached to a facility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clinician {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub speciality: String,
    /// Professional registration number.
    pub registration_number: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub workplace_id: String,
    pub workplace_type: FacilityType,
    pub employment_status: Option<String>,
    pub start_date: Option<NaiveDate>,
}

impl Clinician {
    /// Trims the id and text fields in place, dropping optional fields left blank.
    pub fn tidy(&mut self) {
        for field in [
            &mut self.id,
            &mut self.first_name,
            &mut self.last_name,
            &mut self.title,
            &mut self.speciality,
            &mut self.workplace_id,
        ] {
            tidy(field);
        }
        for field in [
            &mut self.registration_number,
            &mut self.phone_number,
            &mut self.email,
            &mut self.employment_status,
        ] {
            tidy_optional(field);
        }
    }

    pub fn full_name(&self) -> String {
        display_name(&[&self.title, &self.first_name, &self.last_name])
    }

    pub fn years_of_service(&self, today: NaiveDate) -> u32 {
        self.start_date
            .map(|start| whole_years_between(start, today))
            .unwrap_or(0)
    }

    pub fn is_full_time(&self) -> bool {
        self.employment_status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("Full-time"))
    }
}

impl Record for Clinician {
    type Row = ClinicianRow;

    const KIND: EntityKind = EntityKind::Clinician;

    const HEADER: &'static [&'static str] = &[
        "clinician_id",
        "first_name",
        "last_name",
        "title",
        "speciality",
        "gmc_number",
        "phone_number",
        "email",
        "workplace_id",
        "workplace_type",
        "employment_status",
        "start_date",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> ClinicResult<()> {
        require_text("clinician_id", &self.id)?;
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        require_text("title", &self.title)?;
        require_text("speciality", &self.speciality)?;
        require_text("workplace_id", &self.workplace_id)?;
        Ok(())
    }

    fn to_row(&self) -> ClinicianRow {
        ClinicianRow {
            clinician_id: Some(self.id.clone()),
            first_name: Some(self.first_name.clone()),
            last_name: Some(self.last_name.clone()),
            title: Some(self.title.clone()),
            speciality: Some(self.speciality.clone()),
            gmc_number: self.registration_number.clone(),
            phone_number: self.phone_number.clone(),
            email: self.email.clone(),
            workplace_id: Some(self.workplace_id.clone()),
            workplace_type: Some(self.workplace_type),
            employment_status: self.employment_status.clone(),
            start_date: self.start_date,
        }
    }

    fn from_row(row: ClinicianRow) -> Option<Self> {
        Some(Self {
            id: row.clinician_id?,
            first_name: row.first_name?,
            last_name: row.last_name?,
            title: row.title?,
            speciality: row.speciality?,
            registration_number: row.gmc_number,
            phone_number: row.phone_number,
            email: row.email,
            workplace_id: row.workplace_id?,
            workplace_type: row.workplace_type?,
            employment_status: row.employment_status,
            start_date: row.start_date,
        })
    }
}

/// CSV row for `clinicians.csv`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClinicianRow {
    clinician_id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    title: Option<String>,
    speciality: Option<String>,
    gmc_number: Option<String>,
    phone_number: Option<String>,
    email: Option<String>,
    workplace_id: Option<String>,
    workplace_type: Option<FacilityType>,
    employment_status: Option<String>,
    start_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Clinician {
        Clinician {
            id: "C001".into(),
            first_name: "Sarah".into(),
            last_name: "Patel".into(),
            title: "Dr".into(),
            speciality: "General Practice".into(),
            registration_number: Some("GMC123456".into()),
            phone_number: None,
            email: Some("s.patel@example.org".into()),
            workplace_id: "F001".into(),
            workplace_type: FacilityType::GpSurgery,
            employment_status: Some("Full-time".into()),
            start_date: NaiveDate::from_ymd_opt(2015, 9, 1),
        }
    }

    #[test]
    fn test_years_of_service() {
        let clinician = sample();
        let today = NaiveDate::from_ymd_opt(2025, 8, 31).unwrap();
        assert_eq!(clinician.years_of_service(today), 9);
        assert!(clinician.is_full_time());
    }

    #[test]
    fn test_validate_requires_workplace() {
        let mut clinician = sample();
        clinician.workplace_id.clear();
        assert!(!clinician.is_valid());
    }

    #[test]
    fn test_full_name_includes_title() {
        assert_eq!(sample().full_name(), "Dr Sarah Patel");
    }
}
