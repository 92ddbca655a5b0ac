use super::{display_name, whole_years_between, EntityKind, Record};
use crate::validation::{require_text, tidy, tidy_optional};
use crate::ClinicResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A registered patient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// National health identifier; unique across the store.
    pub national_id: String,
    pub gender: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub registration_date: Option<NaiveDate>,
    /// Facility acting as the patient's GP surgery.
    pub gp_facility_id: Option<String>,
}

impl Patient {
    /// Trims the id and text fields in place, dropping optional fields left blank.
    pub fn tidy(&mut self) {
        for field in [
            &mut self.id,
            &mut self.first_name,
            &mut self.last_name,
            &mut self.national_id,
            &mut self.gender,
        ] {
            tidy(field);
        }
        for field in [
            &mut self.phone_number,
            &mut self.email,
            &mut self.address,
            &mut self.postcode,
            &mut self.emergency_contact_name,
            &mut self.emergency_contact_phone,
            &mut self.gp_facility_id,
        ] {
            tidy_optional(field);
        }
    }

    pub fn full_name(&self) -> String {
        display_name(&[&self.first_name, &self.last_name])
    }

    /// Age in whole years on `today`.
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        whole_years_between(self.date_of_birth, today)
    }
}

impl Record for Patient {
    type Row = PatientRow;

    const KIND: EntityKind = EntityKind::Patient;

    const HEADER: &'static [&'static str] = &[
        "patient_id",
        "first_name",
        "last_name",
        "date_of_birth",
        "nhs_number",
        "gender",
        "phone_number",
        "email",
        "address",
        "postcode",
        "emergency_contact_name",
        "emergency_contact_phone",
        "registration_date",
        "gp_surgery_id",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> ClinicResult<()> {
        require_text("patient_id", &self.id)?;
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        require_text("nhs_number", &self.national_id)?;
        require_text("gender", &self.gender)?;
        Ok(())
    }

    fn to_row(&self) -> PatientRow {
        PatientRow {
            patient_id: Some(self.id.clone()),
            first_name: Some(self.first_name.clone()),
            last_name: Some(self.last_name.clone()),
            date_of_birth: Some(self.date_of_birth),
            nhs_number: Some(self.national_id.clone()),
            gender: Some(self.gender.clone()),
            phone_number: self.phone_number.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            postcode: self.postcode.clone(),
            emergency_contact_name: self.emergency_contact_name.clone(),
            emergency_contact_phone: self.emergency_contact_phone.clone(),
            registration_date: self.registration_date,
            gp_surgery_id: self.gp_facility_id.clone(),
        }
    }

    fn from_row(row: PatientRow) -> Option<Self> {
        Some(Self {
            id: row.patient_id?,
            first_name: row.first_name?,
            last_name: row.last_name?,
            date_of_birth: row.date_of_birth?,
            national_id: row.nhs_number?,
            gender: row.gender?,
            phone_number: row.phone_number,
            email: row.email,
            address: row.address,
            postcode: row.postcode,
            emergency_contact_name: row.emergency_contact_name,
            emergency_contact_phone: row.emergency_contact_phone,
            registration_date: row.registration_date,
            gp_facility_id: row.gp_surgery_id,
        })
    }
}

/// CSV row for `patients.csv`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PatientRow {
    patient_id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    date_of_birth: Option<NaiveDate>,
    nhs_number: Option<String>,
    gender: Option<String>,
    phone_number: Option<String>,
    email: Option<String>,
    address: Option<String>,
    postcode: Option<String>,
    emergency_contact_name: Option<String>,
    emergency_contact_phone: Option<String>,
    registration_date: Option<NaiveDate>,
    gp_surgery_id: Option<String>,
}
