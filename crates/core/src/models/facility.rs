use super::{EntityKind, Record};
use crate::constants::SPECIALITY_SEPARATOR;
use crate::validation::{require_positive, require_text, tidy, tidy_optional};
use crate::{ClinicError, ClinicResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of care site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilityType {
    Hospital,
    Clinic,
    #[serde(rename = "GP Surgery")]
    GpSurgery,
}

impl FacilityType {
    pub fn as_str(self) -> &'static str {
        match self {
            FacilityType::Hospital => "Hospital",
            FacilityType::Clinic => "Clinic",
            FacilityType::GpSurgery => "GP Surgery",
        }
    }
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacilityType {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Hospital" => Ok(FacilityType::Hospital),
            "Clinic" => Ok(FacilityType::Clinic),
            "GP Surgery" => Ok(FacilityType::GpSurgery),
            other => Err(ClinicError::validation(
                "facility_type",
                format!("unknown facility type '{other}'"),
            )),
        }
    }
}

/// A hospital, clinic or GP surgery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Facility {
    pub id: String,
    pub name: String,
    pub facility_type: FacilityType,
    pub address: String,
    pub postcode: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub opening_hours: Option<String>,
    pub manager_name: Option<String>,
    pub capacity: u32,
    pub specialities: Vec<String>,
}

impl Facility {
    /// Trims the id and text fields in place, dropping optional fields and specialities
    /// left blank.
    pub fn tidy(&mut self) {
        for field in [
            &mut self.id,
            &mut self.name,
            &mut self.address,
            &mut self.postcode,
        ] {
            tidy(field);
        }
        for field in [
            &mut self.phone_number,
            &mut self.email,
            &mut self.opening_hours,
            &mut self.manager_name,
        ] {
            tidy_optional(field);
        }
        self.specialities.iter_mut().for_each(tidy);
        self.specialities.retain(|s| !s.is_empty());
    }

    pub fn offers_speciality(&self, speciality: &str) -> bool {
        self.specialities.iter().any(|s| s == speciality)
    }

    pub fn is_open_all_hours(&self) -> bool {
        self.opening_hours
            .as_deref()
            .is_some_and(|hours| hours.contains("24/7"))
    }
}

/// Splits the `|`-delimited speciality column.
fn split_specialities(raw: Option<String>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(SPECIALITY_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn join_specialities(specialities: &[String]) -> Option<String> {
    if specialities.is_empty() {
        None
    } else {
        Some(specialities.join(&SPECIALITY_SEPARATOR.to_string()))
    }
}

impl Record for Facility {
    type Row = FacilityRow;

    const KIND: EntityKind = EntityKind::Facility;

    const HEADER: &'static [&'static str] = &[
        "facility_id",
        "facility_name",
        "facility_type",
        "address",
        "postcode",
        "phone_number",
        "email",
        "opening_hours",
        "manager_name",
        "capacity",
        "specialities_offered",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> ClinicResult<()> {
        require_text("facility_id", &self.id)?;
        require_text("facility_name", &self.name)?;
        require_text("address", &self.address)?;
        require_text("postcode", &self.postcode)?;
        require_positive("capacity", self.capacity)?;
        if let Some(bad) = self
            .specialities
            .iter()
            .find(|s| s.contains(SPECIALITY_SEPARATOR))
        {
            return Err(ClinicError::validation(
                "specialities_offered",
                format!("'{bad}' contains the list separator '{SPECIALITY_SEPARATOR}'"),
            ));
        }
        Ok(())
    }

    fn to_row(&self) -> FacilityRow {
        FacilityRow {
            facility_id: Some(self.id.clone()),
            facility_name: Some(self.name.clone()),
            facility_type: Some(self.facility_type),
            address: Some(self.address.clone()),
            postcode: Some(self.postcode.clone()),
            phone_number: self.phone_number.clone(),
            email: self.email.clone(),
            opening_hours: self.opening_hours.clone(),
            manager_name: self.manager_name.clone(),
            capacity: Some(self.capacity),
            specialities_offered: join_specialities(&self.specialities),
        }
    }

    fn from_row(row: FacilityRow) -> Option<Self> {
        Some(Self {
            id: row.facility_id?,
            name: row.facility_name?,
            facility_type: row.facility_type?,
            address: row.address?,
            postcode: row.postcode?,
            phone_number: row.phone_number,
            email: row.email,
            opening_hours: row.opening_hours,
            manager_name: row.manager_name,
            capacity: row.capacity?,
            specialities: split_specialities(row.specialities_offered),
        })
    }
}

/// CSV row for `facilities.csv`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FacilityRow {
    facility_id: Option<String>,
    facility_name: Option<String>,
    facility_type: Option<FacilityType>,
    address: Option<String>,
    postcode: Option<String>,
    phone_number: Option<String>,
    email: Option<String>,
    opening_hours: Option<String>,
    manager_name: Option<String>,
    capacity: Option<u32>,
    specialities_offered: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Facility {
        Facility {
            id: "F001".into(),
            name: "Riverside Hospital".into(),
            facility_type: FacilityType::Hospital,
            address: "2 River Road".into(),
            postcode: "CF11 2BB".into(),
            phone_number: None,
            email: None,
            opening_hours: Some("24/7".into()),
            manager_name: Some("A. Jones".into()),
            capacity: 250,
            specialities: vec!["Cardiology".into(), "Oncology".into()],
        }
    }

    #[test]
    fn test_speciality_list_round_trips_through_row() {
        let facility = sample();
        let row = facility.to_row();
        assert_eq!(
            row.specialities_offered.as_deref(),
            Some("Cardiology|Oncology")
        );
        let back = Facility::from_row(row).expect("complete row");
        assert_eq!(back, facility);
        assert!(back.offers_speciality("Oncology"));
        assert!(!back.offers_speciality("Dermatology"));
    }

    #[test]
    fn test_capacity_must_be_positive() {
        let mut facility = sample();
        facility.capacity = 0;
        let err = facility.validate().unwrap_err();
        assert!(matches!(err, ClinicError::Validation { ref field, .. } if field == "capacity"));
    }

    #[test]
    fn test_speciality_with_separator_is_rejected() {
        let mut facility = sample();
        facility.specialities.push("Ear|Nose".into());
        let err = facility.validate().unwrap_err();
        assert!(
            matches!(err, ClinicError::Validation { ref field, .. } if field == "specialities_offered")
        );
    }

    #[test]
    fn test_tidy_trims_fields_and_drops_blank_specialities() {
        let mut facility = sample();
        facility.id = " F001 ".into();
        facility.name = "Riverside Hospital\n".into();
        facility.email = Some("  ".into());
        facility.specialities = vec![" Cardiology".into(), " ".into()];
        facility.tidy();
        assert_eq!(facility.id, "F001");
        assert_eq!(facility.name, "Riverside Hospital");
        assert_eq!(facility.email, None);
        assert_eq!(facility.specialities, vec!["Cardiology".to_string()]);
    }

    #[test]
    fn test_facility_type_parsing() {
        assert_eq!(
            "GP Surgery".parse::<FacilityType>().unwrap(),
            FacilityType::GpSurgery
        );
        assert!("Pharmacy".parse::<FacilityType>().is_err());
        assert!(sample().is_open_all_hours());
    }
}
