//! Fixtures shared by the unit tests.

use crate::models::{Clinician, Facility, FacilityType, Patient, Staff};
use crate::Clinic;
use chrono::{NaiveDate, NaiveDateTime};

pub(crate) fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, 0))
        .expect("valid test timestamp")
}

pub(crate) fn facility(id: &str, facility_type: FacilityType) -> Facility {
    Facility {
        id: id.into(),
        name: format!("{facility_type} {id}"),
        facility_type,
        address: "1 High Street, Leeds".into(),
        postcode: "LS1 1AA".into(),
        phone_number: Some("0113 496 0000".into()),
        email: None,
        opening_hours: Some("Mon-Fri 08:00-18:00".into()),
        manager_name: None,
        capacity: 120,
        specialities: vec!["General Practice".into(), "Cardiology".into()],
    }
}

pub(crate) fn clinician(id: &str, workplace_id: &str) -> Clinician {
    Clinician {
        id: id.into(),
        first_name: "Sarah".into(),
        last_name: "Patel".into(),
        title: "Dr".into(),
        speciality: "Cardiology".into(),
        registration_number: Some("7123456".into()),
        phone_number: None,
        email: None,
        workplace_id: workplace_id.into(),
        workplace_type: FacilityType::Hospital,
        employment_status: Some("Full-time".into()),
        start_date: NaiveDate::from_ymd_opt(2015, 8, 1),
    }
}

pub(crate) fn patient(id: &str, first: &str, last: &str, national_id: &str) -> Patient {
    Patient {
        id: id.into(),
        first_name: first.into(),
        last_name: last.into(),
        date_of_birth: NaiveDate::from_ymd_opt(1985, 3, 15).expect("valid date"),
        national_id: national_id.into(),
        gender: "F".into(),
        phone_number: Some("07700 900123".into()),
        email: None,
        address: Some("12 Park Lane, Leeds".into()),
        postcode: Some("LS2 7AB".into()),
        emergency_contact_name: None,
        emergency_contact_phone: None,
        registration_date: NaiveDate::from_ymd_opt(2010, 1, 4),
        gp_facility_id: Some("F001".into()),
    }
}

pub(crate) fn staff(id: &str, facility_id: &str) -> Staff {
    Staff {
        id: id.into(),
        first_name: "Emma".into(),
        last_name: "Wilson".into(),
        role: "Receptionist".into(),
        department: "Front Desk".into(),
        facility_id: facility_id.into(),
        phone_number: None,
        email: None,
        employment_status: "Part-time".into(),
        start_date: NaiveDate::from_ymd_opt(2021, 5, 4),
        line_manager: None,
        access_level: "Standard".into(),
    }
}

/// Two facilities (F001 surgery, F002 hospital), a GP and a cardiologist, two patients.
pub(crate) fn seed_directory(clinic: &mut Clinic) {
    let repos = clinic.repositories_mut();
    repos
        .facilities
        .save(facility("F001", FacilityType::GpSurgery))
        .expect("seed F001");
    repos
        .facilities
        .save(facility("F002", FacilityType::Hospital))
        .expect("seed F002");

    let mut gp = clinician("C001", "F001");
    gp.speciality = "General Practice".into();
    gp.workplace_type = FacilityType::GpSurgery;
    repos.clinicians.save(gp).expect("seed C001");
    repos
        .clinicians
        .save(clinician("C002", "F002"))
        .expect("seed C002");

    repos
        .patients
        .save(patient("P001", "John", "Smith", "4857773456"))
        .expect("seed P001");
    repos
        .patients
        .save(patient("P002", "Sarah", "Johnson", "9434765919"))
        .expect("seed P002");
}
