#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clinic_core::{
    BookingRequest, Clinic, Clinician, CoreConfig, Facility, FacilityType, FixedClock, Patient,
    Staff,
};
use std::sync::Arc;
use tempfile::TempDir;

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, 0))
        .expect("valid timestamp")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

/// Opens a clinic over `temp_dir` with the clock pinned at `now`.
pub fn open_at(temp_dir: &TempDir, now: NaiveDateTime) -> Clinic {
    let cfg = CoreConfig::new(temp_dir.path().to_path_buf()).expect("config");
    Clinic::with_clock(Arc::new(cfg), Arc::new(FixedClock::new(now))).expect("open clinic")
}

pub fn facility(id: &str, facility_type: FacilityType) -> Facility {
    Facility {
        id: id.into(),
        name: format!("Facility {id}"),
        facility_type,
        address: "1 Infirmary Street, Leeds".into(),
        postcode: "LS1 2AB".into(),
        phone_number: None,
        email: None,
        opening_hours: Some("24/7".into()),
        manager_name: Some("Jane Doe".into()),
        capacity: 250,
        specialities: vec!["Cardiology".into(), "General Practice".into()],
    }
}

pub fn clinician(id: &str, speciality: &str, workplace_id: &str) -> Clinician {
    Clinician {
        id: id.into(),
        first_name: "David".into(),
        last_name: "Jones".into(),
        title: "Dr".into(),
        speciality: speciality.into(),
        registration_number: Some("6012345".into()),
        phone_number: Some("0113 496 0100".into()),
        email: Some("d.jones@nhs.example".into()),
        workplace_id: workplace_id.into(),
        workplace_type: FacilityType::Hospital,
        employment_status: Some("Full-time".into()),
        start_date: Some(date(2012, 9, 1)),
    }
}

pub fn patient(id: &str, national_id: &str) -> Patient {
    Patient {
        id: id.into(),
        first_name: "John".into(),
        last_name: "Smith".into(),
        date_of_birth: date(1985, 3, 15),
        national_id: national_id.into(),
        gender: "M".into(),
        phone_number: Some("07700 900456".into()),
        email: None,
        address: Some("Flat 2, \"The Maltings\", Leeds".into()),
        postcode: Some("LS6 1AA".into()),
        emergency_contact_name: Some("Mary Smith".into()),
        emergency_contact_phone: None,
        registration_date: Some(date(2015, 6, 1)),
        gp_facility_id: Some("F001".into()),
    }
}

pub fn staff(id: &str, facility_id: &str) -> Staff {
    Staff {
        id: id.into(),
        first_name: "Priya".into(),
        last_name: "Shah".into(),
        role: "Practice Manager".into(),
        department: "Administration".into(),
        facility_id: facility_id.into(),
        phone_number: None,
        email: Some("p.shah@nhs.example".into()),
        employment_status: "Full-time".into(),
        start_date: Some(date(2019, 4, 1)),
        line_manager: None,
        access_level: "Manager".into(),
    }
}

/// F001 surgery and F002 hospital, GP C001 at F001, cardiologist C002 at F002, patients
/// P001 and P002.
pub fn seed(clinic: &mut Clinic) {
    let repos = clinic.repositories_mut();
    repos
        .facilities
        .save(facility("F001", FacilityType::GpSurgery))
        .expect("F001");
    repos
        .facilities
        .save(facility("F002", FacilityType::Hospital))
        .expect("F002");
    repos
        .clinicians
        .save(clinician("C001", "General Practice", "F001"))
        .expect("C001");
    repos
        .clinicians
        .save(clinician("C002", "Cardiology", "F002"))
        .expect("C002");
    repos
        .patients
        .save(patient("P001", "4857773456"))
        .expect("P001");
    repos
        .patients
        .save(patient("P002", "9434765919"))
        .expect("P002");
}

pub fn booking(clinician_id: &str, facility_id: &str, on: NaiveDate, start: NaiveTime) -> BookingRequest {
    BookingRequest {
        patient_id: "P001".into(),
        clinician_id: clinician_id.into(),
        facility_id: facility_id.into(),
        date: on,
        start_time: start,
        duration_minutes: 15,
        appointment_type: "Consultation".into(),
        reason: Some("Follow-up".into()),
    }
}
