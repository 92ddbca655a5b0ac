//! Facilities, clinicians and staff.
//!
//! Registration follows the patient rules: a blank id is allocated, an id already in use is
//! refused, and every workplace reference must resolve.

use super::{ensure_id, log_rejection, refuse_duplicate, require_exists, ServiceContext};
use crate::ids::{CLINICIAN_ID_PREFIX, FACILITY_ID_PREFIX, STAFF_ID_PREFIX};
use crate::models::{Clinician, Facility, FacilityType, Record, Staff};
use crate::{ClinicError, ClinicResult};

pub struct DirectoryService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> DirectoryService<'a> {
    pub(crate) fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn register_facility(&mut self, facility: Facility) -> ClinicResult<Facility> {
        self.register_facility_checked(facility)
            .inspect_err(|e| log_rejection("register facility", e))
    }

    fn register_facility_checked(&mut self, mut facility: Facility) -> ClinicResult<Facility> {
        facility.tidy();
        let now = self.ctx.now();
        let store = &mut self.ctx.repos.facilities;
        ensure_id(store, &mut facility.id, FACILITY_ID_PREFIX, now)?;
        facility.validate()?;
        refuse_duplicate(store, &facility.id, "register facility")?;

        let saved = store.save(facility)?;
        tracing::info!("registered {} {} ({})", saved.facility_type, saved.id, saved.name);
        Ok(saved)
    }

    /// Registers a clinician. The workplace must exist and its type is copied from the
    /// facility record.
    pub fn register_clinician(&mut self, clinician: Clinician) -> ClinicResult<Clinician> {
        self.register_clinician_checked(clinician)
            .inspect_err(|e| log_rejection("register clinician", e))
    }

    fn register_clinician_checked(&mut self, mut clinician: Clinician) -> ClinicResult<Clinician> {
        clinician.tidy();
        let now = self.ctx.now();
        let repos = &mut *self.ctx.repos;
        ensure_id(&mut repos.clinicians, &mut clinician.id, CLINICIAN_ID_PREFIX, now)?;
        clinician.validate()?;

        let workplace = repos
            .facilities
            .find_by_id(&clinician.workplace_id)?
            .ok_or_else(|| ClinicError::not_found(Facility::KIND, &clinician.workplace_id))?;
        refuse_duplicate(&mut repos.clinicians, &clinician.id, "register clinician")?;
        clinician.workplace_type = workplace.facility_type;

        let saved = repos.clinicians.save(clinician)?;
        tracing::info!("registered clinician {} at {}", saved.id, saved.workplace_id);
        Ok(saved)
    }

    pub fn register_staff(&mut self, staff: Staff) -> ClinicResult<Staff> {
        self.register_staff_checked(staff)
            .inspect_err(|e| log_rejection("register staff", e))
    }

    fn register_staff_checked(&mut self, mut staff: Staff) -> ClinicResult<Staff> {
        staff.tidy();
        let now = self.ctx.now();
        let repos = &mut *self.ctx.repos;
        ensure_id(&mut repos.staff, &mut staff.id, STAFF_ID_PREFIX, now)?;
        staff.validate()?;
        require_exists(&mut repos.facilities, &staff.facility_id)?;
        refuse_duplicate(&mut repos.staff, &staff.id, "register staff")?;

        let saved = repos.staff.save(staff)?;
        tracing::info!("registered staff member {} at {}", saved.id, saved.facility_id);
        Ok(saved)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn facilities(&mut self) -> ClinicResult<Vec<Facility>> {
        let mut all = self.ctx.repos.facilities.find_all()?;
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    pub fn facilities_of_type(&mut self, facility_type: FacilityType) -> ClinicResult<Vec<Facility>> {
        self.ctx
            .repos
            .facilities
            .find_where(|f| f.facility_type == facility_type)
    }

    /// Facilities listing `speciality`, ordered by name.
    pub fn facilities_offering(&mut self, speciality: &str) -> ClinicResult<Vec<Facility>> {
        let speciality = speciality.trim();
        let mut found = self
            .ctx
            .repos
            .facilities
            .find_where(|f| f.offers_speciality(speciality))?;
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    pub fn clinicians(&mut self) -> ClinicResult<Vec<Clinician>> {
        self.ctx.repos.clinicians.find_all()
    }

    /// Case-insensitive exact match on speciality.
    pub fn clinicians_by_speciality(&mut self, speciality: &str) -> ClinicResult<Vec<Clinician>> {
        let speciality = speciality.trim();
        self.ctx
            .repos
            .clinicians
            .find_where(|c| c.speciality.eq_ignore_ascii_case(speciality))
    }

    pub fn clinicians_at(&mut self, facility_id: &str) -> ClinicResult<Vec<Clinician>> {
        self.ctx
            .repos
            .clinicians
            .find_where(|c| c.workplace_id == facility_id)
    }

    pub fn staff_at(&mut self, facility_id: &str) -> ClinicResult<Vec<Staff>> {
        self.ctx
            .repos
            .staff
            .find_where(|s| s.facility_id == facility_id)
    }
}
