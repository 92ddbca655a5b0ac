//! The `Clinic` entry point.
//!
//! A `Clinic` owns the configuration, the clock and every record store for one data
//! directory. Services are short-lived views that borrow it mutably:
//!
//! ```no_run
//! use clinic_core::{Clinic, CoreConfig};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), clinic_core::ClinicError> {
//! let cfg = Arc::new(CoreConfig::new(PathBuf::from("clinic_data"))?);
//! let mut clinic = Clinic::open(cfg)?;
//! for appointment in clinic.appointments().reminders()? {
//!     println!("{} at {}", appointment.patient_id, appointment.starts_at());
//! }
//! # Ok(())
//! # }
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::repositories::Repositories;
use crate::services::{
    AppointmentService, DirectoryService, PatientService, PrescriptionService, ReferralService,
    ServiceContext,
};
use crate::ClinicResult;
use std::sync::Arc;

#[derive(Debug)]
pub struct Clinic {
    cfg: Arc<CoreConfig>,
    clock: Arc<dyn Clock>,
    repos: Repositories,
}

impl Clinic {
    /// Opens the data directory using the system clock.
    pub fn open(cfg: Arc<CoreConfig>) -> ClinicResult<Self> {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    pub fn with_clock(cfg: Arc<CoreConfig>, clock: Arc<dyn Clock>) -> ClinicResult<Self> {
        let repos = Repositories::open(&cfg)?;
        Ok(Self { cfg, clock, repos })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    pub fn repositories_mut(&mut self) -> &mut Repositories {
        &mut self.repos
    }

    fn context(&mut self) -> ServiceContext<'_> {
        ServiceContext::new(&self.cfg, self.clock.as_ref(), &mut self.repos)
    }

    pub fn appointments(&mut self) -> AppointmentService<'_> {
        AppointmentService::new(self.context())
    }

    pub fn prescriptions(&mut self) -> PrescriptionService<'_> {
        PrescriptionService::new(self.context())
    }

    pub fn referrals(&mut self) -> ReferralService<'_> {
        ReferralService::new(self.context())
    }

    pub fn patients(&mut self) -> PatientService<'_> {
        PatientService::new(self.context())
    }

    pub fn directory(&mut self) -> DirectoryService<'_> {
        DirectoryService::new(self.context())
    }
}
