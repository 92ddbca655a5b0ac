//! Service operations over the record stores.
//!
//! Every mutating operation runs its checks in a fixed order: parameter validation, then
//! existence of referenced records, then business rules, and only then a store write. A
//! rejected operation therefore never leaves a partial write behind.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::ids::allocate_id;
use crate::models::Record;
use crate::repositories::Repositories;
use crate::store::RecordStore;
use crate::{ClinicError, ClinicResult};
use chrono::{NaiveDate, NaiveDateTime};

pub mod appointments;
pub mod directory;
pub mod patients;
pub mod prescriptions;
pub mod referrals;

pub use appointments::{AppointmentService, AppointmentStatistics, BookingRequest};
pub use directory::DirectoryService;
pub use patients::{PatientRecord, PatientService};
pub use prescriptions::{PrescriptionRequest, PrescriptionService, PrescriptionStatistics};
pub use referrals::{ReferralRequest, ReferralService, ReferralStatistics, ReferralWorkflow};

/// Borrowed view of a `Clinic` handed to each service.
pub(crate) struct ServiceContext<'a> {
    pub cfg: &'a CoreConfig,
    pub clock: &'a dyn Clock,
    pub repos: &'a mut Repositories,
}

impl<'a> ServiceContext<'a> {
    pub fn new(cfg: &'a CoreConfig, clock: &'a dyn Clock, repos: &'a mut Repositories) -> Self {
        Self { cfg, clock, repos }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

/// Loads the record with `id`, or fails with `NotFound`.
pub(crate) fn require_record<T: Record>(store: &mut RecordStore<T>, id: &str) -> ClinicResult<T> {
    store
        .find_by_id(id)?
        .ok_or_else(|| ClinicError::not_found(T::KIND, id))
}

/// Fails with `NotFound` unless a record with `id` exists.
pub(crate) fn require_exists<T: Record>(store: &mut RecordStore<T>, id: &str) -> ClinicResult<()> {
    if store.exists_by_id(id)? {
        Ok(())
    } else {
        Err(ClinicError::not_found(T::KIND, id))
    }
}

/// Allocates a fresh id with `prefix` that no record in `store` already uses.
pub(crate) fn next_id<T: Record>(
    store: &mut RecordStore<T>,
    prefix: &str,
    now: NaiveDateTime,
) -> ClinicResult<String> {
    let existing = store.records()?;
    allocate_id(prefix, now, |candidate| {
        existing.iter().any(|r| r.id() == candidate)
    })
}

/// Replaces a blank `id` with a freshly allocated one.
pub(crate) fn ensure_id<T: Record>(
    store: &mut RecordStore<T>,
    id: &mut String,
    prefix: &str,
    now: NaiveDateTime,
) -> ClinicResult<()> {
    if id.trim().is_empty() {
        *id = next_id(store, prefix, now)?;
    }
    Ok(())
}

/// Fails with a business-rule error if `id` is already stored.
pub(crate) fn refuse_duplicate<T: Record>(
    store: &mut RecordStore<T>,
    id: &str,
    operation: &str,
) -> ClinicResult<()> {
    if store.exists_by_id(id)? {
        return Err(ClinicError::business_rule(
            operation,
            format!("{} {} already exists", T::KIND, id),
        ));
    }
    Ok(())
}

/// Logs a rejected operation at `warn` and passes the error through.
pub(crate) fn log_rejection(operation: &str, err: &ClinicError) {
    tracing::warn!("{} rejected: {}", operation, err);
}
