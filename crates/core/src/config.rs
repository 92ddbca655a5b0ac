//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the `Clinic`. The intent is to avoid reading process-wide environment variables
//! from inside service operations, which makes behaviour depend on ambient state and
//! complicates test harnesses.

use crate::constants::{
    CANCELLATION_NOTICE_HOURS, DEFAULT_DATA_DIR, DEFAULT_SLOT_MINUTES, EXPIRY_ALERT_DAYS,
    REFERRAL_OVERDUE_DAYS,
};
use crate::models::EntityKind;
use crate::scheduling::WorkingHours;
use crate::{ClinicError, ClinicResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    working_hours: WorkingHours,
    slot_minutes: u32,
    cancellation_notice_hours: i64,
    referral_overdue_days: i64,
    expiry_alert_days: i64,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default scheduling parameters.
    pub fn new(data_dir: PathBuf) -> ClinicResult<Self> {
        Self::with_schedule(data_dir, WorkingHours::default(), DEFAULT_SLOT_MINUTES)
    }

    /// Create a `CoreConfig` with an explicit working window and slot width.
    pub fn with_schedule(
        data_dir: PathBuf,
        working_hours: WorkingHours,
        slot_minutes: u32,
    ) -> ClinicResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(ClinicError::InvalidConfig(
                "data directory cannot be empty".into(),
            ));
        }

        if slot_minutes == 0 {
            return Err(ClinicError::InvalidConfig(
                "slot width must be greater than zero".into(),
            ));
        }

        Ok(Self {
            data_dir,
            working_hours,
            slot_minutes,
            cancellation_notice_hours: CANCELLATION_NOTICE_HOURS,
            referral_overdue_days: REFERRAL_OVERDUE_DAYS,
            expiry_alert_days: EXPIRY_ALERT_DAYS,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the CSV file backing `kind`.
    pub fn store_path(&self, kind: EntityKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    pub fn working_hours(&self) -> WorkingHours {
        self.working_hours
    }

    pub fn slot_minutes(&self) -> u32 {
        self.slot_minutes
    }

    pub fn cancellation_notice_hours(&self) -> i64 {
        self.cancellation_notice_hours
    }

    pub fn referral_overdue_days(&self) -> i64 {
        self.referral_overdue_days
    }

    pub fn expiry_alert_days(&self) -> i64 {
        self.expiry_alert_days
    }
}

/// Resolve the data directory without reading environment variables.
///
/// Precedence: explicit override, then the environment value supplied by the caller, then
/// [`DEFAULT_DATA_DIR`]. Blank values are ignored.
pub fn resolve_data_dir(override_dir: Option<PathBuf>, env_value: Option<String>) -> PathBuf {
    if let Some(dir) = override_dir.filter(|d| !d.as_os_str().is_empty()) {
        return dir;
    }

    env_value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}
