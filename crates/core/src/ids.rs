//! Record identifier allocation.
//!
//! Identifiers have the form `<prefix><YYYYMMDDHHMMSS><6 hex>`, for example
//! `A20250920091500a1b2c3`. The timestamp keeps ids roughly ordered by creation; the hex
//! suffix comes from a v4 UUID so two ids minted in the same second differ.

use crate::error::{ClinicError, ClinicResult};
use chrono::NaiveDateTime;
use uuid::Uuid;

pub const PATIENT_ID_PREFIX: &str = "P";
pub const CLINICIAN_ID_PREFIX: &str = "C";
pub const FACILITY_ID_PREFIX: &str = "F";
pub const APPOINTMENT_ID_PREFIX: &str = "A";
pub const PRESCRIPTION_ID_PREFIX: &str = "RX";
pub const REFERRAL_ID_PREFIX: &str = "R";
pub const STAFF_ID_PREFIX: &str = "S";

const SUFFIX_LEN: usize = 6;
const MAX_ATTEMPTS: usize = 5;

/// Builds one candidate identifier.
pub fn generate_id(prefix: &str, now: NaiveDateTime) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}{}",
        prefix,
        now.format("%Y%m%d%H%M%S"),
        &random[..SUFFIX_LEN]
    )
}

/// Allocates an identifier that `taken` reports as unused.
///
/// Retries up to five times before giving up, which only happens if the store already
/// holds ids colliding with freshly generated ones.
pub fn allocate_id(
    prefix: &str,
    now: NaiveDateTime,
    taken: impl Fn(&str) -> bool,
) -> ClinicResult<String> {
    for _attempt in 0..MAX_ATTEMPTS {
        let candidate = generate_id(prefix, now);
        if !taken(&candidate) {
            return Ok(candidate);
        }
    }

    Err(ClinicError::IdAllocation(format!(
        "failed to allocate a unique '{}' id after {} attempts",
        prefix, MAX_ATTEMPTS
    )))
}
