//! Appointment time arithmetic and conflict detection.
//!
//! Times are handled as minutes since midnight. An appointment occupies the half-open
//! interval `[start, start + duration)`, so back-to-back appointments do not conflict.
//! Ranges never wrap past midnight; an appointment running beyond 24:00 simply has an
//! end greater than 1440.

use crate::constants::{DEFAULT_DAY_END, DEFAULT_DAY_START};
use crate::models::Appointment;
use crate::{ClinicError, ClinicResult};
use chrono::{NaiveDate, NaiveTime, Timelike};
use std::fmt;

// ============================================================================
// Time ranges
// ============================================================================

/// Half-open interval of minutes since midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeRange {
    pub start: u32,
    pub end: u32,
}

impl TimeRange {
    pub fn starting_at(start: NaiveTime, duration_minutes: u32) -> Self {
        let start = minutes_since_midnight(start);
        Self {
            start,
            end: start.saturating_add(duration_minutes),
        }
    }

    /// True unless one range ends at or before the moment the other begins.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        !(self.end <= other.start || self.start >= other.end)
    }
}

fn minutes_since_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_from_minutes(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

// ============================================================================
// Conflict detection
// ============================================================================

/// A proposed booking to test against existing appointments.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub duration_minutes: u32,
    pub clinician_id: &'a str,
    pub facility_id: &'a str,
}

impl<'a> Candidate<'a> {
    pub fn from_appointment(appointment: &'a Appointment) -> Self {
        Self {
            date: appointment.date,
            start: appointment.start_time,
            duration_minutes: appointment.duration_minutes,
            clinician_id: &appointment.clinician_id,
            facility_id: &appointment.facility_id,
        }
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::starting_at(self.start, self.duration_minutes)
    }

    /// Same date, shared clinician or facility, and overlapping time.
    pub fn conflicts_with(&self, existing: &Appointment) -> bool {
        existing.date == self.date
            && (existing.clinician_id == self.clinician_id
                || existing.facility_id == self.facility_id)
            && self.range().overlaps(&existing.time_range())
    }
}

/// First existing appointment that clashes with `candidate`.
///
/// `exclude_id` skips one appointment, used when rescheduling so a booking does not clash
/// with its own previous slot. Every existing appointment takes part regardless of status.
pub fn find_conflict<'a>(
    candidate: &Candidate<'_>,
    existing: &'a [Appointment],
    exclude_id: Option<&str>,
) -> Option<&'a Appointment> {
    existing
        .iter()
        .filter(|appt| exclude_id != Some(appt.id.as_str()))
        .find(|appt| candidate.conflicts_with(appt))
}

pub fn has_conflict(
    candidate: &Candidate<'_>,
    existing: &[Appointment],
    exclude_id: Option<&str>,
) -> bool {
    find_conflict(candidate, existing, exclude_id).is_some()
}

// ============================================================================
// Working hours and slot enumeration
// ============================================================================

/// Daily window within which slots are offered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkingHours {
    start: NaiveTime,
    end: NaiveTime,
}

impl WorkingHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> ClinicResult<Self> {
        if start >= end {
            return Err(ClinicError::InvalidConfig(format!(
                "working day must start before it ends ({} >= {})",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        let (start_h, start_m) = DEFAULT_DAY_START;
        let (end_h, end_m) = DEFAULT_DAY_END;
        Self {
            start: NaiveTime::from_hms_opt(start_h, start_m, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(end_h, end_m, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// A free booking slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub duration_minutes: u32,
}

impl TimeSlot {
    pub fn end_time(&self) -> NaiveTime {
        self.start + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.date.format("%Y-%m-%d"),
            self.start.format("%H:%M"),
            self.end_time().format("%H:%M")
        )
    }
}

/// Enumerates fixed-width slots across `hours` on `date` that clash with nothing in
/// `existing` for the given clinician or facility. Slots are returned in time order and
/// only when they fit entirely inside the window.
pub fn available_slots(
    existing: &[Appointment],
    clinician_id: &str,
    facility_id: &str,
    date: NaiveDate,
    hours: WorkingHours,
    slot_minutes: u32,
) -> Vec<TimeSlot> {
    let mut slots = Vec::new();
    if slot_minutes == 0 {
        return slots;
    }

    let window_end = minutes_since_midnight(hours.end);
    let mut cursor = minutes_since_midnight(hours.start);

    while cursor + slot_minutes <= window_end {
        let Some(start) = time_from_minutes(cursor) else {
            break;
        };
        let candidate = Candidate {
            date,
            start,
            duration_minutes: slot_minutes,
            clinician_id,
            facility_id,
        };
        if !has_conflict(&candidate, existing, None) {
            slots.push(TimeSlot {
                date,
                start,
                duration_minutes: slot_minutes,
            });
        }
        cursor += slot_minutes;
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use proptest::prelude::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 20).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn appointment(
        id: &str,
        clinician: &str,
        facility: &str,
        start: NaiveTime,
        mins: u32,
    ) -> Appointment {
        Appointment {
            id: id.into(),
            patient_id: "P001".into(),
            clinician_id: clinician.into(),
            facility_id: facility.into(),
            date: date(),
            start_time: start,
            duration_minutes: mins,
            appointment_type: "Consultation".into(),
            status: AppointmentStatus::Scheduled,
            reason: None,
            notes: None,
            created_at: None,
            modified_at: None,
        }
    }

    fn candidate<'a>(
        clinician: &'a str,
        facility: &'a str,
        start: NaiveTime,
        mins: u32,
    ) -> Candidate<'a> {
        Candidate {
            date: date(),
            start,
            duration_minutes: mins,
            clinician_id: clinician,
            facility_id: facility,
        }
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        let a = TimeRange::starting_at(hm(9, 0), 15);
        let b = TimeRange::starting_at(hm(9, 15), 15);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(a.overlaps(&TimeRange::starting_at(hm(9, 14), 1)));
    }

    #[test]
    fn test_conflict_on_shared_clinician_or_facility() {
        let existing = vec![appointment("A1", "C001", "F001", hm(9, 0), 15)];

        let clash = |c, f, start| has_conflict(&candidate(c, f, start, 15), &existing, None);

        assert!(clash("C001", "F999", hm(9, 10)));
        assert!(clash("C999", "F001", hm(9, 10)));
        assert!(!clash("C999", "F999", hm(9, 10)));
        assert!(!clash("C001", "F001", hm(9, 15)));
    }

    #[test]
    fn test_excluded_id_is_ignored() {
        let existing = vec![appointment("A1", "C001", "F001", hm(9, 0), 30)];
        let moved = candidate("C001", "F001", hm(9, 15), 30);
        assert!(has_conflict(&moved, &existing, None));
        assert!(!has_conflict(&moved, &existing, Some("A1")));
    }

    #[test]
    fn test_other_dates_never_conflict() {
        let mut other_day = appointment("A1", "C001", "F001", hm(9, 0), 60);
        other_day.date = date().succ_opt().unwrap();
        assert!(!has_conflict(
            &candidate("C001", "F001", hm(9, 0), 60),
            &[other_day],
            None
        ));
    }

    #[test]
    fn test_available_slots_skip_booked_times() {
        let existing = vec![
            appointment("A1", "C001", "F001", hm(9, 0), 15),
            appointment("A2", "C002", "F001", hm(10, 0), 30),
        ];
        let slots = available_slots(
            &existing,
            "C001",
            "F001",
            date(),
            WorkingHours::default(),
            15,
        );

        // 32 slots in 09:00-17:00, minus 09:00, 10:00 and 10:15.
        assert_eq!(slots.len(), 29);
        assert_eq!(slots[0].start, hm(9, 15));
        assert!(slots.iter().all(|s| s.start != hm(10, 0) && s.start != hm(10, 15)));
        assert_eq!(slots.last().map(|s| s.end_time()), Some(hm(17, 0)));
        assert!(slots.windows(2).all(|w| w[0].start < w[1].start));
    }

    #[test]
    fn test_slots_must_fit_inside_window() {
        let hours = WorkingHours::new(hm(9, 0), hm(9, 50)).unwrap();
        let slots = available_slots(&[], "C001", "F001", date(), hours, 20);
        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![hm(9, 0), hm(9, 20)]);
    }

    #[test]
    fn test_working_hours_rejects_empty_window() {
        assert!(WorkingHours::new(hm(17, 0), hm(9, 0)).is_err());
        assert!(WorkingHours::new(hm(9, 0), hm(9, 0)).is_err());
    }

    #[test]
    fn test_time_slot_display() {
        let slot = TimeSlot {
            date: date(),
            start: hm(9, 45),
            duration_minutes: 15,
        };
        assert_eq!(slot.to_string(), "2025-09-20 09:45-10:00");
    }

    proptest! {
        /// Accepting only non-conflicting requests never leaves two appointments that
        /// share a clinician or facility overlapping on the same date.
        #[test]
        fn prop_accepted_bookings_never_overlap(
            requests in prop::collection::vec(
                (0u8..3, 0u8..3, 0u32..(10 * 60), 5u32..=120),
                1..40,
            )
        ) {
            let clinicians = ["C1", "C2", "C3"];
            let facilities = ["F1", "F2", "F3"];
            let mut accepted: Vec<Appointment> = Vec::new();

            for (i, (c, f, start, mins)) in requests.into_iter().enumerate() {
                let start = hm(8 + start / 60, start % 60);
                let proposed = appointment(
                    &format!("A{i}"),
                    clinicians[usize::from(c)],
                    facilities[usize::from(f)],
                    start,
                    mins,
                );
                if !has_conflict(&Candidate::from_appointment(&proposed), &accepted, None) {
                    accepted.push(proposed);
                }
            }

            for (i, a) in accepted.iter().enumerate() {
                for b in accepted.iter().skip(i + 1) {
                    if a.clinician_id == b.clinician_id || a.facility_id == b.facility_id {
                        prop_assert!(!a.time_range().overlaps(&b.time_range()));
                    }
                }
            }
        }
    }
}
