//! Constants used throughout the clinic core crate.
//!
//! File names, default scheduling parameters and the fixed business-rule thresholds live
//! here so the services and the CLI agree on them.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "clinic_data";

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "CLINIC_DATA_DIR";

pub const PATIENTS_FILENAME: &str = "patients.csv";
pub const CLINICIANS_FILENAME: &str = "clinicians.csv";
pub const FACILITIES_FILENAME: &str = "facilities.csv";
pub const APPOINTMENTS_FILENAME: &str = "appointments.csv";
pub const PRESCRIPTIONS_FILENAME: &str = "prescriptions.csv";
pub const REFERRALS_FILENAME: &str = "referrals.csv";
pub const STAFF_FILENAME: &str = "staff.csv";

/// Start of the default working day (hour, minute).
pub const DEFAULT_DAY_START: (u32, u32) = (9, 0);

/// End of the default working day (hour, minute).
pub const DEFAULT_DAY_END: (u32, u32) = (17, 0);

/// Default width of an enumerated booking slot.
pub const DEFAULT_SLOT_MINUTES: u32 = 15;

/// Appointments cannot be cancelled closer than this to their start.
pub const CANCELLATION_NOTICE_HOURS: i64 = 24;

/// Window for appointment reminders.
pub const REMINDER_WINDOW_HOURS: i64 = 24;

pub const MIN_APPOINTMENT_MINUTES: u32 = 5;
pub const MAX_APPOINTMENT_MINUTES: u32 = 480;

pub const MAX_PRESCRIPTION_DAYS: u32 = 365;

/// Prescriptions expiring within this many days are reported as expiring soon.
pub const EXPIRY_ALERT_DAYS: i64 = 7;

/// Open referrals older than this many days are overdue.
pub const REFERRAL_OVERDUE_DAYS: i64 = 30;

pub const MAX_PATIENT_AGE_YEARS: u32 = 150;

/// Separator used in the facility speciality column.
pub const SPECIALITY_SEPARATOR: char = '|';

/// CSV date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// CSV time format.
pub const TIME_FORMAT: &str = "%H:%M";

/// CSV timestamp format.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";
