use super::{display_name, whole_years_between, EntityKind, Record};
use crate::validation::{require_text, tidy, tidy_optional};
use crate::ClinicResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Non-clinical staff member (receptionist, practice manager, secretary).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Staff {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub department: String,
    pub facility_id: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub employment_status: String,
    pub start_date: Option<NaiveDate>,
    pub line_manager: Option<String>,
    pub access_level: String,
}

impl Staff {
    /// Trims the id and text fields in place, dropping optional fields left blank.
    pub fn tidy(&mut self) {
        for field in [
            &mut self.id,
            &mut self.first_name,
            &mut self.last_name,
            &mut self.role,
            &mut self.department,
            &mut self.facility_id,
            &mut self.employment_status,
            &mut self.access_level,
        ] {
            tidy(field);
        }
        for field in [&mut self.phone_number, &mut self.email, &mut self.line_manager] {
            tidy_optional(field);
        }
    }

    pub fn full_name(&self) -> String {
        display_name(&[&self.first_name, &self.last_name])
    }

    pub fn years_of_service(&self, today: NaiveDate) -> u32 {
        self.start_date
            .map(|start| whole_years_between(start, today))
            .unwrap_or(0)
    }

    pub fn is_manager(&self) -> bool {
        self.role.to_lowercase().contains("manager")
    }
}

impl Record for Staff {
    type Row = StaffRow;

    const KIND: EntityKind = EntityKind::Staff;

    const HEADER: &'static [&'static str] = &[
        "staff_id",
        "first_name",
        "last_name",
        "role",
        "department",
        "facility_id",
        "phone_number",
        "email",
        "employment_status",
        "start_date",
        "line_manager",
        "access_level",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> ClinicResult<()> {
        require_text("staff_id", &self.id)?;
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        require_text("role", &self.role)?;
        require_text("department", &self.department)?;
        require_text("facility_id", &self.facility_id)?;
        require_text("employment_status", &self.employment_status)?;
        require_text("access_level", &self.access_level)?;
        Ok(())
    }

    fn to_row(&self) -> StaffRow {
        StaffRow {
            staff_id: Some(self.id.clone()),
            first_name: Some(self.first_name.clone()),
            last_name: Some(self.last_name.clone()),
            role: Some(self.role.clone()),
            department: Some(self.department.clone()),
            facility_id: Some(self.facility_id.clone()),
            phone_number: self.phone_number.clone(),
            email: self.email.clone(),
            employment_status: Some(self.employment_status.clone()),
            start_date: self.start_date,
            line_manager: self.line_manager.clone(),
            access_level: Some(self.access_level.clone()),
        }
    }

    fn from_row(row: StaffRow) -> Option<Self> {
        Some(Self {
            id: row.staff_id?,
            first_name: row.first_name?,
            last_name: row.last_name?,
            role: row.role?,
            department: row.department?,
            facility_id: row.facility_id?,
            phone_number: row.phone_number,
            email: row.email,
            employment_status: row.employment_status?,
            start_date: row.start_date,
            line_manager: row.line_manager,
            access_level: row.access_level?,
        })
    }
}

/// CSV row for `staff.csv`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StaffRow {
    staff_id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    role: Option<String>,
    department: Option<String>,
    facility_id: Option<String>,
    phone_number: Option<String>,
    email: Option<String>,
    employment_status: Option<String>,
    start_date: Option<NaiveDate>,
    line_manager: Option<String>,
    access_level: Option<String>,
}
