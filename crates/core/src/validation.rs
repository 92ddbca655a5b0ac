//! Input validation utilities.
//!
//! Shared checks used by the entity validity predicates and by the service operations
//! before any record is touched. Each failure names the offending field.

use crate::{ClinicError, ClinicResult};
use clinic_types::NonEmptyText;

/// Requires `value` to contain at least one non-whitespace character.
pub fn require_text(field: &str, value: &str) -> ClinicResult<()> {
    if value.trim().is_empty() {
        return Err(ClinicError::validation(field, "is required"));
    }
    Ok(())
}

/// Requires a numeric field to be strictly positive.
pub fn require_positive(field: &str, value: u32) -> ClinicResult<()> {
    if value == 0 {
        return Err(ClinicError::validation(field, "must be greater than zero"));
    }
    Ok(())
}

/// Converts a caller-supplied parameter into [`NonEmptyText`], naming the field on failure.
pub fn required_param(field: &str, value: &str) -> ClinicResult<NonEmptyText> {
    NonEmptyText::new(value).map_err(|_| ClinicError::validation(field, "is required"))
}

/// Trims an optional free-text value, collapsing blanks to `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trims a required text field in place.
pub fn tidy(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

/// Trims an optional field in place, dropping it when nothing is left.
pub fn tidy_optional(value: &mut Option<String>) {
    *value = optional_text(value.as_deref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text_rejects_whitespace() {
        let err = require_text("first_name", "   ").unwrap_err();
        match err {
            ClinicError::Validation { field, .. } => assert_eq!(field, "first_name"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(require_text("first_name", "Ada").is_ok());
    }

    #[test]
    fn test_require_positive() {
        assert!(require_positive("quantity", 0).is_err());
        assert!(require_positive("quantity", 1).is_ok());
    }

    #[test]
    fn test_required_param_trims() {
        let text = required_param("reason", "  follow up ").expect("should accept");
        assert_eq!(text.as_str(), "follow up");
        assert!(required_param("reason", "").is_err());
    }

    #[test]
    fn test_tidy_in_place() {
        let mut name = "  Alice ".to_string();
        tidy(&mut name);
        assert_eq!(name, "Alice");

        let mut email = Some("   ".to_string());
        tidy_optional(&mut email);
        assert_eq!(email, None);
    }

    #[test]
    fn test_optional_text_collapses_blank() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" x ")), Some("x".to_string()));
        assert_eq!(optional_text(None), None);
    }
}
