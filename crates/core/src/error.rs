use crate::models::EntityKind;
use std::path::PathBuf;

/// Broad classification of a [`ClinicError`].
///
/// Every error the core returns is recoverable by the caller; the kind tells the caller
/// whether the input, the requested transition, or the storage layer is at fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    BusinessRule,
    Persistence,
}

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("field '{field}' failed validation: {reason}")]
    Validation { field: String, reason: String },

    #[error("operation '{operation}' rejected: {reason}")]
    BusinessRule { operation: String, reason: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("failed to load {kind} data from {}: {source}", .path.display())]
    DataLoad {
        kind: EntityKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save {kind} data to {}: {source}", .path.display())]
    DataSave {
        kind: EntityKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("id allocation failed: {0}")]
    IdAllocation(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClinicError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn business_rule(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BusinessRule {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Classifies the error. Missing records count as business-rule failures because they
    /// are raised by the same existence checks that gate every transition.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::InvalidConfig(_) => ErrorKind::Validation,
            Self::BusinessRule { .. } | Self::NotFound { .. } => ErrorKind::BusinessRule,
            Self::DataLoad { .. } | Self::DataSave { .. } | Self::IdAllocation(_) => {
                ErrorKind::Persistence
            }
        }
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            ClinicError::validation("quantity", "must be positive").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ClinicError::not_found(EntityKind::Patient, "P1").kind(),
            ErrorKind::BusinessRule
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ClinicError::DataSave {
            kind: EntityKind::Appointment,
            path: PathBuf::from("appointments.csv"),
            source: io,
        };
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_display_includes_field_and_reason() {
        let err = ClinicError::validation("duration_minutes", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "field 'duration_minutes' failed validation: must be greater than zero"
        );

        let err = ClinicError::not_found(EntityKind::Referral, "R42");
        assert_eq!(err.to_string(), "Referral not found: R42");
    }
}
