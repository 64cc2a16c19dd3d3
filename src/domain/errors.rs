//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The API layer maps each variant to a structured HTTP response.

use std::collections::BTreeMap;

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Itemized validation messages, keyed by field name or material id.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(())` when nothing was collected, the validation error otherwise.
    pub fn into_result(self) -> Result<(), DomainError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    /// One or more fields failed validation
    #[error("Validation failed: {} field(s) in error", .0.len())]
    Validation(FieldErrors),
    /// Not enough free stock for a material over the requested period
    #[error("Insufficient stock for material {material_id}: requested {requested}, available {available}")]
    InsufficientStock {
        material_id: i32,
        requested: i32,
        available: i32,
    },
    /// Resource not found
    #[error("{entity} #{id} not found")]
    NotFound { entity: &'static str, id: i32 },
    /// Unique constraint violation
    #[error("Duplicate entry: value for index '{field}' must be unique")]
    DuplicateKey { field: String, message: String },
    /// Database/persistence error
    #[error("Database error: {0}")]
    Database(String),
    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        DomainError::NotFound { entity, id }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        DomainError::Validation(errors)
    }
}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(details)) = e.sql_err() {
            let field = duplicate_key_name(&details);
            return DomainError::DuplicateKey {
                message: format!("Duplicate entry: value for index '{}' must be unique", field),
                field,
            };
        }
        DomainError::Database(e.to_string())
    }
}

/// Extracts the offending key from a driver's unique-violation message.
///
/// SQLite reports `UNIQUE constraint failed: materials.reference` (or a
/// comma-separated column list for composite keys); MySQL reports
/// `Duplicate entry 'x' for key 'reference_UNIQUE'`.
pub fn duplicate_key_name(details: &str) -> String {
    if let Some(pos) = details.rfind("for key '") {
        let rest = &details[pos + "for key '".len()..];
        let key = rest.split('\'').next().unwrap_or(rest);
        let key = key.rsplit('.').next().unwrap_or(key);
        return key.replace("_UNIQUE", "");
    }

    if let Some(pos) = details.find("constraint failed: ") {
        let columns = details[pos + "constraint failed: ".len()..].trim();
        // Keep the last column of a composite key, it is the one users edit.
        let last = columns.rsplit(',').next().unwrap_or(columns).trim();
        return last.rsplit('.').next().unwrap_or(last).to_string();
    }

    details.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_duplicate_key_name() {
        assert_eq!(
            duplicate_key_name("UNIQUE constraint failed: materials.reference"),
            "reference"
        );
        assert_eq!(
            duplicate_key_name(
                "UNIQUE constraint failed: material_units.material_id, material_units.serial_number"
            ),
            "serial_number"
        );
    }

    #[test]
    fn test_mysql_duplicate_key_name() {
        let details = "SQLSTATE[23000]: Integrity constraint violation: 1062 Duplicate entry \
                       'Testing, Inc' for key 'legal_name_UNIQUE' (SQL: insert into companies)";
        assert_eq!(duplicate_key_name(details), "legal_name");
    }

    #[test]
    fn test_field_errors_collects_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("4", "first");
        errors.add("4", "second");
        errors.add("title", "required");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("4").map(|m| m.len()), Some(2));

        match errors.into_result() {
            Err(DomainError::Validation(e)) => assert!(e.contains("title")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
