// Form validation for admin inputs
//
// Each entity form has one alert shown when anything is wrong, plus
// per-field errors for highlighting.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Validation error for a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
    /// Name of the failed rule, e.g. `required`.
    pub constraint: &'static str,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            constraint: "custom",
        }
    }

    pub fn with_constraint(mut self, constraint: &'static str) -> Self {
        self.constraint = constraint;
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field error of one form, with the form's alert.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{alert}")]
pub struct ValidationErrors {
    pub alert: &'static str,
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Get errors for a specific field
    pub fn get_field_errors(&self, field: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }

    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields: Vec<_> = self.errors.iter().map(|e| e.field).collect();
        fields.dedup();
        fields
    }

    /// Body for a 422 answer: `{error, fields}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.alert,
            "fields": self.fields(),
            "errors": self.errors,
        })
    }
}

/// Trait for validatable form inputs
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Collects field errors for one form.
pub(crate) struct FormCheck {
    alert: &'static str,
    errors: Vec<ValidationError>,
}

impl FormCheck {
    pub(crate) fn new(alert: &'static str) -> Self {
        Self {
            alert,
            errors: Vec::new(),
        }
    }

    /// Non-blank text.
    pub(crate) fn required(&mut self, field: &'static str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors
                .push(ValidationError::new(field, "wajib diisi").with_constraint("required"));
        }
        self
    }

    /// Non-blank text when present. Used for patches.
    pub(crate) fn required_if_set(&mut self, field: &'static str, value: Option<&str>) -> &mut Self {
        match value {
            Some(value) => self.required(field, value),
            None => self,
        }
    }

    pub(crate) fn positive(&mut self, field: &'static str, value: f64) -> &mut Self {
        if !(value.is_finite() && value > 0.0) {
            self.errors.push(
                ValidationError::new(field, "harus lebih dari 0").with_constraint("positive"),
            );
        }
        self
    }

    pub(crate) fn positive_if_set(&mut self, field: &'static str, value: Option<f64>) -> &mut Self {
        match value {
            Some(value) => self.positive(field, value),
            None => self,
        }
    }

    /// RFC 3339 timestamp.
    pub(crate) fn timestamp(&mut self, field: &'static str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            return self.required(field, value);
        }
        if chrono::DateTime::parse_from_rfc3339(value.trim()).is_err() {
            self.errors.push(
                ValidationError::new(field, "format waktu tidak valid")
                    .with_constraint("timestamp"),
            );
        }
        self
    }

    pub(crate) fn timestamp_if_set(&mut self, field: &'static str, value: Option<&str>) -> &mut Self {
        match value {
            Some(value) => self.timestamp(field, value),
            None => self,
        }
    }

    pub(crate) fn finish(&mut self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                alert: self.alert,
                errors: std::mem::take(&mut self.errors),
            })
        }
    }
}
