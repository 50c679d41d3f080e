//! Form schemas as pure validation functions.
//!
//! Every form type implements [`Validate`], which collects every failing
//! field into [`Violations`] instead of stopping at the first one. Messages
//! are the user-facing strings shown inline next to each field.


pub mod files;
pub mod forms;

use serde::Serialize;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_TYPE: &str = "Invalid value.";

/// One failing field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every failing field of one form, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{} invalid field(s): {}", .errors.len(), summarize(.errors))]
pub struct Violations {
    errors: Vec<FieldError>,
}

impl Violations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError { field: field.to_owned(), message: message.into() });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// First message recorded for `field`.
    #[must_use]
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.message_for(field).is_some()
    }

    /// `Ok(value)` when nothing failed.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    /// Keep only the errors matching `keep`.
    pub fn retain<F: FnMut(&FieldError) -> bool>(&mut self, keep: F) {
        self.errors.retain(keep);
    }

    /// Fails `field` unless `value` has at least `min` characters.
    pub(crate) fn min_chars(&mut self, field: &str, value: &str, min: usize, message: &str) {
        if value.chars().count() < min {
            self.push(field, message);
        }
    }

    /// Fails `field` when `value` is missing or blank.
    pub(crate) fn required(&mut self, field: &str, value: Option<&str>, message: &str) {
        if value.is_none_or(|v| v.trim().is_empty()) {
            self.push(field, message);
        }
    }

    /// Fails `field` when `value` is below `min`.
    pub(crate) fn at_least(&mut self, field: &str, value: i64, min: i64, message: &str) {
        if value < min {
            self.push(field, message);
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| format!("{}: {}", error.field, error.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A form that can check itself before submission.
pub trait Validate {
    /// All failing fields; empty when the form is valid.
    fn violations(&self) -> Violations;

    /// # Errors
    ///
    /// Returns [`Violations`] when any field fails.
    fn validate(&self) -> Result<(), Violations> {
        self.violations().into_result(())
    }
}
