//! Mapping of validator failures onto wire error codes.

use askanai_common::AppError;
use validator::ValidationErrors;

/// Report the first failing field of `fields`, in order, with its code.
///
/// A field may be listed under both its Rust and its wire name. Failures on
/// fields not listed collapse to `INVALID_INPUT`.
#[must_use]
pub fn first_failure(errors: &ValidationErrors, fields: &[(&str, &'static str)]) -> AppError {
    let failed = errors.errors();
    fields
        .iter()
        .find(|(field, _)| failed.contains_key(*field))
        .map_or(AppError::Validation("INVALID_INPUT"), |(_, code)| {
            AppError::Validation(*code)
        })
}

/// Trim a string in place.
pub fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

/// Trim an optional string, turning blank into `None`.
#[must_use]
pub fn trimmed_non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
