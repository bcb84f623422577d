//! Validation Utilities

use validator::ValidationErrors;

use super::error::AppError;

/// Convert validation errors to `VALIDATION_ERROR`, listing every failing
/// field as `field: message`.
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut field_errors: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{field}: {message}")
            })
        })
        .collect();
    field_errors.sort();

    if field_errors.is_empty() {
        return AppError::validation("Validation failed");
    }
    AppError::validation(field_errors.join(", "))
}

/// Remove duplicates while keeping the first occurrence of each id.
pub fn dedup_ids<I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = Vec::new();
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}
