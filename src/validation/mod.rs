/// Input validation module
///
/// Validates registration and profile fields, collecting every failure
/// so callers can report all problems in one response.
use crate::error::{ApiError, FieldError};

/// Validation result with per-field errors
pub type ValidationResult = Result<(), Vec<FieldError>>;

const MIN_NAME_CHARS: usize = 2;
const MIN_PASSWORD_CHARS: usize = 8;

/// Validate a given name or surname
///
/// Names must have at least two characters, all of which are letters,
/// spaces, hyphens, or underscores.
pub fn validate_name(field: &str, value: &str) -> ValidationResult {
    let mut errors = Vec::new();

    let trimmed = value.trim();
    if trimmed.chars().count() < MIN_NAME_CHARS {
        errors.push(FieldError::new(
            field,
            format!("Must have at least {} characters", MIN_NAME_CHARS),
        ));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '_')
    {
        errors.push(FieldError::new(
            field,
            "May only contain letters, spaces, hyphens, and underscores",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate an email address
///
/// Structural check only: one '@' with a dotted domain after it.
/// Deliverability is confirmed by the emailed verification code.
pub fn validate_email(value: &str) -> ValidationResult {
    let mut errors = Vec::new();

    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        errors.push(FieldError::new("email", "Invalid email address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a password
///
/// Requires at least 8 characters with an uppercase letter, a lowercase
/// letter, a digit, and a symbol. Every missing class is reported.
pub fn validate_password(value: &str) -> ValidationResult {
    let mut errors = Vec::new();

    if value.chars().count() < MIN_PASSWORD_CHARS {
        errors.push(FieldError::new(
            "password",
            format!("Must have at least {} characters", MIN_PASSWORD_CHARS),
        ));
    }

    if !value.chars().any(|c| c.is_uppercase()) {
        errors.push(FieldError::new(
            "password",
            "Must contain an uppercase letter",
        ));
    }

    if !value.chars().any(|c| c.is_lowercase()) {
        errors.push(FieldError::new(
            "password",
            "Must contain a lowercase letter",
        ));
    }

    if !value.chars().any(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new("password", "Must contain a digit"));
    }

    if value.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.push(FieldError::new("password", "Must contain a symbol"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate that the password confirmation matches.
pub fn validate_confirmation(password: &str, confirmation: &str) -> ValidationResult {
    if password == confirmation {
        Ok(())
    } else {
        Err(vec![FieldError::new(
            "confirm_password",
            "Passwords do not match",
        )])
    }
}

/// Run several validators and merge every failure into one error.
pub fn collect(results: Vec<ValidationResult>) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    for result in results {
        if let Err(mut field_errors) = result {
            errors.append(&mut field_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Fields(errors))
    }
}
