//! Input validation for rows written by the admin backend.

use std::fmt;

use crate::phone;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty or missing.
    Required(&'static str),
    /// Value too long.
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    /// Phone number that does not parse to a valid international number.
    InvalidPhone(String),
    /// Invalid email format.
    InvalidEmail(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Required(field) => write!(f, "{} is required", field),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::InvalidPhone(input) => write!(f, "Invalid phone number: {}", input),
            ValidationError::InvalidEmail(msg) => write!(f, "Invalid email: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum message body length accepted by WhatsApp.
pub const MAX_MESSAGE_LENGTH: usize = 65_536;

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Reject empty or whitespace-only values.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

/// Validate a message body before insert.
pub fn validate_message_content(content: &str) -> Result<(), ValidationError> {
    require("content", content)?;

    let len = content.chars().count();
    if len > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "content",
            max: MAX_MESSAGE_LENGTH,
            actual: len,
        });
    }

    Ok(())
}

/// Validate a phone number and return its E.164 form.
pub fn validate_phone_number(input: &str) -> Result<String, ValidationError> {
    require("phone_number", input)?;

    let parsed = phone::parse_phone_number(input);
    if !parsed.is_valid {
        return Err(ValidationError::InvalidPhone(input.trim().to_string()));
    }
    Ok(parsed.formatted)
}

/// Validate an admin email address (`local@domain.tld`).
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    require("email", email)?;

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email",
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail("missing @".to_string()));
    };

    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail(
            "must be local@domain".to_string(),
        ));
    }

    if !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || domain.contains("..")
    {
        return Err(ValidationError::InvalidEmail(format!(
            "bad domain '{}'",
            domain
        )));
    }

    Ok(())
}
