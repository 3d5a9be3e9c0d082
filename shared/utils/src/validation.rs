use crate::error::{PortalError, PortalResult};
use regex::Regex;
use validator::{Validate, ValidationErrors};

pub fn validate_model<T: Validate>(model: &T) -> PortalResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let error_messages = format_validation_errors(&errors);
            Err(PortalError::validation("model", error_messages))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = match &error.code {
                std::borrow::Cow::Borrowed("email") => "Invalid email format".to_string(),
                std::borrow::Cow::Borrowed("length") => {
                    format!("Length validation failed for field '{}'", field)
                }
                std::borrow::Cow::Borrowed("range") => {
                    format!("Value out of range for field '{}'", field)
                }
                std::borrow::Cow::Borrowed("required") => {
                    format!("Field '{}' is required", field)
                }
                _ => format!("Validation failed for field '{}': {}", field, error.code),
            };
            messages.push(message);
        }
    }

    messages.join(", ")
}

pub fn validate_email_address(email: &str) -> PortalResult<()> {
    let email_regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    if !email_regex.is_match(email) {
        return Err(PortalError::validation(
            "email",
            "Invalid email address format",
        ));
    }

    Ok(())
}

pub fn validate_file_type(file_name: &str, allowed_types: &[&str]) -> PortalResult<()> {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    if !allowed_types.contains(&extension.to_lowercase().as_str()) {
        return Err(PortalError::validation(
            "file_type",
            format!(
                "File type '{}' not allowed. Allowed types: {}",
                extension,
                allowed_types.join(", ")
            ),
        ));
    }

    Ok(())
}

pub fn validate_file_size(file_size: u64, max_size: u64) -> PortalResult<()> {
    if file_size > max_size {
        return Err(PortalError::validation(
            "file_size",
            format!(
                "File size {} bytes exceeds maximum allowed size {} bytes",
                file_size, max_size
            ),
        ));
    }

    Ok(())
}

pub fn validate_date_range(
    start_date: chrono::DateTime<chrono::Utc>,
    end_date: chrono::DateTime<chrono::Utc>,
) -> PortalResult<()> {
    if start_date >= end_date {
        return Err(PortalError::validation(
            "date_range",
            "Start date must be before end date",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_address() {
        assert!(validate_email_address("agent@agency.example").is_ok());
        assert!(validate_email_address("invalid-email").is_err());
        assert!(validate_email_address("@agency.example").is_err());
    }

    #[test]
    fn test_validate_file_type() {
        let allowed_types = &["xlsx", "csv"];
        assert!(validate_file_type("leads.xlsx", allowed_types).is_ok());
        assert!(validate_file_type("leads.CSV", allowed_types).is_ok());
        assert!(validate_file_type("leads.pdf", allowed_types).is_err());
    }

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size(1024, 2048).is_ok());
        assert!(validate_file_size(4096, 2048).is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let now = chrono::Utc::now();
        let later = now + chrono::Duration::days(30);
        assert!(validate_date_range(now, later).is_ok());
        assert!(validate_date_range(later, now).is_err());
        assert!(validate_date_range(now, now).is_err());
    }
}
