//! Validation Utilities

use validator::ValidationErrors;

use super::error::AppError;

/// Flatten validator's nested error map into one `AppError::Validation`
/// whose message lists every failing field.
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let detail = e
                    .message
                    .as_deref()
                    .unwrap_or("invalid value");
                format!("{field}: {detail}")
            })
        })
        .collect();
    parts.sort();

    if parts.is_empty() {
        AppError::Validation("Validation failed".into())
    } else {
        AppError::Validation(parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(email(message = "Invalid email format"))]
        email: String,

        #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
        password: String,
    }

    #[test]
    fn lists_every_failing_field() {
        let probe = Probe {
            email: "nope".into(),
            password: "short".into(),
        };
        let err = probe.validate().unwrap_err();

        match validation_error(err) {
            AppError::Validation(message) => {
                assert!(message.contains("email: Invalid email format"));
                assert!(message.contains("password: Password must be at least 8 characters"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
