use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    Initialization,
    DatabaseError,
    NotFound,
    ConstraintViolation,
    Validation,
    BusinessRule,
    FileValidation,
    PayloadTooLarge,
    Security,
    Storage,
    Application,
}

/**
 * Represents an error that occurs within the application.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
    /**
     * Individual problems when several checks failed at once.
     */
    pub errors: Vec<String>,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message, errors: Vec::new() }
    }

    /**
     * Creates an error carrying every failed check.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A summary of the error.
     * `errors`: The failed checks.
     */
    pub fn with_errors(error_type: ErrorType, message: String, errors: Vec<String>) -> Self {
        ApplicationError { error_type, message, errors }
    }

    /**
     * Creates a business rule error carrying every failed check.
     */
    pub fn business_rule(message: String, errors: Vec<String>) -> Self {
        Self::with_errors(ErrorType::BusinessRule, message, errors)
    }

    /**
     * Fails with a validation error when any field check failed.
     *
     * #Arguments
     * `message`: A summary of the error.
     * `errors`: The failed field checks, may be empty.
     */
    pub fn check_fields(message: &str, errors: Vec<String>) -> Result<(), Self> {
        if errors.is_empty() {
            return Ok(());
        }
        Err(Self::with_errors(ErrorType::Validation, message.to_string(), errors))
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.errors.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.message, self.errors.join("; "))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display_with_errors() {
        let error = ApplicationError::business_rule("Assignment rejected".to_string(), vec!["Vehicle not in service".to_string(), "Missing start date".to_string()]);
        assert_eq!(error.to_string(), "Assignment rejected: Vehicle not in service; Missing start date");
        assert_eq!(error.error_type, ErrorType::BusinessRule);
    }

    #[test]
    fn test_display_without_errors() {
        let error = ApplicationError::new(ErrorType::NotFound, "Vehicle not found".to_string());
        assert_eq!(error.to_string(), "Vehicle not found");
    }
}
