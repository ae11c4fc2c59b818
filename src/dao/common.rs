use std::borrow::Cow;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{ListOutputType, PaginationInput, PaginationOutput},
};

/**
 * Constructs a `PaginationOutput` based on the pagination input and the number of elements.
 *
 * # Arguments
 * `pagination_input`: The input containing pagination parameters.
 * `elements_size`: The number of elements retrieved from the database.
 *
 * # Returns
 * A `PaginationOutput` instance containing pagination details.
 */
pub fn get_pagination_output(pagination_input: &PaginationInput, elements_size: i64) -> PaginationOutput {
    let has_more_elements = elements_size > pagination_input.page_size;
    PaginationOutput::new(pagination_input.start_index, pagination_input.page_size, has_more_elements)
}

/**
 * Turns a result fetched with `page_size + 1` rows into a page.
 *
 * # Arguments
 * `pagination_input`: The pagination used for the query.
 * `elements`: The fetched rows.
 *
 * # Returns
 * The page, truncated to the page size, with `has_more` set when the extra row was found.
 */
pub fn to_list_output<T>(pagination_input: &PaginationInput, mut elements: Vec<T>) -> Result<ListOutputType<T>, ApplicationError> {
    let pagination_output = get_pagination_output(
        pagination_input,
        i64::try_from(elements.len()).map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Failed to get pagination output: {err}")))?,
    );
    elements.truncate(usize::try_from(pagination_input.page_size).map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Failed to truncate elements: {err}")))?);
    Ok(ListOutputType::new(elements, pagination_output))
}

/**
 * Checks the number of rows touched by an update or delete of a single row.
 *
 * # Arguments
 * `rows_affected`: Rows reported by the database.
 * `entity`: Name of the entity, used in messages.
 * `id`: Id of the row.
 * `operation`: `updated` or `deleted`.
 */
pub fn check_single_row(rows_affected: u64, entity: &str, id: i64, operation: &str) -> Result<(), ApplicationError> {
    if rows_affected == 0 {
        tracing::debug!("{} with ID {} not found to be {}", entity, id, operation);
        return Err(ApplicationError::new(ErrorType::NotFound, format!("{entity} not found")));
    }
    if rows_affected > 1 {
        tracing::warn!("Multiple {} rows attempted {}. Rolled back", entity, operation);
        return Err(ApplicationError::new(ErrorType::Application, format!("Multiple {entity} rows attempted {operation}. Rolled back")));
    }
    Ok(())
}

/**
 * Maps a missing row to a not found error.
 */
pub fn found<T>(row: Option<T>, entity: &str, id: i64) -> Result<T, ApplicationError> {
    row.ok_or_else(|| {
        tracing::debug!("{} with ID {} not found", entity, id);
        ApplicationError::new(ErrorType::NotFound, format!("{entity} not found"))
    })
}

/**
 * Wraps a keyword for a case-insensitive `LIKE` search.
 */
pub fn like_pattern(keyword: Option<&str>) -> Option<String> {
    keyword.map(str::trim).filter(|keyword| !keyword.is_empty()).map(|keyword| format!("%{}%", keyword.to_lowercase()))
}

/**
 * Handles database errors and maps them to application errors.
 *
 * # Arguments
 * `error`: The database error to handle.
 *
 * # Returns
 * An `ApplicationError` corresponding to the database error.
 */
pub fn handle_database_error(error: Option<&dyn sqlx::error::DatabaseError>) -> ApplicationError {
    if let Some(db_error) = error {
        tracing::debug!("Database error: {}", db_error);
        tracing::info!("Add/Update error: {:?}", db_error.code());
        if db_error.code() == Some(Cow::Borrowed("23505")) {
            // Unique violation
            return ApplicationError::new(ErrorType::ConstraintViolation, "Already exists".to_string());
        } else if db_error.code() == Some(Cow::Borrowed("23503")) {
            // Foreign key violation
            return ApplicationError::new(ErrorType::ConstraintViolation, "Missing parent value".to_string());
        } else if db_error.code() == Some(Cow::Borrowed("22001")) {
            // Value too long
            return ApplicationError::new(ErrorType::Validation, "Value too long".to_string());
        }
        tracing::error!("Unhandled database error: {}", db_error);
        return ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string());
    }
    ApplicationError::new(ErrorType::DatabaseError, "Failed to execute database operation".to_string())
}

/**
 * Maps a failed read query to a database error.
 */
pub fn query_error(operation: &str, err: &sqlx::Error) -> ApplicationError {
    ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to {operation}: {err}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pagination_output_has_more() {
        let pagination_input = PaginationInput { start_index: 0, page_size: 10 };
        let pagination_output = get_pagination_output(&pagination_input, 11);
        assert_eq!(pagination_output.start_index, 0);
        assert_eq!(pagination_output.page_size, 10);
        assert!(pagination_output.has_more);
    }

    #[test]
    fn test_pagination_output_has_no_more() {
        let pagination_input = PaginationInput { start_index: 20, page_size: 10 };
        let pagination_output = get_pagination_output(&pagination_input, 10);
        assert_eq!(pagination_output.start_index, 20);
        assert!(!pagination_output.has_more);
    }

    #[test]
    fn test_list_output_truncates() {
        let pagination_input = PaginationInput { start_index: 0, page_size: 2 };
        let output = to_list_output(&pagination_input, vec![1, 2, 3]).unwrap();
        assert_eq!(output.elements, vec![1, 2]);
        assert!(output.pagination.has_more);
    }

    #[test]
    fn test_check_single_row() {
        assert!(check_single_row(1, "Vehicle", 1, "deleted").is_ok());
        assert_eq!(check_single_row(0, "Vehicle", 1, "deleted").unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(check_single_row(2, "Vehicle", 1, "updated").unwrap_err().error_type, ErrorType::Application);
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern(Some(" Rossi ")), Some("%rossi%".to_string()));
        assert_eq!(like_pattern(Some("  ")), None);
        assert_eq!(like_pattern(None), None);
    }

    #[test]
    fn test_handle_missing_database_error() {
        assert_eq!(handle_database_error(None).error_type, ErrorType::DatabaseError);
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
pub mod integration_test {
    use sqlx::PgPool;

    /**
     * Initialize the database connection pool.
     */
    pub async fn init_db() -> PgPool {
        dotenv::from_filename("./sqlx-postgresql-migration/.env-test").ok();
        let pool = PgPool::connect(dotenv::var("DATABASE_URL").unwrap().as_str()).await.unwrap();
        sqlx::migrate!("./sqlx-postgresql-migration/migrations").run(&pool).await.unwrap();
        pool
    }
}
