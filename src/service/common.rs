use chrono::{Days, Local, NaiveDate, NaiveDateTime};
use sqlx::{Pool, Postgres, Transaction, pool::PoolConnection};

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Returns the pool or fails when the service runs without a database.
 */
pub fn connection_pool(connection_pool: &Option<Pool<Postgres>>) -> Result<&Pool<Postgres>, ApplicationError> {
    connection_pool.as_ref().ok_or_else(|| ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()))
}

/**
 * Acquires a connection for read operations.
 */
pub async fn acquire(connection_pool: &Pool<Postgres>) -> Result<PoolConnection<Postgres>, ApplicationError> {
    connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))
}

/**
 * Begins a transaction for write operations.
 */
pub async fn begin(connection_pool: &Pool<Postgres>) -> Result<Transaction<'static, Postgres>, ApplicationError> {
    connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))
}

/**
 * Commits the transaction when the work succeeded, rolls it back otherwise.
 *
 * # Arguments
 * `transaction`: The open transaction.
 * `result`: Outcome of the work done in the transaction.
 *
 * # Returns
 * The outcome of the work, or the commit failure.
 */
pub async fn finish<T>(transaction: Transaction<'static, Postgres>, result: Result<T, ApplicationError>) -> Result<T, ApplicationError> {
    match result {
        Ok(value) => {
            transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
            Ok(value)
        }
        Err(err) => {
            transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
            Err(err)
        }
    }
}

/**
 * Local date of the server.
 */
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/**
 * Local date and time of the server.
 */
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/**
 * Fails with a not found error unless a referenced entity exists.
 */
pub fn check_reference(exists: bool, entity: &str, id: i64) -> Result<(), ApplicationError> {
    if exists { Ok(()) } else { Err(ApplicationError::new(ErrorType::NotFound, format!("{entity} with id {id} not found"))) }
}

/**
 * The date range from `today` to `days` days later.
 */
pub fn expiry_window(today: NaiveDate, days: i64) -> Result<(NaiveDate, NaiveDate), ApplicationError> {
    let end = u64::try_from(days).ok().and_then(|days| today.checked_add_days(Days::new(days)));
    match end {
        Some(end) => Ok((today, end)),
        None => Err(ApplicationError::new(ErrorType::Validation, format!("Invalid number of days {days}"))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_pool() {
        let error = connection_pool(&None).unwrap_err();
        assert_eq!(error.error_type, ErrorType::DatabaseError);
    }

    #[test]
    fn test_check_reference() {
        assert!(check_reference(true, "Supplier", 1).is_ok());
        assert_eq!(check_reference(false, "Supplier", 1).unwrap_err().error_type, ErrorType::NotFound);
    }

    #[test]
    fn test_expiry_window() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
        assert_eq!(expiry_window(today, 30).unwrap(), (today, NaiveDate::from_ymd_opt(2025, 1, 19).unwrap()));
        assert_eq!(expiry_window(today, 0).unwrap(), (today, today));
        assert_eq!(expiry_window(today, -1).unwrap_err().error_type, ErrorType::Validation);
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
pub mod integration_test {
    use std::{path::Path, sync::Arc};

    use sqlx::PgPool;

    use crate::{
        dao::employees::{EmployeeDao, integration_test::employee_input},
        model::config::StorageConfig,
        service::storage::{FileStorage, UploadedFile},
    };

    /**
     * File storage rooted in a test directory.
     */
    pub fn test_storage(root: &Path) -> Arc<FileStorage> {
        Arc::new(FileStorage::new(&StorageConfig { root_directory: root.to_string_lossy().to_string(), ..StorageConfig::default() }))
    }

    /**
     * Uppercase code of `length` characters, unique across test runs.
     */
    pub fn unique_code(prefix: &str, length: usize) -> String {
        let random = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        format!("{prefix}{}", &random[..length - prefix.len()])
    }

    pub fn pdf_file(file_name: &str) -> UploadedFile {
        UploadedFile { file_name: file_name.to_string(), content_type: Some("application/pdf".to_string()), data: b"%PDF-1.4".to_vec() }
    }

    /**
     * Commits a new employee with a unique fiscal code and email.
     */
    pub async fn add_test_employee(pool: &PgPool) -> i64 {
        let mut transaction = pool.begin().await.unwrap();
        let code = unique_code("", 16);
        let email = format!("{}@example.it", code.to_lowercase());
        let employee_id = EmployeeDao::new().add_employee(&mut transaction, employee_input(&code, &email)).await.unwrap();
        transaction.commit().await.unwrap();
        employee_id
    }
}
