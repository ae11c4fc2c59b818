use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, like_pattern, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        models::{ListOutputType, PaginationInput},
        personnel::{EmployeeDetailType, EmployeeInputType, EmployeeListInputType},
    },
};

const QUERY_EMPLOYEE: &str = "SELECT id, first_name, last_name, birth_date, birth_place, gender, fiscal_code, phone, mobile, iban, email, pec, marital_status, education_level,
                                     street, country_code, country, region_code, region, province_code, province, city_code, city, locality, postal_code, created_at, updated_at
                              FROM employees WHERE id = $1";

/**
 * SQL query to search employees by first or last name.
 */
const QUERY_EMPLOYEE_LIST: &str = "SELECT id, first_name, last_name, birth_date, birth_place, gender, fiscal_code, phone, mobile, iban, email, pec, marital_status, education_level,
                                          street, country_code, country, region_code, region, province_code, province, city_code, city, locality, postal_code, created_at, updated_at
                                   FROM employees
                                   WHERE ($1::text IS NULL OR lower(first_name) LIKE $1 OR lower(last_name) LIKE $1)
                                   ORDER BY last_name, first_name, id
                                   LIMIT $2 OFFSET $3";

/**
 * SQL query to list employees without an active employment.
 */
const QUERY_EMPLOYEES_AVAILABLE: &str = "SELECT id, first_name, last_name, birth_date, birth_place, gender, fiscal_code, phone, mobile, iban, email, pec, marital_status, education_level,
                                                street, country_code, country, region_code, region, province_code, province, city_code, city, locality, postal_code, created_at, updated_at
                                         FROM employees e
                                         WHERE NOT EXISTS (SELECT 1 FROM employments m WHERE m.employee_id = e.id AND m.status = 'ACTIVE')
                                         ORDER BY last_name, first_name, id
                                         LIMIT $1 OFFSET $2";

const ADD_EMPLOYEE: &str = "INSERT INTO employees (first_name, last_name, birth_date, birth_place, gender, fiscal_code, phone, mobile, iban, email, pec, marital_status, education_level,
                                                   street, country_code, country, region_code, region, province_code, province, city_code, city, locality, postal_code, created_at, updated_at)
                            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, now(), now())
                            RETURNING id";

const UPDATE_EMPLOYEE: &str = "UPDATE employees SET first_name = $1, last_name = $2, birth_date = $3, birth_place = $4, gender = $5, fiscal_code = $6, phone = $7, mobile = $8, iban = $9,
                                                    email = $10, pec = $11, marital_status = $12, education_level = $13, street = $14, country_code = $15, country = $16,
                                                    region_code = $17, region = $18, province_code = $19, province = $20, city_code = $21, city = $22, locality = $23,
                                                    postal_code = $24, updated_at = now()
                               WHERE id = $25";

const DELETE_EMPLOYEE: &str = "DELETE FROM employees WHERE id = $1";

const EXISTS_EMPLOYEE: &str = "SELECT EXISTS (SELECT 1 FROM employees WHERE id = $1)";

/**
 * SQL query checking whether another employee uses the email.
 */
const EXISTS_EMAIL: &str = "SELECT EXISTS (SELECT 1 FROM employees WHERE lower(email) = lower($1) AND ($2::bigint IS NULL OR id <> $2))";

/**
 * SQL query checking whether another employee uses the fiscal code.
 */
const EXISTS_FISCAL_CODE: &str = "SELECT EXISTS (SELECT 1 FROM employees WHERE upper(fiscal_code) = upper($1) AND ($2::bigint IS NULL OR id <> $2))";

const QUERY_EMPLOYEE_ID_BY_FISCAL_CODE: &str = "SELECT id FROM employees WHERE upper(fiscal_code) = upper($1)";

/**
 * DAO for employee-related database operations.
 */
pub struct EmployeeDao {}

impl EmployeeDao {
    pub fn new() -> Self {
        EmployeeDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_employee(&self, connection: &mut PgConnection, employee_id: i64) -> Result<EmployeeDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let employee: Option<EmployeeDetailType> = sqlx::query_as(QUERY_EMPLOYEE)
            .bind(employee_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get employee", &err))?;
        found(employee, "Employee", employee_id)
    }

    /**
     * Retrieves a page of employees, optionally filtered by a keyword on first or last name.
     *
     * # Arguments
     * `connection`: The database connection.
     * `pagination_input`: Pagination information.
     * `filter`: Keyword filter, case-insensitive.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_employee_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, filter: EmployeeListInputType) -> Result<ListOutputType<EmployeeDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<EmployeeDetailType> = sqlx::query_as(QUERY_EMPLOYEE_LIST)
            .bind(like_pattern(filter.keyword.as_deref()))
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get employee list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    /**
     * Retrieves a page of employees that have no active employment.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_available_employee_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput) -> Result<ListOutputType<EmployeeDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<EmployeeDetailType> = sqlx::query_as(QUERY_EMPLOYEES_AVAILABLE)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get available employees", &err))?;
        to_list_output(&pagination_input, elements)
    }

    /**
     * Adds an employee.
     *
     * # Returns
     * Id of the new employee.
     */
    #[instrument(skip(self, transaction, employee_input), fields(result))]
    pub async fn add_employee(&self, transaction: &mut PgConnection, employee_input: EmployeeInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let address = employee_input.residence_address;
        let id: (i64,) = sqlx::query_as(ADD_EMPLOYEE)
            .bind(employee_input.first_name)
            .bind(employee_input.last_name)
            .bind(employee_input.birth_date)
            .bind(employee_input.birth_place)
            .bind(employee_input.gender)
            .bind(employee_input.fiscal_code)
            .bind(employee_input.phone)
            .bind(employee_input.mobile)
            .bind(employee_input.iban)
            .bind(employee_input.email)
            .bind(employee_input.pec)
            .bind(employee_input.marital_status)
            .bind(employee_input.education_level)
            .bind(address.street)
            .bind(address.country_code)
            .bind(address.country)
            .bind(address.region_code)
            .bind(address.region)
            .bind(address.province_code)
            .bind(address.province)
            .bind(address.city_code)
            .bind(address.city)
            .bind(address.locality)
            .bind(address.postal_code)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction, employee_input), fields(result))]
    pub async fn update_employee(&self, transaction: &mut PgConnection, employee_id: i64, employee_input: EmployeeInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let address = employee_input.residence_address;
        let result = sqlx::query(UPDATE_EMPLOYEE)
            .bind(employee_input.first_name)
            .bind(employee_input.last_name)
            .bind(employee_input.birth_date)
            .bind(employee_input.birth_place)
            .bind(employee_input.gender)
            .bind(employee_input.fiscal_code)
            .bind(employee_input.phone)
            .bind(employee_input.mobile)
            .bind(employee_input.iban)
            .bind(employee_input.email)
            .bind(employee_input.pec)
            .bind(employee_input.marital_status)
            .bind(employee_input.education_level)
            .bind(address.street)
            .bind(address.country_code)
            .bind(address.country)
            .bind(address.region_code)
            .bind(address.region)
            .bind(address.province_code)
            .bind(address.province)
            .bind(address.city_code)
            .bind(address.city)
            .bind(address.locality)
            .bind(address.postal_code)
            .bind(employee_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Employee", employee_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_employee(&self, transaction: &mut PgConnection, employee_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_EMPLOYEE)
            .bind(employee_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Employee", employee_id, "deleted")
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn employee_exists(&self, connection: &mut PgConnection, employee_id: i64) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_EMPLOYEE)
            .bind(employee_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check employee", &err))?;
        Ok(exists.0)
    }

    /**
     * Checks whether an employee other than `excluded_id` already uses the email.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn email_in_use(&self, connection: &mut PgConnection, email: &str, excluded_id: Option<i64>) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_EMAIL)
            .bind(email)
            .bind(excluded_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check employee email", &err))?;
        Ok(exists.0)
    }

    /**
     * Checks whether an employee other than `excluded_id` already uses the fiscal code.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn fiscal_code_in_use(&self, connection: &mut PgConnection, fiscal_code: &str, excluded_id: Option<i64>) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_FISCAL_CODE)
            .bind(fiscal_code)
            .bind(excluded_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check employee fiscal code", &err))?;
        Ok(exists.0)
    }

    /**
     * Finds the employee with a fiscal code, compared case-insensitively.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn find_employee_id_by_fiscal_code(&self, connection: &mut PgConnection, fiscal_code: &str) -> Result<Option<i64>, ApplicationError> {
        let span = tracing::Span::current();
        let id: Option<(i64,)> = sqlx::query_as(QUERY_EMPLOYEE_ID_BY_FISCAL_CODE)
            .bind(fiscal_code)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("find employee by fiscal code", &err))?;
        Ok(id.map(|id| id.0))
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
pub mod integration_test {
    use super::*;
    use crate::{
        dao::common::integration_test::init_db,
        model::{apperror::ErrorType, enums::Gender, models::FullAddress},
    };
    use chrono::NaiveDate;

    pub fn employee_input(fiscal_code: &str, email: &str) -> EmployeeInputType {
        EmployeeInputType {
            first_name: "Mario".to_string(),
            last_name: "Rossi".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1985, 8, 1),
            birth_place: None,
            gender: Some(Gender::Male),
            fiscal_code: fiscal_code.to_string(),
            phone: None,
            mobile: None,
            iban: None,
            email: email.to_string(),
            pec: None,
            marital_status: None,
            education_level: None,
            residence_address: FullAddress::default(),
        }
    }

    #[sqlx::test]
    async fn test_add_update_then_delete_employee() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let employee_dao = EmployeeDao::new();
        let employee_id = employee_dao.add_employee(&mut transaction, employee_input("RSSMRA85M01H501Q", "mario.rossi@example.it")).await.unwrap();
        assert!(employee_dao.email_in_use(&mut transaction, "MARIO.ROSSI@example.it", None).await.unwrap());
        assert!(!employee_dao.email_in_use(&mut transaction, "mario.rossi@example.it", Some(employee_id)).await.unwrap());
        assert!(employee_dao.fiscal_code_in_use(&mut transaction, "rssmra85m01h501q", None).await.unwrap());
        assert_eq!(employee_dao.find_employee_id_by_fiscal_code(&mut transaction, "rssmra85m01h501q").await.unwrap(), Some(employee_id));
        let update_result = employee_dao.update_employee(&mut transaction, employee_id, employee_input("RSSMRA85M01H501Q", "m.rossi@example.it")).await;
        assert!(update_result.is_ok());
        let employee = employee_dao.get_employee(&mut transaction, employee_id).await.unwrap();
        assert_eq!(employee.email, "m.rossi@example.it");
        assert!(employee_dao.delete_employee(&mut transaction, employee_id).await.is_ok());
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_duplicate_fiscal_code() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let employee_dao = EmployeeDao::new();
        employee_dao.add_employee(&mut transaction, employee_input("MRTMTT91D08F205J", "a@example.it")).await.unwrap();
        let error = employee_dao.add_employee(&mut transaction, employee_input("MRTMTT91D08F205J", "b@example.it")).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::ConstraintViolation);
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_get_employee_lists() {
        let pool = init_db().await;
        let employee_dao = EmployeeDao::new();
        let mut connection = pool.acquire().await.unwrap();
        let pagination_input = PaginationInput { start_index: 0, page_size: 10 };
        assert!(employee_dao.get_employee_list(&mut connection, pagination_input.clone(), EmployeeListInputType { keyword: Some("ross".to_string()) }).await.is_ok());
        assert!(employee_dao.get_available_employee_list(&mut connection, pagination_input).await.is_ok());
    }
}
