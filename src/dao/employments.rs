use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, like_pattern, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        models::{ListOutputType, PaginationInput},
        personnel::{EmploymentDetailType, EmploymentInputType, EmploymentListInputType},
    },
};

const QUERY_EMPLOYMENT: &str = "SELECT m.id, m.employee_id, m.matricola, m.contract_type, m.branch, m.department, m.job_title, m.contract_level, m.ccnl, m.job_role, m.salary, m.start_date,
                                       m.end_date, m.job_description, m.status, e.first_name AS employee_first_name, e.last_name AS employee_last_name
                                FROM employments m JOIN employees e ON e.id = m.employee_id
                                WHERE m.id = $1";

/**
 * SQL query to search employments by employee name, matricola or job title and by status.
 */
const QUERY_EMPLOYMENT_LIST: &str = "SELECT m.id, m.employee_id, m.matricola, m.contract_type, m.branch, m.department, m.job_title, m.contract_level, m.ccnl, m.job_role, m.salary,
                                            m.start_date, m.end_date, m.job_description, m.status, e.first_name AS employee_first_name, e.last_name AS employee_last_name
                                     FROM employments m JOIN employees e ON e.id = m.employee_id
                                     WHERE ($1::employment_status IS NULL OR m.status = $1) AND
                                           ($2::text IS NULL OR lower(e.first_name) LIKE $2 OR lower(e.last_name) LIKE $2 OR lower(m.matricola) LIKE $2 OR lower(m.job_title) LIKE $2)
                                     ORDER BY e.last_name, e.first_name, m.id
                                     LIMIT $3 OFFSET $4";

const ADD_EMPLOYMENT: &str = "INSERT INTO employments (employee_id, matricola, contract_type, branch, department, job_title, contract_level, ccnl, job_role, salary, start_date, end_date,
                                                       job_description, status)
                              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                              RETURNING id";

const UPDATE_EMPLOYMENT: &str = "UPDATE employments SET employee_id = $1, matricola = $2, contract_type = $3, branch = $4, department = $5, job_title = $6, contract_level = $7, ccnl = $8,
                                                        job_role = $9, salary = $10, start_date = $11, end_date = $12, job_description = $13, status = $14
                                 WHERE id = $15";

const TERMINATE_EMPLOYMENT: &str = "UPDATE employments SET end_date = $1, status = 'TERMINATED' WHERE id = $2";

/**
 * SQL query terminating every employment whose end date has passed.
 */
const TERMINATE_EXPIRED_EMPLOYMENTS: &str = "UPDATE employments SET status = 'TERMINATED' WHERE status <> 'TERMINATED' AND end_date IS NOT NULL AND end_date < $1";

const DELETE_EMPLOYMENT: &str = "DELETE FROM employments WHERE id = $1";

const QUERY_EMPLOYMENT_IDS_BY_EMPLOYEE: &str = "SELECT id FROM employments WHERE employee_id = $1";

const DELETE_EMPLOYMENTS_BY_EMPLOYEE: &str = "DELETE FROM employments WHERE employee_id = $1 RETURNING id, matricola";

/**
 * DAO for employment-related database operations.
 */
pub struct EmploymentDao {}

impl EmploymentDao {
    pub fn new() -> Self {
        EmploymentDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_employment(&self, connection: &mut PgConnection, employment_id: i64) -> Result<EmploymentDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let employment: Option<EmploymentDetailType> = sqlx::query_as(QUERY_EMPLOYMENT)
            .bind(employment_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get employment", &err))?;
        found(employment, "Employment", employment_id)
    }

    /**
     * Retrieves a page of employments.
     *
     * # Arguments
     * `connection`: The database connection.
     * `pagination_input`: Pagination information.
     * `filter`: Keyword and status filter.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_employment_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, filter: EmploymentListInputType) -> Result<ListOutputType<EmploymentDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<EmploymentDetailType> = sqlx::query_as(QUERY_EMPLOYMENT_LIST)
            .bind(filter.status)
            .bind(like_pattern(filter.keyword.as_deref()))
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get employment list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_employment(&self, transaction: &mut PgConnection, employment_input: EmploymentInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_EMPLOYMENT)
            .bind(employment_input.employee_id)
            .bind(employment_input.matricola)
            .bind(employment_input.contract_type)
            .bind(employment_input.branch)
            .bind(employment_input.department)
            .bind(employment_input.job_title)
            .bind(employment_input.contract_level)
            .bind(employment_input.ccnl)
            .bind(employment_input.job_role)
            .bind(employment_input.salary)
            .bind(employment_input.start_date)
            .bind(employment_input.end_date)
            .bind(employment_input.job_description)
            .bind(employment_input.status)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_employment(&self, transaction: &mut PgConnection, employment_id: i64, employment_input: EmploymentInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_EMPLOYMENT)
            .bind(employment_input.employee_id)
            .bind(employment_input.matricola)
            .bind(employment_input.contract_type)
            .bind(employment_input.branch)
            .bind(employment_input.department)
            .bind(employment_input.job_title)
            .bind(employment_input.contract_level)
            .bind(employment_input.ccnl)
            .bind(employment_input.job_role)
            .bind(employment_input.salary)
            .bind(employment_input.start_date)
            .bind(employment_input.end_date)
            .bind(employment_input.job_description)
            .bind(employment_input.status)
            .bind(employment_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Employment", employment_id, "updated")
    }

    /**
     * Terminates an employment at the given end date.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn terminate_employment(&self, transaction: &mut PgConnection, employment_id: i64, end_date: NaiveDate) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(TERMINATE_EMPLOYMENT)
            .bind(end_date)
            .bind(employment_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Employment", employment_id, "updated")
    }

    /**
     * Terminates every employment that ended before `today`.
     *
     * # Returns
     * Number of terminated employments.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn terminate_expired_employments(&self, transaction: &mut PgConnection, today: NaiveDate) -> Result<u64, ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(TERMINATE_EXPIRED_EMPLOYMENTS)
            .bind(today)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_employment(&self, transaction: &mut PgConnection, employment_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_EMPLOYMENT)
            .bind(employment_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Employment", employment_id, "deleted")
    }

    /**
     * Deletes every employment of an employee.
     *
     * # Returns
     * Id and matricola of each deleted employment.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_employments_by_employee(&self, transaction: &mut PgConnection, employee_id: i64) -> Result<Vec<(i64, String)>, ApplicationError> {
        let span = tracing::Span::current();
        let deleted: Vec<(i64, String)> = sqlx::query_as(DELETE_EMPLOYMENTS_BY_EMPLOYEE)
            .bind(employee_id)
            .fetch_all(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(deleted)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_employment_ids_by_employee(&self, connection: &mut PgConnection, employee_id: i64) -> Result<Vec<i64>, ApplicationError> {
        let span = tracing::Span::current();
        let ids: Vec<(i64,)> = sqlx::query_as(QUERY_EMPLOYMENT_IDS_BY_EMPLOYEE)
            .bind(employee_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get employments of employee", &err))?;
        Ok(ids.into_iter().map(|id| id.0).collect())
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
pub mod integration_test {
    use super::*;
    use crate::dao::{common::integration_test::init_db, employees::EmployeeDao, employees::integration_test::employee_input};
    use crate::model::enums::EmploymentStatus;

    pub fn employment_input(employee_id: i64, matricola: &str) -> EmploymentInputType {
        EmploymentInputType {
            employee_id,
            matricola: matricola.to_string(),
            contract_type: None,
            branch: None,
            department: None,
            job_title: Some("Driver".to_string()),
            contract_level: None,
            ccnl: None,
            job_role: None,
            salary: None,
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2021, 1, 1),
            job_description: None,
            status: EmploymentStatus::Active,
        }
    }

    #[sqlx::test]
    async fn test_add_terminate_expired_then_delete_employment() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let employee_id = EmployeeDao::new().add_employee(&mut transaction, employee_input("RSSMRA85M01H501Q", "mario.rossi@example.it")).await.unwrap();
        let employment_dao = EmploymentDao::new();
        let employment_id = employment_dao.add_employment(&mut transaction, employment_input(employee_id, "T0001")).await.unwrap();
        assert_eq!(employment_dao.get_employment_ids_by_employee(&mut transaction, employee_id).await.unwrap(), vec![employment_id]);
        let terminated = employment_dao.terminate_expired_employments(&mut transaction, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).await.unwrap();
        assert!(terminated >= 1);
        let employment = employment_dao.get_employment(&mut transaction, employment_id).await.unwrap();
        assert_eq!(employment.status, EmploymentStatus::Terminated);
        assert_eq!(employment.employee_last_name, "Rossi");
        assert!(employment_dao.delete_employment(&mut transaction, employment_id).await.is_ok());
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_get_employment_list() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let result = EmploymentDao::new()
            .get_employment_list(&mut connection, PaginationInput { start_index: 0, page_size: 10 }, EmploymentListInputType { keyword: Some("driver".to_string()), status: Some(EmploymentStatus::Active) })
            .await;
        assert!(result.is_ok());
    }
}
