use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        models::{ListOutputType, PaginationInput},
        personnel::{PayslipAddInputType, PayslipDetailType},
    },
};

const QUERY_PAYSLIP: &str = "SELECT p.id, p.employee_id, p.fiscal_code, p.reference_month, p.storage_path, p.original_filename, p.uploaded_at, p.status,
                                    e.first_name || ' ' || e.last_name AS employee_name
                             FROM payslips p LEFT JOIN employees e ON e.id = p.employee_id
                             WHERE p.id = $1";

const QUERY_PAYSLIP_LIST: &str = "SELECT p.id, p.employee_id, p.fiscal_code, p.reference_month, p.storage_path, p.original_filename, p.uploaded_at, p.status,
                                         e.first_name || ' ' || e.last_name AS employee_name
                                  FROM payslips p LEFT JOIN employees e ON e.id = p.employee_id
                                  WHERE p.reference_month = $1
                                  ORDER BY e.last_name NULLS LAST, e.first_name, p.id
                                  LIMIT $2 OFFSET $3";

const QUERY_PAYSLIP_MONTHS: &str = "SELECT DISTINCT reference_month FROM payslips ORDER BY reference_month DESC";

const ADD_PAYSLIP: &str = "INSERT INTO payslips (employee_id, fiscal_code, reference_month, storage_path, original_filename, uploaded_at, status) VALUES ($1, $2, $3, $4, $5, now(), $6) RETURNING id";

const DELETE_PAYSLIP: &str = "DELETE FROM payslips WHERE id = $1 RETURNING storage_path";

const DELETE_PAYSLIPS: &str = "DELETE FROM payslips WHERE id = ANY($1) RETURNING storage_path";

const UNLINK_EMPLOYEE: &str = "UPDATE payslips SET employee_id = NULL, status = 'UNMATCHED' WHERE employee_id = $1";

/**
 * DAO for payslip database operations.
 */
pub struct PayslipDao {}

impl PayslipDao {
    pub fn new() -> Self {
        PayslipDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_payslip(&self, connection: &mut PgConnection, payslip_id: i64) -> Result<PayslipDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let payslip: Option<PayslipDetailType> = sqlx::query_as(QUERY_PAYSLIP)
            .bind(payslip_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get payslip", &err))?;
        found(payslip, "Payslip", payslip_id)
    }

    /**
     * Retrieves a page of payslips of a month.
     *
     * # Arguments
     * `connection`: The database connection.
     * `pagination_input`: Pagination information.
     * `reference_month`: First day of the month.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_payslip_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, reference_month: NaiveDate) -> Result<ListOutputType<PayslipDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<PayslipDetailType> = sqlx::query_as(QUERY_PAYSLIP_LIST)
            .bind(reference_month)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get payslip list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    /**
     * Retrieves the months having payslips, most recent first.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_payslip_months(&self, connection: &mut PgConnection) -> Result<Vec<NaiveDate>, ApplicationError> {
        let span = tracing::Span::current();
        let months: Vec<(NaiveDate,)> = sqlx::query_as(QUERY_PAYSLIP_MONTHS).fetch_all(connection).instrument(span).await.map_err(|err| query_error("get payslip months", &err))?;
        Ok(months.into_iter().map(|month| month.0).collect())
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_payslip(&self, transaction: &mut PgConnection, payslip_input: PayslipAddInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_PAYSLIP)
            .bind(payslip_input.employee_id)
            .bind(payslip_input.fiscal_code)
            .bind(payslip_input.reference_month)
            .bind(payslip_input.storage_path)
            .bind(payslip_input.original_filename)
            .bind(payslip_input.status)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    /**
     * Deletes a payslip.
     *
     * # Returns
     * Storage path of the deleted payslip.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_payslip(&self, transaction: &mut PgConnection, payslip_id: i64) -> Result<String, ApplicationError> {
        let span = tracing::Span::current();
        let deleted: Vec<(String,)> = sqlx::query_as(DELETE_PAYSLIP)
            .bind(payslip_id)
            .fetch_all(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(u64::try_from(deleted.len()).unwrap_or(u64::MAX), "Payslip", payslip_id, "deleted")?;
        found(deleted.into_iter().next().map(|path| path.0), "Payslip", payslip_id)
    }

    /**
     * Deletes several payslips. Unknown ids are ignored.
     *
     * # Returns
     * Storage paths of the deleted payslips.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_payslips(&self, transaction: &mut PgConnection, payslip_ids: &[i64]) -> Result<Vec<String>, ApplicationError> {
        let span = tracing::Span::current();
        let deleted: Vec<(String,)> = sqlx::query_as(DELETE_PAYSLIPS)
            .bind(payslip_ids)
            .fetch_all(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(deleted.into_iter().map(|path| path.0).collect())
    }

    /**
     * Detaches the payslips of an employee, marking them unmatched.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn unlink_employee(&self, transaction: &mut PgConnection, employee_id: i64) -> Result<u64, ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UNLINK_EMPLOYEE)
            .bind(employee_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(result.rows_affected())
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{dao::common::integration_test::init_db, model::enums::PayslipStatus};

    #[sqlx::test]
    async fn test_add_list_then_delete_payslips() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let payslip_dao = PayslipDao::new();
        let month = NaiveDate::from_ymd_opt(1999, 1, 1).unwrap();
        let payslip_input = |path: &str| PayslipAddInputType {
            employee_id: None,
            fiscal_code: "RSSMRA85M01H501Q".to_string(),
            reference_month: month,
            storage_path: path.to_string(),
            original_filename: "RSSMRA85M01H501Q.pdf".to_string(),
            status: PayslipStatus::Unmatched,
        };
        let first = payslip_dao.add_payslip(&mut transaction, payslip_input("payslips/1999/01/a.pdf")).await.unwrap();
        let second = payslip_dao.add_payslip(&mut transaction, payslip_input("payslips/1999/01/b.pdf")).await.unwrap();
        let list = payslip_dao.get_payslip_list(&mut transaction, PaginationInput { start_index: 0, page_size: 10 }, month).await.unwrap();
        assert_eq!(list.elements.len(), 2);
        assert!(payslip_dao.get_payslip_months(&mut transaction).await.unwrap().contains(&month));
        assert_eq!(payslip_dao.delete_payslip(&mut transaction, first).await.unwrap(), "payslips/1999/01/a.pdf");
        assert_eq!(payslip_dao.delete_payslips(&mut transaction, &[second, -1]).await.unwrap(), vec!["payslips/1999/01/b.pdf".to_string()]);
        transaction.rollback().await.unwrap();
    }
}
