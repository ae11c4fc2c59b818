use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, like_pattern, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        enums::ExpenseStatus,
        models::{ListOutputType, PaginationInput},
        personnel::{ExpenseItemDetailType, ExpenseItemInputType, ExpenseReportDetailType, ExpenseReportInputType, ExpenseReportListInputType, ExpenseTotals},
    },
};

const QUERY_EXPENSE_REPORT: &str = "SELECT r.id, r.report_number, r.employee_id, r.purpose, r.creation_date, r.submit_date, r.start_date, r.end_date, r.final_approval_date, r.total,
                                           r.reimbursable_total, r.non_reimbursable_total, r.project_id, r.payment_method, r.status,
                                           e.first_name || ' ' || e.last_name AS employee_name
                                    FROM expense_reports r JOIN employees e ON e.id = r.employee_id
                                    WHERE r.id = $1";

/**
 * SQL query to list expense reports by employee name, status and a date range on the report period.
 */
const QUERY_EXPENSE_REPORT_LIST: &str = "SELECT r.id, r.report_number, r.employee_id, r.purpose, r.creation_date, r.submit_date, r.start_date, r.end_date, r.final_approval_date, r.total,
                                                r.reimbursable_total, r.non_reimbursable_total, r.project_id, r.payment_method, r.status,
                                                e.first_name || ' ' || e.last_name AS employee_name
                                         FROM expense_reports r JOIN employees e ON e.id = r.employee_id
                                         WHERE ($1::text IS NULL OR lower(e.first_name || ' ' || e.last_name) LIKE $1) AND
                                               ($2::expense_status IS NULL OR r.status = $2) AND
                                               ($3::date IS NULL OR r.start_date >= $3) AND
                                               ($4::date IS NULL OR r.end_date <= $4)
                                         ORDER BY r.creation_date DESC, r.id DESC
                                         LIMIT $5 OFFSET $6";

const QUERY_EXPENSE_ITEMS: &str = "SELECT id, report_id, expense_date, description, amount, invoice_number, supplier_id, project_id, note FROM expense_items WHERE report_id = $1 ORDER BY expense_date NULLS LAST, id";

const ADD_EXPENSE_REPORT: &str = "INSERT INTO expense_reports (report_number, employee_id, purpose, creation_date, submit_date, start_date, end_date, total, reimbursable_total,
                                                               non_reimbursable_total, project_id, payment_method, status)
                                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                                  RETURNING id";

const UPDATE_EXPENSE_REPORT: &str = "UPDATE expense_reports SET report_number = $1, employee_id = $2, purpose = $3, submit_date = $4, start_date = $5, end_date = $6, total = $7,
                                                                reimbursable_total = $8, non_reimbursable_total = $9, project_id = $10, payment_method = $11, status = $12
                                     WHERE id = $13";

const UPDATE_EXPENSE_REPORT_APPROVAL: &str = "UPDATE expense_reports SET status = $1, final_approval_date = $2 WHERE id = $3";

const UPDATE_EXPENSE_REPORT_NUMBER: &str = "UPDATE expense_reports SET report_number = $1 WHERE id = $2";

const ADD_EXPENSE_ITEM: &str = "INSERT INTO expense_items (report_id, expense_date, description, amount, invoice_number, supplier_id, project_id, note)
                                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                                RETURNING id";

const UPDATE_EXPENSE_ITEM: &str = "UPDATE expense_items SET expense_date = $1, description = $2, amount = $3, invoice_number = $4, supplier_id = $5, project_id = $6, note = $7
                                   WHERE id = $8 AND report_id = $9";

const DELETE_EXPENSE_ITEMS: &str = "DELETE FROM expense_items WHERE report_id = $1 RETURNING id";

const DELETE_EXPENSE_ITEM_LIST: &str = "DELETE FROM expense_items WHERE report_id = $1 AND id = ANY($2)";

const DELETE_EXPENSE_REPORT: &str = "DELETE FROM expense_reports WHERE id = $1";

const QUERY_EXPENSE_REPORT_IDS_BY_EMPLOYEE: &str = "SELECT id FROM expense_reports WHERE employee_id = $1";

const COUNT_EXPENSE_REPORTS: &str = "SELECT count(*) FROM expense_reports";

const QUERY_EXPENSE_REPORT_NUMBERS: &str = "SELECT id, report_number FROM expense_reports";

const EXISTS_EXPENSE_ITEM: &str = "SELECT EXISTS(SELECT 1 FROM expense_items WHERE id = $1)";

/**
 * DAO for expense report database operations.
 */
pub struct ExpenseDao {}

impl ExpenseDao {
    pub fn new() -> Self {
        ExpenseDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_expense_report(&self, connection: &mut PgConnection, report_id: i64) -> Result<ExpenseReportDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let report: Option<ExpenseReportDetailType> = sqlx::query_as(QUERY_EXPENSE_REPORT)
            .bind(report_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get expense report", &err))?;
        found(report, "Expense report", report_id)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_expense_items(&self, connection: &mut PgConnection, report_id: i64) -> Result<Vec<ExpenseItemDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_EXPENSE_ITEMS)
            .bind(report_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get expense items", &err))
    }

    /**
     * Retrieves a page of expense reports.
     *
     * # Arguments
     * `connection`: The database connection.
     * `pagination_input`: Pagination information.
     * `filter`: Employee keyword, status and period filter.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_expense_report_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, filter: ExpenseReportListInputType) -> Result<ListOutputType<ExpenseReportDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<ExpenseReportDetailType> = sqlx::query_as(QUERY_EXPENSE_REPORT_LIST)
            .bind(like_pattern(filter.employee.as_deref()))
            .bind(filter.status)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get expense report list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    /**
     * Adds an expense report without its items.
     *
     * # Arguments
     * `transaction`: The database transaction.
     * `report_number`: Number of the report.
     * `creation_date`: Creation date of the report.
     * `status`: Initial status.
     * `report_input`: The validated report.
     * `totals`: Totals computed from the items.
     */
    #[instrument(skip(self, transaction, report_input), fields(result))]
    pub async fn add_expense_report(
        &self,
        transaction: &mut PgConnection,
        report_number: &str,
        creation_date: NaiveDate,
        status: ExpenseStatus,
        report_input: &ExpenseReportInputType,
        totals: &ExpenseTotals,
    ) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_EXPENSE_REPORT)
            .bind(report_number)
            .bind(report_input.employee_id)
            .bind(report_input.purpose.as_deref())
            .bind(creation_date)
            .bind(report_input.submit_date)
            .bind(report_input.start_date)
            .bind(report_input.end_date)
            .bind(totals.total)
            .bind(totals.reimbursable)
            .bind(totals.non_reimbursable)
            .bind(report_input.project_id)
            .bind(report_input.payment_method)
            .bind(status)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction, report_input), fields(result))]
    pub async fn update_expense_report(
        &self,
        transaction: &mut PgConnection,
        report_id: i64,
        report_number: &str,
        status: ExpenseStatus,
        report_input: &ExpenseReportInputType,
        totals: &ExpenseTotals,
    ) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_EXPENSE_REPORT)
            .bind(report_number)
            .bind(report_input.employee_id)
            .bind(report_input.purpose.as_deref())
            .bind(report_input.submit_date)
            .bind(report_input.start_date)
            .bind(report_input.end_date)
            .bind(totals.total)
            .bind(totals.reimbursable)
            .bind(totals.non_reimbursable)
            .bind(report_input.project_id)
            .bind(report_input.payment_method)
            .bind(status)
            .bind(report_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Expense report", report_id, "updated")
    }

    /**
     * Sets the status and final approval date of a report.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_expense_report_approval(&self, transaction: &mut PgConnection, report_id: i64, status: ExpenseStatus, final_approval_date: Option<NaiveDate>) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_EXPENSE_REPORT_APPROVAL)
            .bind(status)
            .bind(final_approval_date)
            .bind(report_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Expense report", report_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_expense_report_number(&self, transaction: &mut PgConnection, report_id: i64, report_number: &str) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_EXPENSE_REPORT_NUMBER)
            .bind(report_number)
            .bind(report_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Expense report", report_id, "updated")
    }

    #[instrument(skip(self, transaction, item_input), fields(result))]
    pub async fn add_expense_item(&self, transaction: &mut PgConnection, report_id: i64, item_input: ExpenseItemInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_EXPENSE_ITEM)
            .bind(report_id)
            .bind(item_input.expense_date)
            .bind(item_input.description)
            .bind(item_input.amount)
            .bind(item_input.invoice_number)
            .bind(item_input.supplier_id)
            .bind(item_input.project_id)
            .bind(item_input.note)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    /**
     * Updates an item in place. The item must belong to the report.
     */
    #[instrument(skip(self, transaction, item_input), fields(result))]
    pub async fn update_expense_item(&self, transaction: &mut PgConnection, report_id: i64, item_id: i64, item_input: ExpenseItemInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_EXPENSE_ITEM)
            .bind(item_input.expense_date)
            .bind(item_input.description)
            .bind(item_input.amount)
            .bind(item_input.invoice_number)
            .bind(item_input.supplier_id)
            .bind(item_input.project_id)
            .bind(item_input.note)
            .bind(item_id)
            .bind(report_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Expense item", item_id, "updated")
    }

    /**
     * Deletes the given items of a report.
     *
     * # Returns
     * Number of deleted items.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_expense_item_list(&self, transaction: &mut PgConnection, report_id: i64, item_ids: &[i64]) -> Result<u64, ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_EXPENSE_ITEM_LIST)
            .bind(report_id)
            .bind(item_ids)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(result.rows_affected())
    }

    /**
     * Deletes the items of a report.
     *
     * # Returns
     * Ids of the deleted items.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_expense_items(&self, transaction: &mut PgConnection, report_id: i64) -> Result<Vec<i64>, ApplicationError> {
        let span = tracing::Span::current();
        let deleted: Vec<(i64,)> = sqlx::query_as(DELETE_EXPENSE_ITEMS)
            .bind(report_id)
            .fetch_all(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(deleted.into_iter().map(|id| id.0).collect())
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_expense_report(&self, transaction: &mut PgConnection, report_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_EXPENSE_REPORT)
            .bind(report_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Expense report", report_id, "deleted")
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_expense_report_ids_by_employee(&self, connection: &mut PgConnection, employee_id: i64) -> Result<Vec<i64>, ApplicationError> {
        let span = tracing::Span::current();
        let ids: Vec<(i64,)> = sqlx::query_as(QUERY_EXPENSE_REPORT_IDS_BY_EMPLOYEE)
            .bind(employee_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get expense reports of employee", &err))?;
        Ok(ids.into_iter().map(|id| id.0).collect())
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn count_expense_reports(&self, connection: &mut PgConnection) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let count: (i64,) = sqlx::query_as(COUNT_EXPENSE_REPORTS).fetch_one(connection).instrument(span).await.map_err(|err| query_error("count expense reports", &err))?;
        Ok(count.0)
    }

    /**
     * Retrieves the number of every report.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_expense_report_numbers(&self, connection: &mut PgConnection) -> Result<Vec<(i64, String)>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_EXPENSE_REPORT_NUMBERS)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get expense report numbers", &err))
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn expense_item_exists(&self, connection: &mut PgConnection, item_id: i64) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_EXPENSE_ITEM)
            .bind(item_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check expense item", &err))?;
        Ok(exists.0)
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::dao::{
        common::integration_test::init_db,
        employees::{EmployeeDao, integration_test::employee_input},
    };
    use crate::model::apperror::ErrorType;
    use rust_decimal::Decimal;

    #[sqlx::test]
    async fn test_add_approve_then_delete_expense_report() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let employee_id = EmployeeDao::new().add_employee(&mut transaction, employee_input("RSSMRA85M01H501Q", "mario.rossi@example.it")).await.unwrap();
        let expense_dao = ExpenseDao::new();
        let item = ExpenseItemInputType { id: None, expense_date: None, description: "Taxi".to_string(), amount: Some(Decimal::new(1000, 2)), invoice_number: None, supplier_id: None, project_id: None, note: None };
        let report_input = ExpenseReportInputType {
            report_number: None,
            employee_id,
            purpose: Some("Trasferta".to_string()),
            creation_date: None,
            submit_date: None,
            start_date: None,
            end_date: None,
            reimbursable_total: None,
            project_id: None,
            payment_method: None,
            status: None,
            items: vec![item.clone()],
        };
        let totals = ExpenseTotals::compute(&report_input.items, None);
        let creation_date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let report_id = expense_dao.add_expense_report(&mut transaction, "999/2024/TEST", creation_date, ExpenseStatus::Draft, &report_input, &totals).await.unwrap();
        let item_id = expense_dao.add_expense_item(&mut transaction, report_id, item).await.unwrap();
        assert!(expense_dao.expense_item_exists(&mut transaction, item_id).await.unwrap());
        let renamed = ExpenseItemInputType { description: "Treno".to_string(), ..item_input_for_update() };
        expense_dao.update_expense_item(&mut transaction, report_id, item_id, renamed).await.unwrap();
        assert_eq!(expense_dao.get_expense_items(&mut transaction, report_id).await.unwrap()[0].description, "Treno");
        assert_eq!(expense_dao.update_expense_item(&mut transaction, report_id + 1, item_id, item_input_for_update()).await.unwrap_err().error_type, ErrorType::NotFound);
        let second_id = expense_dao.add_expense_item(&mut transaction, report_id, item_input_for_update()).await.unwrap();
        assert_eq!(expense_dao.delete_expense_item_list(&mut transaction, report_id, &[second_id]).await.unwrap(), 1);
        assert!(!expense_dao.expense_item_exists(&mut transaction, second_id).await.unwrap());
        expense_dao.update_expense_report_approval(&mut transaction, report_id, ExpenseStatus::Approved, Some(creation_date)).await.unwrap();
        let report = expense_dao.get_expense_report(&mut transaction, report_id).await.unwrap();
        assert_eq!(report.status, ExpenseStatus::Approved);
        assert_eq!(report.total, Decimal::new(1000, 2));
        assert_eq!(expense_dao.get_expense_items(&mut transaction, report_id).await.unwrap().len(), 1);
        assert_eq!(expense_dao.delete_expense_items(&mut transaction, report_id).await.unwrap().len(), 1);
        assert!(expense_dao.delete_expense_report(&mut transaction, report_id).await.is_ok());
        transaction.rollback().await.unwrap();
    }

    fn item_input_for_update() -> ExpenseItemInputType {
        ExpenseItemInputType { id: None, expense_date: None, description: "Taxi".to_string(), amount: Some(Decimal::new(500, 2)), invoice_number: None, supplier_id: None, project_id: None, note: None }
    }

    #[sqlx::test]
    async fn test_get_expense_report_list() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let filter = ExpenseReportListInputType { employee: Some("rossi".to_string()), status: Some(ExpenseStatus::Submitted), start_date: None, end_date: None };
        assert!(ExpenseDao::new().get_expense_report_list(&mut connection, PaginationInput { start_index: 0, page_size: 10 }, filter).await.is_ok());
    }
}
