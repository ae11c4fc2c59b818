use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, like_pattern, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        models::{ListOutputType, PaginationInput},
        registry::{ComplianceItemDetailType, ComplianceItemListInputType, ComplianceItemValidInputType},
    },
};

const QUERY_COMPLIANCE_ITEM: &str = "SELECT c.id, c.category, c.employee_id, c.project_id, c.description, c.visit_date, c.periodicity, c.due_date,
                                            e.first_name || ' ' || e.last_name AS employee_name, p.code AS project_code
                                     FROM compliance_items c
                                     LEFT JOIN employees e ON e.id = c.employee_id
                                     LEFT JOIN projects p ON p.id = c.project_id
                                     WHERE c.id = $1";

/**
 * `$6` selects expired (due before `$7`) or not expired items, both when null.
 */
const QUERY_COMPLIANCE_ITEM_LIST: &str = "SELECT c.id, c.category, c.employee_id, c.project_id, c.description, c.visit_date, c.periodicity, c.due_date,
                                                 e.first_name || ' ' || e.last_name AS employee_name, p.code AS project_code
                                          FROM compliance_items c
                                          LEFT JOIN employees e ON e.id = c.employee_id
                                          LEFT JOIN projects p ON p.id = c.project_id
                                          WHERE ($1::text IS NULL OR lower(c.category) LIKE $1) AND
                                                ($2::bigint IS NULL OR c.project_id = $2) AND
                                                ($3::bigint IS NULL OR c.employee_id = $3) AND
                                                ($4::date IS NULL OR c.due_date >= $4) AND
                                                ($5::date IS NULL OR c.due_date <= $5) AND
                                                ($6::boolean IS NULL OR (c.due_date < $7) = $6)
                                          ORDER BY c.due_date, c.id
                                          LIMIT $8 OFFSET $9";

const QUERY_UPCOMING_COMPLIANCE_ITEMS: &str = "SELECT c.id, c.category, c.employee_id, c.project_id, c.description, c.visit_date, c.periodicity, c.due_date,
                                                      e.first_name || ' ' || e.last_name AS employee_name, p.code AS project_code
                                               FROM compliance_items c
                                               LEFT JOIN employees e ON e.id = c.employee_id
                                               LEFT JOIN projects p ON p.id = c.project_id
                                               WHERE c.due_date BETWEEN $1 AND $2
                                               ORDER BY c.due_date, c.id
                                               LIMIT $3";

const ADD_COMPLIANCE_ITEM: &str = "INSERT INTO compliance_items (category, employee_id, project_id, description, visit_date, periodicity, due_date)
                                   VALUES ($1, $2, $3, $4, $5, $6, $7)
                                   RETURNING id";

const UPDATE_COMPLIANCE_ITEM: &str = "UPDATE compliance_items SET category = $1, employee_id = $2, project_id = $3, description = $4, visit_date = $5, periodicity = $6,
                                                                  due_date = $7
                                      WHERE id = $8";

const DELETE_COMPLIANCE_ITEM: &str = "DELETE FROM compliance_items WHERE id = $1";

const DELETE_COMPLIANCE_ITEMS_BY_EMPLOYEE: &str = "DELETE FROM compliance_items WHERE employee_id = $1 RETURNING id";

/**
 * DAO for safety and medical compliance deadlines.
 */
pub struct ComplianceDao {}

impl ComplianceDao {
    pub fn new() -> Self {
        ComplianceDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_compliance_item(&self, connection: &mut PgConnection, compliance_item_id: i64) -> Result<ComplianceItemDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let compliance_item: Option<ComplianceItemDetailType> = sqlx::query_as(QUERY_COMPLIANCE_ITEM)
            .bind(compliance_item_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get compliance item", &err))?;
        found(compliance_item, "Compliance item", compliance_item_id)
    }

    /**
     * Searches compliance items, earliest due date first.
     *
     * # Arguments
     * `connection`: The database connection.
     * `pagination_input`: Pagination information.
     * `filter`: Search criteria.
     * `today`: Reference date for the expired flag.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_compliance_item_list(
        &self,
        connection: &mut PgConnection,
        pagination_input: PaginationInput,
        filter: ComplianceItemListInputType,
        today: NaiveDate,
    ) -> Result<ListOutputType<ComplianceItemDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<ComplianceItemDetailType> = sqlx::query_as(QUERY_COMPLIANCE_ITEM_LIST)
            .bind(like_pattern(filter.category.as_deref()))
            .bind(filter.project_id)
            .bind(filter.employee_id)
            .bind(filter.due_from)
            .bind(filter.due_to)
            .bind(filter.expired)
            .bind(today)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get compliance item list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    /**
     * Retrieves at most `limit` items due between `from` and `to`, inclusive.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_upcoming_compliance_items(&self, connection: &mut PgConnection, from: NaiveDate, to: NaiveDate, limit: i64) -> Result<Vec<ComplianceItemDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_UPCOMING_COMPLIANCE_ITEMS)
            .bind(from)
            .bind(to)
            .bind(limit)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get upcoming compliance items", &err))
    }

    #[instrument(skip(self, transaction, compliance_item_input), fields(result))]
    pub async fn add_compliance_item(&self, transaction: &mut PgConnection, compliance_item_input: ComplianceItemValidInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_COMPLIANCE_ITEM)
            .bind(compliance_item_input.category)
            .bind(compliance_item_input.employee_id)
            .bind(compliance_item_input.project_id)
            .bind(compliance_item_input.description)
            .bind(compliance_item_input.visit_date)
            .bind(compliance_item_input.periodicity)
            .bind(compliance_item_input.due_date)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction, compliance_item_input), fields(result))]
    pub async fn update_compliance_item(&self, transaction: &mut PgConnection, compliance_item_id: i64, compliance_item_input: ComplianceItemValidInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_COMPLIANCE_ITEM)
            .bind(compliance_item_input.category)
            .bind(compliance_item_input.employee_id)
            .bind(compliance_item_input.project_id)
            .bind(compliance_item_input.description)
            .bind(compliance_item_input.visit_date)
            .bind(compliance_item_input.periodicity)
            .bind(compliance_item_input.due_date)
            .bind(compliance_item_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Compliance item", compliance_item_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_compliance_item(&self, transaction: &mut PgConnection, compliance_item_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_COMPLIANCE_ITEM)
            .bind(compliance_item_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Compliance item", compliance_item_id, "deleted")
    }

    /**
     * Deletes every compliance item of an employee.
     *
     * # Returns
     * Ids of the deleted items.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_compliance_items_by_employee(&self, transaction: &mut PgConnection, employee_id: i64) -> Result<Vec<i64>, ApplicationError> {
        let span = tracing::Span::current();
        let ids: Vec<(i64,)> = sqlx::query_as(DELETE_COMPLIANCE_ITEMS_BY_EMPLOYEE)
            .bind(employee_id)
            .fetch_all(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(ids.into_iter().map(|id| id.0).collect())
    }
}
