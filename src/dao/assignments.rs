use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        enums::AssignmentStatus,
        fleet::{AssignmentDetailType, AssignmentInputType, AssignmentListInputType},
        models::{ListOutputType, PaginationInput},
    },
};

const QUERY_ASSIGNMENT: &str = "SELECT a.id, a.employment_id, a.vehicle_id, a.start_date, a.end_date, a.status, a.project_id, a.note, v.plate AS vehicle_plate, m.matricola,
                                       e.first_name || ' ' || e.last_name AS employee_name
                                FROM assignments a
                                JOIN vehicles v ON v.id = a.vehicle_id
                                JOIN employments m ON m.id = a.employment_id
                                JOIN employees e ON e.id = m.employee_id
                                WHERE a.id = $1";

const QUERY_ASSIGNMENT_LIST: &str = "SELECT a.id, a.employment_id, a.vehicle_id, a.start_date, a.end_date, a.status, a.project_id, a.note, v.plate AS vehicle_plate, m.matricola,
                                            e.first_name || ' ' || e.last_name AS employee_name
                                     FROM assignments a
                                     JOIN vehicles v ON v.id = a.vehicle_id
                                     JOIN employments m ON m.id = a.employment_id
                                     JOIN employees e ON e.id = m.employee_id
                                     WHERE ($1::assignment_status IS NULL OR a.status = $1) AND
                                           ($2::bigint IS NULL OR a.vehicle_id = $2) AND
                                           ($3::bigint IS NULL OR a.employment_id = $3)
                                     ORDER BY a.start_date DESC, a.id DESC
                                     LIMIT $4 OFFSET $5";

const ADD_ASSIGNMENT: &str = "INSERT INTO assignments (employment_id, vehicle_id, start_date, end_date, status, project_id, note) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id";

const UPDATE_ASSIGNMENT: &str = "UPDATE assignments SET employment_id = $1, vehicle_id = $2, start_date = $3, end_date = $4, status = $5, project_id = $6, note = $7 WHERE id = $8";

const DELETE_ASSIGNMENT: &str = "DELETE FROM assignments WHERE id = $1";

const EXISTS_ACTIVE_FOR_VEHICLE: &str = "SELECT EXISTS (SELECT 1 FROM assignments WHERE vehicle_id = $1 AND status = 'ASSIGNED' AND ($2::bigint IS NULL OR id <> $2))";

const EXISTS_ACTIVE_FOR_EMPLOYMENT: &str = "SELECT EXISTS (SELECT 1 FROM assignments WHERE employment_id = $1 AND status = 'ASSIGNED' AND ($2::bigint IS NULL OR id <> $2))";

const QUERY_ACTIVE_PERIODS_FOR_VEHICLE: &str = "SELECT start_date, end_date FROM assignments WHERE vehicle_id = $1 AND status = 'ASSIGNED' ORDER BY start_date";

const DELETE_ASSIGNMENTS_BY_EMPLOYMENTS: &str = "DELETE FROM assignments WHERE employment_id = ANY($1) RETURNING id, vehicle_id, status";

/**
 * SQL query returning expired active assignments and the vehicles they held.
 */
const RELEASE_EXPIRED_ASSIGNMENTS: &str = "UPDATE assignments SET status = 'RETURNED' WHERE status = 'ASSIGNED' AND end_date IS NOT NULL AND end_date < $1 RETURNING id, vehicle_id";

/**
 * DAO for assignment-related database operations.
 */
pub struct AssignmentDao {}

impl AssignmentDao {
    pub fn new() -> Self {
        AssignmentDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_assignment(&self, connection: &mut PgConnection, assignment_id: i64) -> Result<AssignmentDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let assignment: Option<AssignmentDetailType> = sqlx::query_as(QUERY_ASSIGNMENT)
            .bind(assignment_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get assignment", &err))?;
        found(assignment, "Assignment", assignment_id)
    }

    /**
     * Retrieves a page of assignments, newest first. Filtering on a vehicle gives its history.
     *
     * # Arguments
     * `connection`: The database connection.
     * `pagination_input`: Pagination information.
     * `filter`: Status, vehicle and employment filter.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_assignment_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, filter: AssignmentListInputType) -> Result<ListOutputType<AssignmentDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<AssignmentDetailType> = sqlx::query_as(QUERY_ASSIGNMENT_LIST)
            .bind(filter.status)
            .bind(filter.vehicle_id)
            .bind(filter.employment_id)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get assignment list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_assignment(&self, transaction: &mut PgConnection, assignment_input: AssignmentInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_ASSIGNMENT)
            .bind(assignment_input.employment_id)
            .bind(assignment_input.vehicle_id)
            .bind(assignment_input.start_date)
            .bind(assignment_input.end_date)
            .bind(assignment_input.status)
            .bind(assignment_input.project_id)
            .bind(assignment_input.note)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_assignment(&self, transaction: &mut PgConnection, assignment_id: i64, assignment_input: AssignmentInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_ASSIGNMENT)
            .bind(assignment_input.employment_id)
            .bind(assignment_input.vehicle_id)
            .bind(assignment_input.start_date)
            .bind(assignment_input.end_date)
            .bind(assignment_input.status)
            .bind(assignment_input.project_id)
            .bind(assignment_input.note)
            .bind(assignment_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Assignment", assignment_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_assignment(&self, transaction: &mut PgConnection, assignment_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_ASSIGNMENT)
            .bind(assignment_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Assignment", assignment_id, "deleted")
    }

    /**
     * Checks whether the vehicle has an active assignment other than `excluded_id`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn vehicle_has_active_assignment(&self, connection: &mut PgConnection, vehicle_id: i64, excluded_id: Option<i64>) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_ACTIVE_FOR_VEHICLE)
            .bind(vehicle_id)
            .bind(excluded_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check vehicle assignment", &err))?;
        Ok(exists.0)
    }

    /**
     * Start and end dates of the active assignments of a vehicle.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_active_periods_for_vehicle(&self, connection: &mut PgConnection, vehicle_id: i64) -> Result<Vec<(NaiveDate, Option<NaiveDate>)>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_ACTIVE_PERIODS_FOR_VEHICLE)
            .bind(vehicle_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get active assignment periods", &err))
    }

    /**
     * Checks whether the employment has an active assignment other than `excluded_id`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn employment_has_active_assignment(&self, connection: &mut PgConnection, employment_id: i64, excluded_id: Option<i64>) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_ACTIVE_FOR_EMPLOYMENT)
            .bind(employment_id)
            .bind(excluded_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check employment assignment", &err))?;
        Ok(exists.0)
    }

    /**
     * Deletes every assignment of the given employments.
     *
     * # Returns
     * Id, vehicle id and status of every deleted assignment.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_assignments_by_employments(&self, transaction: &mut PgConnection, employment_ids: &[i64]) -> Result<Vec<(i64, i64, AssignmentStatus)>, ApplicationError> {
        if employment_ids.is_empty() {
            return Ok(Vec::new());
        }
        let span = tracing::Span::current();
        sqlx::query_as(DELETE_ASSIGNMENTS_BY_EMPLOYMENTS)
            .bind(employment_ids)
            .fetch_all(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))
    }

    /**
     * Marks active assignments that ended before `today` as returned.
     *
     * # Returns
     * Id and vehicle id of every released assignment.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn release_expired_assignments(&self, transaction: &mut PgConnection, today: NaiveDate) -> Result<Vec<(i64, i64)>, ApplicationError> {
        let span = tracing::Span::current();
        let released: Vec<(i64, i64)> = sqlx::query_as(RELEASE_EXPIRED_ASSIGNMENTS)
            .bind(today)
            .fetch_all(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(released)
    }
}
