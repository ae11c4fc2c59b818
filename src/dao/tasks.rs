use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        enums::TaskStatus,
        models::{ListOutputType, PaginationInput},
        operations::{DueData, TaskTypeDetailType, VehicleTaskDetailType, VehicleTaskInputType},
    },
};

const QUERY_TASK_TYPE_LIST: &str = "SELECT id, code, description, by_date, by_mileage, months_interval, km_interval, auto FROM task_types ORDER BY id";

const QUERY_TASK_TYPE: &str = "SELECT id, code, description, by_date, by_mileage, months_interval, km_interval, auto FROM task_types WHERE id = $1";

const QUERY_TASK: &str = "SELECT t.id, t.vehicle_id, t.task_type_id, t.due_date, t.due_mileage, t.status, t.executed, tt.code AS task_type_code, tt.description AS task_type_description, v.plate AS vehicle_plate
                          FROM vehicle_tasks t
                          JOIN task_types tt ON tt.id = t.task_type_id
                          JOIN vehicles v ON v.id = t.vehicle_id
                          WHERE t.id = $1";

/**
 * SQL query to list the tasks of a vehicle, soonest first.
 */
const QUERY_TASK_LIST: &str = "SELECT t.id, t.vehicle_id, t.task_type_id, t.due_date, t.due_mileage, t.status, t.executed, tt.code AS task_type_code, tt.description AS task_type_description, v.plate AS vehicle_plate
                               FROM vehicle_tasks t
                               JOIN task_types tt ON tt.id = t.task_type_id
                               JOIN vehicles v ON v.id = t.vehicle_id
                               WHERE t.vehicle_id = $1 AND ($2::task_status IS NULL OR t.status = $2)
                               ORDER BY t.due_date NULLS LAST, t.due_mileage NULLS LAST, t.id
                               LIMIT $3 OFFSET $4";

const QUERY_OPEN_TASK_OF_TYPE: &str = "SELECT t.id, t.vehicle_id, t.task_type_id, t.due_date, t.due_mileage, t.status, t.executed, tt.code AS task_type_code, tt.description AS task_type_description, v.plate AS vehicle_plate
                                       FROM vehicle_tasks t
                                       JOIN task_types tt ON tt.id = t.task_type_id
                                       JOIN vehicles v ON v.id = t.vehicle_id
                                       WHERE t.vehicle_id = $1 AND t.task_type_id = $2 AND t.status = 'OPEN'
                                       ORDER BY t.id
                                       LIMIT 1";

const COUNT_OPEN_TASKS: &str = "SELECT COUNT(*) FROM vehicle_tasks WHERE vehicle_id = $1 AND status = 'OPEN'";

const ADD_TASK: &str = "INSERT INTO vehicle_tasks (vehicle_id, task_type_id, due_date, due_mileage, status, executed) VALUES ($1, $2, $3, $4, 'OPEN', FALSE) RETURNING id";

const UPDATE_TASK: &str = "UPDATE vehicle_tasks SET task_type_id = $1, due_date = $2, due_mileage = $3 WHERE id = $4";

const CLOSE_TASK: &str = "UPDATE vehicle_tasks SET status = 'CLOSED', executed = TRUE WHERE id = $1";

const DELETE_TASK: &str = "DELETE FROM vehicle_tasks WHERE id = $1";

/**
 * SQL query removing the open auto tasks of a vehicle whose type is not in the kept list.
 */
const DELETE_OPEN_AUTO_TASKS_EXCEPT: &str = "DELETE FROM vehicle_tasks t
                                             USING task_types tt
                                             WHERE tt.id = t.task_type_id AND tt.auto AND t.vehicle_id = $1 AND t.status = 'OPEN' AND NOT (t.task_type_id = ANY($2))";

/**
 * DAO for task types and vehicle tasks.
 */
pub struct TaskDao {}

impl TaskDao {
    pub fn new() -> Self {
        TaskDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_task_type_list(&self, connection: &mut PgConnection) -> Result<Vec<TaskTypeDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_TASK_TYPE_LIST)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get task type list", &err))
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_task_type(&self, connection: &mut PgConnection, task_type_id: i64) -> Result<TaskTypeDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let task_type: Option<TaskTypeDetailType> = sqlx::query_as(QUERY_TASK_TYPE)
            .bind(task_type_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get task type", &err))?;
        found(task_type, "Task type", task_type_id)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_task(&self, connection: &mut PgConnection, task_id: i64) -> Result<VehicleTaskDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let task: Option<VehicleTaskDetailType> = sqlx::query_as(QUERY_TASK)
            .bind(task_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get task", &err))?;
        found(task, "Task", task_id)
    }

    /**
     * Retrieves a page of the tasks of a vehicle.
     *
     * # Arguments
     * `connection`: The database connection.
     * `pagination_input`: Pagination information.
     * `vehicle_id`: The vehicle.
     * `status`: Optional status filter.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_task_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, vehicle_id: i64, status: Option<TaskStatus>) -> Result<ListOutputType<VehicleTaskDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<VehicleTaskDetailType> = sqlx::query_as(QUERY_TASK_LIST)
            .bind(vehicle_id)
            .bind(status)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get task list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn find_open_task(&self, connection: &mut PgConnection, vehicle_id: i64, task_type_id: i64) -> Result<Option<VehicleTaskDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_OPEN_TASK_OF_TYPE)
            .bind(vehicle_id)
            .bind(task_type_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("find open task", &err))
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn count_open_tasks(&self, connection: &mut PgConnection, vehicle_id: i64) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let count: (i64,) = sqlx::query_as(COUNT_OPEN_TASKS)
            .bind(vehicle_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("count open tasks", &err))?;
        Ok(count.0)
    }

    /**
     * Adds an open task.
     *
     * # Returns
     * Id of the new task.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_task(&self, transaction: &mut PgConnection, vehicle_id: i64, task_type_id: i64, due: DueData) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_TASK)
            .bind(vehicle_id)
            .bind(task_type_id)
            .bind(due.due_date)
            .bind(due.due_mileage)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_task(&self, transaction: &mut PgConnection, task_id: i64, task_input: VehicleTaskInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_TASK)
            .bind(task_input.task_type_id)
            .bind(task_input.due_date)
            .bind(task_input.due_mileage)
            .bind(task_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Task", task_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn close_task(&self, transaction: &mut PgConnection, task_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(CLOSE_TASK)
            .bind(task_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Task", task_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_task(&self, transaction: &mut PgConnection, task_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_TASK)
            .bind(task_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Task", task_id, "deleted")
    }

    /**
     * Deletes the open auto tasks of a vehicle whose type is not listed.
     *
     * # Returns
     * Number of deleted tasks.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_open_auto_tasks_except(&self, transaction: &mut PgConnection, vehicle_id: i64, kept_type_ids: &[i64]) -> Result<u64, ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_OPEN_AUTO_TASKS_EXCEPT)
            .bind(vehicle_id)
            .bind(kept_type_ids)
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
    use crate::dao::{
        common::integration_test::init_db,
        vehicles::{VehicleDao, integration_test::vehicle_input},
    };
    use crate::model::{apperror::ErrorType, operations::ORDINARY_SERVICE};

    #[sqlx::test]
    async fn test_task_types_are_seeded() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let task_types = TaskDao::new().get_task_type_list(&mut connection).await.unwrap();
        let service = task_types.iter().find(|task_type| task_type.code == ORDINARY_SERVICE).unwrap();
        assert!(service.auto);
        assert_eq!(service.km_interval, Some(20000));
        assert_eq!(task_types.iter().filter(|task_type| task_type.auto).count(), 4);
    }

    #[sqlx::test]
    async fn test_add_close_then_prune_tasks() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let task_dao = TaskDao::new();
        let vehicle_id = VehicleDao::new().add_vehicle(&mut transaction, vehicle_input("ZZ989ZZ")).await.unwrap();
        let task_types = task_dao.get_task_type_list(&mut transaction).await.unwrap();
        for task_type in task_types.iter().filter(|task_type| task_type.auto) {
            task_dao.add_task(&mut transaction, vehicle_id, task_type.id, DueData::default()).await.unwrap();
        }
        assert_eq!(task_dao.count_open_tasks(&mut transaction, vehicle_id).await.unwrap(), 4);
        let first_type = task_types[0].id;
        let task = task_dao.find_open_task(&mut transaction, vehicle_id, first_type).await.unwrap().unwrap();
        task_dao.close_task(&mut transaction, task.id).await.unwrap();
        assert!(task_dao.find_open_task(&mut transaction, vehicle_id, first_type).await.unwrap().is_none());
        let removed = task_dao.delete_open_auto_tasks_except(&mut transaction, vehicle_id, &[task_types[1].id]).await.unwrap();
        assert_eq!(removed, 2);
        let list = task_dao.get_task_list(&mut transaction, PaginationInput { start_index: 0, page_size: 10 }, vehicle_id, None).await.unwrap();
        assert_eq!(list.elements.len(), 2);
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_missing_task_type() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let error = TaskDao::new().get_task_type(&mut connection, -1).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
    }
}
