use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::{debug, instrument};

use crate::{
    dao::{tasks::TaskDao, vehicles::VehicleDao},
    model::{
        apperror::ApplicationError,
        enums::TaskStatus,
        fleet::VehicleDetailType,
        models::{ListOutputType, PaginationInput},
        operations::{DueData, TaskTypeDetailType, VehicleTaskDetailType, VehicleTaskInputType, initial_due, next_due_after_maintenance, task_reference_date},
    },
    service::common::{acquire, begin, check_reference, connection_pool, finish, today},
};

/**
 * Auto task types among `task_types` that are enabled by `type_ids`.
 */
pub fn enabled_auto_types<'a>(task_types: &'a [TaskTypeDetailType], type_ids: &[i64]) -> Vec<&'a TaskTypeDetailType> {
    task_types.iter().filter(|task_type| task_type.auto && type_ids.contains(&task_type.id)).collect()
}

/**
 * Service for vehicle deadlines. Every vehicle keeps one open task per auto task type,
 * and a maintenance of that type closes it and schedules the next one.
 */
pub struct TaskService {
    task_dao: TaskDao,
    vehicle_dao: VehicleDao,
    connection_pool: Option<Pool<Postgres>>,
}

impl TaskService {
    pub fn new(connection_pool: Option<Pool<Postgres>>) -> Self {
        TaskService { task_dao: TaskDao::new(), vehicle_dao: VehicleDao::new(), connection_pool }
    }

    pub async fn get_task_type_list(&self) -> Result<Vec<TaskTypeDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.task_dao.get_task_type_list(&mut connection).await
    }

    pub async fn get_task(&self, task_id: i64) -> Result<VehicleTaskDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.task_dao.get_task(&mut connection, task_id).await
    }

    /**
     * Lists the tasks of a vehicle. A vehicle without open tasks first gets its auto tasks back.
     */
    #[instrument(skip(self, pagination_input))]
    pub async fn get_task_list(&self, pagination_input: PaginationInput, vehicle_id: i64, status: Option<TaskStatus>) -> Result<ListOutputType<VehicleTaskDetailType>, ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.get_task_list_in(&mut transaction, pagination_input, vehicle_id, status).await;
        finish(transaction, result).await
    }

    async fn get_task_list_in(&self, transaction: &mut PgConnection, pagination_input: PaginationInput, vehicle_id: i64, status: Option<TaskStatus>) -> Result<ListOutputType<VehicleTaskDetailType>, ApplicationError> {
        let vehicle = self.vehicle_dao.get_vehicle(transaction, vehicle_id).await?;
        if self.task_dao.count_open_tasks(transaction, vehicle_id).await? == 0 {
            self.create_initial_tasks_in(transaction, &vehicle, today()).await?;
        }
        self.task_dao.get_task_list(transaction, pagination_input, vehicle_id, status).await
    }

    /**
     * Adds the open task of every auto type the vehicle is missing.
     *
     * # Arguments
     * `transaction`: The database transaction.
     * `vehicle`: The vehicle.
     * `today`: Reference date when the vehicle has neither contract start nor registration.
     *
     * # Returns
     * Number of tasks added.
     */
    #[instrument(skip(self, transaction, vehicle), fields(vehicle_id = vehicle.id))]
    pub async fn create_initial_tasks_in(&self, transaction: &mut PgConnection, vehicle: &VehicleDetailType, today: NaiveDate) -> Result<usize, ApplicationError> {
        let task_types = self.task_dao.get_task_type_list(transaction).await?;
        let auto_types: Vec<i64> = task_types.iter().filter(|task_type| task_type.auto).map(|task_type| task_type.id).collect();
        self.add_missing_tasks_in(transaction, vehicle, enabled_auto_types(&task_types, &auto_types), today).await
    }

    async fn add_missing_tasks_in(&self, transaction: &mut PgConnection, vehicle: &VehicleDetailType, task_types: Vec<&TaskTypeDetailType>, today: NaiveDate) -> Result<usize, ApplicationError> {
        let reference_date = task_reference_date(vehicle.contract_start_date, vehicle.registration_date, today);
        let mut added = 0;
        for task_type in task_types {
            if self.task_dao.find_open_task(transaction, vehicle.id, task_type.id).await?.is_none() {
                self.task_dao.add_task(transaction, vehicle.id, task_type.id, initial_due(task_type, reference_date, vehicle.current_mileage)).await?;
                added += 1;
            }
        }
        debug!("Added {added} tasks to vehicle {}", vehicle.id);
        Ok(added)
    }

    #[instrument(skip(self, task_input), fields(vehicle_id = task_input.vehicle_id))]
    pub async fn add_task(&self, task_input: VehicleTaskInputType) -> Result<VehicleTaskDetailType, ApplicationError> {
        let task_input = task_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.add_task_in(&mut transaction, task_input).await;
        finish(transaction, result).await
    }

    async fn add_task_in(&self, transaction: &mut PgConnection, task_input: VehicleTaskInputType) -> Result<VehicleTaskDetailType, ApplicationError> {
        check_reference(self.vehicle_dao.vehicle_exists(transaction, task_input.vehicle_id).await?, "Vehicle", task_input.vehicle_id)?;
        self.task_dao.get_task_type(transaction, task_input.task_type_id).await?;
        let due = DueData { due_date: task_input.due_date, due_mileage: task_input.due_mileage };
        let task_id = self.task_dao.add_task(transaction, task_input.vehicle_id, task_input.task_type_id, due).await?;
        self.task_dao.get_task(transaction, task_id).await
    }

    /**
     * Changes the type and deadline of a task. The vehicle stays the same.
     */
    #[instrument(skip(self, task_input))]
    pub async fn update_task(&self, task_id: i64, task_input: VehicleTaskInputType) -> Result<VehicleTaskDetailType, ApplicationError> {
        let task_input = task_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.update_task_in(&mut transaction, task_id, task_input).await;
        finish(transaction, result).await
    }

    async fn update_task_in(&self, transaction: &mut PgConnection, task_id: i64, task_input: VehicleTaskInputType) -> Result<VehicleTaskDetailType, ApplicationError> {
        self.task_dao.get_task_type(transaction, task_input.task_type_id).await?;
        self.task_dao.update_task(transaction, task_id, task_input).await?;
        self.task_dao.get_task(transaction, task_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_task(&self, task_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.task_dao.delete_task(&mut transaction, task_id).await;
        finish(transaction, result).await
    }

    /**
     * Chooses the auto task types a vehicle follows. Enabled types get their open task,
     * open tasks of the other auto types are deleted. Ids of types that are not auto are ignored.
     */
    #[instrument(skip(self))]
    pub async fn update_auto_tasks(&self, vehicle_id: i64, type_ids: Vec<i64>) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.update_auto_tasks_in(&mut transaction, vehicle_id, &type_ids).await;
        finish(transaction, result).await
    }

    async fn update_auto_tasks_in(&self, transaction: &mut PgConnection, vehicle_id: i64, type_ids: &[i64]) -> Result<(), ApplicationError> {
        let vehicle = self.vehicle_dao.get_vehicle(transaction, vehicle_id).await?;
        let task_types = self.task_dao.get_task_type_list(transaction).await?;
        let enabled = enabled_auto_types(&task_types, type_ids);
        let kept_type_ids: Vec<i64> = enabled.iter().map(|task_type| task_type.id).collect();
        self.add_missing_tasks_in(transaction, &vehicle, enabled, today()).await?;
        let removed = self.task_dao.delete_open_auto_tasks_except(transaction, vehicle_id, &kept_type_ids).await?;
        debug!("Removed {removed} auto tasks from vehicle {vehicle_id}");
        Ok(())
    }

    /**
     * Closes the open auto task matching a maintenance and opens the next one.
     *
     * # Arguments
     * `transaction`: The database transaction.
     * `vehicle_id`: The serviced vehicle.
     * `task_type_id`: Type of the maintenance, nothing happens without one.
     * `maintenance_date`, `maintenance_mileage`: When the maintenance took place.
     * `today`: Stands in for a missing maintenance date.
     *
     * # Returns
     * Id of the new task, if one was opened.
     */
    #[instrument(skip(self, transaction))]
    pub async fn close_after_maintenance_in(&self, transaction: &mut PgConnection, vehicle_id: i64, task_type_id: Option<i64>, maintenance_date: Option<NaiveDate>, maintenance_mileage: Option<i32>, today: NaiveDate) -> Result<Option<i64>, ApplicationError> {
        let Some(task_type_id) = task_type_id else {
            return Ok(None);
        };
        let task_type = self.task_dao.get_task_type(transaction, task_type_id).await?;
        if !task_type.auto {
            return Ok(None);
        }
        let Some(task) = self.task_dao.find_open_task(transaction, vehicle_id, task_type_id).await? else {
            return Ok(None);
        };
        self.task_dao.close_task(transaction, task.id).await?;
        let due = next_due_after_maintenance(&task_type, maintenance_date, maintenance_mileage, today);
        let task_id = self.task_dao.add_task(transaction, vehicle_id, task_type_id, due).await?;
        debug!("Closed task {} of vehicle {vehicle_id}, next task {task_id}", task.id);
        Ok(Some(task_id))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::apperror::ErrorType;

    fn task_type(id: i64, auto: bool) -> TaskTypeDetailType {
        TaskTypeDetailType { id, code: format!("TYPE_{id}"), description: String::new(), by_date: true, by_mileage: false, months_interval: Some(12), km_interval: None, auto }
    }

    #[test]
    fn test_enabled_auto_types() {
        let task_types = vec![task_type(1, true), task_type(2, false), task_type(3, true)];
        let enabled: Vec<i64> = enabled_auto_types(&task_types, &[2, 3, 9]).iter().map(|task_type| task_type.id).collect();
        assert_eq!(enabled, vec![3]);
        assert!(enabled_auto_types(&task_types, &[]).is_empty());
    }

    #[actix_web::test]
    async fn test_without_database() {
        let service = TaskService::new(None);
        assert_eq!(service.get_task_type_list().await.unwrap_err().error_type, ErrorType::DatabaseError);
        let task_input = VehicleTaskInputType { vehicle_id: 1, task_type_id: 1, due_date: None, due_mileage: Some(-1) };
        assert_eq!(service.add_task(task_input).await.unwrap_err().error_type, ErrorType::Validation);
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::dao::{
        common::integration_test::init_db,
        vehicles::integration_test::vehicle_input,
    };
    use crate::model::{apperror::ErrorType, operations::ORDINARY_SERVICE};

    fn page() -> PaginationInput {
        PaginationInput { start_index: 0, page_size: 50 }
    }

    #[sqlx::test]
    async fn test_tasks_follow_maintenance() {
        let pool = init_db().await;
        let service = TaskService::new(Some(pool.clone()));
        let mut transaction = pool.begin().await.unwrap();
        let vehicle_dao = VehicleDao::new();
        let vehicle_id = vehicle_dao.add_vehicle(&mut transaction, vehicle_input("ZZ984ZZ")).await.unwrap();
        let vehicle = vehicle_dao.get_vehicle(&mut transaction, vehicle_id).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(service.create_initial_tasks_in(&mut transaction, &vehicle, today).await.unwrap(), 4);
        assert_eq!(service.create_initial_tasks_in(&mut transaction, &vehicle, today).await.unwrap(), 0);
        let task_types = service.task_dao.get_task_type_list(&mut transaction).await.unwrap();
        let ordinary = task_types.iter().find(|task_type| task_type.code == ORDINARY_SERVICE).unwrap();
        let open = service.task_dao.find_open_task(&mut transaction, vehicle_id, ordinary.id).await.unwrap().unwrap();
        assert_eq!(open.due_mileage, Some(21000));
        let serviced = NaiveDate::from_ymd_opt(2024, 5, 20);
        let next_id = service.close_after_maintenance_in(&mut transaction, vehicle_id, Some(ordinary.id), serviced, Some(5000), today).await.unwrap().unwrap();
        let next = service.task_dao.get_task(&mut transaction, next_id).await.unwrap();
        assert_eq!(next.due_mileage, Some(25000));
        assert_eq!(next.due_date, NaiveDate::from_ymd_opt(2025, 5, 20));
        assert_eq!(service.task_dao.get_task(&mut transaction, open.id).await.unwrap().status, TaskStatus::Closed);
        assert_eq!(service.close_after_maintenance_in(&mut transaction, vehicle_id, None, serviced, None, today).await.unwrap(), None);
        service.update_auto_tasks_in(&mut transaction, vehicle_id, &[ordinary.id]).await.unwrap();
        assert_eq!(service.task_dao.count_open_tasks(&mut transaction, vehicle_id).await.unwrap(), 1);
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_task_for_missing_vehicle() {
        let pool = init_db().await;
        let service = TaskService::new(Some(pool));
        let task_input = VehicleTaskInputType { vehicle_id: -1, task_type_id: 1, due_date: None, due_mileage: None };
        assert_eq!(service.add_task(task_input).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(service.get_task_list(page(), -1, None).await.unwrap_err().error_type, ErrorType::NotFound);
    }
}
