use std::sync::Arc;

use sqlx::{PgConnection, Pool, Postgres};
use tracing::{debug, instrument};

use crate::{
    dao::{documents::DocumentDao, maintenance::MaintenanceDao, suppliers::SupplierDao, tasks::TaskDao, vehicles::VehicleDao},
    model::{
        apperror::ApplicationError,
        documents::StorageLocation,
        enums::{DocumentOwnerType, MileageSource},
        fleet::{MaintenanceDetailType, MaintenanceInputType, VehicleDetailType, VehicleInputType, VehicleListInputType},
        models::{ListOutputType, PaginationInput},
    },
    service::{
        common::{acquire, begin, check_reference, connection_pool, finish, today},
        mileage::MileageService,
        storage::FileStorage,
        tasks::TaskService,
    },
};

/**
 * Service for vehicles and their maintenance records. Mileage changes go through the mileage log,
 * maintenance of an auto task type reschedules the matching task.
 */
pub struct VehicleService {
    vehicle_dao: VehicleDao,
    maintenance_dao: MaintenanceDao,
    supplier_dao: SupplierDao,
    document_dao: DocumentDao,
    task_dao: TaskDao,
    mileage_service: MileageService,
    task_service: TaskService,
    file_storage: Arc<FileStorage>,
    /**
     * Optional connection pool for database operations. Optional for test purposes.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl VehicleService {
    pub fn new(file_storage: Arc<FileStorage>, connection_pool: Option<Pool<Postgres>>) -> Self {
        VehicleService {
            vehicle_dao: VehicleDao::new(),
            maintenance_dao: MaintenanceDao::new(),
            supplier_dao: SupplierDao::new(),
            document_dao: DocumentDao::new(),
            task_dao: TaskDao::new(),
            mileage_service: MileageService::new(connection_pool.clone()),
            task_service: TaskService::new(connection_pool.clone()),
            file_storage,
            connection_pool,
        }
    }

    pub async fn get_vehicle(&self, vehicle_id: i64) -> Result<VehicleDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.vehicle_dao.get_vehicle(&mut connection, vehicle_id).await
    }

    pub async fn get_vehicle_list(&self, pagination_input: PaginationInput, filter: VehicleListInputType) -> Result<ListOutputType<VehicleDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.vehicle_dao.get_vehicle_list(&mut connection, pagination_input, filter).await
    }

    /**
     * Adds a vehicle. New vehicles are in service, with their first mileage reading and auto tasks.
     *
     * # Arguments
     * `vehicle_input`: The vehicle to add.
     *
     * # Returns
     * The stored vehicle.
     */
    #[instrument(skip(self, vehicle_input), fields(plate = %vehicle_input.plate))]
    pub async fn add_vehicle(&self, vehicle_input: VehicleInputType) -> Result<VehicleDetailType, ApplicationError> {
        let vehicle_input = vehicle_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.add_vehicle_in(&mut transaction, vehicle_input).await;
        finish(transaction, result).await
    }

    async fn add_vehicle_in(&self, transaction: &mut PgConnection, vehicle_input: VehicleInputType) -> Result<VehicleDetailType, ApplicationError> {
        self.check_supplier(transaction, vehicle_input.supplier_id).await?;
        let current_mileage = vehicle_input.current_mileage;
        let vehicle_id = self.vehicle_dao.add_vehicle(transaction, vehicle_input).await?;
        let today = today();
        if current_mileage.is_some() {
            self.mileage_service.record_in(transaction, vehicle_id, current_mileage, today, MileageSource::Vehicle, vehicle_id).await?;
        }
        let vehicle = self.vehicle_dao.get_vehicle(transaction, vehicle_id).await?;
        self.task_service.create_initial_tasks_in(transaction, &vehicle, today).await?;
        Ok(vehicle)
    }

    #[instrument(skip(self, vehicle_input))]
    pub async fn update_vehicle(&self, vehicle_id: i64, vehicle_input: VehicleInputType) -> Result<VehicleDetailType, ApplicationError> {
        let vehicle_input = vehicle_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.update_vehicle_in(&mut transaction, vehicle_id, vehicle_input).await;
        finish(transaction, result).await
    }

    async fn update_vehicle_in(&self, transaction: &mut PgConnection, vehicle_id: i64, vehicle_input: VehicleInputType) -> Result<VehicleDetailType, ApplicationError> {
        self.check_supplier(transaction, vehicle_input.supplier_id).await?;
        let current_mileage = vehicle_input.current_mileage;
        self.vehicle_dao.update_vehicle(transaction, vehicle_id, vehicle_input).await?;
        if current_mileage.is_some() {
            self.mileage_service.record_in(transaction, vehicle_id, current_mileage, today(), MileageSource::Vehicle, vehicle_id).await?;
        }
        self.vehicle_dao.get_vehicle(transaction, vehicle_id).await
    }

    /**
     * Sets the current mileage of a vehicle. The mileage must not decrease.
     */
    #[instrument(skip(self))]
    pub async fn update_mileage(&self, vehicle_id: i64, mileage: i32) -> Result<VehicleDetailType, ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.update_mileage_in(&mut transaction, vehicle_id, mileage).await;
        finish(transaction, result).await
    }

    async fn update_mileage_in(&self, transaction: &mut PgConnection, vehicle_id: i64, mileage: i32) -> Result<VehicleDetailType, ApplicationError> {
        let vehicle = self.vehicle_dao.get_vehicle(transaction, vehicle_id).await?;
        check_mileage(vehicle.current_mileage, mileage)?;
        self.mileage_service.record_in(transaction, vehicle_id, Some(mileage), today(), MileageSource::Vehicle, vehicle_id).await?;
        self.vehicle_dao.get_vehicle(transaction, vehicle_id).await
    }

    /**
     * Deletes a vehicle together with its document rows, files and directory.
     */
    #[instrument(skip(self))]
    pub async fn delete_vehicle(&self, vehicle_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_vehicle_in(&mut transaction, vehicle_id).await;
        let storage_paths = finish(transaction, result).await?;
        self.file_storage.delete_files(&storage_paths).await;
        self.file_storage.delete_directory(&StorageLocation::Vehicle(vehicle_id).directory()).await;
        debug!("Deleted vehicle {vehicle_id} with {} documents", storage_paths.len());
        Ok(())
    }

    async fn delete_vehicle_in(&self, transaction: &mut PgConnection, vehicle_id: i64) -> Result<Vec<String>, ApplicationError> {
        let mut storage_paths = self.document_dao.delete_documents_for_owner(transaction, DocumentOwnerType::Vehicle, vehicle_id).await?;
        storage_paths.extend(self.document_dao.delete_vehicle_child_documents(transaction, vehicle_id).await?);
        self.vehicle_dao.delete_vehicle(transaction, vehicle_id).await?;
        Ok(storage_paths)
    }

    pub async fn get_maintenance(&self, maintenance_id: i64) -> Result<MaintenanceDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.maintenance_dao.get_maintenance(&mut connection, maintenance_id).await
    }

    pub async fn get_maintenance_list(&self, pagination_input: PaginationInput, vehicle_id: i64) -> Result<ListOutputType<MaintenanceDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.maintenance_dao.get_maintenance_list(&mut connection, pagination_input, vehicle_id).await
    }

    /**
     * Records a maintenance. Its mileage becomes a reading of the mileage log, and a maintenance of
     * an auto task type closes the open task of that type.
     */
    #[instrument(skip(self, maintenance_input), fields(vehicle_id = maintenance_input.vehicle_id))]
    pub async fn add_maintenance(&self, maintenance_input: MaintenanceInputType) -> Result<MaintenanceDetailType, ApplicationError> {
        let maintenance_input = maintenance_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_maintenance_in(&mut transaction, None, maintenance_input).await;
        finish(transaction, result).await
    }

    #[instrument(skip(self, maintenance_input))]
    pub async fn update_maintenance(&self, maintenance_id: i64, maintenance_input: MaintenanceInputType) -> Result<MaintenanceDetailType, ApplicationError> {
        let maintenance_input = maintenance_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_maintenance_in(&mut transaction, Some(maintenance_id), maintenance_input).await;
        finish(transaction, result).await
    }

    async fn save_maintenance_in(&self, transaction: &mut PgConnection, maintenance_id: Option<i64>, maintenance_input: MaintenanceInputType) -> Result<MaintenanceDetailType, ApplicationError> {
        let vehicle_id = maintenance_input.vehicle_id;
        check_reference(self.vehicle_dao.vehicle_exists(transaction, vehicle_id).await?, "Vehicle", vehicle_id)?;
        self.check_supplier(transaction, maintenance_input.supplier_id).await?;
        if let Some(task_type_id) = maintenance_input.task_type_id {
            self.task_dao.get_task_type(transaction, task_type_id).await?;
        }
        let today = today();
        let mileage = maintenance_input.mileage;
        let maintenance_date = maintenance_input.maintenance_date;
        let task_type_id = maintenance_input.task_type_id;
        let maintenance_id = match maintenance_id {
            Some(maintenance_id) => {
                self.maintenance_dao.update_maintenance(transaction, maintenance_id, maintenance_input).await?;
                self.mileage_service.remove_in(transaction, MileageSource::Maintenance, maintenance_id).await?;
                maintenance_id
            }
            None => self.maintenance_dao.add_maintenance(transaction, maintenance_input).await?,
        };
        self.mileage_service.record_in(transaction, vehicle_id, mileage, maintenance_date.unwrap_or(today), MileageSource::Maintenance, maintenance_id).await?;
        if let Some(task_id) = self.task_service.close_after_maintenance_in(transaction, vehicle_id, task_type_id, maintenance_date, mileage, today).await? {
            debug!("Maintenance {maintenance_id} scheduled task {task_id}");
        }
        self.maintenance_dao.get_maintenance(transaction, maintenance_id).await
    }

    /**
     * Deletes a maintenance record and its documents.
     */
    #[instrument(skip(self))]
    pub async fn delete_maintenance(&self, maintenance_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_maintenance_in(&mut transaction, maintenance_id).await;
        let storage_paths = finish(transaction, result).await?;
        self.file_storage.delete_files(&storage_paths).await;
        Ok(())
    }

    async fn delete_maintenance_in(&self, transaction: &mut PgConnection, maintenance_id: i64) -> Result<Vec<String>, ApplicationError> {
        let storage_paths = self.document_dao.delete_documents_for_owner(transaction, DocumentOwnerType::Maintenance, maintenance_id).await?;
        self.mileage_service.remove_in(transaction, MileageSource::Maintenance, maintenance_id).await?;
        self.maintenance_dao.delete_maintenance(transaction, maintenance_id).await?;
        Ok(storage_paths)
    }

    async fn check_supplier(&self, connection: &mut PgConnection, supplier_id: Option<i64>) -> Result<(), ApplicationError> {
        match supplier_id {
            Some(supplier_id) => check_reference(self.supplier_dao.supplier_exists(connection, supplier_id).await?, "Supplier", supplier_id),
            None => Ok(()),
        }
    }
}

/**
 * The mileage of a vehicle may only grow.
 */
pub fn check_mileage(current_mileage: Option<i32>, new_mileage: i32) -> Result<(), ApplicationError> {
    let mut errors = Vec::new();
    if new_mileage < 0 {
        errors.push("Mileage cannot be negative".to_string());
    }
    if current_mileage.is_some_and(|current| new_mileage < current) {
        errors.push(format!("Mileage cannot be lower than the current mileage {}", current_mileage.unwrap_or_default()));
    }
    if errors.is_empty() { Ok(()) } else { Err(ApplicationError::business_rule("Invalid mileage".to_string(), errors)) }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{apperror::ErrorType, config::StorageConfig};

    #[test]
    fn test_check_mileage() {
        assert!(check_mileage(None, 0).is_ok());
        assert!(check_mileage(Some(1000), 1000).is_ok());
        assert!(check_mileage(Some(1000), 1500).is_ok());
        let error = check_mileage(Some(1000), 999).unwrap_err();
        assert_eq!(error.error_type, ErrorType::BusinessRule);
        assert_eq!(error.errors.len(), 1);
        assert!(check_mileage(None, -1).is_err());
    }

    #[actix_web::test]
    async fn test_without_database() {
        let service = VehicleService::new(Arc::new(FileStorage::new(&StorageConfig::default())), None);
        let error = service.get_vehicle(1).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::DatabaseError);
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{
        dao::{common::integration_test::init_db, vehicles::integration_test::vehicle_input},
        model::{apperror::ErrorType, enums::TaskStatus, operations::ORDINARY_SERVICE},
        service::common::integration_test::test_storage,
    };

    #[sqlx::test]
    async fn test_maintenance_moves_mileage_and_tasks() {
        let pool = init_db().await;
        let directory = tempfile::tempdir().unwrap();
        let service = VehicleService::new(test_storage(directory.path()), Some(pool.clone()));
        let mut transaction = pool.begin().await.unwrap();
        let vehicle = service.add_vehicle_in(&mut transaction, vehicle_input("ZZ980ZZ")).await.unwrap();
        assert_eq!(vehicle.current_mileage, Some(1000));
        assert_eq!(service.task_dao.count_open_tasks(&mut transaction, vehicle.id).await.unwrap(), 4);
        let task_types = service.task_dao.get_task_type_list(&mut transaction).await.unwrap();
        let ordinary = task_types.iter().find(|task_type| task_type.code == ORDINARY_SERVICE).unwrap();
        let maintenance_input = MaintenanceInputType {
            vehicle_id: vehicle.id,
            supplier_id: None,
            maintenance_date: Some(today()),
            mileage: Some(5000),
            cost: None,
            description: Some("Tagliando".to_string()),
            task_type_id: Some(ordinary.id),
        };
        let maintenance = service.save_maintenance_in(&mut transaction, None, maintenance_input).await.unwrap();
        assert_eq!(maintenance.task_type_code.as_deref(), Some(ORDINARY_SERVICE));
        assert_eq!(service.vehicle_dao.get_vehicle(&mut transaction, vehicle.id).await.unwrap().current_mileage, Some(5000));
        let next = service.task_dao.find_open_task(&mut transaction, vehicle.id, ordinary.id).await.unwrap().unwrap();
        assert_eq!(next.due_mileage, Some(25000));
        assert_eq!(next.status, TaskStatus::Open);
        service.delete_maintenance_in(&mut transaction, maintenance.id).await.unwrap();
        assert_eq!(service.vehicle_dao.get_vehicle(&mut transaction, vehicle.id).await.unwrap().current_mileage, Some(1000));
        let error = service.update_mileage_in(&mut transaction, vehicle.id, 900).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::BusinessRule);
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_maintenance_with_missing_task_type() {
        let pool = init_db().await;
        let directory = tempfile::tempdir().unwrap();
        let service = VehicleService::new(test_storage(directory.path()), Some(pool.clone()));
        let mut transaction = pool.begin().await.unwrap();
        let vehicle = service.add_vehicle_in(&mut transaction, vehicle_input("ZZ979ZZ")).await.unwrap();
        let maintenance_input = MaintenanceInputType { vehicle_id: vehicle.id, supplier_id: None, maintenance_date: None, mileage: None, cost: None, description: None, task_type_id: Some(-1) };
        let error = service.save_maintenance_in(&mut transaction, None, maintenance_input).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
        transaction.rollback().await.unwrap();
    }
}
