use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        fleet::{MaintenanceDetailType, MaintenanceInputType},
        models::{ListOutputType, PaginationInput},
    },
};

const QUERY_MAINTENANCE: &str = "SELECT m.id, m.vehicle_id, m.supplier_id, m.maintenance_date, m.mileage, m.cost, m.description, m.task_type_id, v.plate AS vehicle_plate, s.name AS supplier_name,
                                        t.code AS task_type_code
                                 FROM maintenance m
                                 JOIN vehicles v ON v.id = m.vehicle_id
                                 LEFT JOIN suppliers s ON s.id = m.supplier_id
                                 LEFT JOIN task_types t ON t.id = m.task_type_id
                                 WHERE m.id = $1";

/**
 * SQL query to list the maintenance of a vehicle, most recent first.
 */
const QUERY_MAINTENANCE_LIST: &str = "SELECT m.id, m.vehicle_id, m.supplier_id, m.maintenance_date, m.mileage, m.cost, m.description, m.task_type_id, v.plate AS vehicle_plate, s.name AS supplier_name,
                                             t.code AS task_type_code
                                      FROM maintenance m
                                      JOIN vehicles v ON v.id = m.vehicle_id
                                      LEFT JOIN suppliers s ON s.id = m.supplier_id
                                      LEFT JOIN task_types t ON t.id = m.task_type_id
                                      WHERE m.vehicle_id = $1
                                      ORDER BY m.maintenance_date DESC NULLS LAST, m.id DESC
                                      LIMIT $2 OFFSET $3";

const ADD_MAINTENANCE: &str = "INSERT INTO maintenance (vehicle_id, supplier_id, maintenance_date, mileage, cost, description, task_type_id) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id";

const UPDATE_MAINTENANCE: &str = "UPDATE maintenance SET vehicle_id = $1, supplier_id = $2, maintenance_date = $3, mileage = $4, cost = $5, description = $6, task_type_id = $7 WHERE id = $8";

const DELETE_MAINTENANCE: &str = "DELETE FROM maintenance WHERE id = $1";

/**
 * DAO for maintenance-related database operations.
 */
pub struct MaintenanceDao {}

impl MaintenanceDao {
    pub fn new() -> Self {
        MaintenanceDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_maintenance(&self, connection: &mut PgConnection, maintenance_id: i64) -> Result<MaintenanceDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let maintenance: Option<MaintenanceDetailType> = sqlx::query_as(QUERY_MAINTENANCE)
            .bind(maintenance_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get maintenance", &err))?;
        found(maintenance, "Maintenance", maintenance_id)
    }

    /**
     * Retrieves a page of the maintenance of a vehicle.
     *
     * # Arguments
     * `connection`: The database connection.
     * `pagination_input`: Pagination information.
     * `vehicle_id`: The vehicle.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_maintenance_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, vehicle_id: i64) -> Result<ListOutputType<MaintenanceDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<MaintenanceDetailType> = sqlx::query_as(QUERY_MAINTENANCE_LIST)
            .bind(vehicle_id)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get maintenance list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_maintenance(&self, transaction: &mut PgConnection, maintenance_input: MaintenanceInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_MAINTENANCE)
            .bind(maintenance_input.vehicle_id)
            .bind(maintenance_input.supplier_id)
            .bind(maintenance_input.maintenance_date)
            .bind(maintenance_input.mileage)
            .bind(maintenance_input.cost)
            .bind(maintenance_input.description)
            .bind(maintenance_input.task_type_id)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_maintenance(&self, transaction: &mut PgConnection, maintenance_id: i64, maintenance_input: MaintenanceInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_MAINTENANCE)
            .bind(maintenance_input.vehicle_id)
            .bind(maintenance_input.supplier_id)
            .bind(maintenance_input.maintenance_date)
            .bind(maintenance_input.mileage)
            .bind(maintenance_input.cost)
            .bind(maintenance_input.description)
            .bind(maintenance_input.task_type_id)
            .bind(maintenance_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Maintenance", maintenance_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_maintenance(&self, transaction: &mut PgConnection, maintenance_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_MAINTENANCE)
            .bind(maintenance_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Maintenance", maintenance_id, "deleted")
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
    use crate::model::apperror::ErrorType;
    use rust_decimal::Decimal;

    #[sqlx::test]
    async fn test_add_list_then_delete_maintenance() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let vehicle_id = VehicleDao::new().add_vehicle(&mut transaction, vehicle_input("ZZ995ZZ")).await.unwrap();
        let maintenance_dao = MaintenanceDao::new();
        let maintenance_input = MaintenanceInputType { vehicle_id, supplier_id: None, maintenance_date: None, mileage: Some(5000), cost: Some(Decimal::new(12000, 2)), description: Some("Tagliando".to_string()), task_type_id: None };
        let maintenance_id = maintenance_dao.add_maintenance(&mut transaction, maintenance_input).await.unwrap();
        let list = maintenance_dao.get_maintenance_list(&mut transaction, PaginationInput { start_index: 0, page_size: 10 }, vehicle_id).await.unwrap();
        assert_eq!(list.elements.len(), 1);
        assert_eq!(list.elements[0].vehicle_plate, "ZZ995ZZ");
        assert!(maintenance_dao.delete_maintenance(&mut transaction, maintenance_id).await.is_ok());
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_add_maintenance_missing_vehicle() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let maintenance_input = MaintenanceInputType { vehicle_id: -1, supplier_id: None, maintenance_date: None, mileage: None, cost: None, description: None, task_type_id: None };
        let error = MaintenanceDao::new().add_maintenance(&mut transaction, maintenance_input).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::ConstraintViolation);
        transaction.rollback().await.unwrap();
    }
}
