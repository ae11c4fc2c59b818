use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, like_pattern, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        enums::VehicleStatus,
        fleet::{VehicleDetailType, VehicleInputType, VehicleListInputType},
        models::{ListOutputType, PaginationInput},
    },
};

/**
 * SQL query to retrieve a vehicle by id.
 */
const QUERY_VEHICLE: &str = "SELECT id, plate, chassis_number, brand, model, series, year, vehicle_type, fuel_type, ownership, supplier_id, registration_date, contract_start_date, contract_end_date,
                                    contract_duration, contractual_km, financial_fee, assistance_fee, total_fee, annual_fringe_benefit, monthly_fringe_benefit, status, current_mileage, telepass,
                                    insurance_expiry_date, car_tax_expiry_date, created_at, updated_at
                             FROM vehicles WHERE id = $1";

/**
 * SQL query to list vehicles by status and keyword on plate, brand or model.
 */
const QUERY_VEHICLE_LIST: &str = "SELECT id, plate, chassis_number, brand, model, series, year, vehicle_type, fuel_type, ownership, supplier_id, registration_date, contract_start_date, contract_end_date,
                                         contract_duration, contractual_km, financial_fee, assistance_fee, total_fee, annual_fringe_benefit, monthly_fringe_benefit, status, current_mileage, telepass,
                                         insurance_expiry_date, car_tax_expiry_date, created_at, updated_at
                                  FROM vehicles
                                  WHERE ($1::vehicle_status IS NULL OR status = $1) AND
                                        ($2::text IS NULL OR lower(plate) LIKE $2 OR lower(brand) LIKE $2 OR lower(model) LIKE $2)
                                  ORDER BY plate
                                  LIMIT $3 OFFSET $4";

/**
 * SQL query to add a vehicle, always in service.
 */
const ADD_VEHICLE: &str = "INSERT INTO vehicles (plate, chassis_number, brand, model, series, year, vehicle_type, fuel_type, ownership, supplier_id, registration_date, contract_start_date,
                                                 contract_end_date, contract_duration, contractual_km, financial_fee, assistance_fee, total_fee, annual_fringe_benefit, monthly_fringe_benefit,
                                                 status, current_mileage, telepass, insurance_expiry_date, car_tax_expiry_date, created_at, updated_at)
                           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, 'IN_SERVICE', $21, $22, $23, $24, now(), now())
                           RETURNING id";

/**
 * SQL query to update a vehicle. Status and mileage have their own operations.
 */
const UPDATE_VEHICLE: &str = "UPDATE vehicles SET plate = $1, chassis_number = $2, brand = $3, model = $4, series = $5, year = $6, vehicle_type = $7, fuel_type = $8, ownership = $9,
                                                  supplier_id = $10, registration_date = $11, contract_start_date = $12, contract_end_date = $13, contract_duration = $14,
                                                  contractual_km = $15, financial_fee = $16, assistance_fee = $17, total_fee = $18, annual_fringe_benefit = $19,
                                                  monthly_fringe_benefit = $20, telepass = $21, insurance_expiry_date = $22, car_tax_expiry_date = $23, updated_at = now()
                              WHERE id = $24";

const UPDATE_VEHICLE_STATUS: &str = "UPDATE vehicles SET status = $1, updated_at = now() WHERE id = $2";

const DELETE_VEHICLE: &str = "DELETE FROM vehicles WHERE id = $1";

const EXISTS_VEHICLE: &str = "SELECT EXISTS (SELECT 1 FROM vehicles WHERE id = $1)";

/**
 * DAO for vehicle-related database operations.
 */
pub struct VehicleDao {}

impl VehicleDao {
    pub fn new() -> Self {
        VehicleDao {}
    }

    /**
     * Retrieves a vehicle.
     *
     * # Arguments
     * `connection`: The database connection.
     * `vehicle_id`: Id of the vehicle.
     *
     * # Returns
     * The vehicle or a not found error.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_vehicle(&self, connection: &mut PgConnection, vehicle_id: i64) -> Result<VehicleDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let vehicle: Option<VehicleDetailType> = sqlx::query_as(QUERY_VEHICLE)
            .bind(vehicle_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get vehicle", &err))?;
        found(vehicle, "Vehicle", vehicle_id)
    }

    /**
     * Retrieves a page of vehicles.
     *
     * # Arguments
     * `connection`: The database connection.
     * `pagination_input`: Pagination information.
     * `filter`: Optional status and keyword filter.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_vehicle_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, filter: VehicleListInputType) -> Result<ListOutputType<VehicleDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<VehicleDetailType> = sqlx::query_as(QUERY_VEHICLE_LIST)
            .bind(filter.status)
            .bind(like_pattern(filter.keyword.as_deref()))
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get vehicle list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    /**
     * Adds a vehicle.
     *
     * # Arguments
     * `transaction`: The database transaction.
     * `vehicle_input`: The validated vehicle.
     *
     * # Returns
     * Id of the new vehicle.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_vehicle(&self, transaction: &mut PgConnection, vehicle_input: VehicleInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let total_fee = vehicle_input.total_fee();
        let id: (i64,) = sqlx::query_as(ADD_VEHICLE)
            .bind(vehicle_input.plate)
            .bind(vehicle_input.chassis_number)
            .bind(vehicle_input.brand)
            .bind(vehicle_input.model)
            .bind(vehicle_input.series)
            .bind(vehicle_input.year)
            .bind(vehicle_input.vehicle_type)
            .bind(vehicle_input.fuel_type)
            .bind(vehicle_input.ownership)
            .bind(vehicle_input.supplier_id)
            .bind(vehicle_input.registration_date)
            .bind(vehicle_input.contract_start_date)
            .bind(vehicle_input.contract_end_date)
            .bind(vehicle_input.contract_duration)
            .bind(vehicle_input.contractual_km)
            .bind(vehicle_input.financial_fee)
            .bind(vehicle_input.assistance_fee)
            .bind(total_fee)
            .bind(vehicle_input.annual_fringe_benefit)
            .bind(vehicle_input.monthly_fringe_benefit)
            .bind(vehicle_input.current_mileage)
            .bind(vehicle_input.telepass)
            .bind(vehicle_input.insurance_expiry_date)
            .bind(vehicle_input.car_tax_expiry_date)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    /**
     * Updates a vehicle, leaving status and mileage untouched.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_vehicle(&self, transaction: &mut PgConnection, vehicle_id: i64, vehicle_input: VehicleInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let total_fee = vehicle_input.total_fee();
        let result = sqlx::query(UPDATE_VEHICLE)
            .bind(vehicle_input.plate)
            .bind(vehicle_input.chassis_number)
            .bind(vehicle_input.brand)
            .bind(vehicle_input.model)
            .bind(vehicle_input.series)
            .bind(vehicle_input.year)
            .bind(vehicle_input.vehicle_type)
            .bind(vehicle_input.fuel_type)
            .bind(vehicle_input.ownership)
            .bind(vehicle_input.supplier_id)
            .bind(vehicle_input.registration_date)
            .bind(vehicle_input.contract_start_date)
            .bind(vehicle_input.contract_end_date)
            .bind(vehicle_input.contract_duration)
            .bind(vehicle_input.contractual_km)
            .bind(vehicle_input.financial_fee)
            .bind(vehicle_input.assistance_fee)
            .bind(total_fee)
            .bind(vehicle_input.annual_fringe_benefit)
            .bind(vehicle_input.monthly_fringe_benefit)
            .bind(vehicle_input.telepass)
            .bind(vehicle_input.insurance_expiry_date)
            .bind(vehicle_input.car_tax_expiry_date)
            .bind(vehicle_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Vehicle", vehicle_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_vehicle_status(&self, transaction: &mut PgConnection, vehicle_id: i64, status: VehicleStatus) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_VEHICLE_STATUS)
            .bind(status)
            .bind(vehicle_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Vehicle", vehicle_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_vehicle(&self, transaction: &mut PgConnection, vehicle_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_VEHICLE)
            .bind(vehicle_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Vehicle", vehicle_id, "deleted")
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn vehicle_exists(&self, connection: &mut PgConnection, vehicle_id: i64) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_VEHICLE)
            .bind(vehicle_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check vehicle", &err))?;
        Ok(exists.0)
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
pub mod integration_test {
    use super::*;
    use crate::model::{
        apperror::ErrorType,
        enums::{FuelType, OwnershipType, VehicleType},
    };
    use crate::dao::common::integration_test::init_db;
    use rust_decimal::Decimal;

    pub fn vehicle_input(plate: &str) -> VehicleInputType {
        VehicleInputType {
            plate: plate.to_string(),
            chassis_number: None,
            brand: Some("Fiat".to_string()),
            model: Some("Doblo".to_string()),
            series: None,
            year: Some(2022),
            vehicle_type: Some(VehicleType::Car),
            fuel_type: Some(FuelType::Diesel),
            ownership: Some(OwnershipType::Leased),
            supplier_id: None,
            registration_date: None,
            contract_start_date: None,
            contract_end_date: None,
            contract_duration: None,
            contractual_km: None,
            financial_fee: Some(Decimal::new(300, 0)),
            assistance_fee: Some(Decimal::new(50, 0)),
            annual_fringe_benefit: None,
            monthly_fringe_benefit: None,
            current_mileage: Some(1000),
            telepass: None,
            insurance_expiry_date: None,
            car_tax_expiry_date: None,
        }
    }

    #[sqlx::test]
    async fn test_add_update_then_delete_vehicle() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let vehicle_dao = VehicleDao::new();
        let vehicle_id = vehicle_dao.add_vehicle(&mut transaction, vehicle_input("ZZ999ZZ")).await.unwrap();
        let vehicle = vehicle_dao.get_vehicle(&mut transaction, vehicle_id).await.unwrap();
        assert_eq!(vehicle.status, VehicleStatus::InService);
        assert_eq!(vehicle.total_fee, Some(Decimal::new(350, 0)));
        let update_result = vehicle_dao.update_vehicle(&mut transaction, vehicle_id, vehicle_input("ZZ998ZZ")).await;
        assert!(update_result.is_ok());
        assert_eq!(vehicle_dao.get_vehicle(&mut transaction, vehicle_id).await.unwrap().current_mileage, Some(1000));
        let delete_result = vehicle_dao.delete_vehicle(&mut transaction, vehicle_id).await;
        assert!(delete_result.is_ok());
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_add_duplicate_plate() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let vehicle_dao = VehicleDao::new();
        vehicle_dao.add_vehicle(&mut transaction, vehicle_input("ZZ997ZZ")).await.unwrap();
        let error = vehicle_dao.add_vehicle(&mut transaction, vehicle_input("ZZ997ZZ")).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::ConstraintViolation);
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_get_vehicle_list() {
        let pool = init_db().await;
        let vehicle_dao = VehicleDao::new();
        let mut connection = pool.acquire().await.unwrap();
        let result = vehicle_dao.get_vehicle_list(&mut connection, PaginationInput { start_index: 0, page_size: 10 }, VehicleListInputType { status: Some(VehicleStatus::InService), keyword: Some("fiat".to_string()) }).await;
        assert!(result.is_ok());
    }

    #[sqlx::test]
    async fn test_delete_missing_vehicle() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let error = VehicleDao::new().delete_vehicle(&mut transaction, -1).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
        transaction.rollback().await.unwrap();
    }
}
