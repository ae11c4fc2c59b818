use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        fleet::{FuelCardDetailType, FuelCardInputType},
        models::{ListOutputType, PaginationInput},
    },
};

/**
 * SQL query to retrieve a fuel card. A card is active when it has no expiry or expires today or later.
 */
const QUERY_FUEL_CARD: &str = "SELECT c.id, c.card_number, c.expiry_date, c.supplier_id, c.employee_id, c.vehicle_id, c.plafond,
                                      (c.expiry_date IS NULL OR c.expiry_date >= $2) AS active,
                                      e.first_name || ' ' || e.last_name AS employee_name, v.plate AS vehicle_plate
                               FROM fuel_cards c
                               LEFT JOIN employees e ON e.id = c.employee_id
                               LEFT JOIN vehicles v ON v.id = c.vehicle_id
                               WHERE c.id = $1";

const QUERY_FUEL_CARD_LIST: &str = "SELECT c.id, c.card_number, c.expiry_date, c.supplier_id, c.employee_id, c.vehicle_id, c.plafond,
                                           (c.expiry_date IS NULL OR c.expiry_date >= $1) AS active,
                                           e.first_name || ' ' || e.last_name AS employee_name, v.plate AS vehicle_plate
                                    FROM fuel_cards c
                                    LEFT JOIN employees e ON e.id = c.employee_id
                                    LEFT JOIN vehicles v ON v.id = c.vehicle_id
                                    WHERE ($2::boolean IS NULL OR (c.expiry_date IS NULL OR c.expiry_date >= $1) = $2)
                                    ORDER BY c.card_number
                                    LIMIT $3 OFFSET $4";

const ADD_FUEL_CARD: &str = "INSERT INTO fuel_cards (card_number, expiry_date, supplier_id, employee_id, vehicle_id, plafond) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id";

const UPDATE_FUEL_CARD: &str = "UPDATE fuel_cards SET card_number = $1, expiry_date = $2, supplier_id = $3, employee_id = $4, vehicle_id = $5, plafond = $6 WHERE id = $7";

const DELETE_FUEL_CARD: &str = "DELETE FROM fuel_cards WHERE id = $1";

const UNLINK_EMPLOYEE: &str = "UPDATE fuel_cards SET employee_id = NULL WHERE employee_id = $1";

const EXISTS_FUEL_CARD: &str = "SELECT EXISTS (SELECT 1 FROM fuel_cards WHERE id = $1)";

const EXISTS_ACTIVE_FOR_VEHICLE: &str = "SELECT EXISTS (SELECT 1 FROM fuel_cards WHERE vehicle_id = $1 AND (expiry_date IS NULL OR expiry_date >= $2) AND ($3::bigint IS NULL OR id <> $3))";

const EXISTS_ACTIVE_FOR_EMPLOYEE: &str = "SELECT EXISTS (SELECT 1 FROM fuel_cards WHERE employee_id = $1 AND (expiry_date IS NULL OR expiry_date >= $2) AND ($3::bigint IS NULL OR id <> $3))";

/**
 * DAO for fuel card database operations.
 */
pub struct FuelCardDao {}

impl FuelCardDao {
    pub fn new() -> Self {
        FuelCardDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_fuel_card(&self, connection: &mut PgConnection, fuel_card_id: i64, today: NaiveDate) -> Result<FuelCardDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let fuel_card: Option<FuelCardDetailType> = sqlx::query_as(QUERY_FUEL_CARD)
            .bind(fuel_card_id)
            .bind(today)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get fuel card", &err))?;
        found(fuel_card, "Fuel card", fuel_card_id)
    }

    /**
     * Retrieves a page of fuel cards.
     *
     * # Arguments
     * `connection`: The database connection.
     * `pagination_input`: Pagination information.
     * `active`: Only active or only inactive cards, all cards when missing.
     * `today`: Reference date for activity.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_fuel_card_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, active: Option<bool>, today: NaiveDate) -> Result<ListOutputType<FuelCardDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<FuelCardDetailType> = sqlx::query_as(QUERY_FUEL_CARD_LIST)
            .bind(today)
            .bind(active)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get fuel card list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_fuel_card(&self, transaction: &mut PgConnection, fuel_card_input: FuelCardInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_FUEL_CARD)
            .bind(fuel_card_input.card_number)
            .bind(fuel_card_input.expiry_date)
            .bind(fuel_card_input.supplier_id)
            .bind(fuel_card_input.employee_id)
            .bind(fuel_card_input.vehicle_id)
            .bind(fuel_card_input.plafond)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_fuel_card(&self, transaction: &mut PgConnection, fuel_card_id: i64, fuel_card_input: FuelCardInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_FUEL_CARD)
            .bind(fuel_card_input.card_number)
            .bind(fuel_card_input.expiry_date)
            .bind(fuel_card_input.supplier_id)
            .bind(fuel_card_input.employee_id)
            .bind(fuel_card_input.vehicle_id)
            .bind(fuel_card_input.plafond)
            .bind(fuel_card_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Fuel card", fuel_card_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_fuel_card(&self, transaction: &mut PgConnection, fuel_card_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_FUEL_CARD)
            .bind(fuel_card_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Fuel card", fuel_card_id, "deleted")
    }

    /**
     * Removes the employee from all their fuel cards.
     *
     * # Returns
     * Number of cards unlinked.
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

    #[instrument(skip(self, connection), fields(result))]
    pub async fn fuel_card_exists(&self, connection: &mut PgConnection, fuel_card_id: i64) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_FUEL_CARD)
            .bind(fuel_card_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check fuel card", &err))?;
        Ok(exists.0)
    }

    /**
     * Checks whether the vehicle holds an active card other than `excluded_id`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn vehicle_has_active_card(&self, connection: &mut PgConnection, vehicle_id: i64, today: NaiveDate, excluded_id: Option<i64>) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_ACTIVE_FOR_VEHICLE)
            .bind(vehicle_id)
            .bind(today)
            .bind(excluded_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check vehicle fuel card", &err))?;
        Ok(exists.0)
    }

    /**
     * Checks whether the employee holds an active card other than `excluded_id`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn employee_has_active_card(&self, connection: &mut PgConnection, employee_id: i64, today: NaiveDate, excluded_id: Option<i64>) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_ACTIVE_FOR_EMPLOYEE)
            .bind(employee_id)
            .bind(today)
            .bind(excluded_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check employee fuel card", &err))?;
        Ok(exists.0)
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

    #[sqlx::test]
    async fn test_fuel_card_activity() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let vehicle_id = VehicleDao::new().add_vehicle(&mut transaction, vehicle_input("ZZ994ZZ")).await.unwrap();
        let fuel_card_dao = FuelCardDao::new();
        let fuel_card_input = FuelCardInputType { card_number: "TEST-0001".to_string(), expiry_date: NaiveDate::from_ymd_opt(2024, 5, 31), supplier_id: None, employee_id: None, vehicle_id: Some(vehicle_id), plafond: None };
        let fuel_card_id = fuel_card_dao.add_fuel_card(&mut transaction, fuel_card_input).await.unwrap();
        let fuel_card = fuel_card_dao.get_fuel_card(&mut transaction, fuel_card_id, today).await.unwrap();
        assert!(!fuel_card.active);
        assert!(!fuel_card_dao.vehicle_has_active_card(&mut transaction, vehicle_id, today, None).await.unwrap());
        let expired = fuel_card_dao.get_fuel_card_list(&mut transaction, PaginationInput { start_index: 0, page_size: 500 }, Some(false), today).await.unwrap();
        assert!(expired.elements.iter().any(|card| card.id == fuel_card_id));
        assert!(fuel_card_dao.fuel_card_exists(&mut transaction, fuel_card_id).await.unwrap());
        assert!(fuel_card_dao.delete_fuel_card(&mut transaction, fuel_card_id).await.is_ok());
        assert!(!fuel_card_dao.fuel_card_exists(&mut transaction, fuel_card_id).await.unwrap());
        transaction.rollback().await.unwrap();
    }
}
