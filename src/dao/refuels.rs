use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        models::{ListOutputType, PaginationInput},
        operations::{RefuelDetailType, RefuelInputType, RefuelListInputType},
    },
};

const QUERY_REFUEL: &str = "SELECT r.id, r.vehicle_id, r.fuel_card_id, r.refuel_date, r.mileage, r.quantity, r.amount, v.plate AS vehicle_plate, c.card_number
                            FROM refuels r
                            JOIN vehicles v ON v.id = r.vehicle_id
                            LEFT JOIN fuel_cards c ON c.id = r.fuel_card_id
                            WHERE r.id = $1";

/**
 * SQL query to search refuels by vehicle, card, year and date range, most recent first.
 */
const QUERY_REFUEL_LIST: &str = "SELECT r.id, r.vehicle_id, r.fuel_card_id, r.refuel_date, r.mileage, r.quantity, r.amount, v.plate AS vehicle_plate, c.card_number
                                 FROM refuels r
                                 JOIN vehicles v ON v.id = r.vehicle_id
                                 LEFT JOIN fuel_cards c ON c.id = r.fuel_card_id
                                 WHERE ($1::bigint IS NULL OR r.vehicle_id = $1) AND
                                       ($2::bigint IS NULL OR r.fuel_card_id = $2) AND
                                       ($3::integer IS NULL OR EXTRACT(YEAR FROM r.refuel_date) = $3) AND
                                       ($4::date IS NULL OR r.refuel_date >= $4) AND
                                       ($5::date IS NULL OR r.refuel_date <= $5)
                                 ORDER BY r.refuel_date DESC, r.id DESC
                                 LIMIT $6 OFFSET $7";

/**
 * SQL query for the highest mileage recorded by refuels or maintenance before a date.
 */
const QUERY_LAST_MILEAGE: &str = "SELECT MAX(mileage) FROM (
                                      SELECT mileage FROM refuels WHERE vehicle_id = $1 AND refuel_date < $2 AND ($3::bigint IS NULL OR id <> $3)
                                      UNION ALL
                                      SELECT mileage FROM maintenance WHERE vehicle_id = $1 AND maintenance_date < $2
                                  ) readings";

const ADD_REFUEL: &str = "INSERT INTO refuels (vehicle_id, fuel_card_id, refuel_date, mileage, quantity, amount) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id";

const UPDATE_REFUEL: &str = "UPDATE refuels SET vehicle_id = $1, fuel_card_id = $2, refuel_date = $3, mileage = $4, quantity = $5, amount = $6 WHERE id = $7";

const DELETE_REFUEL: &str = "DELETE FROM refuels WHERE id = $1";

/**
 * DAO for refuels.
 */
pub struct RefuelDao {}

impl RefuelDao {
    pub fn new() -> Self {
        RefuelDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_refuel(&self, connection: &mut PgConnection, refuel_id: i64) -> Result<RefuelDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let refuel: Option<RefuelDetailType> = sqlx::query_as(QUERY_REFUEL)
            .bind(refuel_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get refuel", &err))?;
        found(refuel, "Refuel", refuel_id)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_refuel_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, filter: RefuelListInputType) -> Result<ListOutputType<RefuelDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<RefuelDetailType> = sqlx::query_as(QUERY_REFUEL_LIST)
            .bind(filter.vehicle_id)
            .bind(filter.fuel_card_id)
            .bind(filter.year)
            .bind(filter.from)
            .bind(filter.to)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get refuel list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    /**
     * Retrieves the highest mileage of a vehicle recorded before `before_date`.
     *
     * # Arguments
     * `connection`: The database connection.
     * `vehicle_id`: The vehicle.
     * `before_date`: Date of the refuel being checked.
     * `excluded_id`: The refuel being updated.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_last_mileage(&self, connection: &mut PgConnection, vehicle_id: i64, before_date: NaiveDate, excluded_id: Option<i64>) -> Result<Option<i32>, ApplicationError> {
        let span = tracing::Span::current();
        let mileage: (Option<i32>,) = sqlx::query_as(QUERY_LAST_MILEAGE)
            .bind(vehicle_id)
            .bind(before_date)
            .bind(excluded_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get last mileage", &err))?;
        Ok(mileage.0)
    }

    /**
     * Adds a refuel with its resolved mileage.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_refuel(&self, transaction: &mut PgConnection, refuel_input: RefuelInputType, mileage: i32) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_REFUEL)
            .bind(refuel_input.vehicle_id)
            .bind(refuel_input.fuel_card_id)
            .bind(refuel_input.refuel_date)
            .bind(mileage)
            .bind(refuel_input.quantity)
            .bind(refuel_input.amount)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_refuel(&self, transaction: &mut PgConnection, refuel_id: i64, refuel_input: RefuelInputType, mileage: i32) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_REFUEL)
            .bind(refuel_input.vehicle_id)
            .bind(refuel_input.fuel_card_id)
            .bind(refuel_input.refuel_date)
            .bind(mileage)
            .bind(refuel_input.quantity)
            .bind(refuel_input.amount)
            .bind(refuel_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Refuel", refuel_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_refuel(&self, transaction: &mut PgConnection, refuel_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_REFUEL)
            .bind(refuel_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Refuel", refuel_id, "deleted")
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
    use rust_decimal::Decimal;

    fn refuel_input(vehicle_id: i64, day: u32) -> RefuelInputType {
        RefuelInputType {
            vehicle_id,
            fuel_card_id: None,
            refuel_date: NaiveDate::from_ymd_opt(2024, 5, day),
            mileage: None,
            quantity: Some(Decimal::new(40, 0)),
            amount: Some(Decimal::new(7200, 2)),
        }
    }

    #[sqlx::test]
    async fn test_add_search_then_delete_refuel() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let refuel_dao = RefuelDao::new();
        let vehicle_id = VehicleDao::new().add_vehicle(&mut transaction, vehicle_input("ZZ987ZZ")).await.unwrap();
        let first_id = refuel_dao.add_refuel(&mut transaction, refuel_input(vehicle_id, 2), 1200).await.unwrap();
        let second_id = refuel_dao.add_refuel(&mut transaction, refuel_input(vehicle_id, 9), 1600).await.unwrap();
        let before = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        assert_eq!(refuel_dao.get_last_mileage(&mut transaction, vehicle_id, before, None).await.unwrap(), Some(1200));
        assert_eq!(refuel_dao.get_last_mileage(&mut transaction, vehicle_id, before, Some(first_id)).await.unwrap(), None);
        let filter = RefuelListInputType { vehicle_id: Some(vehicle_id), year: Some(2024), ..RefuelListInputType::default() };
        let list = refuel_dao.get_refuel_list(&mut transaction, PaginationInput { start_index: 0, page_size: 10 }, filter).await.unwrap();
        assert_eq!(list.elements.iter().map(|refuel| refuel.id).collect::<Vec<_>>(), vec![second_id, first_id]);
        refuel_dao.update_refuel(&mut transaction, first_id, refuel_input(vehicle_id, 3), 1250).await.unwrap();
        assert_eq!(refuel_dao.get_refuel(&mut transaction, first_id).await.unwrap().mileage, 1250);
        refuel_dao.delete_refuel(&mut transaction, second_id).await.unwrap();
        transaction.rollback().await.unwrap();
    }
}
