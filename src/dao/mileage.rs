use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{handle_database_error, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        enums::MileageSource,
        models::{ListOutputType, PaginationInput},
        operations::MileageDetailType,
    },
};

/**
 * SQL query for the latest reading of a vehicle before a date, ignoring the reading of one source.
 */
const QUERY_PREVIOUS_MILEAGE: &str = "SELECT mileage FROM vehicle_mileage
                                      WHERE vehicle_id = $1 AND mileage_date < $2 AND NOT (source = $3 AND source_id = $4)
                                      ORDER BY mileage_date DESC, mileage DESC, id DESC
                                      LIMIT 1";

const QUERY_MILEAGE_LIST: &str = "SELECT id, vehicle_id, mileage, mileage_date, source, source_id FROM vehicle_mileage
                                  WHERE vehicle_id = $1
                                  ORDER BY mileage_date DESC, id DESC
                                  LIMIT $2 OFFSET $3";

/**
 * SQL query storing the reading of a source, replacing its earlier reading.
 */
const UPSERT_MILEAGE: &str = "INSERT INTO vehicle_mileage (vehicle_id, mileage, mileage_date, source, source_id) VALUES ($1, $2, $3, $4, $5)
                              ON CONFLICT (source, source_id) DO UPDATE SET vehicle_id = EXCLUDED.vehicle_id, mileage = EXCLUDED.mileage, mileage_date = EXCLUDED.mileage_date";

const DELETE_MILEAGE: &str = "DELETE FROM vehicle_mileage WHERE source = $1 AND source_id = $2 RETURNING vehicle_id";

/**
 * SQL query setting the current mileage of a vehicle to its latest reading, or null without readings.
 * Readings of the same day count the highest as latest.
 */
const SYNC_CURRENT_MILEAGE: &str = "UPDATE vehicles SET current_mileage = (SELECT mileage FROM vehicle_mileage WHERE vehicle_id = $1 ORDER BY mileage_date DESC, mileage DESC, id DESC LIMIT 1), updated_at = now()
                                    WHERE id = $1
                                    RETURNING current_mileage";

/**
 * DAO for the mileage log of vehicles.
 */
pub struct MileageDao {}

impl MileageDao {
    pub fn new() -> Self {
        MileageDao {}
    }

    /**
     * Retrieves the latest reading of a vehicle dated before `before_date`.
     *
     * # Arguments
     * `connection`: The database connection.
     * `vehicle_id`: The vehicle.
     * `before_date`: Readings on or after this date are ignored.
     * `source`, `source_id`: The reading being replaced, ignored as well.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_previous_mileage(&self, connection: &mut PgConnection, vehicle_id: i64, before_date: NaiveDate, source: MileageSource, source_id: i64) -> Result<Option<i32>, ApplicationError> {
        let span = tracing::Span::current();
        let mileage: Option<(i32,)> = sqlx::query_as(QUERY_PREVIOUS_MILEAGE)
            .bind(vehicle_id)
            .bind(before_date)
            .bind(source)
            .bind(source_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get previous mileage", &err))?;
        Ok(mileage.map(|mileage| mileage.0))
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_mileage_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, vehicle_id: i64) -> Result<ListOutputType<MileageDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<MileageDetailType> = sqlx::query_as(QUERY_MILEAGE_LIST)
            .bind(vehicle_id)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get mileage list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn save_mileage(&self, transaction: &mut PgConnection, vehicle_id: i64, mileage: i32, mileage_date: NaiveDate, source: MileageSource, source_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(UPSERT_MILEAGE)
            .bind(vehicle_id)
            .bind(mileage)
            .bind(mileage_date)
            .bind(source)
            .bind(source_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(())
    }

    /**
     * Deletes the reading of a source.
     *
     * # Returns
     * The vehicle of the deleted reading, `None` when the source had none.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_mileage(&self, transaction: &mut PgConnection, source: MileageSource, source_id: i64) -> Result<Option<i64>, ApplicationError> {
        let span = tracing::Span::current();
        let vehicle_id: Option<(i64,)> = sqlx::query_as(DELETE_MILEAGE)
            .bind(source)
            .bind(source_id)
            .fetch_optional(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(vehicle_id.map(|vehicle_id| vehicle_id.0))
    }

    /**
     * Sets the current mileage of a vehicle from its log.
     *
     * # Returns
     * The new current mileage.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn sync_current_mileage(&self, transaction: &mut PgConnection, vehicle_id: i64) -> Result<Option<i32>, ApplicationError> {
        let span = tracing::Span::current();
        let current: Option<(Option<i32>,)> = sqlx::query_as(SYNC_CURRENT_MILEAGE)
            .bind(vehicle_id)
            .fetch_optional(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(current.and_then(|current| current.0))
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

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[sqlx::test]
    async fn test_log_follows_latest_reading() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let mileage_dao = MileageDao::new();
        let vehicle_id = VehicleDao::new().add_vehicle(&mut transaction, vehicle_input("ZZ988ZZ")).await.unwrap();
        mileage_dao.save_mileage(&mut transaction, vehicle_id, 1000, date(1), MileageSource::Vehicle, vehicle_id).await.unwrap();
        mileage_dao.save_mileage(&mut transaction, vehicle_id, 1500, date(10), MileageSource::Refuel, -7).await.unwrap();
        assert_eq!(mileage_dao.sync_current_mileage(&mut transaction, vehicle_id).await.unwrap(), Some(1500));
        assert_eq!(mileage_dao.get_previous_mileage(&mut transaction, vehicle_id, date(20), MileageSource::Maintenance, -1).await.unwrap(), Some(1500));
        assert_eq!(mileage_dao.get_previous_mileage(&mut transaction, vehicle_id, date(20), MileageSource::Refuel, -7).await.unwrap(), Some(1000));
        mileage_dao.save_mileage(&mut transaction, vehicle_id, 1200, date(10), MileageSource::Refuel, -7).await.unwrap();
        let list = mileage_dao.get_mileage_list(&mut transaction, PaginationInput { start_index: 0, page_size: 10 }, vehicle_id).await.unwrap();
        assert_eq!(list.elements.len(), 2);
        assert_eq!(list.elements[0].mileage, 1200);
        assert_eq!(mileage_dao.delete_mileage(&mut transaction, MileageSource::Refuel, -7).await.unwrap(), Some(vehicle_id));
        assert_eq!(mileage_dao.delete_mileage(&mut transaction, MileageSource::Refuel, -7).await.unwrap(), None);
        assert_eq!(mileage_dao.sync_current_mileage(&mut transaction, vehicle_id).await.unwrap(), Some(1000));
        transaction.rollback().await.unwrap();
    }
}
