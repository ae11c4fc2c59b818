use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::{debug, instrument};

use crate::{
    dao::{mileage::MileageDao, vehicles::VehicleDao},
    model::{
        apperror::ApplicationError,
        enums::MileageSource,
        models::{ListOutputType, PaginationInput},
        operations::{MileageDetailType, check_mileage_reading},
    },
    service::common::{acquire, check_reference, connection_pool},
};

/**
 * Service for the mileage log. Vehicle updates, maintenance and refuels each keep one reading,
 * and the current mileage of a vehicle follows its latest reading.
 */
pub struct MileageService {
    mileage_dao: MileageDao,
    vehicle_dao: VehicleDao,
    connection_pool: Option<Pool<Postgres>>,
}

impl MileageService {
    pub fn new(connection_pool: Option<Pool<Postgres>>) -> Self {
        MileageService { mileage_dao: MileageDao::new(), vehicle_dao: VehicleDao::new(), connection_pool }
    }

    pub async fn get_mileage_list(&self, pagination_input: PaginationInput, vehicle_id: i64) -> Result<ListOutputType<MileageDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        check_reference(self.vehicle_dao.vehicle_exists(&mut connection, vehicle_id).await?, "Vehicle", vehicle_id)?;
        self.mileage_dao.get_mileage_list(&mut connection, pagination_input, vehicle_id).await
    }

    /**
     * Stores the reading of a source.
     *
     * # Arguments
     * `transaction`: The database transaction.
     * `vehicle_id`: The vehicle read.
     * `mileage`: The reading. Missing removes the source's reading, zero repeats the previous reading if there is one.
     * `mileage_date`: Date of the reading.
     * `source`, `source_id`: Where the reading came from.
     *
     * # Returns
     * The current mileage of the vehicle afterwards.
     */
    #[instrument(skip(self, transaction))]
    pub async fn record_in(&self, transaction: &mut PgConnection, vehicle_id: i64, mileage: Option<i32>, mileage_date: NaiveDate, source: MileageSource, source_id: i64) -> Result<Option<i32>, ApplicationError> {
        let previous_mileage = self.mileage_dao.get_previous_mileage(transaction, vehicle_id, mileage_date, source, source_id).await?;
        let mileage = match (mileage, previous_mileage) {
            (Some(0), Some(previous_mileage)) => previous_mileage,
            (None, _) => {
                self.mileage_dao.delete_mileage(transaction, source, source_id).await?;
                return self.mileage_dao.sync_current_mileage(transaction, vehicle_id).await;
            }
            (Some(mileage), previous_mileage) => {
                check_mileage_reading(previous_mileage, mileage)?;
                mileage
            }
        };
        self.mileage_dao.save_mileage(transaction, vehicle_id, mileage, mileage_date, source, source_id).await?;
        let current_mileage = self.mileage_dao.sync_current_mileage(transaction, vehicle_id).await?;
        debug!("Recorded {mileage} km for vehicle {vehicle_id}, current mileage {current_mileage:?}");
        Ok(current_mileage)
    }

    /**
     * Removes the reading of a source and recomputes the current mileage of its vehicle.
     *
     * # Returns
     * True if the source had a reading.
     */
    #[instrument(skip(self, transaction))]
    pub async fn remove_in(&self, transaction: &mut PgConnection, source: MileageSource, source_id: i64) -> Result<bool, ApplicationError> {
        match self.mileage_dao.delete_mileage(transaction, source, source_id).await? {
            Some(vehicle_id) => {
                self.mileage_dao.sync_current_mileage(transaction, vehicle_id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
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
    use crate::model::apperror::ErrorType;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    #[sqlx::test]
    async fn test_readings_drive_current_mileage() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let service = MileageService::new(Some(pool.clone()));
        let vehicle_id = VehicleDao::new().add_vehicle(&mut transaction, vehicle_input("ZZ985ZZ")).await.unwrap();
        assert_eq!(service.record_in(&mut transaction, vehicle_id, Some(1000), date(1), MileageSource::Vehicle, vehicle_id).await.unwrap(), Some(1000));
        assert_eq!(service.record_in(&mut transaction, vehicle_id, Some(0), date(5), MileageSource::Maintenance, -11).await.unwrap(), Some(1000));
        assert_eq!(service.record_in(&mut transaction, vehicle_id, Some(1800), date(9), MileageSource::Refuel, -11).await.unwrap(), Some(1800));
        let error = service.record_in(&mut transaction, vehicle_id, Some(900), date(20), MileageSource::Refuel, -12).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::BusinessRule);
        assert_eq!(service.record_in(&mut transaction, vehicle_id, None, date(9), MileageSource::Refuel, -11).await.unwrap(), Some(1000));
        assert_eq!(VehicleDao::new().get_vehicle(&mut transaction, vehicle_id).await.unwrap().current_mileage, Some(1000));
        assert!(service.remove_in(&mut transaction, MileageSource::Maintenance, -11).await.unwrap());
        assert!(!service.remove_in(&mut transaction, MileageSource::Maintenance, -11).await.unwrap());
        transaction.rollback().await.unwrap();
    }
}
