use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::{debug, instrument};

use crate::{
    dao::{fuelcards::FuelCardDao, refuels::RefuelDao, vehicles::VehicleDao},
    model::{
        apperror::ApplicationError,
        enums::MileageSource,
        models::{ListOutputType, PaginationInput},
        operations::{RefuelDetailType, RefuelInputType, RefuelListInputType, resolve_refuel_mileage},
    },
    service::{
        common::{acquire, begin, check_reference, connection_pool, finish, today},
        mileage::MileageService,
    },
};

/**
 * Service for refuels. Each refuel leaves a reading in the mileage log.
 */
pub struct RefuelService {
    refuel_dao: RefuelDao,
    vehicle_dao: VehicleDao,
    fuel_card_dao: FuelCardDao,
    mileage_service: MileageService,
    connection_pool: Option<Pool<Postgres>>,
}

impl RefuelService {
    pub fn new(connection_pool: Option<Pool<Postgres>>) -> Self {
        RefuelService {
            refuel_dao: RefuelDao::new(),
            vehicle_dao: VehicleDao::new(),
            fuel_card_dao: FuelCardDao::new(),
            mileage_service: MileageService::new(connection_pool.clone()),
            connection_pool,
        }
    }

    pub async fn get_refuel(&self, refuel_id: i64) -> Result<RefuelDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.refuel_dao.get_refuel(&mut connection, refuel_id).await
    }

    pub async fn get_refuel_list(&self, pagination_input: PaginationInput, filter: RefuelListInputType) -> Result<ListOutputType<RefuelDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.refuel_dao.get_refuel_list(&mut connection, pagination_input, filter).await
    }

    /**
     * Records a refuel. A missing or zero mileage takes the last reading of the vehicle.
     */
    #[instrument(skip(self, refuel_input), fields(vehicle_id = refuel_input.vehicle_id))]
    pub async fn add_refuel(&self, refuel_input: RefuelInputType) -> Result<RefuelDetailType, ApplicationError> {
        let today = today();
        let refuel_input = refuel_input.validate(today)?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_refuel_in(&mut transaction, None, refuel_input, today).await;
        finish(transaction, result).await
    }

    #[instrument(skip(self, refuel_input))]
    pub async fn update_refuel(&self, refuel_id: i64, refuel_input: RefuelInputType) -> Result<RefuelDetailType, ApplicationError> {
        let today = today();
        let refuel_input = refuel_input.validate(today)?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_refuel_in(&mut transaction, Some(refuel_id), refuel_input, today).await;
        finish(transaction, result).await
    }

    async fn save_refuel_in(&self, transaction: &mut PgConnection, refuel_id: Option<i64>, refuel_input: RefuelInputType, today: NaiveDate) -> Result<RefuelDetailType, ApplicationError> {
        let vehicle_id = refuel_input.vehicle_id;
        check_reference(self.vehicle_dao.vehicle_exists(transaction, vehicle_id).await?, "Vehicle", vehicle_id)?;
        if let Some(fuel_card_id) = refuel_input.fuel_card_id {
            check_reference(self.fuel_card_dao.fuel_card_exists(transaction, fuel_card_id).await?, "Fuel card", fuel_card_id)?;
        }
        let refuel_date = refuel_input.refuel_date.unwrap_or(today);
        let last_mileage = self.refuel_dao.get_last_mileage(transaction, vehicle_id, refuel_date, refuel_id).await?;
        let mileage = resolve_refuel_mileage(refuel_input.mileage, last_mileage)?;
        let refuel_id = match refuel_id {
            Some(refuel_id) => {
                self.refuel_dao.update_refuel(transaction, refuel_id, refuel_input, mileage).await?;
                self.mileage_service.remove_in(transaction, MileageSource::Refuel, refuel_id).await?;
                refuel_id
            }
            None => self.refuel_dao.add_refuel(transaction, refuel_input, mileage).await?,
        };
        if mileage > 0 {
            self.mileage_service.record_in(transaction, vehicle_id, Some(mileage), refuel_date, MileageSource::Refuel, refuel_id).await?;
        }
        debug!("Saved refuel {refuel_id} at {mileage} km");
        self.refuel_dao.get_refuel(transaction, refuel_id).await
    }

    /**
     * Deletes a refuel and its mileage reading.
     */
    #[instrument(skip(self))]
    pub async fn delete_refuel(&self, refuel_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_refuel_in(&mut transaction, refuel_id).await;
        finish(transaction, result).await
    }

    async fn delete_refuel_in(&self, transaction: &mut PgConnection, refuel_id: i64) -> Result<(), ApplicationError> {
        self.mileage_service.remove_in(transaction, MileageSource::Refuel, refuel_id).await?;
        self.refuel_dao.delete_refuel(transaction, refuel_id).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::apperror::ErrorType;
    use rust_decimal::Decimal;

    #[actix_web::test]
    async fn test_invalid_refuel_is_rejected_before_database() {
        let service = RefuelService::new(None);
        let refuel_input = RefuelInputType { vehicle_id: 1, fuel_card_id: None, refuel_date: None, mileage: None, quantity: Some(Decimal::ZERO), amount: None };
        let error = service.add_refuel(refuel_input).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.errors.len(), 3);
        assert_eq!(service.get_refuel(1).await.unwrap_err().error_type, ErrorType::DatabaseError);
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
    use rust_decimal::Decimal;

    fn refuel_input(vehicle_id: i64, day: u32, mileage: Option<i32>) -> RefuelInputType {
        RefuelInputType {
            vehicle_id,
            fuel_card_id: None,
            refuel_date: NaiveDate::from_ymd_opt(2024, 3, day),
            mileage,
            quantity: Some(Decimal::new(3500, 2)),
            amount: Some(Decimal::new(6300, 2)),
        }
    }

    async fn add_vehicle(pool: &sqlx::PgPool, plate: &str) -> i64 {
        let mut transaction = pool.begin().await.unwrap();
        let vehicle_id = VehicleDao::new().add_vehicle(&mut transaction, vehicle_input(plate)).await.unwrap();
        transaction.commit().await.unwrap();
        vehicle_id
    }

    #[sqlx::test]
    async fn test_refuels_move_the_mileage() {
        let pool = init_db().await;
        let service = RefuelService::new(Some(pool.clone()));
        let vehicle_id = add_vehicle(&pool, "ZZ983ZZ").await;
        let first = service.add_refuel(refuel_input(vehicle_id, 4, Some(2000))).await.unwrap();
        assert_eq!(first.mileage, 2000);
        let repeated = service.add_refuel(refuel_input(vehicle_id, 11, None)).await.unwrap();
        assert_eq!(repeated.mileage, 2000);
        let error = service.add_refuel(refuel_input(vehicle_id, 12, Some(1900))).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::BusinessRule);
        let updated = service.update_refuel(repeated.id, refuel_input(vehicle_id, 11, Some(2600))).await.unwrap();
        assert_eq!(updated.mileage, 2600);
        assert_eq!(VehicleDao::new().get_vehicle(&mut pool.acquire().await.unwrap(), vehicle_id).await.unwrap().current_mileage, Some(2600));
        service.delete_refuel(updated.id).await.unwrap();
        service.delete_refuel(first.id).await.unwrap();
        let mut transaction = pool.begin().await.unwrap();
        VehicleDao::new().delete_vehicle(&mut transaction, vehicle_id).await.unwrap();
        transaction.commit().await.unwrap();
    }

    #[sqlx::test]
    async fn test_refuel_with_missing_card() {
        let pool = init_db().await;
        let service = RefuelService::new(Some(pool.clone()));
        let vehicle_id = add_vehicle(&pool, "ZZ982ZZ").await;
        let refuel_input = RefuelInputType { fuel_card_id: Some(-1), ..refuel_input(vehicle_id, 4, Some(2000)) };
        assert_eq!(service.add_refuel(refuel_input).await.unwrap_err().error_type, ErrorType::NotFound);
        let mut transaction = pool.begin().await.unwrap();
        VehicleDao::new().delete_vehicle(&mut transaction, vehicle_id).await.unwrap();
        transaction.commit().await.unwrap();
    }
}
