use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{employees::EmployeeDao, fuelcards::FuelCardDao, suppliers::SupplierDao, vehicles::VehicleDao},
    model::{
        apperror::ApplicationError,
        fleet::{FuelCardDetailType, FuelCardInputType, is_card_active},
        models::{ListOutputType, PaginationInput},
    },
    service::common::{acquire, begin, check_reference, connection_pool, finish, today},
};

/**
 * Reasons an active card cannot be linked.
 *
 * # Arguments
 * `vehicle_has_card`: The linked vehicle already holds another active card.
 * `employee_has_card`: The linked employee already holds another active card.
 */
pub fn fuel_card_errors(vehicle_has_card: bool, employee_has_card: bool) -> Vec<String> {
    let mut errors = Vec::new();
    if vehicle_has_card {
        errors.push("The vehicle already has an active fuel card".to_string());
    }
    if employee_has_card {
        errors.push("The employee already has an active fuel card".to_string());
    }
    errors
}

pub struct FuelCardService {
    fuel_card_dao: FuelCardDao,
    vehicle_dao: VehicleDao,
    employee_dao: EmployeeDao,
    supplier_dao: SupplierDao,
    connection_pool: Option<Pool<Postgres>>,
}

impl FuelCardService {
    pub fn new(connection_pool: Option<Pool<Postgres>>) -> Self {
        FuelCardService {
            fuel_card_dao: FuelCardDao::new(),
            vehicle_dao: VehicleDao::new(),
            employee_dao: EmployeeDao::new(),
            supplier_dao: SupplierDao::new(),
            connection_pool,
        }
    }

    pub async fn get_fuel_card(&self, fuel_card_id: i64) -> Result<FuelCardDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.fuel_card_dao.get_fuel_card(&mut connection, fuel_card_id, today()).await
    }

    pub async fn get_fuel_card_list(&self, pagination_input: PaginationInput, active: Option<bool>) -> Result<ListOutputType<FuelCardDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.fuel_card_dao.get_fuel_card_list(&mut connection, pagination_input, active, today()).await
    }

    #[instrument(skip(self, fuel_card_input))]
    pub async fn add_fuel_card(&self, fuel_card_input: FuelCardInputType) -> Result<FuelCardDetailType, ApplicationError> {
        let fuel_card_input = fuel_card_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_fuel_card_in(&mut transaction, None, fuel_card_input, today()).await;
        finish(transaction, result).await
    }

    #[instrument(skip(self, fuel_card_input))]
    pub async fn update_fuel_card(&self, fuel_card_id: i64, fuel_card_input: FuelCardInputType) -> Result<FuelCardDetailType, ApplicationError> {
        let fuel_card_input = fuel_card_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_fuel_card_in(&mut transaction, Some(fuel_card_id), fuel_card_input, today()).await;
        finish(transaction, result).await
    }

    async fn save_fuel_card_in(&self, transaction: &mut PgConnection, fuel_card_id: Option<i64>, fuel_card_input: FuelCardInputType, today: NaiveDate) -> Result<FuelCardDetailType, ApplicationError> {
        if let Some(supplier_id) = fuel_card_input.supplier_id {
            check_reference(self.supplier_dao.supplier_exists(transaction, supplier_id).await?, "Supplier", supplier_id)?;
        }
        let mut vehicle_has_card = false;
        let mut employee_has_card = false;
        if let Some(vehicle_id) = fuel_card_input.vehicle_id {
            check_reference(self.vehicle_dao.vehicle_exists(transaction, vehicle_id).await?, "Vehicle", vehicle_id)?;
        }
        if let Some(employee_id) = fuel_card_input.employee_id {
            check_reference(self.employee_dao.employee_exists(transaction, employee_id).await?, "Employee", employee_id)?;
        }
        if is_card_active(fuel_card_input.expiry_date, today) {
            if let Some(vehicle_id) = fuel_card_input.vehicle_id {
                vehicle_has_card = self.fuel_card_dao.vehicle_has_active_card(transaction, vehicle_id, today, fuel_card_id).await?;
            }
            if let Some(employee_id) = fuel_card_input.employee_id {
                employee_has_card = self.fuel_card_dao.employee_has_active_card(transaction, employee_id, today, fuel_card_id).await?;
            }
        }
        let errors = fuel_card_errors(vehicle_has_card, employee_has_card);
        if !errors.is_empty() {
            return Err(ApplicationError::business_rule("The fuel card cannot be linked".to_string(), errors));
        }
        let fuel_card_id = match fuel_card_id {
            Some(fuel_card_id) => {
                self.fuel_card_dao.update_fuel_card(transaction, fuel_card_id, fuel_card_input).await?;
                fuel_card_id
            }
            None => self.fuel_card_dao.add_fuel_card(transaction, fuel_card_input).await?,
        };
        self.fuel_card_dao.get_fuel_card(transaction, fuel_card_id, today).await
    }

    #[instrument(skip(self))]
    pub async fn delete_fuel_card(&self, fuel_card_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.fuel_card_dao.delete_fuel_card(&mut transaction, fuel_card_id).await;
        finish(transaction, result).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fuel_card_errors() {
        assert!(fuel_card_errors(false, false).is_empty());
        assert_eq!(fuel_card_errors(true, true).len(), 2);
        assert_eq!(fuel_card_errors(false, true), vec!["The employee already has an active fuel card".to_string()]);
    }
}
