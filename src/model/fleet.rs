use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{
    apperror::ApplicationError,
    enums::{AssignmentStatus, FuelType, OwnershipType, VehicleStatus, VehicleType},
    validation::{is_valid_plate, normalize_plate, trim_to_none},
};

/**
 * Lowest accepted registration year.
 */
pub const MIN_VEHICLE_YEAR: i32 = 1900;

/**
 * Highest accepted registration year.
 */
pub const MAX_VEHICLE_YEAR: i32 = 2100;

/***************** Vehicles *********************/

/**
 * A vehicle of the fleet.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetailType {
    pub id: i64,
    pub plate: String,
    pub chassis_number: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub series: Option<String>,
    pub year: i32,
    pub vehicle_type: Option<VehicleType>,
    pub fuel_type: Option<FuelType>,
    pub ownership: Option<OwnershipType>,
    pub supplier_id: Option<i64>,
    pub registration_date: Option<NaiveDate>,
    pub contract_start_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
    pub contract_duration: Option<i32>,
    pub contractual_km: Option<i32>,
    pub financial_fee: Option<Decimal>,
    pub assistance_fee: Option<Decimal>,
    pub total_fee: Option<Decimal>,
    pub annual_fringe_benefit: Option<Decimal>,
    pub monthly_fringe_benefit: Option<Decimal>,
    pub status: VehicleStatus,
    pub current_mileage: Option<i32>,
    pub telepass: Option<String>,
    pub insurance_expiry_date: Option<NaiveDate>,
    pub car_tax_expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/**
 * Input for adding or updating a vehicle.
 */
#[derive(Debug, Clone)]
pub struct VehicleInputType {
    pub plate: String,
    pub chassis_number: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub series: Option<String>,
    pub year: Option<i32>,
    pub vehicle_type: Option<VehicleType>,
    pub fuel_type: Option<FuelType>,
    pub ownership: Option<OwnershipType>,
    pub supplier_id: Option<i64>,
    pub registration_date: Option<NaiveDate>,
    pub contract_start_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
    pub contract_duration: Option<i32>,
    pub contractual_km: Option<i32>,
    pub financial_fee: Option<Decimal>,
    pub assistance_fee: Option<Decimal>,
    pub annual_fringe_benefit: Option<Decimal>,
    pub monthly_fringe_benefit: Option<Decimal>,
    pub current_mileage: Option<i32>,
    pub telepass: Option<String>,
    pub insurance_expiry_date: Option<NaiveDate>,
    pub car_tax_expiry_date: Option<NaiveDate>,
}

impl VehicleInputType {
    /**
     * Normalizes and validates the vehicle input.
     *
     * # Returns
     * The normalized input or a validation error listing every invalid field.
     */
    pub fn validate(mut self) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        self.plate = normalize_plate(&self.plate);
        if self.plate.is_empty() {
            errors.push("plate: required".to_string());
        } else if !is_valid_plate(&self.plate) {
            errors.push(format!("plate: invalid plate {}", self.plate));
        }
        match self.year {
            None => errors.push("year: required".to_string()),
            Some(year) if !(MIN_VEHICLE_YEAR..=MAX_VEHICLE_YEAR).contains(&year) => errors.push(format!("year: must be between {MIN_VEHICLE_YEAR} and {MAX_VEHICLE_YEAR}")),
            Some(_) => {}
        }
        if self.current_mileage.is_some_and(|mileage| mileage < 0) {
            errors.push("currentMileage: cannot be negative".to_string());
        }
        if let (Some(start), Some(end)) = (self.contract_start_date, self.contract_end_date) {
            if end < start {
                errors.push("contractEndDate: must not be before contract start".to_string());
            }
        }
        ApplicationError::check_fields("Invalid vehicle", errors)?;
        self.chassis_number = trim_to_none(self.chassis_number).map(|chassis| chassis.to_uppercase());
        self.brand = trim_to_none(self.brand);
        self.model = trim_to_none(self.model);
        self.series = trim_to_none(self.series);
        self.telepass = trim_to_none(self.telepass);
        Ok(self)
    }

    /**
     * Total fee, the sum of financial and assistance fee with missing values counted as zero.
     */
    pub fn total_fee(&self) -> Decimal {
        self.financial_fee.unwrap_or(Decimal::ZERO) + self.assistance_fee.unwrap_or(Decimal::ZERO)
    }
}

/**
 * Filter for listing vehicles.
 */
#[derive(Debug, Clone, Default)]
pub struct VehicleListInputType {
    pub status: Option<VehicleStatus>,
    pub keyword: Option<String>,
}

/**
 * Number of vehicles per status.
 */
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStatusCountType {
    pub status: VehicleStatus,
    pub count: i64,
}

/***************** Assignments *********************/

/**
 * A vehicle assigned to an employment.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDetailType {
    pub id: i64,
    pub employment_id: i64,
    pub vehicle_id: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: AssignmentStatus,
    pub project_id: Option<i64>,
    pub note: Option<String>,
    pub vehicle_plate: String,
    pub matricola: String,
    pub employee_name: String,
}

/**
 * Input for adding or updating an assignment.
 */
#[derive(Debug, Clone)]
pub struct AssignmentInputType {
    pub employment_id: i64,
    pub vehicle_id: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: AssignmentStatus,
    pub project_id: Option<i64>,
    pub note: Option<String>,
}

impl AssignmentInputType {
    /**
     * Trims free text fields.
     */
    pub fn validate(mut self) -> Result<Self, ApplicationError> {
        self.note = trim_to_none(self.note);
        let mut errors = Vec::new();
        if self.note.as_ref().is_some_and(|note| note.chars().count() > 255) {
            errors.push("note: at most 255 characters".to_string());
        }
        ApplicationError::check_fields("Invalid assignment", errors)?;
        Ok(self)
    }
}

/**
 * Filter for listing assignments.
 */
#[derive(Debug, Clone, Default)]
pub struct AssignmentListInputType {
    pub status: Option<AssignmentStatus>,
    pub vehicle_id: Option<i64>,
    pub employment_id: Option<i64>,
}

/***************** Maintenance *********************/

/**
 * A maintenance intervention on a vehicle.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceDetailType {
    pub id: i64,
    pub vehicle_id: i64,
    pub supplier_id: Option<i64>,
    pub maintenance_date: Option<NaiveDate>,
    pub mileage: Option<i32>,
    pub cost: Option<Decimal>,
    pub description: Option<String>,
    pub task_type_id: Option<i64>,
    pub vehicle_plate: String,
    pub supplier_name: Option<String>,
    pub task_type_code: Option<String>,
}

/**
 * Input for adding or updating a maintenance record.
 */
#[derive(Debug, Clone)]
pub struct MaintenanceInputType {
    pub vehicle_id: i64,
    pub supplier_id: Option<i64>,
    pub maintenance_date: Option<NaiveDate>,
    pub mileage: Option<i32>,
    pub cost: Option<Decimal>,
    pub description: Option<String>,
    /**
     * Kind of task the maintenance carries out, closing the open task of that type.
     */
    pub task_type_id: Option<i64>,
}

impl MaintenanceInputType {
    pub fn validate(mut self) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        if self.mileage.is_some_and(|mileage| mileage < 0) {
            errors.push("mileage: cannot be negative".to_string());
        }
        if self.cost.is_some_and(|cost| cost.is_sign_negative()) {
            errors.push("cost: cannot be negative".to_string());
        }
        ApplicationError::check_fields("Invalid maintenance", errors)?;
        self.description = trim_to_none(self.description);
        Ok(self)
    }
}

/***************** Fuel cards *********************/

/**
 * A fuel card, linked to an employee and/or a vehicle.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FuelCardDetailType {
    pub id: i64,
    pub card_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub plafond: Option<Decimal>,
    pub active: bool,
    pub employee_name: Option<String>,
    pub vehicle_plate: Option<String>,
}

/**
 * Input for adding or updating a fuel card.
 */
#[derive(Debug, Clone)]
pub struct FuelCardInputType {
    pub card_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub plafond: Option<Decimal>,
}

impl FuelCardInputType {
    pub fn validate(mut self) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        self.card_number = self.card_number.trim().to_string();
        if self.card_number.is_empty() {
            errors.push("cardNumber: required".to_string());
        }
        if self.plafond.is_some_and(|plafond| plafond.is_sign_negative()) {
            errors.push("plafond: cannot be negative".to_string());
        }
        ApplicationError::check_fields("Invalid fuel card", errors)?;
        Ok(self)
    }
}

/**
 * A card is active when it has no expiry date or has not expired yet.
 */
pub fn is_card_active(expiry_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    expiry_date.is_none_or(|expiry| expiry >= today)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::apperror::ErrorType;

    fn vehicle_input() -> VehicleInputType {
        VehicleInputType {
            plate: " ab 123 cd ".to_string(),
            chassis_number: Some(" zfa31200000123456 ".to_string()),
            brand: Some("Fiat".to_string()),
            model: Some("Panda".to_string()),
            series: Some("  ".to_string()),
            year: Some(2021),
            vehicle_type: Some(VehicleType::Car),
            fuel_type: Some(FuelType::Petrol),
            ownership: Some(OwnershipType::Leased),
            supplier_id: None,
            registration_date: None,
            contract_start_date: None,
            contract_end_date: None,
            contract_duration: Some(36),
            contractual_km: Some(90000),
            financial_fee: Some(Decimal::new(25050, 2)),
            assistance_fee: None,
            annual_fringe_benefit: None,
            monthly_fringe_benefit: None,
            current_mileage: Some(100),
            telepass: None,
            insurance_expiry_date: None,
            car_tax_expiry_date: None,
        }
    }

    #[test]
    fn test_vehicle_validate_normalizes() {
        let input = vehicle_input().validate().unwrap();
        assert_eq!(input.plate, "AB123CD");
        assert_eq!(input.chassis_number, Some("ZFA31200000123456".to_string()));
        assert_eq!(input.series, None);
    }

    #[test]
    fn test_vehicle_validate_collects_errors() {
        let mut input = vehicle_input();
        input.plate = "ABC123".to_string();
        input.year = Some(1800);
        let error = input.validate().unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.errors.len(), 2);
    }

    #[test]
    fn test_vehicle_total_fee_counts_missing_as_zero() {
        let mut input = vehicle_input();
        assert_eq!(input.total_fee(), Decimal::new(25050, 2));
        input.assistance_fee = Some(Decimal::new(4950, 2));
        assert_eq!(input.total_fee(), Decimal::new(300, 0));
        input.financial_fee = None;
        input.assistance_fee = None;
        assert_eq!(input.total_fee(), Decimal::ZERO);
    }

    #[test]
    fn test_card_active() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert!(is_card_active(None, today));
        assert!(is_card_active(Some(today), today));
        assert!(!is_card_active(NaiveDate::from_ymd_opt(2024, 5, 9), today));
    }

    #[test]
    fn test_maintenance_negative_cost() {
        let input = MaintenanceInputType { vehicle_id: 1, supplier_id: None, maintenance_date: None, mileage: Some(10), cost: Some(Decimal::new(-1, 0)), description: None, task_type_id: None };
        assert!(input.validate().is_err());
    }
}
