use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::model::{
    enums::{AssignmentStatus, FuelType, OwnershipType, VehicleStatus, VehicleType},
    fleet::{AssignmentInputType, AssignmentListInputType, FuelCardInputType, MaintenanceInputType, VehicleInputType, VehicleListInputType},
};

/***************** Vehicles *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRequest {
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

impl From<VehicleRequest> for VehicleInputType {
    fn from(request: VehicleRequest) -> Self {
        VehicleInputType {
            plate: request.plate,
            chassis_number: request.chassis_number,
            brand: request.brand,
            model: request.model,
            series: request.series,
            year: request.year,
            vehicle_type: request.vehicle_type,
            fuel_type: request.fuel_type,
            ownership: request.ownership,
            supplier_id: request.supplier_id,
            registration_date: request.registration_date,
            contract_start_date: request.contract_start_date,
            contract_end_date: request.contract_end_date,
            contract_duration: request.contract_duration,
            contractual_km: request.contractual_km,
            financial_fee: request.financial_fee,
            assistance_fee: request.assistance_fee,
            annual_fringe_benefit: request.annual_fringe_benefit,
            monthly_fringe_benefit: request.monthly_fringe_benefit,
            current_mileage: request.current_mileage,
            telepass: request.telepass,
            insurance_expiry_date: request.insurance_expiry_date,
            car_tax_expiry_date: request.car_tax_expiry_date,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleListRequest {
    pub status: Option<VehicleStatus>,
    pub keyword: Option<String>,
}

impl From<VehicleListRequest> for VehicleListInputType {
    fn from(request: VehicleListRequest) -> Self {
        VehicleListInputType { status: request.status, keyword: request.keyword }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MileageRequest {
    pub mileage: i32,
}

/***************** Assignments *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    pub employment_id: i64,
    pub vehicle_id: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /**
     * Defaults to `ASSIGNED`.
     */
    pub status: Option<AssignmentStatus>,
    pub project_id: Option<i64>,
    pub note: Option<String>,
}

impl From<AssignmentRequest> for AssignmentInputType {
    fn from(request: AssignmentRequest) -> Self {
        AssignmentInputType {
            employment_id: request.employment_id,
            vehicle_id: request.vehicle_id,
            start_date: request.start_date,
            end_date: request.end_date,
            status: request.status.unwrap_or(AssignmentStatus::Assigned),
            project_id: request.project_id,
            note: request.note,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentListRequest {
    pub status: Option<AssignmentStatus>,
    pub vehicle_id: Option<i64>,
    pub employment_id: Option<i64>,
}

impl From<AssignmentListRequest> for AssignmentListInputType {
    fn from(request: AssignmentListRequest) -> Self {
        AssignmentListInputType { status: request.status, vehicle_id: request.vehicle_id, employment_id: request.employment_id }
    }
}

/***************** Maintenance *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRequest {
    pub vehicle_id: i64,
    pub supplier_id: Option<i64>,
    pub maintenance_date: Option<NaiveDate>,
    pub mileage: Option<i32>,
    pub cost: Option<Decimal>,
    pub description: Option<String>,
    pub task_type_id: Option<i64>,
}

impl From<MaintenanceRequest> for MaintenanceInputType {
    fn from(request: MaintenanceRequest) -> Self {
        MaintenanceInputType {
            vehicle_id: request.vehicle_id,
            supplier_id: request.supplier_id,
            maintenance_date: request.maintenance_date,
            mileage: request.mileage,
            cost: request.cost,
            description: request.description,
            task_type_id: request.task_type_id,
        }
    }
}

/***************** Fuel cards *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelCardRequest {
    pub card_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub plafond: Option<Decimal>,
}

impl From<FuelCardRequest> for FuelCardInputType {
    fn from(request: FuelCardRequest) -> Self {
        FuelCardInputType {
            card_number: request.card_number,
            expiry_date: request.expiry_date,
            supplier_id: request.supplier_id,
            employee_id: request.employee_id,
            vehicle_id: request.vehicle_id,
            plafond: request.plafond,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelCardListRequest {
    /**
     * Only active, or only inactive, cards. Both when missing.
     */
    pub active: Option<bool>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_assignment_status_defaults_to_assigned() {
        let request: AssignmentRequest = serde_json::from_str(r#"{"employmentId": 1, "vehicleId": 2, "startDate": "2024-03-01"}"#).unwrap();
        let input = AssignmentInputType::from(request);
        assert_eq!(input.status, AssignmentStatus::Assigned);
        assert_eq!(input.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_vehicle_request_names() {
        let request: VehicleRequest = serde_json::from_str(r#"{"plate": "AB123CD", "vehicleType": "CAR", "fuelType": "DIESEL", "financialFee": "120.50"}"#).unwrap();
        let input = VehicleInputType::from(request);
        assert_eq!(input.vehicle_type, Some(VehicleType::Car));
        assert_eq!(input.financial_fee, Some(Decimal::new(12050, 2)));
    }
}
