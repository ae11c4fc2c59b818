use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::model::{
    enums::{BookingStatus, TaskStatus},
    operations::{BookingInputType, BookingListInputType, RefuelInputType, RefuelListInputType, VehicleTaskInputType},
    personnel::EmployeeRoleInputType,
};

/***************** Tasks *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub vehicle_id: i64,
    pub task_type_id: i64,
    pub due_date: Option<NaiveDate>,
    pub due_mileage: Option<i32>,
}

impl From<TaskRequest> for VehicleTaskInputType {
    fn from(request: TaskRequest) -> Self {
        VehicleTaskInputType { vehicle_id: request.vehicle_id, task_type_id: request.task_type_id, due_date: request.due_date, due_mileage: request.due_mileage }
    }
}

/**
 * Query of the task list, all statuses when missing.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusQuery {
    pub status: Option<TaskStatus>,
}

/***************** Refuels *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefuelRequest {
    pub vehicle_id: i64,
    pub fuel_card_id: Option<i64>,
    pub refuel_date: Option<NaiveDate>,
    pub mileage: Option<i32>,
    pub quantity: Option<Decimal>,
    pub amount: Option<Decimal>,
}

impl From<RefuelRequest> for RefuelInputType {
    fn from(request: RefuelRequest) -> Self {
        RefuelInputType {
            vehicle_id: request.vehicle_id,
            fuel_card_id: request.fuel_card_id,
            refuel_date: request.refuel_date,
            mileage: request.mileage,
            quantity: request.quantity,
            amount: request.amount,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefuelListRequest {
    pub vehicle_id: Option<i64>,
    pub fuel_card_id: Option<i64>,
    pub year: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl From<RefuelListRequest> for RefuelListInputType {
    fn from(request: RefuelListRequest) -> Self {
        RefuelListInputType { vehicle_id: request.vehicle_id, fuel_card_id: request.fuel_card_id, year: request.year, from: request.from, to: request.to }
    }
}

/***************** Bookings *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub vehicle_id: i64,
    pub start_datetime: Option<NaiveDateTime>,
    pub end_datetime: Option<NaiveDateTime>,
    pub title: Option<String>,
    pub requester_name: Option<String>,
    pub requester_contact: Option<String>,
    pub notes: Option<String>,
    pub status: Option<BookingStatus>,
}

impl From<BookingRequest> for BookingInputType {
    fn from(request: BookingRequest) -> Self {
        BookingInputType {
            vehicle_id: request.vehicle_id,
            start_datetime: request.start_datetime,
            end_datetime: request.end_datetime,
            title: request.title,
            requester_name: request.requester_name,
            requester_contact: request.requester_contact,
            notes: request.notes,
            status: request.status,
        }
    }
}

/**
 * Days of the booking calendar, both included.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl BookingRangeQuery {
    pub fn into_input(self, vehicle_id: i64) -> BookingListInputType {
        BookingListInputType { vehicle_id, from: self.from, to: self.to }
    }
}

/***************** Roles *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub name: String,
}

impl From<RoleRequest> for EmployeeRoleInputType {
    fn from(request: RoleRequest) -> Self {
        EmployeeRoleInputType { name: request.name }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_booking_request_names() {
        let request: BookingRequest = serde_json::from_str(r#"{"vehicleId": 4, "startDatetime": "2024-06-03T08:30:00", "endDatetime": "2024-06-03T12:00:00", "requesterName": "Ufficio gare", "status": "CONFIRMED"}"#).unwrap();
        let input = BookingInputType::from(request);
        assert_eq!(input.start_datetime, NaiveDate::from_ymd_opt(2024, 6, 3).and_then(|date| date.and_hms_opt(8, 30, 0)));
        assert_eq!(input.requester_name.as_deref(), Some("Ufficio gare"));
        assert_eq!(input.status, Some(BookingStatus::Confirmed));
    }

    #[test]
    fn test_refuel_request_keeps_missing_mileage() {
        let request: RefuelRequest = serde_json::from_str(r#"{"vehicleId": 2, "refuelDate": "2024-06-01", "quantity": "42.5", "amount": "76.10"}"#).unwrap();
        let input = RefuelInputType::from(request);
        assert_eq!(input.mileage, None);
        assert_eq!(input.quantity, Some(Decimal::new(425, 1)));
    }

    #[test]
    fn test_task_status_query() {
        let query: TaskStatusQuery = serde_json::from_str(r#"{"status": "CLOSED"}"#).unwrap();
        assert_eq!(query.status, Some(TaskStatus::Closed));
        let range = BookingRangeQuery { from: NaiveDate::from_ymd_opt(2024, 6, 1), to: None }.into_input(7);
        assert_eq!(range.vehicle_id, 7);
    }
}
