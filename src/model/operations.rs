use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{
    apperror::ApplicationError,
    enums::{BookingStatus, MileageSource, TaskStatus, VehicleStatus},
    validation::trim_to_none,
};

pub const ORDINARY_SERVICE: &str = "ORDINARY_SERVICE";
pub const REVISION: &str = "REVISION";
pub const TYRE_CHANGE_SUMMER: &str = "TYRE_CHANGE_SUMMER";
pub const TYRE_CHANGE_WINTER: &str = "TYRE_CHANGE_WINTER";

/**
 * First revision of a vehicle, in months after its reference date.
 */
const FIRST_REVISION_MONTHS: i32 = 48;
const DEFAULT_SERVICE_MONTHS: i32 = 12;
const DEFAULT_SERVICE_KM: i32 = 20000;

/**
 * Highest plausible refuel in litres.
 */
pub const MAX_REFUEL_QUANTITY: i64 = 200;

/***************** Tasks *********************/

/**
 * A kind of recurring vehicle deadline.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskTypeDetailType {
    pub id: i64,
    pub code: String,
    pub description: String,
    pub by_date: bool,
    pub by_mileage: bool,
    pub months_interval: Option<i32>,
    pub km_interval: Option<i32>,
    /**
     * Auto types get an open task on every vehicle.
     */
    pub auto: bool,
}

/**
 * A deadline of a vehicle, due by date and/or mileage.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VehicleTaskDetailType {
    pub id: i64,
    pub vehicle_id: i64,
    pub task_type_id: i64,
    pub due_date: Option<NaiveDate>,
    pub due_mileage: Option<i32>,
    pub status: TaskStatus,
    pub executed: bool,
    pub task_type_code: String,
    pub task_type_description: String,
    pub vehicle_plate: String,
}

#[derive(Debug, Clone)]
pub struct VehicleTaskInputType {
    pub vehicle_id: i64,
    pub task_type_id: i64,
    pub due_date: Option<NaiveDate>,
    pub due_mileage: Option<i32>,
}

impl VehicleTaskInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        if self.due_mileage.is_some_and(|mileage| mileage < 0) {
            errors.push("dueMileage: cannot be negative".to_string());
        }
        ApplicationError::check_fields("Invalid task", errors)?;
        Ok(self)
    }
}

/**
 * When a task falls due.
 */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueData {
    pub due_date: Option<NaiveDate>,
    pub due_mileage: Option<i32>,
}

/**
 * Date the first deadlines of a vehicle are counted from: contract start, else registration, else today.
 */
pub fn task_reference_date(contract_start_date: Option<NaiveDate>, registration_date: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
    contract_start_date.or(registration_date).unwrap_or(today)
}

/**
 * Computes the first due date and mileage of a task.
 *
 * # Arguments
 * `task_type`: The task type.
 * `reference_date`: See `task_reference_date`.
 * `base_mileage`: Current mileage of the vehicle, intervals start from zero when unknown.
 */
pub fn initial_due(task_type: &TaskTypeDetailType, reference_date: NaiveDate, base_mileage: Option<i32>) -> DueData {
    match task_type.code.as_str() {
        REVISION => DueData { due_date: plus_months(reference_date, FIRST_REVISION_MONTHS), due_mileage: None },
        ORDINARY_SERVICE => DueData {
            due_date: plus_months(reference_date, task_type.months_interval.unwrap_or(DEFAULT_SERVICE_MONTHS)),
            due_mileage: mileage_after(base_mileage.or(Some(0)), Some(task_type.km_interval.unwrap_or(DEFAULT_SERVICE_KM))),
        },
        TYRE_CHANGE_SUMMER => DueData { due_date: next_yearly_date(reference_date, 4, 15), due_mileage: None },
        TYRE_CHANGE_WINTER => DueData { due_date: next_yearly_date(reference_date, 11, 15), due_mileage: None },
        _ => DueData {
            due_date: task_type.months_interval.and_then(|months| plus_months(reference_date, months)),
            due_mileage: mileage_after(base_mileage.or(Some(0)), task_type.km_interval),
        },
    }
}

/**
 * Computes the deadline that follows a maintenance of the task's type.
 *
 * # Arguments
 * `task_type`: The task type.
 * `maintenance_date`: Date of the maintenance.
 * `maintenance_mileage`: Mileage recorded by the maintenance.
 * `today`: Stands in for a missing maintenance date on tyre changes and revisions.
 */
pub fn next_due_after_maintenance(task_type: &TaskTypeDetailType, maintenance_date: Option<NaiveDate>, maintenance_mileage: Option<i32>, today: NaiveDate) -> DueData {
    match task_type.code.as_str() {
        TYRE_CHANGE_SUMMER => DueData { due_date: NaiveDate::from_ymd_opt(maintenance_date.unwrap_or(today).year() + 1, 4, 15), due_mileage: None },
        TYRE_CHANGE_WINTER => DueData { due_date: NaiveDate::from_ymd_opt(maintenance_date.unwrap_or(today).year() + 1, 11, 15), due_mileage: None },
        REVISION => DueData { due_date: task_type.months_interval.and_then(|months| plus_months(maintenance_date.unwrap_or(today), months)), due_mileage: None },
        _ => DueData {
            due_date: maintenance_date.zip(task_type.months_interval).and_then(|(date, months)| plus_months(date, months)),
            due_mileage: mileage_after(maintenance_mileage, task_type.km_interval),
        },
    }
}

fn plus_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    u32::try_from(months).ok().and_then(|months| date.checked_add_months(Months::new(months)))
}

fn mileage_after(mileage: Option<i32>, interval: Option<i32>) -> Option<i32> {
    mileage.zip(interval).map(|(mileage, interval)| mileage.saturating_add(interval))
}

/**
 * First `month`/`day` strictly after `reference_date`.
 */
fn next_yearly_date(reference_date: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let candidate = NaiveDate::from_ymd_opt(reference_date.year(), month, day)?;
    if candidate > reference_date { Some(candidate) } else { NaiveDate::from_ymd_opt(reference_date.year() + 1, month, day) }
}

/***************** Refuels *********************/

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RefuelDetailType {
    pub id: i64,
    pub vehicle_id: i64,
    pub fuel_card_id: Option<i64>,
    pub refuel_date: NaiveDate,
    pub mileage: i32,
    pub quantity: Decimal,
    pub amount: Decimal,
    pub vehicle_plate: String,
    pub card_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RefuelInputType {
    pub vehicle_id: i64,
    pub fuel_card_id: Option<i64>,
    pub refuel_date: Option<NaiveDate>,
    /**
     * Missing or zero takes the last known reading.
     */
    pub mileage: Option<i32>,
    pub quantity: Option<Decimal>,
    pub amount: Option<Decimal>,
}

impl RefuelInputType {
    /**
     * Checks the fields that need no database lookup.
     */
    pub fn validate(self, today: NaiveDate) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        match self.refuel_date {
            None => errors.push("refuelDate: required".to_string()),
            Some(refuel_date) if refuel_date > today => errors.push("refuelDate: cannot be in the future".to_string()),
            Some(_) => {}
        }
        if self.mileage.is_some_and(|mileage| mileage < 0) {
            errors.push("mileage: cannot be negative".to_string());
        }
        match self.quantity {
            None => errors.push("quantity: required".to_string()),
            Some(quantity) if quantity <= Decimal::ZERO => errors.push("quantity: must be positive".to_string()),
            Some(quantity) if quantity > Decimal::from(MAX_REFUEL_QUANTITY) => errors.push(format!("quantity: at most {MAX_REFUEL_QUANTITY} litres")),
            Some(_) => {}
        }
        match self.amount {
            None => errors.push("amount: required".to_string()),
            Some(amount) if amount.is_sign_negative() => errors.push("amount: cannot be negative".to_string()),
            Some(_) => {}
        }
        ApplicationError::check_fields("Invalid refuel", errors)?;
        Ok(self)
    }
}

/**
 * Resolves the mileage of a refuel against the last reading before its date.
 *
 * # Returns
 * The given mileage, or the last reading when the mileage is missing or zero. A mileage not above
 * the last reading is a business rule error.
 */
pub fn resolve_refuel_mileage(mileage: Option<i32>, last_mileage: Option<i32>) -> Result<i32, ApplicationError> {
    match (mileage, last_mileage) {
        (None | Some(0), last_mileage) => Ok(last_mileage.unwrap_or(0)),
        (Some(mileage), Some(last_mileage)) if mileage <= last_mileage => {
            Err(ApplicationError::business_rule("Invalid refuel".to_string(), vec![format!("Mileage must be higher than the last reading of {last_mileage} km")]))
        }
        (Some(mileage), _) => Ok(mileage),
    }
}

#[derive(Debug, Clone, Default)]
pub struct RefuelListInputType {
    pub vehicle_id: Option<i64>,
    pub fuel_card_id: Option<i64>,
    pub year: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/***************** Mileage *********************/

/**
 * One mileage reading of a vehicle.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MileageDetailType {
    pub id: i64,
    pub vehicle_id: i64,
    pub mileage: i32,
    pub mileage_date: NaiveDate,
    pub source: MileageSource,
    pub source_id: i64,
}

/**
 * A reading may not be lower than the one before its date.
 */
pub fn check_mileage_reading(previous_mileage: Option<i32>, mileage: i32) -> Result<(), ApplicationError> {
    match previous_mileage {
        Some(previous_mileage) if mileage < previous_mileage => {
            Err(ApplicationError::business_rule("Invalid mileage".to_string(), vec![format!("Mileage cannot be lower than the previous reading of {previous_mileage} km")]))
        }
        _ => Ok(()),
    }
}

/***************** Bookings *********************/

pub const MAX_BOOKING_TITLE_LENGTH: usize = 120;
pub const MAX_REQUESTER_NAME_LENGTH: usize = 120;
pub const MAX_REQUESTER_CONTACT_LENGTH: usize = 255;
pub const MAX_BOOKING_NOTES_LENGTH: usize = 1000;

const BOOKING_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/**
 * Window of the upcoming booking counter when none is requested.
 */
pub const DEFAULT_UPCOMING_BOOKING_DAYS: i64 = 7;

/**
 * A reservation of a vehicle for a time slot.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetailType {
    pub id: i64,
    pub vehicle_id: i64,
    pub start_datetime: NaiveDateTime,
    pub end_datetime: NaiveDateTime,
    pub title: Option<String>,
    pub requester_name: Option<String>,
    pub requester_contact: Option<String>,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub vehicle_plate: String,
}

#[derive(Debug, Clone)]
pub struct BookingInputType {
    pub vehicle_id: i64,
    pub start_datetime: Option<NaiveDateTime>,
    pub end_datetime: Option<NaiveDateTime>,
    pub title: Option<String>,
    pub requester_name: Option<String>,
    pub requester_contact: Option<String>,
    pub notes: Option<String>,
    /**
     * New bookings default to planned, updates keep the current status.
     */
    pub status: Option<BookingStatus>,
}

impl BookingInputType {
    pub fn validate(mut self) -> Result<Self, ApplicationError> {
        self.title = trim_to_none(self.title);
        self.requester_name = trim_to_none(self.requester_name);
        self.requester_contact = trim_to_none(self.requester_contact);
        self.notes = trim_to_none(self.notes);
        let mut errors = Vec::new();
        match (self.start_datetime, self.end_datetime) {
            (None, _) | (_, None) => {
                if self.start_datetime.is_none() {
                    errors.push("startDatetime: required".to_string());
                }
                if self.end_datetime.is_none() {
                    errors.push("endDatetime: required".to_string());
                }
            }
            (Some(start), Some(end)) if end <= start => errors.push("endDatetime: must be after the start".to_string()),
            _ => {}
        }
        for (name, value, max_length) in [
            ("title", &self.title, MAX_BOOKING_TITLE_LENGTH),
            ("requesterName", &self.requester_name, MAX_REQUESTER_NAME_LENGTH),
            ("requesterContact", &self.requester_contact, MAX_REQUESTER_CONTACT_LENGTH),
            ("notes", &self.notes, MAX_BOOKING_NOTES_LENGTH),
        ] {
            if value.as_ref().is_some_and(|value| value.chars().count() > max_length) {
                errors.push(format!("{name}: at most {max_length} characters"));
            }
        }
        ApplicationError::check_fields("Invalid booking", errors)?;
        Ok(self)
    }
}

/**
 * Half-open time slots overlap when each starts before the other ends.
 */
pub fn periods_overlap(start1: NaiveDateTime, end1: NaiveDateTime, start2: NaiveDateTime, end2: NaiveDateTime) -> bool {
    start1 < end2 && end1 > start2
}

/**
 * Time slot covered by an assignment: whole days, open-ended assignments never end.
 */
pub fn assignment_period(start_date: NaiveDate, end_date: Option<NaiveDate>) -> (NaiveDateTime, NaiveDateTime) {
    let end = end_date.and_then(|end_date| end_date.succ_opt()).unwrap_or(NaiveDate::MAX);
    (start_date.and_time(NaiveTime::MIN), end.and_time(NaiveTime::MIN))
}

/**
 * Collects the reasons a vehicle cannot be booked for a slot.
 *
 * # Arguments
 * `vehicle_status`: Current status of the vehicle.
 * `start`, `end`: The requested slot.
 * `assignments`: Start and end dates of the vehicle's active assignments.
 * `bookings`: Slots of the vehicle's other bookings that are not cancelled.
 */
pub fn booking_errors(vehicle_status: VehicleStatus, start: NaiveDateTime, end: NaiveDateTime, assignments: &[(NaiveDate, Option<NaiveDate>)], bookings: &[(NaiveDateTime, NaiveDateTime)]) -> Vec<String> {
    let mut errors = Vec::new();
    if vehicle_status != VehicleStatus::InService {
        errors.push("Vehicle is not in service".to_string());
    }
    let assigned = assignments.iter().map(|(start_date, end_date)| assignment_period(*start_date, *end_date)).find(|(assignment_start, assignment_end)| periods_overlap(start, end, *assignment_start, *assignment_end));
    if let Some((assignment_start, assignment_end)) = assigned {
        if assignment_end.date() == NaiveDate::MAX {
            errors.push(format!("Vehicle is assigned from {}", assignment_start.format(BOOKING_TIME_FORMAT)));
        } else {
            errors.push(format!("Vehicle is assigned from {} to {}", assignment_start.format(BOOKING_TIME_FORMAT), assignment_end.format(BOOKING_TIME_FORMAT)));
        }
    }
    if let Some((booking_start, booking_end)) = bookings.iter().find(|(booking_start, booking_end)| periods_overlap(start, end, *booking_start, *booking_end)) {
        errors.push(format!("Conflicts with another booking from {} to {}", booking_start.format(BOOKING_TIME_FORMAT), booking_end.format(BOOKING_TIME_FORMAT)));
    }
    errors
}

#[derive(Debug, Clone)]
pub struct BookingListInputType {
    pub vehicle_id: i64,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/**
 * Booking counters for the calendar header.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCountType {
    /**
     * Not cancelled and not yet ended.
     */
    pub active: i64,
    pub today: i64,
    /**
     * Starting within the requested number of days.
     */
    pub upcoming: i64,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::apperror::ErrorType;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn time(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
        date(year, month, day).and_hms_opt(hour, 0, 0).unwrap()
    }

    fn task_type(code: &str, months_interval: Option<i32>, km_interval: Option<i32>) -> TaskTypeDetailType {
        TaskTypeDetailType { id: 1, code: code.to_string(), description: code.to_string(), by_date: true, by_mileage: km_interval.is_some(), months_interval, km_interval, auto: true }
    }

    #[test]
    fn test_reference_date() {
        let today = date(2024, 6, 1);
        assert_eq!(task_reference_date(Some(date(2023, 1, 1)), Some(date(2022, 1, 1)), today), date(2023, 1, 1));
        assert_eq!(task_reference_date(None, Some(date(2022, 1, 1)), today), date(2022, 1, 1));
        assert_eq!(task_reference_date(None, None, today), today);
    }

    #[test]
    fn test_initial_due() {
        let reference = date(2024, 5, 10);
        let revision = initial_due(&task_type(REVISION, Some(24), None), reference, Some(1000));
        assert_eq!(revision, DueData { due_date: Some(date(2028, 5, 10)), due_mileage: None });
        let service = initial_due(&task_type(ORDINARY_SERVICE, None, None), reference, Some(1000));
        assert_eq!(service, DueData { due_date: Some(date(2025, 5, 10)), due_mileage: Some(21000) });
        let service = initial_due(&task_type(ORDINARY_SERVICE, Some(6), Some(15000)), reference, None);
        assert_eq!(service, DueData { due_date: Some(date(2024, 11, 10)), due_mileage: Some(15000) });
        let other = initial_due(&task_type("CUSTOM", None, Some(5000)), reference, Some(100));
        assert_eq!(other, DueData { due_date: None, due_mileage: Some(5100) });
    }

    #[test]
    fn test_initial_due_tyre_changes() {
        let summer = task_type(TYRE_CHANGE_SUMMER, Some(6), None);
        let winter = task_type(TYRE_CHANGE_WINTER, Some(6), None);
        assert_eq!(initial_due(&summer, date(2024, 3, 1), None).due_date, Some(date(2024, 4, 15)));
        assert_eq!(initial_due(&summer, date(2024, 4, 15), None).due_date, Some(date(2025, 4, 15)));
        assert_eq!(initial_due(&winter, date(2024, 5, 10), None).due_date, Some(date(2024, 11, 15)));
        assert_eq!(initial_due(&winter, date(2024, 12, 1), None).due_date, Some(date(2025, 11, 15)));
    }

    #[test]
    fn test_next_due_after_maintenance() {
        let today = date(2024, 6, 1);
        let service = task_type(ORDINARY_SERVICE, Some(12), Some(20000));
        assert_eq!(next_due_after_maintenance(&service, Some(date(2024, 2, 29)), Some(30000), today), DueData { due_date: Some(date(2025, 2, 28)), due_mileage: Some(50000) });
        assert_eq!(next_due_after_maintenance(&service, None, None, today), DueData::default());
        let summer = task_type(TYRE_CHANGE_SUMMER, Some(6), None);
        assert_eq!(next_due_after_maintenance(&summer, Some(date(2024, 4, 20)), None, today).due_date, Some(date(2025, 4, 15)));
        let winter = task_type(TYRE_CHANGE_WINTER, Some(6), None);
        assert_eq!(next_due_after_maintenance(&winter, None, None, today).due_date, Some(date(2025, 11, 15)));
        let revision = task_type(REVISION, Some(24), None);
        assert_eq!(next_due_after_maintenance(&revision, None, Some(1), today), DueData { due_date: Some(date(2026, 6, 1)), due_mileage: None });
    }

    #[test]
    fn test_refuel_validate() {
        let today = date(2024, 6, 1);
        let refuel = RefuelInputType { vehicle_id: 1, fuel_card_id: None, refuel_date: Some(today), mileage: None, quantity: Some(Decimal::new(4550, 2)), amount: Some(Decimal::new(8000, 2)) };
        assert!(refuel.clone().validate(today).is_ok());
        let future = RefuelInputType { refuel_date: Some(date(2024, 6, 2)), quantity: Some(Decimal::from(201)), ..refuel.clone() };
        let error = future.validate(today).unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.errors.len(), 2);
        let missing = RefuelInputType { refuel_date: None, quantity: None, amount: None, ..refuel };
        assert_eq!(missing.validate(today).unwrap_err().errors.len(), 3);
    }

    #[test]
    fn test_resolve_refuel_mileage() {
        assert_eq!(resolve_refuel_mileage(None, Some(12000)).unwrap(), 12000);
        assert_eq!(resolve_refuel_mileage(Some(0), Some(12000)).unwrap(), 12000);
        assert_eq!(resolve_refuel_mileage(None, None).unwrap(), 0);
        assert_eq!(resolve_refuel_mileage(Some(12500), Some(12000)).unwrap(), 12500);
        assert_eq!(resolve_refuel_mileage(Some(500), None).unwrap(), 500);
        let error = resolve_refuel_mileage(Some(12000), Some(12000)).unwrap_err();
        assert_eq!(error.error_type, ErrorType::BusinessRule);
    }

    #[test]
    fn test_check_mileage_reading() {
        assert!(check_mileage_reading(None, 0).is_ok());
        assert!(check_mileage_reading(Some(100), 100).is_ok());
        assert_eq!(check_mileage_reading(Some(100), 99).unwrap_err().error_type, ErrorType::BusinessRule);
    }

    #[test]
    fn test_booking_validate() {
        let booking = BookingInputType {
            vehicle_id: 1,
            start_datetime: Some(time(2024, 6, 1, 9)),
            end_datetime: Some(time(2024, 6, 1, 9)),
            title: Some("  ".to_string()),
            requester_name: None,
            requester_contact: None,
            notes: Some("x".repeat(MAX_BOOKING_NOTES_LENGTH + 1)),
            status: None,
        };
        let error = booking.clone().validate().unwrap_err();
        assert_eq!(error.errors, vec!["endDatetime: must be after the start".to_string(), format!("notes: at most {MAX_BOOKING_NOTES_LENGTH} characters")]);
        let missing = BookingInputType { start_datetime: None, end_datetime: None, notes: None, ..booking.clone() };
        assert_eq!(missing.validate().unwrap_err().errors.len(), 2);
        let valid = BookingInputType { end_datetime: Some(time(2024, 6, 1, 12)), notes: None, ..booking }.validate().unwrap();
        assert_eq!(valid.title, None);
    }

    #[test]
    fn test_periods_overlap() {
        assert!(periods_overlap(time(2024, 6, 1, 9), time(2024, 6, 1, 12), time(2024, 6, 1, 11), time(2024, 6, 1, 14)));
        assert!(!periods_overlap(time(2024, 6, 1, 9), time(2024, 6, 1, 12), time(2024, 6, 1, 12), time(2024, 6, 1, 14)));
        assert!(periods_overlap(time(2024, 6, 1, 9), time(2024, 6, 1, 18), time(2024, 6, 1, 10), time(2024, 6, 1, 11)));
    }

    #[test]
    fn test_assignment_period() {
        let (start, end) = assignment_period(date(2024, 6, 1), Some(date(2024, 6, 3)));
        assert_eq!(start, time(2024, 6, 1, 0));
        assert_eq!(end, time(2024, 6, 4, 0));
        assert_eq!(assignment_period(date(2024, 6, 1), None).1.date(), NaiveDate::MAX);
    }

    #[test]
    fn test_booking_errors() {
        let start = time(2024, 6, 10, 9);
        let end = time(2024, 6, 10, 12);
        assert!(booking_errors(VehicleStatus::InService, start, end, &[(date(2024, 6, 1), Some(date(2024, 6, 9)))], &[(time(2024, 6, 10, 12), time(2024, 6, 10, 13))]).is_empty());
        let errors = booking_errors(VehicleStatus::Assigned, start, end, &[(date(2024, 6, 1), None)], &[(time(2024, 6, 10, 11), time(2024, 6, 10, 13))]);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[1], "Vehicle is assigned from 01/06/2024 00:00");
        assert_eq!(errors[2], "Conflicts with another booking from 10/06/2024 11:00 to 10/06/2024 13:00");
    }
}
