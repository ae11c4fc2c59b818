use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use sqlx::{PgConnection, Pool, Postgres};
use tracing::{debug, instrument};

use crate::{
    dao::{assignments::AssignmentDao, bookings::BookingDao, vehicles::VehicleDao},
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{ListOutputType, PaginationInput},
        operations::{BookingCountType, BookingDetailType, BookingInputType, BookingListInputType, booking_errors},
    },
    service::common::{acquire, begin, connection_pool, finish, now},
};

/**
 * Bounds of the booking counters.
 *
 * # Arguments
 * `now`: Current date and time.
 * `days`: Length of the upcoming window, not negative.
 *
 * # Returns
 * Start and end of the current day, and the end of the upcoming window.
 */
pub fn count_window(now: NaiveDateTime, days: i64) -> Result<(NaiveDateTime, NaiveDateTime, NaiveDateTime), ApplicationError> {
    let invalid = || ApplicationError::new(ErrorType::Validation, format!("Invalid number of days {days}"));
    if days < 0 {
        return Err(invalid());
    }
    let day_start = now.date().and_time(NaiveTime::MIN);
    let day_end = now.date().succ_opt().ok_or_else(invalid)?.and_time(NaiveTime::MIN);
    let upcoming_until = TimeDelta::try_days(days).and_then(|delta| now.checked_add_signed(delta)).ok_or_else(invalid)?;
    Ok((day_start, day_end, upcoming_until))
}

/**
 * Service for vehicle bookings. A booking needs a vehicle in service that is neither assigned
 * nor booked by someone else in the same slot.
 */
pub struct BookingService {
    booking_dao: BookingDao,
    vehicle_dao: VehicleDao,
    assignment_dao: AssignmentDao,
    connection_pool: Option<Pool<Postgres>>,
}

impl BookingService {
    pub fn new(connection_pool: Option<Pool<Postgres>>) -> Self {
        BookingService { booking_dao: BookingDao::new(), vehicle_dao: VehicleDao::new(), assignment_dao: AssignmentDao::new(), connection_pool }
    }

    pub async fn get_booking(&self, booking_id: i64) -> Result<BookingDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.booking_dao.get_booking(&mut connection, booking_id).await
    }

    /**
     * Lists the bookings of a vehicle touching the days from `from` to `to`, both included.
     */
    pub async fn get_booking_list(&self, pagination_input: PaginationInput, filter: BookingListInputType) -> Result<ListOutputType<BookingDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.vehicle_dao.get_vehicle(&mut connection, filter.vehicle_id).await?;
        let from = filter.from.map(|from| from.and_time(NaiveTime::MIN));
        let until = filter.to.and_then(|to| to.succ_opt()).map(|to| to.and_time(NaiveTime::MIN));
        self.booking_dao.get_booking_list(&mut connection, pagination_input, filter.vehicle_id, from, until).await
    }

    /**
     * Counts the bookings running now, touching today and starting within `days`.
     */
    pub async fn count_bookings(&self, days: i64) -> Result<BookingCountType, ApplicationError> {
        let now = now();
        let (day_start, day_end, upcoming_until) = count_window(now, days)?;
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.booking_dao.count_bookings(&mut connection, now, day_start, day_end, upcoming_until).await
    }

    #[instrument(skip(self, booking_input), fields(vehicle_id = booking_input.vehicle_id))]
    pub async fn add_booking(&self, booking_input: BookingInputType) -> Result<BookingDetailType, ApplicationError> {
        let booking_input = booking_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_booking_in(&mut transaction, None, booking_input).await;
        finish(transaction, result).await
    }

    /**
     * Moves or edits a booking. The booking keeps its vehicle.
     */
    #[instrument(skip(self, booking_input))]
    pub async fn update_booking(&self, booking_id: i64, booking_input: BookingInputType) -> Result<BookingDetailType, ApplicationError> {
        let booking_input = booking_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.update_booking_in(&mut transaction, booking_id, booking_input).await;
        finish(transaction, result).await
    }

    async fn update_booking_in(&self, transaction: &mut PgConnection, booking_id: i64, booking_input: BookingInputType) -> Result<BookingDetailType, ApplicationError> {
        let booking = self.booking_dao.get_booking(transaction, booking_id).await?;
        let booking_input = BookingInputType { vehicle_id: booking.vehicle_id, ..booking_input };
        self.save_booking_in(transaction, Some(booking_id), booking_input).await
    }

    async fn save_booking_in(&self, transaction: &mut PgConnection, booking_id: Option<i64>, booking_input: BookingInputType) -> Result<BookingDetailType, ApplicationError> {
        let (Some(start), Some(end)) = (booking_input.start_datetime, booking_input.end_datetime) else {
            return Err(ApplicationError::new(ErrorType::Validation, "Invalid booking".to_string()));
        };
        let vehicle = self.vehicle_dao.get_vehicle(transaction, booking_input.vehicle_id).await?;
        let assignments = self.assignment_dao.get_active_periods_for_vehicle(transaction, vehicle.id).await?;
        let bookings = self.booking_dao.get_other_booking_periods(transaction, vehicle.id, booking_id).await?;
        let errors = booking_errors(vehicle.status, start, end, &assignments, &bookings);
        if !errors.is_empty() {
            return Err(ApplicationError::business_rule("Invalid booking".to_string(), errors));
        }
        let booking_id = match booking_id {
            Some(booking_id) => {
                self.booking_dao.update_booking(transaction, booking_id, booking_input).await?;
                booking_id
            }
            None => self.booking_dao.add_booking(transaction, booking_input).await?,
        };
        debug!("Saved booking {booking_id} of vehicle {}", vehicle.id);
        self.booking_dao.get_booking(transaction, booking_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_booking(&self, booking_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.booking_dao.delete_booking(&mut transaction, booking_id).await;
        finish(transaction, result).await
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
    use crate::model::enums::{BookingStatus, VehicleStatus};
    use chrono::NaiveDate;

    fn time(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    fn booking_input(vehicle_id: i64, day: u32, start_hour: u32, end_hour: u32) -> BookingInputType {
        BookingInputType {
            vehicle_id,
            start_datetime: Some(time(day, start_hour)),
            end_datetime: Some(time(day, end_hour)),
            title: Some("Consegna materiali".to_string()),
            requester_name: Some("Magazzino".to_string()),
            requester_contact: None,
            notes: None,
            status: None,
        }
    }

    #[sqlx::test]
    async fn test_bookings_cannot_overlap() {
        let pool = init_db().await;
        let service = BookingService::new(Some(pool.clone()));
        let mut transaction = pool.begin().await.unwrap();
        let vehicle_dao = VehicleDao::new();
        let vehicle_id = vehicle_dao.add_vehicle(&mut transaction, vehicle_input("ZZ981ZZ")).await.unwrap();
        let first = service.save_booking_in(&mut transaction, None, booking_input(vehicle_id, 1, 9, 12)).await.unwrap();
        assert_eq!(first.status, BookingStatus::Planned);
        let error = service.save_booking_in(&mut transaction, None, booking_input(vehicle_id, 1, 11, 13)).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::BusinessRule);
        assert_eq!(error.errors, vec!["Conflicts with another booking from 01/07/2024 09:00 to 01/07/2024 12:00".to_string()]);
        service.save_booking_in(&mut transaction, None, booking_input(vehicle_id, 1, 12, 13)).await.unwrap();
        let moved = service.update_booking_in(&mut transaction, first.id, booking_input(-1, 1, 8, 11)).await.unwrap();
        assert_eq!(moved.vehicle_id, vehicle_id);
        assert_eq!(moved.start_datetime, time(1, 8));
        vehicle_dao.update_vehicle_status(&mut transaction, vehicle_id, VehicleStatus::UnderMaintenance).await.unwrap();
        let error = service.save_booking_in(&mut transaction, None, booking_input(vehicle_id, 2, 9, 10)).await.unwrap_err();
        assert_eq!(error.errors, vec!["Vehicle is not in service".to_string()]);
        transaction.rollback().await.unwrap();
    }
}
