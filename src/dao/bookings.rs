use chrono::NaiveDateTime;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        enums::BookingStatus,
        models::{ListOutputType, PaginationInput},
        operations::{BookingCountType, BookingDetailType, BookingInputType},
    },
};

const QUERY_BOOKING: &str = "SELECT b.id, b.vehicle_id, b.start_datetime, b.end_datetime, b.title, b.requester_name, b.requester_contact, b.notes, b.status, b.created_at, v.plate AS vehicle_plate
                             FROM vehicle_bookings b
                             JOIN vehicles v ON v.id = b.vehicle_id
                             WHERE b.id = $1";

/**
 * SQL query to list the bookings of a vehicle touching a time range, by start.
 */
const QUERY_BOOKING_LIST: &str = "SELECT b.id, b.vehicle_id, b.start_datetime, b.end_datetime, b.title, b.requester_name, b.requester_contact, b.notes, b.status, b.created_at, v.plate AS vehicle_plate
                                  FROM vehicle_bookings b
                                  JOIN vehicles v ON v.id = b.vehicle_id
                                  WHERE b.vehicle_id = $1 AND
                                        ($2::timestamp IS NULL OR b.end_datetime >= $2) AND
                                        ($3::timestamp IS NULL OR b.start_datetime < $3)
                                  ORDER BY b.start_datetime, b.id
                                  LIMIT $4 OFFSET $5";

const QUERY_OTHER_BOOKING_PERIODS: &str = "SELECT start_datetime, end_datetime FROM vehicle_bookings
                                           WHERE vehicle_id = $1 AND status <> 'CANCELLED' AND ($2::bigint IS NULL OR id <> $2)
                                           ORDER BY start_datetime";

/**
 * SQL query counting bookings that are not cancelled: still running, touching a day, starting within a window.
 */
const COUNT_BOOKINGS: &str = "SELECT COUNT(*) FILTER (WHERE end_datetime >= $1),
                                     COUNT(*) FILTER (WHERE start_datetime < $3 AND end_datetime >= $2),
                                     COUNT(*) FILTER (WHERE start_datetime BETWEEN $1 AND $4)
                              FROM vehicle_bookings
                              WHERE status <> 'CANCELLED'";

const ADD_BOOKING: &str = "INSERT INTO vehicle_bookings (vehicle_id, start_datetime, end_datetime, title, requester_name, requester_contact, notes, status, created_at)
                           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
                           RETURNING id";

const UPDATE_BOOKING: &str = "UPDATE vehicle_bookings SET start_datetime = $1, end_datetime = $2, title = $3, requester_name = $4, requester_contact = $5, notes = $6, status = COALESCE($7, status)
                              WHERE id = $8";

const DELETE_BOOKING: &str = "DELETE FROM vehicle_bookings WHERE id = $1";

/**
 * DAO for vehicle bookings.
 */
pub struct BookingDao {}

impl BookingDao {
    pub fn new() -> Self {
        BookingDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_booking(&self, connection: &mut PgConnection, booking_id: i64) -> Result<BookingDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let booking: Option<BookingDetailType> = sqlx::query_as(QUERY_BOOKING)
            .bind(booking_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get booking", &err))?;
        found(booking, "Booking", booking_id)
    }

    /**
     * Retrieves a page of the bookings of a vehicle.
     *
     * # Arguments
     * `connection`: The database connection.
     * `pagination_input`: Pagination information.
     * `vehicle_id`: The vehicle.
     * `from`: Bookings ending before this are skipped.
     * `until`: Bookings starting at or after this are skipped.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_booking_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, vehicle_id: i64, from: Option<NaiveDateTime>, until: Option<NaiveDateTime>) -> Result<ListOutputType<BookingDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<BookingDetailType> = sqlx::query_as(QUERY_BOOKING_LIST)
            .bind(vehicle_id)
            .bind(from)
            .bind(until)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get booking list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    /**
     * Time slots of the bookings of a vehicle that are not cancelled, except `excluded_id`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_other_booking_periods(&self, connection: &mut PgConnection, vehicle_id: i64, excluded_id: Option<i64>) -> Result<Vec<(NaiveDateTime, NaiveDateTime)>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_OTHER_BOOKING_PERIODS)
            .bind(vehicle_id)
            .bind(excluded_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get booking periods", &err))
    }

    /**
     * Counts bookings that are not cancelled.
     *
     * # Arguments
     * `now`: Active bookings end at or after this, upcoming ones start at or after it.
     * `day_start`, `day_end`: The day counted in `today`.
     * `upcoming_until`: End of the upcoming window.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn count_bookings(&self, connection: &mut PgConnection, now: NaiveDateTime, day_start: NaiveDateTime, day_end: NaiveDateTime, upcoming_until: NaiveDateTime) -> Result<BookingCountType, ApplicationError> {
        let span = tracing::Span::current();
        let counts: (i64, i64, i64) = sqlx::query_as(COUNT_BOOKINGS)
            .bind(now)
            .bind(day_start)
            .bind(day_end)
            .bind(upcoming_until)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("count bookings", &err))?;
        Ok(BookingCountType { active: counts.0, today: counts.1, upcoming: counts.2 })
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_booking(&self, transaction: &mut PgConnection, booking_input: BookingInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_BOOKING)
            .bind(booking_input.vehicle_id)
            .bind(booking_input.start_datetime)
            .bind(booking_input.end_datetime)
            .bind(booking_input.title)
            .bind(booking_input.requester_name)
            .bind(booking_input.requester_contact)
            .bind(booking_input.notes)
            .bind(booking_input.status.unwrap_or(BookingStatus::Planned))
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    /**
     * Updates the slot and details of a booking. The vehicle never changes, a missing status keeps the current one.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_booking(&self, transaction: &mut PgConnection, booking_id: i64, booking_input: BookingInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_BOOKING)
            .bind(booking_input.start_datetime)
            .bind(booking_input.end_datetime)
            .bind(booking_input.title)
            .bind(booking_input.requester_name)
            .bind(booking_input.requester_contact)
            .bind(booking_input.notes)
            .bind(booking_input.status)
            .bind(booking_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Booking", booking_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_booking(&self, transaction: &mut PgConnection, booking_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_BOOKING)
            .bind(booking_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Booking", booking_id, "deleted")
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
    use crate::model::apperror::ErrorType;
    use chrono::NaiveDate;

    fn time(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    fn booking_input(vehicle_id: i64, day: u32, status: Option<BookingStatus>) -> BookingInputType {
        BookingInputType {
            vehicle_id,
            start_datetime: Some(time(day, 9)),
            end_datetime: Some(time(day, 12)),
            title: Some("Sopralluogo".to_string()),
            requester_name: Some("Ufficio tecnico".to_string()),
            requester_contact: None,
            notes: None,
            status,
        }
    }

    #[sqlx::test]
    async fn test_add_list_then_delete_booking() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let booking_dao = BookingDao::new();
        let vehicle_id = VehicleDao::new().add_vehicle(&mut transaction, vehicle_input("ZZ986ZZ")).await.unwrap();
        let first_id = booking_dao.add_booking(&mut transaction, booking_input(vehicle_id, 2, None)).await.unwrap();
        let cancelled_id = booking_dao.add_booking(&mut transaction, booking_input(vehicle_id, 3, Some(BookingStatus::Cancelled))).await.unwrap();
        assert_eq!(booking_dao.get_booking(&mut transaction, first_id).await.unwrap().status, BookingStatus::Planned);
        let periods = booking_dao.get_other_booking_periods(&mut transaction, vehicle_id, None).await.unwrap();
        assert_eq!(periods, vec![(time(2, 9), time(2, 12))]);
        assert!(booking_dao.get_other_booking_periods(&mut transaction, vehicle_id, Some(first_id)).await.unwrap().is_empty());
        let list = booking_dao.get_booking_list(&mut transaction, PaginationInput { start_index: 0, page_size: 10 }, vehicle_id, Some(time(3, 0)), Some(time(4, 0))).await.unwrap();
        assert_eq!(list.elements.len(), 1);
        assert_eq!(list.elements[0].id, cancelled_id);
        booking_dao.update_booking(&mut transaction, first_id, booking_input(vehicle_id, 2, None)).await.unwrap();
        assert_eq!(booking_dao.get_booking(&mut transaction, first_id).await.unwrap().status, BookingStatus::Planned);
        booking_dao.delete_booking(&mut transaction, cancelled_id).await.unwrap();
        let error = booking_dao.delete_booking(&mut transaction, cancelled_id).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
        transaction.rollback().await.unwrap();
    }
}
