use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::query_error,
    model::{apperror::ApplicationError, enums::VehicleStatus, fleet::VehicleStatusCountType},
};

/**
 * Database response type for the fleet counters: vehicles, in service, assigned vehicles and assignments.
 */
pub type QueryFleetCountsDbResp = (i64, i64, i64, i64);

/**
 * Database response type for the project counters: active projects and their total value.
 */
pub type QueryProjectCountsDbResp = (i64, Decimal);

/**
 * Database response type for a monthly sum: `YYYY-MM` month and total.
 */
pub type QueryMonthSumDbResp = (String, Decimal);

const QUERY_FLEET_COUNTS: &str = "SELECT
                                      (SELECT count(*) FROM vehicles),
                                      (SELECT count(*) FROM vehicles WHERE status = 'IN_SERVICE'),
                                      (SELECT count(DISTINCT vehicle_id) FROM assignments WHERE status = 'ASSIGNED'),
                                      (SELECT count(*) FROM assignments)";

const QUERY_PROJECT_COUNTS: &str = "SELECT count(*), COALESCE(SUM(value), 0) FROM projects WHERE status = 'ACTIVE'";

const QUERY_AVERAGE_MAINTENANCE_COST: &str = "SELECT COALESCE(AVG(cost), 0) FROM maintenance WHERE cost IS NOT NULL";

const QUERY_VEHICLE_STATUS_COUNTS: &str = "SELECT status, count(*) FROM vehicles GROUP BY status ORDER BY status";

const QUERY_MONTHLY_MAINTENANCE_COSTS: &str = "SELECT to_char(maintenance_date, 'YYYY-MM') AS month, COALESCE(SUM(cost), 0)
                                               FROM maintenance
                                               WHERE maintenance_date >= $1
                                               GROUP BY month";

const QUERY_MONTHLY_EXPENSE_TOTALS: &str = "SELECT to_char(creation_date, 'YYYY-MM') AS month, COALESCE(SUM(total), 0)
                                            FROM expense_reports
                                            WHERE creation_date >= $1
                                            GROUP BY month";

/**
 * DAO for dashboard aggregation queries.
 */
pub struct DashboardDao {}

impl DashboardDao {
    pub fn new() -> Self {
        DashboardDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_fleet_counts(&self, connection: &mut PgConnection) -> Result<QueryFleetCountsDbResp, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_FLEET_COUNTS).fetch_one(connection).instrument(span).await.map_err(|err| query_error("get fleet counts", &err))
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_project_counts(&self, connection: &mut PgConnection) -> Result<QueryProjectCountsDbResp, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_PROJECT_COUNTS).fetch_one(connection).instrument(span).await.map_err(|err| query_error("get project counts", &err))
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_average_maintenance_cost(&self, connection: &mut PgConnection) -> Result<Decimal, ApplicationError> {
        let span = tracing::Span::current();
        let average: (Decimal,) = sqlx::query_as(QUERY_AVERAGE_MAINTENANCE_COST)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get average maintenance cost", &err))?;
        Ok(average.0.round_dp(2))
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_vehicle_status_counts(&self, connection: &mut PgConnection) -> Result<Vec<VehicleStatusCountType>, ApplicationError> {
        let span = tracing::Span::current();
        let counts: Vec<(VehicleStatus, i64)> = sqlx::query_as(QUERY_VEHICLE_STATUS_COUNTS)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get vehicle status counts", &err))?;
        Ok(counts.into_iter().map(|(status, count)| VehicleStatusCountType { status, count }).collect())
    }

    /**
     * Sums maintenance costs per month from `from` onwards. Months without costs are absent.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_monthly_maintenance_costs(&self, connection: &mut PgConnection, from: NaiveDate) -> Result<Vec<QueryMonthSumDbResp>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_MONTHLY_MAINTENANCE_COSTS)
            .bind(from)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get monthly maintenance costs", &err))
    }

    /**
     * Sums expense report totals per creation month from `from` onwards.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_monthly_expense_totals(&self, connection: &mut PgConnection, from: NaiveDate) -> Result<Vec<QueryMonthSumDbResp>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_MONTHLY_EXPENSE_TOTALS)
            .bind(from)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get monthly expense totals", &err))
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

    #[sqlx::test]
    async fn test_fleet_counts() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dashboard_dao = DashboardDao::new();
        let before = dashboard_dao.get_fleet_counts(&mut transaction).await.unwrap();
        VehicleDao::new().add_vehicle(&mut transaction, vehicle_input("ZZ901ZZ")).await.unwrap();
        let after = dashboard_dao.get_fleet_counts(&mut transaction).await.unwrap();
        assert_eq!(after.0 - before.0, 1);
        assert_eq!(after.1 - before.1, 1);
        let counts = dashboard_dao.get_vehicle_status_counts(&mut transaction).await.unwrap();
        assert!(counts.iter().any(|count| count.status == VehicleStatus::InService && count.count >= 1));
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_aggregates() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let dashboard_dao = DashboardDao::new();
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(dashboard_dao.get_project_counts(&mut connection).await.is_ok());
        assert!(dashboard_dao.get_average_maintenance_cost(&mut connection).await.is_ok());
        assert!(dashboard_dao.get_monthly_maintenance_costs(&mut connection, from).await.is_ok());
        assert!(dashboard_dao.get_monthly_expense_totals(&mut connection, from).await.is_ok());
    }
}
