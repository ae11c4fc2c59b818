use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{compliance::ComplianceDao, contracts::ContractDao, correspondence::CorrespondenceDao, dashboard::DashboardDao, documents::DocumentDao, expenses::ExpenseDao, insurances::InsuranceDao},
    model::{
        apperror::ApplicationError,
        dashboard::{DASHBOARD_MONTHS, DASHBOARD_TOP_ITEMS, DashboardType},
        enums::{CorrespondenceType, ExpenseStatus},
        models::{PaginationInput, fill_month_series, first_day_months_back},
        personnel::ExpenseReportListInputType,
    },
    service::{
        common::{acquire, connection_pool, expiry_window, today},
        correspondence::last_protocol_text,
    },
};

/**
 * Service aggregating the figures of the home page.
 */
pub struct DashboardService {
    dashboard_dao: DashboardDao,
    contract_dao: ContractDao,
    correspondence_dao: CorrespondenceDao,
    compliance_dao: ComplianceDao,
    insurance_dao: InsuranceDao,
    expense_dao: ExpenseDao,
    document_dao: DocumentDao,
    expiry_warning_days: i64,
    connection_pool: Option<Pool<Postgres>>,
}

impl DashboardService {
    pub fn new(expiry_warning_days: i64, connection_pool: Option<Pool<Postgres>>) -> Self {
        DashboardService {
            dashboard_dao: DashboardDao::new(),
            contract_dao: ContractDao::new(),
            correspondence_dao: CorrespondenceDao::new(),
            compliance_dao: ComplianceDao::new(),
            insurance_dao: InsuranceDao::new(),
            expense_dao: ExpenseDao::new(),
            document_dao: DocumentDao::new(),
            expiry_warning_days,
            connection_pool,
        }
    }

    /**
     * Collects every dashboard figure on one connection.
     *
     * # Returns
     * Counters, the monthly series of the last months, and the most urgent items.
     */
    #[instrument(skip(self))]
    pub async fn get_dashboard(&self) -> Result<DashboardType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.get_dashboard_in(&mut connection).await
    }

    async fn get_dashboard_in(&self, connection: &mut PgConnection) -> Result<DashboardType, ApplicationError> {
        let today = today();
        let (vehicle_count, in_service_vehicle_count, assigned_vehicle_count, assignment_count) = self.dashboard_dao.get_fleet_counts(connection).await?;
        let (active_project_count, active_project_value) = self.dashboard_dao.get_project_counts(connection).await?;
        let contract_statistics = self.contract_dao.get_contract_statistics(connection, today).await?;
        let last_incoming = self.correspondence_dao.get_last_protocol(connection, CorrespondenceType::E).await?;
        let last_outgoing = self.correspondence_dao.get_last_protocol(connection, CorrespondenceType::U).await?;
        let series_start = first_day_months_back(today, DASHBOARD_MONTHS - 1);
        let maintenance_costs = self.dashboard_dao.get_monthly_maintenance_costs(connection, series_start).await?;
        let expense_totals = self.dashboard_dao.get_monthly_expense_totals(connection, series_start).await?;
        let (from, to) = expiry_window(today, self.expiry_warning_days)?;
        let upcoming_compliance_items = self.compliance_dao.get_upcoming_compliance_items(connection, from, to, DASHBOARD_TOP_ITEMS).await?;
        let expiring_policies = self.insurance_dao.get_expiring_insurances(connection, from, to).await?;
        let pending_filter = ExpenseReportListInputType { status: Some(ExpenseStatus::Submitted), ..ExpenseReportListInputType::default() };
        let pending_expense_reports = self.expense_dao.get_expense_report_list(connection, PaginationInput::new(Some(0), Some(DASHBOARD_TOP_ITEMS)), pending_filter).await?;
        let warning_days = i32::try_from(self.expiry_warning_days).unwrap_or(i32::MAX);
        Ok(DashboardType {
            vehicle_count,
            in_service_vehicle_count,
            assigned_vehicle_count,
            assignment_count,
            last_incoming_protocol: last_protocol_text(last_incoming),
            last_outgoing_protocol: last_protocol_text(last_outgoing),
            active_project_count,
            active_project_value,
            active_contract_count: contract_statistics.active,
            contract_statistics,
            average_maintenance_cost: self.dashboard_dao.get_average_maintenance_cost(connection).await?.round_dp(2),
            vehicle_status_counts: self.dashboard_dao.get_vehicle_status_counts(connection).await?,
            monthly_maintenance_costs: fill_month_series(today, DASHBOARD_MONTHS, &maintenance_costs),
            monthly_expense_totals: fill_month_series(today, DASHBOARD_MONTHS, &expense_totals),
            upcoming_compliance_items,
            expiring_policies,
            pending_expense_reports: pending_expense_reports.elements,
            document_statistics: self.document_dao.get_document_statistics(connection, today, warning_days).await?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::apperror::ErrorType;

    #[actix_web::test]
    async fn test_dashboard_without_database() {
        let service = DashboardService::new(30, None);
        assert_eq!(service.get_dashboard().await.unwrap_err().error_type, ErrorType::DatabaseError);
    }
}
