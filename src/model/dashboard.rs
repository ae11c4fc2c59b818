use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{
    documents::DocumentStatisticsType,
    fleet::VehicleStatusCountType,
    models::MonthAmount,
    personnel::ExpenseReportDetailType,
    registry::{ComplianceItemDetailType, ContractStatisticsType, InsuranceDetailType},
};

/**
 * Number of months in the dashboard cost series.
 */
pub const DASHBOARD_MONTHS: u32 = 12;

/**
 * Number of upcoming compliance items and pending reports shown.
 */
pub const DASHBOARD_TOP_ITEMS: i64 = 5;

/**
 * Protocol text shown when no correspondence of a type exists.
 */
pub const NO_PROTOCOL: &str = "--";

/**
 * Aggregated figures shown on the back office home page.
 */
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardType {
    pub vehicle_count: i64,
    pub in_service_vehicle_count: i64,
    pub assigned_vehicle_count: i64,
    pub assignment_count: i64,
    pub last_incoming_protocol: String,
    pub last_outgoing_protocol: String,
    pub active_project_count: i64,
    pub active_project_value: Decimal,
    pub active_contract_count: i64,
    pub contract_statistics: ContractStatisticsType,
    pub average_maintenance_cost: Decimal,
    pub vehicle_status_counts: Vec<VehicleStatusCountType>,
    pub monthly_maintenance_costs: Vec<MonthAmount>,
    pub monthly_expense_totals: Vec<MonthAmount>,
    pub upcoming_compliance_items: Vec<ComplianceItemDetailType>,
    pub expiring_policies: Vec<InsuranceDetailType>,
    pub pending_expense_reports: Vec<ExpenseReportDetailType>,
    pub document_statistics: DocumentStatisticsType,
}
