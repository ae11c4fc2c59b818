use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    enums::{CcnlType, ContractType, EducationLevel, EmploymentStatus, ExpenseStatus, Gender, MaritalStatus, PaymentMethod},
    models::FullAddress,
    personnel::{EmployeeInputType, EmployeeListInputType, EmploymentInputType, EmploymentListInputType, ExpenseItemInputType, ExpenseReportInputType, ExpenseReportListInputType},
};

/***************** Employees *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRequest {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub gender: Option<Gender>,
    pub fiscal_code: String,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub iban: Option<String>,
    pub email: String,
    pub pec: Option<String>,
    pub marital_status: Option<MaritalStatus>,
    pub education_level: Option<EducationLevel>,
    #[serde(default)]
    pub residence_address: FullAddress,
}

impl From<EmployeeRequest> for EmployeeInputType {
    fn from(request: EmployeeRequest) -> Self {
        EmployeeInputType {
            first_name: request.first_name,
            last_name: request.last_name,
            birth_date: request.birth_date,
            birth_place: request.birth_place,
            gender: request.gender,
            fiscal_code: request.fiscal_code,
            phone: request.phone,
            mobile: request.mobile,
            iban: request.iban,
            email: request.email,
            pec: request.pec,
            marital_status: request.marital_status,
            education_level: request.education_level,
            residence_address: request.residence_address,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeListRequest {
    pub keyword: Option<String>,
}

impl From<EmployeeListRequest> for EmployeeListInputType {
    fn from(request: EmployeeListRequest) -> Self {
        EmployeeListInputType { keyword: request.keyword }
    }
}

/***************** Employments *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentRequest {
    pub employee_id: i64,
    pub matricola: String,
    pub contract_type: Option<ContractType>,
    pub branch: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub contract_level: Option<String>,
    pub ccnl: Option<CcnlType>,
    pub job_role: Option<String>,
    pub salary: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub job_description: Option<String>,
    /**
     * Defaults to `ACTIVE`.
     */
    pub status: Option<EmploymentStatus>,
}

impl From<EmploymentRequest> for EmploymentInputType {
    fn from(request: EmploymentRequest) -> Self {
        EmploymentInputType {
            employee_id: request.employee_id,
            matricola: request.matricola,
            contract_type: request.contract_type,
            branch: request.branch,
            department: request.department,
            job_title: request.job_title,
            contract_level: request.contract_level,
            ccnl: request.ccnl,
            job_role: request.job_role,
            salary: request.salary,
            start_date: request.start_date,
            end_date: request.end_date,
            job_description: request.job_description,
            status: request.status.unwrap_or(EmploymentStatus::Active),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentListRequest {
    pub keyword: Option<String>,
    pub status: Option<EmploymentStatus>,
}

impl From<EmploymentListRequest> for EmploymentListInputType {
    fn from(request: EmploymentListRequest) -> Self {
        EmploymentListInputType { keyword: request.keyword, status: request.status }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminationRequest {
    pub end_date: NaiveDate,
}

/***************** Expense reports *********************/

/**
 * One row of the expense item table as entered by the user. Every value may be blank.
 */
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItemRow {
    /**
     * Id of the item when it already exists.
     */
    pub id: Option<i64>,
    pub expense_date: Option<String>,
    pub description: Option<String>,
    pub amount: Option<String>,
    pub invoice_number: Option<String>,
    pub supplier_id: Option<i64>,
    pub project_id: Option<i64>,
    pub note: Option<String>,
}

impl ExpenseItemRow {
    fn is_blank(&self) -> bool {
        [&self.expense_date, &self.description, &self.amount, &self.invoice_number, &self.note].iter().all(|value| is_blank(value)) && self.supplier_id.is_none() && self.project_id.is_none()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|value| value.trim().is_empty())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

/**
 * Builds expense items from the submitted rows.
 *
 * Fully blank rows are skipped. Amounts accept `,` as decimal separator.
 *
 * # Arguments
 * `rows`: The submitted rows.
 *
 * # Returns
 * The items, or a validation error naming every unreadable value. At least one item is required.
 */
pub fn build_items(rows: Vec<ExpenseItemRow>) -> Result<Vec<ExpenseItemInputType>, ApplicationError> {
    let mut errors = Vec::new();
    let mut items = Vec::new();
    for (index, row) in rows.into_iter().enumerate().filter(|(_, row)| !row.is_blank()) {
        let amount = match non_blank(row.amount) {
            Some(amount) => match Decimal::from_str(&amount.replace(',', ".")) {
                Ok(amount) => Some(amount),
                Err(_) => {
                    errors.push(format!("items[{index}].amount: invalid amount {amount}"));
                    None
                }
            },
            None => None,
        };
        let expense_date = match non_blank(row.expense_date) {
            Some(date) => match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.push(format!("items[{index}].expenseDate: invalid date {date}"));
                    None
                }
            },
            None => None,
        };
        items.push(ExpenseItemInputType {
            id: row.id,
            expense_date,
            description: row.description.unwrap_or_default().trim().to_string(),
            amount,
            invoice_number: non_blank(row.invoice_number),
            supplier_id: row.supplier_id,
            project_id: row.project_id,
            note: non_blank(row.note),
        });
    }
    if errors.is_empty() && items.is_empty() {
        errors.push("items: add at least one expense item".to_string());
    }
    if !errors.is_empty() {
        return Err(ApplicationError::with_errors(ErrorType::Validation, "Invalid expense items".to_string(), errors));
    }
    Ok(items)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseReportRequest {
    pub report_number: Option<String>,
    pub employee_id: i64,
    pub purpose: Option<String>,
    pub creation_date: Option<NaiveDate>,
    pub submit_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reimbursable_total: Option<Decimal>,
    pub project_id: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub status: Option<ExpenseStatus>,
    #[serde(default)]
    pub items: Vec<ExpenseItemRow>,
}

impl TryFrom<ExpenseReportRequest> for ExpenseReportInputType {
    type Error = ApplicationError;

    fn try_from(request: ExpenseReportRequest) -> Result<Self, Self::Error> {
        Ok(ExpenseReportInputType {
            items: build_items(request.items)?,
            report_number: request.report_number,
            employee_id: request.employee_id,
            purpose: request.purpose,
            creation_date: request.creation_date,
            submit_date: request.submit_date,
            start_date: request.start_date,
            end_date: request.end_date,
            reimbursable_total: request.reimbursable_total,
            project_id: request.project_id,
            payment_method: request.payment_method,
            status: request.status,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseReportListRequest {
    /**
     * Part of the employee's name.
     */
    pub employee: Option<String>,
    pub status: Option<ExpenseStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<ExpenseReportListRequest> for ExpenseReportListInputType {
    fn from(request: ExpenseReportListRequest) -> Self {
        ExpenseReportListInputType { employee: request.employee, status: request.status, start_date: request.start_date, end_date: request.end_date }
    }
}

/**
 * Prefix of the next report number, e.g. `004/2024/`.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextReportNumberResponse {
    pub report_number_base: String,
}

/***************** Payslips *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayslipListRequest {
    /**
     * Reference month `YYYY-MM`.
     */
    pub month: String,
}

#[cfg(test)]
mod test {
    use super::*;

    fn row(description: &str, amount: &str) -> ExpenseItemRow {
        ExpenseItemRow { description: Some(description.to_string()), amount: Some(amount.to_string()), ..ExpenseItemRow::default() }
    }

    #[test]
    fn test_build_items_skips_blank_rows() {
        let rows = vec![row("Taxi", "12,50"), ExpenseItemRow::default(), row(" ", " "), row("Hotel", "80")];
        let items = build_items(rows).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].amount, Some(Decimal::new(1250, 2)));
        assert_eq!(items[1].description, "Hotel");
    }

    #[test]
    fn test_build_items_requires_one_item() {
        let error = build_items(vec![ExpenseItemRow::default()]).unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.errors, vec!["items: add at least one expense item".to_string()]);
    }

    #[test]
    fn test_build_items_reports_invalid_values() {
        let mut invalid_date = row("Pranzo", "10");
        invalid_date.expense_date = Some("31/01/2024".to_string());
        let error = build_items(vec![row("Taxi", "dodici"), invalid_date]).unwrap_err();
        assert_eq!(error.errors.len(), 2);
        assert!(error.errors[0].starts_with("items[0].amount"));
        assert!(error.errors[1].starts_with("items[1].expenseDate"));
    }

    #[test]
    fn test_build_items_keeps_row_with_supplier_only() {
        let rows = vec![ExpenseItemRow { supplier_id: Some(3), ..ExpenseItemRow::default() }];
        let items = build_items(rows).unwrap();
        assert_eq!(items[0].supplier_id, Some(3));
        assert_eq!(items[0].amount, None);
    }

    #[test]
    fn test_build_items_keeps_item_ids() {
        let rows = vec![ExpenseItemRow { id: Some(12), ..row("Taxi", "9") }, row("Hotel", "80"), ExpenseItemRow { id: Some(13), ..ExpenseItemRow::default() }];
        let items = build_items(rows).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, Some(12));
        assert_eq!(items[1].id, None);
    }

    #[test]
    fn test_employment_status_defaults_to_active() {
        let request: EmploymentRequest = serde_json::from_str(r#"{"employeeId": 1, "matricola": "A001"}"#).unwrap();
        assert_eq!(EmploymentInputType::from(request).status, EmploymentStatus::Active);
    }
}
