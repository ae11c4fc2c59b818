use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{
    apperror::ApplicationError,
    enums::{CcnlType, ContractType, EducationLevel, EmploymentStatus, ExpenseStatus, Gender, MaritalStatus, PaymentMethod, PayslipStatus},
    models::FullAddress,
    validation::{MINIMUM_EMPLOYEE_AGE, age_at, is_valid_email, is_valid_fiscal_code, is_valid_iban, is_valid_matricola, is_valid_phone, trim_to_none},
};

/**
 * Longest accepted matricola.
 */
pub const MAX_MATRICOLA_LENGTH: usize = 10;

/***************** Employees *********************/

/**
 * An employee's personal record.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDetailType {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
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
    #[sqlx(flatten)]
    pub residence_address: FullAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/**
 * Input for adding or updating an employee.
 */
#[derive(Debug, Clone)]
pub struct EmployeeInputType {
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
    pub residence_address: FullAddress,
}

impl EmployeeInputType {
    /**
     * Normalizes and validates the employee input.
     *
     * # Arguments
     * `today`: The date birth dates and ages are checked against.
     *
     * # Returns
     * The normalized input or a validation error listing every invalid field.
     */
    pub fn validate(mut self, today: NaiveDate) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.fiscal_code = self.fiscal_code.trim().to_uppercase();
        self.email = self.email.trim().to_lowercase();
        self.phone = trim_to_none(self.phone);
        self.mobile = trim_to_none(self.mobile);
        self.iban = trim_to_none(self.iban).map(|iban| iban.replace(' ', "").to_uppercase());
        self.pec = trim_to_none(self.pec);
        self.birth_place = trim_to_none(self.birth_place);

        check_name_length("firstName", &self.first_name, &mut errors);
        check_name_length("lastName", &self.last_name, &mut errors);
        match self.birth_date {
            None => errors.push("birthDate: required".to_string()),
            Some(birth_date) if birth_date >= today => errors.push("birthDate: must be in the past".to_string()),
            Some(birth_date) if age_at(birth_date, today) < MINIMUM_EMPLOYEE_AGE => errors.push(format!("birthDate: employee must be at least {MINIMUM_EMPLOYEE_AGE} years old")),
            Some(_) => {}
        }
        if self.fiscal_code.is_empty() {
            errors.push("fiscalCode: required".to_string());
        } else if !is_valid_fiscal_code(&self.fiscal_code) {
            errors.push("fiscalCode: invalid fiscal code".to_string());
        }
        if self.email.is_empty() {
            errors.push("email: required".to_string());
        } else if !is_valid_email(&self.email) {
            errors.push("email: invalid email".to_string());
        }
        if !self.phone.as_deref().is_none_or(is_valid_phone) {
            errors.push("phone: invalid phone number".to_string());
        }
        if !self.mobile.as_deref().is_none_or(is_valid_phone) {
            errors.push("mobile: invalid phone number".to_string());
        }
        if !self.iban.as_deref().is_none_or(is_valid_iban) {
            errors.push("iban: invalid IBAN".to_string());
        }
        if let Some(error) = self.residence_address.postal_code_error() {
            errors.push(error);
        }
        ApplicationError::check_fields("Invalid employee", errors)?;
        Ok(self)
    }
}

fn check_name_length(field: &str, value: &str, errors: &mut Vec<String>) {
    let length = value.chars().count();
    if length == 0 {
        errors.push(format!("{field}: required"));
    } else if !(2..=50).contains(&length) {
        errors.push(format!("{field}: must be between 2 and 50 characters"));
    }
}

/**
 * Filter for listing employees.
 */
#[derive(Debug, Clone, Default)]
pub struct EmployeeListInputType {
    pub keyword: Option<String>,
}

/***************** Employments *********************/

/**
 * An employment of an employee.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentDetailType {
    pub id: i64,
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
    pub status: EmploymentStatus,
    pub employee_first_name: String,
    pub employee_last_name: String,
}

/**
 * Input for adding or updating an employment.
 */
#[derive(Debug, Clone)]
pub struct EmploymentInputType {
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
    pub status: EmploymentStatus,
}

impl EmploymentInputType {
    /**
     * Validates the employment and applies the termination rule.
     *
     * # Arguments
     * `today`: An end date before this date terminates the employment.
     */
    pub fn validate(mut self, today: NaiveDate) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        self.matricola = self.matricola.trim().to_uppercase();
        if self.matricola.is_empty() {
            errors.push("matricola: required".to_string());
        } else if self.matricola.chars().count() > MAX_MATRICOLA_LENGTH {
            errors.push(format!("matricola: at most {MAX_MATRICOLA_LENGTH} characters"));
        } else if !is_valid_matricola(&self.matricola) {
            errors.push("matricola: only letters, digits, underscores and dashes".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                errors.push("endDate: must not be before start date".to_string());
            }
        }
        if self.salary.is_some_and(|salary| salary.is_sign_negative()) {
            errors.push("salary: cannot be negative".to_string());
        }
        ApplicationError::check_fields("Invalid employment", errors)?;
        self.branch = trim_to_none(self.branch);
        self.department = trim_to_none(self.department);
        self.job_title = trim_to_none(self.job_title);
        self.contract_level = trim_to_none(self.contract_level);
        self.job_role = trim_to_none(self.job_role);
        self.job_description = trim_to_none(self.job_description);
        self.status = effective_employment_status(self.status, self.end_date, today);
        Ok(self)
    }
}

/**
 * An employment whose end date has passed is terminated, whatever status was requested.
 */
pub fn effective_employment_status(requested: EmploymentStatus, end_date: Option<NaiveDate>, today: NaiveDate) -> EmploymentStatus {
    match end_date {
        Some(end_date) if end_date < today => EmploymentStatus::Terminated,
        _ => requested,
    }
}

/**
 * Filter for listing employments.
 */
#[derive(Debug, Clone, Default)]
pub struct EmploymentListInputType {
    pub keyword: Option<String>,
    pub status: Option<EmploymentStatus>,
}

/***************** Expense reports *********************/

/**
 * An expense report of an employee.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseReportDetailType {
    pub id: i64,
    pub report_number: String,
    pub employee_id: i64,
    pub purpose: Option<String>,
    pub creation_date: NaiveDate,
    pub submit_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub final_approval_date: Option<NaiveDate>,
    pub total: Decimal,
    pub reimbursable_total: Decimal,
    pub non_reimbursable_total: Decimal,
    pub project_id: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub status: ExpenseStatus,
    pub employee_name: String,
}

/**
 * A single expense of a report.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItemDetailType {
    pub id: i64,
    pub report_id: i64,
    pub expense_date: Option<NaiveDate>,
    pub description: String,
    pub amount: Option<Decimal>,
    pub invoice_number: Option<String>,
    pub supplier_id: Option<i64>,
    pub project_id: Option<i64>,
    pub note: Option<String>,
}

/**
 * An expense report together with its items.
 */
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseReportWithItemsType {
    pub report: ExpenseReportDetailType,
    pub items: Vec<ExpenseItemDetailType>,
}

/**
 * Input for one expense item.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseItemInputType {
    /**
     * Id of an existing item of the report, `None` for a new item.
     */
    pub id: Option<i64>,
    pub expense_date: Option<NaiveDate>,
    pub description: String,
    pub amount: Option<Decimal>,
    pub invoice_number: Option<String>,
    pub supplier_id: Option<i64>,
    pub project_id: Option<i64>,
    pub note: Option<String>,
}

/**
 * Input for adding or updating an expense report.
 */
#[derive(Debug, Clone)]
pub struct ExpenseReportInputType {
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
    pub items: Vec<ExpenseItemInputType>,
}

impl ExpenseReportInputType {
    pub fn validate(mut self) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        if self.items.is_empty() {
            errors.push("items: add at least one expense item".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                errors.push("endDate: must not be before start date".to_string());
            }
        }
        if self.reimbursable_total.is_some_and(|amount| amount.is_sign_negative()) {
            errors.push("reimbursableTotal: cannot be negative".to_string());
        }
        if self.items.iter().any(|item| item.amount.is_some_and(|amount| amount.is_sign_negative())) {
            errors.push("items: amounts cannot be negative".to_string());
        }
        let mut item_ids: Vec<i64> = self.items.iter().filter_map(|item| item.id).collect();
        item_ids.sort_unstable();
        if item_ids.windows(2).any(|pair| pair[0] == pair[1]) {
            errors.push("items: an item appears more than once".to_string());
        }
        ApplicationError::check_fields("Invalid expense report", errors)?;
        self.purpose = trim_to_none(self.purpose);
        self.report_number = trim_to_none(self.report_number);
        Ok(self)
    }
}

/**
 * Totals of an expense report.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseTotals {
    pub total: Decimal,
    pub reimbursable: Decimal,
    pub non_reimbursable: Decimal,
}

impl ExpenseTotals {
    /**
     * Computes the totals: the sum of item amounts, the reimbursable part (missing counts as zero)
     * and the remaining non-reimbursable part.
     */
    pub fn compute(items: &[ExpenseItemInputType], reimbursable: Option<Decimal>) -> Self {
        let total: Decimal = items.iter().filter_map(|item| item.amount).sum();
        let reimbursable = reimbursable.unwrap_or(Decimal::ZERO);
        ExpenseTotals { total, reimbursable, non_reimbursable: total - reimbursable }
    }
}

/**
 * Filter for listing expense reports.
 */
#[derive(Debug, Clone, Default)]
pub struct ExpenseReportListInputType {
    pub employee: Option<String>,
    pub status: Option<ExpenseStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/***************** Payslips *********************/

/**
 * A monthly payslip file.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PayslipDetailType {
    pub id: i64,
    pub employee_id: Option<i64>,
    pub fiscal_code: String,
    pub reference_month: NaiveDate,
    pub storage_path: String,
    pub original_filename: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub status: PayslipStatus,
    pub employee_name: Option<String>,
}

/**
 * Payslip to be stored.
 */
#[derive(Debug, Clone)]
pub struct PayslipAddInputType {
    pub employee_id: Option<i64>,
    pub fiscal_code: String,
    pub reference_month: NaiveDate,
    pub storage_path: String,
    pub original_filename: String,
    pub status: PayslipStatus,
}

/**
 * Outcome of a payslip batch upload.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayslipUploadResultType {
    pub processed: u32,
    pub stored: u32,
    pub unmatched: u32,
    pub errors: u32,
    pub messages: Vec<String>,
}

/***************** Roles *********************/

/**
 * Longest accepted role name.
 */
pub const MAX_ROLE_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRoleType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct EmployeeRoleInputType {
    pub name: String,
}

impl EmployeeRoleInputType {
    pub fn validate(mut self) -> Result<Self, ApplicationError> {
        self.name = self.name.trim().to_string();
        let mut errors = Vec::new();
        if self.name.is_empty() {
            errors.push("name: required".to_string());
        } else if self.name.chars().count() > MAX_ROLE_NAME_LENGTH {
            errors.push(format!("name: at most {MAX_ROLE_NAME_LENGTH} characters"));
        }
        ApplicationError::check_fields("Invalid role", errors)?;
        Ok(self)
    }
}

/**
 * Role ids without repetitions, in the given order.
 */
pub fn distinct_role_ids(role_ids: &[i64]) -> Vec<i64> {
    let mut distinct = Vec::with_capacity(role_ids.len());
    for role_id in role_ids {
        if !distinct.contains(role_id) {
            distinct.push(*role_id);
        }
    }
    distinct
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::apperror::ErrorType;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn employee_input() -> EmployeeInputType {
        EmployeeInputType {
            first_name: " Mario ".to_string(),
            last_name: "Rossi".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1985, 8, 1),
            birth_place: Some("Roma".to_string()),
            gender: Some(Gender::Male),
            fiscal_code: "rssmra85m01h501q".to_string(),
            phone: Some("".to_string()),
            mobile: Some("+39 333 1234567".to_string()),
            iban: None,
            email: " Mario.Rossi@Example.IT ".to_string(),
            pec: None,
            marital_status: None,
            education_level: None,
            residence_address: FullAddress { country_code: Some("IT".to_string()), postal_code: Some("00184".to_string()), ..FullAddress::default() },
        }
    }

    #[test]
    fn test_employee_validate_normalizes() {
        let input = employee_input().validate(today()).unwrap();
        assert_eq!(input.first_name, "Mario");
        assert_eq!(input.fiscal_code, "RSSMRA85M01H501Q");
        assert_eq!(input.email, "mario.rossi@example.it");
        assert_eq!(input.phone, None);
    }

    #[test]
    fn test_employee_birth_date_in_future() {
        let mut input = employee_input();
        input.birth_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        let error = input.validate(today()).unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert!(error.errors.iter().any(|error| error.starts_with("birthDate")));
    }

    #[test]
    fn test_employee_too_young() {
        let mut input = employee_input();
        input.birth_date = NaiveDate::from_ymd_opt(2010, 1, 1);
        assert!(input.validate(today()).is_err());
    }

    #[test]
    fn test_employee_invalid_fields_are_all_reported() {
        let mut input = employee_input();
        input.first_name = "M".to_string();
        input.fiscal_code = "ABCDEFGHIJKLMNOP".to_string();
        input.email = "mario".to_string();
        input.residence_address.postal_code = Some("123".to_string());
        let error = input.validate(today()).unwrap_err();
        assert_eq!(error.errors.len(), 4);
    }

    fn employment_input() -> EmploymentInputType {
        EmploymentInputType {
            employee_id: 1,
            matricola: " a123 ".to_string(),
            contract_type: Some(ContractType::FixedTerm),
            branch: None,
            department: None,
            job_title: Some("Driver".to_string()),
            contract_level: None,
            ccnl: Some(CcnlType::Commercio),
            job_role: None,
            salary: None,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            end_date: None,
            job_description: None,
            status: EmploymentStatus::Active,
        }
    }

    #[test]
    fn test_employment_past_end_date_terminates() {
        let mut input = employment_input();
        input.end_date = NaiveDate::from_ymd_opt(2024, 5, 31);
        let input = input.validate(today()).unwrap();
        assert_eq!(input.status, EmploymentStatus::Terminated);
        assert_eq!(input.matricola, "A123");
    }

    #[test]
    fn test_employment_future_end_date_keeps_status() {
        let mut input = employment_input();
        input.end_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        input.status = EmploymentStatus::OnLeave;
        assert_eq!(input.validate(today()).unwrap().status, EmploymentStatus::OnLeave);
    }

    #[test]
    fn test_employment_matricola_too_long() {
        let mut input = employment_input();
        input.matricola = "ABCDEFGHIJK".to_string();
        assert!(input.validate(today()).is_err());
    }

    #[test]
    fn test_employment_matricola_characters() {
        let mut input = employment_input();
        input.matricola = "A 12.3".to_string();
        let error = input.validate(today()).unwrap_err();
        assert_eq!(error.errors, vec!["matricola: only letters, digits, underscores and dashes".to_string()]);
        let mut input = employment_input();
        input.matricola = "mat_01-b".to_string();
        assert_eq!(input.validate(today()).unwrap().matricola, "MAT_01-B");
    }

    fn item(amount: Option<Decimal>) -> ExpenseItemInputType {
        ExpenseItemInputType { id: None, expense_date: None, description: "Taxi".to_string(), amount, invoice_number: None, supplier_id: None, project_id: None, note: None }
    }

    #[test]
    fn test_expense_report_repeated_item() {
        let items = vec![ExpenseItemInputType { id: Some(4), ..item(None) }, item(None), ExpenseItemInputType { id: Some(4), ..item(None) }];
        let report = ExpenseReportInputType {
            report_number: None,
            employee_id: 1,
            purpose: None,
            creation_date: None,
            submit_date: None,
            start_date: None,
            end_date: None,
            reimbursable_total: None,
            project_id: None,
            payment_method: None,
            status: None,
            items,
        };
        let error = report.validate().unwrap_err();
        assert_eq!(error.errors, vec!["items: an item appears more than once".to_string()]);
    }

    #[test]
    fn test_expense_totals() {
        let items = vec![item(Some(Decimal::new(1000, 2))), item(None), item(Some(Decimal::new(2550, 2)))];
        let totals = ExpenseTotals::compute(&items, Some(Decimal::new(1000, 2)));
        assert_eq!(totals.total, Decimal::new(3550, 2));
        assert_eq!(totals.reimbursable, Decimal::new(1000, 2));
        assert_eq!(totals.non_reimbursable, Decimal::new(2550, 2));
    }

    #[test]
    fn test_expense_totals_missing_reimbursable() {
        let totals = ExpenseTotals::compute(&[item(Some(Decimal::new(12, 0)))], None);
        assert_eq!(totals.reimbursable, Decimal::ZERO);
        assert_eq!(totals.non_reimbursable, Decimal::new(12, 0));
    }

    #[test]
    fn test_role_validate() {
        let role = EmployeeRoleInputType { name: "  Autista ".to_string() }.validate().unwrap();
        assert_eq!(role.name, "Autista");
        let error = EmployeeRoleInputType { name: " ".to_string() }.validate().unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert!(EmployeeRoleInputType { name: "x".repeat(MAX_ROLE_NAME_LENGTH + 1) }.validate().is_err());
    }

    #[test]
    fn test_distinct_role_ids() {
        assert_eq!(distinct_role_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(distinct_role_ids(&[]).is_empty());
    }
}
