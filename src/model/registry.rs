use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    enums::{CorrespondenceType, CurrencyCode, ProjectStatus, RecurringFrequency, SupplierContractStatus, SupplierContractType},
    models::FullAddress,
    validation::{is_valid_email, trim_to_none},
};

/***************** Suppliers *********************/

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SupplierDetailType {
    pub id: i64,
    pub name: String,
    pub vat_number: Option<String>,
    pub company_phone: Option<String>,
    pub company_email: Option<String>,
    pub pec: Option<String>,
    pub iban: Option<String>,
    pub sdi_code: Option<String>,
    #[sqlx(flatten)]
    pub address: FullAddress,
}

#[derive(Debug, Clone)]
pub struct SupplierInputType {
    pub name: String,
    pub vat_number: Option<String>,
    pub company_phone: Option<String>,
    pub company_email: Option<String>,
    pub pec: Option<String>,
    pub iban: Option<String>,
    pub sdi_code: Option<String>,
    pub address: FullAddress,
}

impl SupplierInputType {
    pub fn validate(mut self) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        self.name = self.name.trim().to_string();
        self.company_email = trim_to_none(self.company_email);
        self.pec = trim_to_none(self.pec);
        if self.name.is_empty() {
            errors.push("name: required".to_string());
        }
        if self.company_email.as_deref().is_some_and(|email| !is_valid_email(email)) {
            errors.push("companyEmail: invalid email".to_string());
        }
        if self.pec.as_deref().is_some_and(|pec| !is_valid_email(pec)) {
            errors.push("pec: invalid email".to_string());
        }
        if let Some(error) = self.address.postal_code_error() {
            errors.push(error);
        }
        ApplicationError::check_fields("Invalid supplier", errors)?;
        self.vat_number = trim_to_none(self.vat_number);
        self.company_phone = trim_to_none(self.company_phone);
        self.iban = trim_to_none(self.iban);
        self.sdi_code = trim_to_none(self.sdi_code).map(|code| code.to_uppercase());
        Ok(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SupplierListInputType {
    pub keyword: Option<String>,
}

/***************** Contracts *********************/

/**
 * A supplier contract.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContractDetailType {
    pub id: i64,
    pub supplier_id: Option<i64>,
    pub project_id: Option<i64>,
    pub contract_type: SupplierContractType,
    pub subject: String,
    pub status: SupplierContractStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub termination_notice_days: Option<i32>,
    pub expiry_reminder: Option<NaiveDate>,
    pub amount_net: Decimal,
    pub vat_rate: Decimal,
    pub currency: Option<CurrencyCode>,
    pub payment_terms: Option<String>,
    pub periodic_fee: Option<Decimal>,
    pub recurring_frequency: Option<RecurringFrequency>,
    pub needs_durc: bool,
    pub durc_expiry: Option<NaiveDate>,
    pub reference_person: Option<String>,
    pub supplier_name: Option<String>,
    #[sqlx(skip)]
    pub amount_gross: Decimal,
    #[sqlx(skip)]
    pub duration_months: Option<u32>,
}

impl ContractDetailType {
    /**
     * Fills the derived gross amount and duration.
     */
    pub fn with_derived_values(mut self) -> Self {
        self.amount_gross = gross_amount(self.amount_net, self.vat_rate);
        self.duration_months = duration_in_months(self.start_date, self.end_date);
        self
    }
}

/**
 * Gross amount of a contract: net plus VAT.
 */
pub fn gross_amount(amount_net: Decimal, vat_rate: Decimal) -> Decimal {
    amount_net + amount_net * vat_rate / Decimal::ONE_HUNDRED
}

/**
 * Whole months between two dates, None when a date is missing or the end precedes the start.
 */
pub fn duration_in_months(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<u32> {
    let (start, end) = (start?, end?);
    if end < start {
        return None;
    }
    let months = (end.year() - start.year()) * 12 + i32::try_from(end.month()).ok()? - i32::try_from(start.month()).ok()?;
    let months = u32::try_from(months).ok()?;
    match start.checked_add_months(Months::new(months)) {
        Some(anniversary) if anniversary > end => months.checked_sub(1),
        _ => Some(months),
    }
}

/**
 * Input for adding or updating a contract. Type and subject are optional here so that
 * missing values are reported as validation errors.
 */
#[derive(Debug, Clone, Default)]
pub struct ContractInputType {
    pub supplier_id: Option<i64>,
    pub project_id: Option<i64>,
    pub contract_type: Option<SupplierContractType>,
    pub subject: Option<String>,
    pub status: Option<SupplierContractStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub termination_notice_days: Option<i32>,
    pub expiry_reminder: Option<NaiveDate>,
    pub amount_net: Option<Decimal>,
    pub vat_rate: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
    pub payment_terms: Option<String>,
    pub periodic_fee: Option<Decimal>,
    pub recurring_frequency: Option<RecurringFrequency>,
    pub needs_durc: Option<bool>,
    pub durc_expiry: Option<NaiveDate>,
    pub reference_person: Option<String>,
}

/**
 * Validated contract input.
 */
#[derive(Debug, Clone)]
pub struct ContractValidInputType {
    pub supplier_id: Option<i64>,
    pub project_id: Option<i64>,
    pub contract_type: SupplierContractType,
    pub subject: String,
    pub status: SupplierContractStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub termination_notice_days: Option<i32>,
    pub expiry_reminder: Option<NaiveDate>,
    pub amount_net: Decimal,
    pub vat_rate: Decimal,
    pub currency: Option<CurrencyCode>,
    pub payment_terms: Option<String>,
    pub periodic_fee: Option<Decimal>,
    pub recurring_frequency: Option<RecurringFrequency>,
    pub needs_durc: bool,
    pub durc_expiry: Option<NaiveDate>,
    pub reference_person: Option<String>,
}

impl ContractInputType {
    /**
     * Validates required fields and amounts. Missing amounts become zero, a missing status becomes BOZZA.
     */
    pub fn validate(self) -> Result<ContractValidInputType, ApplicationError> {
        let mut errors = Vec::new();
        let subject = trim_to_none(self.subject);
        if self.contract_type.is_none() {
            errors.push("type: required".to_string());
        }
        if subject.is_none() {
            errors.push("subject: required".to_string());
        }
        if self.periodic_fee.is_some_and(|fee| fee.is_sign_negative()) {
            errors.push("periodicFee: cannot be negative".to_string());
        }
        if self.amount_net.is_some_and(|amount| amount.is_sign_negative()) {
            errors.push("amountNet: cannot be negative".to_string());
        }
        if self.vat_rate.is_some_and(|rate| rate.is_sign_negative() || rate > Decimal::ONE_HUNDRED) {
            errors.push("vatRate: must be between 0 and 100".to_string());
        }
        if self.termination_notice_days.is_some_and(|days| days < 0) {
            errors.push("terminationNoticeDays: cannot be negative".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                errors.push("endDate: must not be before start date".to_string());
            }
        }
        let (Some(contract_type), Some(subject), true) = (self.contract_type, subject, errors.is_empty()) else {
            return Err(ApplicationError::with_errors(ErrorType::Validation, "Invalid contract".to_string(), errors));
        };
        Ok(ContractValidInputType {
            supplier_id: self.supplier_id,
            project_id: self.project_id,
            contract_type,
            subject,
            status: self.status.unwrap_or(SupplierContractStatus::Bozza),
            start_date: self.start_date,
            end_date: self.end_date,
            termination_notice_days: self.termination_notice_days,
            expiry_reminder: self.expiry_reminder,
            amount_net: self.amount_net.unwrap_or(Decimal::ZERO),
            vat_rate: self.vat_rate.unwrap_or(Decimal::ZERO),
            currency: self.currency,
            payment_terms: trim_to_none(self.payment_terms),
            periodic_fee: self.periodic_fee,
            recurring_frequency: self.recurring_frequency,
            needs_durc: self.needs_durc.unwrap_or(false),
            durc_expiry: self.durc_expiry,
            reference_person: trim_to_none(self.reference_person),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContractListInputType {
    pub status: Option<SupplierContractStatus>,
    pub supplier_id: Option<i64>,
    pub project_id: Option<i64>,
}

/**
 * Contract counters.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractStatisticsType {
    pub draft: i64,
    pub active: i64,
    pub expiring: i64,
    pub expired: i64,
}

/***************** Insurances *********************/

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceDetailType {
    pub id: i64,
    pub project_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub policy_number: String,
    pub policy_type: String,
    pub start_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub guaranteed_amount: Option<Decimal>,
    pub notes: Option<String>,
    pub supplier_name: Option<String>,
    pub project_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InsuranceInputType {
    pub project_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub policy_number: String,
    pub policy_type: String,
    pub start_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub guaranteed_amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl InsuranceInputType {
    pub fn validate(mut self) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        self.policy_number = self.policy_number.trim().to_string();
        self.policy_type = self.policy_type.trim().to_string();
        if self.policy_number.is_empty() {
            errors.push("policyNumber: required".to_string());
        }
        if self.policy_type.is_empty() {
            errors.push("policyType: required".to_string());
        }
        if let (Some(start), Some(expiry)) = (self.start_date, self.expiry_date) {
            if expiry < start {
                errors.push("expiryDate: must not be before start date".to_string());
            }
        }
        if self.notes.as_ref().is_some_and(|notes| notes.chars().count() > 2000) {
            errors.push("notes: at most 2000 characters".to_string());
        }
        ApplicationError::check_fields("Invalid insurance", errors)?;
        self.notes = trim_to_none(self.notes);
        Ok(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InsuranceListInputType {
    pub project_id: Option<i64>,
    pub supplier_id: Option<i64>,
}

/***************** Projects *********************/

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetailType {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub cig: Option<String>,
    pub cup: Option<String>,
    pub manager_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ProjectStatus>,
    #[sqlx(flatten)]
    pub address: FullAddress,
    pub work_description: Option<String>,
    pub value: Option<Decimal>,
    pub advance_amount: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct ProjectInputType {
    pub code: String,
    pub name: String,
    pub cig: Option<String>,
    pub cup: Option<String>,
    pub manager_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ProjectStatus>,
    pub address: FullAddress,
    pub work_description: Option<String>,
    pub value: Option<Decimal>,
    pub advance_amount: Option<Decimal>,
}

impl ProjectInputType {
    pub fn validate(mut self) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        self.code = self.code.trim().to_string();
        self.name = self.name.trim().to_string();
        if self.code.is_empty() {
            errors.push("code: required".to_string());
        }
        if self.name.is_empty() {
            errors.push("name: required".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                errors.push("endDate: must not be before start date".to_string());
            }
        }
        if self.work_description.as_ref().is_some_and(|description| description.chars().count() > 2000) {
            errors.push("workDescription: at most 2000 characters".to_string());
        }
        if let Some(error) = self.address.postal_code_error() {
            errors.push(error);
        }
        ApplicationError::check_fields("Invalid project", errors)?;
        self.cig = trim_to_none(self.cig);
        self.cup = trim_to_none(self.cup);
        self.work_description = trim_to_none(self.work_description);
        Ok(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectListInputType {
    pub status: Option<ProjectStatus>,
    pub keyword: Option<String>,
}

/***************** Correspondence *********************/

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CorrespondenceDetailType {
    pub id: i64,
    pub progressive: i32,
    pub year: i32,
    pub correspondence_type: CorrespondenceType,
    pub description: Option<String>,
    pub correspondence_date: Option<NaiveDate>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub notes: Option<String>,
    #[sqlx(skip)]
    pub protocol: String,
}

impl CorrespondenceDetailType {
    pub fn with_protocol(mut self) -> Self {
        self.protocol = format_protocol(self.progressive, self.year);
        self
    }
}

/**
 * Protocol text of a correspondence record, e.g. `007/2024`.
 */
pub fn format_protocol(progressive: i32, year: i32) -> String {
    format!("{progressive:03}/{year}")
}

#[derive(Debug, Clone)]
pub struct CorrespondenceInputType {
    pub progressive: i32,
    pub year: Option<i32>,
    pub correspondence_type: CorrespondenceType,
    pub description: Option<String>,
    pub correspondence_date: Option<NaiveDate>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub notes: Option<String>,
}

impl CorrespondenceInputType {
    /**
     * Validates the record. A missing year is taken from the correspondence date, or from `today`.
     */
    pub fn validate(mut self, today: NaiveDate) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        if self.progressive < 0 {
            errors.push("progressive: cannot be negative".to_string());
        }
        if self.year.is_none() {
            self.year = Some(self.correspondence_date.unwrap_or(today).year());
        }
        ApplicationError::check_fields("Invalid correspondence", errors)?;
        self.description = trim_to_none(self.description);
        self.sender = trim_to_none(self.sender);
        self.recipient = trim_to_none(self.recipient);
        self.notes = trim_to_none(self.notes);
        Ok(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CorrespondenceListInputType {
    pub year: Option<i32>,
    pub correspondence_type: Option<CorrespondenceType>,
    pub keyword: Option<String>,
}

/***************** Compliance items *********************/

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceItemDetailType {
    pub id: i64,
    pub category: Option<String>,
    pub employee_id: Option<i64>,
    pub project_id: Option<i64>,
    pub description: Option<String>,
    pub visit_date: Option<NaiveDate>,
    pub periodicity: Option<i32>,
    pub due_date: NaiveDate,
    pub employee_name: Option<String>,
    pub project_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ComplianceItemInputType {
    pub category: Option<String>,
    pub employee_id: Option<i64>,
    pub project_id: Option<i64>,
    pub description: Option<String>,
    pub visit_date: Option<NaiveDate>,
    pub periodicity: Option<i32>,
    pub due_date: Option<NaiveDate>,
}

/**
 * Validated compliance item with a known due date.
 */
#[derive(Debug, Clone)]
pub struct ComplianceItemValidInputType {
    pub category: Option<String>,
    pub employee_id: Option<i64>,
    pub project_id: Option<i64>,
    pub description: Option<String>,
    pub visit_date: Option<NaiveDate>,
    pub periodicity: Option<i32>,
    pub due_date: NaiveDate,
}

impl ComplianceItemInputType {
    /**
     * Validates the item. Visit date plus periodicity years replaces the given due date.
     */
    pub fn validate(self) -> Result<ComplianceItemValidInputType, ApplicationError> {
        let mut errors = Vec::new();
        if self.periodicity.is_some_and(|years| years <= 0) {
            errors.push("periodicity: must be positive".to_string());
        }
        if self.description.as_ref().is_some_and(|description| description.chars().count() > 255) {
            errors.push("description: at most 255 characters".to_string());
        }
        let due_date = derived_due_date(self.visit_date, self.periodicity).or(self.due_date);
        if due_date.is_none() {
            errors.push("dueDate: required".to_string());
        }
        let (Some(due_date), true) = (due_date, errors.is_empty()) else {
            return Err(ApplicationError::with_errors(ErrorType::Validation, "Invalid compliance item".to_string(), errors));
        };
        Ok(ComplianceItemValidInputType {
            category: trim_to_none(self.category),
            employee_id: self.employee_id,
            project_id: self.project_id,
            description: trim_to_none(self.description),
            visit_date: self.visit_date,
            periodicity: self.periodicity,
            due_date,
        })
    }
}

/**
 * Due date derived from the visit date and a periodicity in years.
 */
pub fn derived_due_date(visit_date: Option<NaiveDate>, periodicity: Option<i32>) -> Option<NaiveDate> {
    let years = u32::try_from(periodicity?).ok()?;
    visit_date?.checked_add_months(Months::new(years.checked_mul(12)?))
}

#[derive(Debug, Clone, Default)]
pub struct ComplianceItemListInputType {
    pub category: Option<String>,
    pub project_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    pub expired: Option<bool>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_contract_missing_required_fields() {
        let error = ContractInputType::default().validate().unwrap_err();
        assert!(error.errors.iter().any(|error| error.starts_with("type")));
        assert!(error.errors.iter().any(|error| error.starts_with("subject")));
    }

    #[test]
    fn test_contract_negative_periodic_fee() {
        let input = ContractInputType { contract_type: Some(SupplierContractType::Servizi), subject: Some("Test".to_string()), periodic_fee: Some(Decimal::new(-1, 0)), ..ContractInputType::default() };
        let error = input.validate().unwrap_err();
        assert!(error.errors.iter().any(|error| error.starts_with("periodicFee")));
    }

    #[test]
    fn test_contract_defaults_missing_amounts() {
        let input = ContractInputType { contract_type: Some(SupplierContractType::Fornitura), subject: Some(" Cancelleria ".to_string()), ..ContractInputType::default() };
        let valid = input.validate().unwrap();
        assert_eq!(valid.amount_net, Decimal::ZERO);
        assert_eq!(valid.vat_rate, Decimal::ZERO);
        assert_eq!(valid.status, SupplierContractStatus::Bozza);
        assert_eq!(valid.subject, "Cancelleria");
        assert!(!valid.needs_durc);
    }

    #[test]
    fn test_gross_amount() {
        assert_eq!(gross_amount(Decimal::new(1000, 0), Decimal::new(22, 0)), Decimal::new(1220, 0));
        assert_eq!(gross_amount(Decimal::ZERO, Decimal::new(22, 0)), Decimal::ZERO);
    }

    #[test]
    fn test_duration_in_months() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);
        assert_eq!(duration_in_months(date(2024, 1, 1), date(2026, 1, 1)), Some(24));
        assert_eq!(duration_in_months(date(2024, 1, 15), date(2024, 3, 14)), Some(1));
        assert_eq!(duration_in_months(date(2024, 1, 31), date(2024, 2, 29)), Some(0));
        assert_eq!(duration_in_months(date(2024, 3, 1), date(2024, 1, 1)), None);
        assert_eq!(duration_in_months(None, date(2024, 1, 1)), None);
    }

    #[test]
    fn test_format_protocol() {
        assert_eq!(format_protocol(7, 2024), "007/2024");
        assert_eq!(format_protocol(1234, 2024), "1234/2024");
    }

    #[test]
    fn test_correspondence_year_from_date() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let input = CorrespondenceInputType {
            progressive: 0,
            year: None,
            correspondence_type: CorrespondenceType::E,
            description: Some("Lettera".to_string()),
            correspondence_date: NaiveDate::from_ymd_opt(2024, 12, 30),
            sender: None,
            recipient: None,
            notes: None,
        };
        assert_eq!(input.validate(today).unwrap().year, Some(2024));
    }

    #[test]
    fn test_compliance_due_date_from_periodicity() {
        let input = ComplianceItemInputType {
            category: Some("Visita medica".to_string()),
            employee_id: Some(1),
            project_id: None,
            description: None,
            visit_date: NaiveDate::from_ymd_opt(2024, 2, 29),
            periodicity: Some(2),
            due_date: NaiveDate::from_ymd_opt(2030, 1, 1),
        };
        assert_eq!(input.validate().unwrap().due_date, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }

    #[test]
    fn test_compliance_due_date_required() {
        let input = ComplianceItemInputType { category: None, employee_id: None, project_id: None, description: None, visit_date: None, periodicity: Some(1), due_date: None };
        assert!(input.validate().is_err());
    }
}
