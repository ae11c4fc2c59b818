use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::model::{
    apperror::ApplicationError,
    enums::{DocumentOwnerType, DocumentType},
};

/**
 * A file attached to an owning entity.
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetailType {
    pub id: i64,
    pub owner_type: DocumentOwnerType,
    pub owner_id: i64,
    pub document_type: DocumentType,
    /**
     * Path relative to the storage root.
     */
    pub storage_path: String,
    pub file_name: String,
    pub original_filename: Option<String>,
    pub content_type: Option<String>,
    pub file_size: i64,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub uploaded_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_status: Option<ExpiryBucket>,
}

impl DocumentDetailType {
    /**
     * Sets the expiry status relative to `today`.
     */
    pub fn with_expiry_status(mut self, today: NaiveDate, warning_days: i64) -> Self {
        self.expiry_status = Some(expiry_bucket(self.expiry_date, today, warning_days));
        self
    }
}

/**
 * Metadata of a stored file to be recorded.
 */
#[derive(Debug, Clone)]
pub struct DocumentAddInputType {
    pub owner_type: DocumentOwnerType,
    pub owner_id: i64,
    pub document_type: DocumentType,
    pub storage_path: String,
    pub file_name: String,
    pub original_filename: String,
    pub content_type: Option<String>,
    pub file_size: i64,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

/**
 * Document metadata that can be changed after upload.
 */
#[derive(Debug, Clone)]
pub struct DocumentUpdateInputType {
    pub document_type: DocumentType,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

impl DocumentUpdateInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        check_document_dates(self.issue_date, self.expiry_date, &mut errors);
        ApplicationError::check_fields("Invalid document", errors)?;
        Ok(self)
    }
}

/**
 * Owner and metadata of a file being uploaded.
 */
#[derive(Debug, Clone)]
pub struct DocumentUploadInputType {
    pub owner_type: DocumentOwnerType,
    pub owner_id: i64,
    pub document_type: DocumentType,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

impl DocumentUploadInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        let mut errors = Vec::new();
        check_document_dates(self.issue_date, self.expiry_date, &mut errors);
        ApplicationError::check_fields("Invalid document", errors)?;
        Ok(self)
    }
}

/**
 * Expiry must not precede issue.
 */
pub fn check_document_dates(issue_date: Option<NaiveDate>, expiry_date: Option<NaiveDate>, errors: &mut Vec<String>) {
    if let (Some(issue), Some(expiry)) = (issue_date, expiry_date) {
        if expiry < issue {
            errors.push("expiryDate: must not be before issue date".to_string());
        }
    }
}

/**
 * Expiry state of a document.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiryBucket {
    NoExpiry,
    Expired,
    ExpiringSoon,
    Valid,
}

/**
 * Buckets a document by its expiry date.
 *
 * # Arguments
 * `expiry_date`: Expiry of the document, if any.
 * `today`: Reference date.
 * `warning_days`: Documents expiring within this many days are expiring soon.
 */
pub fn expiry_bucket(expiry_date: Option<NaiveDate>, today: NaiveDate, warning_days: i64) -> ExpiryBucket {
    match expiry_date {
        None => ExpiryBucket::NoExpiry,
        Some(expiry) if expiry < today => ExpiryBucket::Expired,
        Some(expiry) if (expiry - today).num_days() <= warning_days => ExpiryBucket::ExpiringSoon,
        Some(_) => ExpiryBucket::Valid,
    }
}

/**
 * Document counts by expiry bucket.
 */
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStatisticsType {
    pub total_count: i64,
    pub valid_count: i64,
    pub expiring_soon_count: i64,
    pub expired_count: i64,
    pub no_expiry_count: i64,
    pub valid_percentage: f64,
    pub expiring_soon_percentage: f64,
    pub expired_percentage: f64,
    pub urgent_count: i64,
}

impl DocumentStatisticsType {
    /**
     * Builds the statistics from bucket counts.
     */
    pub fn from_counts(valid_count: i64, expiring_soon_count: i64, expired_count: i64, no_expiry_count: i64) -> Self {
        let total_count = valid_count + expiring_soon_count + expired_count + no_expiry_count;
        DocumentStatisticsType {
            total_count,
            valid_count,
            expiring_soon_count,
            expired_count,
            no_expiry_count,
            valid_percentage: percentage(valid_count, total_count),
            expiring_soon_percentage: percentage(expiring_soon_count, total_count),
            expired_percentage: percentage(expired_count, total_count),
            urgent_count: expired_count + expiring_soon_count,
        }
    }
}

fn percentage(count: i64, total: i64) -> f64 {
    if total > 0 { count as f64 * 100.0 / total as f64 } else { 0.0 }
}

/**
 * Directory an owner's files are stored in, relative to the storage root.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Employee(i64),
    Employment(String),
    Vehicle(i64),
    Assignment(i64),
    Project(i64),
    Policy { project_id: Option<i64>, insurance_id: i64 },
    Contract(i64),
    Supplier(i64),
    Correspondence(i64),
    ExpenseItem(i64),
    Compliance(i64),
    Payslips { year: i32, month: u32 },
}

impl StorageLocation {
    pub fn directory(&self) -> PathBuf {
        match self {
            StorageLocation::Employee(id) => PathBuf::from(format!("employees/{id}/docs")),
            StorageLocation::Employment(matricola) => PathBuf::from(format!("employments/{matricola}/docs")),
            StorageLocation::Vehicle(id) => PathBuf::from(format!("vehicles/{id}/docs")),
            StorageLocation::Assignment(id) => PathBuf::from(format!("assignments/{id}/docs")),
            StorageLocation::Project(id) => PathBuf::from(format!("projects/{id}/docs")),
            StorageLocation::Policy { project_id: Some(project_id), insurance_id } => PathBuf::from(format!("projects/{project_id}/policies/{insurance_id}")),
            StorageLocation::Policy { project_id: None, insurance_id } => PathBuf::from(format!("policies/{insurance_id}")),
            StorageLocation::Contract(id) => PathBuf::from(format!("contracts/{id}/docs")),
            StorageLocation::Supplier(id) => PathBuf::from(format!("suppliers/{id}/docs")),
            StorageLocation::Correspondence(id) => PathBuf::from(format!("correspondence/{id}/docs")),
            StorageLocation::ExpenseItem(id) => PathBuf::from(format!("expense_items/{id}/docs")),
            StorageLocation::Compliance(id) => PathBuf::from(format!("compliance/{id}/docs")),
            StorageLocation::Payslips { year, month } => PathBuf::from(format!("payslips/{year:04}/{month:02}")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_expiry_bucket() {
        let today = date(1);
        assert_eq!(expiry_bucket(None, today, 30), ExpiryBucket::NoExpiry);
        assert_eq!(expiry_bucket(NaiveDate::from_ymd_opt(2024, 2, 29), today, 30), ExpiryBucket::Expired);
        assert_eq!(expiry_bucket(Some(today), today, 30), ExpiryBucket::ExpiringSoon);
        assert_eq!(expiry_bucket(NaiveDate::from_ymd_opt(2024, 3, 31), today, 30), ExpiryBucket::ExpiringSoon);
        assert_eq!(expiry_bucket(NaiveDate::from_ymd_opt(2024, 4, 1), today, 30), ExpiryBucket::Valid);
    }

    #[test]
    fn test_statistics_empty() {
        let statistics = DocumentStatisticsType::from_counts(0, 0, 0, 0);
        assert_eq!(statistics.total_count, 0);
        assert_eq!(statistics.expired_percentage, 0.0);
    }

    #[test]
    fn test_storage_directories() {
        assert_eq!(StorageLocation::Employment("A123".to_string()).directory(), PathBuf::from("employments/A123/docs"));
        assert_eq!(StorageLocation::Policy { project_id: Some(4), insurance_id: 9 }.directory(), PathBuf::from("projects/4/policies/9"));
        assert_eq!(StorageLocation::Policy { project_id: None, insurance_id: 9 }.directory(), PathBuf::from("policies/9"));
        assert_eq!(StorageLocation::ExpenseItem(2).directory(), PathBuf::from("expense_items/2/docs"));
        assert_eq!(StorageLocation::Payslips { year: 2024, month: 3 }.directory(), PathBuf::from("payslips/2024/03"));
    }

    #[test]
    fn test_document_dates() {
        let input = DocumentUpdateInputType { document_type: DocumentType::Insurance, issue_date: Some(date(10)), expiry_date: Some(date(9)) };
        assert!(input.validate().is_err());
    }
}
