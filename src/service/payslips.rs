use std::path::Path;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use sqlx::{Pool, Postgres};
use tracing::{error, info, instrument};

use crate::{
    dao::{employees::EmployeeDao, payslips::PayslipDao},
    model::{
        apperror::{ApplicationError, ErrorType},
        documents::StorageLocation,
        enums::PayslipStatus,
        models::{ListOutputType, PaginationInput, month_key},
        personnel::{PayslipAddInputType, PayslipDetailType, PayslipUploadResultType},
    },
    service::{
        common::{acquire, begin, connection_pool, finish},
        storage::{FileStorage, UploadedFile},
    },
};

/**
 * Length of an Italian fiscal code.
 */
const FISCAL_CODE_LENGTH: usize = 16;

/**
 * Fiscal code read from a payslip file name: the stem without non-alphanumerics, uppercased,
 * at most 16 characters.
 */
pub fn extract_fiscal_code(file_name: &str) -> String {
    let base_name = Path::new(file_name).file_name().and_then(|name| name.to_str()).unwrap_or(file_name);
    let stem = match base_name.rfind('.') {
        Some(index) if index > 0 => &base_name[..index],
        _ => base_name,
    };
    stem.chars().filter(|character| character.is_ascii_alphanumeric()).map(|character| character.to_ascii_uppercase()).take(FISCAL_CODE_LENGTH).collect()
}

/**
 * Parses a `YYYY-MM` reference month into its first day.
 */
pub fn parse_reference_month(month: &str) -> Result<NaiveDate, ApplicationError> {
    NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d").map_err(|_| ApplicationError::new(ErrorType::Validation, format!("Invalid month {month}, expected YYYY-MM")))
}

/**
 * Service for monthly payslips.
 */
pub struct PayslipService {
    payslip_dao: PayslipDao,
    employee_dao: EmployeeDao,
    file_storage: Arc<FileStorage>,
    connection_pool: Option<Pool<Postgres>>,
}

impl PayslipService {
    pub fn new(file_storage: Arc<FileStorage>, connection_pool: Option<Pool<Postgres>>) -> Self {
        PayslipService { payslip_dao: PayslipDao::new(), employee_dao: EmployeeDao::new(), file_storage, connection_pool }
    }

    /**
     * Stores a batch of payslips for a month. Each file is matched to an employee by the fiscal
     * code in its name. A failing file is counted and reported without stopping the batch.
     *
     * # Arguments
     * `month`: Reference month `YYYY-MM`.
     * `files`: The uploaded files.
     *
     * # Returns
     * Counters and messages of the batch.
     */
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub async fn upload_payslips(&self, month: &str, files: Vec<UploadedFile>) -> Result<PayslipUploadResultType, ApplicationError> {
        let reference_month = parse_reference_month(month)?;
        let pool = connection_pool(&self.connection_pool)?;
        let directory = StorageLocation::Payslips { year: reference_month.year(), month: reference_month.month() }.directory();
        let mut result = PayslipUploadResultType::default();
        for file in files.into_iter().filter(|file| !file.data.is_empty()) {
            result.processed += 1;
            let fiscal_code = extract_fiscal_code(&file.file_name);
            if fiscal_code.is_empty() {
                result.errors += 1;
                result.messages.push(format!("{}: no fiscal code in file name", file.file_name));
                continue;
            }
            match self.store_payslip(pool, &directory, reference_month, &fiscal_code, &file).await {
                Ok(matched) => {
                    result.stored += 1;
                    if !matched {
                        result.unmatched += 1;
                        result.messages.push(format!("{fiscal_code} ({}): no matching employee", file.file_name));
                    }
                }
                Err(err) => {
                    error!("Failed to store payslip {}: {}", file.file_name, err.message);
                    result.errors += 1;
                    result.messages.push(format!("{}: {}", file.file_name, err.message));
                }
            }
        }
        info!("Payslips for {month}: {} processed, {} stored, {} unmatched, {} errors", result.processed, result.stored, result.unmatched, result.errors);
        Ok(result)
    }

    /**
     * Stores one payslip file and its row.
     *
     * # Returns
     * Whether an employee matched the fiscal code.
     */
    async fn store_payslip(&self, pool: &Pool<Postgres>, directory: &Path, reference_month: NaiveDate, fiscal_code: &str, file: &UploadedFile) -> Result<bool, ApplicationError> {
        let mut connection = acquire(pool).await?;
        let employee_id = self.employee_dao.find_employee_id_by_fiscal_code(&mut connection, fiscal_code).await?;
        let stored = self.file_storage.store(directory, &file.file_name, file.content_type.as_deref(), &file.data, false).await?;
        let payslip_input = PayslipAddInputType {
            employee_id,
            fiscal_code: fiscal_code.to_string(),
            reference_month,
            storage_path: stored.storage_path.clone(),
            original_filename: file.file_name.clone(),
            status: if employee_id.is_some() { PayslipStatus::Pending } else { PayslipStatus::Unmatched },
        };
        if let Err(err) = self.payslip_dao.add_payslip(&mut connection, payslip_input).await {
            self.file_storage.delete_file(&stored.storage_path).await;
            return Err(err);
        }
        Ok(employee_id.is_some())
    }

    pub async fn get_payslip_list(&self, pagination_input: PaginationInput, month: &str) -> Result<ListOutputType<PayslipDetailType>, ApplicationError> {
        let reference_month = parse_reference_month(month)?;
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.payslip_dao.get_payslip_list(&mut connection, pagination_input, reference_month).await
    }

    /**
     * Months with payslips as `YYYY-MM`, newest first.
     */
    pub async fn get_payslip_months(&self) -> Result<Vec<String>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        let months = self.payslip_dao.get_payslip_months(&mut connection).await?;
        Ok(months.into_iter().map(month_key).collect())
    }

    /**
     * Reads a payslip with its file contents.
     */
    pub async fn download_payslip(&self, payslip_id: i64) -> Result<(PayslipDetailType, Vec<u8>), ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        let payslip = self.payslip_dao.get_payslip(&mut connection, payslip_id).await?;
        let data = self.file_storage.read(&payslip.storage_path).await?;
        Ok((payslip, data))
    }

    #[instrument(skip(self))]
    pub async fn delete_payslip(&self, payslip_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.payslip_dao.delete_payslip(&mut transaction, payslip_id).await;
        let storage_path = finish(transaction, result).await?;
        self.file_storage.delete_file(&storage_path).await;
        Ok(())
    }

    /**
     * Deletes several payslips.
     *
     * # Returns
     * Number of deleted payslips.
     */
    #[instrument(skip(self))]
    pub async fn delete_payslips(&self, payslip_ids: Vec<i64>) -> Result<usize, ApplicationError> {
        if payslip_ids.is_empty() {
            return Ok(0);
        }
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.payslip_dao.delete_payslips(&mut transaction, &payslip_ids).await;
        let storage_paths = finish(transaction, result).await?;
        self.file_storage.delete_files(&storage_paths).await;
        Ok(storage_paths.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::config::StorageConfig;

    #[test]
    fn test_extract_fiscal_code() {
        assert_eq!(extract_fiscal_code("rssmra85m01h501q.pdf"), "RSSMRA85M01H501Q");
        assert_eq!(extract_fiscal_code("RSS-MRA 85M01_H501Q_marzo.pdf"), "RSSMRA85M01H501Q");
        assert_eq!(extract_fiscal_code("dir/vrdgpp80a01f205x.PDF"), "VRDGPP80A01F205X");
        assert_eq!(extract_fiscal_code(".pdf"), "PDF");
        assert_eq!(extract_fiscal_code("---.pdf"), "");
    }

    #[test]
    fn test_parse_reference_month() {
        assert_eq!(parse_reference_month("2024-03").unwrap(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(parse_reference_month("2024-13").unwrap_err().error_type, ErrorType::Validation);
        assert!(parse_reference_month("marzo").is_err());
    }

    #[actix_web::test]
    async fn test_upload_without_database() {
        let service = PayslipService::new(Arc::new(FileStorage::new(&StorageConfig::default())), None);
        assert_eq!(service.upload_payslips("2024-03", Vec::new()).await.unwrap_err().error_type, ErrorType::DatabaseError);
        assert_eq!(service.delete_payslips(Vec::new()).await.unwrap(), 0);
    }
}
