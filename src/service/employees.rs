use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::{info, instrument, warn};

use crate::{
    dao::{compliance::ComplianceDao, documents::DocumentDao, employees::EmployeeDao, employments::EmploymentDao, expenses::ExpenseDao, fuelcards::FuelCardDao, payslips::PayslipDao},
    model::{
        apperror::{ApplicationError, ErrorType},
        documents::StorageLocation,
        enums::DocumentOwnerType,
        models::{ListOutputType, PaginationInput},
        personnel::{EmployeeDetailType, EmployeeInputType, EmployeeListInputType},
        validation::{ADULT_AGE, age_at},
    },
    service::{
        common::{acquire, begin, connection_pool, finish, today},
        employments::EmploymentService,
        expenses::ExpenseService,
        storage::{FileStorage, RemovedFiles},
    },
};

/**
 * Errors for an email or fiscal code already held by another employee.
 */
pub fn uniqueness_errors(email_in_use: bool, fiscal_code_in_use: bool) -> Vec<String> {
    let mut errors = Vec::new();
    if email_in_use {
        errors.push("email: already in use".to_string());
    }
    if fiscal_code_in_use {
        errors.push("fiscalCode: already in use".to_string());
    }
    errors
}

/**
 * Service for employees.
 */
pub struct EmployeeService {
    employee_dao: EmployeeDao,
    employment_dao: EmploymentDao,
    expense_dao: ExpenseDao,
    compliance_dao: ComplianceDao,
    fuel_card_dao: FuelCardDao,
    payslip_dao: PayslipDao,
    document_dao: DocumentDao,
    employment_service: EmploymentService,
    expense_service: ExpenseService,
    file_storage: Arc<FileStorage>,
    connection_pool: Option<Pool<Postgres>>,
}

impl EmployeeService {
    pub fn new(file_storage: Arc<FileStorage>, connection_pool: Option<Pool<Postgres>>) -> Self {
        EmployeeService {
            employee_dao: EmployeeDao::new(),
            employment_dao: EmploymentDao::new(),
            expense_dao: ExpenseDao::new(),
            compliance_dao: ComplianceDao::new(),
            fuel_card_dao: FuelCardDao::new(),
            payslip_dao: PayslipDao::new(),
            document_dao: DocumentDao::new(),
            employment_service: EmploymentService::new(file_storage.clone(), connection_pool.clone()),
            expense_service: ExpenseService::new(file_storage.clone(), connection_pool.clone()),
            file_storage,
            connection_pool,
        }
    }

    pub async fn get_employee(&self, employee_id: i64) -> Result<EmployeeDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.employee_dao.get_employee(&mut connection, employee_id).await
    }

    pub async fn get_employee_list(&self, pagination_input: PaginationInput, filter: EmployeeListInputType) -> Result<ListOutputType<EmployeeDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.employee_dao.get_employee_list(&mut connection, pagination_input, filter).await
    }

    /**
     * Employees without an active employment.
     */
    pub async fn get_available_employee_list(&self, pagination_input: PaginationInput) -> Result<ListOutputType<EmployeeDetailType>, ApplicationError> {
        self.employment_service.terminate_expired_employments().await?;
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.employee_dao.get_available_employee_list(&mut connection, pagination_input).await
    }

    /**
     * Adds an employee. Email and fiscal code must not belong to another employee.
     *
     * # Arguments
     * `employee_input`: The employee to add.
     *
     * # Returns
     * The stored employee.
     */
    #[instrument(skip(self, employee_input))]
    pub async fn add_employee(&self, employee_input: EmployeeInputType) -> Result<EmployeeDetailType, ApplicationError> {
        let today = today();
        let employee_input = employee_input.validate(today)?;
        warn_if_minor(employee_input.birth_date, today);
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_employee_in(&mut transaction, None, employee_input).await;
        finish(transaction, result).await
    }

    #[instrument(skip(self, employee_input))]
    pub async fn update_employee(&self, employee_id: i64, employee_input: EmployeeInputType) -> Result<EmployeeDetailType, ApplicationError> {
        let today = today();
        let employee_input = employee_input.validate(today)?;
        warn_if_minor(employee_input.birth_date, today);
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_employee_in(&mut transaction, Some(employee_id), employee_input).await;
        finish(transaction, result).await
    }

    async fn save_employee_in(&self, transaction: &mut PgConnection, employee_id: Option<i64>, employee_input: EmployeeInputType) -> Result<EmployeeDetailType, ApplicationError> {
        let email_in_use = self.employee_dao.email_in_use(transaction, &employee_input.email, employee_id).await?;
        let fiscal_code_in_use = self.employee_dao.fiscal_code_in_use(transaction, &employee_input.fiscal_code, employee_id).await?;
        let errors = uniqueness_errors(email_in_use, fiscal_code_in_use);
        if !errors.is_empty() {
            return Err(ApplicationError::with_errors(ErrorType::ConstraintViolation, "Employee already exists".to_string(), errors));
        }
        let employee_id = match employee_id {
            Some(employee_id) => {
                self.employee_dao.update_employee(transaction, employee_id, employee_input).await?;
                employee_id
            }
            None => self.employee_dao.add_employee(transaction, employee_input).await?,
        };
        self.employee_dao.get_employee(transaction, employee_id).await
    }

    /**
     * Deletes an employee with everything that belongs to them.
     *
     * Fuel cards and payslips are unlinked. Expense reports, compliance items, employments with
     * their assignments, and all related documents are deleted.
     */
    #[instrument(skip(self))]
    pub async fn delete_employee(&self, employee_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_employee_in(&mut transaction, employee_id).await;
        let removed = finish(transaction, result).await?;
        self.file_storage.delete_removed(&removed).await;
        info!("Deleted employee {employee_id}");
        Ok(())
    }

    async fn delete_employee_in(&self, transaction: &mut PgConnection, employee_id: i64) -> Result<RemovedFiles, ApplicationError> {
        self.employee_dao.get_employee(transaction, employee_id).await?;
        let mut removed = RemovedFiles::default();
        self.fuel_card_dao.unlink_employee(transaction, employee_id).await?;
        for report_id in self.expense_dao.get_expense_report_ids_by_employee(transaction, employee_id).await? {
            let (item_ids, storage_paths) = self.expense_service.delete_expense_report_in(transaction, report_id).await?;
            removed.storage_paths.extend(storage_paths);
            removed.directories.extend(item_ids.iter().map(|id| StorageLocation::ExpenseItem(*id).directory()));
        }
        let compliance_ids = self.compliance_dao.delete_compliance_items_by_employee(transaction, employee_id).await?;
        removed.storage_paths.extend(self.document_dao.delete_documents_for_owners(transaction, DocumentOwnerType::ComplianceItem, &compliance_ids).await?);
        removed.directories.extend(compliance_ids.iter().map(|id| StorageLocation::Compliance(*id).directory()));
        self.payslip_dao.unlink_employee(transaction, employee_id).await?;
        let employment_ids = self.employment_dao.get_employment_ids_by_employee(transaction, employee_id).await?;
        removed.add(self.employment_service.remove_employment_children_in(transaction, &employment_ids).await?);
        for (_, matricola) in self.employment_dao.delete_employments_by_employee(transaction, employee_id).await? {
            removed.directories.push(StorageLocation::Employment(matricola).directory());
        }
        removed.storage_paths.extend(self.document_dao.delete_documents_for_owner(transaction, DocumentOwnerType::Employee, employee_id).await?);
        self.employee_dao.delete_employee(transaction, employee_id).await?;
        removed.directories.push(StorageLocation::Employee(employee_id).directory());
        Ok(removed)
    }
}

fn warn_if_minor(birth_date: Option<NaiveDate>, today: NaiveDate) {
    if let Some(birth_date) = birth_date {
        if age_at(birth_date, today) < ADULT_AGE {
            warn!("Employee born {birth_date} is under {ADULT_AGE}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::config::StorageConfig;

    #[test]
    fn test_uniqueness_errors() {
        assert!(uniqueness_errors(false, false).is_empty());
        assert_eq!(uniqueness_errors(true, false), vec!["email: already in use".to_string()]);
        assert_eq!(uniqueness_errors(true, true).len(), 2);
    }

    #[actix_web::test]
    async fn test_without_database() {
        let service = EmployeeService::new(Arc::new(FileStorage::new(&StorageConfig::default())), None);
        assert_eq!(service.delete_employee(1).await.unwrap_err().error_type, ErrorType::DatabaseError);
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{
        dao::{common::integration_test::init_db, employments::integration_test::employment_input},
        model::{documents::DocumentUploadInputType, enums::DocumentType, registry::ComplianceItemInputType},
        service::{
            common::integration_test::{add_test_employee, pdf_file, test_storage, unique_code},
            compliance::ComplianceService,
            documents::DocumentService,
        },
    };

    fn upload_input(owner_type: DocumentOwnerType, owner_id: i64) -> DocumentUploadInputType {
        DocumentUploadInputType { owner_type, owner_id, document_type: DocumentType::Other, issue_date: None, expiry_date: None }
    }

    #[sqlx::test]
    async fn test_delete_employee_removes_files_and_rows() {
        let pool = init_db().await;
        let directory = tempfile::tempdir().unwrap();
        let file_storage = test_storage(directory.path());
        let employee_service = EmployeeService::new(file_storage.clone(), Some(pool.clone()));
        let compliance_service = ComplianceService::new(file_storage.clone(), Some(pool.clone()));
        let document_service = DocumentService::new(file_storage.clone(), 30, Some(pool.clone()));
        let employee_id = add_test_employee(&pool).await;
        let matricola = unique_code("M", 10);
        let mut transaction = pool.begin().await.unwrap();
        let employment_id = EmploymentDao::new().add_employment(&mut transaction, employment_input(employee_id, &matricola)).await.unwrap();
        transaction.commit().await.unwrap();
        let compliance_item = compliance_service
            .add_compliance_item(ComplianceItemInputType {
                category: Some("Visita medica".to_string()),
                employee_id: Some(employee_id),
                project_id: None,
                description: None,
                visit_date: None,
                periodicity: Some(12),
                due_date: NaiveDate::from_ymd_opt(2030, 6, 30),
            })
            .await
            .unwrap();
        let documents = vec![
            document_service.upload_document(upload_input(DocumentOwnerType::Employee, employee_id), pdf_file("carta_identita.pdf")).await.unwrap(),
            document_service.upload_document(upload_input(DocumentOwnerType::Employment, employment_id), pdf_file("contratto.pdf")).await.unwrap(),
            document_service.upload_document(upload_input(DocumentOwnerType::ComplianceItem, compliance_item.id), pdf_file("idoneita.pdf")).await.unwrap(),
        ];

        employee_service.delete_employee(employee_id).await.unwrap();

        assert_eq!(employee_service.get_employee(employee_id).await.unwrap_err().error_type, ErrorType::NotFound);
        let mut connection = pool.acquire().await.unwrap();
        assert_eq!(EmploymentDao::new().get_employment(&mut connection, employment_id).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(compliance_service.get_compliance_item(compliance_item.id).await.unwrap_err().error_type, ErrorType::NotFound);
        for document in &documents {
            assert_eq!(document_service.get_document(document.id).await.unwrap_err().error_type, ErrorType::NotFound);
            assert_eq!(file_storage.read(&document.storage_path).await.unwrap_err().error_type, ErrorType::NotFound);
        }
        assert!(!directory.path().join(StorageLocation::Employee(employee_id).directory()).exists());
        assert!(!directory.path().join(StorageLocation::Employment(matricola).directory()).exists());
        assert!(!directory.path().join(StorageLocation::Compliance(compliance_item.id).directory()).exists());
    }
}
