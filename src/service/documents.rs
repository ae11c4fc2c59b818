use std::sync::Arc;

use sqlx::{PgConnection, Pool, Postgres};
use tracing::{info, instrument, warn};

use crate::{
    dao::{
        assignments::AssignmentDao, compliance::ComplianceDao, contracts::ContractDao, correspondence::CorrespondenceDao, documents::DocumentDao, employees::EmployeeDao,
        employments::EmploymentDao, expenses::ExpenseDao, insurances::InsuranceDao, maintenance::MaintenanceDao, projects::ProjectDao, suppliers::SupplierDao, vehicles::VehicleDao,
    },
    model::{
        apperror::{ApplicationError, ErrorType},
        documents::{DocumentAddInputType, DocumentDetailType, DocumentStatisticsType, DocumentUpdateInputType, DocumentUploadInputType, StorageLocation},
        enums::DocumentOwnerType,
    },
    service::{
        common::{acquire, begin, check_reference, connection_pool, expiry_window, finish, today},
        storage::{FileStorage, StoredFile, UploadedFile},
    },
};

/**
 * Rejects a requested file name that is not a plain name.
 */
pub fn check_requested_file_name(file_name: &str) -> Result<(), ApplicationError> {
    if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name == "." || file_name == ".." {
        warn!("Rejected requested file name {file_name}");
        return Err(ApplicationError::new(ErrorType::Security, "Invalid file name".to_string()));
    }
    Ok(())
}

/**
 * Service for document attachments of every owner type.
 */
pub struct DocumentService {
    document_dao: DocumentDao,
    employee_dao: EmployeeDao,
    employment_dao: EmploymentDao,
    vehicle_dao: VehicleDao,
    assignment_dao: AssignmentDao,
    maintenance_dao: MaintenanceDao,
    project_dao: ProjectDao,
    insurance_dao: InsuranceDao,
    contract_dao: ContractDao,
    supplier_dao: SupplierDao,
    correspondence_dao: CorrespondenceDao,
    expense_dao: ExpenseDao,
    compliance_dao: ComplianceDao,
    file_storage: Arc<FileStorage>,
    expiry_warning_days: i64,
    connection_pool: Option<Pool<Postgres>>,
}

impl DocumentService {
    /**
     * Creates the service.
     *
     * # Arguments
     * `file_storage`: Storage of the document files.
     * `expiry_warning_days`: Days before expiry a document counts as expiring soon.
     * `connection_pool`: Database pool, if any.
     */
    pub fn new(file_storage: Arc<FileStorage>, expiry_warning_days: i64, connection_pool: Option<Pool<Postgres>>) -> Self {
        DocumentService {
            document_dao: DocumentDao::new(),
            employee_dao: EmployeeDao::new(),
            employment_dao: EmploymentDao::new(),
            vehicle_dao: VehicleDao::new(),
            assignment_dao: AssignmentDao::new(),
            maintenance_dao: MaintenanceDao::new(),
            project_dao: ProjectDao::new(),
            insurance_dao: InsuranceDao::new(),
            contract_dao: ContractDao::new(),
            supplier_dao: SupplierDao::new(),
            correspondence_dao: CorrespondenceDao::new(),
            expense_dao: ExpenseDao::new(),
            compliance_dao: ComplianceDao::new(),
            file_storage,
            expiry_warning_days,
            connection_pool,
        }
    }

    /**
     * Stores an uploaded file for an owner and records it.
     *
     * # Arguments
     * `upload_input`: Owner and metadata of the document.
     * `file`: The uploaded file.
     *
     * # Returns
     * The recorded document. The stored file is removed again when recording fails.
     */
    #[instrument(skip(self, upload_input, file), fields(owner_type = ?upload_input.owner_type, owner_id = upload_input.owner_id, file_name = %file.file_name))]
    pub async fn upload_document(&self, upload_input: DocumentUploadInputType, file: UploadedFile) -> Result<DocumentDetailType, ApplicationError> {
        let upload_input = upload_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let stored = match self.store_for_owner_in(&mut transaction, &upload_input, &file).await {
            Ok(stored) => stored,
            Err(err) => return finish(transaction, Err(err)).await,
        };
        let storage_path = stored.storage_path.clone();
        let result = self.record_document_in(&mut transaction, upload_input, &file, stored).await;
        match finish(transaction, result).await {
            Ok(document) => {
                info!("Uploaded {} ({}) as {}", file.file_name, document.document_type.display_name(), document.storage_path);
                Ok(document)
            }
            Err(err) => {
                self.file_storage.delete_file(&storage_path).await;
                Err(err)
            }
        }
    }

    /**
     * Stores the file in the directory of its owner.
     */
    async fn store_for_owner_in(&self, transaction: &mut PgConnection, upload_input: &DocumentUploadInputType, file: &UploadedFile) -> Result<StoredFile, ApplicationError> {
        let location = self.owner_location(transaction, upload_input.owner_type, upload_input.owner_id).await?;
        self.file_storage.store(&location.directory(), &file.file_name, file.content_type.as_deref(), &file.data, upload_input.document_type.is_image()).await
    }

    async fn record_document_in(&self, transaction: &mut PgConnection, upload_input: DocumentUploadInputType, file: &UploadedFile, stored: StoredFile) -> Result<DocumentDetailType, ApplicationError> {
        let document_input = DocumentAddInputType {
            owner_type: upload_input.owner_type,
            owner_id: upload_input.owner_id,
            document_type: upload_input.document_type,
            storage_path: stored.storage_path,
            file_name: stored.file_name,
            original_filename: file.file_name.clone(),
            content_type: Some(stored.content_type),
            file_size: stored.file_size,
            issue_date: upload_input.issue_date,
            expiry_date: upload_input.expiry_date,
        };
        let document_id = self.document_dao.add_document(transaction, document_input).await?;
        self.document_dao.get_document(transaction, document_id).await
    }

    /**
     * Directory of an owner's files. Fails with not found when the owner does not exist.
     */
    async fn owner_location(&self, connection: &mut PgConnection, owner_type: DocumentOwnerType, owner_id: i64) -> Result<StorageLocation, ApplicationError> {
        let location = match owner_type {
            DocumentOwnerType::Employee => {
                check_reference(self.employee_dao.employee_exists(connection, owner_id).await?, "Employee", owner_id)?;
                StorageLocation::Employee(owner_id)
            }
            DocumentOwnerType::Employment => StorageLocation::Employment(self.employment_dao.get_employment(connection, owner_id).await?.matricola),
            DocumentOwnerType::Vehicle => {
                check_reference(self.vehicle_dao.vehicle_exists(connection, owner_id).await?, "Vehicle", owner_id)?;
                StorageLocation::Vehicle(owner_id)
            }
            DocumentOwnerType::Assignment => StorageLocation::Assignment(self.assignment_dao.get_assignment(connection, owner_id).await?.id),
            DocumentOwnerType::Maintenance => StorageLocation::Vehicle(self.maintenance_dao.get_maintenance(connection, owner_id).await?.vehicle_id),
            DocumentOwnerType::Project => {
                check_reference(self.project_dao.project_exists(connection, owner_id).await?, "Project", owner_id)?;
                StorageLocation::Project(owner_id)
            }
            DocumentOwnerType::Insurance => {
                let insurance = self.insurance_dao.get_insurance(connection, owner_id).await?;
                StorageLocation::Policy { project_id: insurance.project_id, insurance_id: insurance.id }
            }
            DocumentOwnerType::Contract => StorageLocation::Contract(self.contract_dao.get_contract(connection, owner_id).await?.id),
            DocumentOwnerType::Supplier => {
                check_reference(self.supplier_dao.supplier_exists(connection, owner_id).await?, "Supplier", owner_id)?;
                StorageLocation::Supplier(owner_id)
            }
            DocumentOwnerType::Correspondence => StorageLocation::Correspondence(self.correspondence_dao.get_correspondence(connection, owner_id).await?.id),
            DocumentOwnerType::ExpenseItem => {
                check_reference(self.expense_dao.expense_item_exists(connection, owner_id).await?, "Expense item", owner_id)?;
                StorageLocation::ExpenseItem(owner_id)
            }
            DocumentOwnerType::ComplianceItem => StorageLocation::Compliance(self.compliance_dao.get_compliance_item(connection, owner_id).await?.id),
        };
        Ok(location)
    }

    pub async fn get_documents_for_owner(&self, owner_type: DocumentOwnerType, owner_id: i64) -> Result<Vec<DocumentDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        let documents = self.document_dao.get_documents_for_owner(&mut connection, owner_type, owner_id).await?;
        let today = today();
        Ok(documents.into_iter().map(|document| document.with_expiry_status(today, self.expiry_warning_days)).collect())
    }

    pub async fn get_document(&self, document_id: i64) -> Result<DocumentDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        let document = self.document_dao.get_document(&mut connection, document_id).await?;
        Ok(document.with_expiry_status(today(), self.expiry_warning_days))
    }

    /**
     * Reads a document with its file contents.
     */
    #[instrument(skip(self))]
    pub async fn download_document(&self, document_id: i64) -> Result<(DocumentDetailType, Vec<u8>), ApplicationError> {
        let document = self.get_document(document_id).await?;
        let data = self.file_storage.read(&document.storage_path).await?;
        Ok((document, data))
    }

    /**
     * Reads a document of an owner by its stored file name.
     *
     * # Arguments
     * `owner_type`: Owner type.
     * `owner_id`: Owner id.
     * `file_name`: Stored file name, without directories.
     */
    #[instrument(skip(self))]
    pub async fn download_owner_file(&self, owner_type: DocumentOwnerType, owner_id: i64, file_name: &str) -> Result<(DocumentDetailType, Vec<u8>), ApplicationError> {
        check_requested_file_name(file_name)?;
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        let document = self.document_dao.get_document_by_file_name(&mut connection, owner_type, owner_id, file_name).await?;
        let data = self.file_storage.read(&document.storage_path).await?;
        Ok((document, data))
    }

    /**
     * Changes type and dates of a document.
     */
    #[instrument(skip(self, document_input))]
    pub async fn update_document(&self, document_id: i64, document_input: DocumentUpdateInputType) -> Result<DocumentDetailType, ApplicationError> {
        let document_input = document_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.update_document_in(&mut transaction, document_id, document_input).await;
        finish(transaction, result).await
    }

    async fn update_document_in(&self, transaction: &mut PgConnection, document_id: i64, document_input: DocumentUpdateInputType) -> Result<DocumentDetailType, ApplicationError> {
        self.document_dao.update_document(transaction, document_id, document_input).await?;
        self.document_dao.get_document(transaction, document_id).await
    }

    /**
     * Deletes the document row, then its file. A file that cannot be deleted is logged only.
     */
    #[instrument(skip(self))]
    pub async fn delete_document(&self, document_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.document_dao.delete_document(&mut transaction, document_id).await;
        let storage_path = finish(transaction, result).await?;
        self.file_storage.delete_file(&storage_path).await;
        Ok(())
    }

    /**
     * Counts documents by expiry state.
     */
    pub async fn get_document_statistics(&self) -> Result<DocumentStatisticsType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        let warning_days = i32::try_from(self.expiry_warning_days).unwrap_or(i32::MAX);
        self.document_dao.get_document_statistics(&mut connection, today(), warning_days).await
    }

    /**
     * Documents expiring from today up to `days` days later.
     */
    pub async fn get_expiring_documents(&self, days: i64) -> Result<Vec<DocumentDetailType>, ApplicationError> {
        let (from, to) = expiry_window(today(), days)?;
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.document_dao.get_expiring_documents(&mut connection, from, to).await
    }
}


#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{
        dao::common::integration_test::init_db,
        model::enums::DocumentType,
        service::common::integration_test::{add_test_employee, pdf_file, test_storage},
    };

    fn upload_input(owner_id: i64) -> DocumentUploadInputType {
        DocumentUploadInputType { owner_type: DocumentOwnerType::Employee, owner_id, document_type: DocumentType::IdentityDocument, issue_date: None, expiry_date: None }
    }

    #[sqlx::test]
    async fn test_upload_for_missing_owner_stores_nothing() {
        let pool = init_db().await;
        let directory = tempfile::tempdir().unwrap();
        let document_service = DocumentService::new(test_storage(directory.path()), 30, Some(pool.clone()));
        let error = document_service.upload_document(upload_input(i64::MAX), pdf_file("documento.pdf")).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
        assert_eq!(std::fs::read_dir(directory.path()).unwrap().count(), 0);
    }

    #[sqlx::test]
    async fn test_upload_then_delete_document() {
        let pool = init_db().await;
        let directory = tempfile::tempdir().unwrap();
        let file_storage = test_storage(directory.path());
        let document_service = DocumentService::new(file_storage.clone(), 30, Some(pool.clone()));
        let employee_id = add_test_employee(&pool).await;
        let document = document_service.upload_document(upload_input(employee_id), pdf_file("documento.pdf")).await.unwrap();
        assert!(document.storage_path.starts_with(&format!("employees/{employee_id}/docs/")));
        assert_eq!(file_storage.read(&document.storage_path).await.unwrap(), b"%PDF-1.4".to_vec());
        document_service.delete_document(document.id).await.unwrap();
        assert_eq!(file_storage.read(&document.storage_path).await.unwrap_err().error_type, ErrorType::NotFound);
    }
}
