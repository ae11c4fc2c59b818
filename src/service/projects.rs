use std::sync::Arc;

use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{documents::DocumentDao, employees::EmployeeDao, projects::ProjectDao},
    model::{
        apperror::{ApplicationError, ErrorType},
        documents::StorageLocation,
        enums::DocumentOwnerType,
        models::{ListOutputType, PaginationInput},
        registry::{ProjectDetailType, ProjectInputType, ProjectListInputType},
    },
    service::{
        common::{acquire, begin, check_reference, connection_pool, finish},
        storage::FileStorage,
    },
};

/**
 * Service for projects.
 */
pub struct ProjectService {
    project_dao: ProjectDao,
    employee_dao: EmployeeDao,
    document_dao: DocumentDao,
    file_storage: Arc<FileStorage>,
    connection_pool: Option<Pool<Postgres>>,
}

impl ProjectService {
    pub fn new(file_storage: Arc<FileStorage>, connection_pool: Option<Pool<Postgres>>) -> Self {
        ProjectService { project_dao: ProjectDao::new(), employee_dao: EmployeeDao::new(), document_dao: DocumentDao::new(), file_storage, connection_pool }
    }

    pub async fn get_project(&self, project_id: i64) -> Result<ProjectDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.project_dao.get_project(&mut connection, project_id).await
    }

    pub async fn get_project_list(&self, pagination_input: PaginationInput, filter: ProjectListInputType) -> Result<ListOutputType<ProjectDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.project_dao.get_project_list(&mut connection, pagination_input, filter).await
    }

    /**
     * Adds a project. The code must not be used by another project.
     */
    #[instrument(skip(self, project_input), fields(code = %project_input.code))]
    pub async fn add_project(&self, project_input: ProjectInputType) -> Result<ProjectDetailType, ApplicationError> {
        let project_input = project_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_project_in(&mut transaction, None, project_input).await;
        finish(transaction, result).await
    }

    #[instrument(skip(self, project_input))]
    pub async fn update_project(&self, project_id: i64, project_input: ProjectInputType) -> Result<ProjectDetailType, ApplicationError> {
        let project_input = project_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_project_in(&mut transaction, Some(project_id), project_input).await;
        finish(transaction, result).await
    }

    async fn save_project_in(&self, transaction: &mut PgConnection, project_id: Option<i64>, project_input: ProjectInputType) -> Result<ProjectDetailType, ApplicationError> {
        if self.project_dao.code_in_use(transaction, &project_input.code, project_id).await? {
            return Err(ApplicationError::with_errors(ErrorType::ConstraintViolation, "Project already exists".to_string(), vec![format!("code: {} already in use", project_input.code)]));
        }
        if let Some(manager_id) = project_input.manager_id {
            check_reference(self.employee_dao.employee_exists(transaction, manager_id).await?, "Employee", manager_id)?;
        }
        let project_id = match project_id {
            Some(project_id) => {
                self.project_dao.update_project(transaction, project_id, project_input).await?;
                project_id
            }
            None => self.project_dao.add_project(transaction, project_input).await?,
        };
        self.project_dao.get_project(transaction, project_id).await
    }

    /**
     * Deletes a project and its documents. Records referring to it lose the reference.
     */
    #[instrument(skip(self))]
    pub async fn delete_project(&self, project_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_project_in(&mut transaction, project_id).await;
        let storage_paths = finish(transaction, result).await?;
        self.file_storage.delete_files(&storage_paths).await;
        self.file_storage.delete_directory(&StorageLocation::Project(project_id).directory()).await;
        Ok(())
    }

    async fn delete_project_in(&self, transaction: &mut PgConnection, project_id: i64) -> Result<Vec<String>, ApplicationError> {
        let storage_paths = self.document_dao.delete_documents_for_owner(transaction, DocumentOwnerType::Project, project_id).await?;
        self.project_dao.delete_project(transaction, project_id).await?;
        Ok(storage_paths)
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{
        dao::{common::integration_test::init_db, projects::integration_test::project_input},
        model::{documents::DocumentUploadInputType, enums::DocumentType, registry::ComplianceItemInputType},
        service::{
            common::integration_test::{pdf_file, test_storage, unique_code},
            compliance::ComplianceService,
            documents::DocumentService,
        },
    };
    use chrono::NaiveDate;

    #[sqlx::test]
    async fn test_delete_project_keeps_compliance_files() {
        let pool = init_db().await;
        let directory = tempfile::tempdir().unwrap();
        let file_storage = test_storage(directory.path());
        let project_service = ProjectService::new(file_storage.clone(), Some(pool.clone()));
        let compliance_service = ComplianceService::new(file_storage.clone(), Some(pool.clone()));
        let document_service = DocumentService::new(file_storage.clone(), 30, Some(pool.clone()));
        let project = project_service.add_project(project_input(&unique_code("P", 12))).await.unwrap();
        let compliance_item = compliance_service
            .add_compliance_item(ComplianceItemInputType {
                category: Some("Sicurezza cantiere".to_string()),
                employee_id: None,
                project_id: Some(project.id),
                description: None,
                visit_date: None,
                periodicity: None,
                due_date: NaiveDate::from_ymd_opt(2030, 1, 31),
            })
            .await
            .unwrap();
        let upload_input = DocumentUploadInputType { owner_type: DocumentOwnerType::ComplianceItem, owner_id: compliance_item.id, document_type: DocumentType::Certificate, issue_date: None, expiry_date: None };
        let document = document_service.upload_document(upload_input, pdf_file("attestato.pdf")).await.unwrap();
        assert!(document.storage_path.starts_with(&format!("compliance/{}/docs/", compliance_item.id)));

        project_service.delete_project(project.id).await.unwrap();

        assert_eq!(project_service.get_project(project.id).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(compliance_service.get_compliance_item(compliance_item.id).await.unwrap().project_id, None);
        assert!(file_storage.read(&document.storage_path).await.is_ok());
        assert!(document_service.get_document(document.id).await.is_ok());
        compliance_service.delete_compliance_item(compliance_item.id).await.unwrap();
        assert!(!directory.path().join(StorageLocation::Compliance(compliance_item.id).directory()).exists());
    }
}
