use std::sync::Arc;

use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{compliance::ComplianceDao, documents::DocumentDao, employees::EmployeeDao, projects::ProjectDao},
    model::{
        apperror::ApplicationError,
        documents::StorageLocation,
        enums::DocumentOwnerType,
        models::{ListOutputType, PaginationInput},
        registry::{ComplianceItemDetailType, ComplianceItemInputType, ComplianceItemListInputType, ComplianceItemValidInputType},
    },
    service::{
        common::{acquire, begin, check_reference, connection_pool, expiry_window, finish, today},
        storage::FileStorage,
    },
};

/**
 * Service for safety and medical compliance deadlines.
 */
pub struct ComplianceService {
    compliance_dao: ComplianceDao,
    employee_dao: EmployeeDao,
    project_dao: ProjectDao,
    document_dao: DocumentDao,
    file_storage: Arc<FileStorage>,
    connection_pool: Option<Pool<Postgres>>,
}

impl ComplianceService {
    pub fn new(file_storage: Arc<FileStorage>, connection_pool: Option<Pool<Postgres>>) -> Self {
        ComplianceService {
            compliance_dao: ComplianceDao::new(),
            employee_dao: EmployeeDao::new(),
            project_dao: ProjectDao::new(),
            document_dao: DocumentDao::new(),
            file_storage,
            connection_pool,
        }
    }

    pub async fn get_compliance_item(&self, compliance_item_id: i64) -> Result<ComplianceItemDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.compliance_dao.get_compliance_item(&mut connection, compliance_item_id).await
    }

    /**
     * Searches compliance items by due date, earliest first.
     */
    pub async fn get_compliance_item_list(&self, pagination_input: PaginationInput, filter: ComplianceItemListInputType) -> Result<ListOutputType<ComplianceItemDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.compliance_dao.get_compliance_item_list(&mut connection, pagination_input, filter, today()).await
    }

    /**
     * Items due from today up to `days` days later.
     *
     * # Arguments
     * `days`: Size of the window in days.
     * `limit`: Maximum number of items returned.
     */
    pub async fn get_upcoming_compliance_items(&self, days: i64, limit: i64) -> Result<Vec<ComplianceItemDetailType>, ApplicationError> {
        let (from, to) = expiry_window(today(), days)?;
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.compliance_dao.get_upcoming_compliance_items(&mut connection, from, to, limit).await
    }

    #[instrument(skip(self, compliance_item_input))]
    pub async fn add_compliance_item(&self, compliance_item_input: ComplianceItemInputType) -> Result<ComplianceItemDetailType, ApplicationError> {
        let compliance_item_input = compliance_item_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_compliance_item_in(&mut transaction, None, compliance_item_input).await;
        finish(transaction, result).await
    }

    #[instrument(skip(self, compliance_item_input))]
    pub async fn update_compliance_item(&self, compliance_item_id: i64, compliance_item_input: ComplianceItemInputType) -> Result<ComplianceItemDetailType, ApplicationError> {
        let compliance_item_input = compliance_item_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_compliance_item_in(&mut transaction, Some(compliance_item_id), compliance_item_input).await;
        finish(transaction, result).await
    }

    async fn save_compliance_item_in(
        &self,
        transaction: &mut PgConnection,
        compliance_item_id: Option<i64>,
        compliance_item_input: ComplianceItemValidInputType,
    ) -> Result<ComplianceItemDetailType, ApplicationError> {
        if let Some(employee_id) = compliance_item_input.employee_id {
            check_reference(self.employee_dao.employee_exists(transaction, employee_id).await?, "Employee", employee_id)?;
        }
        if let Some(project_id) = compliance_item_input.project_id {
            check_reference(self.project_dao.project_exists(transaction, project_id).await?, "Project", project_id)?;
        }
        let compliance_item_id = match compliance_item_id {
            Some(compliance_item_id) => {
                self.compliance_dao.update_compliance_item(transaction, compliance_item_id, compliance_item_input).await?;
                compliance_item_id
            }
            None => self.compliance_dao.add_compliance_item(transaction, compliance_item_input).await?,
        };
        self.compliance_dao.get_compliance_item(transaction, compliance_item_id).await
    }

    /**
     * Deletes a compliance item with its documents and its own directory.
     */
    #[instrument(skip(self))]
    pub async fn delete_compliance_item(&self, compliance_item_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_compliance_item_in(&mut transaction, compliance_item_id).await;
        let storage_paths = finish(transaction, result).await?;
        self.file_storage.delete_files(&storage_paths).await;
        self.file_storage.delete_directory(&StorageLocation::Compliance(compliance_item_id).directory()).await;
        Ok(())
    }

    async fn delete_compliance_item_in(&self, transaction: &mut PgConnection, compliance_item_id: i64) -> Result<Vec<String>, ApplicationError> {
        let storage_paths = self.document_dao.delete_documents_for_owner(transaction, DocumentOwnerType::ComplianceItem, compliance_item_id).await?;
        self.compliance_dao.delete_compliance_item(transaction, compliance_item_id).await?;
        Ok(storage_paths)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{apperror::ErrorType, config::StorageConfig};

    #[actix_web::test]
    async fn test_missing_due_date_is_rejected() {
        let service = ComplianceService::new(Arc::new(FileStorage::new(&StorageConfig::default())), None);
        let input = ComplianceItemInputType { category: Some("Visita medica".to_string()), employee_id: None, project_id: None, description: None, visit_date: None, periodicity: None, due_date: None };
        assert_eq!(service.add_compliance_item(input).await.unwrap_err().error_type, ErrorType::Validation);
    }

    #[actix_web::test]
    async fn test_negative_window_is_rejected() {
        let service = ComplianceService::new(Arc::new(FileStorage::new(&StorageConfig::default())), None);
        assert_eq!(service.get_upcoming_compliance_items(-1, 5).await.unwrap_err().error_type, ErrorType::Validation);
    }
}
