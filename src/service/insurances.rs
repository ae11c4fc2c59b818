use std::sync::Arc;

use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{documents::DocumentDao, insurances::InsuranceDao, projects::ProjectDao, suppliers::SupplierDao},
    model::{
        apperror::ApplicationError,
        documents::StorageLocation,
        enums::DocumentOwnerType,
        models::{ListOutputType, PaginationInput},
        registry::{InsuranceDetailType, InsuranceInputType, InsuranceListInputType},
    },
    service::{
        common::{acquire, begin, check_reference, connection_pool, expiry_window, finish, today},
        storage::FileStorage,
    },
};

/**
 * Service for insurance policies.
 */
pub struct InsuranceService {
    insurance_dao: InsuranceDao,
    supplier_dao: SupplierDao,
    project_dao: ProjectDao,
    document_dao: DocumentDao,
    file_storage: Arc<FileStorage>,
    connection_pool: Option<Pool<Postgres>>,
}

impl InsuranceService {
    pub fn new(file_storage: Arc<FileStorage>, connection_pool: Option<Pool<Postgres>>) -> Self {
        InsuranceService {
            insurance_dao: InsuranceDao::new(),
            supplier_dao: SupplierDao::new(),
            project_dao: ProjectDao::new(),
            document_dao: DocumentDao::new(),
            file_storage,
            connection_pool,
        }
    }

    pub async fn get_insurance(&self, insurance_id: i64) -> Result<InsuranceDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.insurance_dao.get_insurance(&mut connection, insurance_id).await
    }

    pub async fn get_insurance_list(&self, pagination_input: PaginationInput, filter: InsuranceListInputType) -> Result<ListOutputType<InsuranceDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.insurance_dao.get_insurance_list(&mut connection, pagination_input, filter).await
    }

    /**
     * Policies expiring between today and `days` days from now.
     */
    pub async fn get_expiring_insurances(&self, days: i64) -> Result<Vec<InsuranceDetailType>, ApplicationError> {
        let (from, to) = expiry_window(today(), days)?;
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.insurance_dao.get_expiring_insurances(&mut connection, from, to).await
    }

    #[instrument(skip(self, insurance_input), fields(policy_number = %insurance_input.policy_number))]
    pub async fn add_insurance(&self, insurance_input: InsuranceInputType) -> Result<InsuranceDetailType, ApplicationError> {
        let insurance_input = insurance_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_insurance_in(&mut transaction, None, insurance_input).await;
        finish(transaction, result).await
    }

    #[instrument(skip(self, insurance_input))]
    pub async fn update_insurance(&self, insurance_id: i64, insurance_input: InsuranceInputType) -> Result<InsuranceDetailType, ApplicationError> {
        let insurance_input = insurance_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_insurance_in(&mut transaction, Some(insurance_id), insurance_input).await;
        finish(transaction, result).await
    }

    async fn save_insurance_in(&self, transaction: &mut PgConnection, insurance_id: Option<i64>, insurance_input: InsuranceInputType) -> Result<InsuranceDetailType, ApplicationError> {
        if let Some(supplier_id) = insurance_input.supplier_id {
            check_reference(self.supplier_dao.supplier_exists(transaction, supplier_id).await?, "Supplier", supplier_id)?;
        }
        if let Some(project_id) = insurance_input.project_id {
            check_reference(self.project_dao.project_exists(transaction, project_id).await?, "Project", project_id)?;
        }
        let insurance_id = match insurance_id {
            Some(insurance_id) => {
                self.insurance_dao.update_insurance(transaction, insurance_id, insurance_input).await?;
                insurance_id
            }
            None => self.insurance_dao.add_insurance(transaction, insurance_input).await?,
        };
        self.insurance_dao.get_insurance(transaction, insurance_id).await
    }

    /**
     * Deletes a policy with its documents and policy directory.
     */
    #[instrument(skip(self))]
    pub async fn delete_insurance(&self, insurance_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_insurance_in(&mut transaction, insurance_id).await;
        let (project_id, storage_paths) = finish(transaction, result).await?;
        self.file_storage.delete_files(&storage_paths).await;
        self.file_storage.delete_directory(&StorageLocation::Policy { project_id, insurance_id }.directory()).await;
        Ok(())
    }

    async fn delete_insurance_in(&self, transaction: &mut PgConnection, insurance_id: i64) -> Result<(Option<i64>, Vec<String>), ApplicationError> {
        let insurance = self.insurance_dao.get_insurance(transaction, insurance_id).await?;
        let storage_paths = self.document_dao.delete_documents_for_owner(transaction, DocumentOwnerType::Insurance, insurance_id).await?;
        self.insurance_dao.delete_insurance(transaction, insurance_id).await?;
        Ok((insurance.project_id, storage_paths))
    }
}
