use std::sync::Arc;

use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{contracts::ContractDao, documents::DocumentDao, projects::ProjectDao, suppliers::SupplierDao},
    model::{
        apperror::{ApplicationError, ErrorType},
        documents::StorageLocation,
        enums::DocumentOwnerType,
        models::{ListOutputType, PaginationInput},
        registry::{ContractDetailType, ContractInputType, ContractListInputType, ContractStatisticsType, ContractValidInputType},
    },
    service::{
        common::{acquire, begin, check_reference, connection_pool, finish, today},
        storage::FileStorage,
    },
};

/**
 * Service for supplier contracts.
 */
pub struct ContractService {
    contract_dao: ContractDao,
    supplier_dao: SupplierDao,
    project_dao: ProjectDao,
    document_dao: DocumentDao,
    file_storage: Arc<FileStorage>,
    connection_pool: Option<Pool<Postgres>>,
}

impl ContractService {
    pub fn new(file_storage: Arc<FileStorage>, connection_pool: Option<Pool<Postgres>>) -> Self {
        ContractService {
            contract_dao: ContractDao::new(),
            supplier_dao: SupplierDao::new(),
            project_dao: ProjectDao::new(),
            document_dao: DocumentDao::new(),
            file_storage,
            connection_pool,
        }
    }

    pub async fn get_contract(&self, contract_id: i64) -> Result<ContractDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.contract_dao.get_contract(&mut connection, contract_id).await
    }

    pub async fn get_contract_list(&self, pagination_input: PaginationInput, filter: ContractListInputType) -> Result<ListOutputType<ContractDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.contract_dao.get_contract_list(&mut connection, pagination_input, filter).await
    }

    /**
     * Counts draft, active, expiring and expired contracts as of today.
     */
    pub async fn get_contract_statistics(&self) -> Result<ContractStatisticsType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.contract_dao.get_contract_statistics(&mut connection, today()).await
    }

    /**
     * Adds a contract. The supplier is required and must exist.
     *
     * # Arguments
     * `contract_input`: The contract to add.
     *
     * # Returns
     * The stored contract with its gross amount and duration.
     */
    #[instrument(skip(self, contract_input))]
    pub async fn add_contract(&self, contract_input: ContractInputType) -> Result<ContractDetailType, ApplicationError> {
        let contract_input = validate_contract(contract_input)?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_contract_in(&mut transaction, None, contract_input).await;
        finish(transaction, result).await
    }

    #[instrument(skip(self, contract_input))]
    pub async fn update_contract(&self, contract_id: i64, contract_input: ContractInputType) -> Result<ContractDetailType, ApplicationError> {
        let contract_input = validate_contract(contract_input)?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_contract_in(&mut transaction, Some(contract_id), contract_input).await;
        finish(transaction, result).await
    }

    async fn save_contract_in(&self, transaction: &mut PgConnection, contract_id: Option<i64>, contract_input: ContractValidInputType) -> Result<ContractDetailType, ApplicationError> {
        if let Some(supplier_id) = contract_input.supplier_id {
            check_reference(self.supplier_dao.supplier_exists(transaction, supplier_id).await?, "Supplier", supplier_id)?;
        }
        if let Some(project_id) = contract_input.project_id {
            check_reference(self.project_dao.project_exists(transaction, project_id).await?, "Project", project_id)?;
        }
        let contract_id = match contract_id {
            Some(contract_id) => {
                self.contract_dao.update_contract(transaction, contract_id, contract_input).await?;
                contract_id
            }
            None => self.contract_dao.add_contract(transaction, contract_input).await?,
        };
        self.contract_dao.get_contract(transaction, contract_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_contract(&self, contract_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_contract_in(&mut transaction, contract_id).await;
        let storage_paths = finish(transaction, result).await?;
        self.file_storage.delete_files(&storage_paths).await;
        self.file_storage.delete_directory(&StorageLocation::Contract(contract_id).directory()).await;
        Ok(())
    }

    async fn delete_contract_in(&self, transaction: &mut PgConnection, contract_id: i64) -> Result<Vec<String>, ApplicationError> {
        let storage_paths = self.document_dao.delete_documents_for_owner(transaction, DocumentOwnerType::Contract, contract_id).await?;
        self.contract_dao.delete_contract(transaction, contract_id).await?;
        Ok(storage_paths)
    }
}

/**
 * Validates the contract fields and requires a supplier.
 */
fn validate_contract(contract_input: ContractInputType) -> Result<ContractValidInputType, ApplicationError> {
    let missing_supplier = contract_input.supplier_id.is_none();
    match contract_input.validate() {
        Ok(_) if missing_supplier => Err(ApplicationError::with_errors(ErrorType::Validation, "Invalid contract".to_string(), vec!["supplierId: required".to_string()])),
        Ok(contract_input) => Ok(contract_input),
        Err(mut err) => {
            if missing_supplier {
                err.errors.push("supplierId: required".to_string());
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::enums::SupplierContractType;

    #[test]
    fn test_supplier_is_required() {
        let input = ContractInputType { contract_type: Some(SupplierContractType::Lavori), subject: Some("Manutenzione".to_string()), ..ContractInputType::default() };
        let error = validate_contract(input).unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.errors, vec!["supplierId: required".to_string()]);
    }

    #[test]
    fn test_all_errors_reported() {
        let error = validate_contract(ContractInputType::default()).unwrap_err();
        assert_eq!(error.errors.len(), 3);
    }

    #[test]
    fn test_valid_contract() {
        let input = ContractInputType { supplier_id: Some(3), contract_type: Some(SupplierContractType::Servizi), subject: Some("Pulizie".to_string()), ..ContractInputType::default() };
        let contract = validate_contract(input).unwrap();
        assert_eq!(contract.supplier_id, Some(3));
        assert!(!contract.needs_durc);
    }
}
