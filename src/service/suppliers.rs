use std::sync::Arc;

use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{documents::DocumentDao, suppliers::SupplierDao},
    model::{
        apperror::ApplicationError,
        documents::StorageLocation,
        enums::DocumentOwnerType,
        models::{ListOutputType, PaginationInput},
        registry::{SupplierDetailType, SupplierInputType, SupplierListInputType},
    },
    service::{
        common::{acquire, begin, connection_pool, finish},
        storage::FileStorage,
    },
};

/**
 * Service for suppliers.
 */
pub struct SupplierService {
    supplier_dao: SupplierDao,
    document_dao: DocumentDao,
    file_storage: Arc<FileStorage>,
    connection_pool: Option<Pool<Postgres>>,
}

impl SupplierService {
    pub fn new(file_storage: Arc<FileStorage>, connection_pool: Option<Pool<Postgres>>) -> Self {
        SupplierService { supplier_dao: SupplierDao::new(), document_dao: DocumentDao::new(), file_storage, connection_pool }
    }

    pub async fn get_supplier(&self, supplier_id: i64) -> Result<SupplierDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.supplier_dao.get_supplier(&mut connection, supplier_id).await
    }

    pub async fn get_supplier_list(&self, pagination_input: PaginationInput, filter: SupplierListInputType) -> Result<ListOutputType<SupplierDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.supplier_dao.get_supplier_list(&mut connection, pagination_input, filter).await
    }

    #[instrument(skip(self, supplier_input), fields(name = %supplier_input.name))]
    pub async fn add_supplier(&self, supplier_input: SupplierInputType) -> Result<SupplierDetailType, ApplicationError> {
        let supplier_input = supplier_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.add_supplier_in(&mut transaction, supplier_input).await;
        finish(transaction, result).await
    }

    async fn add_supplier_in(&self, transaction: &mut PgConnection, supplier_input: SupplierInputType) -> Result<SupplierDetailType, ApplicationError> {
        let supplier_id = self.supplier_dao.add_supplier(transaction, supplier_input).await?;
        self.supplier_dao.get_supplier(transaction, supplier_id).await
    }

    #[instrument(skip(self, supplier_input))]
    pub async fn update_supplier(&self, supplier_id: i64, supplier_input: SupplierInputType) -> Result<SupplierDetailType, ApplicationError> {
        let supplier_input = supplier_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.update_supplier_in(&mut transaction, supplier_id, supplier_input).await;
        finish(transaction, result).await
    }

    async fn update_supplier_in(&self, transaction: &mut PgConnection, supplier_id: i64, supplier_input: SupplierInputType) -> Result<SupplierDetailType, ApplicationError> {
        self.supplier_dao.update_supplier(transaction, supplier_id, supplier_input).await?;
        self.supplier_dao.get_supplier(transaction, supplier_id).await
    }

    /**
     * Deletes a supplier and its documents. Suppliers still referenced by contracts, vehicles or
     * policies are kept and reported as a constraint violation.
     */
    #[instrument(skip(self))]
    pub async fn delete_supplier(&self, supplier_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_supplier_in(&mut transaction, supplier_id).await;
        let storage_paths = finish(transaction, result).await?;
        self.file_storage.delete_files(&storage_paths).await;
        self.file_storage.delete_directory(&StorageLocation::Supplier(supplier_id).directory()).await;
        Ok(())
    }

    async fn delete_supplier_in(&self, transaction: &mut PgConnection, supplier_id: i64) -> Result<Vec<String>, ApplicationError> {
        let storage_paths = self.document_dao.delete_documents_for_owner(transaction, DocumentOwnerType::Supplier, supplier_id).await?;
        self.supplier_dao.delete_supplier(transaction, supplier_id).await?;
        Ok(storage_paths)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{apperror::ErrorType, config::StorageConfig, models::FullAddress};

    #[actix_web::test]
    async fn test_blank_name_is_rejected() {
        let service = SupplierService::new(Arc::new(FileStorage::new(&StorageConfig::default())), None);
        let input = SupplierInputType {
            name: "  ".to_string(),
            vat_number: None,
            company_phone: None,
            company_email: None,
            pec: None,
            iban: None,
            sdi_code: None,
            address: FullAddress::default(),
        };
        assert_eq!(service.add_supplier(input).await.unwrap_err().error_type, ErrorType::Validation);
    }
}
