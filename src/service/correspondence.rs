use std::sync::Arc;

use chrono::Datelike;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::{info, instrument};

use crate::{
    dao::{correspondence::CorrespondenceDao, documents::DocumentDao},
    model::{
        apperror::ApplicationError,
        dashboard::NO_PROTOCOL,
        documents::StorageLocation,
        enums::{CorrespondenceType, DocumentOwnerType},
        models::{ListOutputType, PaginationInput},
        registry::{CorrespondenceDetailType, CorrespondenceInputType, CorrespondenceListInputType, format_protocol},
    },
    service::{
        common::{acquire, begin, connection_pool, finish, today},
        storage::FileStorage,
    },
};

/**
 * Progressive number to register: the given one, or the next after `max_progressive` when zero.
 */
pub fn resolve_progressive(progressive: i32, max_progressive: i32) -> i32 {
    if progressive == 0 { max_progressive + 1 } else { progressive }
}

/**
 * Protocol text of the last record, `--` when there is none.
 */
pub fn last_protocol_text(last: Option<(i32, i32)>) -> String {
    match last {
        Some((progressive, year)) => format_protocol(progressive, year),
        None => NO_PROTOCOL.to_string(),
    }
}

/**
 * Service for the correspondence register.
 */
pub struct CorrespondenceService {
    correspondence_dao: CorrespondenceDao,
    document_dao: DocumentDao,
    file_storage: Arc<FileStorage>,
    connection_pool: Option<Pool<Postgres>>,
}

impl CorrespondenceService {
    pub fn new(file_storage: Arc<FileStorage>, connection_pool: Option<Pool<Postgres>>) -> Self {
        CorrespondenceService { correspondence_dao: CorrespondenceDao::new(), document_dao: DocumentDao::new(), file_storage, connection_pool }
    }

    pub async fn get_correspondence(&self, correspondence_id: i64) -> Result<CorrespondenceDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        Ok(self.correspondence_dao.get_correspondence(&mut connection, correspondence_id).await?.with_protocol())
    }

    pub async fn get_correspondence_list(&self, pagination_input: PaginationInput, filter: CorrespondenceListInputType) -> Result<ListOutputType<CorrespondenceDetailType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        let mut list = self.correspondence_dao.get_correspondence_list(&mut connection, pagination_input, filter).await?;
        list.elements = list.elements.into_iter().map(CorrespondenceDetailType::with_protocol).collect();
        Ok(list)
    }

    /**
     * Years with registered correspondence, newest first.
     */
    pub async fn get_years(&self) -> Result<Vec<i32>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.correspondence_dao.get_years(&mut connection).await
    }

    /**
     * Protocol of the most recent record of a type.
     */
    pub async fn get_last_protocol(&self, correspondence_type: CorrespondenceType) -> Result<String, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        let last = self.correspondence_dao.get_last_protocol(&mut connection, correspondence_type).await?;
        Ok(last_protocol_text(last))
    }

    /**
     * Registers a record.
     *
     * # Arguments
     * `correspondence_input`: The record. A zero progressive takes the next free number of its
     * year and type.
     *
     * # Returns
     * The registered record with its protocol.
     */
    #[instrument(skip(self, correspondence_input), fields(correspondence_type = ?correspondence_input.correspondence_type))]
    pub async fn register_correspondence(&self, correspondence_input: CorrespondenceInputType) -> Result<CorrespondenceDetailType, ApplicationError> {
        let correspondence_input = correspondence_input.validate(today())?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_correspondence_in(&mut transaction, None, correspondence_input).await;
        let correspondence = finish(transaction, result).await?;
        info!("Registered protocol {} ({:?})", correspondence.protocol, correspondence.correspondence_type);
        Ok(correspondence)
    }

    #[instrument(skip(self, correspondence_input))]
    pub async fn update_correspondence(&self, correspondence_id: i64, correspondence_input: CorrespondenceInputType) -> Result<CorrespondenceDetailType, ApplicationError> {
        let correspondence_input = correspondence_input.validate(today())?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_correspondence_in(&mut transaction, Some(correspondence_id), correspondence_input).await;
        finish(transaction, result).await
    }

    async fn save_correspondence_in(
        &self,
        transaction: &mut PgConnection,
        correspondence_id: Option<i64>,
        mut correspondence_input: CorrespondenceInputType,
    ) -> Result<CorrespondenceDetailType, ApplicationError> {
        let year = correspondence_input.year.unwrap_or_else(|| correspondence_input.correspondence_date.unwrap_or_else(today).year());
        if correspondence_input.progressive == 0 {
            let max_progressive = self.correspondence_dao.get_max_progressive(transaction, year, correspondence_input.correspondence_type).await?;
            correspondence_input.progressive = resolve_progressive(correspondence_input.progressive, max_progressive);
        }
        let correspondence_id = match correspondence_id {
            Some(correspondence_id) => {
                self.correspondence_dao.update_correspondence(transaction, correspondence_id, year, correspondence_input).await?;
                correspondence_id
            }
            None => self.correspondence_dao.add_correspondence(transaction, year, correspondence_input).await?,
        };
        Ok(self.correspondence_dao.get_correspondence(transaction, correspondence_id).await?.with_protocol())
    }

    #[instrument(skip(self))]
    pub async fn delete_correspondence(&self, correspondence_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_correspondence_in(&mut transaction, correspondence_id).await;
        let storage_paths = finish(transaction, result).await?;
        self.file_storage.delete_files(&storage_paths).await;
        self.file_storage.delete_directory(&StorageLocation::Correspondence(correspondence_id).directory()).await;
        Ok(())
    }

    async fn delete_correspondence_in(&self, transaction: &mut PgConnection, correspondence_id: i64) -> Result<Vec<String>, ApplicationError> {
        let storage_paths = self.document_dao.delete_documents_for_owner(transaction, DocumentOwnerType::Correspondence, correspondence_id).await?;
        self.correspondence_dao.delete_correspondence(transaction, correspondence_id).await?;
        Ok(storage_paths)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve_progressive() {
        assert_eq!(resolve_progressive(0, 0), 1);
        assert_eq!(resolve_progressive(0, 41), 42);
        assert_eq!(resolve_progressive(7, 41), 7);
    }

    #[test]
    fn test_last_protocol_text() {
        assert_eq!(last_protocol_text(None), "--");
        assert_eq!(last_protocol_text(Some((7, 2024))), "007/2024");
        assert_eq!(last_protocol_text(Some((1234, 2024))), "1234/2024");
    }
}
