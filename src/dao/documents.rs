use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, query_error},
    model::{
        apperror::ApplicationError,
        documents::{DocumentAddInputType, DocumentDetailType, DocumentStatisticsType, DocumentUpdateInputType},
        enums::DocumentOwnerType,
    },
};

const QUERY_DOCUMENT: &str = "SELECT id, owner_type, owner_id, document_type, storage_path, file_name, original_filename, content_type, file_size, issue_date, expiry_date, uploaded_at
                              FROM documents WHERE id = $1";

const QUERY_DOCUMENT_BY_FILE_NAME: &str = "SELECT id, owner_type, owner_id, document_type, storage_path, file_name, original_filename, content_type, file_size, issue_date,
                                                  expiry_date, uploaded_at
                                           FROM documents WHERE owner_type = $1 AND owner_id = $2 AND file_name = $3";

const QUERY_DOCUMENTS_FOR_OWNER: &str = "SELECT id, owner_type, owner_id, document_type, storage_path, file_name, original_filename, content_type, file_size, issue_date,
                                                expiry_date, uploaded_at
                                         FROM documents WHERE owner_type = $1 AND owner_id = $2
                                         ORDER BY uploaded_at DESC, id DESC";

const QUERY_EXPIRING_DOCUMENTS: &str = "SELECT id, owner_type, owner_id, document_type, storage_path, file_name, original_filename, content_type, file_size, issue_date,
                                               expiry_date, uploaded_at
                                        FROM documents WHERE expiry_date BETWEEN $1 AND $2
                                        ORDER BY expiry_date, id";

/**
 * Buckets mirror `expiry_bucket`: expired before today, expiring soon up to today plus the warning days.
 */
const QUERY_DOCUMENT_STATISTICS: &str = "SELECT
                                             count(*) FILTER (WHERE expiry_date > $1::date + $2::integer) AS valid,
                                             count(*) FILTER (WHERE expiry_date >= $1 AND expiry_date <= $1::date + $2::integer) AS expiring_soon,
                                             count(*) FILTER (WHERE expiry_date < $1) AS expired,
                                             count(*) FILTER (WHERE expiry_date IS NULL) AS no_expiry
                                         FROM documents";

const ADD_DOCUMENT: &str = "INSERT INTO documents (owner_type, owner_id, document_type, storage_path, file_name, original_filename, content_type, file_size, issue_date, expiry_date)
                            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                            RETURNING id";

const UPDATE_DOCUMENT: &str = "UPDATE documents SET document_type = $1, issue_date = $2, expiry_date = $3 WHERE id = $4";

const DELETE_DOCUMENT: &str = "DELETE FROM documents WHERE id = $1 RETURNING storage_path";

const DELETE_DOCUMENTS_FOR_OWNER: &str = "DELETE FROM documents WHERE owner_type = $1 AND owner_id = $2 RETURNING storage_path";

const DELETE_DOCUMENTS_FOR_OWNERS: &str = "DELETE FROM documents WHERE owner_type = $1 AND owner_id = ANY($2) RETURNING storage_path";

/**
 * Maintenance and assignment documents of a vehicle, whose rows cascade with the vehicle.
 */
const DELETE_VEHICLE_CHILD_DOCUMENTS: &str = "DELETE FROM documents
                                              WHERE (owner_type = 'MAINTENANCE' AND owner_id IN (SELECT id FROM maintenance WHERE vehicle_id = $1)) OR
                                                    (owner_type = 'ASSIGNMENT' AND owner_id IN (SELECT id FROM assignments WHERE vehicle_id = $1))
                                              RETURNING storage_path";

/**
 * DAO for document metadata. File contents live in file storage.
 */
pub struct DocumentDao {}

impl DocumentDao {
    pub fn new() -> Self {
        DocumentDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_document(&self, connection: &mut PgConnection, document_id: i64) -> Result<DocumentDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let document: Option<DocumentDetailType> = sqlx::query_as(QUERY_DOCUMENT)
            .bind(document_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get document", &err))?;
        found(document, "Document", document_id)
    }

    /**
     * Finds a document of an owner by its stored file name.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_document_by_file_name(&self, connection: &mut PgConnection, owner_type: DocumentOwnerType, owner_id: i64, file_name: &str) -> Result<DocumentDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let document: Option<DocumentDetailType> = sqlx::query_as(QUERY_DOCUMENT_BY_FILE_NAME)
            .bind(owner_type)
            .bind(owner_id)
            .bind(file_name)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get document by file name", &err))?;
        found(document, "Document for owner", owner_id)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_documents_for_owner(&self, connection: &mut PgConnection, owner_type: DocumentOwnerType, owner_id: i64) -> Result<Vec<DocumentDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_DOCUMENTS_FOR_OWNER)
            .bind(owner_type)
            .bind(owner_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get documents for owner", &err))
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_expiring_documents(&self, connection: &mut PgConnection, from: NaiveDate, to: NaiveDate) -> Result<Vec<DocumentDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_EXPIRING_DOCUMENTS)
            .bind(from)
            .bind(to)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get expiring documents", &err))
    }

    /**
     * Counts documents per expiry bucket.
     *
     * # Arguments
     * `connection`: The database connection.
     * `today`: Reference date.
     * `warning_days`: Documents expiring within this many days count as expiring soon.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_document_statistics(&self, connection: &mut PgConnection, today: NaiveDate, warning_days: i32) -> Result<DocumentStatisticsType, ApplicationError> {
        let span = tracing::Span::current();
        let counts: (i64, i64, i64, i64) = sqlx::query_as(QUERY_DOCUMENT_STATISTICS)
            .bind(today)
            .bind(warning_days)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get document statistics", &err))?;
        Ok(DocumentStatisticsType::from_counts(counts.0, counts.1, counts.2, counts.3))
    }

    #[instrument(skip(self, transaction, document_input), fields(result))]
    pub async fn add_document(&self, transaction: &mut PgConnection, document_input: DocumentAddInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_DOCUMENT)
            .bind(document_input.owner_type)
            .bind(document_input.owner_id)
            .bind(document_input.document_type)
            .bind(document_input.storage_path)
            .bind(document_input.file_name)
            .bind(document_input.original_filename)
            .bind(document_input.content_type)
            .bind(document_input.file_size)
            .bind(document_input.issue_date)
            .bind(document_input.expiry_date)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction, document_input), fields(result))]
    pub async fn update_document(&self, transaction: &mut PgConnection, document_id: i64, document_input: DocumentUpdateInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_DOCUMENT)
            .bind(document_input.document_type)
            .bind(document_input.issue_date)
            .bind(document_input.expiry_date)
            .bind(document_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Document", document_id, "updated")
    }

    /**
     * Deletes a document row.
     *
     * # Returns
     * Storage path of the deleted document.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_document(&self, transaction: &mut PgConnection, document_id: i64) -> Result<String, ApplicationError> {
        let span = tracing::Span::current();
        let deleted: Option<(String,)> = sqlx::query_as(DELETE_DOCUMENT)
            .bind(document_id)
            .fetch_optional(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        found(deleted.map(|path| path.0), "Document", document_id)
    }

    /**
     * Deletes every document row of an owner.
     *
     * # Returns
     * Storage paths of the deleted documents.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_documents_for_owner(&self, transaction: &mut PgConnection, owner_type: DocumentOwnerType, owner_id: i64) -> Result<Vec<String>, ApplicationError> {
        let span = tracing::Span::current();
        let deleted: Vec<(String,)> = sqlx::query_as(DELETE_DOCUMENTS_FOR_OWNER)
            .bind(owner_type)
            .bind(owner_id)
            .fetch_all(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(deleted.into_iter().map(|path| path.0).collect())
    }

    /**
     * Deletes every document row of several owners of one type.
     *
     * # Returns
     * Storage paths of the deleted documents.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_documents_for_owners(&self, transaction: &mut PgConnection, owner_type: DocumentOwnerType, owner_ids: &[i64]) -> Result<Vec<String>, ApplicationError> {
        if owner_ids.is_empty() {
            return Ok(Vec::new());
        }
        let span = tracing::Span::current();
        let deleted: Vec<(String,)> = sqlx::query_as(DELETE_DOCUMENTS_FOR_OWNERS)
            .bind(owner_type)
            .bind(owner_ids)
            .fetch_all(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(deleted.into_iter().map(|path| path.0).collect())
    }

    /**
     * Deletes the maintenance and assignment document rows of a vehicle.
     *
     * # Returns
     * Storage paths of the deleted documents.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_vehicle_child_documents(&self, transaction: &mut PgConnection, vehicle_id: i64) -> Result<Vec<String>, ApplicationError> {
        let span = tracing::Span::current();
        let deleted: Vec<(String,)> = sqlx::query_as(DELETE_VEHICLE_CHILD_DOCUMENTS)
            .bind(vehicle_id)
            .fetch_all(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(deleted.into_iter().map(|path| path.0).collect())
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{
        dao::common::integration_test::init_db,
        model::{apperror::ErrorType, enums::DocumentType},
    };

    fn document_input(owner_id: i64, file_name: &str, expiry_date: Option<NaiveDate>) -> DocumentAddInputType {
        DocumentAddInputType {
            owner_type: DocumentOwnerType::Vehicle,
            owner_id,
            document_type: DocumentType::Insurance,
            storage_path: format!("vehicles/{owner_id}/docs/{file_name}"),
            file_name: file_name.to_string(),
            original_filename: "polizza.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            file_size: 1024,
            issue_date: None,
            expiry_date,
        }
    }

    #[sqlx::test]
    async fn test_add_get_then_delete_document() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let document_dao = DocumentDao::new();
        let document_id = document_dao.add_document(&mut transaction, document_input(-10, "20240101_120000_abcdef12.pdf", None)).await.unwrap();
        let document = document_dao.get_document_by_file_name(&mut transaction, DocumentOwnerType::Vehicle, -10, "20240101_120000_abcdef12.pdf").await.unwrap();
        assert_eq!(document.id, document_id);
        let update = DocumentUpdateInputType { document_type: DocumentType::Other, issue_date: None, expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1) };
        document_dao.update_document(&mut transaction, document_id, update).await.unwrap();
        assert_eq!(document_dao.get_document(&mut transaction, document_id).await.unwrap().document_type, DocumentType::Other);
        let path = document_dao.delete_document(&mut transaction, document_id).await.unwrap();
        assert_eq!(path, "vehicles/-10/docs/20240101_120000_abcdef12.pdf");
        let error = document_dao.delete_document(&mut transaction, document_id).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_statistics_and_owner_delete() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let document_dao = DocumentDao::new();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let before = document_dao.get_document_statistics(&mut transaction, today, 30).await.unwrap();
        document_dao.add_document(&mut transaction, document_input(-11, "a.pdf", None)).await.unwrap();
        document_dao.add_document(&mut transaction, document_input(-11, "b.pdf", NaiveDate::from_ymd_opt(2024, 5, 31))).await.unwrap();
        document_dao.add_document(&mut transaction, document_input(-11, "c.pdf", NaiveDate::from_ymd_opt(2024, 7, 1))).await.unwrap();
        document_dao.add_document(&mut transaction, document_input(-11, "d.pdf", NaiveDate::from_ymd_opt(2024, 7, 2))).await.unwrap();
        let after = document_dao.get_document_statistics(&mut transaction, today, 30).await.unwrap();
        assert_eq!(after.no_expiry_count - before.no_expiry_count, 1);
        assert_eq!(after.expired_count - before.expired_count, 1);
        assert_eq!(after.expiring_soon_count - before.expiring_soon_count, 1);
        assert_eq!(after.valid_count - before.valid_count, 1);
        let paths = document_dao.delete_documents_for_owner(&mut transaction, DocumentOwnerType::Vehicle, -11).await.unwrap();
        assert_eq!(paths.len(), 4);
        assert!(document_dao.get_documents_for_owner(&mut transaction, DocumentOwnerType::Vehicle, -11).await.unwrap().is_empty());
        transaction.rollback().await.unwrap();
    }
}
