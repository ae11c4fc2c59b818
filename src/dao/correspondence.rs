use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, like_pattern, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        enums::CorrespondenceType,
        models::{ListOutputType, PaginationInput},
        registry::{CorrespondenceDetailType, CorrespondenceInputType, CorrespondenceListInputType},
    },
};

const QUERY_CORRESPONDENCE: &str = "SELECT id, progressive, year, correspondence_type, description, correspondence_date, sender, recipient, notes
                                    FROM correspondence WHERE id = $1";

const QUERY_CORRESPONDENCE_LIST: &str = "SELECT id, progressive, year, correspondence_type, description, correspondence_date, sender, recipient, notes
                                         FROM correspondence
                                         WHERE ($1::integer IS NULL OR year = $1) AND
                                               ($2::correspondence_type IS NULL OR correspondence_type = $2) AND
                                               ($3::text IS NULL OR lower(description) LIKE $3 OR lower(sender) LIKE $3 OR lower(recipient) LIKE $3 OR lower(notes) LIKE $3)
                                         ORDER BY year DESC, progressive DESC
                                         LIMIT $4 OFFSET $5";

const QUERY_MAX_PROGRESSIVE: &str = "SELECT COALESCE(MAX(progressive), 0) FROM correspondence WHERE year = $1 AND correspondence_type = $2";

const QUERY_YEARS: &str = "SELECT DISTINCT year FROM correspondence ORDER BY year DESC";

const QUERY_LAST_PROTOCOL: &str = "SELECT progressive, year FROM correspondence WHERE correspondence_type = $1 ORDER BY year DESC, progressive DESC LIMIT 1";

const ADD_CORRESPONDENCE: &str = "INSERT INTO correspondence (progressive, year, correspondence_type, description, correspondence_date, sender, recipient, notes)
                                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                                  RETURNING id";

const UPDATE_CORRESPONDENCE: &str = "UPDATE correspondence SET progressive = $1, year = $2, correspondence_type = $3, description = $4, correspondence_date = $5,
                                                               sender = $6, recipient = $7, notes = $8
                                     WHERE id = $9";

const DELETE_CORRESPONDENCE: &str = "DELETE FROM correspondence WHERE id = $1";

/**
 * DAO for the correspondence register.
 */
pub struct CorrespondenceDao {}

impl CorrespondenceDao {
    pub fn new() -> Self {
        CorrespondenceDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_correspondence(&self, connection: &mut PgConnection, correspondence_id: i64) -> Result<CorrespondenceDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let correspondence: Option<CorrespondenceDetailType> = sqlx::query_as(QUERY_CORRESPONDENCE)
            .bind(correspondence_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get correspondence", &err))?;
        found(correspondence, "Correspondence", correspondence_id).map(CorrespondenceDetailType::with_protocol)
    }

    /**
     * Searches the register by year, type and keyword. Newest protocol first.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_correspondence_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, filter: CorrespondenceListInputType) -> Result<ListOutputType<CorrespondenceDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<CorrespondenceDetailType> = sqlx::query_as(QUERY_CORRESPONDENCE_LIST)
            .bind(filter.year)
            .bind(filter.correspondence_type)
            .bind(like_pattern(filter.keyword.as_deref()))
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get correspondence list", &err))?;
        to_list_output(&pagination_input, elements.into_iter().map(CorrespondenceDetailType::with_protocol).collect())
    }

    /**
     * Highest progressive number used for a year and type, zero when none.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_max_progressive(&self, connection: &mut PgConnection, year: i32, correspondence_type: CorrespondenceType) -> Result<i32, ApplicationError> {
        let span = tracing::Span::current();
        let max: (i32,) = sqlx::query_as(QUERY_MAX_PROGRESSIVE)
            .bind(year)
            .bind(correspondence_type)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get max progressive", &err))?;
        Ok(max.0)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_years(&self, connection: &mut PgConnection) -> Result<Vec<i32>, ApplicationError> {
        let span = tracing::Span::current();
        let years: Vec<(i32,)> = sqlx::query_as(QUERY_YEARS)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get correspondence years", &err))?;
        Ok(years.into_iter().map(|year| year.0).collect())
    }

    /**
     * Progressive number and year of the most recent record of a type.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_last_protocol(&self, connection: &mut PgConnection, correspondence_type: CorrespondenceType) -> Result<Option<(i32, i32)>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_LAST_PROTOCOL)
            .bind(correspondence_type)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get last protocol", &err))
    }

    /**
     * Adds a record. Progressive and year must already be resolved.
     */
    #[instrument(skip(self, transaction, correspondence_input), fields(result))]
    pub async fn add_correspondence(&self, transaction: &mut PgConnection, year: i32, correspondence_input: CorrespondenceInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_CORRESPONDENCE)
            .bind(correspondence_input.progressive)
            .bind(year)
            .bind(correspondence_input.correspondence_type)
            .bind(correspondence_input.description)
            .bind(correspondence_input.correspondence_date)
            .bind(correspondence_input.sender)
            .bind(correspondence_input.recipient)
            .bind(correspondence_input.notes)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction, correspondence_input), fields(result))]
    pub async fn update_correspondence(&self, transaction: &mut PgConnection, correspondence_id: i64, year: i32, correspondence_input: CorrespondenceInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_CORRESPONDENCE)
            .bind(correspondence_input.progressive)
            .bind(year)
            .bind(correspondence_input.correspondence_type)
            .bind(correspondence_input.description)
            .bind(correspondence_input.correspondence_date)
            .bind(correspondence_input.sender)
            .bind(correspondence_input.recipient)
            .bind(correspondence_input.notes)
            .bind(correspondence_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Correspondence", correspondence_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_correspondence(&self, transaction: &mut PgConnection, correspondence_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_CORRESPONDENCE)
            .bind(correspondence_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Correspondence", correspondence_id, "deleted")
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{dao::common::integration_test::init_db, model::apperror::ErrorType};

    fn correspondence_input(progressive: i32) -> CorrespondenceInputType {
        CorrespondenceInputType {
            progressive,
            year: Some(1999),
            correspondence_type: CorrespondenceType::U,
            description: Some("Lettera di prova".to_string()),
            correspondence_date: None,
            sender: None,
            recipient: Some("Comune".to_string()),
            notes: None,
        }
    }

    #[sqlx::test]
    async fn test_register_and_numbering() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let correspondence_dao = CorrespondenceDao::new();
        let first = correspondence_dao.get_max_progressive(&mut transaction, 1999, CorrespondenceType::U).await.unwrap() + 1;
        let id = correspondence_dao.add_correspondence(&mut transaction, 1999, correspondence_input(first)).await.unwrap();
        assert_eq!(correspondence_dao.get_max_progressive(&mut transaction, 1999, CorrespondenceType::U).await.unwrap(), first);
        assert!(correspondence_dao.get_years(&mut transaction).await.unwrap().contains(&1999));
        let correspondence = correspondence_dao.get_correspondence(&mut transaction, id).await.unwrap();
        assert_eq!(correspondence.protocol, format!("{first:03}/1999"));
        assert!(correspondence_dao.delete_correspondence(&mut transaction, id).await.is_ok());
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_duplicate_protocol() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let correspondence_dao = CorrespondenceDao::new();
        let next = correspondence_dao.get_max_progressive(&mut transaction, 1999, CorrespondenceType::U).await.unwrap() + 1;
        correspondence_dao.add_correspondence(&mut transaction, 1999, correspondence_input(next)).await.unwrap();
        let error = correspondence_dao.add_correspondence(&mut transaction, 1999, correspondence_input(next)).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::ConstraintViolation);
        transaction.rollback().await.unwrap();
    }
}
