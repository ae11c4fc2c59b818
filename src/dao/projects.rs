use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, like_pattern, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        models::{ListOutputType, PaginationInput},
        registry::{ProjectDetailType, ProjectInputType, ProjectListInputType},
    },
};

const QUERY_PROJECT: &str = "SELECT id, code, name, cig, cup, manager_id, start_date, end_date, status, street, country_code, country, region_code, region, province_code, province,
                                    city_code, city, locality, postal_code, work_description, value, advance_amount
                             FROM projects WHERE id = $1";

const QUERY_PROJECT_LIST: &str = "SELECT id, code, name, cig, cup, manager_id, start_date, end_date, status, street, country_code, country, region_code, region, province_code,
                                         province, city_code, city, locality, postal_code, work_description, value, advance_amount
                                  FROM projects
                                  WHERE ($1::project_status IS NULL OR status = $1) AND
                                        ($2::text IS NULL OR lower(code) LIKE $2 OR lower(name) LIKE $2 OR lower(cig) LIKE $2 OR lower(cup) LIKE $2)
                                  ORDER BY code
                                  LIMIT $3 OFFSET $4";

const ADD_PROJECT: &str = "INSERT INTO projects (code, name, cig, cup, manager_id, start_date, end_date, status, street, country_code, country, region_code, region, province_code,
                                                 province, city_code, city, locality, postal_code, work_description, value, advance_amount)
                           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
                           RETURNING id";

const UPDATE_PROJECT: &str = "UPDATE projects SET code = $1, name = $2, cig = $3, cup = $4, manager_id = $5, start_date = $6, end_date = $7, status = $8, street = $9,
                                                  country_code = $10, country = $11, region_code = $12, region = $13, province_code = $14, province = $15, city_code = $16,
                                                  city = $17, locality = $18, postal_code = $19, work_description = $20, value = $21, advance_amount = $22
                              WHERE id = $23";

const DELETE_PROJECT: &str = "DELETE FROM projects WHERE id = $1";

const EXISTS_PROJECT: &str = "SELECT EXISTS (SELECT 1 FROM projects WHERE id = $1)";

const EXISTS_PROJECT_CODE: &str = "SELECT EXISTS (SELECT 1 FROM projects WHERE lower(code) = lower($1) AND ($2::bigint IS NULL OR id <> $2))";

/**
 * DAO for project database operations.
 */
pub struct ProjectDao {}

impl ProjectDao {
    pub fn new() -> Self {
        ProjectDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_project(&self, connection: &mut PgConnection, project_id: i64) -> Result<ProjectDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let project: Option<ProjectDetailType> = sqlx::query_as(QUERY_PROJECT)
            .bind(project_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get project", &err))?;
        found(project, "Project", project_id)
    }

    /**
     * Retrieves a page of projects by status and a keyword on code, name, CIG or CUP.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_project_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, filter: ProjectListInputType) -> Result<ListOutputType<ProjectDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<ProjectDetailType> = sqlx::query_as(QUERY_PROJECT_LIST)
            .bind(filter.status)
            .bind(like_pattern(filter.keyword.as_deref()))
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get project list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    #[instrument(skip(self, transaction, project_input), fields(result))]
    pub async fn add_project(&self, transaction: &mut PgConnection, project_input: ProjectInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let address = project_input.address;
        let id: (i64,) = sqlx::query_as(ADD_PROJECT)
            .bind(project_input.code)
            .bind(project_input.name)
            .bind(project_input.cig)
            .bind(project_input.cup)
            .bind(project_input.manager_id)
            .bind(project_input.start_date)
            .bind(project_input.end_date)
            .bind(project_input.status)
            .bind(address.street)
            .bind(address.country_code)
            .bind(address.country)
            .bind(address.region_code)
            .bind(address.region)
            .bind(address.province_code)
            .bind(address.province)
            .bind(address.city_code)
            .bind(address.city)
            .bind(address.locality)
            .bind(address.postal_code)
            .bind(project_input.work_description)
            .bind(project_input.value)
            .bind(project_input.advance_amount)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction, project_input), fields(result))]
    pub async fn update_project(&self, transaction: &mut PgConnection, project_id: i64, project_input: ProjectInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let address = project_input.address;
        let result = sqlx::query(UPDATE_PROJECT)
            .bind(project_input.code)
            .bind(project_input.name)
            .bind(project_input.cig)
            .bind(project_input.cup)
            .bind(project_input.manager_id)
            .bind(project_input.start_date)
            .bind(project_input.end_date)
            .bind(project_input.status)
            .bind(address.street)
            .bind(address.country_code)
            .bind(address.country)
            .bind(address.region_code)
            .bind(address.region)
            .bind(address.province_code)
            .bind(address.province)
            .bind(address.city_code)
            .bind(address.city)
            .bind(address.locality)
            .bind(address.postal_code)
            .bind(project_input.work_description)
            .bind(project_input.value)
            .bind(project_input.advance_amount)
            .bind(project_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Project", project_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_project(&self, transaction: &mut PgConnection, project_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_PROJECT)
            .bind(project_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Project", project_id, "deleted")
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn project_exists(&self, connection: &mut PgConnection, project_id: i64) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_PROJECT)
            .bind(project_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check project", &err))?;
        Ok(exists.0)
    }

    /**
     * Checks whether a project other than `excluded_id` already uses the code.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn code_in_use(&self, connection: &mut PgConnection, code: &str, excluded_id: Option<i64>) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_PROJECT_CODE)
            .bind(code)
            .bind(excluded_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check project code", &err))?;
        Ok(exists.0)
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
pub mod integration_test {
    use super::*;
    use crate::{
        dao::common::integration_test::init_db,
        model::{enums::ProjectStatus, models::FullAddress},
    };
    use rust_decimal::Decimal;

    pub fn project_input(code: &str) -> ProjectInputType {
        ProjectInputType {
            code: code.to_string(),
            name: "Cantiere test".to_string(),
            cig: None,
            cup: None,
            manager_id: None,
            start_date: None,
            end_date: None,
            status: Some(ProjectStatus::Active),
            address: FullAddress::default(),
            work_description: None,
            value: Some(Decimal::new(100000, 0)),
            advance_amount: None,
        }
    }

    #[sqlx::test]
    async fn test_add_update_then_delete_project() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let project_dao = ProjectDao::new();
        let project_id = project_dao.add_project(&mut transaction, project_input("TEST-P1")).await.unwrap();
        assert!(project_dao.code_in_use(&mut transaction, "test-p1", None).await.unwrap());
        assert!(!project_dao.code_in_use(&mut transaction, "TEST-P1", Some(project_id)).await.unwrap());
        project_dao.update_project(&mut transaction, project_id, project_input("TEST-P2")).await.unwrap();
        assert_eq!(project_dao.get_project(&mut transaction, project_id).await.unwrap().code, "TEST-P2");
        assert!(project_dao.delete_project(&mut transaction, project_id).await.is_ok());
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_get_project_list() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let filter = ProjectListInputType { status: Some(ProjectStatus::Active), keyword: None };
        assert!(ProjectDao::new().get_project_list(&mut connection, PaginationInput { start_index: 0, page_size: 10 }, filter).await.is_ok());
    }
}
