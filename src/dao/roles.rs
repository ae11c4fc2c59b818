use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{check_single_row, found, handle_database_error, query_error, to_list_output},
    model::{
        apperror::ApplicationError,
        models::{ListOutputType, PaginationInput},
        personnel::{EmployeeRoleInputType, EmployeeRoleType},
    },
};

const QUERY_ROLE: &str = "SELECT id, name FROM employee_roles WHERE id = $1";

const QUERY_ROLE_LIST: &str = "SELECT id, name FROM employee_roles ORDER BY name LIMIT $1 OFFSET $2";

const QUERY_EMPLOYEE_ROLES: &str = "SELECT r.id, r.name FROM employee_roles r JOIN employee_roles_link l ON l.role_id = r.id WHERE l.employee_id = $1 ORDER BY r.name";

const ADD_ROLE: &str = "INSERT INTO employee_roles (name) VALUES ($1) RETURNING id";

const UPDATE_ROLE: &str = "UPDATE employee_roles SET name = $1 WHERE id = $2";

const DELETE_ROLE: &str = "DELETE FROM employee_roles WHERE id = $1";

const EXISTS_ROLE: &str = "SELECT EXISTS (SELECT 1 FROM employee_roles WHERE id = $1)";

const ROLE_IN_USE: &str = "SELECT EXISTS (SELECT 1 FROM employee_roles_link WHERE role_id = $1)";

const DELETE_EMPLOYEE_ROLES: &str = "DELETE FROM employee_roles_link WHERE employee_id = $1";

const ADD_EMPLOYEE_ROLES: &str = "INSERT INTO employee_roles_link (employee_id, role_id) SELECT $1, UNNEST($2::bigint[])";

/**
 * DAO for employee roles and their links to employees.
 */
pub struct RoleDao {}

impl RoleDao {
    pub fn new() -> Self {
        RoleDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_role(&self, connection: &mut PgConnection, role_id: i64) -> Result<EmployeeRoleType, ApplicationError> {
        let span = tracing::Span::current();
        let role: Option<EmployeeRoleType> = sqlx::query_as(QUERY_ROLE)
            .bind(role_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get role", &err))?;
        found(role, "Role", role_id)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_role_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput) -> Result<ListOutputType<EmployeeRoleType>, ApplicationError> {
        let span = tracing::Span::current();
        let elements: Vec<EmployeeRoleType> = sqlx::query_as(QUERY_ROLE_LIST)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get role list", &err))?;
        to_list_output(&pagination_input, elements)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_employee_roles(&self, connection: &mut PgConnection, employee_id: i64) -> Result<Vec<EmployeeRoleType>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_EMPLOYEE_ROLES)
            .bind(employee_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("get employee roles", &err))
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_role(&self, transaction: &mut PgConnection, role_input: EmployeeRoleInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_ROLE)
            .bind(role_input.name)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_role(&self, transaction: &mut PgConnection, role_id: i64, role_input: EmployeeRoleInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_ROLE)
            .bind(role_input.name)
            .bind(role_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Role", role_id, "updated")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_role(&self, transaction: &mut PgConnection, role_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_ROLE)
            .bind(role_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Role", role_id, "deleted")
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn role_exists(&self, connection: &mut PgConnection, role_id: i64) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(EXISTS_ROLE)
            .bind(role_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check role", &err))?;
        Ok(exists.0)
    }

    /**
     * Checks whether any employee holds the role.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn role_in_use(&self, connection: &mut PgConnection, role_id: i64) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let in_use: (bool,) = sqlx::query_as(ROLE_IN_USE)
            .bind(role_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| query_error("check role in use", &err))?;
        Ok(in_use.0)
    }

    /**
     * Replaces the roles of an employee.
     *
     * # Arguments
     * `transaction`: The database transaction.
     * `employee_id`: The employee.
     * `role_ids`: The new roles, without repetitions.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn set_employee_roles(&self, transaction: &mut PgConnection, employee_id: i64, role_ids: &[i64]) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(DELETE_EMPLOYEE_ROLES)
            .bind(employee_id)
            .execute(&mut *transaction)
            .instrument(span.clone())
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        if role_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(ADD_EMPLOYEE_ROLES)
            .bind(employee_id)
            .bind(role_ids)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(())
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::dao::{
        common::integration_test::init_db,
        employees::{EmployeeDao, integration_test::employee_input},
    };
    use crate::model::apperror::ErrorType;

    #[sqlx::test]
    async fn test_roles_of_an_employee() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let role_dao = RoleDao::new();
        let driver_id = role_dao.add_role(&mut transaction, EmployeeRoleInputType { name: "Autista di prova".to_string() }).await.unwrap();
        let foreman_id = role_dao.add_role(&mut transaction, EmployeeRoleInputType { name: "Capocantiere di prova".to_string() }).await.unwrap();
        let employee_id = EmployeeDao::new().add_employee(&mut transaction, employee_input("ROLESDAOTEST0001", "roles.dao@example.com")).await.unwrap();
        role_dao.set_employee_roles(&mut transaction, employee_id, &[foreman_id, driver_id]).await.unwrap();
        let roles = role_dao.get_employee_roles(&mut transaction, employee_id).await.unwrap();
        assert_eq!(roles.iter().map(|role| role.id).collect::<Vec<_>>(), vec![driver_id, foreman_id]);
        assert!(role_dao.role_in_use(&mut transaction, driver_id).await.unwrap());
        role_dao.set_employee_roles(&mut transaction, employee_id, &[]).await.unwrap();
        assert!(!role_dao.role_in_use(&mut transaction, driver_id).await.unwrap());
        role_dao.delete_role(&mut transaction, driver_id).await.unwrap();
        assert!(!role_dao.role_exists(&mut transaction, driver_id).await.unwrap());
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_duplicate_role_name() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let role_dao = RoleDao::new();
        role_dao.add_role(&mut transaction, EmployeeRoleInputType { name: "Magazziniere di prova".to_string() }).await.unwrap();
        let error = role_dao.add_role(&mut transaction, EmployeeRoleInputType { name: "Magazziniere di prova".to_string() }).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::ConstraintViolation);
        transaction.rollback().await.unwrap();
    }
}
