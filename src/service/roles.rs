use sqlx::{PgConnection, Pool, Postgres};
use tracing::{debug, instrument};

use crate::{
    dao::{employees::EmployeeDao, roles::RoleDao},
    model::{
        apperror::ApplicationError,
        models::{ListOutputType, PaginationInput},
        personnel::{EmployeeRoleInputType, EmployeeRoleType, distinct_role_ids},
    },
    service::common::{acquire, begin, check_reference, connection_pool, finish},
};

/**
 * Service for the roles employees can hold.
 */
pub struct RoleService {
    role_dao: RoleDao,
    employee_dao: EmployeeDao,
    connection_pool: Option<Pool<Postgres>>,
}

impl RoleService {
    pub fn new(connection_pool: Option<Pool<Postgres>>) -> Self {
        RoleService { role_dao: RoleDao::new(), employee_dao: EmployeeDao::new(), connection_pool }
    }

    pub async fn get_role(&self, role_id: i64) -> Result<EmployeeRoleType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.role_dao.get_role(&mut connection, role_id).await
    }

    pub async fn get_role_list(&self, pagination_input: PaginationInput) -> Result<ListOutputType<EmployeeRoleType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.role_dao.get_role_list(&mut connection, pagination_input).await
    }

    #[instrument(skip(self))]
    pub async fn add_role(&self, role_input: EmployeeRoleInputType) -> Result<EmployeeRoleType, ApplicationError> {
        let role_input = role_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.add_role_in(&mut transaction, role_input).await;
        finish(transaction, result).await
    }

    async fn add_role_in(&self, transaction: &mut PgConnection, role_input: EmployeeRoleInputType) -> Result<EmployeeRoleType, ApplicationError> {
        let role_id = self.role_dao.add_role(transaction, role_input).await?;
        self.role_dao.get_role(transaction, role_id).await
    }

    #[instrument(skip(self))]
    pub async fn update_role(&self, role_id: i64, role_input: EmployeeRoleInputType) -> Result<EmployeeRoleType, ApplicationError> {
        let role_input = role_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.update_role_in(&mut transaction, role_id, role_input).await;
        finish(transaction, result).await
    }

    async fn update_role_in(&self, transaction: &mut PgConnection, role_id: i64, role_input: EmployeeRoleInputType) -> Result<EmployeeRoleType, ApplicationError> {
        self.role_dao.update_role(transaction, role_id, role_input).await?;
        self.role_dao.get_role(transaction, role_id).await
    }

    /**
     * Deletes a role no employee holds.
     */
    #[instrument(skip(self))]
    pub async fn delete_role(&self, role_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_role_in(&mut transaction, role_id).await;
        finish(transaction, result).await
    }

    async fn delete_role_in(&self, transaction: &mut PgConnection, role_id: i64) -> Result<(), ApplicationError> {
        if self.role_dao.role_in_use(transaction, role_id).await? {
            return Err(ApplicationError::business_rule("The role cannot be deleted".to_string(), vec![format!("Role {role_id} is held by employees")]));
        }
        self.role_dao.delete_role(transaction, role_id).await
    }

    pub async fn get_employee_roles(&self, employee_id: i64) -> Result<Vec<EmployeeRoleType>, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        check_reference(self.employee_dao.employee_exists(&mut connection, employee_id).await?, "Employee", employee_id)?;
        self.role_dao.get_employee_roles(&mut connection, employee_id).await
    }

    /**
     * Replaces the roles of an employee. Repeated ids count once.
     *
     * # Returns
     * The roles the employee now holds.
     */
    #[instrument(skip(self))]
    pub async fn set_employee_roles(&self, employee_id: i64, role_ids: Vec<i64>) -> Result<Vec<EmployeeRoleType>, ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.set_employee_roles_in(&mut transaction, employee_id, &distinct_role_ids(&role_ids)).await;
        finish(transaction, result).await
    }

    async fn set_employee_roles_in(&self, transaction: &mut PgConnection, employee_id: i64, role_ids: &[i64]) -> Result<Vec<EmployeeRoleType>, ApplicationError> {
        check_reference(self.employee_dao.employee_exists(transaction, employee_id).await?, "Employee", employee_id)?;
        for role_id in role_ids {
            check_reference(self.role_dao.role_exists(transaction, *role_id).await?, "Role", *role_id)?;
        }
        self.role_dao.set_employee_roles(transaction, employee_id, role_ids).await?;
        debug!("Employee {employee_id} now holds {} roles", role_ids.len());
        self.role_dao.get_employee_roles(transaction, employee_id).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::apperror::ErrorType;

    #[actix_web::test]
    async fn test_without_database() {
        let service = RoleService::new(None);
        let error = service.add_role(EmployeeRoleInputType { name: String::new() }).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        let error = service.add_role(EmployeeRoleInputType { name: "Autista".to_string() }).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::DatabaseError);
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::dao::{
        common::integration_test::init_db,
        employees::integration_test::employee_input,
    };
    use crate::model::apperror::ErrorType;

    #[sqlx::test]
    async fn test_role_held_by_employee_cannot_be_deleted() {
        let pool = init_db().await;
        let service = RoleService::new(Some(pool.clone()));
        let mut transaction = pool.begin().await.unwrap();
        let employee_id = service.employee_dao.add_employee(&mut transaction, employee_input("ROLESSERVTEST001", "roles.service@example.com")).await.unwrap();
        let role = service.add_role_in(&mut transaction, EmployeeRoleInputType { name: "Gruista di prova".to_string() }).await.unwrap();
        let roles = service.set_employee_roles_in(&mut transaction, employee_id, &distinct_role_ids(&[role.id, role.id])).await.unwrap();
        assert_eq!(roles.len(), 1);
        let error = service.delete_role_in(&mut transaction, role.id).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::BusinessRule);
        let error = service.set_employee_roles_in(&mut transaction, employee_id, &[-1]).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::NotFound);
        service.set_employee_roles_in(&mut transaction, employee_id, &[]).await.unwrap();
        service.delete_role_in(&mut transaction, role.id).await.unwrap();
        transaction.rollback().await.unwrap();
    }
}
