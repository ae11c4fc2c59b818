use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::{info, instrument};

use crate::{
    dao::{assignments::AssignmentDao, documents::DocumentDao, employees::EmployeeDao, employments::EmploymentDao, vehicles::VehicleDao},
    model::{
        apperror::ApplicationError,
        documents::StorageLocation,
        enums::{AssignmentStatus, DocumentOwnerType, VehicleStatus},
        models::{ListOutputType, PaginationInput},
        personnel::{EmploymentDetailType, EmploymentInputType, EmploymentListInputType},
    },
    service::{
        common::{acquire, begin, check_reference, connection_pool, finish, today},
        storage::{FileStorage, RemovedFiles},
    },
};

/**
 * Reasons an employment cannot be terminated at `end_date`.
 *
 * # Arguments
 * `start_date`: Start of the employment.
 * `end_date`: Requested termination date.
 * `has_active_assignment`: The employment still holds a vehicle.
 */
pub fn termination_errors(start_date: Option<NaiveDate>, end_date: NaiveDate, has_active_assignment: bool) -> Vec<String> {
    let mut errors = Vec::new();
    if start_date.is_some_and(|start| end_date < start) {
        errors.push("End date must not be before the start date".to_string());
    }
    if has_active_assignment {
        errors.push("The employment still has an assigned vehicle".to_string());
    }
    errors
}

/**
 * Service for employments.
 */
pub struct EmploymentService {
    employment_dao: EmploymentDao,
    employee_dao: EmployeeDao,
    assignment_dao: AssignmentDao,
    vehicle_dao: VehicleDao,
    document_dao: DocumentDao,
    file_storage: Arc<FileStorage>,
    connection_pool: Option<Pool<Postgres>>,
}

impl EmploymentService {
    pub fn new(file_storage: Arc<FileStorage>, connection_pool: Option<Pool<Postgres>>) -> Self {
        EmploymentService {
            employment_dao: EmploymentDao::new(),
            employee_dao: EmployeeDao::new(),
            assignment_dao: AssignmentDao::new(),
            vehicle_dao: VehicleDao::new(),
            document_dao: DocumentDao::new(),
            file_storage,
            connection_pool,
        }
    }

    pub async fn get_employment(&self, employment_id: i64) -> Result<EmploymentDetailType, ApplicationError> {
        self.terminate_expired_employments().await?;
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.employment_dao.get_employment(&mut connection, employment_id).await
    }

    /**
     * Searches employments. Expired employments are terminated first.
     */
    pub async fn get_employment_list(&self, pagination_input: PaginationInput, filter: EmploymentListInputType) -> Result<ListOutputType<EmploymentDetailType>, ApplicationError> {
        self.terminate_expired_employments().await?;
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.employment_dao.get_employment_list(&mut connection, pagination_input, filter).await
    }

    /**
     * Adds an employment to an existing employee. An end date in the past terminates it.
     */
    #[instrument(skip(self, employment_input), fields(employee_id = employment_input.employee_id))]
    pub async fn add_employment(&self, employment_input: EmploymentInputType) -> Result<EmploymentDetailType, ApplicationError> {
        let employment_input = employment_input.validate(today())?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_employment_in(&mut transaction, None, employment_input).await;
        finish(transaction, result).await
    }

    #[instrument(skip(self, employment_input))]
    pub async fn update_employment(&self, employment_id: i64, employment_input: EmploymentInputType) -> Result<EmploymentDetailType, ApplicationError> {
        let employment_input = employment_input.validate(today())?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.save_employment_in(&mut transaction, Some(employment_id), employment_input).await;
        finish(transaction, result).await
    }

    async fn save_employment_in(&self, transaction: &mut PgConnection, employment_id: Option<i64>, employment_input: EmploymentInputType) -> Result<EmploymentDetailType, ApplicationError> {
        let employee_id = employment_input.employee_id;
        check_reference(self.employee_dao.employee_exists(transaction, employee_id).await?, "Employee", employee_id)?;
        let employment_id = match employment_id {
            Some(employment_id) => {
                self.employment_dao.update_employment(transaction, employment_id, employment_input).await?;
                employment_id
            }
            None => self.employment_dao.add_employment(transaction, employment_input).await?,
        };
        self.employment_dao.get_employment(transaction, employment_id).await
    }

    /**
     * Terminates an employment at the given date.
     *
     * # Arguments
     * `employment_id`: The employment.
     * `end_date`: Last day of the employment, not before its start.
     *
     * # Returns
     * The terminated employment, or a business rule error while it still holds a vehicle.
     */
    #[instrument(skip(self))]
    pub async fn terminate_employment(&self, employment_id: i64, end_date: NaiveDate) -> Result<EmploymentDetailType, ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.terminate_employment_in(&mut transaction, employment_id, end_date).await;
        finish(transaction, result).await
    }

    async fn terminate_employment_in(&self, transaction: &mut PgConnection, employment_id: i64, end_date: NaiveDate) -> Result<EmploymentDetailType, ApplicationError> {
        let employment = self.employment_dao.get_employment(transaction, employment_id).await?;
        let has_active_assignment = self.assignment_dao.employment_has_active_assignment(transaction, employment_id, None).await?;
        let errors = termination_errors(employment.start_date, end_date, has_active_assignment);
        if !errors.is_empty() {
            return Err(ApplicationError::business_rule("The employment cannot be terminated".to_string(), errors));
        }
        self.employment_dao.terminate_employment(transaction, employment_id, end_date).await?;
        info!("Employment {} terminated at {end_date}", employment.matricola);
        self.employment_dao.get_employment(transaction, employment_id).await
    }

    /**
     * Terminates every employment whose end date has passed.
     *
     * # Returns
     * Number of terminated employments.
     */
    pub async fn terminate_expired_employments(&self) -> Result<u64, ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.employment_dao.terminate_expired_employments(&mut transaction, today()).await;
        finish(transaction, result).await
    }

    /**
     * Deletes an employment with its assignments and documents.
     */
    #[instrument(skip(self))]
    pub async fn delete_employment(&self, employment_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_employment_in(&mut transaction, employment_id).await;
        let removed = finish(transaction, result).await?;
        self.file_storage.delete_removed(&removed).await;
        Ok(())
    }

    async fn delete_employment_in(&self, transaction: &mut PgConnection, employment_id: i64) -> Result<RemovedFiles, ApplicationError> {
        let employment = self.employment_dao.get_employment(transaction, employment_id).await?;
        let mut removed = self.remove_employment_children_in(transaction, &[employment_id]).await?;
        self.employment_dao.delete_employment(transaction, employment_id).await?;
        removed.directories.push(StorageLocation::Employment(employment.matricola).directory());
        Ok(removed)
    }

    /**
     * Removes the assignments and documents of employments about to be deleted. Vehicles held by
     * active assignments go back in service.
     *
     * # Returns
     * The files and directories to remove after commit, employment directories excluded.
     */
    pub async fn remove_employment_children_in(&self, transaction: &mut PgConnection, employment_ids: &[i64]) -> Result<RemovedFiles, ApplicationError> {
        let mut removed = RemovedFiles::default();
        let assignments = self.assignment_dao.delete_assignments_by_employments(transaction, employment_ids).await?;
        let assignment_ids: Vec<i64> = assignments.iter().map(|(id, _, _)| *id).collect();
        for (_, vehicle_id, status) in &assignments {
            if *status == AssignmentStatus::Assigned {
                self.vehicle_dao.update_vehicle_status(transaction, *vehicle_id, VehicleStatus::InService).await?;
            }
        }
        removed.storage_paths.extend(self.document_dao.delete_documents_for_owners(transaction, DocumentOwnerType::Assignment, &assignment_ids).await?);
        removed.storage_paths.extend(self.document_dao.delete_documents_for_owners(transaction, DocumentOwnerType::Employment, employment_ids).await?);
        removed.directories.extend(assignment_ids.iter().map(|id| StorageLocation::Assignment(*id).directory()));
        Ok(removed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{apperror::ErrorType, config::StorageConfig};

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn test_termination_errors() {
        assert!(termination_errors(Some(date(1, 1)), date(1, 1), false).is_empty());
        assert!(termination_errors(None, date(1, 1), false).is_empty());
        assert_eq!(termination_errors(Some(date(2, 1)), date(1, 31), true).len(), 2);
        assert_eq!(termination_errors(Some(date(1, 1)), date(6, 1), true), vec!["The employment still has an assigned vehicle".to_string()]);
    }

    #[actix_web::test]
    async fn test_invalid_input_is_rejected_before_database() {
        let service = EmploymentService::new(Arc::new(FileStorage::new(&StorageConfig::default())), None);
        let input = EmploymentInputType {
            employee_id: 1,
            matricola: " ".to_string(),
            contract_type: None,
            branch: None,
            department: None,
            job_title: None,
            contract_level: None,
            ccnl: None,
            job_role: None,
            salary: None,
            start_date: None,
            end_date: None,
            job_description: None,
            status: crate::model::enums::EmploymentStatus::Active,
        };
        assert_eq!(service.add_employment(input).await.unwrap_err().error_type, ErrorType::Validation);
    }
}
