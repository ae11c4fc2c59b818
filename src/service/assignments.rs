use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::{debug, info, instrument};

use crate::{
    dao::{assignments::AssignmentDao, documents::DocumentDao, employments::EmploymentDao, projects::ProjectDao, vehicles::VehicleDao},
    model::{
        apperror::ApplicationError,
        documents::StorageLocation,
        enums::{AssignmentStatus, DocumentOwnerType, EmploymentStatus, VehicleStatus},
        fleet::{AssignmentDetailType, AssignmentInputType, AssignmentListInputType},
        models::{ListOutputType, PaginationInput},
    },
    service::{
        common::{acquire, begin, check_reference, connection_pool, finish, today},
        storage::FileStorage,
    },
};

/**
 * Facts about the vehicle and employment an assignment refers to.
 */
#[derive(Debug, Clone)]
pub struct AssignmentEligibility {
    pub vehicle_status: VehicleStatus,
    pub vehicle_assigned: bool,
    pub insurance_expiry_date: Option<NaiveDate>,
    pub car_tax_expiry_date: Option<NaiveDate>,
    pub employment_status: EmploymentStatus,
    pub employment_assigned: bool,
}

/**
 * Collects every reason why a new assignment cannot be created.
 *
 * # Arguments
 * `eligibility`: State of the vehicle and employment.
 * `start_date`: Start of the assignment.
 * `end_date`: End of the assignment.
 * `today`: Reference date for expiries.
 *
 * # Returns
 * The failed checks, empty when the assignment is allowed.
 */
pub fn assignment_errors(eligibility: &AssignmentEligibility, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>, today: NaiveDate) -> Vec<String> {
    let mut errors = Vec::new();
    if eligibility.vehicle_status != VehicleStatus::InService {
        errors.push("Vehicle is not in service".to_string());
    }
    if eligibility.vehicle_assigned {
        errors.push("Vehicle is already assigned".to_string());
    }
    if eligibility.insurance_expiry_date.is_some_and(|expiry| expiry < today) {
        errors.push("Vehicle insurance expired".to_string());
    }
    if eligibility.car_tax_expiry_date.is_some_and(|expiry| expiry < today) {
        errors.push("Vehicle car tax expired".to_string());
    }
    if eligibility.employment_status != EmploymentStatus::Active {
        errors.push("Employment is not active".to_string());
    }
    if eligibility.employment_assigned {
        errors.push("Employment already has an assigned vehicle".to_string());
    }
    errors.extend(assignment_date_errors(start_date, end_date));
    errors
}

/**
 * Start date is required and the end date must not precede it.
 */
pub fn assignment_date_errors(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Vec<String> {
    match (start_date, end_date) {
        (None, _) => vec!["Start date is required".to_string()],
        (Some(start), Some(end)) if end < start => vec!["End date must be after start date".to_string()],
        _ => Vec::new(),
    }
}

/**
 * Status a vehicle takes from an assignment: assigned while the assignment is active, otherwise in service.
 */
pub fn vehicle_status_for(status: AssignmentStatus, end_date: Option<NaiveDate>, today: NaiveDate) -> VehicleStatus {
    if status == AssignmentStatus::Assigned && end_date.is_none_or(|end| end >= today) { VehicleStatus::Assigned } else { VehicleStatus::InService }
}

/**
 * Service for vehicle assignments.
 */
pub struct AssignmentService {
    assignment_dao: AssignmentDao,
    vehicle_dao: VehicleDao,
    employment_dao: EmploymentDao,
    project_dao: ProjectDao,
    document_dao: DocumentDao,
    file_storage: Arc<FileStorage>,
    /**
     * Optional connection pool for database operations. Optional for test purposes.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl AssignmentService {
    pub fn new(file_storage: Arc<FileStorage>, connection_pool: Option<Pool<Postgres>>) -> Self {
        AssignmentService {
            assignment_dao: AssignmentDao::new(),
            vehicle_dao: VehicleDao::new(),
            employment_dao: EmploymentDao::new(),
            project_dao: ProjectDao::new(),
            document_dao: DocumentDao::new(),
            file_storage,
            connection_pool,
        }
    }

    pub async fn get_assignment(&self, assignment_id: i64) -> Result<AssignmentDetailType, ApplicationError> {
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.assignment_dao.get_assignment(&mut connection, assignment_id).await
    }

    /**
     * Lists assignments. Expired assignments are released first.
     */
    pub async fn get_assignment_list(&self, pagination_input: PaginationInput, filter: AssignmentListInputType) -> Result<ListOutputType<AssignmentDetailType>, ApplicationError> {
        self.release_expired_assignments().await?;
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        self.assignment_dao.get_assignment_list(&mut connection, pagination_input, filter).await
    }

    /**
     * Assignment history of a vehicle, newest first.
     */
    pub async fn get_vehicle_history(&self, pagination_input: PaginationInput, vehicle_id: i64) -> Result<ListOutputType<AssignmentDetailType>, ApplicationError> {
        let filter = AssignmentListInputType { status: None, vehicle_id: Some(vehicle_id), employment_id: None };
        let mut connection = acquire(connection_pool(&self.connection_pool)?).await?;
        check_reference(self.vehicle_dao.vehicle_exists(&mut connection, vehicle_id).await?, "Vehicle", vehicle_id)?;
        self.assignment_dao.get_assignment_list(&mut connection, pagination_input, filter).await
    }

    /**
     * Creates an assignment after checking vehicle and employment eligibility.
     *
     * # Arguments
     * `assignment_input`: The assignment to create.
     *
     * # Returns
     * The created assignment or a business rule error listing every failed check.
     */
    #[instrument(skip(self, assignment_input), fields(vehicle_id = assignment_input.vehicle_id, employment_id = assignment_input.employment_id))]
    pub async fn add_assignment(&self, assignment_input: AssignmentInputType) -> Result<AssignmentDetailType, ApplicationError> {
        let assignment_input = assignment_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.add_assignment_in(&mut transaction, assignment_input, today()).await;
        finish(transaction, result).await
    }

    async fn add_assignment_in(&self, transaction: &mut PgConnection, assignment_input: AssignmentInputType, today: NaiveDate) -> Result<AssignmentDetailType, ApplicationError> {
        let vehicle = self.vehicle_dao.get_vehicle(transaction, assignment_input.vehicle_id).await?;
        let employment = self.employment_dao.get_employment(transaction, assignment_input.employment_id).await?;
        self.check_project(transaction, assignment_input.project_id).await?;
        let eligibility = AssignmentEligibility {
            vehicle_status: vehicle.status,
            vehicle_assigned: self.assignment_dao.vehicle_has_active_assignment(transaction, vehicle.id, None).await?,
            insurance_expiry_date: vehicle.insurance_expiry_date,
            car_tax_expiry_date: vehicle.car_tax_expiry_date,
            employment_status: employment.status,
            employment_assigned: self.assignment_dao.employment_has_active_assignment(transaction, employment.id, None).await?,
        };
        let errors = assignment_errors(&eligibility, assignment_input.start_date, assignment_input.end_date, today);
        if !errors.is_empty() {
            return Err(ApplicationError::business_rule("The vehicle cannot be assigned".to_string(), errors));
        }
        let vehicle_status = vehicle_status_for(assignment_input.status, assignment_input.end_date, today);
        let assignment_id = self.assignment_dao.add_assignment(transaction, assignment_input).await?;
        self.vehicle_dao.update_vehicle_status(transaction, vehicle.id, vehicle_status).await?;
        info!("Assignment {assignment_id} created, vehicle {} is {vehicle_status:?}", vehicle.id);
        self.assignment_dao.get_assignment(transaction, assignment_id).await
    }

    /**
     * Updates an assignment. The vehicle status follows the assignment; a replaced vehicle returns in service.
     */
    #[instrument(skip(self, assignment_input))]
    pub async fn update_assignment(&self, assignment_id: i64, assignment_input: AssignmentInputType) -> Result<AssignmentDetailType, ApplicationError> {
        let assignment_input = assignment_input.validate()?;
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.update_assignment_in(&mut transaction, assignment_id, assignment_input, today()).await;
        finish(transaction, result).await
    }

    async fn update_assignment_in(&self, transaction: &mut PgConnection, assignment_id: i64, assignment_input: AssignmentInputType, today: NaiveDate) -> Result<AssignmentDetailType, ApplicationError> {
        let existing = self.assignment_dao.get_assignment(transaction, assignment_id).await?;
        let errors = assignment_date_errors(assignment_input.start_date, assignment_input.end_date);
        if !errors.is_empty() {
            return Err(ApplicationError::business_rule("Invalid assignment dates".to_string(), errors));
        }
        check_reference(self.vehicle_dao.vehicle_exists(transaction, assignment_input.vehicle_id).await?, "Vehicle", assignment_input.vehicle_id)?;
        self.employment_dao.get_employment(transaction, assignment_input.employment_id).await?;
        self.check_project(transaction, assignment_input.project_id).await?;
        let vehicle_id = assignment_input.vehicle_id;
        let vehicle_status = vehicle_status_for(assignment_input.status, assignment_input.end_date, today);
        if vehicle_status == VehicleStatus::Assigned && self.assignment_dao.vehicle_has_active_assignment(transaction, vehicle_id, Some(assignment_id)).await? {
            return Err(ApplicationError::business_rule("The vehicle cannot be assigned".to_string(), vec!["Vehicle is already assigned".to_string()]));
        }
        self.assignment_dao.update_assignment(transaction, assignment_id, assignment_input).await?;
        if existing.vehicle_id != vehicle_id {
            self.vehicle_dao.update_vehicle_status(transaction, existing.vehicle_id, VehicleStatus::InService).await?;
            debug!("Vehicle {} released from assignment {assignment_id}", existing.vehicle_id);
        }
        self.vehicle_dao.update_vehicle_status(transaction, vehicle_id, vehicle_status).await?;
        self.assignment_dao.get_assignment(transaction, assignment_id).await
    }

    /**
     * Deletes an assignment with its documents. An active assignment frees its vehicle.
     */
    #[instrument(skip(self))]
    pub async fn delete_assignment(&self, assignment_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.delete_assignment_in(&mut transaction, assignment_id).await;
        let storage_paths = finish(transaction, result).await?;
        self.file_storage.delete_files(&storage_paths).await;
        self.file_storage.delete_directory(&StorageLocation::Assignment(assignment_id).directory()).await;
        Ok(())
    }

    async fn delete_assignment_in(&self, transaction: &mut PgConnection, assignment_id: i64) -> Result<Vec<String>, ApplicationError> {
        let existing = self.assignment_dao.get_assignment(transaction, assignment_id).await?;
        let storage_paths = self.document_dao.delete_documents_for_owner(transaction, DocumentOwnerType::Assignment, assignment_id).await?;
        self.assignment_dao.delete_assignment(transaction, assignment_id).await?;
        if existing.status == AssignmentStatus::Assigned {
            self.vehicle_dao.update_vehicle_status(transaction, existing.vehicle_id, VehicleStatus::InService).await?;
        }
        Ok(storage_paths)
    }

    /**
     * Returns active assignments that ended before today and puts their vehicles back in service.
     *
     * # Returns
     * Number of released assignments.
     */
    #[instrument(skip(self))]
    pub async fn release_expired_assignments(&self) -> Result<usize, ApplicationError> {
        let mut transaction = begin(connection_pool(&self.connection_pool)?).await?;
        let result = self.release_expired_assignments_in(&mut transaction, today()).await;
        let released = finish(transaction, result).await?;
        if released > 0 {
            info!("Released {released} expired assignments");
        }
        Ok(released)
    }

    async fn release_expired_assignments_in(&self, transaction: &mut PgConnection, today: NaiveDate) -> Result<usize, ApplicationError> {
        let released = self.assignment_dao.release_expired_assignments(transaction, today).await?;
        for (_, vehicle_id) in &released {
            self.vehicle_dao.update_vehicle_status(transaction, *vehicle_id, VehicleStatus::InService).await?;
        }
        Ok(released.len())
    }

    async fn check_project(&self, connection: &mut PgConnection, project_id: Option<i64>) -> Result<(), ApplicationError> {
        match project_id {
            Some(project_id) => check_reference(self.project_dao.project_exists(connection, project_id).await?, "Project", project_id),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn eligible() -> AssignmentEligibility {
        AssignmentEligibility {
            vehicle_status: VehicleStatus::InService,
            vehicle_assigned: false,
            insurance_expiry_date: Some(date(12, 31)),
            car_tax_expiry_date: None,
            employment_status: EmploymentStatus::Active,
            employment_assigned: false,
        }
    }

    #[test]
    fn test_eligible_assignment() {
        assert!(assignment_errors(&eligible(), Some(date(3, 1)), None, date(3, 1)).is_empty());
    }

    #[test]
    fn test_all_errors_collected() {
        let eligibility = AssignmentEligibility {
            vehicle_status: VehicleStatus::UnderMaintenance,
            vehicle_assigned: true,
            insurance_expiry_date: Some(date(2, 28)),
            car_tax_expiry_date: Some(date(2, 29)),
            employment_status: EmploymentStatus::Terminated,
            employment_assigned: true,
        };
        let errors = assignment_errors(&eligibility, None, None, date(3, 1));
        assert_eq!(errors.len(), 7);
        assert!(errors.contains(&"Vehicle is already assigned".to_string()));
        assert!(errors.contains(&"Vehicle insurance expired".to_string()));
        assert!(errors.contains(&"Start date is required".to_string()));
    }

    #[test]
    fn test_insurance_expiring_today_is_valid() {
        let eligibility = AssignmentEligibility { insurance_expiry_date: Some(date(3, 1)), ..eligible() };
        assert!(assignment_errors(&eligibility, Some(date(3, 1)), None, date(3, 1)).is_empty());
    }

    #[test]
    fn test_end_before_start() {
        assert_eq!(assignment_date_errors(Some(date(3, 2)), Some(date(3, 1))), vec!["End date must be after start date".to_string()]);
        assert!(assignment_date_errors(Some(date(3, 1)), Some(date(3, 1))).is_empty());
    }

    #[test]
    fn test_vehicle_status_for() {
        let today = date(3, 1);
        assert_eq!(vehicle_status_for(AssignmentStatus::Assigned, None, today), VehicleStatus::Assigned);
        assert_eq!(vehicle_status_for(AssignmentStatus::Assigned, Some(today), today), VehicleStatus::Assigned);
        assert_eq!(vehicle_status_for(AssignmentStatus::Assigned, Some(date(2, 29)), today), VehicleStatus::InService);
        assert_eq!(vehicle_status_for(AssignmentStatus::Returned, None, today), VehicleStatus::InService);
        assert_eq!(vehicle_status_for(AssignmentStatus::Booked, None, today), VehicleStatus::InService);
    }
}
