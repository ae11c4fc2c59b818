use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::{
    model::config::StorageConfig,
    service::{
        assignments::AssignmentService, bookings::BookingService, compliance::ComplianceService, contracts::ContractService, correspondence::CorrespondenceService, dashboard::DashboardService,
        documents::DocumentService, employees::EmployeeService, employments::EmploymentService, expenses::ExpenseService, fuelcards::FuelCardService, insurances::InsuranceService,
        mileage::MileageService, payslips::PayslipService, projects::ProjectService, refuels::RefuelService, roles::RoleService, storage::FileStorage, suppliers::SupplierService,
        tasks::TaskService, vehicles::VehicleService,
    },
};

/**
* Represents the application state shared across the Actix web application.
* Holds one service per entity family.
*/
pub struct AppState {
    pub employee_service: EmployeeService,
    pub employment_service: EmploymentService,
    /**
     * Vehicles and their maintenance records.
     */
    pub vehicle_service: VehicleService,
    pub assignment_service: AssignmentService,
    pub fuel_card_service: FuelCardService,
    pub task_service: TaskService,
    pub refuel_service: RefuelService,
    /**
     * Read side of the mileage log, readings are written by the owning services.
     */
    pub mileage_service: MileageService,
    pub booking_service: BookingService,
    pub role_service: RoleService,
    pub expense_service: ExpenseService,
    pub payslip_service: PayslipService,
    pub supplier_service: SupplierService,
    pub contract_service: ContractService,
    pub insurance_service: InsuranceService,
    pub project_service: ProjectService,
    pub correspondence_service: CorrespondenceService,
    pub compliance_service: ComplianceService,
    pub document_service: DocumentService,
    pub dashboard_service: DashboardService,
    /**
     * Largest accepted multipart file part in bytes.
     */
    pub max_upload_size: u64,
    /**
     * Default window in days for expiry queries.
     */
    pub expiry_warning_days: i64,
}

impl AppState {
    /**
     * Creates the services sharing one file storage and connection pool.
     *
     * # Arguments
     * `storage_config`: The document storage configuration.
     * `connection_pool`: The database pool, `None` when no database is configured.
     */
    pub fn new(storage_config: &StorageConfig, connection_pool: Option<Pool<Postgres>>) -> Self {
        let file_storage = Arc::new(FileStorage::new(storage_config));
        let expiry_warning_days = storage_config.expiry_warning_days;
        AppState {
            employee_service: EmployeeService::new(file_storage.clone(), connection_pool.clone()),
            employment_service: EmploymentService::new(file_storage.clone(), connection_pool.clone()),
            vehicle_service: VehicleService::new(file_storage.clone(), connection_pool.clone()),
            assignment_service: AssignmentService::new(file_storage.clone(), connection_pool.clone()),
            fuel_card_service: FuelCardService::new(connection_pool.clone()),
            task_service: TaskService::new(connection_pool.clone()),
            refuel_service: RefuelService::new(connection_pool.clone()),
            mileage_service: MileageService::new(connection_pool.clone()),
            booking_service: BookingService::new(connection_pool.clone()),
            role_service: RoleService::new(connection_pool.clone()),
            expense_service: ExpenseService::new(file_storage.clone(), connection_pool.clone()),
            payslip_service: PayslipService::new(file_storage.clone(), connection_pool.clone()),
            supplier_service: SupplierService::new(file_storage.clone(), connection_pool.clone()),
            contract_service: ContractService::new(file_storage.clone(), connection_pool.clone()),
            insurance_service: InsuranceService::new(file_storage.clone(), connection_pool.clone()),
            project_service: ProjectService::new(file_storage.clone(), connection_pool.clone()),
            correspondence_service: CorrespondenceService::new(file_storage.clone(), connection_pool.clone()),
            compliance_service: ComplianceService::new(file_storage.clone(), connection_pool.clone()),
            document_service: DocumentService::new(file_storage.clone(), expiry_warning_days, connection_pool.clone()),
            dashboard_service: DashboardService::new(expiry_warning_days, connection_pool),
            max_upload_size: file_storage.max_upload_size(),
            expiry_warning_days,
        }
    }
}
