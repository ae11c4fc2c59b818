use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use super::get_trace_id;
use crate::{
    api::{
        rest::{
            DaysQuery, ListResponse, PaginationQuery,
            registry::{
                ComplianceItemListRequest, ComplianceItemRequest, ContractListRequest, ContractRequest, CorrespondenceListRequest, CorrespondenceRequest, InsuranceListRequest, InsuranceRequest, LastProtocolQuery, ProjectListRequest,
                ProjectRequest, ProtocolResponse, SupplierListRequest, SupplierRequest, UpcomingQuery,
            },
        },
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::PaginationInput,
        registry::{
            ComplianceItemInputType, ComplianceItemListInputType, ContractInputType, ContractListInputType, CorrespondenceInputType, CorrespondenceListInputType, InsuranceInputType, InsuranceListInputType, ProjectInputType,
            ProjectListInputType, SupplierInputType, SupplierListInputType,
        },
    },
};

/**
 * Number of upcoming compliance items returned when no limit is given.
 */
const DEFAULT_UPCOMING_LIMIT: i64 = 10;

/***************** Suppliers *********************/

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listSuppliers", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/suppliers:list")]
pub async fn list_suppliers(http_request: HttpRequest, request_body: web::Json<SupplierListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = SupplierListInputType::from(request_body.into_inner());
    let output = app_state.supplier_service.get_supplier_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getSupplier", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/settings/suppliers/{supplierId}")]
pub async fn get_supplier(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let supplier = app_state.supplier_service.get_supplier(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(supplier))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addSupplier", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/suppliers")]
pub async fn add_supplier(http_request: HttpRequest, request_body: web::Json<SupplierRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let supplier = app_state.supplier_service.add_supplier(SupplierInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(supplier))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateSupplier", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/settings/suppliers/{supplierId}")]
pub async fn update_supplier(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<SupplierRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let supplier = app_state.supplier_service.update_supplier(path.into_inner(), SupplierInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(supplier))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteSupplier", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/settings/suppliers/{supplierId}")]
pub async fn delete_supplier(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.supplier_service.delete_supplier(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Contracts *********************/

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listContracts", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/contracts:list")]
pub async fn list_contracts(http_request: HttpRequest, request_body: web::Json<ContractListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = ContractListInputType::from(request_body.into_inner());
    let output = app_state.contract_service.get_contract_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

/**
 * Endpoint to count contracts as draft, active, expiring and expired.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "contractStatistics", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/settings/contracts:statistics")]
pub async fn contract_statistics(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let statistics = app_state.contract_service.get_contract_statistics().instrument(span).await?;
    Ok(HttpResponse::Ok().json(statistics))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getContract", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/settings/contracts/{contractId}")]
pub async fn get_contract(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let contract = app_state.contract_service.get_contract(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(contract))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addContract", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/contracts")]
pub async fn add_contract(http_request: HttpRequest, request_body: web::Json<ContractRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let contract = app_state.contract_service.add_contract(ContractInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(contract))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateContract", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/settings/contracts/{contractId}")]
pub async fn update_contract(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<ContractRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let contract = app_state.contract_service.update_contract(path.into_inner(), ContractInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(contract))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteContract", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/settings/contracts/{contractId}")]
pub async fn delete_contract(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.contract_service.delete_contract(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Insurances *********************/

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listInsurances", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/insurances:list")]
pub async fn list_insurances(http_request: HttpRequest, request_body: web::Json<InsuranceListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = InsuranceListInputType::from(request_body.into_inner());
    let output = app_state.insurance_service.get_insurance_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

/**
 * Endpoint to list policies expiring within `days`, the warning window by default.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "expiringInsurances", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/settings/insurances:expiring")]
pub async fn expiring_insurances(http_request: HttpRequest, query: web::Query<DaysQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let days = query.days.unwrap_or(app_state.expiry_warning_days);
    let insurances = app_state.insurance_service.get_expiring_insurances(days).instrument(span).await?;
    Ok(HttpResponse::Ok().json(insurances))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getInsurance", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/settings/insurances/{insuranceId}")]
pub async fn get_insurance(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let insurance = app_state.insurance_service.get_insurance(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(insurance))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addInsurance", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/insurances")]
pub async fn add_insurance(http_request: HttpRequest, request_body: web::Json<InsuranceRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let insurance = app_state.insurance_service.add_insurance(InsuranceInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(insurance))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateInsurance", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/settings/insurances/{insuranceId}")]
pub async fn update_insurance(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<InsuranceRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let insurance = app_state.insurance_service.update_insurance(path.into_inner(), InsuranceInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(insurance))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteInsurance", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/settings/insurances/{insuranceId}")]
pub async fn delete_insurance(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.insurance_service.delete_insurance(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Projects *********************/

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listProjects", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/projects:list")]
pub async fn list_projects(http_request: HttpRequest, request_body: web::Json<ProjectListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = ProjectListInputType::from(request_body.into_inner());
    let output = app_state.project_service.get_project_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getProject", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/settings/projects/{projectId}")]
pub async fn get_project(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let project = app_state.project_service.get_project(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(project))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addProject", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/projects")]
pub async fn add_project(http_request: HttpRequest, request_body: web::Json<ProjectRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let project = app_state.project_service.add_project(ProjectInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(project))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateProject", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/settings/projects/{projectId}")]
pub async fn update_project(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<ProjectRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let project = app_state.project_service.update_project(path.into_inner(), ProjectInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(project))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteProject", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/settings/projects/{projectId}")]
pub async fn delete_project(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.project_service.delete_project(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Correspondence *********************/

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listCorrespondence", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/correspondence:list")]
pub async fn list_correspondence(http_request: HttpRequest, request_body: web::Json<CorrespondenceListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = CorrespondenceListInputType::from(request_body.into_inner());
    let output = app_state.correspondence_service.get_correspondence_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

/**
 * Endpoint to list the years with registered correspondence.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "correspondenceYears", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/settings/correspondence:years")]
pub async fn correspondence_years(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let years = app_state.correspondence_service.get_years().instrument(span).await?;
    Ok(HttpResponse::Ok().json(years))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "lastProtocol", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/settings/correspondence:lastProtocol")]
pub async fn last_protocol(http_request: HttpRequest, query: web::Query<LastProtocolQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let protocol = app_state.correspondence_service.get_last_protocol(query.correspondence_type).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ProtocolResponse { protocol }))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getCorrespondence", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/settings/correspondence/{correspondenceId}")]
pub async fn get_correspondence(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let correspondence = app_state.correspondence_service.get_correspondence(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(correspondence))
}

/**
 * Endpoint to register correspondence. A progressive of 0 takes the next free number of the year.
 */
#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "registerCorrespondence", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/correspondence")]
pub async fn register_correspondence(http_request: HttpRequest, request_body: web::Json<CorrespondenceRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let correspondence = app_state.correspondence_service.register_correspondence(CorrespondenceInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(correspondence))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateCorrespondence", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/settings/correspondence/{correspondenceId}")]
pub async fn update_correspondence(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<CorrespondenceRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let correspondence = app_state.correspondence_service.update_correspondence(path.into_inner(), CorrespondenceInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(correspondence))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteCorrespondence", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/settings/correspondence/{correspondenceId}")]
pub async fn delete_correspondence(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.correspondence_service.delete_correspondence(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Compliance *********************/

/**
 * Endpoint to search compliance items, earliest due date first.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listComplianceItems", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/compliance:list")]
pub async fn list_compliance_items(http_request: HttpRequest, request_body: web::Json<ComplianceItemListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = ComplianceItemListInputType::from(request_body.into_inner());
    let output = app_state.compliance_service.get_compliance_item_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "upcomingComplianceItems", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/settings/compliance:upcoming")]
pub async fn upcoming_compliance_items(http_request: HttpRequest, query: web::Query<UpcomingQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let days = query.days.unwrap_or(app_state.expiry_warning_days);
    let limit = query.limit.unwrap_or(DEFAULT_UPCOMING_LIMIT);
    let items = app_state.compliance_service.get_upcoming_compliance_items(days, limit).instrument(span).await?;
    Ok(HttpResponse::Ok().json(items))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getComplianceItem", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/settings/compliance/{complianceItemId}")]
pub async fn get_compliance_item(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let item = app_state.compliance_service.get_compliance_item(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(item))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addComplianceItem", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/compliance")]
pub async fn add_compliance_item(http_request: HttpRequest, request_body: web::Json<ComplianceItemRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let item = app_state.compliance_service.add_compliance_item(ComplianceItemInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(item))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateComplianceItem", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/settings/compliance/{complianceItemId}")]
pub async fn update_compliance_item(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<ComplianceItemRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let item = app_state.compliance_service.update_compliance_item(path.into_inner(), ComplianceItemInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(item))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteComplianceItem", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/settings/compliance/{complianceItemId}")]
pub async fn delete_compliance_item(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.compliance_service.delete_compliance_item(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Registers the endpoints of this module.
 */
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_suppliers);
    cfg.service(get_supplier);
    cfg.service(add_supplier);
    cfg.service(update_supplier);
    cfg.service(delete_supplier);
    cfg.service(list_contracts);
    cfg.service(contract_statistics);
    cfg.service(get_contract);
    cfg.service(add_contract);
    cfg.service(update_contract);
    cfg.service(delete_contract);
    cfg.service(list_insurances);
    cfg.service(expiring_insurances);
    cfg.service(get_insurance);
    cfg.service(add_insurance);
    cfg.service(update_insurance);
    cfg.service(delete_insurance);
    cfg.service(list_projects);
    cfg.service(get_project);
    cfg.service(add_project);
    cfg.service(update_project);
    cfg.service(delete_project);
    cfg.service(list_correspondence);
    cfg.service(correspondence_years);
    cfg.service(last_protocol);
    cfg.service(get_correspondence);
    cfg.service(register_correspondence);
    cfg.service(update_correspondence);
    cfg.service(delete_correspondence);
    cfg.service(list_compliance_items);
    cfg.service(upcoming_compliance_items);
    cfg.service(get_compliance_item);
    cfg.service(add_compliance_item);
    cfg.service(update_compliance_item);
    cfg.service(delete_compliance_item);
}
