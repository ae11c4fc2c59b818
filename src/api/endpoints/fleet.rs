use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use super::get_trace_id;
use crate::{
    api::{
        rest::{
            CountResponse, ListResponse, PaginationQuery,
            fleet::{AssignmentListRequest, AssignmentRequest, FuelCardListRequest, FuelCardRequest, MaintenanceRequest, MileageRequest, VehicleListRequest, VehicleRequest},
        },
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        fleet::{AssignmentInputType, AssignmentListInputType, FuelCardInputType, MaintenanceInputType, VehicleInputType, VehicleListInputType},
        models::PaginationInput,
    },
};

/***************** Vehicles *********************/

/**
 * Endpoint to search vehicles by status and plate, brand or model.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listVehicles", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/vehicles:list")]
pub async fn list_vehicles(http_request: HttpRequest, request_body: web::Json<VehicleListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = VehicleListInputType::from(request_body.into_inner());
    let output = app_state.vehicle_service.get_vehicle_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getVehicle", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/vehicles/{vehicleId}")]
pub async fn get_vehicle(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let vehicle = app_state.vehicle_service.get_vehicle(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(vehicle))
}

/**
 * Endpoint to add a vehicle. New vehicles are in service.
 */
#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addVehicle", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/vehicles")]
pub async fn add_vehicle(http_request: HttpRequest, request_body: web::Json<VehicleRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let vehicle = app_state.vehicle_service.add_vehicle(VehicleInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(vehicle))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateVehicle", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/vehicles/{vehicleId}")]
pub async fn update_vehicle(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<VehicleRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let vehicle = app_state.vehicle_service.update_vehicle(path.into_inner(), VehicleInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(vehicle))
}

/**
 * Endpoint to record the current mileage of a vehicle.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "updateMileage", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/vehicles/{vehicleId}/mileage")]
pub async fn update_mileage(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<MileageRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let vehicle = app_state.vehicle_service.update_mileage(path.into_inner(), request_body.mileage).instrument(span).await?;
    Ok(HttpResponse::Ok().json(vehicle))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteVehicle", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/fleet/vehicles/{vehicleId}")]
pub async fn delete_vehicle(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.vehicle_service.delete_vehicle(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Endpoint to retrieve the assignment history of a vehicle.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "vehicleHistory", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/vehicles/{vehicleId}/assignments")]
pub async fn vehicle_history(path: Path<i64>, http_request: HttpRequest, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let output = app_state.assignment_service.get_vehicle_history(pagination_input, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

/***************** Maintenance *********************/

/**
 * Endpoint to retrieve the maintenance records of a vehicle, newest first.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listMaintenance", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/vehicles/{vehicleId}/maintenance")]
pub async fn list_maintenance(path: Path<i64>, http_request: HttpRequest, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let output = app_state.vehicle_service.get_maintenance_list(pagination_input, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getMaintenance", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/maintenance/{maintenanceId}")]
pub async fn get_maintenance(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let maintenance = app_state.vehicle_service.get_maintenance(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(maintenance))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addMaintenance", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/maintenance")]
pub async fn add_maintenance(http_request: HttpRequest, request_body: web::Json<MaintenanceRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let maintenance = app_state.vehicle_service.add_maintenance(MaintenanceInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(maintenance))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateMaintenance", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/maintenance/{maintenanceId}")]
pub async fn update_maintenance(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<MaintenanceRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let maintenance = app_state.vehicle_service.update_maintenance(path.into_inner(), MaintenanceInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(maintenance))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteMaintenance", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/fleet/maintenance/{maintenanceId}")]
pub async fn delete_maintenance(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.vehicle_service.delete_maintenance(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Assignments *********************/

/**
 * Endpoint to search assignments. Expired assignments are released first.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listAssignments", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/assignments:list")]
pub async fn list_assignments(http_request: HttpRequest, request_body: web::Json<AssignmentListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = AssignmentListInputType::from(request_body.into_inner());
    let output = app_state.assignment_service.get_assignment_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getAssignment", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/assignments/{assignmentId}")]
pub async fn get_assignment(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let assignment = app_state.assignment_service.get_assignment(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(assignment))
}

/**
 * Endpoint to assign a vehicle to an employment. Every failed eligibility check is reported.
 */
#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addAssignment", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/assignments")]
pub async fn add_assignment(http_request: HttpRequest, request_body: web::Json<AssignmentRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let assignment = app_state.assignment_service.add_assignment(AssignmentInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(assignment))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateAssignment", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/assignments/{assignmentId}")]
pub async fn update_assignment(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<AssignmentRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let assignment = app_state.assignment_service.update_assignment(path.into_inner(), AssignmentInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(assignment))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteAssignment", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/fleet/assignments/{assignmentId}")]
pub async fn delete_assignment(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.assignment_service.delete_assignment(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Endpoint to return every vehicle whose assignment has ended.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "releaseExpiredAssignments", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/assignments:releaseExpired")]
pub async fn release_expired_assignments(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let released = app_state.assignment_service.release_expired_assignments().instrument(span).await?;
    Ok(HttpResponse::Ok().json(CountResponse { count: released as u64 }))
}

/***************** Fuel cards *********************/

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listFuelCards", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/fuelcards:list")]
pub async fn list_fuel_cards(http_request: HttpRequest, request_body: web::Json<FuelCardListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let output = app_state.fuel_card_service.get_fuel_card_list(pagination_input, request_body.active).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getFuelCard", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/fuelcards/{fuelCardId}")]
pub async fn get_fuel_card(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let fuel_card = app_state.fuel_card_service.get_fuel_card(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(fuel_card))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addFuelCard", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/fuelcards")]
pub async fn add_fuel_card(http_request: HttpRequest, request_body: web::Json<FuelCardRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let fuel_card = app_state.fuel_card_service.add_fuel_card(FuelCardInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(fuel_card))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateFuelCard", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/fuelcards/{fuelCardId}")]
pub async fn update_fuel_card(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<FuelCardRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let fuel_card = app_state.fuel_card_service.update_fuel_card(path.into_inner(), FuelCardInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(fuel_card))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteFuelCard", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/fleet/fuelcards/{fuelCardId}")]
pub async fn delete_fuel_card(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.fuel_card_service.delete_fuel_card(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Registers the endpoints of this module.
 */
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_vehicles);
    cfg.service(get_vehicle);
    cfg.service(add_vehicle);
    cfg.service(update_vehicle);
    cfg.service(update_mileage);
    cfg.service(delete_vehicle);
    cfg.service(vehicle_history);
    cfg.service(list_maintenance);
    cfg.service(get_maintenance);
    cfg.service(add_maintenance);
    cfg.service(update_maintenance);
    cfg.service(delete_maintenance);
    cfg.service(list_assignments);
    cfg.service(get_assignment);
    cfg.service(add_assignment);
    cfg.service(update_assignment);
    cfg.service(delete_assignment);
    cfg.service(release_expired_assignments);
    cfg.service(list_fuel_cards);
    cfg.service(get_fuel_card);
    cfg.service(add_fuel_card);
    cfg.service(update_fuel_card);
    cfg.service(delete_fuel_card);
}
