use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use super::get_trace_id;
use crate::{
    api::{
        rest::{
            DaysQuery, EmptyRequest, IdsRequest, ListResponse, PaginationQuery,
            operations::{BookingRangeQuery, BookingRequest, RefuelListRequest, RefuelRequest, RoleRequest, TaskRequest, TaskStatusQuery},
        },
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::PaginationInput,
        operations::{BookingInputType, DEFAULT_UPCOMING_BOOKING_DAYS, RefuelInputType, RefuelListInputType, VehicleTaskInputType},
        personnel::EmployeeRoleInputType,
    },
};

/***************** Tasks *********************/

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listTaskTypes", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/task-types")]
pub async fn list_task_types(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let task_types = app_state.task_service.get_task_type_list().instrument(span).await?;
    Ok(HttpResponse::Ok().json(task_types))
}

/**
 * Endpoint to list the deadlines of a vehicle. A vehicle without open tasks gets its auto tasks first.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listVehicleTasks", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/vehicles/{vehicleId}/tasks")]
pub async fn list_vehicle_tasks(path: Path<i64>, http_request: HttpRequest, status: web::Query<TaskStatusQuery>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let output = app_state.task_service.get_task_list(pagination_input, path.into_inner(), status.status).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

/**
 * Endpoint to choose the auto task types a vehicle follows.
 */
#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateAutoTasks", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/vehicles/{vehicleId}/tasks/auto")]
pub async fn update_auto_tasks(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<IdsRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.task_service.update_auto_tasks(path.into_inner(), request_body.into_inner().ids).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getTask", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/tasks/{taskId}")]
pub async fn get_task(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let task = app_state.task_service.get_task(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(task))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addTask", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/tasks")]
pub async fn add_task(http_request: HttpRequest, request_body: web::Json<TaskRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let task = app_state.task_service.add_task(VehicleTaskInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(task))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateTask", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/tasks/{taskId}")]
pub async fn update_task(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<TaskRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let task = app_state.task_service.update_task(path.into_inner(), VehicleTaskInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(task))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteTask", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/fleet/tasks/{taskId}")]
pub async fn delete_task(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.task_service.delete_task(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Refuels *********************/

/**
 * Endpoint to search refuels by vehicle, card, year and date range.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listRefuels", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/refuels:list")]
pub async fn list_refuels(http_request: HttpRequest, request_body: web::Json<RefuelListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = RefuelListInputType::from(request_body.into_inner());
    let output = app_state.refuel_service.get_refuel_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getRefuel", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/refuels/{refuelId}")]
pub async fn get_refuel(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let refuel = app_state.refuel_service.get_refuel(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(refuel))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addRefuel", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/refuels")]
pub async fn add_refuel(http_request: HttpRequest, request_body: web::Json<RefuelRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let refuel = app_state.refuel_service.add_refuel(RefuelInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(refuel))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateRefuel", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/refuels/{refuelId}")]
pub async fn update_refuel(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<RefuelRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let refuel = app_state.refuel_service.update_refuel(path.into_inner(), RefuelInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(refuel))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteRefuel", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/fleet/refuels/{refuelId}")]
pub async fn delete_refuel(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.refuel_service.delete_refuel(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Mileage log *********************/

/**
 * Endpoint to retrieve the mileage readings of a vehicle, newest first.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "mileageLog", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/vehicles/{vehicleId}/mileage-log")]
pub async fn mileage_log(path: Path<i64>, http_request: HttpRequest, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let output = app_state.mileage_service.get_mileage_list(pagination_input, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

/***************** Bookings *********************/

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listBookings", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/vehicles/{vehicleId}/bookings")]
pub async fn list_bookings(path: Path<i64>, http_request: HttpRequest, range: web::Query<BookingRangeQuery>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = range.into_inner().into_input(path.into_inner());
    let output = app_state.booking_service.get_booking_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

/**
 * Endpoint to count active bookings, bookings of today and bookings starting within `days`.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "countBookings", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/bookings:counts")]
pub async fn count_bookings(http_request: HttpRequest, query: web::Query<DaysQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let days = query.days.unwrap_or(DEFAULT_UPCOMING_BOOKING_DAYS);
    let counts = app_state.booking_service.count_bookings(days).instrument(span).await?;
    Ok(HttpResponse::Ok().json(counts))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getBooking", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/bookings/{bookingId}")]
pub async fn get_booking(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let booking = app_state.booking_service.get_booking(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(booking))
}

/**
 * Endpoint to book a vehicle in service that is free in the requested slot.
 */
#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addBooking", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/bookings")]
pub async fn add_booking(http_request: HttpRequest, request_body: web::Json<BookingRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let booking = app_state.booking_service.add_booking(BookingInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(booking))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateBooking", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/bookings/{bookingId}")]
pub async fn update_booking(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<BookingRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let booking = app_state.booking_service.update_booking(path.into_inner(), BookingInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(booking))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteBooking", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/fleet/bookings/{bookingId}")]
pub async fn delete_booking(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.booking_service.delete_booking(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Roles *********************/

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listRoles", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/roles:list")]
pub async fn list_roles(http_request: HttpRequest, _request_body: web::Json<EmptyRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let output = app_state.role_service.get_role_list(pagination_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getRole", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/settings/roles/{roleId}")]
pub async fn get_role(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let role = app_state.role_service.get_role(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(role))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addRole", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/settings/roles")]
pub async fn add_role(http_request: HttpRequest, request_body: web::Json<RoleRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let role = app_state.role_service.add_role(EmployeeRoleInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(role))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateRole", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/settings/roles/{roleId}")]
pub async fn update_role(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<RoleRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let role = app_state.role_service.update_role(path.into_inner(), EmployeeRoleInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(role))
}

/**
 * Endpoint to delete a role no employee holds.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteRole", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/settings/roles/{roleId}")]
pub async fn delete_role(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.role_service.delete_role(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getEmployeeRoles", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/employees/{employeeId}/roles")]
pub async fn get_employee_roles(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let roles = app_state.role_service.get_employee_roles(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(roles))
}

/**
 * Endpoint to replace the roles of an employee.
 */
#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "setEmployeeRoles", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/employees/{employeeId}/roles")]
pub async fn set_employee_roles(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<IdsRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let roles = app_state.role_service.set_employee_roles(path.into_inner(), request_body.into_inner().ids).instrument(span).await?;
    Ok(HttpResponse::Ok().json(roles))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_task_types);
    cfg.service(list_vehicle_tasks);
    cfg.service(update_auto_tasks);
    cfg.service(get_task);
    cfg.service(add_task);
    cfg.service(update_task);
    cfg.service(delete_task);
    cfg.service(list_refuels);
    cfg.service(get_refuel);
    cfg.service(add_refuel);
    cfg.service(update_refuel);
    cfg.service(delete_refuel);
    cfg.service(mileage_log);
    cfg.service(list_bookings);
    cfg.service(count_bookings);
    cfg.service(get_booking);
    cfg.service(add_booking);
    cfg.service(update_booking);
    cfg.service(delete_booking);
    cfg.service(list_roles);
    cfg.service(get_role);
    cfg.service(add_role);
    cfg.service(update_role);
    cfg.service(delete_role);
    cfg.service(get_employee_roles);
    cfg.service(set_employee_roles);
}

#[cfg(test)]
mod test {
    use actix_web::{App, http::StatusCode, test};

    use super::*;
    use crate::model::config::StorageConfig;

    #[actix_web::test]
    async fn test_booking_ending_before_start_is_rejected() {
        let state = web::Data::new(AppState::new(&StorageConfig::default(), None));
        let app = test::init_service(App::new().app_data(state).service(add_booking)).await;
        let request = test::TestRequest::post()
            .uri("/api/services/v1_0/fleet/bookings")
            .set_json(serde_json::json!({ "vehicleId": 1, "startDatetime": "2024-06-03T12:00:00", "endDatetime": "2024-06-03T09:00:00" }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["code"], 1004);
        assert_eq!(body["errors"][0], "endDatetime: must be after the start");
    }

    #[actix_web::test]
    async fn test_negative_booking_window_is_rejected() {
        let state = web::Data::new(AppState::new(&StorageConfig::default(), None));
        let app = test::init_service(App::new().app_data(state).service(count_bookings).service(get_booking)).await;
        let request = test::TestRequest::get().uri("/api/services/v1_0/fleet/bookings:counts?days=-1").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_refuel_without_quantity_is_rejected() {
        let state = web::Data::new(AppState::new(&StorageConfig::default(), None));
        let app = test::init_service(App::new().app_data(state).service(add_refuel)).await;
        let request = test::TestRequest::post()
            .uri("/api/services/v1_0/fleet/refuels")
            .set_json(serde_json::json!({ "vehicleId": 1, "refuelDate": "2024-06-01", "amount": "50.00" }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["errors"][0], "quantity: required");
    }
}
