use actix_multipart::Multipart;
use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use super::{attachment_response, get_trace_id, read_multipart};
use crate::{
    api::{
        rest::{
            CountResponse, EmptyRequest, IdsRequest, ListResponse, PaginationQuery,
            personnel::{EmployeeListRequest, EmployeeRequest, EmploymentListRequest, EmploymentRequest, ExpenseReportListRequest, ExpenseReportRequest, NextReportNumberResponse, PayslipListRequest, TerminationRequest},
        },
        state::AppState,
    },
    model::{
        apperror::{ApplicationError, ErrorType},
        models::PaginationInput,
        personnel::{EmployeeInputType, EmployeeListInputType, EmploymentInputType, EmploymentListInputType, ExpenseReportInputType, ExpenseReportListInputType},
    },
};

/***************** Employees *********************/

/**
 * Endpoint to search employees by first or last name.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listEmployees", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/employees:list")]
pub async fn list_employees(http_request: HttpRequest, request_body: web::Json<EmployeeListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = EmployeeListInputType::from(request_body.into_inner());
    let output = app_state.employee_service.get_employee_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

/**
 * Endpoint to list employees without an active employment.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listAvailableEmployees", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/employees:available")]
pub async fn list_available_employees(http_request: HttpRequest, _request_body: web::Json<EmptyRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let output = app_state.employee_service.get_available_employee_list(pagination_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getEmployee", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/employees/{employeeId}")]
pub async fn get_employee(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let employee = app_state.employee_service.get_employee(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(employee))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addEmployee", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/employees")]
pub async fn add_employee(http_request: HttpRequest, request_body: web::Json<EmployeeRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let employee = app_state.employee_service.add_employee(EmployeeInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(employee))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateEmployee", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/employees/{employeeId}")]
pub async fn update_employee(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<EmployeeRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let employee = app_state.employee_service.update_employee(path.into_inner(), EmployeeInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/**
 * Endpoint to delete an employee with employments, reports, compliance items and documents.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteEmployee", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/fleet/employees/{employeeId}")]
pub async fn delete_employee(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.employee_service.delete_employee(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Employments *********************/

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listEmployments", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/employments:list")]
pub async fn list_employments(http_request: HttpRequest, request_body: web::Json<EmploymentListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = EmploymentListInputType::from(request_body.into_inner());
    let output = app_state.employment_service.get_employment_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getEmployment", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/employments/{employmentId}")]
pub async fn get_employment(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let employment = app_state.employment_service.get_employment(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(employment))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addEmployment", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/employments")]
pub async fn add_employment(http_request: HttpRequest, request_body: web::Json<EmploymentRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let employment = app_state.employment_service.add_employment(EmploymentInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Created().json(employment))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateEmployment", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/employments/{employmentId}")]
pub async fn update_employment(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<EmploymentRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let employment = app_state.employment_service.update_employment(path.into_inner(), EmploymentInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(employment))
}

/**
 * Endpoint to terminate an employment at a given date.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "terminateEmployment", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/employments/{employmentId}/termination")]
pub async fn terminate_employment(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<TerminationRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let employment = app_state.employment_service.terminate_employment(path.into_inner(), request_body.end_date).instrument(span).await?;
    Ok(HttpResponse::Ok().json(employment))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteEmployment", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/fleet/employments/{employmentId}")]
pub async fn delete_employment(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.employment_service.delete_employment(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Expense reports *********************/

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listExpenseReports", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/expensereports:list")]
pub async fn list_expense_reports(http_request: HttpRequest, request_body: web::Json<ExpenseReportListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let filter = ExpenseReportListInputType::from(request_body.into_inner());
    let output = app_state.expense_service.get_expense_report_list(pagination_input, filter).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

/**
 * Endpoint to retrieve the prefix of the next report number.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "nextReportNumber", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/expensereports:nextNumber")]
pub async fn next_report_number(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let report_number_base = app_state.expense_service.get_next_report_number_base().instrument(span).await?;
    Ok(HttpResponse::Ok().json(NextReportNumberResponse { report_number_base }))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getExpenseReport", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/expensereports/{reportId}")]
pub async fn get_expense_report(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let report = app_state.expense_service.get_expense_report(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(report))
}

/**
 * Endpoint to create an expense report from its item rows. Blank rows are skipped.
 */
#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addExpenseReport", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/expensereports")]
pub async fn add_expense_report(http_request: HttpRequest, request_body: web::Json<ExpenseReportRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let report_input = ExpenseReportInputType::try_from(request_body.into_inner())?;
    let report = app_state.expense_service.add_expense_report(report_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(report))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "updateExpenseReport", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/expensereports/{reportId}")]
pub async fn update_expense_report(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<ExpenseReportRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let report_input = ExpenseReportInputType::try_from(request_body.into_inner())?;
    let report = app_state.expense_service.update_expense_report(path.into_inner(), report_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(report))
}

/**
 * Endpoint to switch a report between approved and draft.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "toggleExpenseApproval", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/expensereports/{reportId}/approval")]
pub async fn toggle_expense_approval(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let report = app_state.expense_service.toggle_approval(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteExpenseReport", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/fleet/expensereports/{reportId}")]
pub async fn delete_expense_report(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.expense_service.delete_expense_report(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Payslips *********************/

/**
 * Endpoint to upload the payslips of a month. The form carries `month` and one or more `files`.
 */
#[instrument(level = "info", skip(http_request, payload, app_state), fields(service = "uploadPayslips", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/payslips")]
pub async fn upload_payslips(http_request: HttpRequest, payload: Multipart, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let form = read_multipart(payload, app_state.max_upload_size).await?;
    let month = form.field("month").map(str::to_string).ok_or_else(|| ApplicationError::new(ErrorType::Validation, "month: required".to_string()))?;
    let files = form.files.into_iter().map(|(_, file)| file).collect();
    let result = app_state.payslip_service.upload_payslips(&month, files).instrument(span).await?;
    Ok(HttpResponse::Ok().json(result))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listPayslips", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/payslips:list")]
pub async fn list_payslips(http_request: HttpRequest, request_body: web::Json<PayslipListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let output = app_state.payslip_service.get_payslip_list(pagination_input, &request_body.month).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(output)))
}

/**
 * Endpoint to list the months with payslips, newest first.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listPayslipMonths", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/payslips:months")]
pub async fn list_payslip_months(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let months = app_state.payslip_service.get_payslip_months().instrument(span).await?;
    Ok(HttpResponse::Ok().json(months))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "downloadPayslip", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/payslips/{payslipId}/download")]
pub async fn download_payslip(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (payslip, data) = app_state.payslip_service.download_payslip(path.into_inner()).instrument(span).await?;
    let file_name = payslip.original_filename.unwrap_or_else(|| format!("{}.pdf", payslip.fiscal_code));
    Ok(attachment_response(&file_name, None, data))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deletePayslip", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/fleet/payslips/{payslipId}")]
pub async fn delete_payslip(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.payslip_service.delete_payslip(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Endpoint to delete several payslips at once.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "deletePayslips", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/payslips:delete")]
pub async fn delete_payslips(http_request: HttpRequest, request_body: web::Json<IdsRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let deleted = app_state.payslip_service.delete_payslips(request_body.into_inner().ids).instrument(span).await?;
    Ok(HttpResponse::Ok().json(CountResponse { count: deleted as u64 }))
}

/**
 * Registers the endpoints of this module.
 */
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_employees);
    cfg.service(list_available_employees);
    cfg.service(get_employee);
    cfg.service(add_employee);
    cfg.service(update_employee);
    cfg.service(delete_employee);
    cfg.service(list_employments);
    cfg.service(get_employment);
    cfg.service(add_employment);
    cfg.service(update_employment);
    cfg.service(terminate_employment);
    cfg.service(delete_employment);
    cfg.service(list_expense_reports);
    cfg.service(next_report_number);
    cfg.service(get_expense_report);
    cfg.service(add_expense_report);
    cfg.service(update_expense_report);
    cfg.service(toggle_expense_approval);
    cfg.service(delete_expense_report);
    cfg.service(upload_payslips);
    cfg.service(list_payslips);
    cfg.service(list_payslip_months);
    cfg.service(download_payslip);
    cfg.service(delete_payslip);
    cfg.service(delete_payslips);
}

#[cfg(test)]
mod test {
    use actix_web::{App, http::StatusCode, test};

    use super::*;
    use crate::model::config::StorageConfig;

    #[actix_web::test]
    async fn test_blank_expense_report_is_rejected() {
        let state = web::Data::new(AppState::new(&StorageConfig::default(), None));
        let app = test::init_service(App::new().app_data(state).service(add_expense_report)).await;
        let request = test::TestRequest::post()
            .uri("/api/services/v1_0/fleet/expensereports")
            .set_json(serde_json::json!({ "employeeId": 1, "items": [{ "description": " ", "amount": "" }] }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["code"], 1004);
        assert_eq!(body["errors"][0], "items: add at least one expense item");
    }

    #[actix_web::test]
    async fn test_invalid_page_size_is_rejected() {
        let state = web::Data::new(AppState::new(&StorageConfig::default(), None));
        let app = test::init_service(App::new().app_data(state).service(list_employees)).await;
        let request = test::TestRequest::post().uri("/api/services/v1_0/fleet/employees:list?pageSize=0").set_json(serde_json::json!({})).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
