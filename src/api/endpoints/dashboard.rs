use actix_web::{HttpRequest, HttpResponse, get, web};
use tracing::{Instrument, instrument};

use super::get_trace_id;
use crate::{api::state::AppState, model::apperror::ApplicationError};

/**
 * Endpoint to retrieve the dashboard figures.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "getDashboard", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/dashboard")]
pub async fn get_dashboard(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let dashboard = app_state.dashboard_service.get_dashboard().instrument(span).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}

/**
 * Registers the endpoints of this module.
 */
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_dashboard);
}

#[cfg(test)]
mod test {
    use actix_web::{App, http::StatusCode, test};

    use super::*;
    use crate::model::config::StorageConfig;

    #[actix_web::test]
    async fn test_dashboard_without_database() {
        let state = web::Data::new(AppState::new(&StorageConfig::default(), None));
        let app = test::init_service(App::new().app_data(state).service(get_dashboard)).await;
        let request = test::TestRequest::get().uri("/api/services/v1_0/dashboard").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["code"], 1001);
    }
}
