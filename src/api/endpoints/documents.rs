use actix_multipart::Multipart;
use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use super::{attachment_response, get_trace_id, parse_owner_type, read_multipart};
use crate::{
    api::{
        rest::{
            DaysQuery,
            documents::{DocumentUpdateRequest, DocumentUploadForm},
        },
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        documents::{DocumentDetailType, DocumentUpdateInputType},
    },
};

/**
 * Name offered to the client when downloading a document.
 */
fn download_name(document: &DocumentDetailType) -> &str {
    document.original_filename.as_deref().filter(|name| !name.is_empty()).unwrap_or(&document.file_name)
}

/**
 * Endpoint to upload a document for an owner, e.g. `employees/12`. The form carries `documentType`,
 * optional `issueDate` and `expiryDate`, and the `file`.
 */
#[instrument(level = "info", skip(http_request, payload, app_state), fields(service = "uploadDocument", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/fleet/documents/owners/{ownerType}/{ownerId}")]
pub async fn upload_document(path: Path<(String, i64)>, http_request: HttpRequest, payload: Multipart, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (owner_type, owner_id) = path.into_inner();
    let owner_type = parse_owner_type(&owner_type)?;
    let content = read_multipart(payload, app_state.max_upload_size).await?;
    let mut form = DocumentUploadForm::default();
    for (name, value) in content.fields {
        form.set_field(&name, value);
    }
    form.file = content.files.into_iter().find(|(name, _)| name == "file").map(|(_, file)| file);
    let (upload_input, file) = form.into_upload(owner_type, owner_id)?;
    let document = app_state.document_service.upload_document(upload_input, file).instrument(span).await?;
    Ok(HttpResponse::Created().json(document))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "listDocuments", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/documents/owners/{ownerType}/{ownerId}")]
pub async fn list_documents(path: Path<(String, i64)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (owner_type, owner_id) = path.into_inner();
    let documents = app_state.document_service.get_documents_for_owner(parse_owner_type(&owner_type)?, owner_id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(documents))
}

/**
 * Endpoint to download a file of an owner by its stored name.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "downloadOwnerFile", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/documents/owners/{ownerType}/{ownerId}/files/{fileName}")]
pub async fn download_owner_file(path: Path<(String, i64, String)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (owner_type, owner_id, file_name) = path.into_inner();
    let (document, data) = app_state.document_service.download_owner_file(parse_owner_type(&owner_type)?, owner_id, &file_name).instrument(span).await?;
    Ok(attachment_response(download_name(&document), document.content_type.as_deref(), data))
}

/**
 * Endpoint to count documents by expiry: valid, expiring soon, expired and without expiry.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "documentStatistics", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/documents:statistics")]
pub async fn document_statistics(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let statistics = app_state.document_service.get_document_statistics().instrument(span).await?;
    Ok(HttpResponse::Ok().json(statistics))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "expiringDocuments", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/documents:expiring")]
pub async fn expiring_documents(http_request: HttpRequest, query: web::Query<DaysQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let days = query.days.unwrap_or(app_state.expiry_warning_days);
    let documents = app_state.document_service.get_expiring_documents(days).instrument(span).await?;
    Ok(HttpResponse::Ok().json(documents))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "getDocument", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/documents/{documentId}")]
pub async fn get_document(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let document = app_state.document_service.get_document(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(document))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "downloadDocument", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/fleet/documents/{documentId}/download")]
pub async fn download_document(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (document, data) = app_state.document_service.download_document(path.into_inner()).instrument(span).await?;
    Ok(attachment_response(download_name(&document), document.content_type.as_deref(), data))
}

/**
 * Endpoint to change the type and dates of a document.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "updateDocument", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/fleet/documents/{documentId}")]
pub async fn update_document(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<DocumentUpdateRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let document = app_state.document_service.update_document(path.into_inner(), DocumentUpdateInputType::from(request_body.into_inner())).instrument(span).await?;
    Ok(HttpResponse::Ok().json(document))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "deleteDocument", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/fleet/documents/{documentId}")]
pub async fn delete_document(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.document_service.delete_document(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Registers the endpoints of this module.
 */
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_document);
    cfg.service(list_documents);
    cfg.service(download_owner_file);
    cfg.service(document_statistics);
    cfg.service(expiring_documents);
    cfg.service(get_document);
    cfg.service(download_document);
    cfg.service(update_document);
    cfg.service(delete_document);
}

#[cfg(test)]
mod test {
    use actix_web::{App, http::StatusCode, test};

    use super::*;
    use crate::model::config::StorageConfig;

    #[actix_web::test]
    async fn test_unknown_owner_type() {
        let state = web::Data::new(AppState::new(&StorageConfig::default(), None));
        let app = test::init_service(App::new().app_data(state).service(list_documents)).await;
        let request = test::TestRequest::get().uri("/api/services/v1_0/fleet/documents/owners/trucks/1").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["code"], 1002);
    }
}
