pub mod documents;
pub mod fleet;
pub mod operations;
pub mod personnel;
pub mod registry;

use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{ListOutputType, PaginationInput, PaginationOutput},
};

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
    /**
     * Every failed check, when there were several.
     */
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    /**
     * Generates an error response for the application error.
     */
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone(), errors: self.errors.clone() };
        HttpResponse::build(get_statuscode(&self.error_type)).json(&error_response)
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::Initialization | ErrorType::DatabaseError | ErrorType::Storage | ErrorType::Application => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::ConstraintViolation => StatusCode::CONFLICT,
        ErrorType::Validation | ErrorType::BusinessRule | ErrorType::FileValidation => StatusCode::BAD_REQUEST,
        ErrorType::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorType::Security => StatusCode::FORBIDDEN,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::Initialization => 1000,
        ErrorType::DatabaseError => 1001,
        ErrorType::NotFound => 1002,
        ErrorType::ConstraintViolation => 1003,
        ErrorType::Validation => 1004,
        ErrorType::BusinessRule => 1005,
        ErrorType::FileValidation => 1006,
        ErrorType::PayloadTooLarge => 1007,
        ErrorType::Security => 1008,
        ErrorType::Storage => 1009,
        ErrorType::Application => 1010,
    }
}

/***************** Common models *********************/

/**
 * Pagination query parameters for API requests.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    /**
     * The index of the first item to return.
     */
    pub start_index: Option<i64>,
    /**
     * The size of the page to return.
     */
    pub page_size: Option<i64>,
}

impl From<web::Query<PaginationQuery>> for PaginationInput {
    fn from(query: web::Query<PaginationQuery>) -> Self {
        PaginationInput::new(query.start_index, query.page_size)
    }
}

/**
 * Pagination response structure.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse {
    /**
     * The starting index of the returned items.
     */
    pub start_index: Option<i64>,
    /**
     * The size of the page.
     */
    pub page_size: Option<i64>,
    /**
     * Indicates if there are more items available.
     */
    pub has_more_elements: bool,
}

impl From<PaginationOutput> for PaginationResponse {
    fn from(pagination_output: PaginationOutput) -> Self {
        PaginationResponse { start_index: Some(pagination_output.start_index), page_size: Some(pagination_output.page_size), has_more_elements: pagination_output.has_more }
    }
}

/**
 * A page of elements returned by list endpoints.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T: Serialize> {
    pub elements: Vec<T>,
    pub pagination: PaginationResponse,
}

impl<T: Serialize> From<ListOutputType<T>> for ListResponse<T> {
    fn from(output: ListOutputType<T>) -> Self {
        ListResponse { elements: output.elements, pagination: PaginationResponse::from(output.pagination) }
    }
}

/**
 * Query parameter selecting a window of days.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaysQuery {
    pub days: Option<i64>,
}

/**
 * Body listing ids of elements to act on.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdsRequest {
    pub ids: Vec<i64>,
}

/**
 * Number of elements affected by a bulk operation.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub count: u64,
}

/**
 * Empty filter body of list endpoints without criteria.
 */
#[derive(Debug, Default, Deserialize)]
pub struct EmptyRequest {}

#[cfg(test)]
mod test {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_codes() {
        assert_eq!(get_statuscode(&ErrorType::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(get_statuscode(&ErrorType::ConstraintViolation), StatusCode::CONFLICT);
        assert_eq!(get_statuscode(&ErrorType::BusinessRule), StatusCode::BAD_REQUEST);
        assert_eq!(get_statuscode(&ErrorType::PayloadTooLarge), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(get_statuscode(&ErrorType::Security), StatusCode::FORBIDDEN);
        assert_eq!(get_statuscode(&ErrorType::Storage), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(get_error_code(&ErrorType::Initialization), 1000);
        assert_eq!(get_error_code(&ErrorType::Validation), 1004);
        assert_eq!(get_error_code(&ErrorType::Application), 1010);
    }

    #[actix_web::test]
    async fn test_error_body_omits_empty_errors() {
        let response = ApplicationError::new(ErrorType::NotFound, "Vehicle with id 1 not found".to_string()).error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 1002);
        assert!(json.get("errors").is_none());
    }

    #[actix_web::test]
    async fn test_error_body_lists_errors() {
        let response = ApplicationError::business_rule("Vehicle cannot be assigned".to_string(), vec!["a".to_string(), "b".to_string()]).error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 1005);
        assert_eq!(json["errors"].as_array().map(Vec::len), Some(2));
    }
}
