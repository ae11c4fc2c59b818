pub mod dashboard;
pub mod documents;
pub mod fleet;
pub mod operations;
pub mod personnel;
pub mod registry;

use std::str::FromStr;

use actix_multipart::{Multipart, MultipartError};
use actix_web::{
    HttpRequest, HttpResponse,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
};
use futures_util::StreamExt;

use crate::{
    model::{
        apperror::{ApplicationError, ErrorType},
        enums::DocumentOwnerType,
    },
    service::storage::UploadedFile,
};

/**
 * Text fields and files of a multipart request.
 */
#[derive(Debug, Default)]
pub struct FormContent {
    pub fields: Vec<(String, String)>,
    /**
     * Files with the name of the form field that carried them.
     */
    pub files: Vec<(String, UploadedFile)>,
}

impl FormContent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(field_name, _)| field_name == name).map(|(_, value)| value.as_str())
    }
}

/**
 * Most parts accepted in one multipart request.
 */
pub const MAX_MULTIPART_PARTS: usize = 200;

/**
 * Most bytes accepted over all parts of one multipart request.
 */
pub const MAX_MULTIPART_TOTAL_SIZE: u64 = 200 * 1024 * 1024;

/**
 * Size and count limits of a multipart request.
 */
#[derive(Debug, Clone, Copy)]
pub struct MultipartLimits {
    pub max_part_size: u64,
    pub max_parts: usize,
    pub max_total_size: u64,
}

impl MultipartLimits {
    /**
     * Default limits with the given largest part. The total is never below one part.
     */
    pub fn with_part_size(max_part_size: u64) -> Self {
        MultipartLimits { max_part_size, max_parts: MAX_MULTIPART_PARTS, max_total_size: MAX_MULTIPART_TOTAL_SIZE.max(max_part_size) }
    }
}

/**
 * Reads a whole multipart request into memory with the default limits.
 *
 * # Arguments
 * `payload`: The multipart stream.
 * `max_size`: Largest accepted part in bytes.
 */
pub async fn read_multipart(payload: Multipart, max_size: u64) -> Result<FormContent, ApplicationError> {
    read_multipart_limited(payload, MultipartLimits::with_part_size(max_size)).await
}

/**
 * Reads a whole multipart request into memory. A part carrying a file name is a file,
 * everything else a text field.
 *
 * # Returns
 * The fields and files, or a payload too large error as soon as a part, the part count
 * or the total size exceeds its limit.
 */
pub async fn read_multipart_limited(mut payload: Multipart, limits: MultipartLimits) -> Result<FormContent, ApplicationError> {
    let mut content = FormContent::default();
    let mut parts = 0usize;
    let mut total_size = 0u64;
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(multipart_error)?;
        parts += 1;
        if parts > limits.max_parts {
            return Err(ApplicationError::new(ErrorType::PayloadTooLarge, format!("The request has more than {} parts", limits.max_parts)));
        }
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.content_disposition().and_then(|disposition| disposition.get_filename()).map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.essence_str().to_string());
        let mut data: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(multipart_error)?;
            let chunk_size = u64::try_from(chunk.len()).unwrap_or(u64::MAX);
            if u64::try_from(data.len()).unwrap_or(u64::MAX).saturating_add(chunk_size) > limits.max_part_size {
                return Err(ApplicationError::new(ErrorType::PayloadTooLarge, format!("The part {name} exceeds the maximum size of {} MB", limits.max_part_size / (1024 * 1024))));
            }
            total_size = total_size.saturating_add(chunk_size);
            if total_size > limits.max_total_size {
                return Err(ApplicationError::new(ErrorType::PayloadTooLarge, format!("The request exceeds the maximum size of {} MB", limits.max_total_size / (1024 * 1024))));
            }
            data.extend_from_slice(&chunk);
        }
        match file_name {
            Some(file_name) => content.files.push((name, UploadedFile { file_name, content_type, data })),
            None => {
                let value = String::from_utf8(data).map_err(|_| ApplicationError::new(ErrorType::Validation, format!("The field {name} is not valid text")))?;
                content.fields.push((name, value));
            }
        }
    }
    Ok(content)
}

fn multipart_error(err: MultipartError) -> ApplicationError {
    ApplicationError::new(ErrorType::Validation, format!("Invalid multipart request: {err}"))
}

/**
 * Builds a download response with an attachment disposition.
 *
 * # Arguments
 * `file_name`: Name offered to the client.
 * `content_type`: Stored content type, guessed from the name when missing.
 * `data`: File contents.
 */
pub fn attachment_response(file_name: &str, content_type: Option<&str>, data: Vec<u8>) -> HttpResponse {
    let content_type = match content_type {
        Some(content_type) if !content_type.is_empty() => content_type.to_string(),
        _ => mime_guess::from_path(file_name).first_or_octet_stream().essence_str().to_string(),
    };
    HttpResponse::Ok()
        .content_type(content_type)
        .insert_header(ContentDisposition { disposition: DispositionType::Attachment, parameters: vec![DispositionParam::Filename(file_name.to_string())] })
        .body(data)
}

/**
 * Parses the owner type path segment, e.g. `employees`.
 */
pub fn parse_owner_type(segment: &str) -> Result<DocumentOwnerType, ApplicationError> {
    DocumentOwnerType::from_str(segment).map_err(|()| ApplicationError::new(ErrorType::NotFound, format!("Unknown document owner {segment}")))
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
pub fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID").and_then(|v| v.to_str().ok().map(std::string::ToString::to_string)).unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod test {
    use actix_web::{
        error::PayloadError,
        http::header::{self, HeaderMap, HeaderValue},
        test::TestRequest,
        web::Bytes,
    };

    use super::*;

    const BOUNDARY: &str = "abbc761f78ff4d7cb7573b5a23f96ef0";

    fn multipart(body: String) -> Multipart {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(&format!("multipart/form-data; boundary={BOUNDARY}")).unwrap());
        let stream = futures_util::stream::once(async move { Ok::<Bytes, PayloadError>(Bytes::from(body)) });
        Multipart::new(&headers, stream)
    }

    fn payslip_body() -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"month\"\r\n\r\n2024-03\r\n\
             --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"RSSMRA85M01H501Q.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.4\r\n\
             --{BOUNDARY}--\r\n"
        )
    }

    #[actix_web::test]
    async fn test_get_trace_id_exists() {
        let request = TestRequest::default().insert_header(("X-Trace-ID", "test")).to_http_request();
        let trace_id = get_trace_id(&request);
        assert_eq!(trace_id, "test");
    }

    #[actix_web::test]
    async fn test_get_trace_id_not_exists() {
        let request = TestRequest::default().to_http_request();
        let trace_id = get_trace_id(&request);
        assert!(!trace_id.is_empty());
    }

    #[actix_web::test]
    async fn test_read_multipart() {
        let content = read_multipart(multipart(payslip_body()), 1024).await.unwrap();
        assert_eq!(content.field("month"), Some("2024-03"));
        assert_eq!(content.files.len(), 1);
        let (name, file) = &content.files[0];
        assert_eq!(name, "files");
        assert_eq!(file.file_name, "RSSMRA85M01H501Q.pdf");
        assert_eq!(file.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(file.data, b"%PDF-1.4".to_vec());
    }

    #[actix_web::test]
    async fn test_read_multipart_too_large() {
        let error = read_multipart(multipart(payslip_body()), 4).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::PayloadTooLarge);
    }

    #[actix_web::test]
    async fn test_read_multipart_too_many_parts() {
        let limits = MultipartLimits { max_part_size: 1024, max_parts: 1, max_total_size: 1024 };
        let error = read_multipart_limited(multipart(payslip_body()), limits).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::PayloadTooLarge);
        assert!(error.message.contains("more than 1 parts"));
    }

    #[actix_web::test]
    async fn test_read_multipart_total_too_large() {
        let limits = MultipartLimits { max_part_size: 1024, max_parts: 10, max_total_size: 10 };
        let error = read_multipart_limited(multipart(payslip_body()), limits).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::PayloadTooLarge);
        assert!(error.message.starts_with("The request exceeds"));
    }

    #[test]
    fn test_multipart_limits_total_covers_one_part() {
        assert_eq!(MultipartLimits::with_part_size(1024).max_total_size, MAX_MULTIPART_TOTAL_SIZE);
        assert_eq!(MultipartLimits::with_part_size(MAX_MULTIPART_TOTAL_SIZE + 1).max_total_size, MAX_MULTIPART_TOTAL_SIZE + 1);
        assert_eq!(MultipartLimits::with_part_size(1024).max_parts, MAX_MULTIPART_PARTS);
    }

    #[test]
    fn test_attachment_response() {
        let response = attachment_response("libretto.pdf", None, vec![1, 2, 3]);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");
        let disposition = response.headers().get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("libretto.pdf"));
    }

    #[test]
    fn test_parse_owner_type() {
        assert_eq!(parse_owner_type("expense-items").unwrap(), DocumentOwnerType::ExpenseItem);
        assert_eq!(parse_owner_type("unknown").unwrap_err().error_type, ErrorType::NotFound);
    }
}
