use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    model::{
        apperror::{ApplicationError, ErrorType},
        documents::{DocumentUpdateInputType, DocumentUploadInputType},
        enums::{DocumentOwnerType, DocumentType},
    },
    service::storage::UploadedFile,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdateRequest {
    pub document_type: DocumentType,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

impl From<DocumentUpdateRequest> for DocumentUpdateInputType {
    fn from(request: DocumentUpdateRequest) -> Self {
        DocumentUpdateInputType { document_type: request.document_type, issue_date: request.issue_date, expiry_date: request.expiry_date }
    }
}

/**
 * Fields of a multipart document upload, collected as they arrive.
 */
#[derive(Debug, Default)]
pub struct DocumentUploadForm {
    pub document_type: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub file: Option<UploadedFile>,
}

impl DocumentUploadForm {
    /**
     * Stores a text field of the form. Unknown fields are ignored.
     */
    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "documentType" => self.document_type = Some(value),
            "issueDate" => self.issue_date = Some(value),
            "expiryDate" => self.expiry_date = Some(value),
            _ => {}
        }
    }

    /**
     * Converts the form into the upload input for an owner.
     *
     * # Arguments
     * `owner_type`: Type of the owning entity.
     * `owner_id`: Id of the owning entity.
     *
     * # Returns
     * The upload input with the file, or a validation error naming every unreadable field.
     */
    pub fn into_upload(self, owner_type: DocumentOwnerType, owner_id: i64) -> Result<(DocumentUploadInputType, UploadedFile), ApplicationError> {
        let mut errors = Vec::new();
        let document_type = match self.document_type.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push("documentType: required".to_string());
                None
            }
            Some(value) => {
                let parsed = parse_document_type(value);
                if parsed.is_none() {
                    errors.push(format!("documentType: unknown type {value}"));
                }
                parsed
            }
        };
        let issue_date = parse_form_date("issueDate", self.issue_date, &mut errors);
        let expiry_date = parse_form_date("expiryDate", self.expiry_date, &mut errors);
        let file = self.file.filter(|file| !file.data.is_empty());
        if file.is_none() {
            errors.push("file: required".to_string());
        }
        match (document_type, file) {
            (Some(document_type), Some(file)) if errors.is_empty() => Ok((DocumentUploadInputType { owner_type, owner_id, document_type, issue_date, expiry_date }, file)),
            _ => Err(ApplicationError::with_errors(ErrorType::Validation, "Invalid document upload".to_string(), errors)),
        }
    }
}

/**
 * Parses a document type from its wire name, e.g. `IDENTITY_DOCUMENT`.
 */
pub fn parse_document_type(value: &str) -> Option<DocumentType> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).ok()
}

fn parse_form_date(field: &str, value: Option<String>, errors: &mut Vec<String>) -> Option<NaiveDate> {
    let value = value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())?;
    match NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(format!("{field}: invalid date {value}"));
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn file() -> UploadedFile {
        UploadedFile { file_name: "patente.pdf".to_string(), content_type: Some("application/pdf".to_string()), data: vec![1, 2, 3] }
    }

    #[test]
    fn test_parse_document_type() {
        assert_eq!(parse_document_type("IDENTITY_DOCUMENT"), Some(DocumentType::IdentityDocument));
        assert_eq!(parse_document_type("identity"), None);
    }

    #[test]
    fn test_form_into_upload() {
        let mut form = DocumentUploadForm { file: Some(file()), ..DocumentUploadForm::default() };
        form.set_field("documentType", "MEDICAL".to_string());
        form.set_field("issueDate", "2024-01-10".to_string());
        form.set_field("expiryDate", "".to_string());
        form.set_field("ignored", "x".to_string());
        let (input, uploaded) = form.into_upload(DocumentOwnerType::Employee, 7).unwrap();
        assert_eq!(input.document_type, DocumentType::Medical);
        assert_eq!(input.owner_id, 7);
        assert_eq!(input.issue_date, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(input.expiry_date, None);
        assert_eq!(uploaded.file_name, "patente.pdf");
    }

    #[test]
    fn test_form_missing_fields() {
        let mut form = DocumentUploadForm::default();
        form.set_field("issueDate", "10/01/2024".to_string());
        let error = form.into_upload(DocumentOwnerType::Vehicle, 1).unwrap_err();
        assert_eq!(error.error_type, ErrorType::Validation);
        assert_eq!(error.errors.len(), 3);
    }
}
