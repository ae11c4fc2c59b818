use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::Regex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    config::StorageConfig,
};

/**
 * Extensions accepted for documents.
 */
const ALLOWED_EXTENSIONS: [&str; 8] = ["pdf", "jpg", "jpeg", "png", "webp", "doc", "docx", "msg"];

/**
 * Extensions accepted for images.
 */
const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

const ALLOWED_CONTENT_TYPES: [&str; 8] = [
    "application/pdf",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-outlook",
];

const ALLOWED_IMAGE_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

fn file_name_regex() -> Option<&'static Regex> {
    static FILE_NAME: OnceLock<Option<Regex>> = OnceLock::new();
    FILE_NAME.get_or_init(|| Regex::new(r"^[a-zA-Z0-9\s\-_.]+$").ok()).as_ref()
}

/**
 * A file written to storage.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /**
     * Path relative to the storage root, always with `/` separators.
     */
    pub storage_path: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
}

/**
 * A file received in a multipart request.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/**
 * Files and directories to remove once a delete has been committed.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedFiles {
    pub storage_paths: Vec<String>,
    pub directories: Vec<PathBuf>,
}

impl RemovedFiles {
    pub fn add(&mut self, other: RemovedFiles) {
        self.storage_paths.extend(other.storage_paths);
        self.directories.extend(other.directories);
    }
}

/**
 * Stores uploaded files below a root directory.
 */
pub struct FileStorage {
    root_directory: PathBuf,
    max_document_size: u64,
    max_image_size: u64,
}

impl FileStorage {
    pub fn new(config: &StorageConfig) -> Self {
        FileStorage { root_directory: PathBuf::from(&config.root_directory), max_document_size: config.max_document_size, max_image_size: config.max_image_size }
    }

    /**
     * Largest upload accepted for any file kind.
     */
    pub fn max_upload_size(&self) -> u64 {
        self.max_document_size.max(self.max_image_size)
    }

    /**
     * Validates an upload before it is written.
     *
     * # Arguments
     * `original_filename`: File name sent by the client.
     * `content_type`: Content type sent by the client, guessed from the name when missing.
     * `size`: Size in bytes.
     * `image_only`: Whether only images are accepted.
     *
     * # Returns
     * The effective content type.
     */
    pub fn validate_upload(&self, original_filename: &str, content_type: Option<&str>, size: u64, image_only: bool) -> Result<String, ApplicationError> {
        if size == 0 {
            return Err(ApplicationError::new(ErrorType::FileValidation, "The file is empty".to_string()));
        }
        let max_size = if image_only { self.max_image_size } else { self.max_document_size };
        if size > max_size {
            return Err(ApplicationError::new(ErrorType::PayloadTooLarge, format!("The file exceeds the maximum size of {} MB", max_size / (1024 * 1024))));
        }
        if !file_name_regex().is_some_and(|regex| regex.is_match(original_filename)) {
            return Err(ApplicationError::new(ErrorType::FileValidation, "The file name contains invalid characters".to_string()));
        }
        let extension = file_extension(original_filename).unwrap_or_default();
        let allowed_extensions: &[&str] = if image_only { &ALLOWED_IMAGE_EXTENSIONS } else { &ALLOWED_EXTENSIONS };
        if !allowed_extensions.contains(&extension.as_str()) {
            return Err(ApplicationError::new(ErrorType::FileValidation, format!("File extension not allowed: .{extension}")));
        }
        let content_type = match content_type {
            Some(content_type) if !content_type.is_empty() && content_type != "application/octet-stream" => content_type.to_lowercase(),
            _ => mime_guess::from_path(original_filename).first_or_octet_stream().essence_str().to_string(),
        };
        let allowed_content_types: &[&str] = if image_only { &ALLOWED_IMAGE_CONTENT_TYPES } else { &ALLOWED_CONTENT_TYPES };
        if !allowed_content_types.contains(&content_type.as_str()) {
            return Err(ApplicationError::new(ErrorType::FileValidation, format!("File type not allowed: {content_type}")));
        }
        Ok(content_type)
    }

    /**
     * Validates and writes a file into a directory below the root under a generated name.
     *
     * # Arguments
     * `directory`: Directory relative to the storage root.
     * `original_filename`: File name sent by the client.
     * `content_type`: Content type sent by the client.
     * `data`: File contents.
     * `image_only`: Whether only images are accepted.
     */
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn store(&self, directory: &Path, original_filename: &str, content_type: Option<&str>, data: &[u8], image_only: bool) -> Result<StoredFile, ApplicationError> {
        let size = u64::try_from(data.len()).unwrap_or(u64::MAX);
        let content_type = self.validate_upload(original_filename, content_type, size, image_only)?;
        let file_name = safe_file_name(Local::now(), original_filename);
        let relative_path = directory.join(&file_name);
        let storage_path = to_storage_path(&relative_path)?;
        let target = self.resolve(&storage_path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| ApplicationError::new(ErrorType::Storage, format!("Failed to create directory: {err}")))?;
        }
        tokio::fs::write(&target, data).await.map_err(|err| ApplicationError::new(ErrorType::Storage, format!("Failed to write file: {err}")))?;
        debug!("Stored {original_filename} as {storage_path}");
        Ok(StoredFile { storage_path, file_name, content_type, file_size: i64::try_from(size).unwrap_or(i64::MAX) })
    }

    /**
     * Resolves a stored path against the root, rejecting paths that leave it.
     */
    pub fn resolve(&self, storage_path: &str) -> Result<PathBuf, ApplicationError> {
        let relative = Path::new(storage_path);
        if storage_path.is_empty() || !relative.components().all(|component| matches!(component, Component::Normal(_))) {
            warn!("Rejected storage path {storage_path}");
            return Err(ApplicationError::new(ErrorType::Security, "Invalid file path".to_string()));
        }
        let resolved = self.root_directory.join(relative);
        if let (Ok(root), Ok(canonical)) = (self.root_directory.canonicalize(), resolved.canonicalize()) {
            if !canonical.starts_with(&root) {
                warn!("Rejected storage path {storage_path} outside of the storage root");
                return Err(ApplicationError::new(ErrorType::Security, "Invalid file path".to_string()));
            }
        }
        Ok(resolved)
    }

    /**
     * Reads a stored file.
     */
    #[instrument(skip(self))]
    pub async fn read(&self, storage_path: &str) -> Result<Vec<u8>, ApplicationError> {
        let path = self.resolve(storage_path)?;
        tokio::fs::read(&path).await.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ApplicationError::new(ErrorType::NotFound, format!("File not found: {storage_path}")),
            _ => ApplicationError::new(ErrorType::Storage, format!("Failed to read file: {err}")),
        })
    }

    /**
     * Deletes a stored file. Failures are logged only.
     */
    #[instrument(skip(self))]
    pub async fn delete_file(&self, storage_path: &str) {
        let path = match self.resolve(storage_path) {
            Ok(path) => path,
            Err(err) => {
                warn!("Not deleting {storage_path}: {}", err.message);
                return;
            }
        };
        if let Err(err) = tokio::fs::remove_file(&path).await {
            warn!("Failed to delete file {storage_path}: {err}");
        }
    }

    /**
     * Deletes several stored files. Failures are logged only.
     */
    pub async fn delete_files(&self, storage_paths: &[String]) {
        for storage_path in storage_paths {
            self.delete_file(storage_path).await;
        }
    }

    /**
     * Deletes the files, then the directories, of a committed delete.
     */
    pub async fn delete_removed(&self, removed: &RemovedFiles) {
        self.delete_files(&removed.storage_paths).await;
        for directory in &removed.directories {
            self.delete_directory(directory).await;
        }
    }

    /**
     * Deletes a directory below the root with its contents. Failures are logged only.
     */
    #[instrument(skip(self))]
    pub async fn delete_directory(&self, directory: &Path) {
        let path = match to_storage_path(directory).and_then(|storage_path| self.resolve(&storage_path)) {
            Ok(path) => path,
            Err(err) => {
                warn!("Not deleting directory {}: {}", directory.display(), err.message);
                return;
            }
        };
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => debug!("Deleted directory {}", directory.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!("Failed to delete directory {}: {err}", directory.display()),
        }
    }
}

/**
 * Lowercased extension of a file name restricted to `[a-z0-9]`.
 */
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, extension) = file_name.rsplit_once('.')?;
    let extension: String = extension.to_lowercase().chars().filter(|character| character.is_ascii_lowercase() || character.is_ascii_digit()).collect();
    if extension.is_empty() { None } else { Some(extension) }
}

/**
 * Generates a stored file name `yyyyMMdd_HHmmss_{8 hex}.{ext}`.
 */
pub fn safe_file_name(now: DateTime<Local>, original_filename: &str) -> String {
    let unique = Uuid::new_v4().simple().to_string();
    let prefix = format!("{}_{}", now.format("%Y%m%d_%H%M%S"), &unique[..8]);
    match file_extension(original_filename) {
        Some(extension) => format!("{prefix}.{extension}"),
        None => prefix,
    }
}

/**
 * Converts a relative path to the `/`-separated form stored in the database.
 */
fn to_storage_path(path: &Path) -> Result<String, ApplicationError> {
    let parts: Option<Vec<&str>> = path
        .components()
        .map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    match parts {
        Some(parts) if !parts.is_empty() => Ok(parts.join("/")),
        _ => Err(ApplicationError::new(ErrorType::Security, format!("Invalid storage directory {}", path.display()))),
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    fn storage(root: &Path) -> FileStorage {
        FileStorage::new(&StorageConfig { root_directory: root.to_string_lossy().to_string(), ..StorageConfig::default() })
    }

    #[test]
    fn test_safe_file_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let file_name = safe_file_name(now, "Libretto Auto.PDF");
        assert!(file_name.starts_with("20240305_140709_"));
        assert!(file_name.ends_with(".pdf"));
        assert_eq!(file_name.len(), "20240305_140709_".len() + 8 + ".pdf".len());
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a.Do-cx"), Some("docx".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("noextension"), None);
        assert_eq!(file_extension("dot."), None);
    }

    #[test]
    fn test_validate_upload() {
        let directory = tempfile::tempdir().unwrap();
        let storage = storage(directory.path());
        assert_eq!(storage.validate_upload("polizza.pdf", Some("application/pdf"), 100, false).unwrap(), "application/pdf");
        assert_eq!(storage.validate_upload("foto.JPG", None, 100, true).unwrap(), "image/jpeg");
        assert_eq!(storage.validate_upload("empty.pdf", None, 0, false).unwrap_err().error_type, ErrorType::FileValidation);
        assert_eq!(storage.validate_upload("big.pdf", None, 10 * 1024 * 1024 + 1, false).unwrap_err().error_type, ErrorType::PayloadTooLarge);
        assert_eq!(storage.validate_upload("big.png", None, 5 * 1024 * 1024 + 1, true).unwrap_err().error_type, ErrorType::PayloadTooLarge);
        assert_eq!(storage.validate_upload("script.exe", None, 100, false).unwrap_err().error_type, ErrorType::FileValidation);
        assert_eq!(storage.validate_upload("bad;name.pdf", None, 100, false).unwrap_err().error_type, ErrorType::FileValidation);
        assert_eq!(storage.validate_upload("doc.pdf", None, 100, true).unwrap_err().error_type, ErrorType::FileValidation);
        assert_eq!(storage.validate_upload("doc.pdf", Some("text/html"), 100, false).unwrap_err().error_type, ErrorType::FileValidation);
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let directory = tempfile::tempdir().unwrap();
        let storage = storage(directory.path());
        assert!(storage.resolve("vehicles/1/docs/a.pdf").is_ok());
        assert_eq!(storage.resolve("../secret").unwrap_err().error_type, ErrorType::Security);
        assert_eq!(storage.resolve("vehicles/../../secret").unwrap_err().error_type, ErrorType::Security);
        assert_eq!(storage.resolve("/etc/passwd").unwrap_err().error_type, ErrorType::Security);
        assert_eq!(storage.resolve("").unwrap_err().error_type, ErrorType::Security);
    }

    #[actix_web::test]
    async fn test_store_read_and_delete() {
        let directory = tempfile::tempdir().unwrap();
        let storage = storage(directory.path());
        let stored = storage.store(Path::new("vehicles/7/docs"), "libretto.pdf", Some("application/pdf"), b"%PDF-1.4", false).await.unwrap();
        assert!(stored.storage_path.starts_with("vehicles/7/docs/"));
        assert_eq!(stored.file_size, 8);
        assert_eq!(storage.read(&stored.storage_path).await.unwrap(), b"%PDF-1.4".to_vec());
        storage.delete_file(&stored.storage_path).await;
        assert_eq!(storage.read(&stored.storage_path).await.unwrap_err().error_type, ErrorType::NotFound);
        storage.delete_directory(Path::new("vehicles/7/docs")).await;
        assert!(!directory.path().join("vehicles/7/docs").exists());
    }

    #[actix_web::test]
    async fn test_delete_removed() {
        let directory = tempfile::tempdir().unwrap();
        let storage = storage(directory.path());
        let first = storage.store(Path::new("employees/3/docs"), "ci.pdf", None, b"data", false).await.unwrap();
        let second = storage.store(Path::new("assignments/4/docs"), "verbale.pdf", None, b"data", false).await.unwrap();
        let mut removed = RemovedFiles { storage_paths: vec![first.storage_path], directories: vec![PathBuf::from("employees/3/docs")] };
        removed.add(RemovedFiles { storage_paths: vec![second.storage_path.clone()], directories: Vec::new() });
        storage.delete_removed(&removed).await;
        assert!(!directory.path().join("employees/3/docs").exists());
        assert_eq!(storage.read(&second.storage_path).await.unwrap_err().error_type, ErrorType::NotFound);
        assert!(directory.path().join("assignments/4/docs").exists());
    }
}
