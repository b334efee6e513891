use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file type: {path}. Only image files are supported.")]
    InvalidFileType { path: String },

    #[error("No album named '{name}' exists in the library")]
    AlbumNotFound { name: String },

    #[error("Upload failed with status {status}: {body}")]
    UploadFailed { status: u16, body: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Navigation appearance has already been installed")]
    AppearanceAlreadyInstalled,
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::FileNotFound {
            path: path.to_string(),
        }
    }

    pub fn invalid_file_type(path: &str) -> Self {
        Self::InvalidFileType {
            path: path.to_string(),
        }
    }

    pub fn invalid_url(url: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
        }
    }

    pub fn album_not_found(name: &str) -> Self {
        Self::AlbumNotFound {
            name: name.to_string(),
        }
    }

    /// Failures that happened before anything left the process.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            AppError::Image(_)
                | AppError::Io(_)
                | AppError::FileNotFound { .. }
                | AppError::InvalidFileType { .. }
                | AppError::Validation { .. }
                | AppError::InvalidUrl { .. }
        )
    }
}

/// Log a best-effort result and hand it back unchanged.
///
/// Every platform and network call in this crate is fire-and-forget from the
/// user's point of view; this is the single place those outcomes are written
/// to the diagnostic log.
pub fn log_outcome<T>(result: AppResult<T>, operation: &str, subject: &str) -> AppResult<T> {
    match &result {
        Ok(_) => log::debug!("{} succeeded for {}", operation, subject),
        Err(e) if e.is_local() => {
            log::warn!("{} skipped for {} (non-critical): {}", operation, subject, e)
        }
        Err(e) => log::error!("{} failed for {} (non-critical): {}", operation, subject, e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_errors_are_classified() {
        assert!(AppError::validation("image", "empty").is_local());
        assert!(AppError::invalid_file_type("a.txt").is_local());
        assert!(!AppError::album_not_found("20240101_120000").is_local());
        assert!(!AppError::UploadFailed {
            status: 500,
            body: String::new()
        }
        .is_local());
    }

    #[test]
    fn test_log_outcome_passes_result_through() {
        let ok: AppResult<u16> = Ok(200);
        assert_eq!(log_outcome(ok, "upload", "image0.jpg").unwrap(), 200);

        let err: AppResult<u16> = Err(AppError::album_not_found("missing"));
        match log_outcome(err, "add image", "missing") {
            Err(AppError::AlbumNotFound { name }) => assert_eq!(name, "missing"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_error_messages() {
        let error = AppError::UploadFailed {
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(error.to_string(), "Upload failed with status 503: busy");
        assert_eq!(
            AppError::validation("base_url", "Must not be empty").to_string(),
            "Validation error: base_url - Must not be empty"
        );
    }
}
