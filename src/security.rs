use regex::Regex;
use std::path::Path;

use crate::errors::{AppError, AppResult};

pub struct InputValidator;

impl InputValidator {
    pub fn validate_base_url(url: &str) -> AppResult<()> {
        let trimmed = url.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("base_url", "Base URL cannot be empty"));
        }

        let parsed = reqwest::Url::parse(trimmed).map_err(|_| AppError::invalid_url(trimmed))?;

        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(AppError::invalid_url(trimmed));
        }

        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(AppError::validation(
                "base_url",
                "Base URL must not carry a query or fragment",
            ));
        }

        Ok(())
    }

    pub fn validate_image_path(path: &Path) -> AppResult<()> {
        let display = path.to_string_lossy();

        if display.trim().is_empty() {
            return Err(AppError::validation("file_path", "File path cannot be empty"));
        }

        // Only the formats the decoder is built with
        if let Some(extension) = path.extension() {
            let ext = extension.to_string_lossy().to_lowercase();
            if !matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp") {
                return Err(AppError::invalid_file_type(&display));
            }
        } else {
            return Err(AppError::validation("file_path", "File must have an extension"));
        }

        if !path.exists() {
            return Err(AppError::file_not_found(&display));
        }

        if !path.is_file() {
            return Err(AppError::validation("file_path", "Path is not a file"));
        }

        Ok(())
    }

    /// Album names produced by this app are `YYYYMMDD_HHMMSS`.
    pub fn validate_album_name(name: &str) -> AppResult<()> {
        let pattern = Regex::new(r"^\d{8}_\d{6}$")
            .map_err(|e| AppError::Internal(format!("Regex error: {}", e)))?;

        if !pattern.is_match(name) {
            return Err(AppError::validation(
                "album_name",
                "Album name must look like YYYYMMDD_HHMMSS",
            ));
        }

        Ok(())
    }

    pub fn validate_hex_color(field: &str, color: &str) -> AppResult<()> {
        let pattern = Regex::new(r"^#[0-9a-fA-F]{6}$")
            .map_err(|e| AppError::Internal(format!("Regex error: {}", e)))?;

        if !pattern.is_match(color) {
            return Err(AppError::validation(field, "Color must be in #RRGGBB form"));
        }

        Ok(())
    }

    pub fn sanitize_filename(filename: &str) -> String {
        let sanitized: String = filename
            .trim()
            .chars()
            .map(|c| match c {
                '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();

        // Never let a collection name walk out of the library root
        let sanitized = if sanitized == "." || sanitized == ".." || sanitized.is_empty() {
            "_".to_string()
        } else {
            sanitized
        };

        if sanitized.len() > 255 {
            let mut end = 252;
            while !sanitized.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &sanitized[..end])
        } else {
            sanitized
        }
    }
}
