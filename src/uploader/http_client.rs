use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{multipart, Client, Request, Url};
use tokio::time::Duration;

use super::{BatchFile, Uploader};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const FORM_FIELD: &str = "image_data";

/// Status and raw text of a finished request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub status: u16,
    pub body: String,
}

/// Uploads over HTTP with one shared connection pool
pub struct HttpUploader {
    client: Client,
    base_url: String,
}

impl HttpUploader {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> AppResult<Self> {
        InputValidator::validate_base_url(base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            &config.base_url,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn upload_url(&self, filename: &str) -> AppResult<Url> {
        let url_string = format!("{}/upload/{}", self.base_url, filename);
        Url::parse(&url_string).map_err(|_| AppError::invalid_url(&url_string))
    }

    pub fn batch_url(&self) -> AppResult<Url> {
        let url_string = format!("{}/upload", self.base_url);
        Url::parse(&url_string).map_err(|_| AppError::invalid_url(&url_string))
    }

    pub fn build_form_request(&self, filename: &str, encoded_text: &str) -> AppResult<Request> {
        let url = self.upload_url(filename)?;
        let body = format!("{}={}", FORM_FIELD, encoded_text);

        Ok(self
            .client
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .build()?)
    }

    pub fn build_batch_request(&self, files: Vec<BatchFile>) -> AppResult<Request> {
        let url = self.batch_url()?;
        let mut form = multipart::Form::new();

        for (index, filename, data) in files {
            let part = multipart::Part::bytes(data)
                .file_name(filename)
                .mime_str("image/jpeg")?;

            form = form.part(format!("file{}", index), part);
        }

        Ok(self.client.post(url).multipart(form).build()?)
    }

    async fn send(&self, request: Request) -> AppResult<UploadOutcome> {
        let url = request.url().clone();
        log::debug!("POST {}", url);

        let response = self.client.execute(request).await?;
        let status = response.status();
        log::info!("Response status code: {} for {}", status.as_u16(), url);

        let body = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Failed to read response body from {}: {}", url, e);
                String::new()
            }
        };
        log::debug!(
            "Response data (first 300 chars): {}",
            body.chars().take(300).collect::<String>()
        );

        if status.is_success() {
            Ok(UploadOutcome {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(AppError::UploadFailed {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, filename: &str, encoded_text: &str) -> AppResult<UploadOutcome> {
        let request = self.build_form_request(filename, encoded_text)?;
        self.send(request).await
    }

    async fn upload_batch(&self, files: Vec<BatchFile>) -> AppResult<UploadOutcome> {
        let count = files.len();
        let request = self.build_batch_request(files)?;
        log::info!("Sending {} image(s) in one multipart request", count);
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploader() -> HttpUploader {
        HttpUploader::new("https://xxx.xxx.com/", None).unwrap()
    }

    #[test]
    fn test_upload_url_joins_filename() {
        let url = uploader().upload_url("image0.jpg").unwrap();
        assert_eq!(url.as_str(), "https://xxx.xxx.com/upload/image0.jpg");
        assert_eq!(uploader().base_url(), "https://xxx.xxx.com");
    }

    #[test]
    fn test_form_request_shape() {
        let request = uploader()
            .build_form_request("image3.jpg", "/9j/4AAQ+abc=")
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://xxx.xxx.com/upload/image3.jpg"
        );
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );

        // Base64 goes in verbatim, no percent-encoding
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, b"image_data=/9j/4AAQ+abc=");
    }

    #[test]
    fn test_batch_request_is_multipart() {
        let request = uploader()
            .build_batch_request(vec![
                (0, "image0.jpg".to_string(), vec![0xFF, 0xD8]),
                (2, "image2.jpg".to_string(), vec![0xFF, 0xD8]),
            ])
            .unwrap();

        assert_eq!(request.url().as_str(), "https://xxx.xxx.com/upload");
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            HttpUploader::new("xxx.xxx.com", None),
            Err(AppError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_from_config_applies_base_url() {
        let mut config = Config::default();
        config.base_url = "http://localhost:9000".to_string();
        config.request_timeout_secs = Some(30);

        let uploader = HttpUploader::from_config(&config).unwrap();
        assert_eq!(
            uploader.upload_url("image1.jpg").unwrap().as_str(),
            "http://localhost:9000/upload/image1.jpg"
        );
    }
}
