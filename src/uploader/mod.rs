// Uploader module - sends encoded selections to the remote endpoint
//
// Every request is fire-and-forget from the user's side; outcomes come back
// as typed reports for logging and tests only.

pub mod http_client;
pub mod upload_queue;

use async_trait::async_trait;

use crate::errors::AppResult;

pub use http_client::{HttpUploader, UploadOutcome};
pub use upload_queue::{dispatch_batch_upload, dispatch_form_uploads, plan_jobs, UploadJob, UploadReport};

/// A file in a multipart batch: `(selection index, filename, jpeg bytes)`.
pub type BatchFile = (usize, String, Vec<u8>);

#[async_trait]
pub trait Uploader: Send + Sync {
    /// POST one base64 image as `image_data=<text>` to `/upload/<filename>`.
    async fn upload(&self, filename: &str, encoded_text: &str) -> AppResult<UploadOutcome>;

    /// POST every image in one multipart/form-data request.
    async fn upload_batch(&self, files: Vec<BatchFile>) -> AppResult<UploadOutcome>;
}
