use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::errors::{log_outcome, AppError, AppResult};
use crate::image_processor::{to_base64_text, Encoder};
use crate::media_source::PickedImage;

use super::{BatchFile, UploadOutcome, Uploader};

/// Name of the single report produced by a multipart batch.
pub const BATCH_REPORT_NAME: &str = "batch";

/// One image headed for the endpoint, named by its position in the selection.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub index: usize,
    pub filename: String,
    pub image: PickedImage,
}

impl UploadJob {
    pub fn new(index: usize, image: PickedImage) -> Self {
        Self {
            index,
            filename: format!("image{}.jpg", index),
            image,
        }
    }
}

/// What became of a job. Nothing reads this except logs and tests.
#[derive(Debug)]
pub struct UploadReport {
    pub filename: String,
    pub result: AppResult<UploadOutcome>,
}

impl UploadReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub fn plan_jobs(selection: &[PickedImage]) -> Vec<UploadJob> {
    selection
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, image)| UploadJob::new(index, image))
        .collect()
}

/// Spawn one independent encode-and-POST task per job.
///
/// There is no ordering between jobs and no aggregate completion; callers may
/// drop the handles.
pub fn dispatch_form_uploads(
    jobs: Vec<UploadJob>,
    encoder: Arc<dyn Encoder>,
    uploader: Arc<dyn Uploader>,
) -> Vec<JoinHandle<UploadReport>> {
    log::info!("Dispatching {} upload(s)", jobs.len());

    jobs.into_iter()
        .map(|job| {
            let encoder = Arc::clone(&encoder);
            let uploader = Arc::clone(&uploader);
            tokio::spawn(run_form_job(job, encoder, uploader))
        })
        .collect()
}

async fn run_form_job(
    job: UploadJob,
    encoder: Arc<dyn Encoder>,
    uploader: Arc<dyn Uploader>,
) -> UploadReport {
    let result = async {
        let bytes = encode_off_thread(encoder, job.image.clone()).await?;
        let encoded_text = to_base64_text(&bytes);
        uploader.upload(&job.filename, &encoded_text).await
    }
    .await;

    let subject = format!("{} ({})", job.filename, job.image.source());
    UploadReport {
        filename: job.filename,
        result: log_outcome(result, "Upload", &subject),
    }
}

/// Encode every job and send them together as one multipart request.
///
/// Images that fail to encode are left out of the request; the others keep
/// their selection index in both part name and filename.
pub fn dispatch_batch_upload(
    jobs: Vec<UploadJob>,
    encoder: Arc<dyn Encoder>,
    uploader: Arc<dyn Uploader>,
) -> JoinHandle<UploadReport> {
    log::info!("Dispatching batch upload of {} image(s)", jobs.len());

    tokio::spawn(async move {
        let mut files: Vec<BatchFile> = Vec::with_capacity(jobs.len());

        for job in jobs {
            let subject = format!("{} ({})", job.filename, job.image.source());
            let encoded = encode_off_thread(Arc::clone(&encoder), job.image).await;
            if let Ok(bytes) = log_outcome(encoded, "Encode", &subject) {
                files.push((job.index, job.filename, bytes));
            }
        }

        let result = if files.is_empty() {
            Err(AppError::validation(
                "selection",
                "No image in the batch could be encoded",
            ))
        } else {
            uploader.upload_batch(files).await
        };

        UploadReport {
            filename: BATCH_REPORT_NAME.to_string(),
            result: log_outcome(result, "Batch upload", BATCH_REPORT_NAME),
        }
    })
}

async fn encode_off_thread(encoder: Arc<dyn Encoder>, image: PickedImage) -> AppResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || encoder.encode(&image))
        .await
        .map_err(|e| AppError::Internal(format!("Encode task failed: {}", e)))?
}
