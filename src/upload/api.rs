use crate::config::{ApiConfig, Limits};
use crate::error::{ConfigError, JobError, JobStep, ValidationError};
use crate::upload::types::{id_from_value, JobHandle, JobRecord, Multiplier, UploadCandidate};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Receives progress for one submission.
pub trait ProgressSink: Send + Sync {
    /// Percentage of the archive handed to the transport, 0..=100.
    fn on_upload_progress(&self, percent: u8);

    fn on_job_created(&self, _job: &JobHandle) {}
}

/// The three remote calls the workflow depends on.
#[async_trait]
pub trait ProcessApi: Send + Sync {
    async fn create_job(
        &self,
        candidate: &UploadCandidate,
        multiplier: Multiplier,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobHandle, JobError>;

    async fn start_processing(&self, job: &JobHandle) -> Result<(), JobError>;

    async fn fetch_job(&self, job: &JobHandle) -> Result<JobRecord, JobError>;
}

/// `ProcessApi` over HTTP against the `/processes/` endpoints.
#[derive(Clone)]
pub struct HttpProcessApi {
    client: reqwest::Client,
    base_url: Url,
    max_upload_bytes: u64,
}

impl HttpProcessApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url()?,
            max_upload_bytes: Limits::default().max_upload_bytes,
        })
    }

    /// Refuse archives larger than `max` bytes as read at submit time.
    pub fn with_upload_limit(mut self, max: u64) -> Self {
        self.max_upload_bytes = max;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    fn endpoint(&self, step: JobStep, path: &str) -> Result<Url, JobError> {
        self.base_url.join(path).map_err(|e| JobError::Decode {
            step,
            detail: format!("bad endpoint '{path}': {e}"),
        })
    }
}

#[async_trait]
impl ProcessApi for HttpProcessApi {
    async fn create_job(
        &self,
        candidate: &UploadCandidate,
        multiplier: Multiplier,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobHandle, JobError> {
        let step = JobStep::Create;
        let url = self.endpoint(step, "processes/")?;
        let bytes = candidate.source.read().await?;
        let length = bytes.len() as u64;
        if length > self.max_upload_bytes {
            warn!(
                "'{}' is {length} bytes at submit time, limit is {}",
                candidate.name, self.max_upload_bytes
            );
            return Err(ValidationError::TooLarge {
                size: length,
                max: self.max_upload_bytes,
            }
            .into());
        }

        let part = Part::stream_with_length(progress_body(bytes, sink), length)
            .file_name(candidate.name.clone())
            .mime_str("application/zip")
            .map_err(|source| JobError::Transport { step, source })?;
        let form = Form::new()
            .part("original_file", part)
            .text("multiplier", multiplier.to_string());

        debug!("POST {url} ({length} bytes, multiplier {multiplier})");
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| JobError::Transport { step, source })?;
        let response = ensure_success(step, response).await?;

        let body: Value = response.json().await.map_err(|e| JobError::Decode {
            step,
            detail: e.to_string(),
        })?;
        body.get("id")
            .and_then(id_from_value)
            .ok_or_else(|| JobError::Decode {
                step,
                detail: format!("no job id in {body}"),
            })
    }

    async fn start_processing(&self, job: &JobHandle) -> Result<(), JobError> {
        let step = JobStep::Trigger;
        let url = self.endpoint(step, &format!("processes/{}/process_data/", job.id))?;
        debug!("POST {url}");
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|source| JobError::Transport { step, source })?;
        ensure_success(step, response).await?;
        Ok(())
    }

    async fn fetch_job(&self, job: &JobHandle) -> Result<JobRecord, JobError> {
        let step = JobStep::Fetch;
        let url = self.endpoint(step, &format!("processes/{}/", job.id))?;
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| JobError::Transport { step, source })?;
        let response = ensure_success(step, response).await?;
        response
            .json::<JobRecord>()
            .await
            .map_err(|e| JobError::Decode {
                step,
                detail: e.to_string(),
            })
    }
}

/// Streams the archive in chunks, reporting how much has been handed off.
fn progress_body(bytes: Vec<u8>, sink: Arc<dyn ProgressSink>) -> reqwest::Body {
    let total = bytes.len();
    let bytes = Arc::new(bytes);
    let chunks = futures::stream::iter((0..total).step_by(UPLOAD_CHUNK_BYTES)).map(move |start| {
        let end = (start + UPLOAD_CHUNK_BYTES).min(total);
        sink.on_upload_progress(percent_of(end as u64, total as u64));
        Ok::<Vec<u8>, std::io::Error>(bytes[start..end].to_vec())
    });
    reqwest::Body::wrap_stream(chunks)
}

pub(crate) fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as f64 * 100.0 / total as f64).round()) as u8
}

/// Turns a non-2xx response into `JobError::Server`, keeping the backend's
/// `error` (or DRF `detail`) text when the body carries one.
pub(crate) async fn ensure_success(step: JobStep, response: Response) -> Result<Response, JobError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| {
            body.get("error")
                .or_else(|| body.get("detail"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
    Err(JobError::Server {
        step,
        status: status.as_u16(),
        message,
    })
}
