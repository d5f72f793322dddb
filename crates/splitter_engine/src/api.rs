use std::path::Path;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use splitter_logging::{splitter_debug, splitter_warn};
use url::Url;

use crate::types::{ErrorBody, JobsResponse};
use crate::{ApiError, FailureKind, HealthResponse, JobRecord, StatusResponse, UploadReceipt};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    /// `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
    /// `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout: None,
            request_timeout: None,
        }
    }
}

/// The remote separation service.
#[async_trait::async_trait]
pub trait SeparationApi: Send + Sync {
    async fn upload(&self, path: &Path, file_name: &str) -> Result<UploadReceipt, ApiError>;

    async fn start_separation(&self, job_id: &str) -> Result<(), ApiError>;

    async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError>;

    async fn jobs(&self) -> Result<Vec<JobRecord>, ApiError>;

    async fn health(&self) -> Result<HealthResponse, ApiError>;

    async fn download(&self, job_id: &str, stem: &str) -> Result<Bytes, ApiError>;

    /// Location serving a stem, used for both playback and download.
    fn stem_url(&self, job_id: &str, stem: &str) -> Result<Url, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    base: Url,
    client: reqwest::Client,
}

impl ReqwestApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{base} cannot be used as an API base"),
            ));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { base, client })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ApiError::new(
                    FailureKind::InvalidUrl,
                    format!("{} cannot be used as an API base", self.base),
                )
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl SeparationApi for ReqwestApi {
    async fn upload(&self, path: &Path, file_name: &str) -> Result<UploadReceipt, ApiError> {
        let url = self.endpoint(&["upload"])?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| ApiError::new(FailureKind::Io, format!("{}: {err}", path.display())))?;
        splitter_debug!("POST {} file={} bytes={}", url, file_name, bytes.len());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn start_separation(&self, job_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["separate", job_id])?;
        splitter_debug!("POST {}", url);
        let response = self.client.post(url).send().await.map_err(map_reqwest_error)?;
        // Only the status matters; the acknowledgement body is free-form JSON.
        read_json::<serde_json::Value>(response).await.map(|_| ())
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError> {
        let url = self.endpoint(&["status", job_id])?;
        splitter_debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn jobs(&self) -> Result<Vec<JobRecord>, ApiError> {
        let url = self.endpoint(&["jobs"])?;
        splitter_debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        read_json::<JobsResponse>(response).await.map(|body| body.jobs)
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let url = self.endpoint(&["health"])?;
        splitter_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn download(&self, job_id: &str, stem: &str) -> Result<Bytes, ApiError> {
        let url = self.stem_url(job_id, stem)?;
        splitter_debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.map_err(map_reqwest_error)?;
            return Err(error_from_body(status, &body));
        }

        let mut buf = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            buf.extend_from_slice(&chunk);
        }
        splitter_debug!("downloaded {} bytes for {}/{}", buf.len(), job_id, stem);
        Ok(buf.freeze())
    }

    fn stem_url(&self, job_id: &str, stem: &str) -> Result<Url, ApiError> {
        self.endpoint(&["download", job_id, stem])
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    if !status.is_success() {
        let err = error_from_body(status, &body);
        splitter_warn!("API replied {}: {}", status, err.message);
        return Err(err);
    }
    serde_json::from_slice(&body).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

/// Uses the body's `error` field verbatim, falling back to the HTTP reason.
fn error_from_body(status: StatusCode, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .map(|body| body.error)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| status.to_string())
        });
    ApiError::new(FailureKind::HttpStatus(status.as_u16()), message)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
