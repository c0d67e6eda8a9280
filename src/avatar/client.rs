//! HTTP implementation of [`AvatarApi`].

use super::job::{BatchSynthesisRequest, SynthesisJob};
use super::AvatarApi;
use crate::config::SpeechCredentials;
use crate::error::AvatarDeckError;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

/// API version the job paths are pinned to.
pub const API_VERSION: &str = "2024-04-15-preview";

/// Client for the batch avatar endpoint of one speech resource.
pub struct AzureAvatarClient {
    api: reqwest::Client,
    downloads: reqwest::Client,
    base_url: String,
    key: String,
}

impl AzureAvatarClient {
    /// `base_url` defaults to `https://{region}.api.cognitive.microsoft.com`.
    pub fn new(
        credentials: &SpeechCredentials,
        base_url: Option<&str>,
        api_timeout_secs: u64,
        download_timeout_secs: u64,
    ) -> Result<Self, AvatarDeckError> {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| {
                format!("https://{}.api.cognitive.microsoft.com", credentials.region)
            });
        let build = |secs: u64| {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(secs))
                .build()
                .map_err(|e| AvatarDeckError::Internal(format!("HTTP client: {e}")))
        };
        Ok(Self {
            api: build(api_timeout_secs)?,
            downloads: build(download_timeout_secs)?,
            base_url,
            key: credentials.key.clone(),
        })
    }

    /// URL of job `job_id`, used for both create and get.
    pub fn job_url(&self, job_id: &str) -> String {
        format!(
            "{}/avatar/batchsyntheses/{}?api-version={}",
            self.base_url, job_id, API_VERSION
        )
    }
}

#[async_trait]
impl AvatarApi for AzureAvatarClient {
    async fn create_job(
        &self,
        job_id: &str,
        request: &BatchSynthesisRequest,
    ) -> Result<SynthesisJob, AvatarDeckError> {
        let url = self.job_url(job_id);
        let response = self
            .api
            .put(&url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .json(request)
            .send()
            .await
            .map_err(|e| transport(&url, e))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            warn!("Failed to submit batch avatar job: [{}] {}", status, body);
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(rate_limited());
            }
            return Err(AvatarDeckError::JobSubmissionFailed {
                status: status.as_u16(),
                body,
            });
        }

        let job = parse_job(&url, response).await?;
        info!("Job ID: {}", job.id);
        Ok(job)
    }

    async fn get_job(&self, job_id: &str) -> Result<SynthesisJob, AvatarDeckError> {
        let url = self.job_url(job_id);
        let response = self
            .api
            .get(&url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .send()
            .await
            .map_err(|e| transport(&url, e))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(rate_limited());
            }
            return Err(AvatarDeckError::JobStatusFailed {
                job_id: job_id.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        parse_job(&url, response).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AvatarDeckError> {
        debug!("Downloading {}", url);
        let response = self
            .downloads
            .get(url)
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        if !response.status().is_success() {
            return Err(AvatarDeckError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| transport(url, e))?;
        Ok(bytes.to_vec())
    }
}

async fn parse_job(url: &str, response: Response) -> Result<SynthesisJob, AvatarDeckError> {
    let text = response.text().await.map_err(|e| transport(url, e))?;
    serde_json::from_str(&text).map_err(|e| AvatarDeckError::Internal(format!(
        "Unexpected job response from '{url}': {e}"
    )))
}

fn transport(url: &str, e: reqwest::Error) -> AvatarDeckError {
    AvatarDeckError::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

fn rate_limited() -> AvatarDeckError {
    AvatarDeckError::RateLimitExceeded {
        service: "avatar".into(),
        retry_after_secs: None,
    }
}
