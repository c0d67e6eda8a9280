//! Batch avatar synthesis: text in, narrated video (and subtitles) out.
//!
//! The service is asynchronous. A job is created with a client-chosen UUID,
//! then polled until it reports `Succeeded` or `Failed`; on success the
//! status response carries pre-signed URLs for the video and subtitle file.
//!
//! ```text
//! submit ──▶ poll (every poll_interval, at most max_poll_wait) ──▶ download
//!   PUT          GET …/batchsyntheses/{id}                           GET result, subtitle
//! ```
//!
//! [`AvatarApi`] is the seam between the orchestration in [`runner`] and the
//! HTTP client in [`client`]; tests drive the runner with a stub service.

pub mod client;
pub mod job;
pub mod runner;

pub use client::AzureAvatarClient;
pub use job::{BatchSynthesisRequest, JobHandle, JobStatus, SynthesisArtifacts, SynthesisJob};
pub use runner::{await_completion, save_artifacts, submit, PollPolicy, SubmissionPacer};

use crate::error::AvatarDeckError;
use async_trait::async_trait;

/// The three calls the synthesis flow needs from the remote service.
#[async_trait]
pub trait AvatarApi: Send + Sync {
    /// Create job `job_id` for `request`.
    async fn create_job(
        &self,
        job_id: &str,
        request: &BatchSynthesisRequest,
    ) -> Result<SynthesisJob, AvatarDeckError>;

    /// Read the current state of job `job_id`.
    async fn get_job(&self, job_id: &str) -> Result<SynthesisJob, AvatarDeckError>;

    /// Fetch a result file by its pre-signed URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>, AvatarDeckError>;
}
