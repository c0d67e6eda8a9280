//! Job orchestration: submit, poll to a terminal state, download, save.
//!
//! Polling is bounded by [`PollPolicy::max_wait`]; status and download
//! requests that fail transiently (network errors, 429, 5xx) are retried
//! with exponential backoff before the error is returned.

use super::job::{BatchSynthesisRequest, JobHandle, JobStatus, SynthesisArtifacts};
use super::AvatarApi;
use crate::config::{AvatarSettings, PipelineConfig};
use crate::error::AvatarDeckError;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How a job is watched until it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between two status requests.
    pub interval: Duration,
    /// Give up once this much time has passed since the first status request.
    pub max_wait: Duration,
    /// Retries for one transiently failing request.
    pub max_retries: u32,
    /// First retry delay; doubled per attempt.
    pub retry_backoff: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl PollPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_secs),
            max_wait: Duration::from_secs(config.max_poll_wait_secs),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Create a job rendering `text`. One request; any failure is returned.
pub async fn submit(
    api: &dyn AvatarApi,
    text: &str,
    settings: &AvatarSettings,
) -> Result<JobHandle, AvatarDeckError> {
    let job_id = Uuid::new_v4().to_string();
    let request = BatchSynthesisRequest::plain_text(text, settings);
    debug!("Submitting job {} ({} chars)", job_id, text.len());
    let job = api.create_job(&job_id, &request).await?;
    if job.id != job_id {
        warn!("Service renamed job {} to {}", job_id, job.id);
    }
    Ok(JobHandle { id: job.id })
}

/// Poll `handle` until it is terminal, then fetch its video and subtitles.
///
/// `on_status` sees every observed status with the time spent so far.
pub async fn await_completion(
    api: &dyn AvatarApi,
    handle: &JobHandle,
    policy: &PollPolicy,
    mut on_status: impl FnMut(&JobStatus, Duration),
) -> Result<SynthesisArtifacts, AvatarDeckError> {
    let start = Instant::now();

    loop {
        let job = with_retry(policy, "job status", move || api.get_job(&handle.id)).await?;
        let elapsed = start.elapsed();
        on_status(&job.status, elapsed);

        match job.status {
            JobStatus::Succeeded => {
                info!("- batch avatar job succeeded after {:?}", elapsed);
                let video_url = job.result_url().ok_or_else(|| {
                    AvatarDeckError::MissingJobOutput {
                        job_id: handle.id.clone(),
                        output: "result".into(),
                    }
                })?;
                let video =
                    with_retry(policy, "video download", move || api.download(video_url)).await?;

                let subtitles = match job.subtitle_url() {
                    Some(url) => Some(
                        with_retry(policy, "subtitle download", move || api.download(url)).await?,
                    ),
                    None => {
                        warn!("Job {} has no subtitle output", handle.id);
                        None
                    }
                };
                return Ok(SynthesisArtifacts { video, subtitles });
            }
            JobStatus::Failed => {
                warn!("- batch avatar job failed");
                return Err(AvatarDeckError::JobFailed {
                    job_id: handle.id.clone(),
                    detail: job.failure_reason(),
                });
            }
            status => {
                if elapsed >= policy.max_wait {
                    return Err(AvatarDeckError::JobTimedOut {
                        job_id: handle.id.clone(),
                        waited_secs: elapsed.as_secs(),
                    });
                }
                info!("- batch avatar job is [{}]", status);
                sleep(policy.interval).await;
            }
        }
    }
}

/// Write the video to `video_path` and the subtitles next to it as `.srt`.
///
/// Returns the subtitle path when one was written.
pub async fn save_artifacts(
    artifacts: &SynthesisArtifacts,
    video_path: &Path,
) -> Result<Option<PathBuf>, AvatarDeckError> {
    if let Some(parent) = video_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| write_failed(video_path, e))?;
    }
    info!("Saving video as {}", video_path.display());
    tokio::fs::write(video_path, &artifacts.video)
        .await
        .map_err(|e| write_failed(video_path, e))?;

    match &artifacts.subtitles {
        Some(srt) => {
            let srt_path = video_path.with_extension("srt");
            tokio::fs::write(&srt_path, srt)
                .await
                .map_err(|e| write_failed(&srt_path, e))?;
            Ok(Some(srt_path))
        }
        None => Ok(None),
    }
}

/// Spaces job submissions at least `min_interval` apart.
///
/// The interval is measured from the previous submission; the first
/// submission never waits.
#[derive(Debug)]
pub struct SubmissionPacer {
    min_interval: Duration,
    last: Option<Instant>,
}

impl SubmissionPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// How long [`wait_turn`](Self::wait_turn) would sleep right now.
    pub fn pending_wait(&self) -> Duration {
        match self.last {
            Some(last) => self.min_interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Sleep until a submission is allowed, then record it. Returns the wait.
    pub async fn wait_turn(&mut self) -> Duration {
        let wait = self.pending_wait();
        if !wait.is_zero() {
            info!(
                "- Waiting {:.1} seconds before submitting video batch creation request...",
                wait.as_secs_f64()
            );
            sleep(wait).await;
        }
        self.last = Some(Instant::now());
        wait
    }
}

/// Run `call`, retrying transient errors with exponential backoff.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &PollPolicy,
    what: &str,
    mut call: F,
) -> Result<T, AvatarDeckError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AvatarDeckError>>,
{
    let mut attempt = 0u32;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let backoff = policy
                    .retry_backoff
                    .saturating_mul(2u32.saturating_pow(attempt - 1));
                warn!(
                    "{}: retry {}/{} after {:?} — {}",
                    what, attempt, policy.max_retries, backoff, e
                );
                sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn write_failed(path: &Path, source: std::io::Error) -> AvatarDeckError {
    AvatarDeckError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::job::SynthesisJob;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted status responses and records every call.
    struct ScriptedService {
        statuses: Mutex<VecDeque<Result<JobStatus, AvatarDeckError>>>,
        calls: Mutex<Vec<String>>,
        subtitle: bool,
    }

    impl ScriptedService {
        fn new(statuses: Vec<Result<JobStatus, AvatarDeckError>>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                calls: Mutex::new(Vec::new()),
                subtitle: true,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AvatarApi for ScriptedService {
        async fn create_job(
            &self,
            job_id: &str,
            request: &BatchSynthesisRequest,
        ) -> Result<SynthesisJob, AvatarDeckError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("create:{}", request.inputs[0].content));
            Ok(SynthesisJob::new(job_id, JobStatus::NotStarted))
        }

        async fn get_job(&self, job_id: &str) -> Result<SynthesisJob, AvatarDeckError> {
            let next = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(JobStatus::Running));
            let status = next?;
            self.calls.lock().unwrap().push(format!("get:{status}"));
            let job = SynthesisJob::new(job_id, status.clone());
            Ok(if status == JobStatus::Succeeded {
                let srt = self.subtitle.then(|| "https://blob/sub.srt".to_string());
                job.with_outputs("https://blob/video.mp4", srt)
            } else {
                job
            })
        }

        async fn download(&self, url: &str) -> Result<Vec<u8>, AvatarDeckError> {
            self.calls.lock().unwrap().push(format!("download:{url}"));
            Ok(url.as_bytes().to_vec())
        }
    }

    fn handle() -> JobHandle {
        JobHandle { id: "job-1".into() }
    }

    #[tokio::test(start_paused = true)]
    async fn two_running_polls_then_download() {
        let service = ScriptedService::new(vec![
            Ok(JobStatus::Running),
            Ok(JobStatus::Running),
            Ok(JobStatus::Succeeded),
        ]);
        let mut seen = Vec::new();
        let artifacts = await_completion(&service, &handle(), &PollPolicy::default(), |s, _| {
            seen.push(s.clone())
        })
        .await
        .unwrap();

        assert_eq!(
            service.calls(),
            vec![
                "get:Running",
                "get:Running",
                "get:Succeeded",
                "download:https://blob/video.mp4",
                "download:https://blob/sub.srt",
            ]
        );
        assert_eq!(
            seen.iter().filter(|s| !s.is_terminal()).count(),
            2,
            "two intermediate polls before download"
        );
        assert_eq!(artifacts.video, b"https://blob/video.mp4");
        assert_eq!(artifacts.subtitles.as_deref(), Some(&b"https://blob/sub.srt"[..]));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_never_downloads() {
        let service = ScriptedService::new(vec![Ok(JobStatus::Running), Ok(JobStatus::Failed)]);
        let err = await_completion(&service, &handle(), &PollPolicy::default(), |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, AvatarDeckError::JobFailed { .. }));
        assert!(service.calls().iter().all(|c| !c.starts_with("download")));
    }

    #[tokio::test(start_paused = true)]
    async fn running_forever_times_out() {
        let service = ScriptedService::new(vec![]);
        let policy = PollPolicy {
            interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(20),
            ..PollPolicy::default()
        };
        let err = await_completion(&service, &handle(), &policy, |_, _| {})
            .await
            .unwrap_err();

        match err {
            AvatarDeckError::JobTimedOut { waited_secs, .. } => assert_eq!(waited_secs, 20),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(service.calls().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_status_error_is_retried() {
        let service = ScriptedService::new(vec![
            Err(AvatarDeckError::JobStatusFailed {
                job_id: "job-1".into(),
                status: 503,
                body: "busy".into(),
            }),
            Ok(JobStatus::Succeeded),
        ]);
        let artifacts = await_completion(&service, &handle(), &PollPolicy::default(), |_, _| {})
            .await
            .unwrap();
        assert!(!artifacts.video.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn long_retry_chains_do_not_overflow_the_backoff() {
        let policy = PollPolicy {
            max_retries: 40,
            retry_backoff: Duration::from_millis(1),
            ..PollPolicy::default()
        };
        let calls = std::sync::atomic::AtomicU32::new(0);
        let failures = &calls;
        let value = with_retry(&policy, "flaky call", move || async move {
            if failures.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < 34 {
                Err(AvatarDeckError::Transport {
                    url: "https://stub".into(),
                    reason: "connection reset".into(),
                })
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 35);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_status_error_is_returned() {
        let service = ScriptedService::new(vec![Err(AvatarDeckError::JobStatusFailed {
            job_id: "job-1".into(),
            status: 404,
            body: "not found".into(),
        })]);
        let err = await_completion(&service, &handle(), &PollPolicy::default(), |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AvatarDeckError::JobStatusFailed { status: 404, .. }));
        assert!(service.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_subtitle_is_tolerated() {
        let mut service = ScriptedService::new(vec![Ok(JobStatus::Succeeded)]);
        service.subtitle = false;
        let artifacts = await_completion(&service, &handle(), &PollPolicy::default(), |_, _| {})
            .await
            .unwrap();
        assert!(artifacts.subtitles.is_none());
    }

    #[tokio::test]
    async fn submit_sends_text_and_returns_handle() {
        let service = ScriptedService::new(vec![]);
        let handle = submit(&service, "Hello class", &AvatarSettings::default())
            .await
            .unwrap();
        assert!(Uuid::parse_str(&handle.id).is_ok());
        assert_eq!(service.calls(), vec!["create:Hello class"]);
    }

    #[tokio::test(start_paused = true)]
    async fn pacer_spaces_submissions() {
        let mut pacer = SubmissionPacer::new(Duration::from_secs(35));
        let start = Instant::now();

        assert_eq!(pacer.wait_turn().await, Duration::ZERO);
        sleep(Duration::from_secs(10)).await;
        let waited = pacer.wait_turn().await;

        assert_eq!(waited, Duration::from_secs(25));
        assert!(start.elapsed() >= Duration::from_secs(35));
    }

    #[tokio::test(start_paused = true)]
    async fn pacer_does_not_wait_after_long_gap() {
        let mut pacer = SubmissionPacer::new(Duration::from_secs(35));
        pacer.wait_turn().await;
        sleep(Duration::from_secs(40)).await;
        assert_eq!(pacer.wait_turn().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn save_writes_video_and_srt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video/video-256.mp4");
        let artifacts = SynthesisArtifacts {
            video: vec![0, 1, 2],
            subtitles: Some(b"1\n00:00:00,000 --> 00:00:01,000\nHi\n".to_vec()),
        };
        let srt = save_artifacts(&artifacts, &path).await.unwrap();
        assert_eq!(srt, Some(dir.path().join("video/video-256.srt")));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0, 1, 2]);
    }
}
