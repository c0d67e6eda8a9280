//! Error types for the avatar-deck library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AvatarDeckError`] — **Fatal**: the run cannot proceed at all
//!   (unreadable presentation, missing credentials, broken manifest, a
//!   selected slide that does not exist). Returned as `Err(AvatarDeckError)`
//!   from the top-level entry points in [`crate::convert`].
//!
//! * [`SlideError`] — **Non-fatal**: a single slide failed (the model call
//!   errored, the avatar job failed or timed out) but every other slide is
//!   fine. Stored inside [`crate::output::SlideResult`] so callers can inspect
//!   partial success instead of losing the whole deck to one bad slide.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the avatar-deck library.
#[derive(Debug, Error)]
pub enum AvatarDeckError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but is not a zip-based presentation package.
    #[error("File is not a presentation package: '{path}'\nFirst bytes: {magic:?}")]
    NotAPresentation { path: PathBuf, magic: [u8; 4] },

    /// A part of the presentation package is missing or malformed.
    #[error("Presentation part '{part}' is invalid: {detail}")]
    InvalidDeck { part: String, detail: String },

    /// The module manifest could not be read or lacks a required key.
    #[error("Invalid module manifest '{path}': {detail}")]
    InvalidManifest { path: PathBuf, detail: String },

    // ── Selection errors ──────────────────────────────────────────────────
    /// Selected slide numbers exceed the actual slide count.
    #[error("Slide {slide} is out of range (presentation has {total} slides)")]
    SlideOutOfRange { slide: usize, total: usize },

    /// The template has fewer layouts than the configured layout index.
    #[error("Layout {index} is out of range (template has {total} layouts)")]
    LayoutOutOfRange { index: usize, total: usize },

    /// A named (or typed) placeholder does not exist on the slide.
    #[error("Slide {slide} has no placeholder named '{name}'")]
    PlaceholderNotFound { slide: usize, name: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error after all retries.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    // ── Speech / avatar errors ────────────────────────────────────────────
    /// Speech key or region is missing.
    #[error("Speech service is not configured.\n{hint}")]
    SpeechNotConfigured { hint: String },

    /// Text-to-speech request failed.
    #[error("Speech synthesis failed (HTTP {status}): {detail}")]
    SpeechFailed { status: u16, detail: String },

    /// The avatar service rejected the batch job.
    #[error("Failed to submit batch avatar job: [{status}] {body}")]
    JobSubmissionFailed { status: u16, body: String },

    /// The job status could not be read.
    #[error("Failed to get batch avatar job '{job_id}': [{status}] {body}")]
    JobStatusFailed {
        job_id: String,
        status: u16,
        body: String,
    },

    /// The service reported the job as failed.
    #[error("Batch avatar job '{job_id}' failed: {detail}")]
    JobFailed { job_id: String, detail: String },

    /// The job did not reach a terminal state in time.
    #[error("Batch avatar job '{job_id}' did not finish within {waited_secs}s\nIncrease --max-wait.")]
    JobTimedOut { job_id: String, waited_secs: u64 },

    /// The job succeeded but did not report a result URL.
    #[error("Batch avatar job '{job_id}' succeeded without a '{output}' output")]
    MissingJobOutput { job_id: String, output: String },

    /// A request never reached the service, or its body could not be read.
    #[error("Request to '{url}' failed: {reason}")]
    Transport { url: String, reason: String },

    /// Downloading a result file failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// HTTP 429 from any of the remote services.
    #[error("Rate limit exceeded for '{service}'")]
    RateLimitExceeded {
        service: String,
        retry_after_secs: Option<u64>,
    },

    // ── Run errors ────────────────────────────────────────────────────────
    /// Every attempted slide failed; the output would contain nothing new.
    #[error("All {total} slides failed.\nFirst error: {first_error}")]
    AllSlidesFailed { total: usize, first_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AvatarDeckError {
    /// Whether repeating the same request may succeed.
    ///
    /// Network failures, HTTP 429 and 5xx responses are transient; every
    /// other error is returned to the caller on first sight.
    pub fn is_transient(&self) -> bool {
        match self {
            AvatarDeckError::Transport { .. } | AvatarDeckError::RateLimitExceeded { .. } => true,
            AvatarDeckError::JobStatusFailed { status, .. }
            | AvatarDeckError::JobSubmissionFailed { status, .. }
            | AvatarDeckError::SpeechFailed { status, .. } => *status >= 500,
            AvatarDeckError::DownloadFailed { reason, .. } => reason.starts_with("HTTP 5"),
            _ => false,
        }
    }

    pub(crate) fn invalid_deck(part: impl Into<String>, detail: impl ToString) -> Self {
        AvatarDeckError::InvalidDeck {
            part: part.into(),
            detail: detail.to_string(),
        }
    }
}

/// A non-fatal error for a single slide.
///
/// Stored alongside [`crate::output::SlideResult`] when a slide fails.
/// The run continues unless ALL attempted slides fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SlideError {
    /// Bullet or narration generation failed after retries.
    #[error("Slide {slide}: text generation failed: {detail}")]
    NarrationFailed { slide: usize, detail: String },

    /// Speech audio could not be synthesised.
    #[error("Slide {slide}: audio synthesis failed: {detail}")]
    AudioFailed { slide: usize, detail: String },

    /// The avatar job failed, timed out, or its result could not be fetched.
    #[error("Slide {slide}: avatar video failed: {detail}")]
    VideoFailed { slide: usize, detail: String },

    /// Generated media could not be placed into the slide.
    #[error("Slide {slide}: embedding failed: {detail}")]
    EmbedFailed { slide: usize, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_slides_failed_display() {
        let e = AvatarDeckError::AllSlidesFailed {
            total: 4,
            first_error: "job failed".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 4 slides"), "got: {msg}");
        assert!(msg.contains("job failed"));
    }

    #[test]
    fn job_timeout_display() {
        let e = AvatarDeckError::JobTimedOut {
            job_id: "abc".into(),
            waited_secs: 1800,
        };
        assert!(e.to_string().contains("1800s"));
        assert!(e.to_string().contains("abc"));
    }

    #[test]
    fn placeholder_display() {
        let e = AvatarDeckError::PlaceholderNotFound {
            slide: 3,
            name: "Content Placeholder 2".into(),
        };
        assert!(e.to_string().contains("Slide 3"));
        assert!(e.to_string().contains("Content Placeholder 2"));
    }

    #[test]
    fn transient_classification() {
        assert!(AvatarDeckError::Transport {
            url: "u".into(),
            reason: "connection reset".into()
        }
        .is_transient());
        assert!(AvatarDeckError::RateLimitExceeded {
            service: "avatar".into(),
            retry_after_secs: None
        }
        .is_transient());
        assert!(AvatarDeckError::JobStatusFailed {
            job_id: "j".into(),
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!AvatarDeckError::JobStatusFailed {
            job_id: "j".into(),
            status: 404,
            body: String::new()
        }
        .is_transient());
        assert!(!AvatarDeckError::JobFailed {
            job_id: "j".into(),
            detail: "bad input".into()
        }
        .is_transient());
    }

    #[test]
    fn slide_error_display() {
        let e = SlideError::VideoFailed {
            slide: 2,
            detail: "timed out".into(),
        };
        assert_eq!(e.to_string(), "Slide 2: avatar video failed: timed out");
    }
}
