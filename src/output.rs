//! Result types returned by the pipelines.

use crate::error::SlideError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one slide (notes flow) or one section (module flow).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideResult {
    /// 1-indexed slide number in the output deck.
    pub slide: usize,
    /// Slide title or section heading.
    pub label: String,
    /// Persistent slide id, used to name the notes flow's media files.
    pub slide_id: Option<u32>,
    /// Generated speech audio, when one was produced.
    pub audio_path: Option<PathBuf>,
    /// Downloaded avatar video.
    pub video_path: Option<PathBuf>,
    /// Subtitle file saved next to the video.
    pub subtitle_path: Option<PathBuf>,
    /// Id of the avatar job that rendered the video.
    pub job_id: Option<String>,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// True when the slide was left untouched (e.g. empty notes).
    pub skipped: bool,
    /// Set when the slide failed; the run carried on without it.
    pub error: Option<SlideError>,
}

impl SlideResult {
    pub fn new(slide: usize, label: impl Into<String>) -> Self {
        Self {
            slide,
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        !self.skipped && self.error.is_none()
    }
}

/// Aggregate numbers for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Slides (or sections) selected for the run.
    pub total_slides: usize,
    pub processed_slides: usize,
    pub skipped_slides: usize,
    pub failed_slides: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    /// Time spent held back by the submission pacer.
    pub throttle_ms: u64,
    /// Time spent waiting for avatar jobs to finish.
    pub polling_ms: u64,
}

impl RunStats {
    /// Counters and token totals derived from `slides`; timings stay zero.
    pub fn from_slides(slides: &[SlideResult]) -> Self {
        Self {
            total_slides: slides.len(),
            processed_slides: slides.iter().filter(|s| s.is_success()).count(),
            skipped_slides: slides.iter().filter(|s| s.skipped).count(),
            failed_slides: slides.iter().filter(|s| s.error.is_some()).count(),
            total_input_tokens: slides.iter().map(|s| s.input_tokens as u64).sum(),
            total_output_tokens: slides.iter().map(|s| s.output_tokens as u64).sum(),
            ..Self::default()
        }
    }
}

/// Everything a deck run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// Presentation written by the run.
    pub output_path: PathBuf,
    pub slides: Vec<SlideResult>,
    pub stats: RunStats,
}

/// Result of a free-standing `video` or `audio` synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaOutput {
    pub media_path: PathBuf,
    pub subtitle_path: Option<PathBuf>,
    /// Avatar job id; `None` for plain speech audio.
    pub job_id: Option<String>,
    pub duration_ms: u64,
}
