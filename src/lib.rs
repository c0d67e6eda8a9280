//! # avatar-deck
//!
//! Generate narrated avatar videos from presentation notes and Markdown
//! training modules, and embed them into `.pptx` decks.
//!
//! ## Why this crate?
//!
//! Recording a presenter for every slide of a course is slow and hard to
//! keep up to date. This crate lets a text-to-speech avatar service do the
//! talking: the speaker text comes either from the notes already on each
//! slide or from a chat model that reads the module's Markdown, and the
//! rendered video is placed behind the slide content so the deck plays as a
//! narrated lesson.
//!
//! ## Pipeline Overview
//!
//! ```text
//! module.yml ─▶ markdown ─▶ sections ─┐
//!                                      ├─▶ bullets + narration (LLM)
//! deck.pptx ─▶ speaker notes ─────────┘          │
//!                                                 ├─▶ speech audio (TTS)
//!                                                 ├─▶ avatar video (batch job, polled)
//!                                                 └─▶ slide media + notes ─▶ out.pptx
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use avatar_deck::{notes_to_video, PipelineConfig, SlideSelection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials from SPEECH_KEY / SPEECH_REGION
//!     let config = PipelineConfig::builder()
//!         .slides(SlideSelection::Single(2))
//!         .build()?;
//!     let output = notes_to_video("lesson.pptx", "lesson-video.pptx", &config).await?;
//!     eprintln!(
//!         "{} slides with video, {} skipped",
//!         output.stats.processed_slides, output.stats.skipped_slides
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `avatar-deck` binary (clap + anyhow + tracing-subscriber + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! avatar-deck = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────
pub mod avatar;
pub mod config;
pub mod convert;
pub mod deck;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────
pub use avatar::{AvatarApi, AzureAvatarClient, JobStatus, PollPolicy, SubmissionPacer};
pub use config::{
    AvatarSettings, MediaGeometry, NarrationMode, PipelineConfig, PipelineConfigBuilder,
    SlideSelection, SpeechCredentials, VideoCrop,
};
pub use convert::{module_to_deck, notes_to_video, synthesize_audio, synthesize_video};
pub use deck::{Deck, Layer, MediaKind, SlideInfo};
pub use error::{AvatarDeckError, SlideError};
pub use output::{MediaOutput, RunOutput, RunStats, SlideResult};
pub use pipeline::speech::{AudioFormat, AzureSpeechClient, SpeechSynthesizer};
pub use progress::{DeckProgressCallback, NoopProgressCallback, ProgressCallback};
