//! Configuration types for avatar-deck runs.
//!
//! All run behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Keeping every knob in one struct makes it easy
//! to share a config between the `notes`, `module`, `video` and `audio`
//! flows, log it, and diff two runs to understand why their outputs differ.

use crate::avatar::AvatarApi;
use crate::error::AvatarDeckError;
use crate::pipeline::speech::SpeechSynthesizer;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// EMUs per inch in the presentation coordinate system.
pub const EMU_PER_INCH: f64 = 914_400.0;

/// Upper bound the builder applies to `max_retries`.
pub const MAX_RETRIES: u32 = 10;

/// Convert inches to EMUs, rounding to the nearest unit.
pub fn inches(value: f64) -> i64 {
    (value * EMU_PER_INCH).round() as i64
}

/// Configuration for an avatar-deck run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use avatar_deck::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .model("gpt-4o")
///     .poll_interval_secs(5)
///     .submission_interval_secs(35)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// LLM model identifier. Default: `gpt-4o`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "azure", "openai").
    /// If None along with `provider`, the provider is resolved from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Nucleus sampling mass. Default: 0.95.
    pub top_p: f32,

    /// Frequency penalty. Default: 0.
    pub frequency_penalty: f32,

    /// Presence penalty. Default: 0.
    pub presence_penalty: f32,

    /// Output token cap per generation. Default: provider default.
    pub max_tokens: Option<usize>,

    /// Maximum retry attempts for a transient LLM or HTTP failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Voice, avatar character and video rendering options.
    pub avatar: AvatarSettings,

    /// Speech subscription key and region. Default: read from the environment.
    pub speech: Option<SpeechCredentials>,

    /// Base URL of the avatar service. Default: `https://{region}.api.cognitive.microsoft.com`.
    pub avatar_endpoint: Option<String>,

    /// Pre-constructed avatar job API. Takes precedence over `speech`.
    pub avatar_api: Option<Arc<dyn AvatarApi>>,

    /// Pre-constructed speech synthesizer. Takes precedence over `speech`.
    pub speech_api: Option<Arc<dyn SpeechSynthesizer>>,

    /// Seconds between job status requests. Default: 5.
    pub poll_interval_secs: u64,

    /// Upper bound on the time spent waiting for one job. Default: 1800.
    pub max_poll_wait_secs: u64,

    /// Minimum spacing between two job submissions. Default: 35.
    ///
    /// The avatar service rejects bursts of batch jobs; 35 s between
    /// submissions stays under its limit.
    pub submission_interval_secs: u64,

    /// Directory receiving `audio/` and `video/` artifacts. Default: `.`.
    pub media_dir: PathBuf,

    /// Slides to process in the `notes` flow. Default: all.
    pub slides: SlideSelection,

    /// Zero-based layout index used for new slides in the `module` flow. Default: 3.
    pub layout_index: usize,

    /// Name of the placeholder that receives generated bullets.
    /// Default: `Content Placeholder 2`.
    pub content_placeholder: String,

    /// Narration mode override. Default: derived from the manifest name.
    pub narration_mode: Option<NarrationMode>,

    /// Embed a speech audio track on every generated slide. Default: true.
    pub embed_audio: bool,

    /// Where the avatar video lands on the slide.
    pub video_geometry: MediaGeometry,

    /// Timeout for each API call in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Timeout for each result download in seconds. Default: 300.
    pub download_timeout_secs: u64,

    /// Receives per-slide progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            top_p: 0.95,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            max_tokens: None,
            max_retries: 3,
            retry_backoff_ms: 500,
            avatar: AvatarSettings::default(),
            speech: None,
            avatar_endpoint: None,
            avatar_api: None,
            speech_api: None,
            poll_interval_secs: 5,
            max_poll_wait_secs: 1800,
            submission_interval_secs: 35,
            media_dir: PathBuf::from("."),
            slides: SlideSelection::default(),
            layout_index: 3,
            content_placeholder: "Content Placeholder 2".to_string(),
            narration_mode: None,
            embed_audio: true,
            video_geometry: MediaGeometry::avatar_column(),
            api_timeout_secs: 60,
            download_timeout_secs: 300,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_retries", &self.max_retries)
            .field("avatar", &self.avatar)
            .field("speech", &self.speech)
            .field("avatar_endpoint", &self.avatar_endpoint)
            .field("avatar_api", &self.avatar_api.as_ref().map(|_| "<dyn AvatarApi>"))
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("max_poll_wait_secs", &self.max_poll_wait_secs)
            .field("submission_interval_secs", &self.submission_interval_secs)
            .field("media_dir", &self.media_dir)
            .field("slides", &self.slides)
            .field("layout_index", &self.layout_index)
            .field("content_placeholder", &self.content_placeholder)
            .field("narration_mode", &self.narration_mode)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model id to request, falling back to `gpt-4o`.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or("gpt-4o")
    }

    /// Directory holding generated audio files.
    pub fn audio_dir(&self) -> PathBuf {
        self.media_dir.join("audio")
    }

    /// Directory holding generated video and subtitle files.
    pub fn video_dir(&self) -> PathBuf {
        self.media_dir.join("video")
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl fmt::Debug for PipelineConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.config.fmt(f)
    }
}

impl PipelineConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    /// Retries per transiently failing call, at most [`MAX_RETRIES`].
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn avatar(mut self, settings: AvatarSettings) -> Self {
        self.config.avatar = settings;
        self
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.config.avatar.voice = voice.into();
        self
    }

    pub fn speech(mut self, credentials: SpeechCredentials) -> Self {
        self.config.speech = Some(credentials);
        self
    }

    pub fn avatar_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.avatar_endpoint = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn avatar_api(mut self, api: Arc<dyn AvatarApi>) -> Self {
        self.config.avatar_api = Some(api);
        self
    }

    pub fn speech_api(mut self, api: Arc<dyn SpeechSynthesizer>) -> Self {
        self.config.speech_api = Some(api);
        self
    }

    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval_secs = secs;
        self
    }

    pub fn max_poll_wait_secs(mut self, secs: u64) -> Self {
        self.config.max_poll_wait_secs = secs;
        self
    }

    pub fn submission_interval_secs(mut self, secs: u64) -> Self {
        self.config.submission_interval_secs = secs;
        self
    }

    pub fn media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.media_dir = dir.into();
        self
    }

    pub fn slides(mut self, selection: SlideSelection) -> Self {
        self.config.slides = selection;
        self
    }

    pub fn layout_index(mut self, index: usize) -> Self {
        self.config.layout_index = index;
        self
    }

    pub fn content_placeholder(mut self, name: impl Into<String>) -> Self {
        self.config.content_placeholder = name.into();
        self
    }

    pub fn narration_mode(mut self, mode: NarrationMode) -> Self {
        self.config.narration_mode = Some(mode);
        self
    }

    pub fn embed_audio(mut self, v: bool) -> Self {
        self.config.embed_audio = v;
        self
    }

    pub fn video_geometry(mut self, geometry: MediaGeometry) -> Self {
        self.config.video_geometry = geometry;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, AvatarDeckError> {
        let c = &self.config;
        if c.max_poll_wait_secs < c.poll_interval_secs {
            return Err(AvatarDeckError::InvalidConfig(format!(
                "max poll wait ({}s) is shorter than the poll interval ({}s)",
                c.max_poll_wait_secs, c.poll_interval_secs
            )));
        }
        if c.avatar.voice.trim().is_empty() {
            return Err(AvatarDeckError::InvalidConfig("voice must not be empty".into()));
        }
        if c.content_placeholder.trim().is_empty() {
            return Err(AvatarDeckError::InvalidConfig(
                "content placeholder name must not be empty".into(),
            ));
        }
        if c.video_geometry.width <= 0 || c.video_geometry.height <= 0 {
            return Err(AvatarDeckError::InvalidConfig(
                "video width and height must be positive".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Sub-structures ───────────────────────────────────────────────────────

/// Voice and avatar rendering options sent with every batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarSettings {
    /// Neural voice name. Default: `en-US-AvaMultilingualNeural`.
    pub voice: String,
    /// Prebuilt avatar character. Default: `Lisa`.
    pub character: String,
    /// Avatar style; required for prebuilt characters. Default: `technical-sitting`.
    pub style: String,
    /// Use a custom-trained avatar instead of a prebuilt one. Default: false.
    pub customized: bool,
    /// Container format. Default: `mp4`.
    pub video_format: String,
    /// Video codec. Default: `h264`.
    pub video_codec: String,
    /// Background colour in `#RRGGBBAA`, or `transparent`. Default: white.
    pub background_color: String,
    /// Crop window inside the 1920×1080 frame. Default: the centre column.
    pub crop: Option<VideoCrop>,
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            voice: "en-US-AvaMultilingualNeural".to_string(),
            character: "Lisa".to_string(),
            style: "technical-sitting".to_string(),
            customized: false,
            video_format: "mp4".to_string(),
            video_codec: "h264".to_string(),
            background_color: "#FFFFFFFF".to_string(),
            crop: Some(VideoCrop::default()),
        }
    }
}

/// Rectangle cut out of the rendered avatar frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCrop {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Default for VideoCrop {
    fn default() -> Self {
        Self {
            left: 560,
            top: 0,
            right: 1360,
            bottom: 1079,
        }
    }
}

/// Speech service subscription.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechCredentials {
    pub key: String,
    pub region: String,
}

impl fmt::Debug for SpeechCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechCredentials")
            .field("key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

impl SpeechCredentials {
    pub fn new(key: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            region: region.into(),
        }
    }

    /// Read `SPEECH_KEY` and `SPEECH_REGION`.
    pub fn from_env() -> Result<Self, AvatarDeckError> {
        let key = non_empty_env("SPEECH_KEY");
        let region = non_empty_env("SPEECH_REGION");
        match (key, region) {
            (Some(key), Some(region)) => Ok(Self { key, region }),
            _ => Err(AvatarDeckError::SpeechNotConfigured {
                hint: "Set SPEECH_KEY and SPEECH_REGION (a .env file works too).".into(),
            }),
        }
    }
}

pub(crate) fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Position and size of an embedded media element, in EMUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaGeometry {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl MediaGeometry {
    /// Right-hand column of a 13.33 × 7.5 in slide, full height.
    pub fn avatar_column() -> Self {
        Self {
            left: inches(7.77),
            top: 0,
            width: inches(5.56),
            height: inches(7.5),
        }
    }

    /// A 1 × 1 EMU speck at the origin, used for audio tracks.
    pub fn speck() -> Self {
        Self {
            left: 0,
            top: 0,
            width: 1,
            height: 1,
        }
    }
}

/// Tone of the generated speaker narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationMode {
    /// Welcome the audience; no goodbye.
    Intro,
    /// No greeting; thank the audience at the end.
    Conclusion,
    /// No greeting, no goodbye. (default)
    #[default]
    Content,
}

impl NarrationMode {
    /// Mode implied by a manifest file name: `intro` when the name says so.
    pub fn from_manifest_name(name: &str) -> Self {
        if name.contains("intro") {
            NarrationMode::Intro
        } else {
            NarrationMode::Content
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NarrationMode::Intro => "intro",
            NarrationMode::Conclusion => "conclusion",
            NarrationMode::Content => "content",
        }
    }
}

/// Specifies which slides of a presentation to process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum SlideSelection {
    /// Every slide (default).
    #[default]
    All,
    /// A single slide (1-indexed).
    Single(usize),
    /// A contiguous range of slides (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific slides (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl SlideSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed slide numbers.
    pub fn to_indices(&self, total_slides: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            SlideSelection::All => (0..total_slides).collect(),
            SlideSelection::Single(s) => {
                if *s >= 1 && *s <= total_slides {
                    vec![s - 1]
                } else {
                    vec![]
                }
            }
            SlideSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_slides);
                (s..e).collect()
            }
            SlideSelection::Set(slides) => slides
                .iter()
                .filter(|&&s| s >= 1 && s <= total_slides)
                .map(|s| s - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The first requested slide that does not exist, if any.
    pub fn first_out_of_range(&self, total_slides: usize) -> Option<usize> {
        let out = |s: usize| s == 0 || s > total_slides;
        match self {
            SlideSelection::All => None,
            SlideSelection::Single(s) => out(*s).then_some(*s),
            SlideSelection::Range(start, end) => {
                if out(*start) {
                    Some(*start)
                } else if *end > total_slides {
                    Some(*end)
                } else {
                    None
                }
            }
            SlideSelection::Set(slides) => slides.iter().copied().find(|&s| out(s)),
        }
    }
}
