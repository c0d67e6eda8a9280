//! Run entry points: the two deck flows and free-standing media synthesis.
//!
//! ## Notes flow vs. module flow
//!
//! [`notes_to_video`] starts from an existing presentation and only adds
//! media: each selected slide's speaker notes become an avatar video placed
//! behind the slide content. [`module_to_deck`] starts from a module
//! manifest and builds new slides from a template: title, generated bullets,
//! generated narration as notes, a speech track and an avatar video.
//!
//! Both process one slide at a time. Avatar job submissions go through a
//! [`SubmissionPacer`] so successive jobs stay `submission_interval_secs`
//! apart.

use crate::avatar::runner::with_retry;
use crate::avatar::{
    await_completion, save_artifacts, submit, AvatarApi, AzureAvatarClient, PollPolicy,
    SubmissionPacer,
};
use crate::config::{
    non_empty_env, MediaGeometry, NarrationMode, PipelineConfig, SpeechCredentials,
};
use crate::deck::{Deck, Layer};
use crate::error::{AvatarDeckError, SlideError};
use crate::output::{MediaOutput, RunOutput, RunStats, SlideResult};
use crate::pipeline::llm;
use crate::pipeline::manifest::ModuleManifest;
use crate::pipeline::segment::{split_sections, Section};
use crate::pipeline::speech::{AudioFormat, AzureSpeechClient, SpeechSynthesizer};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Embed an avatar video of its speaker notes on every selected slide.
///
/// Slides with empty notes are skipped. The output presentation is written
/// after each embedded video, so an interrupted run keeps finished slides.
///
/// # Arguments
/// * `input_pptx`  — presentation to read
/// * `output_pptx` — where the modified presentation is written
/// * `config`      — run configuration; `config.slides` picks the slides
///
/// # Errors
/// Returns `Err(AvatarDeckError)` only for fatal errors:
/// - Input not found / not a presentation
/// - A requested slide does not exist
/// - Speech credentials missing
/// - The output cannot be written
/// - Every attempted slide failed
pub async fn notes_to_video(
    input_pptx: impl AsRef<Path>,
    output_pptx: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<RunOutput, AvatarDeckError> {
    let total_start = Instant::now();
    let input_pptx = input_pptx.as_ref();
    let output_pptx = output_pptx.as_ref();
    info!("Starting notes run: {}", input_pptx.display());

    // ── Step 1: Open the presentation ────────────────────────────────────
    let mut deck = Deck::open(input_pptx)?;
    let total_slides = deck.slide_count()?;

    // ── Step 2: Resolve the slide selection ──────────────────────────────
    if let Some(slide) = config.slides.first_out_of_range(total_slides) {
        return Err(AvatarDeckError::SlideOutOfRange {
            slide,
            total: total_slides,
        });
    }
    let slide_indices = config.slides.to_indices(total_slides);
    debug!("Selected {} of {} slides", slide_indices.len(), total_slides);

    // ── Step 3: Get/create the avatar service ────────────────────────────
    let api = resolve_avatar_api(config)?;
    let mut pacer = SubmissionPacer::new(Duration::from_secs(config.submission_interval_secs));
    let progress = progress_of(config);
    let total = slide_indices.len();
    progress.on_run_start(total);

    // ── Step 4: One video per slide ──────────────────────────────────────
    let mut timing = RunTiming::default();
    let mut slides = Vec::with_capacity(total);

    for idx in slide_indices {
        let number = idx + 1;
        let slide_start = Instant::now();
        let info = deck.slide(number)?;
        let label = deck.title_text(number)?;
        let mut result = SlideResult {
            slide_id: Some(info.id),
            ..SlideResult::new(number, label.clone())
        };
        info!("Slide {}", info.id);

        let notes = deck.notes_text(number)?;
        if notes.trim().is_empty() {
            info!("- Transcript is empty, skipping slide...");
            progress.on_slide_skipped(number, total, "empty notes");
            result.skipped = true;
            slides.push(result);
            continue;
        }
        progress.on_slide_start(number, total, &label);

        let video_path = config.video_dir().join(format!("video-{}.mp4", info.id));
        let outcome = match render_video(
            api.as_ref(),
            &mut pacer,
            &notes,
            &video_path,
            number,
            config,
            &mut timing,
        )
        .await
        {
            Ok(video) => {
                result.job_id = Some(video.job_id);
                result.subtitle_path = video.subtitle_path;
                deck.add_media(
                    number,
                    &video_path,
                    &config.video_geometry,
                    Layer::Background,
                )
                .map_err(|e| SlideError::EmbedFailed {
                    slide: number,
                    detail: e.to_string(),
                })
            }
            Err(e) => Err(SlideError::VideoFailed {
                slide: number,
                detail: e.to_string(),
            }),
        };

        result.duration_ms = slide_start.elapsed().as_millis() as u64;
        match outcome {
            Ok(_) => {
                result.video_path = Some(video_path);
                info!("Saving presentation...");
                deck.save(output_pptx)?;
                progress.on_slide_complete(number, total);
            }
            Err(e) => {
                warn!("{}", e);
                progress.on_slide_error(number, total, &e.to_string());
                result.error = Some(e);
            }
        }
        slides.push(result);
    }

    // ── Step 5: Final write and stats ────────────────────────────────────
    let stats = finish_stats(&slides, &timing, total_start);
    if stats.failed_slides > 0 && stats.processed_slides == 0 {
        return Err(all_failed(&slides));
    }
    deck.save(output_pptx)?;

    info!(
        "Notes run complete: {}/{} slides, {} skipped, {}ms total",
        stats.processed_slides, total, stats.skipped_slides, stats.total_duration_ms
    );
    progress.on_run_complete(total, stats.processed_slides);

    Ok(RunOutput {
        output_path: output_pptx.to_path_buf(),
        slides,
        stats,
    })
}

/// Build a narrated presentation from a module manifest.
///
/// Every section of the module's markdown becomes one slide appended to the
/// `template` deck, using layout `config.layout_index`. When `output` is
/// `None` the deck is written to `output/{uid}.pptx`.
///
/// # Errors
/// Fatal errors stop the run: unreadable manifest or template, a missing
/// layout or placeholder, missing credentials, an unwritable output, or
/// every section failing. A section whose text, audio or video could not be
/// generated is recorded in its [`SlideResult`] and the run moves on.
pub async fn module_to_deck(
    manifest_path: impl AsRef<Path>,
    template: impl AsRef<Path>,
    output: Option<&Path>,
    config: &PipelineConfig,
) -> Result<RunOutput, AvatarDeckError> {
    let total_start = Instant::now();
    let manifest_path = manifest_path.as_ref();
    info!("Starting module run: {}", manifest_path.display());

    // ── Step 1: Read the manifest and split the module ───────────────────
    let manifest = ModuleManifest::load(manifest_path)?;
    let markdown = manifest.read_content()?;
    let sections = split_sections(&markdown, Some(&manifest.title));
    let mode = config.narration_mode.unwrap_or_else(|| {
        NarrationMode::from_manifest_name(&manifest_path.to_string_lossy())
    });
    info!(
        "Module '{}' has {} sections ({} narration)",
        manifest.uid,
        sections.len(),
        mode.as_str()
    );

    // ── Step 2: Get/create providers ─────────────────────────────────────
    let provider = resolve_provider(config).await?;
    let speech = if config.embed_audio {
        Some(resolve_speech_api(config)?)
    } else {
        None
    };
    let api = resolve_avatar_api(config)?;

    // ── Step 3: Open the template ────────────────────────────────────────
    let mut deck = Deck::open(template.as_ref())?;
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("output").join(format!("{}.pptx", manifest.uid)));

    // ── Step 4: One slide per section ────────────────────────────────────
    let services = Services {
        provider,
        speech,
        api,
    };
    let mut pacer = SubmissionPacer::new(Duration::from_secs(config.submission_interval_secs));
    let progress = progress_of(config);
    let total = sections.len();
    progress.on_run_start(total);

    let mut timing = RunTiming::default();
    let mut slides = Vec::with_capacity(total);

    for (index, section) in sections.iter().enumerate() {
        let position = index + 1;
        let slide_start = Instant::now();
        let title = section.title.trim();
        info!("{}: {}", mode.as_str().to_uppercase(), title);
        progress.on_slide_start(position, total, title);

        let number = deck.add_slide(config.layout_index)?;
        deck.set_title(number, title)?;
        let mut result = SlideResult {
            slide_id: Some(deck.slide(number)?.id),
            ..SlideResult::new(number, title)
        };

        let outcome = fill_section(
            &mut deck,
            &services,
            &mut pacer,
            SectionTarget {
                number,
                index,
                position,
                section,
                mode,
            },
            config,
            &mut result,
            &mut timing,
        )
        .await;

        result.duration_ms = slide_start.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => progress.on_slide_complete(position, total),
            Err(SectionFailure::Slide(e)) => {
                warn!("{}", e);
                progress.on_slide_error(position, total, &e.to_string());
                result.error = Some(e);
            }
            Err(SectionFailure::Fatal(e)) => return Err(e),
        }
        slides.push(result);
    }

    // ── Step 5: Write the deck and compute stats ─────────────────────────
    let stats = finish_stats(&slides, &timing, total_start);
    if stats.processed_slides == 0 {
        return Err(all_failed(&slides));
    }
    deck.save(&output_path)?;

    info!(
        "Module run complete: {}/{} sections, {}ms total",
        stats.processed_slides, total, stats.total_duration_ms
    );
    progress.on_run_complete(total, stats.processed_slides);

    Ok(RunOutput {
        output_path,
        slides,
        stats,
    })
}

/// Render `text` as an avatar video at `mp4_path`, with subtitles next to it.
pub async fn synthesize_video(
    text: &str,
    mp4_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<MediaOutput, AvatarDeckError> {
    let start = Instant::now();
    let mp4_path = mp4_path.as_ref();
    if text.trim().is_empty() {
        return Err(AvatarDeckError::InvalidConfig("nothing to synthesise".into()));
    }

    let api = resolve_avatar_api(config)?;
    let policy = PollPolicy::from_config(config);
    let handle = submit(api.as_ref(), text, &config.avatar).await?;
    info!("Job ID: {}", handle.id);
    let artifacts = await_completion(api.as_ref(), &handle, &policy, |_, _| {}).await?;
    let subtitle_path = save_artifacts(&artifacts, mp4_path).await?;

    Ok(MediaOutput {
        media_path: mp4_path.to_path_buf(),
        subtitle_path,
        job_id: Some(handle.id),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Render `text` as speech audio at `path`; `.mp3` selects MP3, else WAV.
pub async fn synthesize_audio(
    text: &str,
    path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<MediaOutput, AvatarDeckError> {
    let start = Instant::now();
    let path = path.as_ref();
    if text.trim().is_empty() {
        return Err(AvatarDeckError::InvalidConfig("nothing to synthesise".into()));
    }

    let speech = resolve_speech_api(config)?;
    write_speech(speech.as_ref(), text, path, config).await?;

    Ok(MediaOutput {
        media_path: path.to_path_buf(),
        subtitle_path: None,
        job_id: None,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

struct Services {
    provider: Arc<dyn LLMProvider>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    api: Arc<dyn AvatarApi>,
}

struct SectionTarget<'a> {
    /// Slide number in the deck.
    number: usize,
    /// 0-based section index; names the media files.
    index: usize,
    /// 1-based position in this run, for progress events.
    position: usize,
    section: &'a Section,
    mode: NarrationMode,
}

enum SectionFailure {
    Slide(SlideError),
    Fatal(AvatarDeckError),
}

impl From<AvatarDeckError> for SectionFailure {
    fn from(e: AvatarDeckError) -> Self {
        SectionFailure::Fatal(e)
    }
}

#[derive(Default)]
struct RunTiming {
    throttle: Duration,
    polling: Duration,
}

struct RenderedVideo {
    job_id: String,
    subtitle_path: Option<PathBuf>,
}

/// Bullets, notes, audio and video for one freshly added section slide.
async fn fill_section(
    deck: &mut Deck,
    services: &Services,
    pacer: &mut SubmissionPacer,
    target: SectionTarget<'_>,
    config: &PipelineConfig,
    result: &mut SlideResult,
    timing: &mut RunTiming,
) -> Result<(), SectionFailure> {
    let SectionTarget {
        number,
        index,
        position,
        section,
        mode,
    } = target;
    let text_failed = |e: AvatarDeckError| {
        SectionFailure::Slide(SlideError::NarrationFailed {
            slide: number,
            detail: e.to_string(),
        })
    };

    info!("- Generating bulleted list");
    let bullets = llm::generate_bullets(&services.provider, &section.content, config)
        .await
        .map_err(text_failed)?;
    result.input_tokens += bullets.input_tokens;
    result.output_tokens += bullets.output_tokens;
    deck.set_placeholder_paragraphs(
        number,
        &config.content_placeholder,
        &llm::bullet_lines(&bullets.text),
    )?;

    info!("- Generating speaker transcript");
    let narration = llm::generate_narration(&services.provider, &section.content, mode, config)
        .await
        .map_err(text_failed)?;
    result.input_tokens += narration.input_tokens;
    result.output_tokens += narration.output_tokens;
    let transcript = narration.text.trim();
    deck.set_notes_text(number, transcript)?;

    if let Some(ref speech) = services.speech {
        info!("- Generating audio");
        let audio_path = config.audio_dir().join(format!("audio-{index}.wav"));
        write_speech(speech.as_ref(), transcript, &audio_path, config)
            .await
            .map_err(|e| {
                SectionFailure::Slide(SlideError::AudioFailed {
                    slide: number,
                    detail: e.to_string(),
                })
            })?;
        deck.add_media(number, &audio_path, &MediaGeometry::speck(), Layer::Foreground)
            .map_err(|e| embed_failed(number, e))?;
        result.audio_path = Some(audio_path);
    }

    info!("- Generating video");
    let video_path = config.video_dir().join(format!("video-{index}.mp4"));
    let video = render_video(
        services.api.as_ref(),
        pacer,
        transcript,
        &video_path,
        position,
        config,
        timing,
    )
    .await
    .map_err(|e| {
        SectionFailure::Slide(SlideError::VideoFailed {
            slide: number,
            detail: e.to_string(),
        })
    })?;
    result.job_id = Some(video.job_id);
    result.subtitle_path = video.subtitle_path;

    deck.add_media(
        number,
        &video_path,
        &config.video_geometry,
        Layer::Background,
    )
    .map_err(|e| embed_failed(number, e))?;
    result.video_path = Some(video_path);
    Ok(())
}

/// Wait for the pacer, run one avatar job to completion and save its output.
async fn render_video(
    api: &dyn AvatarApi,
    pacer: &mut SubmissionPacer,
    text: &str,
    mp4_path: &Path,
    slide: usize,
    config: &PipelineConfig,
    timing: &mut RunTiming,
) -> Result<RenderedVideo, AvatarDeckError> {
    let progress = progress_of(config);
    let wait = pacer.pending_wait();
    if !wait.is_zero() {
        progress.on_throttle(slide, wait);
    }
    timing.throttle += pacer.wait_turn().await;

    let handle = submit(api, text, &config.avatar).await?;
    info!("Job ID: {}", handle.id);

    let poll_start = Instant::now();
    let policy = PollPolicy::from_config(config);
    let artifacts = await_completion(api, &handle, &policy, |status, elapsed| {
        progress.on_job_status(slide, &status.to_string(), elapsed)
    })
    .await;
    timing.polling += poll_start.elapsed();
    let subtitle_path = save_artifacts(&artifacts?, mp4_path).await?;

    Ok(RenderedVideo {
        job_id: handle.id,
        subtitle_path,
    })
}

/// Synthesize `text` and write it to `path`, creating parent directories.
///
/// Transient service errors are retried like avatar status requests.
async fn write_speech(
    speech: &dyn SpeechSynthesizer,
    text: &str,
    path: &Path,
    config: &PipelineConfig,
) -> Result<(), AvatarDeckError> {
    let format = AudioFormat::from_path(path);
    let voice = config.avatar.voice.as_str();
    let policy = PollPolicy::from_config(config);
    let bytes = with_retry(&policy, "speech synthesis", move || {
        speech.synthesize(text, voice, format)
    })
    .await?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AvatarDeckError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| AvatarDeckError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    debug!("Wrote {} bytes of audio to {}", bytes.len(), path.display());
    Ok(())
}

fn embed_failed(slide: usize, e: AvatarDeckError) -> SectionFailure {
    SectionFailure::Slide(SlideError::EmbedFailed {
        slide,
        detail: e.to_string(),
    })
}

fn progress_of(config: &PipelineConfig) -> ProgressCallback {
    config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback))
}

fn finish_stats(slides: &[SlideResult], timing: &RunTiming, start: Instant) -> RunStats {
    RunStats {
        total_duration_ms: start.elapsed().as_millis() as u64,
        throttle_ms: timing.throttle.as_millis() as u64,
        polling_ms: timing.polling.as_millis() as u64,
        ..RunStats::from_slides(slides)
    }
}

fn all_failed(slides: &[SlideResult]) -> AvatarDeckError {
    let first_error = slides
        .iter()
        .find_map(|s| s.error.as_ref())
        .map(|e| format!("{}", e))
        .unwrap_or_else(|| "Unknown error".to_string());
    AvatarDeckError::AllSlidesFailed {
        total: slides.iter().filter(|s| !s.skipped).count(),
        first_error,
    }
}

/// Instantiate a named provider with the given model.
fn create_chat_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, AvatarDeckError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AvatarDeckError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the chat provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **Azure OpenAI** when `AZURE_OPENAI_API_KEY` is set; the factory reads
///    `AZURE_OPENAI_ENDPOINT` itself.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub(crate) async fn resolve_provider(
    config: &PipelineConfig,
) -> Result<Arc<dyn LLMProvider>, AvatarDeckError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_chat_provider(name, config.model_or_default());
    }

    if let (Some(prov), Some(model)) = (
        non_empty_env("EDGEQUAKE_LLM_PROVIDER"),
        non_empty_env("EDGEQUAKE_MODEL"),
    ) {
        return create_chat_provider(&prov, &model);
    }

    if non_empty_env("AZURE_OPENAI_API_KEY").is_some() {
        return create_chat_provider("azure", config.model_or_default());
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AvatarDeckError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Injected avatar service, else the REST client for the configured region.
///
/// The endpoint comes from `config.avatar_endpoint`, then `AVATAR_ENDPOINT`.
pub(crate) fn resolve_avatar_api(
    config: &PipelineConfig,
) -> Result<Arc<dyn AvatarApi>, AvatarDeckError> {
    if let Some(ref api) = config.avatar_api {
        return Ok(Arc::clone(api));
    }
    let credentials = speech_credentials(config)?;
    let endpoint = config
        .avatar_endpoint
        .clone()
        .or_else(|| non_empty_env("AVATAR_ENDPOINT"));
    let client = AzureAvatarClient::new(
        &credentials,
        endpoint.as_deref(),
        config.api_timeout_secs,
        config.download_timeout_secs,
    )?;
    Ok(Arc::new(client))
}

/// Injected speech synthesizer, else the REST client for the configured region.
pub(crate) fn resolve_speech_api(
    config: &PipelineConfig,
) -> Result<Arc<dyn SpeechSynthesizer>, AvatarDeckError> {
    if let Some(ref api) = config.speech_api {
        return Ok(Arc::clone(api));
    }
    let credentials = speech_credentials(config)?;
    Ok(Arc::new(AzureSpeechClient::new(
        credentials,
        config.api_timeout_secs,
    )?))
}

fn speech_credentials(config: &PipelineConfig) -> Result<SpeechCredentials, AvatarDeckError> {
    match config.speech {
        Some(ref credentials) => Ok(credentials.clone()),
        None => SpeechCredentials::from_env(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::{BatchSynthesisRequest, SynthesisJob};
    use async_trait::async_trait;

    struct NoService;

    #[async_trait]
    impl AvatarApi for NoService {
        async fn create_job(
            &self,
            job_id: &str,
            _request: &BatchSynthesisRequest,
        ) -> Result<SynthesisJob, AvatarDeckError> {
            Err(AvatarDeckError::JobSubmissionFailed {
                status: 400,
                body: format!("rejected {job_id}"),
            })
        }

        async fn get_job(&self, job_id: &str) -> Result<SynthesisJob, AvatarDeckError> {
            Err(AvatarDeckError::Internal(format!("no job {job_id}")))
        }

        async fn download(&self, url: &str) -> Result<Vec<u8>, AvatarDeckError> {
            Err(AvatarDeckError::Internal(format!("no file {url}")))
        }
    }

    #[test]
    fn injected_avatar_api_wins() {
        let api: Arc<dyn AvatarApi> = Arc::new(NoService);
        let config = PipelineConfig::builder()
            .avatar_api(Arc::clone(&api))
            .build()
            .unwrap();
        let resolved = resolve_avatar_api(&config).unwrap();
        assert!(Arc::ptr_eq(&resolved, &api));
    }

    #[test]
    fn explicit_credentials_build_rest_clients() {
        let config = PipelineConfig::builder()
            .speech(SpeechCredentials::new("key", "westeurope"))
            .build()
            .unwrap();
        assert!(resolve_avatar_api(&config).is_ok());
        assert!(resolve_speech_api(&config).is_ok());
    }

    #[test]
    fn all_failed_reports_first_error_and_ignores_skipped() {
        let slides = vec![
            SlideResult {
                skipped: true,
                ..SlideResult::new(1, "Blank")
            },
            SlideResult {
                error: Some(SlideError::VideoFailed {
                    slide: 2,
                    detail: "job failed".into(),
                }),
                ..SlideResult::new(2, "Intro")
            },
            SlideResult {
                error: Some(SlideError::EmbedFailed {
                    slide: 3,
                    detail: "no shape tree".into(),
                }),
                ..SlideResult::new(3, "Outro")
            },
        ];
        match all_failed(&slides) {
            AvatarDeckError::AllSlidesFailed { total, first_error } => {
                assert_eq!(total, 2);
                assert!(first_error.contains("job failed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stats_carry_run_timing() {
        let timing = RunTiming {
            throttle: Duration::from_millis(35_000),
            polling: Duration::from_millis(1_200),
        };
        let stats = finish_stats(&[SlideResult::new(1, "Intro")], &timing, Instant::now());
        assert_eq!(stats.throttle_ms, 35_000);
        assert_eq!(stats.polling_ms, 1_200);
        assert_eq!(stats.processed_slides, 1);
    }

    #[tokio::test]
    async fn blank_text_is_rejected_before_any_request() {
        let config = PipelineConfig::builder()
            .avatar_api(Arc::new(NoService))
            .build()
            .unwrap();
        let err = synthesize_video("  \n", "video/unused.mp4", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, AvatarDeckError::InvalidConfig(_)));
    }
}
