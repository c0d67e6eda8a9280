//! CLI binary for avatar-deck.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use avatar_deck::{
    module_to_deck, notes_to_video, synthesize_audio, synthesize_video, AvatarSettings,
    DeckProgressCallback, NarrationMode, PipelineConfig, PipelineConfigBuilder, ProgressCallback,
    RunOutput, SlideSelection,
};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the run's slides, with the
/// current slide's job status as the bar message. Most of a run is spent
/// waiting, so the spinner keeps ticking while jobs are polled.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening presentation…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl DeckProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:32.green/238}] {pos:>3}/{len} slides  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Rendering");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting run over {total} slides…"))
        ));
    }

    fn on_slide_start(&self, slide: usize, _total: usize, label: &str) {
        self.bar.set_message(format!("slide {slide}: {label}"));
    }

    fn on_throttle(&self, slide: usize, wait: Duration) {
        self.bar.set_message(format!(
            "slide {slide}: waiting {:.0}s for the job rate limit",
            wait.as_secs_f64()
        ));
    }

    fn on_job_status(&self, slide: usize, status: &str, elapsed: Duration) {
        self.bar.set_message(format!(
            "slide {slide}: job {status} ({}s)",
            elapsed.as_secs()
        ));
    }

    fn on_slide_complete(&self, slide: usize, total: usize) {
        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}",
            green("✓"),
            slide,
            total
        ));
        self.bar.inc(1);
    }

    fn on_slide_skipped(&self, slide: usize, total: usize, reason: &str) {
        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {}",
            dim("–"),
            slide,
            total,
            dim(reason)
        ));
        self.bar.inc(1);
    }

    fn on_slide_error(&self, slide: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {}",
            red("✗"),
            slide,
            total,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {}/{} slides rendered",
                green("✔"),
                bold(&success_count.to_string()),
                total
            );
        } else {
            eprintln!(
                "{} {}/{} slides rendered  ({} failed)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Avatar video for every slide with speaker notes
  avatar-deck notes --input-pptx lesson.pptx --output-pptx lesson-video.pptx

  # Only slide 3
  avatar-deck notes --input-pptx lesson.pptx --output-pptx out.pptx --slide 3

  # Build a narrated deck from a module manifest
  avatar-deck module --yml-file modules/storage/index.yml --template template.pptx

  # Free-standing video and audio
  avatar-deck video --text "Welcome to the course." -o video/welcome.mp4
  avatar-deck audio --text-file script.txt -o audio/script.wav

ENVIRONMENT VARIABLES:
  SPEECH_KEY              Speech service key (required for video and audio)
  SPEECH_REGION           Speech service region, e.g. westeurope
  AVATAR_ENDPOINT         Override the batch avatar endpoint
  AZURE_OPENAI_ENDPOINT   Azure OpenAI endpoint (module flow)
  AZURE_OPENAI_API_KEY    Azure OpenAI key (module flow)
  EDGEQUAKE_LLM_PROVIDER  Override provider (azure, openai, anthropic, …)
  EDGEQUAKE_MODEL         Override model ID

  A .env file in the working directory is loaded first.
"#;

/// Narrated avatar videos for presentations.
#[derive(Parser, Debug)]
#[command(
    name = "avatar-deck",
    version,
    about = "Generate narrated avatar videos from slide notes and Markdown modules",
    long_about = "Render speaker notes or LLM-written narration as text-to-speech avatar \
videos and embed them into PowerPoint decks. Jobs run on the batch avatar synthesis \
service; narration and bullets come from any edgequake-llm provider.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed an avatar video of each slide's speaker notes.
    Notes(NotesArgs),
    /// Build a narrated deck from a module YAML file.
    Module(ModuleArgs),
    /// Render text as an avatar video with subtitles.
    Video(MediaArgs),
    /// Render text as speech audio.
    Audio(MediaArgs),
}

#[derive(Args, Debug)]
struct NotesArgs {
    /// Presentation to read.
    #[arg(long, alias = "input_pptx", env = "AVATAR_DECK_INPUT_PPTX")]
    input_pptx: PathBuf,

    /// Where the presentation with videos is written.
    #[arg(long, alias = "output_pptx", env = "AVATAR_DECK_OUTPUT_PPTX")]
    output_pptx: PathBuf,

    /// Slide selection: all, 5, 3-15, or 1,3,5.
    #[arg(long, env = "AVATAR_DECK_SLIDE", default_value = "all")]
    slide: String,
}

#[derive(Args, Debug)]
struct ModuleArgs {
    /// Module manifest (title, uid, content include).
    #[arg(long, alias = "yml_file", env = "AVATAR_DECK_YML_FILE")]
    yml_file: PathBuf,

    /// Template deck whose layouts are used for new slides.
    #[arg(long, env = "AVATAR_DECK_TEMPLATE", default_value = "template.pptx")]
    template: PathBuf,

    /// Output deck. Default: output/{uid}.pptx.
    #[arg(short, long, env = "AVATAR_DECK_OUTPUT")]
    output: Option<PathBuf>,

    /// Narration tone. Default: intro when the manifest path says so, else content.
    #[arg(long, env = "AVATAR_DECK_MODE", value_enum)]
    mode: Option<ModeArg>,

    /// Index of the template layout used for section slides.
    #[arg(long, env = "AVATAR_DECK_LAYOUT", default_value_t = 3)]
    layout: usize,

    /// Name of the placeholder that receives the bullets.
    #[arg(long, env = "AVATAR_DECK_PLACEHOLDER", default_value = "Content Placeholder 2")]
    placeholder: String,

    /// Skip the per-slide speech audio track.
    #[arg(long, env = "AVATAR_DECK_NO_AUDIO")]
    no_audio: bool,
}

#[derive(Args, Debug)]
struct MediaArgs {
    /// Text to speak.
    #[arg(long, conflicts_with = "text_file", required_unless_present = "text_file")]
    text: Option<String>,

    /// Read the text to speak from this file.
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// Output file (.mp4 for video; .wav or .mp3 for audio).
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// LLM model ID (module flow).
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: azure, openai, anthropic, gemini, ollama.
    #[arg(long, global = true, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Neural voice for avatar and speech.
    #[arg(long, global = true, env = "AVATAR_DECK_VOICE")]
    voice: Option<String>,

    /// Prebuilt avatar character.
    #[arg(long, global = true, env = "AVATAR_DECK_CHARACTER")]
    character: Option<String>,

    /// Avatar style.
    #[arg(long, global = true, env = "AVATAR_DECK_STYLE")]
    style: Option<String>,

    /// Directory that receives audio/ and video/.
    #[arg(long, global = true, env = "AVATAR_DECK_MEDIA_DIR", default_value = ".")]
    media_dir: PathBuf,

    /// Seconds between two job status requests.
    #[arg(long, global = true, env = "AVATAR_DECK_POLL_INTERVAL", default_value_t = 5)]
    poll_interval: u64,

    /// Give up on a job after this many seconds.
    #[arg(long, global = true, env = "AVATAR_DECK_MAX_POLL_WAIT", default_value_t = 1800)]
    max_poll_wait: u64,

    /// Minimum seconds between two job submissions.
    #[arg(long, global = true, env = "AVATAR_DECK_SUBMISSION_INTERVAL", default_value_t = 35)]
    submission_interval: u64,

    /// Retries per request on transient failure.
    #[arg(long, global = true, env = "AVATAR_DECK_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-request timeout for API calls, in seconds.
    #[arg(long, global = true, env = "AVATAR_DECK_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Timeout for result downloads, in seconds.
    #[arg(long, global = true, env = "AVATAR_DECK_DOWNLOAD_TIMEOUT", default_value_t = 300)]
    download_timeout: u64,

    /// Print the run result as JSON on stdout.
    #[arg(long, global = true, env = "AVATAR_DECK_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "AVATAR_DECK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "AVATAR_DECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "AVATAR_DECK_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Intro,
    Content,
    Conclusion,
}

impl From<ModeArg> for NarrationMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Intro => NarrationMode::Intro,
            ModeArg::Content => NarrationMode::Content,
            ModeArg::Conclusion => NarrationMode::Conclusion,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets may live in .env; a missing file is fine.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let common = &cli.common;

    // ── Logging setup ────────────────────────────────────────────────────
    // The bar only makes sense for the deck flows.
    let deck_run = matches!(cli.command, Command::Notes(_) | Command::Module(_));
    let show_progress = deck_run && !common.quiet && !common.no_progress && !common.json;
    let filter = if common.verbose {
        "debug"
    } else if common.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn DeckProgressCallback>)
    } else {
        None
    };

    match &cli.command {
        Command::Notes(args) => {
            let config = build_config(common, progress_cb, |b| {
                Ok(b.slides(parse_slides(&args.slide)?))
            })?;
            let output = notes_to_video(&args.input_pptx, &args.output_pptx, &config)
                .await
                .context("Notes run failed")?;
            report(common, &output)?;
        }
        Command::Module(args) => {
            let config = build_config(common, progress_cb, |b| {
                let b = b
                    .layout_index(args.layout)
                    .content_placeholder(args.placeholder.clone())
                    .embed_audio(!args.no_audio);
                Ok(match args.mode {
                    Some(mode) => b.narration_mode(mode.into()),
                    None => b,
                })
            })?;
            let output = module_to_deck(
                &args.yml_file,
                &args.template,
                args.output.as_deref(),
                &config,
            )
            .await
            .context("Module run failed")?;
            report(common, &output)?;
        }
        Command::Video(args) => {
            let config = build_config(common, None, Ok)?;
            let text = read_text(args).await?;
            let output = synthesize_video(&text, &args.output, &config)
                .await
                .context("Video synthesis failed")?;
            print_json_or(common, &output, || {
                eprintln!(
                    "{}  {}  {}ms",
                    green("✔"),
                    bold(&output.media_path.display().to_string()),
                    output.duration_ms
                );
                if let Some(ref srt) = output.subtitle_path {
                    eprintln!("   subtitles: {}", dim(&srt.display().to_string()));
                }
            })?;
        }
        Command::Audio(args) => {
            let config = build_config(common, None, Ok)?;
            let text = read_text(args).await?;
            let output = synthesize_audio(&text, &args.output, &config)
                .await
                .context("Audio synthesis failed")?;
            print_json_or(common, &output, || {
                eprintln!(
                    "{}  {}  {}ms",
                    green("✔"),
                    bold(&output.media_path.display().to_string()),
                    output.duration_ms
                );
            })?;
        }
    }

    Ok(())
}

/// Map the shared CLI args to `PipelineConfig`; `extra` adds
/// subcommand-specific settings.
fn build_config(
    common: &CommonArgs,
    progress: Option<ProgressCallback>,
    extra: impl FnOnce(PipelineConfigBuilder) -> Result<PipelineConfigBuilder>,
) -> Result<PipelineConfig> {
    let defaults = AvatarSettings::default();
    let avatar = AvatarSettings {
        voice: common.voice.clone().unwrap_or(defaults.voice),
        character: common.character.clone().unwrap_or(defaults.character),
        style: common.style.clone().unwrap_or(defaults.style),
        ..AvatarSettings::default()
    };

    let mut builder = PipelineConfig::builder()
        .avatar(avatar)
        .media_dir(common.media_dir.clone())
        .poll_interval_secs(common.poll_interval)
        .max_poll_wait_secs(common.max_poll_wait)
        .submission_interval_secs(common.submission_interval)
        .max_retries(common.max_retries)
        .api_timeout_secs(common.api_timeout)
        .download_timeout_secs(common.download_timeout);

    if let Some(ref model) = common.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = common.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    extra(builder)?.build().context("Invalid configuration")
}

/// Print the run summary, or the whole result as JSON.
fn report(common: &CommonArgs, output: &RunOutput) -> Result<()> {
    print_json_or(common, output, || {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} slides  {} skipped  {}ms  →  {}",
            if stats.failed_slides == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.processed_slides,
            stats.total_slides,
            stats.skipped_slides,
            stats.total_duration_ms,
            bold(&output.output_path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}s throttled, {}s polling",
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
            stats.throttle_ms / 1000,
            stats.polling_ms / 1000,
        );
    })
}

fn print_json_or<T: serde::Serialize>(
    common: &CommonArgs,
    value: &T,
    summary: impl FnOnce(),
) -> Result<()> {
    if common.json {
        let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
        println!("{json}");
    } else if !common.quiet {
        summary();
    }
    Ok(())
}

async fn read_text(args: &MediaArgs) -> Result<String> {
    match (&args.text, &args.text_file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read text from {:?}", path)),
        (None, None) => anyhow::bail!("Pass --text or --text-file"),
    }
}

/// Parse `--slide` string into `SlideSelection`.
fn parse_slides(s: &str) -> Result<SlideSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(SlideSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start slide in range")?;
        let end: usize = end.trim().parse().context("Invalid end slide in range")?;

        if start < 1 {
            anyhow::bail!("Slides are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid slide range '{}-{}': start must be <= end",
                start,
                end
            );
        }
        return Ok(SlideSelection::Range(start, end));
    }

    // Set: "1,3,5"
    if s.contains(',') {
        let slides: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid slide number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(&bad) = slides.iter().find(|&&p| p < 1) {
            anyhow::bail!("Slides are 1-indexed, minimum is 1 (got {})", bad);
        }
        return Ok(SlideSelection::Set(slides));
    }

    let slide: usize = s.parse().context("Invalid slide number")?;
    if slide < 1 {
        anyhow::bail!("Slides are 1-indexed, minimum is 1 (got {})", slide);
    }
    Ok(SlideSelection::Single(slide))
}
