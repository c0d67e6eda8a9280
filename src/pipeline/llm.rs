//! Text generation: bullets and speaker narration via the chat-completion API.
//!
//! Prompt wording lives in [`crate::prompts`]; this module only drives the
//! call, retries transient failures, and shapes the returned text.
//!
//! ## Retry Strategy
//!
//! Exponential backoff (`retry_backoff_ms * 2^attempt`): with 500 ms base and
//! 3 retries the wait sequence is 500 ms → 1 s → 2 s.

use crate::config::{NarrationMode, PipelineConfig};
use crate::error::AvatarDeckError;
use crate::prompts::{
    bullets_user_prompt, narration_system_prompt, narration_user_prompt, BULLETS_SYSTEM_PROMPT,
};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Text returned by one generation call plus its token usage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generated {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Ask the model for a short bullet list summarising `content`.
pub async fn generate_bullets(
    provider: &Arc<dyn LLMProvider>,
    content: &str,
    config: &PipelineConfig,
) -> Result<Generated, AvatarDeckError> {
    let messages = vec![
        ChatMessage::system(BULLETS_SYSTEM_PROMPT),
        ChatMessage::user(bullets_user_prompt(content)),
    ];
    chat_with_retry(provider, &messages, config, "bullets").await
}

/// Ask the model for a spoken transcript of `content` in the given `mode`.
pub async fn generate_narration(
    provider: &Arc<dyn LLMProvider>,
    content: &str,
    mode: NarrationMode,
    config: &PipelineConfig,
) -> Result<Generated, AvatarDeckError> {
    let system = narration_system_prompt(mode);
    let messages = vec![
        ChatMessage::system(system),
        ChatMessage::user(narration_user_prompt(content)),
    ];
    chat_with_retry(provider, &messages, config, mode.as_str()).await
}

/// Split model output into one paragraph per bullet.
///
/// Leading list markers (`-`, `*`, `•`) and blank lines are dropped; the
/// placeholder's own bullet style supplies the marker.
pub fn bullet_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

async fn chat_with_retry(
    provider: &Arc<dyn LLMProvider>,
    messages: &[ChatMessage],
    config: &PipelineConfig,
    what: &str,
) -> Result<Generated, AvatarDeckError> {
    let start = Instant::now();
    let options = build_options(config);
    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config
                .retry_backoff_ms
                .saturating_mul(2u64.saturating_pow(attempt - 1));
            warn!(
                "Generating {}: retry {}/{} after {}ms",
                what, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.chat(messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "Generated {}: {} input tokens, {} output tokens, {:?}",
                    what,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                return Ok(Generated {
                    text: response.content,
                    input_tokens: response.prompt_tokens as usize,
                    output_tokens: response.completion_tokens as usize,
                });
            }
            Err(e) => {
                let err_msg = format!("{}", e);
                warn!("Generating {}: attempt {} failed — {}", what, attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
        }
    }

    Err(AvatarDeckError::LlmApiError {
        message: last_err.unwrap_or_else(|| "Unknown error".to_string()),
    })
}

/// Build `CompletionOptions` from the pipeline config.
fn build_options(config: &PipelineConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        top_p: Some(config.top_p),
        frequency_penalty: Some(config.frequency_penalty),
        presence_penalty: Some(config.presence_penalty),
        max_tokens: config.max_tokens,
        ..Default::default()
    }
}
