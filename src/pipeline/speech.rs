//! Plain text-to-speech: narration text → audio bytes.
//!
//! Used for the audio track embedded on generated slides and for the
//! `audio` subcommand. The REST endpoint takes SSML and returns the encoded
//! audio in the format named by the `X-Microsoft-OutputFormat` header.

use crate::config::SpeechCredentials;
use crate::error::AvatarDeckError;
use async_trait::async_trait;
use quick_xml::escape::escape;
use std::time::Duration;
use tracing::{debug, info};

/// Encoded audio formats the crate writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// 24 kHz 16-bit mono PCM in a RIFF container (`.wav`).
    Wav,
    /// 24 kHz 96 kbit/s mono MP3 (`.mp3`).
    Mp3,
}

impl AudioFormat {
    /// Value of the `X-Microsoft-OutputFormat` header.
    pub fn output_format(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "riff-24khz-16bit-mono-pcm",
            AudioFormat::Mp3 => "audio-24khz-96kbitrate-mono-mp3",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    /// Pick the format from a file extension; anything but `mp3` is WAV.
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("mp3") => AudioFormat::Mp3,
            _ => AudioFormat::Wav,
        }
    }
}

/// Anything that can turn text into encoded speech.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        format: AudioFormat,
    ) -> Result<Vec<u8>, AvatarDeckError>;
}

/// Speech REST client for one region.
pub struct AzureSpeechClient {
    http: reqwest::Client,
    credentials: SpeechCredentials,
    endpoint: String,
}

impl AzureSpeechClient {
    pub fn new(credentials: SpeechCredentials, timeout_secs: u64) -> Result<Self, AvatarDeckError> {
        let endpoint = format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
            credentials.region
        );
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AvatarDeckError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            credentials,
            endpoint,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for AzureSpeechClient {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        format: AudioFormat,
    ) -> Result<Vec<u8>, AvatarDeckError> {
        info!("Synthesising {} chars of speech with {}", text.len(), voice);
        let response = self
            .http
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.credentials.key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", format.output_format())
            .header("User-Agent", concat!("avatar-deck/", env!("CARGO_PKG_VERSION")))
            .body(build_ssml(text, voice))
            .send()
            .await
            .map_err(|e| AvatarDeckError::Transport {
                url: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AvatarDeckError::RateLimitExceeded {
                service: "speech".into(),
                retry_after_secs: None,
            });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AvatarDeckError::SpeechFailed {
                status: status.as_u16(),
                detail,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AvatarDeckError::Transport {
                url: self.endpoint.clone(),
                reason: e.to_string(),
            })?;
        debug!("Received {} bytes of {}", bytes.len(), format.extension());
        Ok(bytes.to_vec())
    }
}

/// Wrap `text` in a single-voice SSML document.
pub fn build_ssml(text: &str, voice: &str) -> String {
    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='{}'><voice name='{}'>{}</voice></speak>",
        voice_locale(voice),
        escape(voice),
        escape(text)
    )
}

/// Locale prefix of a voice name (`en-US-AvaNeural` → `en-US`).
fn voice_locale(voice: &str) -> &str {
    let mut parts = voice.splitn(3, '-');
    match (parts.next(), parts.next()) {
        (Some(lang), Some(region)) if lang.len() == 2 || lang.len() == 3 => {
            &voice[..lang.len() + 1 + region.len()]
        }
        _ => "en-US",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn ssml_escapes_text() {
        let ssml = build_ssml("Use <b> & .MP4 files", "en-US-AvaMultilingualNeural");
        assert!(ssml.contains("Use &lt;b&gt; &amp; .MP4 files"));
        assert!(ssml.contains("xml:lang='en-US'"));
        assert!(ssml.contains("<voice name='en-US-AvaMultilingualNeural'>"));
    }

    #[test]
    fn locale_from_voice() {
        assert_eq!(voice_locale("de-DE-KatjaNeural"), "de-DE");
        assert_eq!(voice_locale("Lisa"), "en-US");
    }

    #[test]
    fn format_from_path() {
        assert_eq!(AudioFormat::from_path(Path::new("a/b.MP3")), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_path(Path::new("a/b.wav")), AudioFormat::Wav);
        assert_eq!(AudioFormat::Wav.output_format(), "riff-24khz-16bit-mono-pcm");
    }
}
