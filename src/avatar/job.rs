//! Wire types for the batch avatar synthesis API.

use crate::config::{AvatarSettings, VideoCrop};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of the `PUT …/avatar/batchsyntheses/{id}` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSynthesisRequest {
    pub synthesis_config: SynthesisConfig,
    pub custom_voices: BTreeMap<String, String>,
    pub input_kind: String,
    pub inputs: Vec<SynthesisInput>,
    pub avatar_config: AvatarConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisConfig {
    pub voice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisInput {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarConfig {
    pub customized: bool,
    pub talking_avatar_character: String,
    pub talking_avatar_style: String,
    pub video_format: String,
    pub video_codec: String,
    pub subtitle_type: String,
    pub background_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_crop: Option<CropRegion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropRegion {
    pub top_left: Point,
    pub bottom_right: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl From<VideoCrop> for CropRegion {
    fn from(c: VideoCrop) -> Self {
        Self {
            top_left: Point { x: c.left, y: c.top },
            bottom_right: Point {
                x: c.right,
                y: c.bottom,
            },
        }
    }
}

impl BatchSynthesisRequest {
    /// A plain-text job rendering `text` with the given settings.
    pub fn plain_text(text: &str, settings: &AvatarSettings) -> Self {
        Self {
            synthesis_config: SynthesisConfig {
                voice: settings.voice.clone(),
            },
            custom_voices: BTreeMap::new(),
            input_kind: "plainText".to_string(),
            inputs: vec![SynthesisInput {
                content: text.to_string(),
            }],
            avatar_config: AvatarConfig {
                customized: settings.customized,
                talking_avatar_character: settings.character.clone(),
                talking_avatar_style: settings.style.clone(),
                video_format: settings.video_format.clone(),
                video_codec: settings.video_codec.clone(),
                subtitle_type: "external_file".to_string(),
                background_color: settings.background_color.clone(),
                video_crop: settings.crop.map(CropRegion::from),
            },
        }
    }
}

/// Lifecycle state reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::NotStarted => "NotStarted",
            JobStatus::Running => "Running",
            JobStatus::Succeeded => "Succeeded",
            JobStatus::Failed => "Failed",
            JobStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// A batch synthesis job as returned by create and get.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SynthesisJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub outputs: Option<JobOutputs>,
    #[serde(default)]
    pub properties: Option<JobProperties>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobOutputs {
    /// Pre-signed URL of the rendered video.
    pub result: Option<String>,
    /// Pre-signed URL of the subtitle file.
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobProperties {
    pub error: Option<JobErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobErrorDetail {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl SynthesisJob {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            outputs: None,
            properties: None,
        }
    }

    pub fn with_outputs(mut self, result: impl Into<String>, subtitle: Option<String>) -> Self {
        self.outputs = Some(JobOutputs {
            result: Some(result.into()),
            subtitle,
        });
        self
    }

    pub fn result_url(&self) -> Option<&str> {
        self.outputs.as_ref().and_then(|o| o.result.as_deref())
    }

    pub fn subtitle_url(&self) -> Option<&str> {
        self.outputs.as_ref().and_then(|o| o.subtitle.as_deref())
    }

    /// Human-readable failure reason, when the service gave one.
    pub fn failure_reason(&self) -> String {
        self.properties
            .as_ref()
            .and_then(|p| p.error.as_ref())
            .map(|e| match (&e.code, &e.message) {
                (Some(code), Some(msg)) => format!("{code}: {msg}"),
                (None, Some(msg)) => msg.clone(),
                (Some(code), None) => code.clone(),
                (None, None) => "no error detail".to_string(),
            })
            .unwrap_or_else(|| "no error detail".to_string())
    }
}

/// Handle returned by submission; everything needed to poll the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
}

/// Bytes fetched for a succeeded job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisArtifacts {
    pub video: Vec<u8>,
    pub subtitles: Option<Vec<u8>>,
}
