//! Module manifests: the YAML file describing one training module.
//!
//! ```yaml
//! uid: learn.azure.storage-intro
//! title: Introduction to Azure Storage
//! content: |
//!   [!include[](includes/1-introduction.md)]
//! ```
//!
//! The `content` value is an include directive; the path in parentheses is
//! resolved relative to the manifest's directory.

use crate::error::AvatarDeckError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

static INCLUDE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]*)\)").unwrap());

/// A parsed module manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleManifest {
    pub title: String,
    pub uid: String,
    /// Markdown body, resolved against the manifest directory.
    pub content_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    title: Option<String>,
    uid: Option<String>,
    content: Option<String>,
}

impl ModuleManifest {
    /// Read and validate the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, AvatarDeckError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AvatarDeckError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => AvatarDeckError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => invalid(path, e),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&text, base).map_err(|detail| invalid(path, detail))
    }

    /// Parse manifest text, resolving the include against `base_dir`.
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, String> {
        let raw: RawManifest = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
        let title = raw.title.ok_or("missing 'title'")?;
        let uid = raw.uid.ok_or("missing 'uid'")?;
        let content = raw.content.ok_or("missing 'content'")?;
        let include = INCLUDE_PATH
            .captures(&content)
            .map(|c| c[1].trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| format!("'content' has no include path: {}", content.trim()))?;

        let content_path = base_dir.join(include);
        debug!("Manifest '{}' includes {}", uid, content_path.display());
        Ok(Self {
            title,
            uid,
            content_path,
        })
    }

    /// Read the included markdown.
    pub fn read_content(&self) -> Result<String, AvatarDeckError> {
        std::fs::read_to_string(&self.content_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AvatarDeckError::FileNotFound {
                path: self.content_path.clone(),
            },
            _ => invalid(&self.content_path, e),
        })
    }
}

fn invalid(path: &Path, detail: impl ToString) -> AvatarDeckError {
    AvatarDeckError::InvalidManifest {
        path: path.to_path_buf(),
        detail: detail.to_string(),
    }
}
