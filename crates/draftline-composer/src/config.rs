//! Composer configuration

use crate::error::{ComposerError, ComposerResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Composer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Name given to a freshly created draft
    pub draft_placeholder_name: String,
    /// Blob bucket for attachments
    pub attachment_bucket: String,
    /// Largest accepted attachment in bytes
    pub max_attachment_bytes: u64,
    /// Accepted attachment MIME types
    pub allowed_mime_types: Vec<String>,
    /// Check size and MIME type before any transfer
    pub validate_uploads: bool,
}

impl ComposerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML; missing fields take defaults
    pub fn from_toml_str(raw: &str) -> ComposerResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| ComposerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> ComposerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ComposerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Check internal consistency
    pub fn validate(&self) -> ComposerResult<()> {
        if self.attachment_bucket.trim().is_empty() {
            return Err(ComposerError::Config("attachment_bucket must not be empty".into()));
        }
        if self.draft_placeholder_name.trim().is_empty() {
            return Err(ComposerError::Config("draft_placeholder_name must not be empty".into()));
        }
        if self.max_attachment_bytes == 0 {
            return Err(ComposerError::Config("max_attachment_bytes must be positive".into()));
        }
        Ok(())
    }

    /// Whether `mime_type` is accepted
    #[must_use]
    pub fn accepts_mime(&self, mime_type: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime_type))
    }

    /// With placeholder draft name
    #[inline]
    #[must_use]
    pub fn with_placeholder_name(mut self, name: impl Into<String>) -> Self {
        self.draft_placeholder_name = name.into();
        self
    }

    /// With attachment bucket
    #[inline]
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.attachment_bucket = bucket.into();
        self
    }

    /// With attachment size limit
    #[inline]
    #[must_use]
    pub fn with_max_attachment_bytes(mut self, max: u64) -> Self {
        self.max_attachment_bytes = max;
        self
    }

    /// With upload validation on or off
    #[inline]
    #[must_use]
    pub fn with_upload_validation(mut self, enabled: bool) -> Self {
        self.validate_uploads = enabled;
        self
    }
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            draft_placeholder_name: "Strategy draft".to_string(),
            attachment_bucket: "strategy-attachments".to_string(),
            max_attachment_bytes: 50 * 1024 * 1024,
            allowed_mime_types: [
                "application/pdf",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                "image/png",
                "image/jpeg",
                "image/jpg",
                "video/mp4",
                "audio/mpeg",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            validate_uploads: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = ComposerConfig::default();
        assert_eq!(config.attachment_bucket, "strategy-attachments");
        assert_eq!(config.max_attachment_bytes, 52_428_800);
        assert!(config.accepts_mime("application/PDF"));
        assert!(!config.accepts_mime("application/x-msdownload"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ComposerConfig::from_toml_str(
            r#"
            attachment_bucket = "plans"
            max_attachment_bytes = 1024
            "#,
        )
        .unwrap();
        assert_eq!(config.attachment_bucket, "plans");
        assert_eq!(config.max_attachment_bytes, 1024);
        assert_eq!(config.draft_placeholder_name, "Strategy draft");
        assert!(config.validate_uploads);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = ComposerConfig::from_toml_str("max_attachment_bytes = \"lots\"").unwrap_err();
        assert!(matches!(err, ComposerError::Config(_)));

        let err = ComposerConfig::from_toml_str("attachment_bucket = \"  \"").unwrap_err();
        assert!(matches!(err, ComposerError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draftline.toml");
        std::fs::write(&path, "draft_placeholder_name = \"Untitled\"\n").unwrap();

        let config = ComposerConfig::load(&path).unwrap();
        assert_eq!(config.draft_placeholder_name, "Untitled");

        assert!(ComposerConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
