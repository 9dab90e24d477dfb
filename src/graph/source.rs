//! Source artifact data types
//!
//! A SourceArtifact is the immutable record of one raw input: typed text,
//! a transcribed audio clip, an analyzed video, or an uploaded file. Every
//! knowledge node keeps the ids of the artifacts that mentioned it, so the
//! artifact log is the system of record for traceability.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// An immutable raw input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceArtifact {
    /// Unique, time-ordered identifier (UUIDv7)
    pub id: Uuid,
    /// Kind of raw input
    pub kind: SourceKind,
    /// Mime type of the original payload
    pub mime_type: String,
    /// Raw text or transcript
    pub content: String,
    /// Optional short summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Arbitrary metadata (filename, duration, author, ...)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Kind of raw input an artifact was created from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Typed or streamed text
    Text,
    /// Transcribed audio
    Audio,
    /// Analyzed video
    Video,
    /// Uploaded file
    File,
}

impl SourceKind {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Text => "text",
            SourceKind::Audio => "audio",
            SourceKind::Video => "video",
            SourceKind::File => "file",
        }
    }

    /// Required top-level mime type, if the kind constrains it
    fn required_mime_type(&self) -> Option<&'static str> {
        match self {
            SourceKind::Text => Some("text"),
            SourceKind::Audio => Some("audio"),
            SourceKind::Video => Some("video"),
            SourceKind::File => None,
        }
    }

    /// Check that `mime_type` is well formed and consistent with this kind.
    pub fn validate_mime_type(&self, mime_type: &str) -> Result<()> {
        let essence = mime_type.split(';').next().unwrap_or("").trim();
        let (top, sub) = essence
            .split_once('/')
            .ok_or_else(|| Error::Validation(format!("malformed mime type '{}'", mime_type)))?;

        let well_formed = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
        };
        if !well_formed(top) || !well_formed(sub) {
            return Err(Error::Validation(format!(
                "malformed mime type '{}'",
                mime_type
            )));
        }

        if let Some(required) = self.required_mime_type() {
            if !top.eq_ignore_ascii_case(required) {
                return Err(Error::Validation(format!(
                    "mime type '{}' does not match source kind '{}'",
                    mime_type, self
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(SourceKind::Text),
            "audio" => Ok(SourceKind::Audio),
            "video" => Ok(SourceKind::Video),
            "file" => Ok(SourceKind::File),
            other => Err(Error::Validation(format!("unknown source kind '{}'", other))),
        }
    }
}

/// Builder for constructing `SourceArtifact` instances
pub struct SourceArtifactBuilder {
    kind: SourceKind,
    mime_type: Option<String>,
    content: String,
    summary: Option<String>,
    metadata: HashMap<String, serde_json::Value>,
}

impl SourceArtifactBuilder {
    /// Create a new builder with the required kind
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            mime_type: None,
            content: String::new(),
            summary: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the mime type (defaults to `text/plain` for text artifacts)
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the raw text or transcript
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set a short summary
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Add a metadata entry
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Validate and build the artifact, assigning a fresh id and timestamp.
    pub fn build(self) -> Result<SourceArtifact> {
        let mime_type = match (self.mime_type, self.kind) {
            (Some(m), _) => m,
            (None, SourceKind::Text) => "text/plain".to_string(),
            (None, kind) => {
                return Err(Error::Validation(format!(
                    "mime type is required for {} artifacts",
                    kind
                )))
            }
        };
        self.kind.validate_mime_type(&mime_type)?;

        Ok(SourceArtifact {
            id: Uuid::now_v7(),
            kind: self.kind,
            mime_type,
            content: self.content,
            summary: self.summary,
            timestamp: Utc::now(),
            metadata: self.metadata,
        })
    }
}
