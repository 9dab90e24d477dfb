//! Semantic service boundary
//!
//! `SemanticService` is the raw contract of the remote collaborator: every
//! call may fail. `ExtractionGateway` wraps a service and turns it into the
//! total interface the pipeline relies on. Failures are logged and replaced
//! by fixed fallbacks; nothing above the gateway ever sees them.
//!
//! ```text
//! pipeline ─▶ ExtractionGateway ─▶ dyn SemanticService ─▶ remote API
//!                  │                      │
//!                  ◀── fallback ◀── Err(Error::Gateway)
//! ```

use super::types::ExtractionResult;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Deep response text used when the remote call fails
pub const DEEP_RESPONSE_FAILURE: &str = "Error in cognitive processing.";

/// Deep response text used when the remote call returns nothing
pub const DEEP_RESPONSE_EMPTY: &str = "Processing...";

/// Instruction sent along with video payloads
pub const VIDEO_ANALYSIS_PROMPT: &str = "Extract key concepts and emotional tone.";

/// Remote semantic-extraction, reasoning and media-understanding service.
#[async_trait]
pub trait SemanticService: Send + Sync {
    /// Extract entities, relations and a rigidity/chaos analysis from text.
    async fn extract(&self, text: &str) -> Result<ExtractionResult>;

    /// Free-form deep reasoning over a prompt.
    async fn deep_response(&self, prompt: &str) -> Result<String>;

    /// Transcribe an audio payload verbatim.
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String>;

    /// Describe a video payload following `prompt`.
    async fn analyze_video(&self, video: &[u8], mime_type: &str, prompt: &str) -> Result<String>;

    /// Human-readable name for logs
    fn name(&self) -> &str;
}

/// Service used when no credentials are configured; every call fails.
pub struct UnavailableService {
    reason: String,
}

impl UnavailableService {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> Result<T> {
        Err(Error::Gateway(self.reason.clone()))
    }
}

#[async_trait]
impl SemanticService for UnavailableService {
    async fn extract(&self, _text: &str) -> Result<ExtractionResult> {
        self.fail()
    }

    async fn deep_response(&self, _prompt: &str) -> Result<String> {
        self.fail()
    }

    async fn transcribe(&self, _audio: &[u8], _mime_type: &str) -> Result<String> {
        self.fail()
    }

    async fn analyze_video(&self, _video: &[u8], _mime_type: &str, _prompt: &str) -> Result<String> {
        self.fail()
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Failure-absorbing front of a [`SemanticService`]
#[derive(Clone)]
pub struct ExtractionGateway {
    service: Arc<dyn SemanticService>,
}

impl ExtractionGateway {
    pub fn new(service: Arc<dyn SemanticService>) -> Self {
        Self { service }
    }

    /// Name of the wrapped service
    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// Always returns an extraction; failures yield [`ExtractionResult::degraded`].
    pub async fn extract(&self, text: &str) -> ExtractionResult {
        match self.service.extract(text).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(service = self.service.name(), error = %e, "Graph extraction failed, using degraded result");
                ExtractionResult::degraded(text)
            }
        }
    }

    /// Always returns text; failures and empty replies map to fixed strings.
    pub async fn deep_response(&self, prompt: &str) -> String {
        match self.service.deep_response(prompt).await {
            Ok(text) if text.trim().is_empty() => DEEP_RESPONSE_EMPTY.to_string(),
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(service = self.service.name(), error = %e, "Deep response failed");
                DEEP_RESPONSE_FAILURE.to_string()
            }
        }
    }

    /// Transcript, or an empty string on failure.
    pub async fn transcribe(&self, audio: &[u8], mime_type: &str) -> String {
        self.service
            .transcribe(audio, mime_type)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(service = self.service.name(), mime_type, error = %e, "Transcription failed");
                String::new()
            })
    }

    /// Video description, or an empty string on failure.
    pub async fn analyze_video(&self, video: &[u8], mime_type: &str) -> String {
        self.service
            .analyze_video(video, mime_type, VIDEO_ANALYSIS_PROMPT)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(service = self.service.name(), mime_type, error = %e, "Video analysis failed");
                String::new()
            })
    }
}
