//! Scripted semantic service for tests

use super::gateway::SemanticService;
use super::types::ExtractionResult;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Deterministic [`SemanticService`] with optional delays and failures.
///
/// Queued extractions are consumed first, then the default applies. A
/// `None` outcome fails the call.
pub struct MockService {
    default_extraction: Option<ExtractionResult>,
    queued: Mutex<VecDeque<Option<ExtractionResult>>>,
    extract_delay: Duration,
    deep: Option<String>,
    deep_delay: Duration,
    transcript: Option<String>,
    video: Option<String>,
    extract_calls: AtomicUsize,
    deep_calls: AtomicUsize,
    last_video_prompt: Mutex<Option<String>>,
}

impl MockService {
    /// Every extraction returns `result`
    pub fn returning(result: ExtractionResult) -> Self {
        Self::with_default(Some(result))
    }

    /// Every call fails
    pub fn failing() -> Self {
        Self::with_default(None)
    }

    fn with_default(default_extraction: Option<ExtractionResult>) -> Self {
        Self {
            default_extraction,
            queued: Mutex::new(VecDeque::new()),
            extract_delay: Duration::ZERO,
            deep: None,
            deep_delay: Duration::ZERO,
            transcript: None,
            video: None,
            extract_calls: AtomicUsize::new(0),
            deep_calls: AtomicUsize::new(0),
            last_video_prompt: Mutex::new(None),
        }
    }

    /// Queue a one-off extraction outcome ahead of the default
    pub fn then(self, outcome: Option<ExtractionResult>) -> Self {
        self.queued.lock().unwrap().push_back(outcome);
        self
    }

    pub fn with_extract_delay(mut self, delay: Duration) -> Self {
        self.extract_delay = delay;
        self
    }

    pub fn with_deep_response(mut self, text: impl Into<String>) -> Self {
        self.deep = Some(text.into());
        self
    }

    pub fn with_deep_delay(mut self, delay: Duration) -> Self {
        self.deep_delay = delay;
        self
    }

    pub fn with_transcript(mut self, text: impl Into<String>) -> Self {
        self.transcript = Some(text.into());
        self
    }

    pub fn with_video_analysis(mut self, text: impl Into<String>) -> Self {
        self.video = Some(text.into());
        self
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn deep_calls(&self) -> usize {
        self.deep_calls.load(Ordering::SeqCst)
    }

    pub fn last_video_prompt(&self) -> Option<String> {
        self.last_video_prompt.lock().unwrap().clone()
    }
}

fn scripted_failure(call: &str) -> Error {
    Error::Gateway(format!("scripted {} failure", call))
}

#[async_trait]
impl SemanticService for MockService {
    async fn extract(&self, _text: &str) -> Result<ExtractionResult> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        if !self.extract_delay.is_zero() {
            tokio::time::sleep(self.extract_delay).await;
        }
        let queued = self.queued.lock().unwrap().pop_front();
        queued
            .unwrap_or_else(|| self.default_extraction.clone())
            .ok_or_else(|| scripted_failure("extract"))
    }

    async fn deep_response(&self, _prompt: &str) -> Result<String> {
        self.deep_calls.fetch_add(1, Ordering::SeqCst);
        if !self.deep_delay.is_zero() {
            tokio::time::sleep(self.deep_delay).await;
        }
        self.deep.clone().ok_or_else(|| scripted_failure("deep response"))
    }

    async fn transcribe(&self, _audio: &[u8], _mime_type: &str) -> Result<String> {
        self.transcript.clone().ok_or_else(|| scripted_failure("transcribe"))
    }

    async fn analyze_video(&self, _video: &[u8], _mime_type: &str, prompt: &str) -> Result<String> {
        *self.last_video_prompt.lock().unwrap() = Some(prompt.to_string());
        self.video.clone().ok_or_else(|| scripted_failure("video"))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
