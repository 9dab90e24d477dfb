//! Live voice wire messages
//!
//! Client messages are built as JSON text frames. Server messages are
//! parsed leniently: unknown fields are ignored and only the pieces that
//! become `(text, is_from_user)` utterances are kept.

use super::frame::{pcm_mime_type, AudioFrame};
use crate::error::Result;
use serde::Deserialize;
use serde_json::json;

/// Text surfaced for every server message carrying model audio
pub const VOICE_RESPONSE_PLACEHOLDER: &str = "(Voice Response Received)";

/// One discrete piece of conversation derived from server messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub is_from_user: bool,
}

impl Utterance {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_from_user: true,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_from_user: false,
        }
    }
}

/// Session setup sent right after the socket opens
pub fn setup_message(model: &str, voice_name: &str) -> String {
    let model = if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    };
    json!({
        "setup": {
            "model": model,
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {"prebuiltVoiceConfig": {"voiceName": voice_name}}
                }
            }
        }
    })
    .to_string()
}

/// Realtime input carrying one audio frame
pub fn realtime_input(frame: &AudioFrame, sample_rate: u32) -> String {
    json!({
        "realtimeInput": {
            "mediaChunks": [{
                "mimeType": pcm_mime_type(sample_rate),
                "data": frame.to_base64()
            }]
        }
    })
    .to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
    #[serde(default)]
    pub turn_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct Transcription {
    pub text: Option<String>,
}

impl ServerMessage {
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    fn content(&self) -> Option<&ServerContent> {
        self.server_content.as_ref()
    }

    /// Whether this message ends a model turn
    pub fn turn_complete(&self) -> bool {
        self.content().is_some_and(|c| c.turn_complete)
    }

    /// Whether the model turn carries inline audio
    pub fn has_audio(&self) -> bool {
        self.content()
            .and_then(|c| c.model_turn.as_ref())
            .is_some_and(|turn| {
                turn.parts
                    .iter()
                    .any(|p| p.inline_data.as_ref().is_some_and(|d| !d.data.is_empty()))
            })
    }

    /// Utterances carried by this message, in arrival order.
    ///
    /// Every message is interpreted on its own: an input transcription is a
    /// user utterance, model text parts and the output transcription form
    /// one model utterance, and inline audio is announced with
    /// [`VOICE_RESPONSE_PLACEHOLDER`] each time it arrives.
    pub fn utterances(&self) -> Vec<Utterance> {
        let mut utterances = Vec::new();
        let Some(content) = self.content() else {
            return utterances;
        };

        if let Some(text) = non_blank(
            content
                .input_transcription
                .as_ref()
                .and_then(|t| t.text.as_deref()),
        ) {
            utterances.push(Utterance::user(text));
        }

        let mut model_text: Vec<&str> = content
            .model_turn
            .iter()
            .flat_map(|turn| turn.parts.iter())
            .filter_map(|p| non_blank(p.text.as_deref()))
            .collect();
        model_text.extend(non_blank(
            content
                .output_transcription
                .as_ref()
                .and_then(|t| t.text.as_deref()),
        ));
        if !model_text.is_empty() {
            utterances.push(Utterance::model(model_text.join(" ")));
        }

        if self.has_audio() {
            utterances.push(Utterance::model(VOICE_RESPONSE_PLACEHOLDER));
        }
        utterances
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
