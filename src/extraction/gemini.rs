//! Gemini REST client
//!
//! Implements [`SemanticService`] over the `generateContent` endpoint of the
//! generative language API. Graph extraction asks for JSON constrained by a
//! response schema; the reply is still validated by
//! [`ExtractionResult::parse`] because the schema is advisory.

use super::gateway::SemanticService;
use super::types::ExtractionResult;
use crate::config::ModelsConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const TRANSCRIBE_PROMPT: &str = "Transcribe this audio verbatim.";

/// Client for the Gemini `generateContent` API
#[derive(Clone)]
pub struct GeminiClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
    fast_model: String,
    thinking_model: String,
    thinking_budget: u32,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("fast_model", &self.fast_model)
            .field("thinking_model", &self.thinking_model)
            .finish()
    }
}

impl GeminiClient {
    /// Build a client from model configuration and a resolved API key.
    pub fn from_config(config: &ModelsConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            fast_model: config.fast_model.clone(),
            thinking_model: config.thinking_model.clone(),
            thinking_budget: config.thinking_budget,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// POST a request body and return the concatenated reply text.
    async fn generate(&self, model: &str, body: &Value) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Gateway(format!(
                "{} returned {}: {}",
                model,
                status,
                truncate(&detail, 200)
            )));
        }

        let reply: GenerateContentResponse = response.json().await?;
        let text = reply.text();
        tracing::debug!(model, chars = text.len(), "Received generateContent reply");
        Ok(text)
    }
}

#[async_trait]
impl SemanticService for GeminiClient {
    async fn extract(&self, text: &str) -> Result<ExtractionResult> {
        let raw = self.generate(&self.fast_model, &extraction_request(text)).await?;
        if raw.trim().is_empty() {
            return Err(Error::Gateway("empty extraction reply".to_string()));
        }
        ExtractionResult::parse(&raw)
    }

    async fn deep_response(&self, prompt: &str) -> Result<String> {
        let body = thinking_request(prompt, self.thinking_budget);
        self.generate(&self.thinking_model, &body).await
    }

    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String> {
        let body = media_request(audio, mime_type, TRANSCRIBE_PROMPT);
        self.generate(&self.fast_model, &body).await
    }

    async fn analyze_video(&self, video: &[u8], mime_type: &str, prompt: &str) -> Result<String> {
        let body = media_request(video, mime_type, prompt);
        self.generate(&self.thinking_model, &body).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// =============================================================================
// Request bodies
// =============================================================================

fn extraction_prompt(text: &str) -> String {
    format!(
        "Extract a knowledge graph from this text. Identify key entities (Concepts, People, Events) and their relationships.\n\
         Also analyze the psychological rigidity/chaos of the input.\n\n\
         Input Text: \"{}\"",
        text
    )
}

/// Response schema constraining the extraction reply
pub fn graph_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "entities": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": {"type": "STRING", "description": "Unique name of the concept/entity"},
                        "type": {"type": "STRING", "enum": ["CONCEPT", "PERSON", "EVENT", "PROCESS"]},
                        "description": {"type": "STRING", "description": "Brief definition based on context"},
                        "stream": {
                            "type": "STRING",
                            "enum": ["DORSAL", "VENTRAL"],
                            "description": "Dorsal=Structural/Action, Ventral=Semantic/Emotional"
                        }
                    },
                    "required": ["name", "type", "stream"]
                }
            },
            "relations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "from": {"type": "STRING", "description": "Name of the source entity"},
                        "to": {"type": "STRING", "description": "Name of the target entity"},
                        "type": {"type": "STRING", "description": "The relationship predicate (e.g. CAUSES, IS_A, FEELS)"}
                    },
                    "required": ["from", "to", "type"]
                }
            },
            "analysis": {
                "type": "OBJECT",
                "properties": {
                    "rigidity": {"type": "NUMBER"},
                    "chaos": {"type": "NUMBER"}
                }
            }
        }
    })
}

fn extraction_request(text: &str) -> Value {
    json!({
        "contents": [{"parts": [{"text": extraction_prompt(text)}]}],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": graph_schema()
        }
    })
}

fn thinking_request(prompt: &str, budget: u32) -> Value {
    json!({
        "contents": [{"parts": [{"text": prompt}]}],
        "generationConfig": {
            "thinkingConfig": {"thinkingBudget": budget}
        }
    })
}

fn media_request(data: &[u8], mime_type: &str, prompt: &str) -> Value {
    json!({
        "contents": [{
            "parts": [
                {"inlineData": {"mimeType": mime_type, "data": BASE64.encode(data)}},
                {"text": prompt}
            ]
        }]
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// =============================================================================
// Response shape
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, concatenated
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StreamType;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, Value)>>>;

    /// Serve `reply` for every generateContent call and record requests.
    async fn fake_api(status: StatusCode, reply: Value) -> (String, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let app = Router::new().route(
            "/models/:call",
            post(
                move |Path(call): Path<String>,
                      Query(query): Query<HashMap<String, String>>,
                      Json(body): Json<Value>| {
                    let recorder = recorder.clone();
                    let reply = reply.clone();
                    async move {
                        assert_eq!(query.get("key").map(String::as_str), Some("test-key"));
                        recorder.lock().unwrap().push((call, body));
                        (status, Json(reply))
                    }
                },
            ),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), seen)
    }

    fn client(base_url: &str) -> GeminiClient {
        let config = ModelsConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..Default::default()
        };
        GeminiClient::from_config(&config, "test-key").unwrap()
    }

    fn text_reply(text: &str) -> Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    #[tokio::test]
    async fn test_extract_parses_reply() {
        let payload = r#"```json
{"entities":[{"name":"Deadline","type":"EVENT","stream":"DORSAL"}],"relations":[],"analysis":{"rigidity":85,"chaos":20}}
```"#;
        let (base, seen) = fake_api(StatusCode::OK, text_reply(payload)).await;
        let result = client(&base).extract("The deadline is rigid").await.unwrap();

        assert_eq!(result.entities[0].name, "Deadline");
        assert_eq!(result.entities[0].stream, StreamType::Dorsal);
        assert_eq!(result.analysis.rigidity, 85.0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "gemini-2.5-flash:generateContent");
        let body = &seen[0].1;
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Input Text: \"The deadline is rigid\""));
    }

    #[tokio::test]
    async fn test_extract_rejects_bad_shape() {
        let (base, _) = fake_api(StatusCode::OK, text_reply(r#"{"entities": "nope"}"#)).await;
        let err = client(&base).extract("x").await.unwrap_err();
        assert!(matches!(err, Error::Gateway(_)));

        let (base, _) = fake_api(StatusCode::OK, json!({"candidates": []})).await;
        let err = client(&base).extract("x").await.unwrap_err();
        assert!(matches!(err, Error::Gateway(_)));
    }

    #[tokio::test]
    async fn test_http_error_is_gateway_error() {
        let (base, _) = fake_api(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"message": "quota"}}),
        )
        .await;
        let err = client(&base).deep_response("hi").await.unwrap_err();
        assert!(matches!(err, Error::Gateway(msg) if msg.contains("429")));
    }

    #[tokio::test]
    async fn test_deep_response_uses_thinking_budget() {
        let reply = json!({"candidates": [{"content": {"parts": [{"text": "Part one. "}, {"text": "Part two."}]}}]});
        let (base, seen) = fake_api(StatusCode::OK, reply).await;
        let text = client(&base).deep_response("reflect").await.unwrap();
        assert_eq!(text, "Part one. Part two.");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "gemini-3-pro-preview:generateContent");
        assert_eq!(seen[0].1["generationConfig"]["thinkingConfig"]["thinkingBudget"], 1024);
    }

    #[tokio::test]
    async fn test_transcribe_sends_inline_audio() {
        let (base, seen) = fake_api(StatusCode::OK, text_reply("hello there")).await;
        let text = client(&base).transcribe(b"abc", "audio/webm").await.unwrap();
        assert_eq!(text, "hello there");

        let seen = seen.lock().unwrap();
        let parts = &seen[0].1["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "audio/webm");
        assert_eq!(parts[0]["inlineData"]["data"], "YWJj");
        assert_eq!(parts[1]["text"], TRANSCRIBE_PROMPT);
    }

    #[test]
    fn test_response_text_without_candidates() {
        let reply: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(reply.text(), "");
    }
}
