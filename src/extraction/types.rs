//! Structured extraction results and their defensive parsing
//!
//! The remote service answers with loosely typed JSON. [`ExtractionResult::parse`]
//! validates the shape at the boundary; any mismatch is reported as a
//! [`Error::Gateway`] so callers can substitute [`ExtractionResult::degraded`].

use crate::error::{Error, Result};
use crate::graph::{NodeCategory, StreamType};
use serde::{Deserialize, Serialize};

/// Characters of input kept as the description of a degraded entity
pub const DEGRADED_SNIPPET_CHARS: usize = 50;

/// Label of the single entity produced by a degraded extraction
pub const DEGRADED_LABEL: &str = "Unknown";

/// One extracted entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedEntity {
    pub name: String,
    pub category: NodeCategory,
    pub stream: StreamType,
    pub description: Option<String>,
}

impl ExtractedEntity {
    pub fn new(name: impl Into<String>, category: NodeCategory, stream: StreamType) -> Self {
        Self {
            name: name.into(),
            category,
            stream,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A relation between two entities, referenced by name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedRelation {
    pub from: String,
    pub to: String,
    pub relation: String,
}

/// Psychological analysis of the input, both values on a 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Analysis {
    pub rigidity: f64,
    pub chaos: f64,
}

impl Analysis {
    pub fn new(rigidity: f64, chaos: f64) -> Self {
        Self { rigidity, chaos }
    }
}

/// Structured output of one extraction call
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExtractionResult {
    pub entities: Vec<ExtractedEntity>,
    pub relations: Vec<ExtractedRelation>,
    pub analysis: Analysis,
}

impl ExtractionResult {
    /// Substitute result used whenever the remote extraction fails.
    ///
    /// A single `Unknown` concept on the ventral stream described by the
    /// first characters of the input, no relations and a zero analysis.
    pub fn degraded(input: &str) -> Self {
        let snippet: String = input.chars().take(DEGRADED_SNIPPET_CHARS).collect();
        Self {
            entities: vec![ExtractedEntity::new(
                DEGRADED_LABEL,
                NodeCategory::Concept,
                StreamType::Ventral,
            )
            .with_description(snippet)],
            relations: Vec::new(),
            analysis: Analysis::default(),
        }
    }

    /// Parse and validate a raw JSON reply, tolerating a markdown code fence.
    pub fn parse(raw: &str) -> Result<Self> {
        let json = strip_code_fence(raw);
        let wire: WireExtraction = serde_json::from_str(json)
            .map_err(|e| Error::Gateway(format!("unparseable extraction: {}", e)))?;
        wire.validate()
    }
}

/// Remove a surrounding ```json ... ``` fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest;
        if text.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            text = &text[4..];
        }
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

// =============================================================================
// Wire shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct WireExtraction {
    entities: Option<Vec<WireEntity>>,
    #[serde(default)]
    relations: Vec<WireRelation>,
    analysis: Option<WireAnalysis>,
}

#[derive(Debug, Deserialize)]
struct WireEntity {
    name: Option<String>,
    #[serde(alias = "type")]
    category: Option<String>,
    stream: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireRelation {
    from: String,
    to: String,
    #[serde(alias = "type")]
    relation: String,
}

#[derive(Debug, Deserialize)]
struct WireAnalysis {
    rigidity: Option<f64>,
    chaos: Option<f64>,
}

impl WireExtraction {
    fn validate(self) -> Result<ExtractionResult> {
        let entities = self
            .entities
            .ok_or_else(|| shape_error("missing 'entities'"))?
            .into_iter()
            .enumerate()
            .map(|(i, e)| e.validate(i))
            .collect::<Result<Vec<_>>>()?;

        let analysis = self.analysis.ok_or_else(|| shape_error("missing 'analysis'"))?;
        let rigidity = finite(analysis.rigidity, "analysis.rigidity")?;
        let chaos = finite(analysis.chaos, "analysis.chaos")?;

        let relations = self
            .relations
            .into_iter()
            .map(|r| ExtractedRelation {
                from: r.from,
                to: r.to,
                relation: r.relation,
            })
            .collect();

        Ok(ExtractionResult {
            entities,
            relations,
            analysis: Analysis::new(rigidity, chaos),
        })
    }
}

impl WireEntity {
    fn validate(self, index: usize) -> Result<ExtractedEntity> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| shape_error(&format!("entity {} has no name", index)))?;
        let category = self
            .category
            .ok_or_else(|| shape_error(&format!("entity '{}' has no category", name)))?
            .parse::<NodeCategory>()
            .map_err(|e| shape_error(&e))?;
        let stream = self
            .stream
            .ok_or_else(|| shape_error(&format!("entity '{}' has no stream", name)))?
            .parse::<StreamType>()
            .map_err(|e| shape_error(&e))?;

        Ok(ExtractedEntity {
            name,
            category,
            stream,
            description: self.description.filter(|d| !d.is_empty()),
        })
    }
}

fn finite(value: Option<f64>, field: &str) -> Result<f64> {
    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| shape_error(&format!("missing or invalid '{}'", field)))
}

fn shape_error(detail: &str) -> Error {
    Error::Gateway(format!("extraction shape mismatch: {}", detail))
}
