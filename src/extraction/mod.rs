//! Extraction gateway
//!
//! Boundary to the remote semantic service: typed extraction results, the
//! service trait, the failure-absorbing gateway and the Gemini client.

mod gateway;
mod gemini;
#[cfg(test)]
pub(crate) mod mock;
mod types;

pub use gateway::{
    ExtractionGateway, SemanticService, UnavailableService, DEEP_RESPONSE_EMPTY,
    DEEP_RESPONSE_FAILURE, VIDEO_ANALYSIS_PROMPT,
};
pub use gemini::{graph_schema, GeminiClient};
pub use types::{
    strip_code_fence, Analysis, ExtractedEntity, ExtractedRelation, ExtractionResult,
    DEGRADED_LABEL, DEGRADED_SNIPPET_CHARS,
};
