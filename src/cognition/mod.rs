//! Cognitive state and dual-stream scoring

mod scorer;
mod state;

pub use scorer::{apply_analysis, SCORE_PENALTY, SCORE_REWARD, SCORE_THRESHOLD};
pub use state::{CognitiveLoad, SystemState, SCORE_INITIAL, SCORE_MAX, SCORE_MIN};
