//! Dual-stream score updates
//!
//! Each completed extraction nudges the dorsal score by its rigidity and
//! the ventral score by its chaos: +5 above the threshold, -2 otherwise,
//! clamped to [0, 100].

use super::state::SystemState;
use crate::extraction::Analysis;

/// Analysis values strictly above this raise a score
pub const SCORE_THRESHOLD: f64 = 50.0;
/// Step applied above the threshold
pub const SCORE_REWARD: f64 = 5.0;
/// Step applied at or below the threshold
pub const SCORE_PENALTY: f64 = -2.0;

fn step(value: f64) -> f64 {
    if value > SCORE_THRESHOLD {
        SCORE_REWARD
    } else {
        SCORE_PENALTY
    }
}

/// State after applying one analysis
pub fn apply_analysis(state: &SystemState, analysis: &Analysis) -> SystemState {
    state.with_scores(
        state.dorsal_score + step(analysis.rigidity),
        state.ventral_score + step(analysis.chaos),
    )
}
