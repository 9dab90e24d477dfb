//! Process-wide cognitive state
//!
//! `SystemState` is a plain value. Every change goes through a method that
//! takes the current value and returns the next one, and `cognitive_load`
//! is re-derived each time so it never drifts from its inputs.

use serde::{Deserialize, Serialize};

/// Lower bound of both stream scores
pub const SCORE_MIN: f64 = 0.0;
/// Upper bound of both stream scores
pub const SCORE_MAX: f64 = 100.0;
/// Initial value of both stream scores
pub const SCORE_INITIAL: f64 = 50.0;

/// Queue depth at which load is reported as high
pub const HIGH_LOAD_QUEUE: usize = 3;
/// Queue depth at which load is reported as overload
pub const OVERLOAD_QUEUE: usize = 5;
/// Both scores below this report low load
pub const LOW_LOAD_SCORE: f64 = 25.0;

/// Display-only summary of how busy and engaged the system is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CognitiveLoad {
    Low,
    Optimal,
    High,
    Overload,
}

impl CognitiveLoad {
    /// Derive the load from the processing queue and the stream scores.
    pub fn derive(processing_queue: usize, dorsal: f64, ventral: f64) -> Self {
        if processing_queue >= OVERLOAD_QUEUE {
            CognitiveLoad::Overload
        } else if processing_queue >= HIGH_LOAD_QUEUE {
            CognitiveLoad::High
        } else if dorsal < LOW_LOAD_SCORE && ventral < LOW_LOAD_SCORE {
            CognitiveLoad::Low
        } else {
            CognitiveLoad::Optimal
        }
    }
}

/// Live system state observed by the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    pub dorsal_score: f64,
    pub ventral_score: f64,
    pub cognitive_load: CognitiveLoad,
    pub is_live_active: bool,
    pub is_thinking: bool,
    /// In-flight ingestions; never negative
    pub processing_queue: usize,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            dorsal_score: SCORE_INITIAL,
            ventral_score: SCORE_INITIAL,
            cognitive_load: CognitiveLoad::Optimal,
            is_live_active: false,
            is_thinking: false,
            processing_queue: 0,
        }
    }
}

impl SystemState {
    fn derived(mut self) -> Self {
        self.cognitive_load =
            CognitiveLoad::derive(self.processing_queue, self.dorsal_score, self.ventral_score);
        self
    }

    /// State with both scores replaced, clamped to [0, 100]
    pub fn with_scores(&self, dorsal: f64, ventral: f64) -> Self {
        Self {
            dorsal_score: dorsal.clamp(SCORE_MIN, SCORE_MAX),
            ventral_score: ventral.clamp(SCORE_MIN, SCORE_MAX),
            ..self.clone()
        }
        .derived()
    }

    /// State with one more in-flight ingestion
    pub fn enqueued(&self) -> Self {
        Self {
            processing_queue: self.processing_queue + 1,
            ..self.clone()
        }
        .derived()
    }

    /// State with one fewer in-flight ingestion, saturating at zero
    pub fn dequeued(&self) -> Self {
        if self.processing_queue == 0 {
            tracing::warn!("Processing queue decremented below zero");
        }
        Self {
            processing_queue: self.processing_queue.saturating_sub(1),
            ..self.clone()
        }
        .derived()
    }

    pub fn with_thinking(&self, is_thinking: bool) -> Self {
        Self {
            is_thinking,
            ..self.clone()
        }
    }

    pub fn with_live_active(&self, is_live_active: bool) -> Self {
        Self {
            is_live_active,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SystemState::default();
        assert_eq!(state.dorsal_score, 50.0);
        assert_eq!(state.ventral_score, 50.0);
        assert_eq!(state.cognitive_load, CognitiveLoad::Optimal);
        assert!(!state.is_live_active);
        assert!(!state.is_thinking);
        assert_eq!(state.processing_queue, 0);
    }

    #[test]
    fn test_queue_never_negative() {
        let state = SystemState::default().dequeued();
        assert_eq!(state.processing_queue, 0);
        let state = state.enqueued().enqueued().dequeued();
        assert_eq!(state.processing_queue, 1);
    }

    #[test]
    fn test_load_follows_queue() {
        let mut state = SystemState::default();
        for _ in 0..3 {
            state = state.enqueued();
        }
        assert_eq!(state.cognitive_load, CognitiveLoad::High);
        state = state.enqueued().enqueued();
        assert_eq!(state.cognitive_load, CognitiveLoad::Overload);
        for _ in 0..5 {
            state = state.dequeued();
        }
        assert_eq!(state.cognitive_load, CognitiveLoad::Optimal);
    }

    #[test]
    fn test_low_load_needs_both_scores_low() {
        assert_eq!(CognitiveLoad::derive(0, 10.0, 10.0), CognitiveLoad::Low);
        assert_eq!(CognitiveLoad::derive(0, 10.0, 30.0), CognitiveLoad::Optimal);
        assert_eq!(CognitiveLoad::derive(4, 10.0, 10.0), CognitiveLoad::High);
    }

    #[test]
    fn test_with_scores_clamps() {
        let state = SystemState::default().with_scores(140.0, -3.0);
        assert_eq!(state.dorsal_score, 100.0);
        assert_eq!(state.ventral_score, 0.0);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(SystemState::default()).unwrap();
        assert_eq!(json["cognitiveLoad"], "OPTIMAL");
        assert_eq!(json["dorsalScore"], 50.0);
        assert_eq!(json["isLiveActive"], false);
        assert_eq!(json["processingQueue"], 0);
    }
}
