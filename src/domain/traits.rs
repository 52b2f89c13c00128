// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits rather
// than concrete ML types, so the use cases never need to know
// which backend or decoding strategy sits underneath.
//
//   - GreedyDecoder implements SequenceGenerator
//   - a beam-search decoder would implement it too, and the
//     `generate` use case would work with it unchanged
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Output of one autoregressive generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    /// Generated ids, without the leading start token.
    /// Ends with the end token when generation stopped on it.
    pub tokens: Vec<u32>,

    /// Log-probability the model assigned to each chosen token
    pub log_probs: Vec<f32>,
}

impl Generation {
    /// Sum of per-token log-probabilities (log of the sequence probability)
    pub fn total_log_prob(&self) -> f32 {
        self.log_probs.iter().sum()
    }
}

// ─── SequenceGenerator ────────────────────────────────────────────────────────
/// Any component that maps a source id sequence to a target id sequence.
pub trait SequenceGenerator {
    fn generate(&self, src: &[u32]) -> Result<Generation>;
}
