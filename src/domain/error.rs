// ============================================================
// Layer 3: Model Errors
// ============================================================
// Every failure the model core can report. All of them are
// caller contract violations: nothing here is retried or
// recovered internally, the error simply propagates back up
// through `?` to whoever called encode/decode/project.
//
// Four families:
//   - configuration errors   → rejected at construction time
//   - shape errors           → trailing dims disagree with d_model etc.
//   - token id errors        → id outside [0, vocab_size)
//   - sequence length errors → longer than the positional table
//
// The application layer wraps these in anyhow::Error with
// extra context; library callers can match on the variants.
//
// Reference: Rust Book §9 (Error Handling)
//            thiserror crate documentation

use thiserror::Error;

/// Errors raised by construction and forward passes of the model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("d_model ({d_model}) is not divisible by the number of heads ({n_heads})")]
    HeadsNotDivisible { d_model: usize, n_heads: usize },

    #[error("shape mismatch in {op}: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        op:       &'static str,
        expected: String,
        actual:   Vec<usize>,
    },

    #[error("token id {id} is out of range for a vocabulary of {vocab_size}")]
    TokenOutOfRange { id: i64, vocab_size: usize },

    #[error("sequence length {len} exceeds the maximum of {max}")]
    SequenceTooLong { len: usize, max: usize },

    #[error("{0} received an empty sequence")]
    EmptySequence(&'static str),

    #[error("mask of shape {mask:?} cannot be broadcast to attention scores {scores:?}")]
    MaskShape { mask: Vec<usize>, scores: Vec<usize> },

    #[error("could not read tensor data: {0}")]
    TensorData(String),
}

impl ModelError {
    /// Shorthand used by the shape checks in the ML layer.
    pub fn shape(op: &'static str, expected: impl Into<String>, actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            op,
            expected: expected.into(),
            actual:   actual.to_vec(),
        }
    }
}

/// Defaults to `ModelError`; the second parameter keeps the two-argument
/// form available to derive macros expanded inside modules that import it.
pub type Result<T, E = ModelError> = std::result::Result<T, E>;
