// ============================================================
// Layer 3: TokenPair Domain Type
// ============================================================
// A translation example after tokenisation: the source ids
// fed to the encoder and the target ids fed to the decoder.
//
// Tokenisation itself happens outside this crate, so by the
// time a TokenPair exists the text is already gone and only
// vocabulary indices remain.
//
// Example (pad=0, bos=1, eos=2):
//   src: [1, 57, 902, 14, 2]    ← "<s> hello world . </s>"
//   tgt: [1, 311, 76, 9]        ← decoder input, starts with <s>
//
// Reference: Vaswani et al. (2017) §3, §5.1

use serde::{Deserialize, Serialize};

/// One source/target pair of token id sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Encoder input ids, unpadded
    pub src: Vec<u32>,

    /// Decoder input ids, unpadded
    pub tgt: Vec<u32>,
}

impl TokenPair {
    pub fn new(src: impl Into<Vec<u32>>, tgt: impl Into<Vec<u32>>) -> Self {
        Self {
            src: src.into(),
            tgt: tgt.into(),
        }
    }
}

/// Reserved ids shared by the batcher and the greedy decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokens {
    /// Padding id; padded key positions are masked out of attention
    pub pad: u32,

    /// Start-of-sequence id; the first decoder input during generation
    pub bos: u32,

    /// End-of-sequence id; generation stops once it is produced
    pub eos: u32,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self { pad: 0, bos: 1, eos: 2 }
    }
}
