// ============================================================
// Layer 5: Token Embedding
// ============================================================
// Looks up each token id in a learned [vocab_size, d_model]
// table and multiplies the result by √d_model.
//
// The scaling keeps the token signal from being swamped by the
// positional encoding that gets added next: Xavier-initialised
// rows have a small magnitude, the sinusoids are in [-1, 1].
//
// Ids are validated before the lookup: anything outside
// [0, vocab_size) is reported as TokenOutOfRange instead of
// being read from arbitrary memory by the backend.
//
// Reference: Vaswani et al. (2017) §3.4

use burn::{nn::Embedding, prelude::*};

use crate::domain::{ModelError, Result};
use crate::ml::init;

#[derive(Config, Debug)]
pub struct TokenEmbeddingConfig {
    pub vocab_size: usize,
    pub d_model:    usize,
}

impl TokenEmbeddingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TokenEmbedding<B> {
        TokenEmbedding {
            embedding:  init::embedding(self.vocab_size, self.d_model, device),
            vocab_size: self.vocab_size,
            d_model:    self.d_model,
        }
    }
}

#[derive(Module, Debug)]
pub struct TokenEmbedding<B: Backend> {
    pub(crate) embedding: Embedding<B>,
    vocab_size:           usize,
    d_model:              usize,
}

impl<B: Backend> TokenEmbedding<B> {
    /// tokens: [batch, seq_len] → [batch, seq_len, d_model]
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Result<Tensor<B, 3>> {
        let [batch, seq_len] = tokens.dims();
        if batch == 0 || seq_len == 0 {
            return Err(ModelError::EmptySequence("token embedding"));
        }

        let lowest  = tokens.clone().min().into_scalar().elem::<i64>();
        let highest = tokens.clone().max().into_scalar().elem::<i64>();
        if lowest < 0 {
            return Err(ModelError::TokenOutOfRange { id: lowest, vocab_size: self.vocab_size });
        }
        if highest >= self.vocab_size as i64 {
            return Err(ModelError::TokenOutOfRange { id: highest, vocab_size: self.vocab_size });
        }

        Ok(self.embedding.forward(tokens) * (self.d_model as f64).sqrt())
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn d_model(&self) -> usize {
        self.d_model
    }
}
