// ============================================================
// Layer 5: Output Projection
// ============================================================
// Last step of the model, after the decoder's final norm:
//
//   x          [batch, seq_len, d_model]
//   linear     [batch, seq_len, vocab_size]   ← logits
//   log_softmax over the vocabulary axis
//
// Output is log-probabilities, so per-step scores add up.
//
// Reference: Vaswani et al. (2017) §3.4

use burn::{nn::Linear, prelude::*, tensor::activation::log_softmax};

use crate::domain::{ModelError, Result};
use crate::ml::init;

/// Settings for [`ProjectionLayer`].
#[derive(Config, Debug)]
pub struct ProjectionLayerConfig {
    pub d_model:    usize,
    /// Size of the target vocabulary
    pub vocab_size: usize,
}

impl ProjectionLayerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ProjectionLayer<B> {
        ProjectionLayer {
            proj:    init::linear(self.d_model, self.vocab_size, device),
            d_model: self.d_model,
        }
    }
}

/// Decoder output → log-probabilities over the target vocabulary.
#[derive(Module, Debug)]
pub struct ProjectionLayer<B: Backend> {
    pub(crate) proj: Linear<B>,
    d_model:         usize,
}

impl<B: Backend> ProjectionLayer<B> {
    /// [batch, seq_len, d_model] → [batch, seq_len, vocab_size]
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        if x.dims()[2] != self.d_model {
            return Err(ModelError::shape(
                "projection layer",
                format!("last dim {}", self.d_model),
                &x.dims(),
            ));
        }

        // log_softmax subtracts the row max before exponentiating
        Ok(log_softmax(self.proj.forward(x), 2))
    }
}
