// ============================================================
// Layer 5: Residual Connection
// ============================================================
// Wraps one sublayer with pre-normalisation and a skip path:
//
//   out = x + dropout(sublayer(norm(x)))
//
// The skip path keeps an additive route around every sublayer,
// which is what lets 6+ blocks be stacked and still train.
//
// The sublayer is passed as a `Sublayer` value naming which
// computation to run and carrying the inputs it needs beyond
// the normalised stream (masks, encoder output). Attention
// sublayers also return their per-head weights, which callers
// may keep for inspection or drop.
//
// Reference: He et al. (2016) Deep Residual Learning
//            Xiong et al. (2020) On Layer Normalization in the
//            Transformer Architecture (pre-LN)

use burn::prelude::*;

use crate::domain::{Mode, Result};
use crate::ml::{
    attention::MultiHeadAttentionBlock,
    dropout::Dropout,
    feed_forward::FeedForwardBlock,
    mask::AttentionMask,
    norm::{LayerNormalization, LayerNormalizationConfig},
};

/// The computation a [`ResidualConnection`] wraps.
pub enum Sublayer<'a, B: Backend> {
    /// q = k = v = the normalised stream
    SelfAttention {
        block: &'a MultiHeadAttentionBlock<B>,
        mask:  Option<&'a AttentionMask<B>>,
    },
    /// q = the normalised stream, k = v = `memory` (encoder output)
    CrossAttention {
        block:  &'a MultiHeadAttentionBlock<B>,
        memory: &'a Tensor<B, 3>,
        mask:   Option<&'a AttentionMask<B>>,
    },
    FeedForward(&'a FeedForwardBlock<B>),
}

impl<B: Backend> Sublayer<'_, B> {
    /// Sublayer output, plus the attention weights for the attention variants.
    fn apply(self, x: Tensor<B, 3>, mode: Mode) -> Result<(Tensor<B, 3>, Option<Tensor<B, 4>>)> {
        let attended = match self {
            Sublayer::SelfAttention { block, mask } => block.forward(x.clone(), x.clone(), x, mask, mode)?,
            Sublayer::CrossAttention { block, memory, mask } => {
                block.forward(x, memory.clone(), memory.clone(), mask, mode)?
            }
            Sublayer::FeedForward(block) => return Ok((block.forward(x, mode)?, None)),
        };
        Ok((attended.context, Some(attended.weights)))
    }
}

#[derive(Module, Debug)]
pub struct ResidualConnection<B: Backend> {
    norm:    LayerNormalization<B>,
    dropout: Dropout,
}

impl<B: Backend> ResidualConnection<B> {
    pub fn new(d_model: usize, eps: f64, dropout: f64, device: &B::Device) -> Self {
        Self {
            norm:    LayerNormalizationConfig::new(d_model).with_eps(eps).init(device),
            dropout: Dropout::new(dropout),
        }
    }

    pub fn forward(&self, x: Tensor<B, 3>, sublayer: Sublayer<'_, B>, mode: Mode) -> Result<Tensor<B, 3>> {
        Ok(self.forward_with_attention(x, sublayer, mode)?.0)
    }

    /// Same as [`forward`](Self::forward), also handing back the attention
    /// weights when the sublayer is an attention block.
    pub fn forward_with_attention(
        &self,
        x:        Tensor<B, 3>,
        sublayer: Sublayer<'_, B>,
        mode:     Mode,
    ) -> Result<(Tensor<B, 3>, Option<Tensor<B, 4>>)> {
        let normalized        = self.norm.forward(x.clone())?;
        let (update, weights) = sublayer.apply(normalized, mode)?;
        Ok((x + self.dropout.forward(update, mode), weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{
        feed_forward::FeedForwardConfig,
        test_utils::{assert_close, device, to_vec, TestBackend},
    };
    use burn::tensor::Distribution;

    #[test]
    fn test_adds_sublayer_output_to_input() {
        let residual = ResidualConnection::<TestBackend>::new(8, 1e-6, 0.1, &device());
        let ff       = FeedForwardConfig::new(8, 16).init(&device());
        let norm     = LayerNormalizationConfig::new(8).init::<TestBackend>(&device());
        let x = Tensor::<TestBackend, 3>::random([2, 3, 8], Distribution::Default, &device());

        let out = residual
            .forward(x.clone(), Sublayer::FeedForward(&ff), Mode::Inference)
            .unwrap();

        // Pre-norm: the sublayer sees norm(x), the skip path sees x
        let expected = x.clone() + ff.forward(norm.forward(x).unwrap(), Mode::Inference).unwrap();
        assert_close(&to_vec(out), &to_vec(expected), 1e-5);
    }

    #[test]
    fn test_propagates_sublayer_errors() {
        let residual = ResidualConnection::<TestBackend>::new(8, 1e-6, 0.0, &device());
        let ff       = FeedForwardConfig::new(8, 16).init(&device());
        let x        = Tensor::<TestBackend, 3>::zeros([1, 2, 4], &device());
        assert!(residual.forward(x, Sublayer::FeedForward(&ff), Mode::Inference).is_err());
    }

    #[test]
    fn test_attention_sublayer_hands_back_weights() {
        let residual = ResidualConnection::<TestBackend>::new(8, 1e-6, 0.1, &device());
        let mha = crate::ml::attention::MultiHeadAttentionConfig::new(8, 2)
            .init::<TestBackend>(&device())
            .unwrap();
        let ff = FeedForwardConfig::new(8, 16).init(&device());
        let x  = Tensor::<TestBackend, 3>::random([1, 3, 8], Distribution::Default, &device());

        let (out, weights) = residual
            .forward_with_attention(x.clone(), Sublayer::SelfAttention { block: &mha, mask: None }, Mode::Inference)
            .unwrap();
        assert_eq!(out.dims(), [1, 3, 8]);
        assert_eq!(weights.map(|w| w.dims()), Some([1, 2, 3, 3]));

        let (_, weights) = residual
            .forward_with_attention(x, Sublayer::FeedForward(&ff), Mode::Inference)
            .unwrap();
        assert!(weights.is_none());
    }
}
