// ============================================================
// Layer 5: Encoder
// ============================================================
// One block:
//   x = x + dropout(self_attn(norm(x), src_mask))
//   x = x + dropout(feed_forward(norm(x)))
//
// The stack applies N blocks (no shared parameters) and then a
// final layer normalisation; its output is the "memory" every
// decoder block cross-attends to.
//
// Reference: Vaswani et al. (2017) §3.1

use burn::prelude::*;

use crate::domain::{Mode, ModelError, Result};
use crate::ml::{
    attention::MultiHeadAttentionBlock,
    feed_forward::FeedForwardBlock,
    mask::AttentionMask,
    norm::LayerNormalization,
    residual::{ResidualConnection, Sublayer},
};

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub(crate) self_attention: MultiHeadAttentionBlock<B>,
    pub(crate) feed_forward:   FeedForwardBlock<B>,
    attention_residual:        ResidualConnection<B>,
    feed_forward_residual:     ResidualConnection<B>,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn new(
        self_attention:        MultiHeadAttentionBlock<B>,
        feed_forward:          FeedForwardBlock<B>,
        attention_residual:    ResidualConnection<B>,
        feed_forward_residual: ResidualConnection<B>,
    ) -> Self {
        Self { self_attention, feed_forward, attention_residual, feed_forward_residual }
    }

    pub fn forward(&self, x: Tensor<B, 3>, src_mask: Option<&AttentionMask<B>>, mode: Mode) -> Result<Tensor<B, 3>> {
        Ok(self.forward_with_attention(x, src_mask, mode)?.0)
    }

    /// Block output and its self-attention weights `[batch, h, src_len, src_len]`.
    pub fn forward_with_attention(
        &self,
        x:        Tensor<B, 3>,
        src_mask: Option<&AttentionMask<B>>,
        mode:     Mode,
    ) -> Result<(Tensor<B, 3>, Tensor<B, 4>)> {
        let (x, weights) = self.attention_residual.forward_with_attention(
            x,
            Sublayer::SelfAttention { block: &self.self_attention, mask: src_mask },
            mode,
        )?;
        let x = self.feed_forward_residual
            .forward(x, Sublayer::FeedForward(&self.feed_forward), mode)?;
        let weights = weights.ok_or_else(|| ModelError::TensorData("self-attention returned no weights".into()))?;
        Ok((x, weights))
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub(crate) layers: Vec<EncoderBlock<B>>,
    pub(crate) norm:   LayerNormalization<B>,
}

impl<B: Backend> Encoder<B> {
    pub fn new(layers: Vec<EncoderBlock<B>>, norm: LayerNormalization<B>) -> Self {
        Self { layers, norm }
    }

    /// x: [batch, src_len, d_model] → [batch, src_len, d_model]
    pub fn forward(&self, x: Tensor<B, 3>, src_mask: Option<&AttentionMask<B>>, mode: Mode) -> Result<Tensor<B, 3>> {
        let mut x = x;
        for layer in &self.layers {
            x = layer.forward(x, src_mask, mode)?;
        }
        self.norm.forward(x)
    }

    /// Like [`forward`](Self::forward), also collecting each block's
    /// self-attention weights, first block first.
    pub fn forward_with_attention(
        &self,
        x:        Tensor<B, 3>,
        src_mask: Option<&AttentionMask<B>>,
        mode:     Mode,
    ) -> Result<(Tensor<B, 3>, Vec<Tensor<B, 4>>)> {
        let mut x       = x;
        let mut weights = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (out, layer_weights) = layer.forward_with_attention(x, src_mask, mode)?;
            x = out;
            weights.push(layer_weights);
        }
        Ok((self.norm.forward(x)?, weights))
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{
        attention::MultiHeadAttentionConfig,
        feed_forward::FeedForwardConfig,
        norm::LayerNormalizationConfig,
        test_utils::{assert_close, device, to_vec, TestBackend},
    };
    use burn::tensor::Distribution;

    fn encoder(layers: usize) -> Encoder<TestBackend> {
        let device = device();
        let blocks = (0..layers)
            .map(|_| {
                EncoderBlock::new(
                    MultiHeadAttentionConfig::new(16, 4).init(&device).unwrap(),
                    FeedForwardConfig::new(16, 32).init(&device),
                    ResidualConnection::new(16, 1e-6, 0.1, &device),
                    ResidualConnection::new(16, 1e-6, 0.1, &device),
                )
            })
            .collect();
        Encoder::new(blocks, LayerNormalizationConfig::new(16).init(&device))
    }

    #[test]
    fn test_stack_preserves_shape() {
        let encoder = encoder(3);
        assert_eq!(encoder.num_layers(), 3);

        let x   = Tensor::<TestBackend, 3>::random([2, 7, 16], Distribution::Default, &device());
        let out = encoder.forward(x, None, Mode::Inference).unwrap();
        assert_eq!(out.dims(), [2, 7, 16]);
    }

    #[test]
    fn test_padded_keys_do_not_change_real_positions() {
        let encoder = encoder(2);
        let x = Tensor::<TestBackend, 3>::random([1, 5, 16], Distribution::Default, &device());

        let tokens = Tensor::<TestBackend, 2, Int>::from_ints([[5, 6, 7, 0, 0]], &device());
        let mask   = AttentionMask::padding(tokens, 0);
        let padded = encoder.forward(x.clone(), Some(&mask), Mode::Inference).unwrap();

        let trimmed = encoder
            .forward(x.slice([0..1, 0..3, 0..16]), None, Mode::Inference)
            .unwrap();

        let padded = to_vec(padded.slice([0..1, 0..3, 0..16]));
        assert_close(&padded, &to_vec(trimmed), 1e-4);
    }

    #[test]
    fn test_collects_attention_per_block() {
        let encoder = encoder(3);
        let x = Tensor::<TestBackend, 3>::random([2, 4, 16], Distribution::Default, &device());

        let (out, weights) = encoder.forward_with_attention(x.clone(), None, Mode::Inference).unwrap();
        assert_eq!(weights.len(), 3);
        assert!(weights.iter().all(|w| w.dims() == [2, 4, 4, 4]));

        let plain = encoder.forward(x, None, Mode::Inference).unwrap();
        assert_close(&to_vec(out), &to_vec(plain), 1e-6);
    }
}
