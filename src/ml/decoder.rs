// ============================================================
// Layer 5: Decoder
// ============================================================
// One block, three residual sublayers:
//   x = x + dropout(self_attn(norm(x), tgt_mask))
//   x = x + dropout(cross_attn(norm(x), memory, src_mask))
//   x = x + dropout(feed_forward(norm(x)))
//
// tgt_mask must be causal (query i never sees key j > i) so
// that position i's output depends only on targets 0..=i.
// memory is the encoder output, computed once per source
// batch and reused for every decoding step.
//
// Reference: Vaswani et al. (2017) §3.1, §3.2.3

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
pub struct DecoderBlock<B: Backend> {
    pub(crate) self_attention:  MultiHeadAttentionBlock<B>,
    pub(crate) cross_attention: MultiHeadAttentionBlock<B>,
    pub(crate) feed_forward:    FeedForwardBlock<B>,
    self_attention_residual:    ResidualConnection<B>,
    cross_attention_residual:   ResidualConnection<B>,
    feed_forward_residual:      ResidualConnection<B>,
}

/// Inputs shared by every decoder block in one pass.
pub struct DecoderContext<'a, B: Backend> {
    pub memory:   &'a Tensor<B, 3>,
    pub src_mask: Option<&'a AttentionMask<B>>,
    pub tgt_mask: Option<&'a AttentionMask<B>>,
}

// Only references inside, so copyable whatever B is.
impl<B: Backend> Clone for DecoderContext<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Backend> Copy for DecoderContext<'_, B> {}

/// Attention weights of one decoder block.
#[derive(Debug, Clone)]
pub struct DecoderAttention<B: Backend> {
    /// `[batch, h, tgt_len, tgt_len]`
    pub self_attention:  Tensor<B, 4>,
    /// `[batch, h, tgt_len, src_len]`
    pub cross_attention: Tensor<B, 4>,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn new(
        self_attention:  MultiHeadAttentionBlock<B>,
        cross_attention: MultiHeadAttentionBlock<B>,
        feed_forward:    FeedForwardBlock<B>,
        residuals:       [ResidualConnection<B>; 3],
    ) -> Self {
        let [self_attention_residual, cross_attention_residual, feed_forward_residual] = residuals;
        Self {
            self_attention,
            cross_attention,
            feed_forward,
            self_attention_residual,
            cross_attention_residual,
            feed_forward_residual,
        }
    }

    pub fn forward(&self, x: Tensor<B, 3>, ctx: DecoderContext<'_, B>, mode: Mode) -> Result<Tensor<B, 3>> {
        Ok(self.forward_with_attention(x, ctx, mode)?.0)
    }

    pub fn forward_with_attention(
        &self,
        x:    Tensor<B, 3>,
        ctx:  DecoderContext<'_, B>,
        mode: Mode,
    ) -> Result<(Tensor<B, 3>, DecoderAttention<B>)> {
        let (x, self_weights) = self.self_attention_residual.forward_with_attention(
            x,
            Sublayer::SelfAttention { block: &self.self_attention, mask: ctx.tgt_mask },
            mode,
        )?;
        let (x, cross_weights) = self.cross_attention_residual.forward_with_attention(
            x,
            Sublayer::CrossAttention {
                block:  &self.cross_attention,
                memory: ctx.memory,
                mask:   ctx.src_mask,
            },
            mode,
        )?;
        let x = self.feed_forward_residual
            .forward(x, Sublayer::FeedForward(&self.feed_forward), mode)?;

        let missing = || ModelError::TensorData("attention sublayer returned no weights".into());
        let attention = DecoderAttention {
            self_attention:  self_weights.ok_or_else(missing)?,
            cross_attention: cross_weights.ok_or_else(missing)?,
        };
        Ok((x, attention))
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub(crate) layers: Vec<DecoderBlock<B>>,
    pub(crate) norm:   LayerNormalization<B>,
}

impl<B: Backend> Decoder<B> {
    pub fn new(layers: Vec<DecoderBlock<B>>, norm: LayerNormalization<B>) -> Self {
        Self { layers, norm }
    }

    /// x: [batch, tgt_len, d_model], memory: [batch, src_len, d_model]
    /// → [batch, tgt_len, d_model]
    pub fn forward(&self, x: Tensor<B, 3>, ctx: DecoderContext<'_, B>, mode: Mode) -> Result<Tensor<B, 3>> {
        let mut x = x;
        for layer in &self.layers {
            x = layer.forward(x, ctx, mode)?;
        }
        self.norm.forward(x)
    }

    /// Like [`forward`](Self::forward), also collecting each block's weights.
    pub fn forward_with_attention(
        &self,
        x:    Tensor<B, 3>,
        ctx:  DecoderContext<'_, B>,
        mode: Mode,
    ) -> Result<(Tensor<B, 3>, Vec<DecoderAttention<B>>)> {
        let mut x         = x;
        let mut attention = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (out, layer_attention) = layer.forward_with_attention(x, ctx, mode)?;
            x = out;
            attention.push(layer_attention);
        }
        Ok((self.norm.forward(x)?, attention))
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}
