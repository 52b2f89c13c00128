// ============================================================
// Layer 5: Transformer (composition root)
// ============================================================
// TransformerConfig::init / build_transformer wire every
// component bottom-up with fresh parameters:
//
//   src: TokenEmbedding → PositionalEncoding → Encoder ─┐
//                                                      │ memory
//   tgt: TokenEmbedding → PositionalEncoding → Decoder ◄┘
//                                                │
//                                        ProjectionLayer
//
// Nothing is shared: source and target get their own
// embedding tables and positional encoders, and every encoder
// and decoder block owns its own attention/feed-forward
// weights.
//
// The model exposes three calls instead of one forward pass,
// because the encoder output is computed once per source batch
// and then reused for every autoregressive decoding step.
//
// Reference: Vaswani et al. (2017) §3, Table 3 (base model)
//            Burn Book §3 (Config and Module)

use burn::prelude::*;

use crate::domain::{Mode, ModelError, Result};
use crate::ml::{
    attention::{MultiHeadAttentionBlock, MultiHeadAttentionConfig},
    decoder::{Decoder, DecoderAttention, DecoderBlock, DecoderContext},
    embedding::{TokenEmbedding, TokenEmbeddingConfig},
    encoder::{Encoder, EncoderBlock},
    feed_forward::{FeedForwardBlock, FeedForwardConfig},
    mask::AttentionMask,
    norm::{LayerNormalization, LayerNormalizationConfig},
    positional::{PositionalEncoding, PositionalEncodingConfig},
    projection::{ProjectionLayer, ProjectionLayerConfig},
    residual::ResidualConnection,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TransformerConfig {
    pub src_vocab_size: usize,
    pub tgt_vocab_size: usize,
    pub src_seq_len:    usize,
    pub tgt_seq_len:    usize,
    #[config(default = 512)]
    pub d_model:        usize,
    #[config(default = 6)]
    pub num_layers:     usize,
    #[config(default = 8)]
    pub num_heads:      usize,
    #[config(default = 0.1)]
    pub dropout:        f64,
    #[config(default = 2048)]
    pub d_ff:           usize,
    #[config(default = 1e-6)]
    pub layer_norm_eps: f64,
}

impl TransformerConfig {
    /// Reject hyperparameters that could only fail later, mid forward pass.
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("src_vocab_size", self.src_vocab_size),
            ("tgt_vocab_size", self.tgt_vocab_size),
            ("src_seq_len",    self.src_seq_len),
            ("tgt_seq_len",    self.tgt_seq_len),
            ("num_layers",     self.num_layers),
            ("num_heads",      self.num_heads),
            ("d_ff",           self.d_ff),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, value)| *value == 0) {
            return Err(ModelError::InvalidConfig(format!("{name} must be greater than zero")));
        }
        if self.d_model < 2 {
            return Err(ModelError::InvalidConfig(format!(
                "d_model must be at least 2, got {}",
                self.d_model
            )));
        }
        if self.d_model % self.num_heads != 0 {
            return Err(ModelError::HeadsNotDivisible {
                d_model: self.d_model,
                n_heads: self.num_heads,
            });
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if self.layer_norm_eps <= 0.0 || !self.layer_norm_eps.is_finite() {
            return Err(ModelError::InvalidConfig(format!(
                "layer_norm_eps must be a positive number, got {}",
                self.layer_norm_eps
            )));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Transformer<B>> {
        self.validate()?;

        let src_embedding = TokenEmbeddingConfig::new(self.src_vocab_size, self.d_model).init(device);
        let tgt_embedding = TokenEmbeddingConfig::new(self.tgt_vocab_size, self.d_model).init(device);
        let src_position  = PositionalEncodingConfig::new(self.d_model, self.src_seq_len)
            .with_dropout(self.dropout)
            .init(device);
        let tgt_position  = PositionalEncodingConfig::new(self.d_model, self.tgt_seq_len)
            .with_dropout(self.dropout)
            .init(device);

        let encoder_blocks = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect::<Result<Vec<_>>>()?;
        let decoder_blocks = (0..self.num_layers)
            .map(|_| self.build_decoder_block(device))
            .collect::<Result<Vec<_>>>()?;

        let model = Transformer {
            encoder:    Encoder::new(encoder_blocks, self.layer_norm(device)),
            decoder:    Decoder::new(decoder_blocks, self.layer_norm(device)),
            src_embedding,
            tgt_embedding,
            src_position,
            tgt_position,
            projection: ProjectionLayerConfig::new(self.d_model, self.tgt_vocab_size).init(device),
        };

        tracing::info!(
            "Transformer built: {} layers, d_model={}, heads={}, d_ff={}",
            self.num_layers, self.d_model, self.num_heads, self.d_ff,
        );
        Ok(model)
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> Result<EncoderBlock<B>> {
        Ok(EncoderBlock::new(
            self.attention(device)?,
            self.feed_forward(device),
            self.residual(device),
            self.residual(device),
        ))
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> Result<DecoderBlock<B>> {
        Ok(DecoderBlock::new(
            self.attention(device)?,
            self.attention(device)?,
            self.feed_forward(device),
            [self.residual(device), self.residual(device), self.residual(device)],
        ))
    }

    fn attention<B: Backend>(&self, device: &B::Device) -> Result<MultiHeadAttentionBlock<B>> {
        MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device)
    }

    fn feed_forward<B: Backend>(&self, device: &B::Device) -> FeedForwardBlock<B> {
        FeedForwardConfig::new(self.d_model, self.d_ff)
            .with_dropout(self.dropout)
            .init(device)
    }

    fn residual<B: Backend>(&self, device: &B::Device) -> ResidualConnection<B> {
        ResidualConnection::new(self.d_model, self.layer_norm_eps, self.dropout, device)
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNormalization<B> {
        LayerNormalizationConfig::new(self.d_model)
            .with_eps(self.layer_norm_eps)
            .init(device)
    }
}

/// Build a Transformer with freshly initialised parameters.
///
/// Fails with [`ModelError::HeadsNotDivisible`] or
/// [`ModelError::InvalidConfig`] before any parameter is allocated.
pub fn build_transformer<B: Backend>(config: &TransformerConfig, device: &B::Device) -> Result<Transformer<B>> {
    config.init(device)
}

#[derive(Module, Debug)]
pub struct Transformer<B: Backend> {
    pub(crate) encoder:       Encoder<B>,
    pub(crate) decoder:       Decoder<B>,
    pub(crate) src_embedding: TokenEmbedding<B>,
    pub(crate) tgt_embedding: TokenEmbedding<B>,
    src_position:             PositionalEncoding<B>,
    tgt_position:             PositionalEncoding<B>,
    pub(crate) projection:    ProjectionLayer<B>,
}

impl<B: Backend> Transformer<B> {
    /// src: [batch, src_len] ids → encoder output [batch, src_len, d_model]
    pub fn encode(
        &self,
        src:      Tensor<B, 2, Int>,
        src_mask: Option<&AttentionMask<B>>,
        mode:     Mode,
    ) -> Result<Tensor<B, 3>> {
        let x = self.src_embedding.forward(src)?;
        let x = self.src_position.forward(x, mode)?;
        self.encoder.forward(x, src_mask, mode)
    }

    /// tgt: [batch, tgt_len] ids → decoder output [batch, tgt_len, d_model]
    pub fn decode(
        &self,
        encoder_output: &Tensor<B, 3>,
        src_mask:       Option<&AttentionMask<B>>,
        tgt:            Tensor<B, 2, Int>,
        tgt_mask:       Option<&AttentionMask<B>>,
        mode:           Mode,
    ) -> Result<Tensor<B, 3>> {
        let x = self.tgt_embedding.forward(tgt)?;
        let x = self.tgt_position.forward(x, mode)?;
        let ctx = DecoderContext {
            memory: encoder_output,
            src_mask,
            tgt_mask,
        };
        self.decoder.forward(x, ctx, mode)
    }

    /// [`encode`](Self::encode) plus the self-attention weights of every
    /// encoder block, each `[batch, heads, src_len, src_len]`.
    pub fn encode_with_attention(
        &self,
        src:      Tensor<B, 2, Int>,
        src_mask: Option<&AttentionMask<B>>,
        mode:     Mode,
    ) -> Result<(Tensor<B, 3>, Vec<Tensor<B, 4>>)> {
        let x = self.src_embedding.forward(src)?;
        let x = self.src_position.forward(x, mode)?;
        self.encoder.forward_with_attention(x, src_mask, mode)
    }

    /// [`decode`](Self::decode) plus the self- and cross-attention weights
    /// of every decoder block.
    pub fn decode_with_attention(
        &self,
        encoder_output: &Tensor<B, 3>,
        src_mask:       Option<&AttentionMask<B>>,
        tgt:            Tensor<B, 2, Int>,
        tgt_mask:       Option<&AttentionMask<B>>,
        mode:           Mode,
    ) -> Result<(Tensor<B, 3>, Vec<DecoderAttention<B>>)> {
        let x = self.tgt_embedding.forward(tgt)?;
        let x = self.tgt_position.forward(x, mode)?;
        let ctx = DecoderContext {
            memory: encoder_output,
            src_mask,
            tgt_mask,
        };
        self.decoder.forward_with_attention(x, ctx, mode)
    }

    /// [batch, tgt_len, d_model] → log-probabilities [batch, tgt_len, tgt_vocab]
    pub fn project(&self, decoder_output: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        self.projection.forward(decoder_output)
    }

    /// Learned parameter count per top-level component.
    pub fn parameter_summary(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("src_embedding", self.src_embedding.num_params()),
            ("tgt_embedding", self.tgt_embedding.num_params()),
            ("encoder",       self.encoder.num_params()),
            ("decoder",       self.decoder.num_params()),
            ("projection",    self.projection.num_params()),
        ]
    }

    pub fn d_model(&self) -> usize {
        self.src_embedding.d_model()
    }

    pub fn num_layers(&self) -> usize {
        self.encoder.num_layers()
    }

    pub fn src_vocab_size(&self) -> usize {
        self.src_embedding.vocab_size()
    }

    pub fn tgt_vocab_size(&self) -> usize {
        self.tgt_embedding.vocab_size()
    }

    pub fn src_seq_len(&self) -> usize {
        self.src_position.max_seq_len()
    }

    pub fn tgt_seq_len(&self) -> usize {
        self.tgt_position.max_seq_len()
    }
}
