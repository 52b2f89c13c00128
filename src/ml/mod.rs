// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// The encoder-decoder Transformer of Vaswani et al. (2017),
// assembled from small Burn modules, leaves first:
//
//   init.rs          - Xavier/Glorot-uniform parameter init
//   dropout.rs       - dropout driven by an explicit Mode
//   embedding.rs     - token ids → vectors, scaled by √d_model
//   positional.rs    - fixed sinusoidal position table
//   norm.rs          - layer normalisation (scalar scale/shift)
//   feed_forward.rs  - linear → ReLU → dropout → linear
//   mask.rs          - padding and causal attention masks
//   attention.rs     - multi-head scaled dot-product attention
//   residual.rs      - pre-norm residual wrapper + Sublayer
//   encoder.rs       - encoder block and N-block stack
//   decoder.rs       - decoder block and N-block stack
//   projection.rs    - d_model → vocab log-probabilities
//   model.rs         - TransformerConfig, Transformer,
//                      build_transformer (composition root)
//   inferencer.rs    - greedy autoregressive decoding
//
// Every forward pass takes `&self` plus an explicit Mode and
// returns a `Result`, so shape and id errors surface at the
// call that caused them.
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need

pub mod attention;
pub mod decoder;
pub mod dropout;
pub mod embedding;
pub mod encoder;
pub mod feed_forward;
pub mod inferencer;
pub mod init;
pub mod mask;
pub mod model;
pub mod norm;
pub mod positional;
pub mod projection;
pub mod residual;

pub use attention::{AttentionOutput, MultiHeadAttentionBlock, MultiHeadAttentionConfig};
pub use decoder::DecoderAttention;
pub use inferencer::GreedyDecoder;
pub use mask::AttentionMask;
pub use model::{build_transformer, Transformer, TransformerConfig};
