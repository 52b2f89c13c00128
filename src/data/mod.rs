// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// Tokenisation happens upstream; this layer starts from id
// sequences and ends at model-ready tensors:
//
//   Vec<TokenPair>   → unpadded src/tgt ids per example
//       │
//       ▼
//   Seq2SeqBatcher   → pads, stacks and builds attention masks
//       │
//       ▼
//   Seq2SeqBatch     → fed to Transformer::encode / decode
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Pads token pairs into tensor batches with matching masks
pub mod batcher;

pub use batcher::{Seq2SeqBatch, Seq2SeqBatcher};
