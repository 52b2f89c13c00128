// ============================================================
// Layer 2: InspectUseCase
// ============================================================
// Builds a model from a config and runs one dummy batch end to
// end, without any trained weights:
//
//   Step 1: Build the Transformer          (Layer 5 - ml)
//   Step 2: Count parameters per component (Layer 5 - ml)
//   Step 3: Batch dummy full-length pairs  (Layer 4 - data)
//   Step 4: encode → decode → project      (Layer 5 - ml)
//           keeping every block's attention weight shapes
//
// The report is plain data; the CLI decides how to print it.

use anyhow::{Context, Result};
use burn::prelude::*;
use serde::Serialize;

use crate::data::Seq2SeqBatcher;
use crate::domain::{Mode, SpecialTokens, TokenPair};
use crate::ml::{build_transformer, TransformerConfig};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub parameters:        Vec<(String, usize)>,
    pub total_parameters:  usize,
    pub src_shape:         [usize; 2],
    pub tgt_shape:         [usize; 2],
    pub encoder_shape:     [usize; 3],
    pub decoder_shape:     [usize; 3],
    pub log_probs_shape:   [usize; 3],
    /// Per-block attention weight shapes, first block first
    pub attention:         Vec<AttentionShapes>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttentionShapes {
    pub encoder_self:  [usize; 4],
    pub decoder_self:  [usize; 4],
    pub decoder_cross: [usize; 4],
}

pub struct InspectUseCase {
    config:     TransformerConfig,
    batch_size: usize,
}

impl InspectUseCase {
    pub fn new(config: TransformerConfig, batch_size: usize) -> Self {
        Self { config, batch_size }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<InspectReport> {
        anyhow::ensure!(self.batch_size > 0, "batch size must be at least 1");

        // ── Step 1-2: Build and count ─────────────────────────────────────────
        let model = build_transformer::<B>(&self.config, device).context("Cannot build model")?;
        let parameters: Vec<(String, usize)> = model
            .parameter_summary()
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        let total_parameters = model.num_params();

        tracing::info!("Model has {} parameters", total_parameters);

        // ── Step 3: Dummy batch ───────────────────────────────────────────────
        // Full-length rows so every positional slot is exercised
        let pairs: Vec<TokenPair> = (0..self.batch_size)
            .map(|row| {
                TokenPair::new(
                    dummy_ids(row, self.config.src_seq_len, self.config.src_vocab_size),
                    dummy_ids(row, self.config.tgt_seq_len, self.config.tgt_vocab_size),
                )
            })
            .collect();
        let batch = Seq2SeqBatcher::<B>::for_config(&self.config, SpecialTokens::default(), device.clone())
            .batch(pairs)?;

        // ── Step 4: Forward pass ──────────────────────────────────────────────
        let src_shape = batch.src.dims();
        let tgt_shape = batch.tgt.dims();

        let (memory, encoder_attention) =
            model.encode_with_attention(batch.src, Some(&batch.src_mask), Mode::Inference)?;
        let (decoded, decoder_attention) = model.decode_with_attention(
            &memory,
            Some(&batch.src_mask),
            batch.tgt,
            Some(&batch.tgt_mask),
            Mode::Inference,
        )?;
        let decoder_shape = decoded.dims();
        let log_probs     = model.project(decoded)?;

        let attention = encoder_attention
            .iter()
            .zip(&decoder_attention)
            .map(|(enc, dec)| AttentionShapes {
                encoder_self:  enc.dims(),
                decoder_self:  dec.self_attention.dims(),
                decoder_cross: dec.cross_attention.dims(),
            })
            .collect();

        Ok(InspectReport {
            parameters,
            total_parameters,
            src_shape,
            tgt_shape,
            encoder_shape: memory.dims(),
            decoder_shape,
            log_probs_shape: log_probs.dims(),
            attention,
        })
    }
}

/// Deterministic ids in 1..vocab (0 is left for padding when vocab allows).
fn dummy_ids(row: usize, len: usize, vocab: usize) -> Vec<u32> {
    if vocab < 2 {
        return vec![0; len];
    }
    (0..len).map(|i| (1 + (row + i) % (vocab - 1)) as u32).collect()
}
