// ============================================================
// Layer 2: GenerateUseCase
// ============================================================
// Greedy-decodes one source sequence:
//
//   Step 1: Seed the backend RNG           (parameter init)
//   Step 2: Build the Transformer          (Layer 5 - ml)
//   Step 3: Run the SequenceGenerator      (Layer 5 - ml)
//
// Weights are freshly initialised on every run, so the output
// only depends on the seed and the architecture. This is a
// smoke test of the decoding path, not a translation service.

use anyhow::{Context, Result};
use burn::prelude::*;

use crate::domain::{Generation, SequenceGenerator, SpecialTokens};
use crate::ml::{build_transformer, GreedyDecoder, TransformerConfig};

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub special: SpecialTokens,
    pub max_len: usize,
    pub seed:    u64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            special: SpecialTokens::default(),
            max_len: 32,
            seed:    42,
        }
    }
}

pub struct GenerateUseCase {
    config:  TransformerConfig,
    options: GenerateOptions,
}

impl GenerateUseCase {
    pub fn new(config: TransformerConfig, options: GenerateOptions) -> Self {
        Self { config, options }
    }

    pub fn execute<B: Backend>(&self, src: &[u32], device: &B::Device) -> Result<Generation> {
        anyhow::ensure!(!src.is_empty(), "source sequence is empty");
        anyhow::ensure!(self.options.max_len > 0, "max length must be at least 1");

        B::seed(self.options.seed);
        let model = build_transformer::<B>(&self.config, device).context("Cannot build model")?;

        let decoder = GreedyDecoder::new(&model, self.options.special, self.options.max_len, device);
        tracing::info!(
            "Generating up to {} tokens for a {}-token source",
            decoder.length_limit(),
            src.len()
        );

        let generation = run(&decoder, src)?;
        tracing::info!(
            "Generated {} tokens (log p = {:.4})",
            generation.tokens.len(),
            generation.total_log_prob()
        );
        Ok(generation)
    }
}

fn run(generator: &impl SequenceGenerator, src: &[u32]) -> Result<Generation> {
    generator.generate(src).context("Generation failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AppBackend;

    fn config() -> TransformerConfig {
        TransformerConfig::new(25, 25, 10, 6)
            .with_d_model(16)
            .with_num_layers(1)
            .with_num_heads(4)
            .with_d_ff(32)
    }

    #[test]
    fn test_generates_within_limits() {
        let options = GenerateOptions { max_len: 4, ..Default::default() };
        let out = GenerateUseCase::new(config(), options)
            .execute::<AppBackend>(&[3, 4, 5], &Default::default())
            .unwrap();

        assert!(!out.tokens.is_empty() && out.tokens.len() <= 4);
        assert_eq!(out.tokens.len(), out.log_probs.len());
        assert!(out.tokens.iter().all(|&t| t < 25));
        // Anything before the last token cannot be the end token
        assert!(!out.tokens[..out.tokens.len() - 1].contains(&2));
    }

    #[test]
    fn test_rejects_bad_requests() {
        let use_case = GenerateUseCase::new(config(), GenerateOptions::default());
        assert!(use_case.execute::<AppBackend>(&[], &Default::default()).is_err());
        assert!(use_case.execute::<AppBackend>(&[3; 11], &Default::default()).is_err());
        assert!(use_case.execute::<AppBackend>(&[99], &Default::default()).is_err());

        let zero = GenerateOptions { max_len: 0, ..Default::default() };
        assert!(GenerateUseCase::new(config(), zero)
            .execute::<AppBackend>(&[3], &Default::default())
            .is_err());
    }
}
