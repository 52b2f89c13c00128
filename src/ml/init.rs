// ============================================================
// Layer 5: Parameter Initialisation
// ============================================================
// Every parameter tensor with more than one dimension is drawn
// from the Xavier/Glorot uniform distribution:
//
//   W ~ U(-a, a)   with   a = √(6 / (fan_in + fan_out))
//
// 1-D parameters (linear biases, norm scale/shift) keep the
// defaults of the module that owns them.
//
// Burn's `Initializer::XavierUniform` needs fan_in/fan_out,
// which `LinearConfig`/`EmbeddingConfig` do not pass for the
// bias, so we build modules with their default initialiser and
// swap in a Xavier weight afterwards.
//
// Reference: Glorot & Bengio (2010)
//            Burn Book §3 (Initializers)

use burn::{
    module::Param,
    nn::{Embedding, EmbeddingConfig, Initializer, Linear, LinearConfig},
    prelude::*,
};

/// Half-width of the Xavier-uniform interval for the given fans.
pub fn xavier_bound(fan_in: usize, fan_out: usize) -> f64 {
    (6.0 / (fan_in + fan_out) as f64).sqrt()
}

/// A fresh 2-D parameter drawn from U(-a, a), a = [`xavier_bound`].
pub fn xavier_uniform<B: Backend>(
    shape:   [usize; 2],
    fan_in:  usize,
    fan_out: usize,
    device:  &B::Device,
) -> Param<Tensor<B, 2>> {
    Initializer::XavierUniform { gain: 1.0 }.init_with(shape, Some(fan_in), Some(fan_out), device)
}

/// Linear layer with a Xavier weight `[d_input, d_output]` and Burn's
/// default bias, U(-1/√d_input, 1/√d_input).
pub fn linear<B: Backend>(d_input: usize, d_output: usize, device: &B::Device) -> Linear<B> {
    let mut linear = LinearConfig::new(d_input, d_output).init(device);
    linear.weight  = xavier_uniform([d_input, d_output], d_input, d_output, device);
    linear
}

/// Embedding table `[vocab_size, d_model]` with a Xavier weight.
pub fn embedding<B: Backend>(vocab_size: usize, d_model: usize, device: &B::Device) -> Embedding<B> {
    let mut embedding = EmbeddingConfig::new(vocab_size, d_model).init(device);
    // Row-major table: one row per token, fan_in is the row width.
    embedding.weight  = xavier_uniform([vocab_size, d_model], d_model, vocab_size, device);
    embedding
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_utils::{device, to_vec, TestBackend};

    fn mean_and_variance(values: &[f32]) -> (f64, f64) {
        let n    = values.len() as f64;
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var  = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        (mean, var)
    }

    #[test]
    fn test_linear_weight_matches_xavier_variance() {
        let linear: Linear<TestBackend> = linear(256, 256, &device());
        let weights = to_vec(linear.weight.val());
        let bound   = xavier_bound(256, 256);

        assert!(weights.iter().all(|w| (*w as f64).abs() <= bound + 1e-6));

        // U(-a, a) has variance a²/3
        let (mean, var) = mean_and_variance(&weights);
        let expected    = bound * bound / 3.0;
        assert!(mean.abs() < 0.01, "mean {mean}");
        assert!((var - expected).abs() / expected < 0.1, "var {var} vs {expected}");
    }

    #[test]
    fn test_linear_bias_keeps_default_range() {
        let linear: Linear<TestBackend> = linear(64, 32, &device());
        let bias = linear.bias.expect("linear layers are built with a bias");
        let bias = to_vec(bias.val());
        assert_eq!(bias.len(), 32);

        let limit = 1.0 / (64f32).sqrt();
        assert!(bias.iter().all(|b| b.abs() <= limit + 1e-6));
    }

    #[test]
    fn test_embedding_table_shape_and_bound() {
        let embedding: Embedding<TestBackend> = embedding(1000, 64, &device());
        assert_eq!(embedding.weight.val().dims(), [1000, 64]);

        let bound = xavier_bound(64, 1000);
        let table = to_vec(embedding.weight.val());
        assert!(table.iter().all(|w| (*w as f64).abs() <= bound + 1e-6));
    }
}
