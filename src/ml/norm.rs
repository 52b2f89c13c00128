// ============================================================
// Layer 5: Layer Normalization
// ============================================================
// Standardises each position's feature vector:
//
//   mean  = Σ x / d_model
//   std   = √(Σ (x - mean)² / (d_model - 1))
//   out   = alpha · (x - mean) / (std + eps) + bias
//
// alpha and bias are single learned scalars shared by every
// feature, not per-feature vectors. eps sits outside the root,
// which keeps constant rows finite.
//
// Reference: Ba et al. (2016) Layer Normalization
//            Burn Book §3 (Module)

use burn::{module::Param, prelude::*};

use crate::domain::{ModelError, Result};

/// Settings for [`LayerNormalization`].
#[derive(Config, Debug)]
pub struct LayerNormalizationConfig {
    /// Width of the feature axis being normalised
    pub d_model: usize,
    /// Added to the standard deviation before dividing
    #[config(default = 1e-6)]
    pub eps:     f64,
}

impl LayerNormalizationConfig {
    /// Scale starts at 1 and shift at 0, so a fresh layer only standardises.
    pub fn init<B: Backend>(&self, device: &B::Device) -> LayerNormalization<B> {
        LayerNormalization {
            alpha:   Param::from_tensor(Tensor::ones([1], device)),
            bias:    Param::from_tensor(Tensor::zeros([1], device)),
            eps:     self.eps,
            d_model: self.d_model,
        }
    }
}

/// Layer normalisation over the feature axis with a single learned scale
/// (`alpha`, starts at 1) and shift (`bias`, starts at 0):
///
/// `alpha * (x - mean) / (std + eps) + bias`
///
/// `std` is the sample standard deviation (n - 1 denominator) of each
/// position's feature vector.
#[derive(Module, Debug)]
pub struct LayerNormalization<B: Backend> {
    pub(crate) alpha: Param<Tensor<B, 1>>,
    pub(crate) bias:  Param<Tensor<B, 1>>,
    eps:              f64,
    d_model:          usize,
}

impl<B: Backend> LayerNormalization<B> {
    /// Normalise every position of `[batch, seq_len, d_model]` on its own.
    ///
    /// A constant row has std 0 and comes out as all zeros (plus `bias`)
    /// thanks to `eps`. Any other last dimension is a `ShapeMismatch`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        let [_, _, d_model] = x.dims();
        if d_model != self.d_model {
            return Err(ModelError::shape(
                "layer normalization",
                format!("last dim {}", self.d_model),
                &x.dims(),
            ));
        }

        let mean     = x.clone().mean_dim(2);
        let centered = x - mean;
        let variance = centered
            .clone()
            .powf_scalar(2.0)
            .sum_dim(2)
            .div_scalar(d_model.saturating_sub(1).max(1) as f64);
        let std = variance.sqrt();

        let normalized = centered / std.add_scalar(self.eps);
        Ok(normalized * self.alpha.val().unsqueeze::<3>() + self.bias.val().unsqueeze::<3>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_utils::{assert_close, device, to_vec, TestBackend};

    #[test]
    fn test_each_position_normalised_independently() {
        let norm: LayerNormalization<TestBackend> = LayerNormalizationConfig::new(4).init(&device());
        let x = Tensor::<TestBackend, 3>::from_floats(
            [[[1.0, 2.0, 3.0, 4.0], [10.0, 10.0, 10.0, 14.0]]],
            &device(),
        );
        let out = to_vec(norm.forward(x).unwrap());

        // Row 1: mean 2.5, sample std √(5/3)
        let std = (5.0f32 / 3.0).sqrt();
        let expected: Vec<f32> = [1.0, 2.0, 3.0, 4.0].iter().map(|v| (v - 2.5) / std).collect();
        assert_close(&out[..4], &expected, 1e-4);

        // Row 2: mean 11, sample std 2
        assert_close(&out[4..], &[-0.5, -0.5, -0.5, 1.5], 1e-4);
    }

    #[test]
    fn test_constant_row_stays_finite() {
        let norm: LayerNormalization<TestBackend> = LayerNormalizationConfig::new(3).init(&device());
        let x   = Tensor::<TestBackend, 3>::ones([2, 2, 3], &device()) * 5.0;
        let out = to_vec(norm.forward(x).unwrap());
        assert!(out.iter().all(|v| v.is_finite() && v.abs() < 1e-6));
    }

    #[test]
    fn test_scale_and_shift_start_at_identity() {
        let norm: LayerNormalization<TestBackend> = LayerNormalizationConfig::new(8).init(&device());
        assert_eq!(to_vec(norm.alpha.val()), vec![1.0]);
        assert_eq!(to_vec(norm.bias.val()), vec![0.0]);
    }

    #[test]
    fn test_rejects_wrong_width() {
        let norm: LayerNormalization<TestBackend> = LayerNormalizationConfig::new(8).init(&device());
        let x = Tensor::<TestBackend, 3>::zeros([1, 1, 4], &device());
        assert!(matches!(norm.forward(x), Err(ModelError::ShapeMismatch { .. })));
    }
}
