// ============================================================
// Layer 5: Position-wise Feed-Forward
// ============================================================
// The second sublayer of every encoder and decoder block:
//
//   x        [batch, seq_len, d_model]
//   linear1  [batch, seq_len, d_ff]
//   relu
//   dropout                              ← Mode::Train only
//   linear2  [batch, seq_len, d_model]
//
// Applied to every position separately; no mixing across the
// sequence happens here.
//
// Reference: Vaswani et al. (2017) §3.3

use burn::{nn::Linear, prelude::*, tensor::activation::relu};

use crate::domain::{Mode, ModelError, Result};
use crate::ml::{dropout::Dropout, init};

/// Settings for [`FeedForwardBlock`].
#[derive(Config, Debug)]
pub struct FeedForwardConfig {
    pub d_model: usize,
    /// Hidden width, usually 4 × d_model
    pub d_ff:    usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl FeedForwardConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeedForwardBlock<B> {
        FeedForwardBlock {
            linear1: init::linear(self.d_model, self.d_ff, device),
            linear2: init::linear(self.d_ff, self.d_model, device),
            dropout: Dropout::new(self.dropout),
            d_model: self.d_model,
        }
    }
}

/// Two Xavier-initialised linear layers around a ReLU, with dropout on
/// the hidden activations.
#[derive(Module, Debug)]
pub struct FeedForwardBlock<B: Backend> {
    pub(crate) linear1: Linear<B>,
    pub(crate) linear2: Linear<B>,
    dropout:            Dropout,
    d_model:            usize,
}

impl<B: Backend> FeedForwardBlock<B> {
    /// `[batch, seq_len, d_model]` in and out. Dropout is active only in
    /// `Mode::Train`.
    pub fn forward(&self, x: Tensor<B, 3>, mode: Mode) -> Result<Tensor<B, 3>> {
        let [_, _, d_model] = x.dims();
        if d_model != self.d_model {
            return Err(ModelError::shape(
                "feed-forward block",
                format!("last dim {}", self.d_model),
                &x.dims(),
            ));
        }

        let hidden = relu(self.linear1.forward(x));
        Ok(self.linear2.forward(self.dropout.forward(hidden, mode)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_utils::{assert_close, device, to_vec, TestBackend};

    #[test]
    fn test_shape_is_preserved() {
        let ff: FeedForwardBlock<TestBackend> = FeedForwardConfig::new(16, 64).init(&device());
        let x = Tensor::<TestBackend, 3>::random([3, 7, 16], burn::tensor::Distribution::Default, &device());
        assert_eq!(ff.forward(x, Mode::Inference).unwrap().dims(), [3, 7, 16]);
    }

    #[test]
    fn test_positions_do_not_interact() {
        let ff: FeedForwardBlock<TestBackend> = FeedForwardConfig::new(8, 32).init(&device());
        let x = Tensor::<TestBackend, 3>::random([1, 4, 8], burn::tensor::Distribution::Default, &device());

        let full = to_vec(ff.forward(x.clone(), Mode::Inference).unwrap());
        let last = to_vec(ff.forward(x.slice([0..1, 3..4, 0..8]), Mode::Inference).unwrap());
        assert_close(&full[3 * 8..], &last, 1e-5);
    }

    #[test]
    fn test_rejects_wrong_width() {
        let ff: FeedForwardBlock<TestBackend> = FeedForwardConfig::new(8, 32).init(&device());
        let x = Tensor::<TestBackend, 3>::zeros([1, 4, 9], &device());
        assert!(matches!(
            ff.forward(x, Mode::Inference),
            Err(ModelError::ShapeMismatch { op: "feed-forward block", .. })
        ));
    }
}
