// ============================================================
// Layer 5: Dropout
// ============================================================
// Inverted dropout switched by an explicit Mode instead of the
// backend type, so the same module value runs a training pass
// and an inference pass without being rebuilt:
//
//   Train:      x * keep_mask / (1 - p)
//   Inference:  x
//
// Reference: Srivastava et al. (2014) Dropout
//            Burn Book §3 (Building Blocks)

use burn::{prelude::*, tensor::Distribution};

use crate::domain::Mode;

/// Inverted dropout controlled by the caller's [`Mode`].
///
/// In [`Mode::Train`] each element is zeroed with probability `prob` and the
/// survivors are scaled by `1 / (1 - prob)`. In [`Mode::Inference`] the input
/// is returned untouched. Randomness comes from the backend's generator, which
/// callers seed through `Backend::seed`.
#[derive(Module, Clone, Debug)]
pub struct Dropout {
    prob: f64,
}

impl Dropout {
    pub fn new(prob: f64) -> Self {
        Self { prob }
    }

    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>, mode: Mode) -> Tensor<B, D> {
        if !mode.is_train() || self.prob == 0.0 {
            return input;
        }

        let random = input.random_like(Distribution::Bernoulli(self.prob));
        let mask   = random.equal_elem(1);
        let x      = input.mask_fill(mask, 0);

        x * (1.0 / (1.0 - self.prob))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_utils::{device, to_vec, TestBackend};

    #[test]
    fn test_inference_is_identity() {
        let dropout = Dropout::new(0.9);
        let input   = Tensor::<TestBackend, 3>::ones([2, 4, 8], &device());
        let output  = dropout.forward(input.clone(), Mode::Inference);
        assert_eq!(to_vec(output), to_vec(input));
    }

    #[test]
    fn test_train_zeroes_and_rescales() {
        TestBackend::seed(7);
        let dropout = Dropout::new(0.5);
        let input   = Tensor::<TestBackend, 2>::ones([64, 64], &device());
        let output  = to_vec(dropout.forward(input, Mode::Train));

        // Every element is either dropped or scaled by 1 / (1 - p) = 2
        assert!(output.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-6));

        let dropped = output.iter().filter(|&&v| v == 0.0).count() as f64 / output.len() as f64;
        assert!((dropped - 0.5).abs() < 0.05, "dropped fraction {dropped}");
    }

    #[test]
    fn test_zero_probability_in_train_mode() {
        let dropout = Dropout::new(0.0);
        let input   = Tensor::<TestBackend, 1>::from_floats([1.0, -2.0, 3.5], &device());
        assert_eq!(to_vec(dropout.forward(input, Mode::Train)), vec![1.0, -2.0, 3.5]);
    }
}
