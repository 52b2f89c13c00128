// ============================================================
// Layer 5: Multi-Head Attention
// ============================================================
// Shapes through one call (h heads, d_k = d_model / h):
//
//   q, k, v          [batch, seq, d_model]
//   W_q/W_k/W_v      [batch, seq, d_model]
//   split heads      [batch, h, seq, d_k]
//   Q·Kᵀ / √d_k      [batch, h, seq_q, seq_k]   ← scores
//   mask             forbidden scores → -1e9
//   softmax(keys)    [batch, h, seq_q, seq_k]   ← weights
//   mask             forbidden weights → 0
//   weights · V      [batch, h, seq_q, d_k]
//   merge heads      [batch, seq_q, d_model]
//   W_o              [batch, seq_q, d_model]
//
// Masked scores are pushed to a large negative value, not to 0:
// a 0 score still receives probability mass after softmax,
// while exp(-1e9) underflows to exactly 0. Forbidden weights
// are zeroed once more after softmax, so a query whose keys are
// all forbidden (a padded first target position, an all-pad
// source row) attends to nothing and yields a zero context.
//
// Self-attention passes the same tensor as q, k and v.
// Cross-attention takes q from the decoder and k = v from the
// encoder output, so seq_q and seq_k may differ.
//
// Reference: Vaswani et al. (2017) §3.2.1, §3.2.2
//            Burn Book §3 (Building Blocks)

use burn::{nn::Linear, prelude::*, tensor::activation::softmax};

use crate::domain::{Mode, ModelError, Result};
use crate::ml::{dropout::Dropout, init, mask::AttentionMask};

/// Score written into forbidden (query, key) slots before softmax.
pub const MASKED_SCORE: f64 = -1e9;

#[derive(Config, Debug)]
pub struct MultiHeadAttentionConfig {
    pub d_model: usize,
    pub n_heads: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl MultiHeadAttentionConfig {
    /// Fails when `d_model` is not a multiple of `n_heads`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<MultiHeadAttentionBlock<B>> {
        if self.n_heads == 0 {
            return Err(ModelError::InvalidConfig("attention needs at least one head".into()));
        }
        if self.d_model % self.n_heads != 0 {
            return Err(ModelError::HeadsNotDivisible {
                d_model: self.d_model,
                n_heads: self.n_heads,
            });
        }

        Ok(MultiHeadAttentionBlock {
            w_q:     init::linear(self.d_model, self.d_model, device),
            w_k:     init::linear(self.d_model, self.d_model, device),
            w_v:     init::linear(self.d_model, self.d_model, device),
            w_o:     init::linear(self.d_model, self.d_model, device),
            dropout: Dropout::new(self.dropout),
            d_model: self.d_model,
            n_heads: self.n_heads,
            d_k:     self.d_model / self.n_heads,
        })
    }
}

#[derive(Module, Debug)]
pub struct MultiHeadAttentionBlock<B: Backend> {
    pub(crate) w_q: Linear<B>,
    pub(crate) w_k: Linear<B>,
    pub(crate) w_v: Linear<B>,
    pub(crate) w_o: Linear<B>,
    dropout:        Dropout,
    d_model:        usize,
    n_heads:        usize,
    d_k:            usize,
}

/// Result of one attention call.
#[derive(Debug, Clone)]
pub struct AttentionOutput<B: Backend> {
    /// [batch, seq_q, d_model]
    pub context: Tensor<B, 3>,

    /// Softmax probabilities per head, [batch, h, seq_q, seq_k], taken
    /// before attention dropout. Kept for inspection only.
    pub weights: Tensor<B, 4>,
}

impl<B: Backend> MultiHeadAttentionBlock<B> {
    pub fn forward(
        &self,
        query: Tensor<B, 3>,
        key:   Tensor<B, 3>,
        value: Tensor<B, 3>,
        mask:  Option<&AttentionMask<B>>,
        mode:  Mode,
    ) -> Result<AttentionOutput<B>> {
        self.check_inputs(&query, &key, &value)?;
        let [batch, seq_q, _] = query.dims();

        let query = self.split_heads(self.w_q.forward(query));
        let key   = self.split_heads(self.w_k.forward(key));
        let value = self.split_heads(self.w_v.forward(value));

        let (context, weights) = self.attend(query, key, value, mask, mode)?;

        let context = context.swap_dims(1, 2).reshape([batch, seq_q, self.d_model]);
        Ok(AttentionOutput {
            context: self.w_o.forward(context),
            weights,
        })
    }

    /// Scaled dot-product attention over already-split heads.
    fn attend(
        &self,
        query: Tensor<B, 4>,
        key:   Tensor<B, 4>,
        value: Tensor<B, 4>,
        mask:  Option<&AttentionMask<B>>,
        mode:  Mode,
    ) -> Result<(Tensor<B, 4>, Tensor<B, 4>)> {
        let scores = query
            .matmul(key.swap_dims(2, 3))
            .div_scalar((self.d_k as f64).sqrt());

        let weights = match mask {
            Some(mask) => {
                let forbidden = mask.forbidden(scores.dims())?;
                let scores    = scores.mask_fill(forbidden.clone(), MASKED_SCORE);
                // A row with every key forbidden would otherwise come out uniform
                softmax(scores, 3).mask_fill(forbidden, 0.0)
            }
            None => softmax(scores, 3),
        };

        let context = self.dropout.forward(weights.clone(), mode).matmul(value);
        Ok((context, weights))
    }

    /// [batch, seq, d_model] → [batch, h, seq, d_k]
    fn split_heads(&self, x: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch, seq_len, _] = x.dims();
        x.reshape([batch, seq_len, self.n_heads, self.d_k]).swap_dims(1, 2)
    }

    fn check_inputs(&self, query: &Tensor<B, 3>, key: &Tensor<B, 3>, value: &Tensor<B, 3>) -> Result<()> {
        for (name, tensor) in [("attention query", query), ("attention key", key), ("attention value", value)] {
            if tensor.dims()[2] != self.d_model {
                return Err(ModelError::shape(name, format!("last dim {}", self.d_model), &tensor.dims()));
            }
        }

        let [batch, _, _]       = query.dims();
        let [k_batch, seq_k, _] = key.dims();
        if k_batch != batch {
            return Err(ModelError::shape("attention key", format!("batch {batch}"), &key.dims()));
        }
        if value.dims()[..2] != [batch, seq_k] {
            return Err(ModelError::shape(
                "attention value",
                format!("[{batch}, {seq_k}, {}]", self.d_model),
                &value.dims(),
            ));
        }
        Ok(())
    }

    pub fn n_heads(&self) -> usize {
        self.n_heads
    }

    pub fn d_k(&self) -> usize {
        self.d_k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_utils::{assert_close, device, to_vec, TestBackend};
    use burn::tensor::Distribution;

    fn random(shape: [usize; 3]) -> Tensor<TestBackend, 3> {
        Tensor::random(shape, Distribution::Normal(0.0, 1.0), &device())
    }

    fn block(d_model: usize, n_heads: usize) -> MultiHeadAttentionBlock<TestBackend> {
        MultiHeadAttentionConfig::new(d_model, n_heads).init(&device()).unwrap()
    }

    #[test]
    fn test_output_shape_matches_query() {
        for (d_model, n_heads) in [(8, 1), (8, 2), (12, 3), (64, 8), (512, 8)] {
            let mha = block(d_model, n_heads);
            let x   = random([2, 5, d_model]);
            let out = mha.forward(x.clone(), x.clone(), x, None, Mode::Inference).unwrap();
            assert_eq!(out.context.dims(), [2, 5, d_model]);
            assert_eq!(out.weights.dims(), [2, n_heads, 5, 5]);
            assert_eq!(mha.d_k() * mha.n_heads(), d_model);
        }
    }

    #[test]
    fn test_cross_attention_with_different_lengths() {
        let mha    = block(16, 4);
        let query  = random([3, 2, 16]);
        let memory = random([3, 7, 16]);
        let out = mha
            .forward(query, memory.clone(), memory, None, Mode::Inference)
            .unwrap();
        assert_eq!(out.context.dims(), [3, 2, 16]);
        assert_eq!(out.weights.dims(), [3, 4, 2, 7]);
    }

    #[test]
    fn test_heads_must_divide_d_model() {
        let err = MultiHeadAttentionConfig::new(10, 3)
            .init::<TestBackend>(&device())
            .unwrap_err();
        assert_eq!(err, ModelError::HeadsNotDivisible { d_model: 10, n_heads: 3 });

        assert!(matches!(
            MultiHeadAttentionConfig::new(8, 0).init::<TestBackend>(&device()),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_weights_are_distributions() {
        let mha = block(16, 2);
        let x   = random([2, 6, 16]);
        let out = mha.forward(x.clone(), x.clone(), x, None, Mode::Inference).unwrap();
        let row_sums = to_vec(out.weights.sum_dim(3));
        assert!(row_sums.iter().all(|s| (s - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_masked_keys_receive_no_probability() {
        let mha  = block(16, 4);
        let x    = random([1, 4, 16]) * 10.0;
        let mask = AttentionMask::causal(4, &device());

        let out     = mha.forward(x.clone(), x.clone(), x, Some(&mask), Mode::Inference).unwrap();
        let weights = to_vec(out.weights);

        for head in 0..4 {
            for q in 0..4 {
                for k in 0..4 {
                    let w = weights[head * 16 + q * 4 + k];
                    if k > q {
                        assert!(w < f32::EPSILON, "head {head} q {q} k {k}: {w}");
                    }
                }
            }
        }
        // First query can only see itself
        assert!((weights[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fully_masked_query_attends_to_nothing() {
        let mha = block(8, 2);
        let x   = random([1, 3, 8]) * 10.0;

        // Query 0 may only see key 0, which is padding
        let tokens = Tensor::<TestBackend, 2, Int>::from_ints([[0, 7, 8]], &device());
        let mask   = AttentionMask::causal_padding(tokens, 0);
        let out    = mha.forward(x.clone(), x.clone(), x, Some(&mask), Mode::Inference).unwrap();

        let weights = to_vec(out.weights);
        for head in 0..2 {
            let row = |q: usize| &weights[head * 9 + q * 3..head * 9 + q * 3 + 3];
            assert_eq!(row(0), [0.0, 0.0, 0.0]);
            // Query 1 sees key 1 only, query 2 sees keys 1 and 2
            assert!((row(1)[1] - 1.0).abs() < 1e-6);
            assert_eq!((row(1)[0], row(1)[2]), (0.0, 0.0));
            assert_eq!(row(2)[0], 0.0);
            assert!((row(2)[1] + row(2)[2] - 1.0).abs() < 1e-5);
        }

        // A zero context leaves only the output bias
        let bias = to_vec(mha.w_o.bias.as_ref().unwrap().val());
        let first = to_vec(out.context.slice([0..1, 0..1, 0..8]));
        assert_close(&first, &bias, 1e-6);
    }

    #[test]
    fn test_padding_mask_ignores_padded_keys() {
        let mha    = block(8, 2);
        let query  = random([1, 3, 8]);
        let memory = random([1, 5, 8]);
        let tokens = Tensor::<TestBackend, 2, Int>::from_ints([[4, 9, 3, 0, 0]], &device());
        let mask   = AttentionMask::padding(tokens, 0);

        let out = mha
            .forward(query.clone(), memory.clone(), memory.clone(), Some(&mask), Mode::Inference)
            .unwrap();

        // Replacing the padded keys/values changes nothing
        let replaced = Tensor::cat(
            vec![memory.slice([0..1, 0..3, 0..8]), random([1, 2, 8]) * 100.0],
            1,
        );
        let again = mha
            .forward(query, replaced.clone(), replaced, Some(&mask), Mode::Inference)
            .unwrap();

        let a = to_vec(out.context);
        let b = to_vec(again.context);
        assert!(a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-4));
    }

    #[test]
    fn test_rejects_wrong_width_and_mismatched_key_value() {
        let mha = block(8, 2);
        let bad = random([1, 3, 6]);
        let ok  = random([1, 3, 8]);
        assert!(matches!(
            mha.forward(bad, ok.clone(), ok.clone(), None, Mode::Inference),
            Err(ModelError::ShapeMismatch { op: "attention query", .. })
        ));

        let short_value = random([1, 2, 8]);
        assert!(matches!(
            mha.forward(ok.clone(), ok.clone(), short_value, None, Mode::Inference),
            Err(ModelError::ShapeMismatch { op: "attention value", .. })
        ));

        let other_batch = random([2, 3, 8]);
        assert!(matches!(
            mha.forward(ok.clone(), other_batch.clone(), other_batch, None, Mode::Inference),
            Err(ModelError::ShapeMismatch { op: "attention key", .. })
        ));
    }

    #[test]
    fn test_rejects_mask_of_wrong_length() {
        let mha  = block(8, 2);
        let x    = random([1, 3, 8]);
        let mask = AttentionMask::causal(4, &device());
        assert!(matches!(
            mha.forward(x.clone(), x.clone(), x, Some(&mask), Mode::Inference),
            Err(ModelError::MaskShape { .. })
        ));
    }
}
