// ============================================================
// Layer 5: Attention Masks
// ============================================================
// A mask says which key positions each query position may
// attend to. It is stored as a 4-D boolean tensor broadcastable
// to the attention scores [batch, heads, seq_q, seq_k]:
//
//   true  (1) → allowed
//   false (0) → forbidden, score forced to -1e9 before softmax
//
// Two kinds are used by the Transformer:
//
//   padding         [batch, 1, 1, seq_k]
//     keys that are <pad> are forbidden for every query;
//     used for encoder self-attention and cross-attention
//
//   causal+padding  [batch, 1, seq, seq]
//     query i may only see keys j ≤ i that are not <pad>;
//     used for decoder self-attention
//
//   e.g. causal(3):    1 0 0
//                      1 1 0
//                      1 1 1
//
// Reference: Vaswani et al. (2017) §3.2.3

use burn::prelude::*;

use crate::domain::{ModelError, Result};

#[derive(Debug, Clone)]
pub struct AttentionMask<B: Backend> {
    allowed: Tensor<B, 4, Bool>,
}

impl<B: Backend> AttentionMask<B> {
    /// Wrap a boolean tensor where `true` marks an allowed (query, key) pair.
    pub fn new(allowed: Tensor<B, 4, Bool>) -> Self {
        Self { allowed }
    }

    /// 0/1 integer mask, 0 = forbidden.
    pub fn from_ints(mask: Tensor<B, 4, Int>) -> Self {
        Self::new(mask.not_equal_elem(0))
    }

    /// Allows everything; shape [1, 1, 1, seq_k].
    pub fn all(seq_k: usize, device: &B::Device) -> Self {
        Self::from_ints(Tensor::ones([1, 1, 1, seq_k], device))
    }

    /// Source padding mask from padded ids `[batch, seq]` → `[batch, 1, 1, seq]`.
    pub fn padding(tokens: Tensor<B, 2, Int>, pad_id: u32) -> Self {
        let [batch, seq_len] = tokens.dims();
        Self::new(
            tokens
                .not_equal_elem(pad_id as i64)
                .reshape([batch, 1, 1, seq_len]),
        )
    }

    /// Lower-triangular mask `[1, 1, len, len]`: query i sees keys 0..=i.
    pub fn causal(len: usize, device: &B::Device) -> Self {
        let allowed: Vec<bool> = (0..len)
            .flat_map(|query| (0..len).map(move |key| key <= query))
            .collect();

        Self::new(Tensor::from_data(TensorData::new(allowed, [1, 1, len, len]), device))
    }

    /// Decoder self-attention mask from padded target ids `[batch, seq]`:
    /// causal and padding combined, shape `[batch, 1, seq, seq]`.
    pub fn causal_padding(tokens: Tensor<B, 2, Int>, pad_id: u32) -> Self {
        let [batch, seq_len] = tokens.dims();
        let device = tokens.device();

        let keys = tokens
            .not_equal_elem(pad_id as i64)
            .int()
            .reshape([batch, 1, 1, seq_len]);
        let causal = Self::causal(seq_len, &device).allowed.int();

        // [batch, 1, 1, seq] * [1, 1, seq, seq] → [batch, 1, seq, seq]
        Self::new((keys * causal).equal_elem(1))
    }

    pub fn dims(&self) -> [usize; 4] {
        self.allowed.dims()
    }

    pub fn allowed(&self) -> Tensor<B, 4, Bool> {
        self.allowed.clone()
    }

    /// Positions to overwrite in a score tensor of shape `scores`.
    pub(crate) fn forbidden(&self, scores: [usize; 4]) -> Result<Tensor<B, 4, Bool>> {
        let dims = self.dims();
        let broadcastable = dims
            .iter()
            .zip(scores.iter())
            .all(|(&m, &s)| m == s || m == 1);

        if !broadcastable {
            return Err(ModelError::MaskShape {
                mask:   dims.to_vec(),
                scores: scores.to_vec(),
            });
        }

        Ok(self.allowed.clone().bool_not().expand(Shape::new(scores)))
    }
}
