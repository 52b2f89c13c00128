// ============================================================
// Layer 5: Greedy Decoder
// ============================================================
// Autoregressive generation with a trained (or fresh) model:
//
//   memory = encode(src)                       ← once
//   tgt    = [bos]
//   loop:
//     out   = decode(memory, tgt, causal mask)
//     probs = project(out[last position])
//     next  = argmax(probs)                    ← greedy choice
//     stop on eos, or when the length limit is reached
//
// The limit is min(max_len, tgt_seq_len): the decoder input
// never grows past the positional table of the target side.
//
// Reference: Vaswani et al. (2017) §6.1 (greedy baseline)

use burn::prelude::*;

use crate::domain::{Generation, Mode, ModelError, Result, SequenceGenerator, SpecialTokens};
use crate::ml::{mask::AttentionMask, model::Transformer};

pub struct GreedyDecoder<'a, B: Backend> {
    model:   &'a Transformer<B>,
    special: SpecialTokens,
    max_len: usize,
    device:  B::Device,
}

impl<'a, B: Backend> GreedyDecoder<'a, B> {
    pub fn new(model: &'a Transformer<B>, special: SpecialTokens, max_len: usize, device: &B::Device) -> Self {
        Self {
            model,
            special,
            max_len,
            device: device.clone(),
        }
    }

    /// Most tokens a single run can produce.
    pub fn length_limit(&self) -> usize {
        self.max_len.min(self.model.tgt_seq_len())
    }

    pub fn decode(&self, src: &[u32]) -> Result<Generation> {
        if src.is_empty() {
            return Err(ModelError::EmptySequence("source"));
        }

        let src      = self.ids(src.iter().map(|&t| t as i64).collect());
        let src_mask = AttentionMask::padding(src.clone(), self.special.pad);
        let memory   = self.model.encode(src, Some(&src_mask), Mode::Inference)?;

        let d_model = self.model.d_model();
        let limit   = self.length_limit();

        let mut tgt: Vec<i64>  = vec![self.special.bos as i64];
        let mut generation     = Generation::default();

        while generation.tokens.len() < limit {
            let len      = tgt.len();
            let tgt_mask = AttentionMask::causal(len, &self.device);
            let out      = self.model.decode(
                &memory,
                Some(&src_mask),
                self.ids(tgt.clone()),
                Some(&tgt_mask),
                Mode::Inference,
            )?;

            let last      = out.slice([0..1, len - 1..len, 0..d_model]);
            let log_probs = self.model.project(last)?;
            let (token, log_prob) = argmax(&log_probs.into_data())?;

            tracing::debug!("step {}: token {} (log p = {:.4})", len - 1, token, log_prob);

            generation.tokens.push(token);
            generation.log_probs.push(log_prob);
            if token == self.special.eos {
                break;
            }
            tgt.push(token as i64);
        }

        Ok(generation)
    }

    fn ids(&self, ids: Vec<i64>) -> Tensor<B, 2, Int> {
        let len = ids.len();
        Tensor::from_data(TensorData::new(ids, [1, len]), &self.device)
    }
}

impl<B: Backend> SequenceGenerator for GreedyDecoder<'_, B> {
    fn generate(&self, src: &[u32]) -> anyhow::Result<Generation> {
        Ok(self.decode(src)?)
    }
}

/// Index and value of the largest entry; the first one wins ties.
fn argmax(data: &TensorData) -> Result<(u32, f32)> {
    data.iter::<f32>()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, v)| (i as u32, v))
        .ok_or_else(|| ModelError::TensorData("empty projection output".into()))
}
