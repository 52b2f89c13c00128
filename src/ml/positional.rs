// ============================================================
// Layer 5: Sinusoidal Positional Encoding
// ============================================================
// Self-attention is permutation-invariant, so position must be
// injected explicitly. A fixed table is built once:
//
//   PE[pos, 2i]   = sin(pos / 10000^(2i / d_model))
//   PE[pos, 2i+1] = cos(pos / 10000^(2i / d_model))
//
// and its first `seq_len` rows are added to the embeddings,
// followed by dropout. The table is a plain tensor field, not
// a Param, so it is never trained and never shows up in the
// parameter count.
//
// Reference: Vaswani et al. (2017) §3.5

use burn::prelude::*;

use crate::domain::{Mode, ModelError, Result};
use crate::ml::dropout::Dropout;

#[derive(Config, Debug)]
pub struct PositionalEncodingConfig {
    pub d_model:     usize,
    pub max_seq_len: usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl PositionalEncodingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PositionalEncoding<B> {
        let values = sinusoid_table(self.max_seq_len, self.d_model);
        let table  = Tensor::from_data(
            TensorData::new(values, [1, self.max_seq_len, self.d_model]),
            device,
        );

        PositionalEncoding {
            table,
            dropout:     Dropout::new(self.dropout),
            d_model:     self.d_model,
            max_seq_len: self.max_seq_len,
        }
    }
}

/// Row-major [max_seq_len, d_model] sinusoid values.
pub fn sinusoid_table(max_seq_len: usize, d_model: usize) -> Vec<f32> {
    let mut table = vec![0.0f32; max_seq_len * d_model];

    for pos in 0..max_seq_len {
        let row = &mut table[pos * d_model..(pos + 1) * d_model];
        for i in (0..d_model).step_by(2) {
            let angle = pos as f64 / 10000f64.powf(i as f64 / d_model as f64);
            row[i] = angle.sin() as f32;
            if i + 1 < d_model {
                row[i + 1] = angle.cos() as f32;
            }
        }
    }

    table
}

#[derive(Module, Debug)]
pub struct PositionalEncoding<B: Backend> {
    /// [1, max_seq_len, d_model]
    table:       Tensor<B, 3>,
    dropout:     Dropout,
    d_model:     usize,
    max_seq_len: usize,
}

impl<B: Backend> PositionalEncoding<B> {
    /// x: [batch, seq_len, d_model] with seq_len ≤ max_seq_len
    pub fn forward(&self, x: Tensor<B, 3>, mode: Mode) -> Result<Tensor<B, 3>> {
        let [_, seq_len, d_model] = x.dims();
        if d_model != self.d_model {
            return Err(ModelError::shape(
                "positional encoding",
                format!("last dim {}", self.d_model),
                &x.dims(),
            ));
        }
        if seq_len > self.max_seq_len {
            return Err(ModelError::SequenceTooLong { len: seq_len, max: self.max_seq_len });
        }

        let positions = self.table.clone().slice([0..1, 0..seq_len, 0..d_model]);
        Ok(self.dropout.forward(x + positions, mode))
    }

    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }
}
